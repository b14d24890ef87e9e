//! Timeline index persistence.
//!
//! # Responsibility
//! - Store one feed row per underlying entity, keyed by `(item_type, item_id)`.
//!
//! # Invariants
//! - Uniqueness of `(item_type, item_id)` is enforced by the schema.
//! - Progeny lists are returned in `progeny_time ASC, time_line_id ASC` order.

use crate::model::timeline::{TimeLineItem, TimelineItemType};
use crate::model::{EntityId, ProgenyId};
use crate::repo::entity_repo::{
    read_access_level, read_time, table_exists, time_to_db, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub(crate) const TIMELINE_TABLE: &str = "timeline_items";

const TIMELINE_SELECT_SQL: &str = "SELECT
    time_line_id,
    progeny_id,
    item_type,
    item_id,
    access_level,
    progeny_time,
    created_by,
    created_time
FROM timeline_items";

/// Repository interface for the timeline index.
pub trait TimelineRepository {
    fn insert(&self, item: &TimeLineItem) -> RepoResult<i64>;
    /// Updates time and access level of the row pointing at `item`'s entity.
    fn update_for_item(&self, item: &TimeLineItem) -> RepoResult<()>;
    fn get_by_item(
        &self,
        item_type: TimelineItemType,
        item_id: EntityId,
    ) -> RepoResult<Option<TimeLineItem>>;
    /// Lists every row of one progeny regardless of access level.
    fn list_for_progeny(&self, progeny_id: ProgenyId) -> RepoResult<Vec<TimeLineItem>>;
    fn delete_by_item(&self, item_type: TimelineItemType, item_id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed timeline repository.
pub struct SqliteTimelineRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTimelineRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        if !table_exists(conn, TIMELINE_TABLE)? {
            return Err(RepoError::MissingRequiredTable(TIMELINE_TABLE));
        }
        Ok(Self { conn })
    }
}

impl TimelineRepository for SqliteTimelineRepository<'_> {
    fn insert(&self, item: &TimeLineItem) -> RepoResult<i64> {
        self.conn.execute(
            "INSERT INTO timeline_items (
                progeny_id,
                item_type,
                item_id,
                access_level,
                progeny_time,
                created_by,
                created_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                item.progeny_id,
                item.item_type.code(),
                item.item_id.as_str(),
                item.access_level.as_i64(),
                time_to_db(item.progeny_time),
                item.created_by.map(|user| user.to_string()),
                time_to_db(item.created_time),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_for_item(&self, item: &TimeLineItem) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE timeline_items
             SET
                access_level = ?1,
                progeny_time = ?2,
                progeny_id = ?3
             WHERE item_type = ?4
               AND item_id = ?5;",
            params![
                item.access_level.as_i64(),
                time_to_db(item.progeny_time),
                item.progeny_id,
                item.item_type.code(),
                item.item_id.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: TIMELINE_TABLE,
                id: item.entity_id().unwrap_or_default(),
            });
        }
        Ok(())
    }

    fn get_by_item(
        &self,
        item_type: TimelineItemType,
        item_id: EntityId,
    ) -> RepoResult<Option<TimeLineItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TIMELINE_SELECT_SQL} WHERE item_type = ?1 AND item_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![item_type.code(), item_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_timeline_row(row)?));
        }
        Ok(None)
    }

    fn list_for_progeny(&self, progeny_id: ProgenyId) -> RepoResult<Vec<TimeLineItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TIMELINE_SELECT_SQL}
             WHERE progeny_id = ?1
             ORDER BY progeny_time ASC, time_line_id ASC;"
        ))?;
        let mut rows = stmt.query(params![progeny_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_timeline_row(row)?);
        }
        Ok(items)
    }

    fn delete_by_item(&self, item_type: TimelineItemType, item_id: EntityId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM timeline_items WHERE item_type = ?1 AND item_id = ?2;",
            params![item_type.code(), item_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: TIMELINE_TABLE,
                id: item_id,
            });
        }
        Ok(())
    }
}

fn parse_timeline_row(row: &Row<'_>) -> RepoResult<TimeLineItem> {
    let type_code: i64 = row.get("item_type")?;
    let item_type = TimelineItemType::from_code(type_code).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid item type `{type_code}` in timeline_items.item_type"
        ))
    })?;

    let created_by = match row.get::<_, Option<String>>("created_by")? {
        Some(text) => Some(Uuid::parse_str(&text).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid user id `{text}` in timeline_items.created_by"
            ))
        })?),
        None => None,
    };

    Ok(TimeLineItem {
        time_line_id: row.get("time_line_id")?,
        progeny_id: row.get("progeny_id")?,
        item_type,
        item_id: row.get("item_id")?,
        access_level: read_access_level(row)?,
        progeny_time: read_time(row, "progeny_time")?,
        created_by,
        created_time: read_time(row, "created_time")?,
    })
}
