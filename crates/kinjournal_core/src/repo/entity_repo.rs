//! Generic entity repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Describe one journal table through the [`Entity`] trait.
//! - Provide CRUD once for every entity kind instead of per table.
//!
//! # Invariants
//! - Write paths call [`Entity::validate`] before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Progeny lists are access-filtered in SQL (`access_level >= ?`).

use crate::db::DbError;
use crate::model::access::AccessLevel;
use crate::model::timeline::TimelineItemType;
use crate::model::{EntityId, ProgenyId, ValidationError};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every persistence component.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound { kind: &'static str, id: EntityId },
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One journal table and how its rows map onto a model type.
///
/// `COLUMNS` excludes the id column and must contain `progeny_id` and
/// `access_level`; [`Entity::to_values`] yields values in `COLUMNS` order.
pub trait Entity: Clone + Serialize + DeserializeOwned {
    const TABLE: &'static str;
    const ID_COLUMN: &'static str;
    const COLUMNS: &'static [&'static str];
    /// Timeline kind this entity is indexed under.
    const TIMELINE_TYPE: TimelineItemType;

    fn id(&self) -> EntityId;
    fn set_id(&mut self, id: EntityId);
    fn progeny_id(&self) -> ProgenyId;
    fn access_level(&self) -> AccessLevel;
    /// Display time of the entity in the feed, if it has one.
    fn timeline_time(&self) -> Option<DateTime<Utc>>;
    fn to_values(&self) -> Vec<Value>;
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// CRUD contract for one entity kind.
pub trait EntityRepository<E: Entity> {
    fn insert(&self, entity: &E) -> RepoResult<EntityId>;
    fn update(&self, entity: &E) -> RepoResult<()>;
    fn get(&self, id: EntityId) -> RepoResult<Option<E>>;
    /// Lists entities of one progeny visible at `min_level`, ordered by id.
    fn list_for_progeny(&self, progeny_id: ProgenyId, min_level: AccessLevel)
        -> RepoResult<Vec<E>>;
    fn delete(&self, id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed repository for any [`Entity`].
pub struct SqliteEntityRepository<'conn, E> {
    conn: &'conn Connection,
    _entity: PhantomData<fn() -> E>,
}

impl<'conn, E: Entity> SqliteEntityRepository<'conn, E> {
    /// Constructs a repository after checking the entity table exists.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        if !table_exists(conn, E::TABLE)? {
            return Err(RepoError::MissingRequiredTable(E::TABLE));
        }
        Ok(Self {
            conn,
            _entity: PhantomData,
        })
    }

    fn select_sql() -> String {
        format!(
            "SELECT {}, {} FROM {}",
            E::ID_COLUMN,
            E::COLUMNS.join(", "),
            E::TABLE
        )
    }
}

impl<E: Entity> EntityRepository<E> for SqliteEntityRepository<'_, E> {
    fn insert(&self, entity: &E) -> RepoResult<EntityId> {
        entity.validate()?;

        let placeholders = (1..=E::COLUMNS.len())
            .map(|idx| format!("?{idx}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                E::TABLE,
                E::COLUMNS.join(", ")
            ),
            params_from_iter(entity.to_values()),
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, entity: &E) -> RepoResult<()> {
        entity.validate()?;

        let assignments = E::COLUMNS
            .iter()
            .enumerate()
            .map(|(idx, column)| format!("{column} = ?{}", idx + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let mut values = entity.to_values();
        values.push(Value::Integer(entity.id()));

        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {assignments} WHERE {} = ?{};",
                E::TABLE,
                E::ID_COLUMN,
                values.len()
            ),
            params_from_iter(values),
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: E::TABLE,
                id: entity.id(),
            });
        }
        Ok(())
    }

    fn get(&self, id: EntityId) -> RepoResult<Option<E>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE {} = ?1;",
            Self::select_sql(),
            E::ID_COLUMN
        ))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(E::from_row(row)?));
        }
        Ok(None)
    }

    fn list_for_progeny(
        &self,
        progeny_id: ProgenyId,
        min_level: AccessLevel,
    ) -> RepoResult<Vec<E>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE progeny_id = ?1 AND access_level >= ?2 ORDER BY {} ASC;",
            Self::select_sql(),
            E::ID_COLUMN
        ))?;
        let mut rows = stmt.query(params![progeny_id, min_level.as_i64()])?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(E::from_row(row)?);
        }
        Ok(entities)
    }

    fn delete(&self, id: EntityId) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1;", E::TABLE, E::ID_COLUMN),
            params![id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: E::TABLE,
                id,
            });
        }
        Ok(())
    }
}

pub(crate) fn time_to_db(value: DateTime<Utc>) -> Value {
    Value::Integer(value.timestamp_millis())
}

pub(crate) fn opt_time_to_db(value: Option<DateTime<Utc>>) -> Value {
    value.map_or(Value::Null, time_to_db)
}

pub(crate) fn time_from_millis(millis: i64, column: &str) -> RepoResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        RepoError::InvalidData(format!("timestamp `{millis}` out of range in {column}"))
    })
}

pub(crate) fn read_time(row: &Row<'_>, column: &str) -> RepoResult<DateTime<Utc>> {
    time_from_millis(row.get(column)?, column)
}

pub(crate) fn read_opt_time(row: &Row<'_>, column: &str) -> RepoResult<Option<DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(column)? {
        Some(millis) => Ok(Some(time_from_millis(millis, column)?)),
        None => Ok(None),
    }
}

pub(crate) fn read_access_level(row: &Row<'_>) -> RepoResult<AccessLevel> {
    let value: i64 = row.get("access_level")?;
    AccessLevel::from_i64(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid access level `{value}`")))
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
