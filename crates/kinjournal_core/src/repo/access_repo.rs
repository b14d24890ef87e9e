//! Progeny profiles and per-user access grants.
//!
//! # Invariants
//! - At most one grant exists per `(user_id, progeny_id)`; granting again
//!   replaces the level.
//! - Deleting a progeny cascades to its grants.

use crate::model::access::{AccessLevel, UserAccess};
use crate::model::progeny::Progeny;
use crate::model::{ProgenyId, UserId};
use crate::repo::entity_repo::{
    opt_time_to_db, read_access_level, read_opt_time, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const PROGENY_SELECT_SQL: &str = "SELECT id, name, nick_name, birthday, time_zone FROM progeny";
const ACCESS_SELECT_SQL: &str =
    "SELECT access_id, progeny_id, user_id, access_level FROM user_access";

/// Repository interface for progeny profiles and grants.
pub trait AccessRepository {
    fn create_progeny(&self, progeny: &Progeny) -> RepoResult<ProgenyId>;
    fn update_progeny(&self, progeny: &Progeny) -> RepoResult<()>;
    fn get_progeny(&self, id: ProgenyId) -> RepoResult<Option<Progeny>>;
    /// Grants or replaces `user_id`'s level on `progeny_id`.
    fn grant(
        &self,
        user_id: UserId,
        progeny_id: ProgenyId,
        level: AccessLevel,
    ) -> RepoResult<UserAccess>;
    fn revoke(&self, user_id: UserId, progeny_id: ProgenyId) -> RepoResult<()>;
    fn get_grant(&self, user_id: UserId, progeny_id: ProgenyId)
        -> RepoResult<Option<UserAccess>>;
    fn grants_for_user(&self, user_id: UserId) -> RepoResult<Vec<UserAccess>>;
    fn grants_for_progeny(&self, progeny_id: ProgenyId) -> RepoResult<Vec<UserAccess>>;
}

/// SQLite-backed access repository.
pub struct SqliteAccessRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAccessRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_grants(&self, filter_sql: &str, value: Value) -> RepoResult<Vec<UserAccess>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ACCESS_SELECT_SQL} WHERE {filter_sql} ORDER BY progeny_id ASC, access_id ASC;"
        ))?;
        let mut rows = stmt.query([value])?;
        let mut grants = Vec::new();
        while let Some(row) = rows.next()? {
            grants.push(parse_access_row(row)?);
        }
        Ok(grants)
    }
}

impl AccessRepository for SqliteAccessRepository<'_> {
    fn create_progeny(&self, progeny: &Progeny) -> RepoResult<ProgenyId> {
        progeny.validate()?;
        self.conn.execute(
            "INSERT INTO progeny (name, nick_name, birthday, time_zone)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                progeny.name.as_str(),
                progeny.nick_name.as_str(),
                opt_time_to_db(progeny.birthday),
                progeny.time_zone.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_progeny(&self, progeny: &Progeny) -> RepoResult<()> {
        progeny.validate()?;
        let changed = self.conn.execute(
            "UPDATE progeny
             SET name = ?1, nick_name = ?2, birthday = ?3, time_zone = ?4
             WHERE id = ?5;",
            params![
                progeny.name.as_str(),
                progeny.nick_name.as_str(),
                opt_time_to_db(progeny.birthday),
                progeny.time_zone.as_str(),
                progeny.id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "progeny",
                id: progeny.id,
            });
        }
        Ok(())
    }

    fn get_progeny(&self, id: ProgenyId) -> RepoResult<Option<Progeny>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROGENY_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(Progeny {
                id: row.get("id")?,
                name: row.get("name")?,
                nick_name: row.get("nick_name")?,
                birthday: read_opt_time(row, "birthday")?,
                time_zone: row.get("time_zone")?,
            }));
        }
        Ok(None)
    }

    fn grant(
        &self,
        user_id: UserId,
        progeny_id: ProgenyId,
        level: AccessLevel,
    ) -> RepoResult<UserAccess> {
        self.conn.execute(
            "INSERT INTO user_access (progeny_id, user_id, access_level)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, progeny_id) DO UPDATE SET access_level = excluded.access_level;",
            params![progeny_id, user_id.to_string(), level.as_i64()],
        )?;
        self.get_grant(user_id, progeny_id)?
            .ok_or_else(|| RepoError::InvalidData("grant missing after upsert".to_string()))
    }

    fn revoke(&self, user_id: UserId, progeny_id: ProgenyId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM user_access WHERE user_id = ?1 AND progeny_id = ?2;",
            params![user_id.to_string(), progeny_id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "user_access",
                id: progeny_id,
            });
        }
        Ok(())
    }

    fn get_grant(
        &self,
        user_id: UserId,
        progeny_id: ProgenyId,
    ) -> RepoResult<Option<UserAccess>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ACCESS_SELECT_SQL} WHERE user_id = ?1 AND progeny_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![user_id.to_string(), progeny_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_access_row(row)?));
        }
        Ok(None)
    }

    fn grants_for_user(&self, user_id: UserId) -> RepoResult<Vec<UserAccess>> {
        self.query_grants("user_id = ?1", Value::Text(user_id.to_string()))
    }

    fn grants_for_progeny(&self, progeny_id: ProgenyId) -> RepoResult<Vec<UserAccess>> {
        self.query_grants("progeny_id = ?1", Value::Integer(progeny_id))
    }
}

fn parse_access_row(row: &Row<'_>) -> RepoResult<UserAccess> {
    let user_text: String = row.get("user_id")?;
    let user_id = Uuid::parse_str(&user_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid user id `{user_text}` in user_access"))
    })?;
    Ok(UserAccess {
        access_id: row.get("access_id")?,
        progeny_id: row.get("progeny_id")?,
        user_id,
        access_level: read_access_level(row)?,
    })
}
