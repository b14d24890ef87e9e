//! Schema migration steps for the journal store.
//!
//! # Responsibility
//! - Hold the ordered list of schema steps compiled into this binary.
//! - Bring a connection from its recorded version up to the newest step.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly 1.
//! - All pending steps run inside one transaction; `PRAGMA user_version`
//!   always names the last step that committed.
//! - A database written by a newer binary is refused, never downgraded.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: [SchemaStep; 3] = [
    SchemaStep {
        version: 1,
        name: "progeny_access_timeline",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "media",
        sql: include_str!("0002_media.sql"),
    },
    SchemaStep {
        version: 3,
        name: "journal_entities",
        sql: include_str!("0003_journal_entities.sql"),
    },
];

/// Newest schema version this binary can write.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Runs every step newer than the connection's `user_version`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<&SchemaStep> = STEPS.iter().filter(|step| step.version > from).collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from} to_version={latest}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{latest_version, STEPS};

    #[test]
    fn step_versions_are_contiguous_from_one() {
        for (index, step) in STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.name);
        }
        assert_eq!(latest_version() as usize, STEPS.len());
    }
}
