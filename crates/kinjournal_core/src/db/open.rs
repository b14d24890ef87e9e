//! Connection setup.
//!
//! # Invariants
//! - Returned connections enforce foreign keys and wait on a busy database.
//! - Returned connections are migrated to [`latest_version`].
//!
//! [`latest_version`]: super::migrations::latest_version

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy)]
enum Target<'p> {
    File(&'p Path),
    Memory,
}

impl Target<'_> {
    fn label(self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }
}

/// Opens (creating if needed) the journal database at `path`.
///
/// Missing parent directories are created. File databases use WAL journaling.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open(Target::File(path.as_ref()))
}

/// Opens a private in-memory journal with the full schema.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open(Target::Memory)
}

fn open(target: Target<'_>) -> DbResult<Connection> {
    let started_at = Instant::now();
    let result = connect(target).and_then(|mut conn| {
        configure(&mut conn, target)?;
        Ok(conn)
    });

    let mode = target.label();
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!("event=db_open module=db status=ok mode={mode} duration_ms={duration_ms}"),
        Err(err) => error!(
            "event=db_open module=db status=error mode={mode} duration_ms={duration_ms} error={err}"
        ),
    }
    result
}

fn connect(target: Target<'_>) -> DbResult<Connection> {
    match target {
        Target::Memory => Ok(Connection::open_in_memory()?),
        Target::File(path) => {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).map_err(|source| DbError::CreateDir {
                    dir: dir.to_path_buf(),
                    source,
                })?;
            }
            Ok(Connection::open(path)?)
        }
    }
}

fn configure(conn: &mut Connection, target: Target<'_>) -> DbResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if let Target::File(_) = target {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
    }
    apply_migrations(conn)
}
