//! SQLite repositories.
//!
//! # Responsibility
//! - Own every SQL statement the core issues.
//! - Map rows to model types and storage failures to [`entity_repo::RepoError`].
//!
//! # Invariants
//! - Writes validate the entity before touching the database.
//! - Missing rows on update/delete surface as `NotFound`, not as silent no-ops.

pub mod access_repo;
pub mod entities;
pub mod entity_repo;
pub mod timeline_repo;
