//! Use-case services.
//!
//! # Responsibility
//! - [`journal_service`] keeps entities, timeline rows and the cache in step.
//! - [`timeline_service`] and [`timeline_filtering_service`] are read-only
//!   feed pipelines over the cached repositories.

pub mod journal_service;
pub mod timeline_filtering_service;
pub mod timeline_service;
