//! Core of the family journal: storage, timeline index, feed and filters.
//! Every business invariant lives in this crate.

pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod timezone;

pub use cache::{CacheStore, CachedRepository, CachedTimeline, MemoryCache};
pub use config::{CacheSettings, ConfigError, CoreConfig, FeedSettings};
pub use context::ViewerContext;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::access::{AccessLevel, UserAccess};
pub use model::timeline::{TimeLineItem, TimelineItemType};
pub use model::{EntityId, ProgenyId, UserId, ValidationError};
pub use repo::entity_repo::{
    Entity, EntityRepository, RepoError, RepoResult, SqliteEntityRepository,
};
pub use service::journal_service::JournalService;
pub use service::timeline_filtering_service::TimelineFilteringService;
pub use service::timeline_service::{
    FeedEntry, FeedFilter, FeedPage, FeedRequest, OnThisDayPeriod, SortOrder, TimelineService,
};
pub use timezone::{parse_time_zone, to_viewer_time, UnknownTimeZone};

/// Health-check probe.
pub fn ping() -> &'static str {
    "pong"
}

pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
