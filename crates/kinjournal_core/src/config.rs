//! Core configuration.
//!
//! # Responsibility
//! - Describe database, logging, cache and feed settings as one serde value.
//! - Load it from a JSON file where every field is optional.
//!
//! # Invariants
//! - A validated config always has a non-zero cache capacity, a page size
//!   ceiling not below the default page size, and a known default zone.

use crate::timezone::parse_time_zone;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;
pub const DEFAULT_FEED_COUNT: usize = 5;
pub const MAX_FEED_COUNT: usize = 100;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// Page size used when a request asks for `0` items.
    pub default_count: usize,
    pub max_count: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            default_count: DEFAULT_FEED_COUNT,
            max_count: MAX_FEED_COUNT,
        }
    }
}

impl FeedSettings {
    /// Normalizes a requested page size: `0` means default, large values clamp.
    pub fn page_size(&self, requested: usize) -> usize {
        match requested {
            0 => self.default_count,
            value if value > self.max_count => self.max_count,
            value => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub default_time_zone: String,
    pub cache: CacheSettings,
    pub feed: FeedSettings,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: None,
            log_dir: None,
            default_time_zone: "UTC".to_string(),
            cache: CacheSettings::default(),
            feed: FeedSettings::default(),
        }
    }
}

impl CoreConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_entries must be greater than 0".to_string(),
            ));
        }
        if self.feed.default_count == 0 || self.feed.max_count < self.feed.default_count {
            return Err(ConfigError::Invalid(format!(
                "feed.max_count ({}) must be >= feed.default_count ({}) and both non-zero",
                self.feed.max_count, self.feed.default_count
            )));
        }
        parse_time_zone(&self.default_time_zone)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        Ok(())
    }
}
