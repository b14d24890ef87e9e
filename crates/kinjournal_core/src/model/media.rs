//! Picture and video records.
//!
//! Only the descriptive metadata lives here; blob storage is outside core.

use super::access::AccessLevel;
use super::{EntityId, ProgenyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Picture {
    pub picture_id: EntityId,
    pub progeny_id: ProgenyId,
    pub access_level: AccessLevel,
    /// Capture time, when known.
    pub picture_time: Option<DateTime<Utc>>,
    /// Comma-separated tag list as entered by the uploader.
    pub tags: String,
    pub location: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub video_id: EntityId,
    pub progeny_id: ProgenyId,
    pub access_level: AccessLevel,
    pub video_time: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub tags: String,
    pub location: String,
    pub description: String,
}
