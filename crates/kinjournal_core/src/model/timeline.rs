//! Timeline index model.
//!
//! # Responsibility
//! - Define the denormalized feed row that points at an underlying entity.
//!
//! # Invariants
//! - At most one persisted row exists per `(item_type, item_id)`.
//! - `item_id` is the text form of the underlying entity id; it is parsed
//!   lazily and a malformed value only disqualifies that single row.
//! - Transient rows projected from recurring events carry `time_line_id == 0`.

use super::access::AccessLevel;
use super::{EntityId, ProgenyId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of underlying entity a timeline row points at.
///
/// Discriminants are the persisted codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineItemType {
    Photo = 1,
    Video = 2,
    Calendar = 3,
    Vocabulary = 4,
    Skill = 5,
    Friend = 6,
    Measurement = 7,
    Sleep = 8,
    Note = 9,
    Contact = 10,
    Vaccination = 11,
    Location = 12,
}

impl TimelineItemType {
    pub const ALL: [TimelineItemType; 12] = [
        Self::Photo,
        Self::Video,
        Self::Calendar,
        Self::Vocabulary,
        Self::Skill,
        Self::Friend,
        Self::Measurement,
        Self::Sleep,
        Self::Note,
        Self::Contact,
        Self::Vaccination,
        Self::Location,
    ];

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Stable lowercase name used in cache keys and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Calendar => "calendar",
            Self::Vocabulary => "vocabulary",
            Self::Skill => "skill",
            Self::Friend => "friend",
            Self::Measurement => "measurement",
            Self::Sleep => "sleep",
            Self::Note => "note",
            Self::Contact => "contact",
            Self::Vaccination => "vaccination",
            Self::Location => "location",
        }
    }
}

/// One feed-displayable event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLineItem {
    pub time_line_id: i64,
    pub progeny_id: ProgenyId,
    pub item_type: TimelineItemType,
    pub item_id: String,
    pub access_level: AccessLevel,
    /// Display timestamp of the event, UTC.
    pub progeny_time: DateTime<Utc>,
    pub created_by: Option<UserId>,
    pub created_time: DateTime<Utc>,
}

impl TimeLineItem {
    /// Builds an unsaved row pointing at entity `item_id` of `item_type`.
    pub fn for_entity(
        progeny_id: ProgenyId,
        item_type: TimelineItemType,
        item_id: EntityId,
        access_level: AccessLevel,
        progeny_time: DateTime<Utc>,
    ) -> Self {
        Self {
            time_line_id: 0,
            progeny_id,
            item_type,
            item_id: item_id.to_string(),
            access_level,
            progeny_time,
            created_by: None,
            created_time: Utc::now(),
        }
    }

    /// Parses `item_id` as an entity id. Returns `None` for malformed values.
    pub fn entity_id(&self) -> Option<EntityId> {
        self.item_id.trim().parse().ok()
    }

    /// Identity used to deduplicate feed entries, including projections that
    /// share an item id but differ in time.
    pub fn feed_key(&self) -> (TimelineItemType, &str, DateTime<Utc>) {
        (self.item_type, self.item_id.as_str(), self.progeny_time)
    }

    pub fn is_projection(&self) -> bool {
        self.time_line_id == 0
    }
}

#[cfg(test)]
mod tests {
    use super::{TimeLineItem, TimelineItemType};
    use crate::model::access::AccessLevel;
    use chrono::Utc;

    #[test]
    fn type_codes_round_trip_through_from_code() {
        for kind in TimelineItemType::ALL {
            assert_eq!(TimelineItemType::from_code(kind.code()), Some(kind));
        }
        assert_eq!(TimelineItemType::from_code(0), None);
    }

    #[test]
    fn entity_id_tolerates_malformed_values() {
        let mut item = TimeLineItem::for_entity(
            1,
            TimelineItemType::Note,
            42,
            AccessLevel::Private,
            Utc::now(),
        );
        assert_eq!(item.entity_id(), Some(42));

        item.item_id = "not-a-number".to_string();
        assert_eq!(item.entity_id(), None);
    }
}
