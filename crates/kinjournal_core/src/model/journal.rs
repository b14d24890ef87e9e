//! Journal entities recorded by parents besides media and calendar events.
//!
//! Each record carries its owning `progeny_id` and an `access_level`; the
//! descriptive text fields are what tag/category/context/keyword filters read.

use super::access::AccessLevel;
use super::{EntityId, ProgenyId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub note_id: EntityId,
    pub progeny_id: ProgenyId,
    pub access_level: AccessLevel,
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub skill_id: EntityId,
    pub progeny_id: ProgenyId,
    pub access_level: AccessLevel,
    pub name: String,
    pub description: String,
    pub category: String,
    pub first_observation: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub friend_id: EntityId,
    pub progeny_id: ProgenyId,
    pub access_level: AccessLevel,
    pub name: String,
    pub description: String,
    pub context: String,
    pub notes: String,
    pub tags: String,
    pub friend_since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub contact_id: EntityId,
    pub progeny_id: ProgenyId,
    pub access_level: AccessLevel,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub display_name: String,
    pub email: String,
    pub context: String,
    pub notes: String,
    pub tags: String,
    pub date_added: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vaccination {
    pub vaccination_id: EntityId,
    pub progeny_id: ProgenyId,
    pub access_level: AccessLevel,
    pub name: String,
    pub description: String,
    pub notes: String,
    pub vaccination_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub location_id: EntityId,
    pub progeny_id: ProgenyId,
    pub access_level: AccessLevel,
    pub name: String,
    pub city: String,
    pub notes: String,
    pub tags: String,
    pub visit_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyItem {
    pub word_id: EntityId,
    pub progeny_id: ProgenyId,
    pub access_level: AccessLevel,
    pub word: String,
    pub sounds_like: String,
    pub description: String,
    pub language: String,
    pub word_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub measurement_id: EntityId,
    pub progeny_id: ProgenyId,
    pub access_level: AccessLevel,
    /// Kilograms.
    pub weight: Option<f64>,
    /// Centimetres.
    pub height: Option<f64>,
    /// Head circumference, centimetres.
    pub circumference: Option<f64>,
    pub measured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sleep {
    pub sleep_id: EntityId,
    pub progeny_id: ProgenyId,
    pub access_level: AccessLevel,
    pub sleep_start: DateTime<Utc>,
    pub sleep_end: DateTime<Utc>,
    /// 0 = unrated, otherwise 1..=5.
    pub rating: i64,
    pub notes: String,
}

impl Sleep {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sleep_end < self.sleep_start {
            return Err(ValidationError::EndBeforeStart("sleep"));
        }
        Ok(())
    }
}

pub(crate) fn require_text(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(())
    }
}
