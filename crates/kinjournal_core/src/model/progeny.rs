//! Child profile record.

use super::{ProgenyId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The child whose life events the journal records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progeny {
    pub id: ProgenyId,
    pub name: String,
    pub nick_name: String,
    pub birthday: Option<DateTime<Utc>>,
    /// IANA zone name the child's parents record events in.
    pub time_zone: String,
}

impl Progeny {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time_zone: "UTC".to_string(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        Ok(())
    }
}
