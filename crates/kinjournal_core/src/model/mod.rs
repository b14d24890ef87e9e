//! Journal domain model.
//!
//! # Responsibility
//! - Define the child profile, access grants, the timeline index row and the
//!   underlying journal entities it points at.
//! - Keep validation rules next to the data they constrain.
//!
//! # Invariants
//! - Every journal entity belongs to exactly one progeny.
//! - All timestamps are UTC; conversion to viewer time happens in
//!   [`crate::timezone`] only.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod access;
pub mod calendar;
pub mod journal;
pub mod media;
pub mod progeny;
pub mod timeline;

/// Identifier of a child profile.
pub type ProgenyId = i64;
/// Row identifier of an underlying journal entity.
pub type EntityId = i64;
/// Identity-provider user id.
pub type UserId = Uuid;

/// Rejection reason for entity state that must never reach storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(&'static str),
    EndBeforeStart(&'static str),
    InvalidRecurrence(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "`{field}` must not be empty"),
            Self::EndBeforeStart(kind) => write!(f, "{kind} ends before it starts"),
            Self::InvalidRecurrence(message) => write!(f, "invalid recurrence rule: {message}"),
        }
    }
}

impl Error for ValidationError {}
