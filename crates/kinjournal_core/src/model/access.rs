//! Visibility tiers and per-child access grants.

use super::{ProgenyId, UserId};
use serde::{Deserialize, Serialize};

/// Visibility tier. Lower values are more private.
///
/// An item is visible to a viewer when the item's level is greater than or
/// equal to the level granted to that viewer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Parents/admins only.
    #[default]
    Private = 0,
    Family = 1,
    Caretakers = 2,
    Friends = 3,
    /// Any registered user.
    Users = 4,
    Public = 5,
}

impl AccessLevel {
    pub const ALL: [AccessLevel; 6] = [
        Self::Private,
        Self::Family,
        Self::Caretakers,
        Self::Friends,
        Self::Users,
        Self::Public,
    ];

    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_i64() == value)
    }

    /// Returns whether a viewer holding `self` may see an item at `item_level`.
    pub fn permits(self, item_level: AccessLevel) -> bool {
        item_level >= self
    }
}

/// Grant giving one user one access level on one progeny.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccess {
    pub access_id: i64,
    pub progeny_id: ProgenyId,
    pub user_id: UserId,
    pub access_level: AccessLevel,
}

#[cfg(test)]
mod tests {
    use super::AccessLevel;

    #[test]
    fn permits_equal_or_more_public_items() {
        assert!(AccessLevel::Family.permits(AccessLevel::Family));
        assert!(AccessLevel::Family.permits(AccessLevel::Public));
        assert!(!AccessLevel::Family.permits(AccessLevel::Private));
        assert!(AccessLevel::Private.permits(AccessLevel::Private));
    }

    #[test]
    fn from_i64_rejects_unknown_levels() {
        assert_eq!(AccessLevel::from_i64(3), Some(AccessLevel::Friends));
        assert_eq!(AccessLevel::from_i64(6), None);
        assert_eq!(AccessLevel::from_i64(-1), None);
    }
}
