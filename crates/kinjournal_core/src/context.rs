//! Request-scoped viewer context.
//!
//! # Responsibility
//! - Carry who is looking, in which time zone, and which access level they
//!   hold on each progeny, as one explicit value.
//!
//! # Invariants
//! - A progeny absent from `grants` contributes nothing to any feed.

use crate::model::access::AccessLevel;
use crate::model::timeline::TimeLineItem;
use crate::model::{ProgenyId, UserId};
use crate::repo::access_repo::{AccessRepository, SqliteAccessRepository};
use crate::repo::entity_repo::RepoResult;
use chrono_tz::Tz;
use rusqlite::Connection;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerContext {
    pub user_id: UserId,
    pub time_zone: Tz,
    grants: BTreeMap<ProgenyId, AccessLevel>,
}

impl ViewerContext {
    pub fn new(user_id: UserId, time_zone: Tz) -> Self {
        Self {
            user_id,
            time_zone,
            grants: BTreeMap::new(),
        }
    }

    pub fn with_grant(mut self, progeny_id: ProgenyId, level: AccessLevel) -> Self {
        self.grants.insert(progeny_id, level);
        self
    }

    /// Builds the context from the user's persisted grants.
    pub fn load(conn: &Connection, user_id: UserId, time_zone: Tz) -> RepoResult<Self> {
        let repo = SqliteAccessRepository::new(conn);
        let grants = repo
            .grants_for_user(user_id)?
            .into_iter()
            .map(|grant| (grant.progeny_id, grant.access_level))
            .collect();
        Ok(Self {
            user_id,
            time_zone,
            grants,
        })
    }

    pub fn access_level_for(&self, progeny_id: ProgenyId) -> Option<AccessLevel> {
        self.grants.get(&progeny_id).copied()
    }

    pub fn can_view(&self, item: &TimeLineItem) -> bool {
        self.access_level_for(item.progeny_id)
            .is_some_and(|level| level.permits(item.access_level))
    }

    pub fn progeny_ids(&self) -> impl Iterator<Item = ProgenyId> + '_ {
        self.grants.keys().copied()
    }

    /// The requested progenies, or every granted one when none are named.
    pub fn progeny_or_all(&self, requested: Vec<ProgenyId>) -> Vec<ProgenyId> {
        if requested.is_empty() {
            self.progeny_ids().collect()
        } else {
            requested
        }
    }
}
