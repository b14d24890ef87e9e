//! Journal write service.
//!
//! # Responsibility
//! - Add, update and delete journal entities together with their timeline
//!   row, in one SQLite transaction per call.
//! - Push committed changes through the cache.
//!
//! # Invariants
//! - An entity and its timeline row are written or rolled back together.
//! - Entities without their own display time are timed at creation.
//! - Concurrent writers are not reconciled; the last commit wins.

use crate::cache::{CacheStore, CachedRepository, CachedTimeline};
use crate::model::access::AccessLevel;
use crate::model::timeline::TimeLineItem;
use crate::model::{EntityId, ProgenyId, UserId};
use crate::repo::entity_repo::{
    Entity, EntityRepository, RepoError, RepoResult, SqliteEntityRepository,
};
use crate::repo::timeline_repo::{SqliteTimelineRepository, TimelineRepository};
use chrono::Utc;
use log::{error, info};
use rusqlite::{Connection, TransactionBehavior};
use std::time::Instant;

/// Write-side facade over every journal entity kind.
pub struct JournalService<'a> {
    conn: &'a mut Connection,
    cache: &'a dyn CacheStore,
}

impl<'a> JournalService<'a> {
    pub fn new(conn: &'a mut Connection, cache: &'a dyn CacheStore) -> Self {
        Self { conn, cache }
    }

    /// Stores a new entity and its timeline row; returns the entity with its id.
    pub fn add<E: Entity>(&mut self, entity: &E, created_by: Option<UserId>) -> RepoResult<E> {
        let started_at = Instant::now();
        let result = self.add_inner(entity, created_by);
        log_write::<E>("add", started_at, &result);
        result
    }

    /// Replaces an entity and moves its timeline row along with it.
    pub fn update<E: Entity>(&mut self, entity: &E) -> RepoResult<E> {
        let started_at = Instant::now();
        let result = self.update_inner(entity);
        log_write::<E>("update", started_at, &result);
        result
    }

    /// Deletes an entity and its timeline row; returns the deleted entity.
    pub fn delete<E: Entity>(&mut self, id: EntityId) -> RepoResult<E> {
        let started_at = Instant::now();
        let result = self.delete_inner::<E>(id);
        log_write::<E>("delete", started_at, &result);
        result
    }

    pub fn get<E: Entity>(&self, id: EntityId) -> RepoResult<Option<E>> {
        CachedRepository::<E>::try_new(&*self.conn, self.cache)?.get(id)
    }

    pub fn list<E: Entity>(
        &self,
        progeny_id: ProgenyId,
        min_level: AccessLevel,
    ) -> RepoResult<Vec<E>> {
        CachedRepository::<E>::try_new(&*self.conn, self.cache)?
            .list_for_progeny(progeny_id, min_level)
    }

    fn add_inner<E: Entity>(&mut self, entity: &E, created_by: Option<UserId>) -> RepoResult<E> {
        let mut stored = entity.clone();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let item = {
            let repo = SqliteEntityRepository::<E>::try_new(&tx)?;
            stored.set_id(repo.insert(entity)?);

            let mut item = timeline_item_for(&stored, None);
            item.created_by = created_by;
            item.time_line_id = SqliteTimelineRepository::try_new(&tx)?.insert(&item)?;
            item
        };
        tx.commit()?;

        self.write_through(&stored, &item)?;
        Ok(stored)
    }

    fn update_inner<E: Entity>(&mut self, entity: &E) -> RepoResult<E> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let (previous, item) = {
            let repo = SqliteEntityRepository::<E>::try_new(&tx)?;
            let previous = repo.get(entity.id())?.ok_or(RepoError::NotFound {
                kind: E::TABLE,
                id: entity.id(),
            })?;
            repo.update(entity)?;

            let timeline = SqliteTimelineRepository::try_new(&tx)?;
            let item = match timeline.get_by_item(E::TIMELINE_TYPE, entity.id())? {
                Some(existing) => {
                    let item = timeline_item_for(entity, Some(&existing));
                    timeline.update_for_item(&item)?;
                    item
                }
                None => {
                    let mut item = timeline_item_for(entity, None);
                    item.time_line_id = timeline.insert(&item)?;
                    item
                }
            };
            (previous, item)
        };
        tx.commit()?;

        self.write_through(entity, &item)?;
        if previous.progeny_id() != entity.progeny_id() {
            CachedRepository::<E>::try_new(&*self.conn, self.cache)?
                .refresh_progeny_list(previous.progeny_id())?;
            CachedTimeline::try_new(&*self.conn, self.cache)?
                .refresh_progeny_list(previous.progeny_id())?;
        }
        Ok(entity.clone())
    }

    fn delete_inner<E: Entity>(&mut self, id: EntityId) -> RepoResult<E> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing = {
            let repo = SqliteEntityRepository::<E>::try_new(&tx)?;
            let existing = repo.get(id)?.ok_or(RepoError::NotFound { kind: E::TABLE, id })?;
            repo.delete(id)?;

            match SqliteTimelineRepository::try_new(&tx)?.delete_by_item(E::TIMELINE_TYPE, id) {
                Ok(()) | Err(RepoError::NotFound { .. }) => {}
                Err(err) => return Err(err),
            }
            existing
        };
        tx.commit()?;

        let progeny_id = existing.progeny_id();
        CachedRepository::<E>::try_new(&*self.conn, self.cache)?.evict(id, progeny_id)?;
        CachedTimeline::try_new(&*self.conn, self.cache)?.evict(E::TIMELINE_TYPE, id, progeny_id)?;
        Ok(existing)
    }

    fn write_through<E: Entity>(&self, entity: &E, item: &TimeLineItem) -> RepoResult<()> {
        CachedRepository::<E>::try_new(&*self.conn, self.cache)?.refresh(entity)?;
        CachedTimeline::try_new(&*self.conn, self.cache)?.refresh(item, entity.id())
    }
}

/// Builds the timeline row for `entity`, keeping identity and creation
/// metadata of `existing` when there is one.
fn timeline_item_for<E: Entity>(entity: &E, existing: Option<&TimeLineItem>) -> TimeLineItem {
    let fallback_time = existing.map_or_else(Utc::now, |item| item.progeny_time);
    let mut item = TimeLineItem::for_entity(
        entity.progeny_id(),
        E::TIMELINE_TYPE,
        entity.id(),
        entity.access_level(),
        entity.timeline_time().unwrap_or(fallback_time),
    );
    if let Some(existing) = existing {
        item.time_line_id = existing.time_line_id;
        item.created_by = existing.created_by;
        item.created_time = existing.created_time;
    }
    item
}

fn log_write<E: Entity>(op: &str, started_at: Instant, result: &RepoResult<E>) {
    match result {
        Ok(entity) => info!(
            "event=entity_write module=journal status=ok op={op} kind={} id={} duration_ms={}",
            E::TABLE,
            entity.id(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=entity_write module=journal status=error op={op} kind={} duration_ms={} error={err}",
            E::TABLE,
            started_at.elapsed().as_millis()
        ),
    }
}
