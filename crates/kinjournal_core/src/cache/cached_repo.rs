//! Cache-aside wrappers over the SQLite repositories.
//!
//! Reads go cache → store → cache. Writes are performed by callers against
//! the store (inside their own transaction) and then pushed through with
//! [`CachedRepository::refresh`] / [`CachedRepository::evict`].

use super::{item_key, progeny_list_key, read_through, write_through, CacheStore};
use crate::model::access::AccessLevel;
use crate::model::timeline::{TimeLineItem, TimelineItemType};
use crate::model::{EntityId, ProgenyId};
use crate::repo::entity_repo::{Entity, EntityRepository, RepoResult, SqliteEntityRepository};
use crate::repo::timeline_repo::{SqliteTimelineRepository, TimelineRepository, TIMELINE_TABLE};
use rusqlite::Connection;

/// Memoized repository for one entity kind.
///
/// Progeny lists are cached unfiltered and narrowed by access level on read,
/// so one cache entry serves every viewer tier.
pub struct CachedRepository<'a, E> {
    store: SqliteEntityRepository<'a, E>,
    cache: &'a dyn CacheStore,
}

impl<'a, E: Entity> CachedRepository<'a, E> {
    pub fn try_new(conn: &'a Connection, cache: &'a dyn CacheStore) -> RepoResult<Self> {
        Ok(Self {
            store: SqliteEntityRepository::try_new(conn)?,
            cache,
        })
    }

    pub fn get(&self, id: EntityId) -> RepoResult<Option<E>> {
        read_through(self.cache, &item_key(E::TABLE, id), || self.store.get(id))
    }

    /// Lists entities of one progeny visible at `min_level`.
    pub fn list_for_progeny(
        &self,
        progeny_id: ProgenyId,
        min_level: AccessLevel,
    ) -> RepoResult<Vec<E>> {
        let all = read_through(self.cache, &progeny_list_key(E::TABLE, progeny_id), || {
            self.store
                .list_for_progeny(progeny_id, AccessLevel::Private)
                .map(Some)
        })?
        .unwrap_or_default();

        Ok(all
            .into_iter()
            .filter(|entity| min_level.permits(entity.access_level()))
            .collect())
    }

    /// Pushes a committed insert/update into the cache.
    pub fn refresh(&self, entity: &E) -> RepoResult<()> {
        write_through(self.cache, &item_key(E::TABLE, entity.id()), entity);
        self.refresh_progeny_list(entity.progeny_id())
    }

    /// Drops a committed delete from the cache.
    pub fn evict(&self, id: EntityId, progeny_id: ProgenyId) -> RepoResult<()> {
        self.cache.remove(&item_key(E::TABLE, id));
        self.refresh_progeny_list(progeny_id)
    }

    pub fn refresh_progeny_list(&self, progeny_id: ProgenyId) -> RepoResult<()> {
        let all = self
            .store
            .list_for_progeny(progeny_id, AccessLevel::Private)?;
        write_through(self.cache, &progeny_list_key(E::TABLE, progeny_id), &all);
        Ok(())
    }
}

/// Memoized view of the timeline index.
pub struct CachedTimeline<'a> {
    store: SqliteTimelineRepository<'a>,
    cache: &'a dyn CacheStore,
}

impl<'a> CachedTimeline<'a> {
    pub fn try_new(conn: &'a Connection, cache: &'a dyn CacheStore) -> RepoResult<Self> {
        Ok(Self {
            store: SqliteTimelineRepository::try_new(conn)?,
            cache,
        })
    }

    /// Every row of one progeny, all access levels, oldest first.
    pub fn list_for_progeny(&self, progeny_id: ProgenyId) -> RepoResult<Vec<TimeLineItem>> {
        Ok(
            read_through(self.cache, &progeny_list_key(TIMELINE_TABLE, progeny_id), || {
                self.store.list_for_progeny(progeny_id).map(Some)
            })?
            .unwrap_or_default(),
        )
    }

    pub fn get_by_item(
        &self,
        item_type: TimelineItemType,
        item_id: EntityId,
    ) -> RepoResult<Option<TimeLineItem>> {
        read_through(self.cache, &timeline_item_key(item_type, item_id), || {
            self.store.get_by_item(item_type, item_id)
        })
    }

    pub fn refresh(&self, item: &TimeLineItem, item_id: EntityId) -> RepoResult<()> {
        write_through(self.cache, &timeline_item_key(item.item_type, item_id), item);
        self.refresh_progeny_list(item.progeny_id)
    }

    pub fn evict(
        &self,
        item_type: TimelineItemType,
        item_id: EntityId,
        progeny_id: ProgenyId,
    ) -> RepoResult<()> {
        self.cache.remove(&timeline_item_key(item_type, item_id));
        self.refresh_progeny_list(progeny_id)
    }

    pub fn refresh_progeny_list(&self, progeny_id: ProgenyId) -> RepoResult<()> {
        let items = self.store.list_for_progeny(progeny_id)?;
        write_through(
            self.cache,
            &progeny_list_key(TIMELINE_TABLE, progeny_id),
            &items,
        );
        Ok(())
    }
}

fn timeline_item_key(item_type: TimelineItemType, item_id: EntityId) -> String {
    format!("{TIMELINE_TABLE}:{}:{item_id}", item_type.as_str())
}
