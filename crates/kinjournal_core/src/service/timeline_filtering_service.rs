//! Timeline filtering by tags, categories, contexts and keywords.
//!
//! # Responsibility
//! - Narrow a candidate list of timeline rows to those whose underlying
//!   entity matches a comma-separated filter string.
//!
//! # Invariants
//! - An empty (or all-blank) filter returns the input unchanged.
//! - Output is an order-preserving subset of the input.
//! - Entity lookups are access-filtered with the viewer's grant for the
//!   row's progeny; rows of progenies without a grant never match.
//! - Malformed item ids and missing entities skip the row, never fail.
//! - Nothing is written to storage.

use crate::cache::{CacheStore, CachedRepository};
use crate::context::ViewerContext;
use crate::model::access::AccessLevel;
use crate::model::calendar::CalendarItem;
use crate::model::journal::{
    Contact, Friend, Location, Note, Skill, Vaccination, VocabularyItem,
};
use crate::model::media::{Picture, Video};
use crate::model::timeline::{TimeLineItem, TimelineItemType};
use crate::model::{EntityId, ProgenyId};
use crate::repo::entity_repo::{Entity, RepoResult};
use log::debug;
use rusqlite::Connection;
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

type MatchSet = HashSet<(TimelineItemType, EntityId)>;

/// Splits a comma-separated filter into trimmed, lowercased, non-empty terms.
pub fn split_filter_terms(filter: &str) -> Vec<String> {
    filter
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_any(haystack: &str, terms: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    terms.iter().any(|term| haystack.contains(term.as_str()))
}

/// Free-text fields a keyword filter inspects for one entity kind.
trait KeywordFields {
    fn keyword_fields(&self) -> Vec<&str>;
}

impl KeywordFields for Picture {
    fn keyword_fields(&self) -> Vec<&str> {
        vec![self.tags.as_str(), self.location.as_str(), self.description.as_str()]
    }
}

impl KeywordFields for Video {
    fn keyword_fields(&self) -> Vec<&str> {
        vec![self.tags.as_str(), self.location.as_str(), self.description.as_str()]
    }
}

impl KeywordFields for CalendarItem {
    fn keyword_fields(&self) -> Vec<&str> {
        vec![
            self.title.as_str(),
            self.notes.as_str(),
            self.location.as_str(),
            self.context.as_str(),
        ]
    }
}

impl KeywordFields for VocabularyItem {
    fn keyword_fields(&self) -> Vec<&str> {
        vec![
            self.word.as_str(),
            self.sounds_like.as_str(),
            self.description.as_str(),
            self.language.as_str(),
        ]
    }
}

impl KeywordFields for Skill {
    fn keyword_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.description.as_str(), self.category.as_str()]
    }
}

impl KeywordFields for Friend {
    fn keyword_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.description.as_str(),
            self.notes.as_str(),
            self.context.as_str(),
            self.tags.as_str(),
        ]
    }
}

impl KeywordFields for Note {
    fn keyword_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.content.as_str(), self.category.as_str()]
    }
}

impl KeywordFields for Contact {
    fn keyword_fields(&self) -> Vec<&str> {
        vec![
            self.first_name.as_str(),
            self.middle_name.as_str(),
            self.last_name.as_str(),
            self.display_name.as_str(),
            self.email.as_str(),
            self.notes.as_str(),
            self.context.as_str(),
            self.tags.as_str(),
        ]
    }
}

impl KeywordFields for Vaccination {
    fn keyword_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.description.as_str(), self.notes.as_str()]
    }
}

impl KeywordFields for Location {
    fn keyword_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.city.as_str(), self.notes.as_str(), self.tags.as_str()]
    }
}

/// Read-only filter pipeline over the cached entity repositories.
pub struct TimelineFilteringService<'a> {
    conn: &'a Connection,
    cache: &'a dyn CacheStore,
}

impl<'a> TimelineFilteringService<'a> {
    pub fn new(conn: &'a Connection, cache: &'a dyn CacheStore) -> Self {
        Self { conn, cache }
    }

    /// Keeps rows whose picture, video, friend, contact or location has a
    /// `tags` field containing any of the tags.
    pub fn filter_by_tags(
        &self,
        items: &[TimeLineItem],
        tags: &str,
        viewer: &ViewerContext,
    ) -> RepoResult<Vec<TimeLineItem>> {
        let terms = split_filter_terms(tags);
        if terms.is_empty() {
            return Ok(items.to_vec());
        }

        let started_at = Instant::now();
        let mut matched = MatchSet::new();
        for (progeny_id, level) in granted_progenies(items, viewer) {
            self.collect_matches::<Picture>(
                progeny_id,
                level,
                &terms,
                |e| e.tags.as_str(),
                &mut matched,
            )?;
            self.collect_matches::<Video>(
                progeny_id,
                level,
                &terms,
                |e| e.tags.as_str(),
                &mut matched,
            )?;
            self.collect_matches::<Friend>(
                progeny_id,
                level,
                &terms,
                |e| e.tags.as_str(),
                &mut matched,
            )?;
            self.collect_matches::<Contact>(
                progeny_id,
                level,
                &terms,
                |e| e.tags.as_str(),
                &mut matched,
            )?;
            self.collect_matches::<Location>(
                progeny_id,
                level,
                &terms,
                |e| e.tags.as_str(),
                &mut matched,
            )?;
        }
        Ok(retain_matched(items, &matched, "tags", started_at))
    }

    /// Keeps rows whose skill or note has a `category` containing any term.
    pub fn filter_by_categories(
        &self,
        items: &[TimeLineItem],
        categories: &str,
        viewer: &ViewerContext,
    ) -> RepoResult<Vec<TimeLineItem>> {
        let terms = split_filter_terms(categories);
        if terms.is_empty() {
            return Ok(items.to_vec());
        }

        let started_at = Instant::now();
        let mut matched = MatchSet::new();
        for (progeny_id, level) in granted_progenies(items, viewer) {
            self.collect_matches::<Skill>(
                progeny_id,
                level,
                &terms,
                |e| e.category.as_str(),
                &mut matched,
            )?;
            self.collect_matches::<Note>(
                progeny_id,
                level,
                &terms,
                |e| e.category.as_str(),
                &mut matched,
            )?;
        }
        Ok(retain_matched(items, &matched, "categories", started_at))
    }

    /// Keeps rows whose calendar item, friend or contact has a `context`
    /// containing any term.
    pub fn filter_by_contexts(
        &self,
        items: &[TimeLineItem],
        contexts: &str,
        viewer: &ViewerContext,
    ) -> RepoResult<Vec<TimeLineItem>> {
        let terms = split_filter_terms(contexts);
        if terms.is_empty() {
            return Ok(items.to_vec());
        }

        let started_at = Instant::now();
        let mut matched = MatchSet::new();
        for (progeny_id, level) in granted_progenies(items, viewer) {
            self.collect_matches::<CalendarItem>(
                progeny_id,
                level,
                &terms,
                |e| e.context.as_str(),
                &mut matched,
            )?;
            self.collect_matches::<Friend>(
                progeny_id,
                level,
                &terms,
                |e| e.context.as_str(),
                &mut matched,
            )?;
            self.collect_matches::<Contact>(
                progeny_id,
                level,
                &terms,
                |e| e.context.as_str(),
                &mut matched,
            )?;
        }
        Ok(retain_matched(items, &matched, "contexts", started_at))
    }

    /// Keeps rows whose underlying entity mentions any keyword in one of its
    /// free-text fields. Measurement and sleep rows never match.
    pub fn filter_by_keywords(
        &self,
        items: &[TimeLineItem],
        keywords: &str,
        viewer: &ViewerContext,
    ) -> RepoResult<Vec<TimeLineItem>> {
        let terms = split_filter_terms(keywords);
        if terms.is_empty() {
            return Ok(items.to_vec());
        }

        let started_at = Instant::now();
        let mut kept = Vec::new();
        for item in items {
            let Some(level) = viewer.access_level_for(item.progeny_id) else {
                continue;
            };
            if self.keyword_match(item, level, &terms)? {
                kept.push(item.clone());
            }
        }
        log_filter("keywords", items.len(), kept.len(), started_at);
        Ok(kept)
    }

    fn collect_matches<E: Entity>(
        &self,
        progeny_id: ProgenyId,
        level: AccessLevel,
        terms: &[String],
        field: fn(&E) -> &str,
        matched: &mut MatchSet,
    ) -> RepoResult<()> {
        let repo = CachedRepository::<E>::try_new(self.conn, self.cache)?;
        for entity in repo.list_for_progeny(progeny_id, level)? {
            if contains_any(field(&entity), terms) {
                matched.insert((E::TIMELINE_TYPE, entity.id()));
            }
        }
        Ok(())
    }

    fn keyword_match(
        &self,
        item: &TimeLineItem,
        level: AccessLevel,
        terms: &[String],
    ) -> RepoResult<bool> {
        let Some(id) = item.entity_id() else {
            debug!(
                "event=timeline_skip module=timeline status=skip reason=malformed_item_id kind={}",
                item.item_type.as_str()
            );
            return Ok(false);
        };

        let matched = match item.item_type {
            TimelineItemType::Photo => self.entity_matches::<Picture>(id, level, terms)?,
            TimelineItemType::Video => self.entity_matches::<Video>(id, level, terms)?,
            TimelineItemType::Calendar => self.entity_matches::<CalendarItem>(id, level, terms)?,
            TimelineItemType::Vocabulary => {
                self.entity_matches::<VocabularyItem>(id, level, terms)?
            }
            TimelineItemType::Skill => self.entity_matches::<Skill>(id, level, terms)?,
            TimelineItemType::Friend => self.entity_matches::<Friend>(id, level, terms)?,
            TimelineItemType::Note => self.entity_matches::<Note>(id, level, terms)?,
            TimelineItemType::Contact => self.entity_matches::<Contact>(id, level, terms)?,
            TimelineItemType::Vaccination => {
                self.entity_matches::<Vaccination>(id, level, terms)?
            }
            TimelineItemType::Location => self.entity_matches::<Location>(id, level, terms)?,
            TimelineItemType::Measurement | TimelineItemType::Sleep => Some(false),
        };

        Ok(matched.unwrap_or_else(|| {
            debug!(
                "event=timeline_skip module=timeline status=skip reason=entity_missing kind={} id={id}",
                item.item_type.as_str()
            );
            false
        }))
    }

    /// `None` when the entity is missing or not visible at `level`.
    fn entity_matches<E: Entity + KeywordFields>(
        &self,
        id: EntityId,
        level: AccessLevel,
        terms: &[String],
    ) -> RepoResult<Option<bool>> {
        let repo = CachedRepository::<E>::try_new(self.conn, self.cache)?;
        Ok(repo
            .get(id)?
            .filter(|entity| level.permits(entity.access_level()))
            .map(|entity| {
                entity
                    .keyword_fields()
                    .into_iter()
                    .any(|field| contains_any(field, terms))
            }))
    }
}

/// Distinct progenies present in `items` that the viewer holds a grant on.
fn granted_progenies(
    items: &[TimeLineItem],
    viewer: &ViewerContext,
) -> BTreeMap<ProgenyId, AccessLevel> {
    items
        .iter()
        .filter_map(|item| {
            viewer
                .access_level_for(item.progeny_id)
                .map(|level| (item.progeny_id, level))
        })
        .collect()
}

fn retain_matched(
    items: &[TimeLineItem],
    matched: &MatchSet,
    filter_kind: &str,
    started_at: Instant,
) -> Vec<TimeLineItem> {
    let kept: Vec<TimeLineItem> = items
        .iter()
        .filter(|item| match item.entity_id() {
            Some(id) => matched.contains(&(item.item_type, id)),
            None => {
                debug!(
                    "event=timeline_skip module=timeline status=skip reason=malformed_item_id kind={}",
                    item.item_type.as_str()
                );
                false
            }
        })
        .cloned()
        .collect();
    log_filter(filter_kind, items.len(), kept.len(), started_at);
    kept
}

fn log_filter(filter_kind: &str, candidates: usize, kept: usize, started_at: Instant) {
    debug!(
        "event=timeline_filter module=timeline status=ok filter={filter_kind} candidates={candidates} kept={kept} duration_ms={}",
        started_at.elapsed().as_millis()
    );
}

#[cfg(test)]
mod tests {
    use super::{contains_any, split_filter_terms};

    #[test]
    fn split_trims_lowercases_and_drops_blanks() {
        assert_eq!(
            split_filter_terms(" Dog , ,PARK,  "),
            vec!["dog".to_string(), "park".to_string()]
        );
        assert!(split_filter_terms(" , ").is_empty());
        assert!(split_filter_terms("").is_empty());
    }

    #[test]
    fn contains_any_is_case_insensitive_substring() {
        let terms = split_filter_terms("dog");
        assert!(contains_any("Hotdog,Park", &terms));
        assert!(!contains_any("cat,park", &terms));
    }
}
