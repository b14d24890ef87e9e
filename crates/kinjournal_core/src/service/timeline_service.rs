//! Timeline feed aggregation.
//!
//! # Responsibility
//! - Gather timeline rows and recurring calendar projections for the
//!   requested progenies, narrow them by access, time and filters, then
//!   sort and paginate into a [`FeedPage`].
//!
//! # Invariants
//! - Every returned entry has `progeny_time <= now`.
//! - Every returned entry satisfies the viewer's grant for its progeny.
//! - Progenies without a grant contribute nothing.
//! - Projections are never persisted.
//! - `remaining_count` is never negative.

use super::timeline_filtering_service::TimelineFilteringService;
use crate::cache::{CacheStore, CachedRepository, CachedTimeline};
use crate::config::FeedSettings;
use crate::context::ViewerContext;
use crate::model::calendar::CalendarItem;
use crate::model::timeline::{TimeLineItem, TimelineItemType};
use crate::model::ProgenyId;
use crate::repo::entity_repo::{Entity, RepoResult};
use crate::timezone::{to_viewer_time, viewer_date};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use log::info;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

/// Comma-separated filter strings. Blank strings are inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedFilter {
    pub tags: String,
    pub categories: String,
    pub contexts: String,
    pub keywords: String,
}

impl FeedFilter {
    pub fn is_empty(&self) -> bool {
        [&self.tags, &self.categories, &self.contexts, &self.keywords]
            .iter()
            .all(|value| value.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedRequest {
    pub progeny_ids: Vec<ProgenyId>,
    pub filter: FeedFilter,
    pub sort: SortOrder,
    pub skip: usize,
    /// `0` selects the configured default page size.
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub item: TimeLineItem,
    /// `item.progeny_time` in the viewer's time zone.
    pub local_time: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedPage {
    pub entries: Vec<FeedEntry>,
    pub total_count: usize,
    pub remaining_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnThisDayPeriod {
    Week,
    Month,
    Quarter,
    Year,
}

impl OnThisDayPeriod {
    /// Whether `date` recurs with `today` under this period. `today` itself
    /// never matches.
    pub fn matches(self, date: NaiveDate, today: NaiveDate) -> bool {
        if date >= today {
            return false;
        }
        match self {
            Self::Week => date.weekday() == today.weekday(),
            Self::Month => date.day() == today.day(),
            Self::Quarter => {
                date.day() == today.day() && (today.month() + 12 - date.month()) % 3 == 0
            }
            Self::Year => date.day() == today.day() && date.month() == today.month(),
        }
    }
}

/// Read-only feed pipeline over the cached timeline.
pub struct TimelineService<'a> {
    conn: &'a Connection,
    cache: &'a dyn CacheStore,
    settings: FeedSettings,
    clock: fn() -> DateTime<Utc>,
}

impl<'a> TimelineService<'a> {
    pub fn new(conn: &'a Connection, cache: &'a dyn CacheStore) -> Self {
        Self {
            conn,
            cache,
            settings: FeedSettings::default(),
            clock: Utc::now,
        }
    }

    pub fn with_settings(mut self, settings: FeedSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the wall clock used for the "not in the future" cut-off.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds one page of the viewer's feed.
    pub fn get_feed(&self, viewer: &ViewerContext, request: &FeedRequest) -> RepoResult<FeedPage> {
        let started_at = Instant::now();
        let now = (self.clock)();
        let candidates = self.gather(viewer, &request.progeny_ids, now)?;
        let page = self.finish(viewer, request, candidates)?;
        log_query("feed", request, &page, started_at);
        Ok(page)
    }

    /// Like [`Self::get_feed`], restricted to entries whose viewer-local date
    /// recurs with today's date under `period`.
    pub fn on_this_day(
        &self,
        viewer: &ViewerContext,
        request: &FeedRequest,
        period: OnThisDayPeriod,
    ) -> RepoResult<FeedPage> {
        let started_at = Instant::now();
        let now = (self.clock)();
        let today = viewer_date(now, viewer.time_zone);
        let candidates: Vec<TimeLineItem> = self
            .gather(viewer, &request.progeny_ids, now)?
            .into_iter()
            .filter(|item| period.matches(viewer_date(item.progeny_time, viewer.time_zone), today))
            .collect();
        let page = self.finish(viewer, request, candidates)?;
        log_query("on_this_day", request, &page, started_at);
        Ok(page)
    }

    fn gather(
        &self,
        viewer: &ViewerContext,
        progeny_ids: &[ProgenyId],
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<TimeLineItem>> {
        let timeline = CachedTimeline::try_new(self.conn, self.cache)?;
        let calendar = CachedRepository::<CalendarItem>::try_new(self.conn, self.cache)?;

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for &progeny_id in progeny_ids {
            if !seen.insert(progeny_id) {
                continue;
            }
            let Some(level) = viewer.access_level_for(progeny_id) else {
                continue;
            };

            items.extend(
                timeline
                    .list_for_progeny(progeny_id)?
                    .into_iter()
                    .filter(|item| item.progeny_time <= now && viewer.can_view(item)),
            );

            for event in calendar.list_for_progeny(progeny_id, level)? {
                items.extend(
                    event
                        .occurrences_until(now)
                        .into_iter()
                        .map(|at| calendar_projection(&event, at)),
                );
            }
        }
        Ok(items)
    }

    fn finish(
        &self,
        viewer: &ViewerContext,
        request: &FeedRequest,
        candidates: Vec<TimeLineItem>,
    ) -> RepoResult<FeedPage> {
        let mut items = if request.filter.is_empty() {
            candidates
        } else {
            self.apply_filters(viewer, &request.filter, &candidates)?
        };

        // Stable sorts; equal timestamps keep gathering order either way.
        match request.sort {
            SortOrder::Newest => items.sort_by(|a, b| b.progeny_time.cmp(&a.progeny_time)),
            SortOrder::Oldest => items.sort_by_key(|item| item.progeny_time),
        }

        let total_count = items.len();
        let count = self.settings.page_size(request.count);
        let entries = items
            .into_iter()
            .skip(request.skip)
            .take(count)
            .map(|item| FeedEntry {
                local_time: to_viewer_time(item.progeny_time, viewer.time_zone),
                item,
            })
            .collect();

        Ok(FeedPage {
            entries,
            total_count,
            remaining_count: total_count.saturating_sub(request.skip.saturating_add(count)),
        })
    }

    /// Union of every active filter, deduplicated in candidate order.
    fn apply_filters(
        &self,
        viewer: &ViewerContext,
        filter: &FeedFilter,
        candidates: &[TimeLineItem],
    ) -> RepoResult<Vec<TimeLineItem>> {
        let filtering = TimelineFilteringService::new(self.conn, self.cache);
        let mut matched = Vec::new();
        if !filter.tags.trim().is_empty() {
            matched.extend(filtering.filter_by_tags(candidates, &filter.tags, viewer)?);
        }
        if !filter.categories.trim().is_empty() {
            matched.extend(filtering.filter_by_categories(
                candidates,
                &filter.categories,
                viewer,
            )?);
        }
        if !filter.contexts.trim().is_empty() {
            matched.extend(filtering.filter_by_contexts(candidates, &filter.contexts, viewer)?);
        }
        if !filter.keywords.trim().is_empty() {
            matched.extend(filtering.filter_by_keywords(candidates, &filter.keywords, viewer)?);
        }

        let mut seen = HashSet::new();
        matched.retain(|item| {
            let (item_type, item_id, at) = item.feed_key();
            seen.insert((item_type, item_id.to_string(), at))
        });
        Ok(matched)
    }
}

/// Transient feed row for one repetition of a recurring event.
fn calendar_projection(event: &CalendarItem, at: DateTime<Utc>) -> TimeLineItem {
    TimeLineItem::for_entity(
        event.progeny_id,
        TimelineItemType::Calendar,
        event.id(),
        event.access_level,
        at,
    )
}

fn log_query(kind: &str, request: &FeedRequest, page: &FeedPage, started_at: Instant) {
    info!(
        "event=feed_query module=timeline status=ok kind={kind} progenies={} filtered={} skip={} returned={} total={} remaining={} duration_ms={}",
        request.progeny_ids.len(),
        !request.filter.is_empty(),
        request.skip,
        page.entries.len(),
        page.total_count,
        page.remaining_count,
        started_at.elapsed().as_millis()
    );
}

#[cfg(test)]
mod tests {
    use super::{FeedFilter, OnThisDayPeriod};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn blank_filter_is_empty() {
        let mut filter = FeedFilter {
            tags: "  ".to_string(),
            ..FeedFilter::default()
        };
        assert!(filter.is_empty());
        filter.keywords = "park".to_string();
        assert!(!filter.is_empty());
    }

    #[test]
    fn on_this_day_periods() {
        let today = date(2024, 7, 15);
        assert!(OnThisDayPeriod::Year.matches(date(2021, 7, 15), today));
        assert!(!OnThisDayPeriod::Year.matches(date(2021, 6, 15), today));
        assert!(OnThisDayPeriod::Month.matches(date(2024, 2, 15), today));
        assert!(OnThisDayPeriod::Quarter.matches(date(2024, 4, 15), today));
        assert!(OnThisDayPeriod::Quarter.matches(date(2023, 10, 15), today));
        assert!(!OnThisDayPeriod::Quarter.matches(date(2024, 5, 15), today));
        assert!(OnThisDayPeriod::Week.matches(date(2024, 7, 8), today));
        assert!(!OnThisDayPeriod::Week.matches(date(2024, 7, 9), today));
    }

    #[test]
    fn today_and_future_never_match() {
        let today = date(2024, 7, 15);
        assert!(!OnThisDayPeriod::Year.matches(today, today));
        assert!(!OnThisDayPeriod::Week.matches(date(2024, 7, 22), today));
    }
}
