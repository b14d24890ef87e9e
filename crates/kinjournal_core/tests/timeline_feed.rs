use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use kinjournal_core::model::calendar::{CalendarItem, RecurrenceFrequency, RecurrenceRule};
use kinjournal_core::model::journal::{Friend, Note, Skill};
use kinjournal_core::model::media::Picture;
use kinjournal_core::model::progeny::Progeny;
use kinjournal_core::repo::access_repo::{AccessRepository, SqliteAccessRepository};
use kinjournal_core::{
    open_db_in_memory, AccessLevel, FeedFilter, FeedRequest, FeedSettings, JournalService,
    MemoryCache, OnThisDayPeriod, ProgenyId, SortOrder, TimeLineItem, TimelineItemType,
    TimelineService, ViewerContext,
};
use rusqlite::Connection;
use std::time::Duration as StdDuration;
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

struct Fixture {
    conn: Connection,
    cache: MemoryCache,
    ada: ProgenyId,
    bo: ProgenyId,
}

impl Fixture {
    fn new() -> Self {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteAccessRepository::new(&conn);
        let ada = repo.create_progeny(&Progeny::new("Ada")).unwrap();
        let bo = repo.create_progeny(&Progeny::new("Bo")).unwrap();
        Self {
            conn,
            cache: MemoryCache::new(StdDuration::from_secs(60), 1_000),
            ada,
            bo,
        }
    }

    fn picture(
        &mut self,
        progeny_id: ProgenyId,
        level: AccessLevel,
        at: DateTime<Utc>,
        tags: &str,
    ) -> Picture {
        let picture = Picture {
            progeny_id,
            access_level: level,
            picture_time: Some(at),
            tags: tags.to_string(),
            ..Picture::default()
        };
        JournalService::new(&mut self.conn, &self.cache)
            .add(&picture, None)
            .unwrap()
    }

    fn service(&self) -> TimelineService<'_> {
        TimelineService::new(&self.conn, &self.cache).with_clock(now)
    }
}

fn viewer() -> ViewerContext {
    ViewerContext::new(Uuid::new_v4(), Tz::UTC)
}

fn request(progeny_ids: Vec<ProgenyId>) -> FeedRequest {
    FeedRequest {
        progeny_ids,
        count: 50,
        ..FeedRequest::default()
    }
}

fn times(entries: &[kinjournal_core::FeedEntry]) -> Vec<DateTime<Utc>> {
    entries.iter().map(|entry| entry.item.progeny_time).collect()
}

#[test]
fn newest_first_by_default_and_reversed_for_oldest() {
    let mut fx = Fixture::new();
    for at in [day(2024, 6, 1), day(2024, 1, 1), day(2024, 12, 1)] {
        fx.picture(fx.ada, AccessLevel::Private, at, "");
    }
    let viewer = viewer().with_grant(fx.ada, AccessLevel::Private);

    let page = fx.service().get_feed(&viewer, &request(vec![fx.ada])).unwrap();
    assert_eq!(
        times(&page.entries),
        vec![day(2024, 12, 1), day(2024, 6, 1), day(2024, 1, 1)]
    );
    assert_eq!(page.total_count, 3);
    assert_eq!(page.remaining_count, 0);

    let oldest = FeedRequest {
        sort: SortOrder::Oldest,
        ..request(vec![fx.ada])
    };
    let page = fx.service().get_feed(&viewer, &oldest).unwrap();
    assert_eq!(
        times(&page.entries),
        vec![day(2024, 1, 1), day(2024, 6, 1), day(2024, 12, 1)]
    );
}

#[test]
fn equal_timestamps_keep_insertion_order_in_both_directions() {
    let mut fx = Fixture::new();
    let at = day(2024, 6, 1);
    let first = fx.picture(fx.ada, AccessLevel::Private, at, "");
    let second = fx.picture(fx.ada, AccessLevel::Private, at, "");
    fx.picture(fx.ada, AccessLevel::Private, day(2024, 1, 1), "");
    let viewer = viewer().with_grant(fx.ada, AccessLevel::Private);
    let expected = vec![first.picture_id.to_string(), second.picture_id.to_string()];

    for sort in [SortOrder::Newest, SortOrder::Oldest] {
        let request = FeedRequest {
            sort,
            ..request(vec![fx.ada])
        };
        let page = fx.service().get_feed(&viewer, &request).unwrap();
        let tied: Vec<String> = page
            .entries
            .iter()
            .filter(|entry| entry.item.progeny_time == at)
            .map(|entry| entry.item.item_id.clone())
            .collect();
        assert_eq!(tied, expected, "{sort:?}");
    }
}

#[test]
fn future_entries_never_appear() {
    let mut fx = Fixture::new();
    fx.picture(fx.ada, AccessLevel::Private, day(2024, 12, 31), "");
    fx.picture(fx.ada, AccessLevel::Private, day(2025, 1, 2), "");
    let viewer = viewer().with_grant(fx.ada, AccessLevel::Private);

    let page = fx.service().get_feed(&viewer, &request(vec![fx.ada])).unwrap();

    assert_eq!(times(&page.entries), vec![day(2024, 12, 31)]);
    assert!(page.entries.iter().all(|e| e.item.progeny_time <= now()));
}

#[test]
fn entries_respect_the_grant_of_their_progeny() {
    let mut fx = Fixture::new();
    for level in AccessLevel::ALL {
        fx.picture(fx.ada, level, day(2024, 3, 1), "");
        fx.picture(fx.bo, level, day(2024, 3, 2), "");
    }
    let viewer = viewer()
        .with_grant(fx.ada, AccessLevel::Friends)
        .with_grant(fx.bo, AccessLevel::Family);

    let page = fx
        .service()
        .get_feed(&viewer, &request(vec![fx.ada, fx.bo]))
        .unwrap();

    for entry in &page.entries {
        let granted = viewer.access_level_for(entry.item.progeny_id).unwrap();
        assert!(entry.item.access_level >= granted);
    }
    let ada_count = page.entries.iter().filter(|e| e.item.progeny_id == fx.ada).count();
    let bo_count = page.entries.iter().filter(|e| e.item.progeny_id == fx.bo).count();
    assert_eq!(ada_count, 3);
    assert_eq!(bo_count, 5);
}

#[test]
fn progeny_without_grant_contributes_nothing() {
    let mut fx = Fixture::new();
    fx.picture(fx.ada, AccessLevel::Public, day(2024, 3, 1), "");
    fx.picture(fx.bo, AccessLevel::Public, day(2024, 3, 1), "");
    let viewer = viewer().with_grant(fx.ada, AccessLevel::Private);

    let page = fx
        .service()
        .get_feed(&viewer, &request(vec![fx.ada, fx.bo]))
        .unwrap();

    assert_eq!(page.total_count, 1);
    assert_eq!(page.entries[0].item.progeny_id, fx.ada);
}

#[test]
fn consecutive_pages_are_disjoint_and_ordered() {
    let mut fx = Fixture::new();
    for month in 1..=10 {
        fx.picture(fx.ada, AccessLevel::Private, day(2024, month, 1), "");
    }
    let viewer = viewer().with_grant(fx.ada, AccessLevel::Private);
    let full = fx.service().get_feed(&viewer, &request(vec![fx.ada])).unwrap();

    let page = |skip| FeedRequest {
        skip,
        count: 4,
        ..request(vec![fx.ada])
    };
    let first = fx.service().get_feed(&viewer, &page(0)).unwrap();
    let second = fx.service().get_feed(&viewer, &page(4)).unwrap();

    assert_eq!(first.remaining_count, 6);
    assert_eq!(second.remaining_count, 2);
    let mut joined = times(&first.entries);
    joined.extend(times(&second.entries));
    assert_eq!(joined, times(&full.entries[..8]));

    let past_end = fx.service().get_feed(&viewer, &page(40)).unwrap();
    assert!(past_end.entries.is_empty());
    assert_eq!(past_end.remaining_count, 0);
}

#[test]
fn zero_count_uses_default_and_large_counts_are_clamped() {
    let mut fx = Fixture::new();
    for d in 1..=12 {
        fx.picture(fx.ada, AccessLevel::Private, day(2024, 2, d), "");
    }
    let viewer = viewer().with_grant(fx.ada, AccessLevel::Private);
    let service = fx.service().with_settings(FeedSettings {
        default_count: 3,
        max_count: 10,
    });

    let default_page = service
        .get_feed(&viewer, &FeedRequest { count: 0, ..request(vec![fx.ada]) })
        .unwrap();
    assert_eq!(default_page.entries.len(), 3);
    assert_eq!(default_page.remaining_count, 9);

    let clamped = service
        .get_feed(&viewer, &FeedRequest { count: 500, ..request(vec![fx.ada]) })
        .unwrap();
    assert_eq!(clamped.entries.len(), 10);
    assert_eq!(clamped.remaining_count, 2);
}

#[test]
fn local_time_is_in_the_viewer_zone() {
    let mut fx = Fixture::new();
    let taken = Utc.with_ymd_and_hms(2024, 7, 1, 22, 30, 0).unwrap();
    fx.picture(fx.ada, AccessLevel::Private, taken, "");
    let viewer = ViewerContext::new(Uuid::new_v4(), Tz::Asia__Tokyo)
        .with_grant(fx.ada, AccessLevel::Private);

    let page = fx.service().get_feed(&viewer, &request(vec![fx.ada])).unwrap();
    let local = page.entries[0].local_time;

    assert_eq!(local.offset().local_minus_utc(), 9 * 3600);
    assert_eq!(local.to_rfc3339(), "2024-07-02T07:30:00+09:00");
    assert_eq!(page.entries[0].item.progeny_time, taken);
}

#[test]
fn recurring_events_are_projected_up_to_now() {
    let mut fx = Fixture::new();
    let mut rule = RecurrenceRule::new(RecurrenceFrequency::Monthly);
    rule.count = Some(20);
    let event = CalendarItem {
        progeny_id: fx.ada,
        access_level: AccessLevel::Family,
        title: "Swim class".to_string(),
        start_time: day(2024, 9, 15),
        recurrence: Some(rule),
        ..CalendarItem::default()
    };
    let event = JournalService::new(&mut fx.conn, &fx.cache)
        .add(&event, None)
        .unwrap();
    let viewer = viewer().with_grant(fx.ada, AccessLevel::Family);

    let page = fx.service().get_feed(&viewer, &request(vec![fx.ada])).unwrap();

    assert_eq!(
        times(&page.entries),
        vec![day(2024, 12, 15), day(2024, 11, 15), day(2024, 10, 15), day(2024, 9, 15)]
    );
    let id = event.event_id.to_string();
    assert!(page
        .entries
        .iter()
        .all(|e| e.item.item_type == TimelineItemType::Calendar && e.item.item_id == id));
    assert_eq!(page.entries.iter().filter(|e| e.item.is_projection()).count(), 3);

    let stored: i64 = fx
        .conn
        .query_row("SELECT COUNT(*) FROM timeline_items;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored, 1);
}

#[test]
fn long_running_daily_event_reaches_the_present() {
    let mut fx = Fixture::new();
    let event = CalendarItem {
        progeny_id: fx.ada,
        access_level: AccessLevel::Family,
        title: "Bedtime story".to_string(),
        start_time: day(2020, 1, 1),
        recurrence: Some(RecurrenceRule::new(RecurrenceFrequency::Daily)),
        ..CalendarItem::default()
    };
    JournalService::new(&mut fx.conn, &fx.cache)
        .add(&event, None)
        .unwrap();
    let viewer = viewer().with_grant(fx.ada, AccessLevel::Family);

    let page = fx.service().get_feed(&viewer, &request(vec![fx.ada])).unwrap();

    let latest = &page.entries[0].item;
    assert!(latest.is_projection());
    assert_eq!(latest.progeny_time, day(2024, 12, 31));
    assert!(now() - latest.progeny_time <= Duration::days(1));
    assert_eq!(
        times(&page.entries[..2]),
        vec![day(2024, 12, 31), day(2024, 12, 30)]
    );
    // Stored original plus the newest 1000 projections.
    assert_eq!(page.total_count, 1001);
}

#[test]
fn hidden_recurring_events_are_not_projected() {
    let mut fx = Fixture::new();
    let event = CalendarItem {
        progeny_id: fx.ada,
        access_level: AccessLevel::Private,
        title: "Checkup".to_string(),
        start_time: day(2024, 10, 1),
        recurrence: Some(RecurrenceRule::new(RecurrenceFrequency::Weekly)),
        ..CalendarItem::default()
    };
    JournalService::new(&mut fx.conn, &fx.cache)
        .add(&event, None)
        .unwrap();
    let viewer = viewer().with_grant(fx.ada, AccessLevel::Friends);

    let page = fx.service().get_feed(&viewer, &request(vec![fx.ada])).unwrap();
    assert!(page.entries.is_empty());
}

#[test]
fn filters_are_united_and_deduplicated() {
    let mut fx = Fixture::new();
    fx.picture(fx.ada, AccessLevel::Private, day(2024, 4, 1), "dog,park");
    fx.picture(fx.ada, AccessLevel::Private, day(2024, 4, 2), "cat");
    let mut journal = JournalService::new(&mut fx.conn, &fx.cache);
    journal
        .add(
            &Skill {
                progeny_id: fx.ada,
                name: "Crawling".to_string(),
                category: "Motor".to_string(),
                first_observation: Some(day(2024, 4, 3)),
                ..Skill::default()
            },
            None,
        )
        .unwrap();
    journal
        .add(
            &Friend {
                progeny_id: fx.ada,
                name: "Rex".to_string(),
                context: "Kindergarten".to_string(),
                tags: "dog".to_string(),
                friend_since: Some(day(2024, 4, 4)),
                ..Friend::default()
            },
            None,
        )
        .unwrap();
    journal
        .add(
            &Note {
                progeny_id: fx.ada,
                title: "Rainy day".to_string(),
                created_date: day(2024, 4, 5),
                ..Note::default()
            },
            None,
        )
        .unwrap();
    drop(journal);
    let viewer = viewer().with_grant(fx.ada, AccessLevel::Private);

    let filtered = FeedRequest {
        filter: FeedFilter {
            tags: "dog".to_string(),
            categories: "motor".to_string(),
            contexts: "kindergarten".to_string(),
            ..FeedFilter::default()
        },
        ..request(vec![fx.ada])
    };
    let page = fx.service().get_feed(&viewer, &filtered).unwrap();

    assert_eq!(
        times(&page.entries),
        vec![day(2024, 4, 4), day(2024, 4, 3), day(2024, 4, 1)]
    );
    assert_eq!(page.total_count, 3);
}

#[test]
fn filtered_projections_follow_their_event() {
    let mut fx = Fixture::new();
    let mut rule = RecurrenceRule::new(RecurrenceFrequency::Weekly);
    rule.count = Some(3);
    let event = CalendarItem {
        progeny_id: fx.ada,
        title: "Playgroup".to_string(),
        context: "Library".to_string(),
        start_time: day(2024, 11, 1),
        recurrence: Some(rule),
        ..CalendarItem::default()
    };
    JournalService::new(&mut fx.conn, &fx.cache)
        .add(&event, None)
        .unwrap();
    fx.picture(fx.ada, AccessLevel::Private, day(2024, 11, 2), "library");
    let viewer = viewer().with_grant(fx.ada, AccessLevel::Private);

    let page = fx
        .service()
        .get_feed(
            &viewer,
            &FeedRequest {
                filter: FeedFilter {
                    contexts: "library".to_string(),
                    ..FeedFilter::default()
                },
                ..request(vec![fx.ada])
            },
        )
        .unwrap();

    assert_eq!(
        times(&page.entries),
        vec![day(2024, 11, 15), day(2024, 11, 8), day(2024, 11, 1)]
    );
}

#[test]
fn on_this_day_matches_earlier_years_only() {
    let mut fx = Fixture::new();
    for year in [2023, 2022] {
        let morning = Utc.with_ymd_and_hms(year, 1, 1, 9, 0, 0).unwrap();
        fx.picture(fx.ada, AccessLevel::Private, morning, "");
    }
    fx.picture(fx.ada, AccessLevel::Private, day(2022, 1, 2), "");
    fx.picture(fx.ada, AccessLevel::Private, day(2024, 7, 1), "");
    let viewer = viewer().with_grant(fx.ada, AccessLevel::Private);

    let page = fx
        .service()
        .on_this_day(&viewer, &request(vec![fx.ada]), OnThisDayPeriod::Year)
        .unwrap();
    assert_eq!(page.total_count, 2);

    let monthly = fx
        .service()
        .on_this_day(&viewer, &request(vec![fx.ada]), OnThisDayPeriod::Month)
        .unwrap();
    assert_eq!(monthly.total_count, 3);
}

#[test]
fn feed_reads_are_served_from_cache_until_refreshed() {
    let mut fx = Fixture::new();
    fx.picture(fx.ada, AccessLevel::Private, day(2024, 5, 5), "");
    let viewer = viewer().with_grant(fx.ada, AccessLevel::Private);
    assert_eq!(
        fx.service().get_feed(&viewer, &request(vec![fx.ada])).unwrap().total_count,
        1
    );

    fx.conn.execute("DELETE FROM timeline_items;", []).unwrap();
    let cached = fx.service().get_feed(&viewer, &request(vec![fx.ada])).unwrap();
    assert_eq!(cached.total_count, 1);

    fx.cache.clear();
    let fresh = fx.service().get_feed(&viewer, &request(vec![fx.ada])).unwrap();
    assert_eq!(fresh.total_count, 0);
}

#[test]
fn raw_projection_is_unsaved() {
    let item = TimeLineItem::for_entity(
        1,
        TimelineItemType::Calendar,
        3,
        AccessLevel::Family,
        now() - Duration::days(1),
    );
    assert!(item.is_projection());
}
