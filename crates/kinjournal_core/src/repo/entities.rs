//! Row mappings of every journal entity onto its table.

use crate::model::access::AccessLevel;
use crate::model::calendar::{CalendarItem, RecurrenceFrequency, RecurrenceRule};
use crate::model::journal::{
    require_text, Contact, Friend, Location, Measurement, Note, Skill, Sleep, Vaccination,
    VocabularyItem,
};
use crate::model::media::{Picture, Video};
use crate::model::timeline::TimelineItemType;
use crate::model::{EntityId, ProgenyId, ValidationError};
use crate::repo::entity_repo::{
    opt_time_to_db, read_access_level, read_opt_time, read_time, time_to_db, Entity, RepoError,
    RepoResult,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::Row;

impl Entity for Picture {
    const TABLE: &'static str = "pictures";
    const ID_COLUMN: &'static str = "picture_id";
    const COLUMNS: &'static [&'static str] = &[
        "progeny_id",
        "access_level",
        "picture_time",
        "tags",
        "location",
        "description",
    ];
    const TIMELINE_TYPE: TimelineItemType = TimelineItemType::Photo;

    fn id(&self) -> EntityId {
        self.picture_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.picture_id = id;
    }

    fn progeny_id(&self) -> ProgenyId {
        self.progeny_id
    }

    fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    fn timeline_time(&self) -> Option<DateTime<Utc>> {
        self.picture_time
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.progeny_id.into(),
            self.access_level.as_i64().into(),
            opt_time_to_db(self.picture_time),
            self.tags.clone().into(),
            self.location.clone().into(),
            self.description.clone().into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            picture_id: row.get("picture_id")?,
            progeny_id: row.get("progeny_id")?,
            access_level: read_access_level(row)?,
            picture_time: read_opt_time(row, "picture_time")?,
            tags: row.get("tags")?,
            location: row.get("location")?,
            description: row.get("description")?,
        })
    }
}

impl Entity for Video {
    const TABLE: &'static str = "videos";
    const ID_COLUMN: &'static str = "video_id";
    const COLUMNS: &'static [&'static str] = &[
        "progeny_id",
        "access_level",
        "video_time",
        "duration_secs",
        "tags",
        "location",
        "description",
    ];
    const TIMELINE_TYPE: TimelineItemType = TimelineItemType::Video;

    fn id(&self) -> EntityId {
        self.video_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.video_id = id;
    }

    fn progeny_id(&self) -> ProgenyId {
        self.progeny_id
    }

    fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    fn timeline_time(&self) -> Option<DateTime<Utc>> {
        self.video_time
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.progeny_id.into(),
            self.access_level.as_i64().into(),
            opt_time_to_db(self.video_time),
            self.duration_secs.into(),
            self.tags.clone().into(),
            self.location.clone().into(),
            self.description.clone().into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            video_id: row.get("video_id")?,
            progeny_id: row.get("progeny_id")?,
            access_level: read_access_level(row)?,
            video_time: read_opt_time(row, "video_time")?,
            duration_secs: row.get("duration_secs")?,
            tags: row.get("tags")?,
            location: row.get("location")?,
            description: row.get("description")?,
        })
    }
}

impl Entity for CalendarItem {
    const TABLE: &'static str = "calendar_items";
    const ID_COLUMN: &'static str = "event_id";
    const COLUMNS: &'static [&'static str] = &[
        "progeny_id",
        "access_level",
        "title",
        "notes",
        "location",
        "context",
        "start_time",
        "end_time",
        "all_day",
        "recurrence_frequency",
        "recurrence_interval",
        "recurrence_count",
        "recurrence_until",
    ];
    const TIMELINE_TYPE: TimelineItemType = TimelineItemType::Calendar;

    fn id(&self) -> EntityId {
        self.event_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.event_id = id;
    }

    fn progeny_id(&self) -> ProgenyId {
        self.progeny_id
    }

    fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    fn timeline_time(&self) -> Option<DateTime<Utc>> {
        Some(self.start_time)
    }

    fn to_values(&self) -> Vec<Value> {
        let rule = self.recurrence.as_ref();
        vec![
            self.progeny_id.into(),
            self.access_level.as_i64().into(),
            self.title.clone().into(),
            self.notes.clone().into(),
            self.location.clone().into(),
            self.context.clone().into(),
            time_to_db(self.start_time),
            opt_time_to_db(self.end_time),
            self.all_day.into(),
            rule.map(|rule| rule.frequency.as_str().to_string()).into(),
            i64::from(rule.map_or(1, |rule| rule.interval)).into(),
            rule.and_then(|rule| rule.count).map(i64::from).into(),
            opt_time_to_db(rule.and_then(|rule| rule.until)),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let recurrence = match row.get::<_, Option<String>>("recurrence_frequency")? {
            Some(value) => {
                let frequency = RecurrenceFrequency::parse(&value).ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "invalid recurrence frequency `{value}` in calendar_items"
                    ))
                })?;
                let interval: i64 = row.get("recurrence_interval")?;
                let count: Option<i64> = row.get("recurrence_count")?;
                Some(RecurrenceRule {
                    frequency,
                    interval: to_u32(interval, "recurrence_interval")?,
                    count: count
                        .map(|value| to_u32(value, "recurrence_count"))
                        .transpose()?,
                    until: read_opt_time(row, "recurrence_until")?,
                })
            }
            None => None,
        };

        Ok(Self {
            event_id: row.get("event_id")?,
            progeny_id: row.get("progeny_id")?,
            access_level: read_access_level(row)?,
            title: row.get("title")?,
            notes: row.get("notes")?,
            location: row.get("location")?,
            context: row.get("context")?,
            start_time: read_time(row, "start_time")?,
            end_time: read_opt_time(row, "end_time")?,
            all_day: row.get("all_day")?,
            recurrence,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        CalendarItem::validate(self)
    }
}

impl Entity for Note {
    const TABLE: &'static str = "notes";
    const ID_COLUMN: &'static str = "note_id";
    const COLUMNS: &'static [&'static str] = &[
        "progeny_id",
        "access_level",
        "title",
        "content",
        "category",
        "created_date",
    ];
    const TIMELINE_TYPE: TimelineItemType = TimelineItemType::Note;

    fn id(&self) -> EntityId {
        self.note_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.note_id = id;
    }

    fn progeny_id(&self) -> ProgenyId {
        self.progeny_id
    }

    fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    fn timeline_time(&self) -> Option<DateTime<Utc>> {
        Some(self.created_date)
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.progeny_id.into(),
            self.access_level.as_i64().into(),
            self.title.clone().into(),
            self.content.clone().into(),
            self.category.clone().into(),
            time_to_db(self.created_date),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            note_id: row.get("note_id")?,
            progeny_id: row.get("progeny_id")?,
            access_level: read_access_level(row)?,
            title: row.get("title")?,
            content: row.get("content")?,
            category: row.get("category")?,
            created_date: read_time(row, "created_date")?,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.title, "title")
    }
}

impl Entity for Skill {
    const TABLE: &'static str = "skills";
    const ID_COLUMN: &'static str = "skill_id";
    const COLUMNS: &'static [&'static str] = &[
        "progeny_id",
        "access_level",
        "name",
        "description",
        "category",
        "first_observation",
    ];
    const TIMELINE_TYPE: TimelineItemType = TimelineItemType::Skill;

    fn id(&self) -> EntityId {
        self.skill_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.skill_id = id;
    }

    fn progeny_id(&self) -> ProgenyId {
        self.progeny_id
    }

    fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    fn timeline_time(&self) -> Option<DateTime<Utc>> {
        self.first_observation
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.progeny_id.into(),
            self.access_level.as_i64().into(),
            self.name.clone().into(),
            self.description.clone().into(),
            self.category.clone().into(),
            opt_time_to_db(self.first_observation),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            skill_id: row.get("skill_id")?,
            progeny_id: row.get("progeny_id")?,
            access_level: read_access_level(row)?,
            name: row.get("name")?,
            description: row.get("description")?,
            category: row.get("category")?,
            first_observation: read_opt_time(row, "first_observation")?,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "name")
    }
}

impl Entity for Friend {
    const TABLE: &'static str = "friends";
    const ID_COLUMN: &'static str = "friend_id";
    const COLUMNS: &'static [&'static str] = &[
        "progeny_id",
        "access_level",
        "name",
        "description",
        "context",
        "notes",
        "tags",
        "friend_since",
    ];
    const TIMELINE_TYPE: TimelineItemType = TimelineItemType::Friend;

    fn id(&self) -> EntityId {
        self.friend_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.friend_id = id;
    }

    fn progeny_id(&self) -> ProgenyId {
        self.progeny_id
    }

    fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    fn timeline_time(&self) -> Option<DateTime<Utc>> {
        self.friend_since
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.progeny_id.into(),
            self.access_level.as_i64().into(),
            self.name.clone().into(),
            self.description.clone().into(),
            self.context.clone().into(),
            self.notes.clone().into(),
            self.tags.clone().into(),
            opt_time_to_db(self.friend_since),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            friend_id: row.get("friend_id")?,
            progeny_id: row.get("progeny_id")?,
            access_level: read_access_level(row)?,
            name: row.get("name")?,
            description: row.get("description")?,
            context: row.get("context")?,
            notes: row.get("notes")?,
            tags: row.get("tags")?,
            friend_since: read_opt_time(row, "friend_since")?,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "name")
    }
}

impl Entity for Contact {
    const TABLE: &'static str = "contacts";
    const ID_COLUMN: &'static str = "contact_id";
    const COLUMNS: &'static [&'static str] = &[
        "progeny_id",
        "access_level",
        "first_name",
        "middle_name",
        "last_name",
        "display_name",
        "email",
        "context",
        "notes",
        "tags",
        "date_added",
    ];
    const TIMELINE_TYPE: TimelineItemType = TimelineItemType::Contact;

    fn id(&self) -> EntityId {
        self.contact_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.contact_id = id;
    }

    fn progeny_id(&self) -> ProgenyId {
        self.progeny_id
    }

    fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    fn timeline_time(&self) -> Option<DateTime<Utc>> {
        self.date_added
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.progeny_id.into(),
            self.access_level.as_i64().into(),
            self.first_name.clone().into(),
            self.middle_name.clone().into(),
            self.last_name.clone().into(),
            self.display_name.clone().into(),
            self.email.clone().into(),
            self.context.clone().into(),
            self.notes.clone().into(),
            self.tags.clone().into(),
            opt_time_to_db(self.date_added),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            contact_id: row.get("contact_id")?,
            progeny_id: row.get("progeny_id")?,
            access_level: read_access_level(row)?,
            first_name: row.get("first_name")?,
            middle_name: row.get("middle_name")?,
            last_name: row.get("last_name")?,
            display_name: row.get("display_name")?,
            email: row.get("email")?,
            context: row.get("context")?,
            notes: row.get("notes")?,
            tags: row.get("tags")?,
            date_added: read_opt_time(row, "date_added")?,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() {
            return require_text(&self.display_name, "display_name");
        }
        Ok(())
    }
}

impl Entity for Vaccination {
    const TABLE: &'static str = "vaccinations";
    const ID_COLUMN: &'static str = "vaccination_id";
    const COLUMNS: &'static [&'static str] = &[
        "progeny_id",
        "access_level",
        "name",
        "description",
        "notes",
        "vaccination_date",
    ];
    const TIMELINE_TYPE: TimelineItemType = TimelineItemType::Vaccination;

    fn id(&self) -> EntityId {
        self.vaccination_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.vaccination_id = id;
    }

    fn progeny_id(&self) -> ProgenyId {
        self.progeny_id
    }

    fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    fn timeline_time(&self) -> Option<DateTime<Utc>> {
        Some(self.vaccination_date)
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.progeny_id.into(),
            self.access_level.as_i64().into(),
            self.name.clone().into(),
            self.description.clone().into(),
            self.notes.clone().into(),
            time_to_db(self.vaccination_date),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            vaccination_id: row.get("vaccination_id")?,
            progeny_id: row.get("progeny_id")?,
            access_level: read_access_level(row)?,
            name: row.get("name")?,
            description: row.get("description")?,
            notes: row.get("notes")?,
            vaccination_date: read_time(row, "vaccination_date")?,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "name")
    }
}

impl Entity for Location {
    const TABLE: &'static str = "locations";
    const ID_COLUMN: &'static str = "location_id";
    const COLUMNS: &'static [&'static str] = &[
        "progeny_id",
        "access_level",
        "name",
        "city",
        "notes",
        "tags",
        "visit_date",
    ];
    const TIMELINE_TYPE: TimelineItemType = TimelineItemType::Location;

    fn id(&self) -> EntityId {
        self.location_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.location_id = id;
    }

    fn progeny_id(&self) -> ProgenyId {
        self.progeny_id
    }

    fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    fn timeline_time(&self) -> Option<DateTime<Utc>> {
        self.visit_date
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.progeny_id.into(),
            self.access_level.as_i64().into(),
            self.name.clone().into(),
            self.city.clone().into(),
            self.notes.clone().into(),
            self.tags.clone().into(),
            opt_time_to_db(self.visit_date),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            location_id: row.get("location_id")?,
            progeny_id: row.get("progeny_id")?,
            access_level: read_access_level(row)?,
            name: row.get("name")?,
            city: row.get("city")?,
            notes: row.get("notes")?,
            tags: row.get("tags")?,
            visit_date: read_opt_time(row, "visit_date")?,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "name")
    }
}

impl Entity for VocabularyItem {
    const TABLE: &'static str = "vocabulary";
    const ID_COLUMN: &'static str = "word_id";
    const COLUMNS: &'static [&'static str] = &[
        "progeny_id",
        "access_level",
        "word",
        "sounds_like",
        "description",
        "language",
        "word_date",
    ];
    const TIMELINE_TYPE: TimelineItemType = TimelineItemType::Vocabulary;

    fn id(&self) -> EntityId {
        self.word_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.word_id = id;
    }

    fn progeny_id(&self) -> ProgenyId {
        self.progeny_id
    }

    fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    fn timeline_time(&self) -> Option<DateTime<Utc>> {
        self.word_date
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.progeny_id.into(),
            self.access_level.as_i64().into(),
            self.word.clone().into(),
            self.sounds_like.clone().into(),
            self.description.clone().into(),
            self.language.clone().into(),
            opt_time_to_db(self.word_date),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            word_id: row.get("word_id")?,
            progeny_id: row.get("progeny_id")?,
            access_level: read_access_level(row)?,
            word: row.get("word")?,
            sounds_like: row.get("sounds_like")?,
            description: row.get("description")?,
            language: row.get("language")?,
            word_date: read_opt_time(row, "word_date")?,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.word, "word")
    }
}

impl Entity for Measurement {
    const TABLE: &'static str = "measurements";
    const ID_COLUMN: &'static str = "measurement_id";
    const COLUMNS: &'static [&'static str] = &[
        "progeny_id",
        "access_level",
        "weight",
        "height",
        "circumference",
        "measured_at",
    ];
    const TIMELINE_TYPE: TimelineItemType = TimelineItemType::Measurement;

    fn id(&self) -> EntityId {
        self.measurement_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.measurement_id = id;
    }

    fn progeny_id(&self) -> ProgenyId {
        self.progeny_id
    }

    fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    fn timeline_time(&self) -> Option<DateTime<Utc>> {
        Some(self.measured_at)
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.progeny_id.into(),
            self.access_level.as_i64().into(),
            self.weight.into(),
            self.height.into(),
            self.circumference.into(),
            time_to_db(self.measured_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            measurement_id: row.get("measurement_id")?,
            progeny_id: row.get("progeny_id")?,
            access_level: read_access_level(row)?,
            weight: row.get("weight")?,
            height: row.get("height")?,
            circumference: row.get("circumference")?,
            measured_at: read_time(row, "measured_at")?,
        })
    }
}

impl Entity for Sleep {
    const TABLE: &'static str = "sleep";
    const ID_COLUMN: &'static str = "sleep_id";
    const COLUMNS: &'static [&'static str] = &[
        "progeny_id",
        "access_level",
        "sleep_start",
        "sleep_end",
        "rating",
        "notes",
    ];
    const TIMELINE_TYPE: TimelineItemType = TimelineItemType::Sleep;

    fn id(&self) -> EntityId {
        self.sleep_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.sleep_id = id;
    }

    fn progeny_id(&self) -> ProgenyId {
        self.progeny_id
    }

    fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    fn timeline_time(&self) -> Option<DateTime<Utc>> {
        Some(self.sleep_start)
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.progeny_id.into(),
            self.access_level.as_i64().into(),
            time_to_db(self.sleep_start),
            time_to_db(self.sleep_end),
            self.rating.into(),
            self.notes.clone().into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            sleep_id: row.get("sleep_id")?,
            progeny_id: row.get("progeny_id")?,
            access_level: read_access_level(row)?,
            sleep_start: read_time(row, "sleep_start")?,
            sleep_end: read_time(row, "sleep_end")?,
            rating: row.get("rating")?,
            notes: row.get("notes")?,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Sleep::validate(self)
    }
}

fn to_u32(value: i64, column: &str) -> RepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("value `{value}` out of range in {column}")))
}
