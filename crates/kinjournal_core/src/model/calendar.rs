//! Calendar events and their optional recurrence rule.
//!
//! # Invariants
//! - `end_time`, when set, is not earlier than `start_time`.
//! - A recurrence rule has `interval >= 1` and, when set, `count >= 1`.

use super::access::AccessLevel;
use super::{EntityId, ProgenyId, ValidationError};
use chrono::{DateTime, Datelike, Months, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on projected occurrences of one event. The most recent ones
/// are kept.
pub const MAX_OCCURRENCES: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

/// Repetition of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: RecurrenceFrequency,
    /// Step between occurrences, in units of `frequency`.
    pub interval: u32,
    /// Total number of occurrences including the original event.
    pub count: Option<u32>,
    /// Last instant an occurrence may start at.
    pub until: Option<DateTime<Utc>>,
}

impl RecurrenceRule {
    pub fn new(frequency: RecurrenceFrequency) -> Self {
        Self {
            frequency,
            interval: 1,
            count: None,
            until: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval == 0 {
            return Err(ValidationError::InvalidRecurrence(
                "interval must be at least 1".to_string(),
            ));
        }
        if self.count == Some(0) {
            return Err(ValidationError::InvalidRecurrence(
                "count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Start of the `step`-th repetition after `start`.
    ///
    /// Month-based steps are measured from `start` so a day-of-month clamp
    /// in a short month does not drift later occurrences.
    fn nth_after(&self, start: DateTime<Utc>, step: u32) -> Option<DateTime<Utc>> {
        let units = step.checked_mul(self.interval)?;
        match self.frequency {
            RecurrenceFrequency::Daily => {
                start.checked_add_signed(TimeDelta::try_days(i64::from(units))?)
            }
            RecurrenceFrequency::Weekly => {
                start.checked_add_signed(TimeDelta::try_weeks(i64::from(units))?)
            }
            RecurrenceFrequency::Monthly => start.checked_add_months(Months::new(units)),
            RecurrenceFrequency::Yearly => {
                start.checked_add_months(Months::new(units.checked_mul(12)?))
            }
        }
    }

    /// Highest step whose start is at or before `limit`, or `None` when the
    /// first repetition is already past it.
    fn last_step_within(&self, start: DateTime<Utc>, limit: DateTime<Utc>) -> Option<u32> {
        if limit <= start {
            return None;
        }
        let interval = i64::from(self.interval);
        let estimate = match self.frequency {
            RecurrenceFrequency::Daily => (limit - start).num_days() / interval,
            RecurrenceFrequency::Weekly => (limit - start).num_weeks() / interval,
            RecurrenceFrequency::Monthly | RecurrenceFrequency::Yearly => {
                let years = i64::from(limit.year() - start.year());
                let months = years * 12 + i64::from(limit.month()) - i64::from(start.month());
                let per_step = if self.frequency == RecurrenceFrequency::Yearly {
                    interval * 12
                } else {
                    interval
                };
                months / per_step
            }
        };

        // The estimate can overshoot by a partial day or month.
        let mut step = u32::try_from(estimate.max(0)).unwrap_or(u32::MAX);
        while step > 0 && !matches!(self.nth_after(start, step), Some(at) if at <= limit) {
            step -= 1;
        }
        (step > 0).then_some(step)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarItem {
    pub event_id: EntityId,
    pub progeny_id: ProgenyId,
    pub access_level: AccessLevel,
    pub title: String,
    pub notes: String,
    pub location: String,
    pub context: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub recurrence: Option<RecurrenceRule>,
}

impl CalendarItem {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyField("title"));
        }
        if matches!(self.end_time, Some(end) if end < self.start_time) {
            return Err(ValidationError::EndBeforeStart("calendar item"));
        }
        if let Some(rule) = &self.recurrence {
            rule.validate()?;
        }
        Ok(())
    }

    /// Start times of repetitions after the original event, up to and
    /// including `window_end`, oldest first.
    ///
    /// The original start is never included. `count` counts the original
    /// occurrence; `until` caps the window. When more than
    /// [`MAX_OCCURRENCES`] repetitions fall in the window, the latest ones
    /// are returned.
    pub fn occurrences_until(&self, window_end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let Some(rule) = &self.recurrence else {
            return Vec::new();
        };
        if rule.interval == 0 {
            return Vec::new();
        }

        let limit = rule.until.map_or(window_end, |until| until.min(window_end));
        let Some(mut last) = rule.last_step_within(self.start_time, limit) else {
            return Vec::new();
        };
        if let Some(count) = rule.count {
            last = last.min(count.saturating_sub(1));
        }
        if last == 0 {
            return Vec::new();
        }

        let first = last.saturating_sub(MAX_OCCURRENCES - 1).max(1);
        (first..=last)
            .filter_map(|step| rule.nth_after(self.start_time, step))
            .collect()
    }
}
