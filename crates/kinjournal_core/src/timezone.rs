//! Presentation-boundary time zone conversion.
//!
//! Stored timestamps are UTC. Feed entries are converted exactly once, here,
//! when they are handed to a viewer.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Zone name that is not in the IANA database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTimeZone(pub String);

impl Display for UnknownTimeZone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown time zone `{}`", self.0)
    }
}

impl Error for UnknownTimeZone {}

/// Parses an IANA zone name such as `Europe/Oslo`.
pub fn parse_time_zone(name: &str) -> Result<Tz, UnknownTimeZone> {
    let trimmed = name.trim();
    trimmed
        .parse::<Tz>()
        .map_err(|_| UnknownTimeZone(trimmed.to_string()))
}

/// Converts a stored UTC instant into the viewer's wall-clock time.
pub fn to_viewer_time(utc: DateTime<Utc>, time_zone: Tz) -> DateTime<FixedOffset> {
    utc.with_timezone(&time_zone).fixed_offset()
}

/// Calendar date of a stored UTC instant as seen by the viewer.
pub fn viewer_date(utc: DateTime<Utc>, time_zone: Tz) -> NaiveDate {
    utc.with_timezone(&time_zone).date_naive()
}

#[cfg(test)]
mod tests {
    use super::{parse_time_zone, to_viewer_time, viewer_date};
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn converts_into_viewer_offset_including_dst() {
        let oslo = parse_time_zone("Europe/Oslo").unwrap();
        let winter = to_viewer_time(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(), oslo);
        let summer = to_viewer_time(Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap(), oslo);

        assert_eq!(winter.offset().local_minus_utc(), 3600);
        assert_eq!(summer.offset().local_minus_utc(), 7200);
        assert_eq!(winter.to_rfc3339(), "2024-01-15T13:00:00+01:00");
    }

    #[test]
    fn viewer_date_can_differ_from_utc_date() {
        let tokyo = parse_time_zone("Asia/Tokyo").unwrap();
        let late_utc = Utc.with_ymd_and_hms(2024, 5, 31, 20, 0, 0).unwrap();
        assert_eq!(
            viewer_date(late_utc, tokyo),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
    }

    #[test]
    fn unknown_zone_is_rejected() {
        let err = parse_time_zone(" Mars/Olympus ").unwrap_err();
        assert_eq!(err.0, "Mars/Olympus");
    }
}
