//! Conversions between the user's wall clock, the scheduling service's
//! timezone-naive strings and the UTC instants stored on events.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{CalendarError, Result};

/// Format used by the add-event form and by every time sent to the AI.
pub const WALL_CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// Naive layouts the scheduling service has been seen to answer with.
const NAIVE_SUGGESTION_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    WALL_CLOCK_FORMAT,
];

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| CalendarError::Config(format!("unknown timezone '{}': {}", name, e)))
}

/// Parses a form value in the literal `YYYY-MM-DD HH:mm` layout, read as
/// wall-clock time in `tz`.
pub fn parse_form_datetime(value: &str, tz: Tz) -> Result<DateTime<Utc>> {
    if !has_shape(value, "dddd-dd-dd dd:dd") {
        return Err(CalendarError::Validation(format!(
            "'{}' is not a YYYY-MM-DD HH:mm date",
            value
        )));
    }
    let naive = NaiveDateTime::parse_from_str(value, WALL_CLOCK_FORMAT)
        .map_err(|e| CalendarError::Validation(format!("'{}' is not a valid date: {}", value, e)))?;
    local_to_utc(&naive, tz)
}

/// Parses a calendar day selection in the `YYYY-MM-DD` layout.
pub fn parse_calendar_date(value: &str) -> Result<NaiveDate> {
    if !has_shape(value, "dddd-dd-dd") {
        return Err(CalendarError::Validation(format!(
            "'{}' is not a YYYY-MM-DD date",
            value
        )));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| CalendarError::Validation(format!("'{}' is not a valid date: {}", value, e)))
}

/// Renders an instant as the naive wall-clock string the AI expects.
pub fn to_wire_local(instant: &DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format(WALL_CLOCK_FORMAT).to_string()
}

/// Reads a suggested start time. Strings carrying an offset are taken as
/// given; naive strings are wall-clock time in `tz`.
pub fn parse_suggested_instant(value: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_SUGGESTION_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return local_to_utc(&naive, tz);
        }
    }
    Err(CalendarError::Gateway(format!(
        "unrecognised startingTime '{}'",
        value
    )))
}

/// Minute difference between two instants, rounded to the nearest minute.
pub fn minutes_between(start: &DateTime<Utc>, end: &DateTime<Utc>) -> i64 {
    let seconds = (*end - *start).num_seconds();
    (seconds as f64 / 60.0).round() as i64
}

fn local_to_utc(naive: &NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| {
            CalendarError::Validation(format!("{} does not exist in {}", naive, tz.name()))
        })
}

// 'd' stands for an ASCII digit, anything else must match literally.
fn has_shape(value: &str, pattern: &str) -> bool {
    value.len() == pattern.len()
        && value
            .bytes()
            .zip(pattern.bytes())
            .all(|(actual, expected)| match expected {
                b'd' => actual.is_ascii_digit(),
                other => actual == other,
            })
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-03-15T16:30:00.000Z`.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(instant: &DateTime<Utc>) -> String {
        instant.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(instant))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            instant: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match instant {
                Some(value) => serializer.serialize_some(&format(value)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            raw.map(|value| {
                DateTime::parse_from_rfc3339(&value)
                    .map(|parsed| parsed.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }
}
