use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};
use crate::timefmt::{self, iso_millis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Fixed,
    Flexible,
}

/// Last time proposal received from the AI for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSuggestion {
    #[serde(with = "iso_millis")]
    pub starting_time: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub location: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "iso_millis::option")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "iso_millis::option")]
    pub end_time: Option<DateTime<Utc>>,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_suggestion: Option<AiSuggestion>,
}

/// Ids come from the creation time in milliseconds, so two events created
/// within the same millisecond collide.
pub fn event_id_at(now: DateTime<Utc>) -> String {
    now.timestamp_millis().to_string()
}

impl Event {
    pub fn is_scheduled(&self) -> bool {
        self.start_time.is_some()
    }

    pub fn duration_minutes(&self) -> Option<i64> {
        self.duration.or_else(|| match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(timefmt::minutes_between(&start, &end)),
            _ => None,
        })
    }

    /// Moves the event to the suggested start, keeping its length, and
    /// records the suggestion.
    pub fn apply_suggestion(&mut self, suggestion: AiSuggestion) -> Result<()> {
        let minutes = self.duration_minutes().ok_or_else(|| {
            CalendarError::State(format!("event {} has no duration to schedule", self.id))
        })?;
        let start = suggestion.starting_time;
        let end = Duration::try_minutes(minutes)
            .and_then(|length| start.checked_add_signed(length))
            .ok_or_else(|| {
                CalendarError::Validation(format!(
                    "{} minutes from {} is out of range",
                    minutes, start
                ))
            })?;
        self.start_time = Some(start);
        self.end_time = Some(end);
        self.duration = Some(minutes);
        self.ai_suggestion = Some(suggestion);
        Ok(())
    }

    /// Whether the event starts on `date` as seen on the wall clock of `tz`.
    pub fn starts_on(&self, date: NaiveDate, tz: Tz) -> bool {
        self.start_time
            .map(|start| start.with_timezone(&tz).date_naive() == date)
            .unwrap_or(false)
    }

    /// Copy of the event with its times rendered as the naive local strings
    /// the AI works with.
    pub fn to_wire(&self, tz: Tz) -> WireEvent<'_> {
        WireEvent {
            id: &self.id,
            title: &self.title,
            location: &self.location,
            event_type: self.event_type,
            start_time: self.start_time.map(|t| timefmt::to_wire_local(&t, tz)),
            end_time: self.end_time.map(|t| timefmt::to_wire_local(&t, tz)),
            duration: self.duration_minutes(),
            note: self.note.as_deref(),
        }
    }

    pub fn describe(&self, tz: Tz) -> String {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => format!(
                "\"{}\" at {} ({} - {})",
                self.title,
                self.location,
                timefmt::to_wire_local(&start, tz),
                end.with_timezone(&tz).format("%H:%M")
            ),
            (Some(start), None) => format!(
                "\"{}\" at {} ({})",
                self.title,
                self.location,
                timefmt::to_wire_local(&start, tz)
            ),
            _ => format!("\"{}\" at {} (unscheduled)", self.title, self.location),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub location: &'a str,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'a str>,
}

/// Raw add-event form input, validated by the event service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub location: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(flatten)]
    pub timing: DraftTiming,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DraftTiming {
    Fixed {
        #[serde(rename = "startTime")]
        start: String,
        #[serde(rename = "endTime")]
        end: String,
    },
    Flexible {
        duration: String,
    },
}
