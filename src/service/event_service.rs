use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CalendarError, Result};
use crate::models::event::{DraftTiming, Event, EventDraft, EventType, event_id_at};
use crate::service::ai_gateway::AiGateway;
use crate::store::EventRepository;
use crate::timefmt;

/// One year.
pub const MAX_FLEXIBLE_MINUTES: i64 = 366 * 24 * 60;

pub struct EventService {
    events: Arc<dyn EventRepository>,
    ai: Arc<dyn AiGateway>,
    tz: Tz,
}

impl EventService {
    pub fn new(events: Arc<dyn EventRepository>, ai: Arc<dyn AiGateway>, tz: Tz) -> Self {
        Self { events, ai, tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub async fn list(&self) -> Result<Vec<Event>> {
        self.events.list().await
    }

    pub async fn find(&self, id: &str) -> Result<Event> {
        self.events
            .list()
            .await?
            .into_iter()
            .find(|event| event.id == id)
            .ok_or_else(|| CalendarError::NotFound(id.to_string()))
    }

    pub async fn add_event(&self, draft: EventDraft) -> Result<Event> {
        Ok(self.submit(draft, Utc::now()).await?.event)
    }

    /// Validates the form, asks the AI for a slot when the event is flexible
    /// and appends the result to the stored collection. The collection is
    /// written once, at the end, so any earlier failure leaves it untouched.
    pub async fn submit(&self, draft: EventDraft, now: DateTime<Utc>) -> Result<AddedEvent> {
        let mut event = build_event(&draft, now, self.tz)?;
        let ai_error = if event.event_type == EventType::Flexible {
            self.schedule_flexible(&mut event).await?
        } else {
            None
        };

        let mut events = self.events.list().await?;
        events.push(event.clone());
        self.events.replace_all(events).await?;
        info!(
            "stored {:?} event {} ({})",
            event.event_type,
            event.id,
            if event.is_scheduled() { "scheduled" } else { "unscheduled" }
        );
        Ok(AddedEvent { event, ai_error })
    }

    // A failed or empty AI answer leaves the event unscheduled; it is still
    // saved. A failed call is handed back so the front-end can tell the user.
    async fn schedule_flexible(&self, event: &mut Event) -> Result<Option<String>> {
        let existing = self.events.list().await?;
        match self.ai.suggest_time(&existing, event).await {
            Ok(Some(suggestion)) => {
                info!("AI proposed {} for {}", suggestion.starting_time, event.id);
                event.apply_suggestion(suggestion)?;
                Ok(None)
            }
            Ok(None) => {
                info!("no suggestion for {}, keeping it unscheduled", event.id);
                Ok(None)
            }
            Err(err) => {
                warn!("suggestion for {} failed: {}", event.id, err);
                Ok(Some(err.to_string()))
            }
        }
    }
}

/// A stored event plus the AI failure that left it unscheduled, if any.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedEvent {
    #[serde(flatten)]
    pub event: Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_error: Option<String>,
}

/// Turns raw form input into an event without touching storage.
pub fn build_event(draft: &EventDraft, now: DateTime<Utc>, tz: Tz) -> Result<Event> {
    let title = draft.title.trim();
    let location = draft.location.trim();
    if title.is_empty() {
        return Err(CalendarError::Validation("title is required".to_string()));
    }
    if location.is_empty() {
        return Err(CalendarError::Validation("location is required".to_string()));
    }
    let note = draft
        .note
        .as_deref()
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .map(str::to_string);

    let mut event = Event {
        id: event_id_at(now),
        title: title.to_string(),
        location: location.to_string(),
        event_type: EventType::Fixed,
        start_time: None,
        end_time: None,
        duration: None,
        note,
        ai_suggestion: None,
    };

    match &draft.timing {
        DraftTiming::Fixed { start, end } => {
            let start = timefmt::parse_form_datetime(start.trim(), tz)?;
            let end = timefmt::parse_form_datetime(end.trim(), tz)?;
            // Zero and negative lengths are let through unchanged.
            event.duration = Some(timefmt::minutes_between(&start, &end));
            event.start_time = Some(start);
            event.end_time = Some(end);
        }
        DraftTiming::Flexible { duration } => {
            let minutes: i64 = duration.trim().parse().map_err(|_| {
                CalendarError::Validation(format!("'{}' is not a number of minutes", duration))
            })?;
            if minutes <= 0 {
                return Err(CalendarError::Validation(
                    "duration must be at least one minute".to_string(),
                ));
            }
            if minutes > MAX_FLEXIBLE_MINUTES {
                return Err(CalendarError::Validation(format!(
                    "duration must be at most {} minutes",
                    MAX_FLEXIBLE_MINUTES
                )));
            }
            event.event_type = EventType::Flexible;
            event.duration = Some(minutes);
        }
    }
    Ok(event)
}
