use async_trait::async_trait;
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::clients::openai_client::{OpenAIClient, PromptKind};
use crate::clients::schedule_client::ScheduleClient;
use crate::error::{CalendarError, Result};
use crate::models::event::{AiSuggestion, Event, WireEvent};
use crate::timefmt;

/// The three questions the calendar asks the AI. `Ok(None)` means the AI
/// answered without a usable proposal; `Err` means the call itself failed.
#[async_trait]
pub trait AiGateway: Send + Sync {
    async fn suggest_time(
        &self,
        fixed_events: &[Event],
        flexible_event: &Event,
    ) -> Result<Option<AiSuggestion>>;

    async fn identify_event_to_reschedule(
        &self,
        message: &str,
        events: &[Event],
    ) -> Result<Option<String>>;

    async fn suggest_reschedule_time(
        &self,
        event: &Event,
        other_events: &[Event],
        message: &str,
    ) -> Result<Option<AiSuggestion>>;
}

pub struct ScheduleServiceGateway {
    client: ScheduleClient,
    tz: Tz,
}

impl ScheduleServiceGateway {
    pub fn new(client: ScheduleClient, tz: Tz) -> Self {
        Self { client, tz }
    }
}

#[async_trait]
impl AiGateway for ScheduleServiceGateway {
    async fn suggest_time(
        &self,
        fixed_events: &[Event],
        flexible_event: &Event,
    ) -> Result<Option<AiSuggestion>> {
        let fixed = wire_list(fixed_events, self.tz)?;
        let flexible = serde_json::to_string(&flexible_event.to_wire(self.tz))?;
        let body = self.client.schedule(&fixed, &flexible).await?;
        normalize_suggestion(&body, self.tz)
    }

    async fn identify_event_to_reschedule(
        &self,
        message: &str,
        events: &[Event],
    ) -> Result<Option<String>> {
        let events = wire_list(events, self.tz)?;
        let body = self.client.reschedule_id(message, &events).await?;
        normalize_event_id(&body)
    }

    async fn suggest_reschedule_time(
        &self,
        event: &Event,
        other_events: &[Event],
        message: &str,
    ) -> Result<Option<AiSuggestion>> {
        let target = serde_json::to_string(&event.to_wire(self.tz))?;
        let others = wire_list(other_events, self.tz)?;
        let body = self.client.reschedule(&target, &others, message).await?;
        normalize_suggestion(&body, self.tz)
    }
}

/// Talks to an OpenAI-compatible chat endpoint directly, skipping the
/// scheduling service.
pub struct OpenAIGateway {
    client: OpenAIClient,
    tz: Tz,
}

impl OpenAIGateway {
    pub fn new(client: OpenAIClient, tz: Tz) -> Self {
        Self { client, tz }
    }
}

#[async_trait]
impl AiGateway for OpenAIGateway {
    async fn suggest_time(
        &self,
        fixed_events: &[Event],
        flexible_event: &Event,
    ) -> Result<Option<AiSuggestion>> {
        let payload = format!(
            "Fixed events: {}. Please suggest a time for this flexible event: {}",
            wire_list(fixed_events, self.tz)?,
            serde_json::to_string(&flexible_event.to_wire(self.tz))?
        );
        let content = self.client.complete(PromptKind::Schedule, &payload, self.tz).await?;
        normalize_suggestion(&content, self.tz)
    }

    async fn identify_event_to_reschedule(
        &self,
        message: &str,
        events: &[Event],
    ) -> Result<Option<String>> {
        let payload = format!(
            "Events: {}\nUser message: {}",
            wire_list(events, self.tz)?,
            serde_json::to_string(message)?
        );
        let content = self
            .client
            .complete(PromptKind::RescheduleId, &payload, self.tz)
            .await?;
        normalize_event_id(&content)
    }

    async fn suggest_reschedule_time(
        &self,
        event: &Event,
        other_events: &[Event],
        message: &str,
    ) -> Result<Option<AiSuggestion>> {
        let payload = format!(
            "Event to move: {}\nOther events: {}\nUser message: {}",
            serde_json::to_string(&event.to_wire(self.tz))?,
            wire_list(other_events, self.tz)?,
            serde_json::to_string(message)?
        );
        let content = self
            .client
            .complete(PromptKind::Reschedule, &payload, self.tz)
            .await?;
        normalize_suggestion(&content, self.tz)
    }
}

fn wire_list(events: &[Event], tz: Tz) -> Result<String> {
    let wire: Vec<WireEvent<'_>> = events.iter().map(|event| event.to_wire(tz)).collect();
    Ok(serde_json::to_string(&wire)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSuggestion {
    #[serde(default)]
    starting_time: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// Turns whatever the AI answered with into one typed suggestion. The body
/// may be the JSON object itself or a JSON string holding it.
pub fn normalize_suggestion(body: &str, tz: Tz) -> Result<Option<AiSuggestion>> {
    let value = unwrap_payload(body)?;
    if value.is_null() {
        return Ok(None);
    }
    if !value.is_object() {
        return Err(CalendarError::Gateway(format!(
            "expected a suggestion object, got {}",
            value
        )));
    }
    let raw: RawSuggestion = serde_json::from_value(value)?;
    let Some(starting_time) = raw.starting_time.filter(|s| !s.trim().is_empty()) else {
        debug!("suggestion without startingTime");
        return Ok(None);
    };
    Ok(Some(AiSuggestion {
        starting_time: timefmt::parse_suggested_instant(&starting_time, tz)?,
        reason: raw.reason.unwrap_or_default(),
    }))
}

/// Reads `{event_id}`; an empty or missing id means nothing was identified.
pub fn normalize_event_id(body: &str) -> Result<Option<String>> {
    let value = unwrap_payload(body)?;
    let id = match value.get("event_id") {
        Some(Value::String(id)) => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => {
            return Err(CalendarError::Gateway(format!("unexpected event_id {}", other)));
        }
    };
    Ok(if id.is_empty() { None } else { Some(id) })
}

fn unwrap_payload(body: &str) -> Result<Value> {
    let trimmed = strip_code_fence(body);
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str::<Value>(trimmed)? {
        Value::String(inner) => {
            let inner = strip_code_fence(&inner);
            if inner.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(serde_json::from_str(inner)?)
            }
        }
        other => Ok(other),
    }
}

// Models sometimes wrap JSON in a markdown fence despite being told not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
