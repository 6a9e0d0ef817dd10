use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{CalendarError, Result};
use crate::timefmt;

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Schedule,
    RescheduleId,
    Reschedule,
}

#[derive(Debug, Clone)]
pub struct OpenAISettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

pub struct OpenAIClient {
    http: Client,
    settings: OpenAISettings,
}

impl OpenAIClient {
    pub fn new(settings: OpenAISettings) -> Self {
        Self {
            http: Client::new(),
            settings,
        }
    }

    /// Sends one prompt and returns the raw model answer.
    pub async fn complete(&self, kind: PromptKind, payload: &str, tz: Tz) -> Result<String> {
        let prompt = build_prompt(kind, payload, Utc::now(), tz);
        self.query(prompt, kind).await
    }

    async fn query(&self, prompt: String, kind: PromptKind) -> Result<String> {
        let request = OpenAIRequest {
            model: self.settings.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system_message(kind).to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            max_tokens: 800,
            temperature: 0.2,
        };

        let url = format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'));
        debug!("POST {} ({:?})", url, kind);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!("completion request failed with {}: {}", status, text);
            return Err(CalendarError::Gateway(format!(
                "completion request failed with status {}",
                status
            )));
        }

        let parsed: OpenAIResponse = serde_json::from_str(&text)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| CalendarError::Gateway("completion had no content".to_string()))
    }
}

fn system_message(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::Schedule | PromptKind::Reschedule => {
            "You are a smart calendar assistant. You help schedule flexible events around fixed events. \
             Always respond with a JSON object containing startingTime (ISO string) and reason (string explaining the choice). \
             No markdown, no backticks, no extra text."
        }
        PromptKind::RescheduleId => {
            "You are a smart calendar assistant. You match a user's message to one of their events. \
             Always respond with a JSON object containing event_id (string, empty when no event matches). \
             No markdown, no backticks, no extra text."
        }
    }
}

fn build_prompt(kind: PromptKind, payload: &str, now: DateTime<Utc>, tz: Tz) -> String {
    let now_local = timefmt::to_wire_local(&now, tz);
    match kind {
        PromptKind::Schedule => format!(
            "Current local time: {now_local}\n\
             All times are local wall-clock times in YYYY-MM-DD HH:mm.\n\
             {payload}\n\
             Suggest a starting time for the flexible event that does not overlap any other event.\n\
             The JSON shape must be exactly:\n\
             {{\"startingTime\":\"<YYYY-MM-DDTHH:MM:SS>\",\"reason\":\"<string>\"}}"
        ),
        PromptKind::RescheduleId => format!(
            "Current local time: {now_local}\n\
             {payload}\n\
             Return the id of the event the user most plausibly wants to move.\n\
             The JSON shape must be exactly:\n\
             {{\"event_id\":\"<id or empty string>\"}}"
        ),
        PromptKind::Reschedule => format!(
            "Current local time: {now_local}\n\
             All times are local wall-clock times in YYYY-MM-DD HH:mm.\n\
             {payload}\n\
             Suggest a new starting time for the event following the user's message, \
             without overlapping the other events.\n\
             The JSON shape must be exactly:\n\
             {{\"startingTime\":\"<YYYY-MM-DDTHH:MM:SS>\",\"reason\":\"<string>\"}}"
        ),
    }
}
