use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{CalendarError, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleRequest<'a> {
    fixed_events: &'a str,
    flexible_event: &'a str,
}

#[derive(Debug, Serialize)]
struct RescheduleIdRequest<'a> {
    message: &'a str,
    events: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RescheduleRequest<'a> {
    event: &'a str,
    other_events: &'a str,
    message: &'a str,
}

/// Client for the scheduling service. Event arguments are already
/// stringified JSON; bodies are returned raw for the gateway to normalize.
/// No retry and no timeout beyond reqwest's defaults.
pub struct ScheduleClient {
    http: Client,
    base_url: String,
}

impl ScheduleClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn schedule(&self, fixed_events: &str, flexible_event: &str) -> Result<String> {
        self.post(
            "/schedule",
            &ScheduleRequest {
                fixed_events,
                flexible_event,
            },
        )
        .await
    }

    pub async fn reschedule_id(&self, message: &str, events: &str) -> Result<String> {
        self.post("/reschedule_id", &RescheduleIdRequest { message, events })
            .await
    }

    pub async fn reschedule(&self, event: &str, other_events: &str, message: &str) -> Result<String> {
        self.post(
            "/reschedule",
            &RescheduleRequest {
                event,
                other_events,
                message,
            },
        )
        .await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let response = self.http.post(&url).json(body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!("{} failed with {}: {}", path, status, text);
            return Err(CalendarError::Gateway(format!(
                "{} returned status {}",
                path, status
            )));
        }
        Ok(text)
    }
}
