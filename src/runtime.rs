use std::net::SocketAddr;
use std::sync::Arc;

use chrono_tz::Tz;
use tokio::sync::Mutex;
use tracing::info;

use crate::clients::openai_client::{OpenAIClient, OpenAISettings};
use crate::clients::schedule_client::ScheduleClient;
use crate::config::{AiBackend, Settings};
use crate::error::{CalendarError, Result};
use crate::events::queue::EventBus;
use crate::events::worker::run_event_worker;
use crate::handlers::http::{self, ApiContext};
use crate::handlers::reschedule::RescheduleEngine;
use crate::handlers::responder::{ChatResponder, TranscriptOnlyResponder};
use crate::models::chat::ChatSession;
use crate::service::ai_gateway::{AiGateway, OpenAIGateway, ScheduleServiceGateway};
use crate::service::auth_service::AuthService;
use crate::service::event_service::EventService;
use crate::store::MemoryStore;
use crate::tasks::task_runner::TaskRunner;

/// Everything a front-end needs, sharing one in-memory store.
pub struct Services {
    pub store: Arc<MemoryStore>,
    pub ai: Arc<dyn AiGateway>,
    pub auth: Arc<AuthService>,
    pub events: Arc<EventService>,
    pub tz: Tz,
}

impl Services {
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_gateway(build_gateway(settings), settings.timezone)
    }

    pub fn with_gateway(ai: Arc<dyn AiGateway>, tz: Tz) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            auth: Arc::new(AuthService::new(store.clone())),
            events: Arc::new(EventService::new(store.clone(), ai.clone(), tz)),
            store,
            ai,
            tz,
        }
    }

    pub fn reschedule_engine(
        &self,
        session: Arc<Mutex<ChatSession>>,
        responder: Arc<dyn ChatResponder>,
    ) -> RescheduleEngine {
        RescheduleEngine::new(session, self.ai.clone(), self.store.clone(), responder, self.tz)
    }
}

pub fn build_gateway(settings: &Settings) -> Arc<dyn AiGateway> {
    match settings.ai_backend {
        AiBackend::Service => {
            info!("using scheduling service at {}", settings.ai_service_url);
            Arc::new(ScheduleServiceGateway::new(
                ScheduleClient::new(&settings.ai_service_url),
                settings.timezone,
            ))
        }
        AiBackend::OpenAI => {
            info!(
                "using {} at {}",
                settings.openai_model, settings.openai_base_url
            );
            Arc::new(OpenAIGateway::new(
                OpenAIClient::new(OpenAISettings {
                    base_url: settings.openai_base_url.clone(),
                    api_key: settings.openai_api_key.clone(),
                    model: settings.openai_model.clone(),
                }),
                settings.timezone,
            ))
        }
    }
}

pub async fn run_api(services: Services, bind: &str) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| CalendarError::Config(format!("invalid bind address {}: {}", bind, e)))?;

    let session = Arc::new(Mutex::new(ChatSession::new()));
    let (bus, rx) = EventBus::new(64);
    let engine = services.reschedule_engine(session.clone(), Arc::new(TranscriptOnlyResponder));

    let mut task_runner = TaskRunner::new();
    task_runner.add_task("chat-worker", move || {
        tokio::spawn(run_event_worker(rx, engine));
    });
    task_runner.start_all();

    let ctx = ApiContext {
        auth: services.auth.clone(),
        events: services.events.clone(),
        session,
        bus,
    };
    info!("API listening on {}", addr);
    warp::serve(http::routes(ctx)).run(addr).await;
    Ok(())
}
