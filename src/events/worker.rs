use tokio::sync::mpsc;
use tracing::info;

use crate::handlers::reschedule::{ChatEvent, RescheduleEngine};

pub async fn run_event_worker(mut rx: mpsc::Receiver<ChatEvent>, engine: RescheduleEngine) {
    while let Some(event) = rx.recv().await {
        engine.handle_event(event).await;
    }
    info!("chat event bus closed, worker stopping");
}
