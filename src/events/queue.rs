use tokio::sync::mpsc;
use tracing::warn;

use crate::handlers::reschedule::ChatEvent;

/// Funnels chat events from concurrent request handlers into one worker,
/// so they reach the engine one at a time and in arrival order.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<ChatEvent>,
}

impl EventBus {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<ChatEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    pub async fn emit(&self, event: ChatEvent) -> bool {
        match self.tx.send(event).await {
            Ok(()) => true,
            Err(err) => {
                warn!("chat worker is gone, dropping {:?}", err.0);
                false
            }
        }
    }
}
