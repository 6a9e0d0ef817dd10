use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::models::event::Event;
use crate::models::user::UserData;
use crate::store::{EventRepository, UserRepository};

/// Process-memory backing for both repositories. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: Mutex<Vec<Event>>,
    user: Mutex<Option<UserData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events),
            user: Mutex::new(None),
        }
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<Event>> {
        Ok(self.events.lock().await.clone())
    }

    async fn replace_all(&self, events: Vec<Event>) -> Result<()> {
        let mut guard = self.events.lock().await;
        debug!("replacing {} stored events with {}", guard.len(), events.len());
        *guard = events;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_user(&self) -> Result<Option<UserData>> {
        Ok(self.user.lock().await.clone())
    }

    async fn save_user(&self, user: UserData) -> Result<()> {
        *self.user.lock().await = Some(user);
        Ok(())
    }
}
