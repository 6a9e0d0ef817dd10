//! Storage seam. Workflows read a full snapshot and write the whole
//! collection back; there is no partial update and no version check.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::event::Event;
use crate::models::user::UserData;

pub use memory::MemoryStore;

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Event>>;
    async fn replace_all(&self, events: Vec<Event>) -> Result<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self) -> Result<Option<UserData>>;
    async fn save_user(&self, user: UserData) -> Result<()>;
}
