use std::sync::Arc;

use tracing::info;

use crate::error::{CalendarError, Result};
use crate::models::user::UserData;
use crate::store::UserRepository;

/// Login gate. Credentials are stored as typed and never checked again;
/// having a saved user is what unlocks the calendar.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserData> {
        if username.is_empty() || password.is_empty() {
            return Err(CalendarError::Validation(
                "username and password are required".to_string(),
            ));
        }
        let user = UserData {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.users.save_user(user.clone()).await?;
        info!("user {} logged in", user.username);
        Ok(user)
    }

    pub async fn current_user(&self) -> Result<Option<UserData>> {
        self.users.get_user().await
    }

    pub async fn require_user(&self) -> Result<UserData> {
        self.current_user().await?.ok_or(CalendarError::Unauthorized)
    }
}
