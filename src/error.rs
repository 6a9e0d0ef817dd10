use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("AI gateway error: {0}")]
    Gateway(String),

    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid state: {0}")]
    State(String),

    #[error("Login required")]
    Unauthorized,

    #[error("Event not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CalendarError {
    /// Errors raised by the AI backends, as opposed to the caller's input.
    pub fn is_gateway(&self) -> bool {
        matches!(
            self,
            CalendarError::Gateway(_) | CalendarError::Http(_) | CalendarError::Decode(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CalendarError>;
