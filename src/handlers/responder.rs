use async_trait::async_trait;

use crate::models::chat::ChatMessage;

/// Where assistant replies go besides the session transcript.
#[async_trait]
pub trait ChatResponder: Send + Sync {
    async fn reply(&self, message: &ChatMessage) -> Result<(), String>;
}

/// Prints replies for the interactive shell.
pub struct ConsoleResponder;

#[async_trait]
impl ChatResponder for ConsoleResponder {
    async fn reply(&self, message: &ChatMessage) -> Result<(), String> {
        println!("AI: {}", message.text);
        Ok(())
    }
}

/// For front-ends that read the transcript instead, like the HTTP API.
pub struct TranscriptOnlyResponder;

#[async_trait]
impl ChatResponder for TranscriptOnlyResponder {
    async fn reply(&self, _message: &ChatMessage) -> Result<(), String> {
        Ok(())
    }
}
