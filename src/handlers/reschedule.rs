use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::handlers::responder::ChatResponder;
use crate::models::chat::{ChatMessage, ChatSession, ConversationState, StagedChange};
use crate::models::event::Event;
use crate::service::ai_gateway::AiGateway;
use crate::store::EventRepository;
use crate::timefmt;

pub const CLARIFICATION_MESSAGE: &str =
    "I couldn't identify which event you're referring to. Could you please be more specific?";
pub const ERROR_MESSAGE: &str = "Sorry, I encountered an error while processing your request.";
pub const PENDING_MESSAGE: &str =
    "You still have a change waiting. Please confirm or cancel it first.";

#[derive(Debug)]
pub enum ChatEvent {
    MessageSent { text: String },
    ChangeConfirmed,
    ChangeCanceled,
}

/// Drives the reschedule conversation. Stored events are written only when
/// the user confirms a staged change.
pub struct RescheduleEngine {
    session: Arc<Mutex<ChatSession>>,
    ai: Arc<dyn AiGateway>,
    events: Arc<dyn EventRepository>,
    responder: Arc<dyn ChatResponder>,
    tz: Tz,
}

impl RescheduleEngine {
    pub fn new(
        session: Arc<Mutex<ChatSession>>,
        ai: Arc<dyn AiGateway>,
        events: Arc<dyn EventRepository>,
        responder: Arc<dyn ChatResponder>,
        tz: Tz,
    ) -> Self {
        Self {
            session,
            ai,
            events,
            responder,
            tz,
        }
    }

    pub fn session(&self) -> Arc<Mutex<ChatSession>> {
        self.session.clone()
    }

    pub async fn state(&self) -> ConversationState {
        self.session.lock().await.state
    }

    pub async fn handle_event(&self, event: ChatEvent) {
        match event {
            ChatEvent::MessageSent { text } => self.handle_message(text).await,
            ChatEvent::ChangeConfirmed => self.confirm().await,
            ChatEvent::ChangeCanceled => self.cancel().await,
        }
    }

    async fn handle_message(&self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }

        {
            let mut session = self.session.lock().await;
            session.transcript.push(ChatMessage::user(&text));
            if session.state == ConversationState::AwaitingConfirmation {
                drop(session);
                self.say(PENDING_MESSAGE).await;
                return;
            }
            session.state = ConversationState::AwaitingIdentification;
        }

        let snapshot = match self.events.list().await {
            Ok(events) => events,
            Err(err) => {
                error!("could not read events: {}", err);
                self.back_to_idle(ERROR_MESSAGE).await;
                return;
            }
        };

        let target = match self.ai.identify_event_to_reschedule(&text, &snapshot).await {
            Ok(Some(id)) => snapshot.iter().find(|event| event.id == id).cloned(),
            Ok(None) => None,
            Err(err) => {
                warn!("identification failed: {}", err);
                self.back_to_idle(ERROR_MESSAGE).await;
                return;
            }
        };
        let Some(target) = target else {
            info!("no event matched '{}'", text);
            self.back_to_idle(CLARIFICATION_MESSAGE).await;
            return;
        };

        self.say(&format!(
            "Found {}. Let me look for a better time.",
            target.describe(self.tz)
        ))
        .await;

        let others: Vec<Event> = snapshot
            .iter()
            .filter(|event| event.id != target.id)
            .cloned()
            .collect();
        let suggestion = match self.ai.suggest_reschedule_time(&target, &others, &text).await {
            Ok(Some(suggestion)) => suggestion,
            Ok(None) => {
                info!("no reschedule suggestion for {}", target.id);
                self.back_to_idle(&no_suggestion_message(&target)).await;
                return;
            }
            Err(err) => {
                warn!("reschedule suggestion for {} failed: {}", target.id, err);
                self.back_to_idle(&no_suggestion_message(&target)).await;
                return;
            }
        };

        let mut updated = target.clone();
        if let Err(err) = updated.apply_suggestion(suggestion.clone()) {
            warn!("cannot move {}: {}", target.id, err);
            self.back_to_idle(&no_suggestion_message(&target)).await;
            return;
        }
        let staged_events: Vec<Event> = snapshot
            .into_iter()
            .map(|event| if event.id == updated.id { updated.clone() } else { event })
            .collect();

        let prompt = format!(
            "I suggest moving \"{}\" to {}. Reason: {}\nConfirm to apply or cancel to keep the current time.",
            updated.title,
            timefmt::to_wire_local(&suggestion.starting_time, self.tz),
            suggestion.reason
        );
        {
            let mut session = self.session.lock().await;
            session.staged = Some(StagedChange {
                id: Uuid::new_v4().to_string(),
                original: target,
                updated,
                suggestion,
                events: staged_events,
                staged_at: Utc::now(),
            });
            session.state = ConversationState::AwaitingConfirmation;
        }
        self.say(&prompt).await;
    }

    async fn confirm(&self) {
        let staged = {
            let mut session = self.session.lock().await;
            match session.staged.take() {
                Some(staged) => staged,
                None => {
                    debug!("confirm with nothing staged");
                    return;
                }
            }
        };

        if let Err(err) = self.events.replace_all(staged.events.clone()).await {
            error!("failed to persist staged change {}: {}", staged.id, err);
            self.session.lock().await.staged = Some(staged);
            self.say("I couldn't save the change. Please try confirming again.")
                .await;
            return;
        }

        info!("applied staged change {} to {}", staged.id, staged.updated.id);
        self.session.lock().await.reset();
        self.say(&format!("Done! {} is now on your calendar.", staged.updated.describe(self.tz)))
            .await;
    }

    async fn cancel(&self) {
        let staged = {
            let mut session = self.session.lock().await;
            let staged = session.staged.take();
            if staged.is_some() {
                session.reset();
            }
            staged
        };
        let Some(staged) = staged else {
            debug!("cancel with nothing staged");
            return;
        };
        info!("discarded staged change {}", staged.id);
        self.say(&format!(
            "Okay, I kept \"{}\" where it was.",
            staged.original.title
        ))
        .await;
    }

    async fn back_to_idle(&self, message: &str) {
        self.session.lock().await.reset();
        self.say(message).await;
    }

    async fn say(&self, text: &str) {
        let message = ChatMessage::ai(text);
        self.session.lock().await.transcript.push(message.clone());
        if let Err(err) = self.responder.reply(&message).await {
            warn!("failed to deliver chat reply: {}", err);
        }
    }
}

fn no_suggestion_message(event: &Event) -> String {
    format!(
        "I couldn't find a new time for \"{}\". Your calendar is unchanged.",
        event.title
    )
}
