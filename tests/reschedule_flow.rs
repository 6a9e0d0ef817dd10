use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use smartCalendar::error::{CalendarError, Result};
use smartCalendar::handlers::reschedule::{
    CLARIFICATION_MESSAGE, ChatEvent, ERROR_MESSAGE, PENDING_MESSAGE, RescheduleEngine,
};
use smartCalendar::handlers::responder::ChatResponder;
use smartCalendar::models::chat::{ChatMessage, ChatSession, ConversationState, Sender};
use smartCalendar::models::event::{AiSuggestion, Event, EventType};
use smartCalendar::service::ai_gateway::AiGateway;
use smartCalendar::store::{EventRepository, MemoryStore};
use tokio::sync::Mutex;

struct FakeGateway {
    identify: std::result::Result<Option<String>, String>,
    reschedule: std::result::Result<Option<AiSuggestion>, String>,
}

#[async_trait]
impl AiGateway for FakeGateway {
    async fn suggest_time(
        &self,
        _fixed_events: &[Event],
        _flexible_event: &Event,
    ) -> Result<Option<AiSuggestion>> {
        Ok(None)
    }

    async fn identify_event_to_reschedule(
        &self,
        _message: &str,
        _events: &[Event],
    ) -> Result<Option<String>> {
        self.identify.clone().map_err(CalendarError::Gateway)
    }

    async fn suggest_reschedule_time(
        &self,
        _event: &Event,
        _other_events: &[Event],
        _message: &str,
    ) -> Result<Option<AiSuggestion>> {
        self.reschedule.clone().map_err(CalendarError::Gateway)
    }
}

#[derive(Default)]
struct CapturingResponder {
    replies: Mutex<Vec<String>>,
}

#[async_trait]
impl ChatResponder for CapturingResponder {
    async fn reply(&self, message: &ChatMessage) -> std::result::Result<(), String> {
        self.replies.lock().await.push(message.text.clone());
        Ok(())
    }
}

struct BrokenStore {
    events: Vec<Event>,
}

#[async_trait]
impl EventRepository for BrokenStore {
    async fn list(&self) -> Result<Vec<Event>> {
        Ok(self.events.clone())
    }

    async fn replace_all(&self, _events: Vec<Event>) -> Result<()> {
        Err(CalendarError::State("disk full".to_string()))
    }
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, hour, minute, 0).unwrap()
}

fn calendar() -> Vec<Event> {
    vec![
        Event {
            id: "1710511200000".to_string(),
            title: "Dentist".to_string(),
            location: "Main St".to_string(),
            event_type: EventType::Fixed,
            start_time: Some(at(10, 0)),
            end_time: Some(at(11, 0)),
            duration: Some(60),
            note: None,
            ai_suggestion: None,
        },
        Event {
            id: "1710511300000".to_string(),
            title: "Gym".to_string(),
            location: "Club".to_string(),
            event_type: EventType::Flexible,
            start_time: Some(at(16, 0)),
            end_time: Some(at(16, 45)),
            duration: Some(45),
            note: None,
            ai_suggestion: None,
        },
    ]
}

fn evening_slot() -> AiSuggestion {
    AiSuggestion {
        starting_time: at(18, 0),
        reason: "Your evening is free".to_string(),
    }
}

struct Harness {
    engine: RescheduleEngine,
    store: Arc<MemoryStore>,
    responder: Arc<CapturingResponder>,
}

fn harness(gateway: FakeGateway) -> Harness {
    let store = Arc::new(MemoryStore::with_events(calendar()));
    let responder = Arc::new(CapturingResponder::default());
    let engine = RescheduleEngine::new(
        Arc::new(Mutex::new(ChatSession::new())),
        Arc::new(gateway),
        store.clone(),
        responder.clone(),
        chrono_tz::UTC,
    );
    Harness {
        engine,
        store,
        responder,
    }
}

async fn say(engine: &RescheduleEngine, text: &str) {
    engine
        .handle_event(ChatEvent::MessageSent {
            text: text.to_string(),
        })
        .await;
}

#[tokio::test]
async fn confirm_persists_the_staged_collection() {
    let h = harness(FakeGateway {
        identify: Ok(Some("1710511300000".to_string())),
        reschedule: Ok(Some(evening_slot())),
    });

    say(&h.engine, "move gym to the evening").await;
    assert_eq!(h.engine.state().await, ConversationState::AwaitingConfirmation);
    // Nothing is written before confirmation.
    assert_eq!(h.store.list().await.unwrap(), calendar());

    let staged_events = {
        let session = h.engine.session();
        let guard = session.lock().await;
        let staged = guard.staged.as_ref().expect("change staged");
        assert_eq!(staged.original.start_time, Some(at(16, 0)));
        assert_eq!(staged.updated.start_time, Some(at(18, 0)));
        assert_eq!(staged.updated.end_time, Some(at(18, 45)));
        staged.events.clone()
    };

    h.engine.handle_event(ChatEvent::ChangeConfirmed).await;

    let stored = h.store.list().await.unwrap();
    assert_eq!(stored, staged_events);
    assert_eq!(stored[0], calendar()[0]);
    assert_eq!(stored[1].ai_suggestion, Some(evening_slot()));
    assert_eq!(h.engine.state().await, ConversationState::Idle);
    assert!(h.engine.session().lock().await.staged.is_none());

    let replies = h.responder.replies.lock().await;
    assert_eq!(replies.len(), 3);
    assert!(replies[0].starts_with("Found \"Gym\""));
    assert!(replies[1].contains("2024-03-15 18:00"));
    assert!(replies[2].starts_with("Done!"));
}

#[tokio::test]
async fn cancel_leaves_storage_untouched() {
    let h = harness(FakeGateway {
        identify: Ok(Some("1710511300000".to_string())),
        reschedule: Ok(Some(evening_slot())),
    });

    say(&h.engine, "move gym to the evening").await;
    h.engine.handle_event(ChatEvent::ChangeCanceled).await;

    assert_eq!(h.store.list().await.unwrap(), calendar());
    assert_eq!(h.engine.state().await, ConversationState::Idle);
    assert!(h.engine.session().lock().await.staged.is_none());
    let replies = h.responder.replies.lock().await;
    assert_eq!(replies.last().unwrap(), "Okay, I kept \"Gym\" where it was.");
}

#[tokio::test]
async fn unidentified_event_asks_for_clarification_once() {
    let h = harness(FakeGateway {
        identify: Ok(None),
        reschedule: Ok(Some(evening_slot())),
    });

    say(&h.engine, "move that thing").await;

    assert_eq!(h.engine.state().await, ConversationState::Idle);
    assert!(h.engine.session().lock().await.staged.is_none());
    let replies = h.responder.replies.lock().await;
    assert_eq!(replies.as_slice(), [CLARIFICATION_MESSAGE.to_string()]);
}

#[tokio::test]
async fn unknown_id_is_treated_as_unidentified() {
    let h = harness(FakeGateway {
        identify: Ok(Some("42".to_string())),
        reschedule: Ok(Some(evening_slot())),
    });

    say(&h.engine, "move my meeting").await;

    let replies = h.responder.replies.lock().await;
    assert_eq!(replies.as_slice(), [CLARIFICATION_MESSAGE.to_string()]);
    assert_eq!(h.store.list().await.unwrap(), calendar());
}

#[tokio::test]
async fn identification_error_sends_generic_message() {
    let h = harness(FakeGateway {
        identify: Err("connection refused".to_string()),
        reschedule: Ok(None),
    });

    say(&h.engine, "move gym").await;

    assert_eq!(h.engine.state().await, ConversationState::Idle);
    let replies = h.responder.replies.lock().await;
    assert_eq!(replies.as_slice(), [ERROR_MESSAGE.to_string()]);
}

#[tokio::test]
async fn missing_or_failed_suggestion_returns_to_idle() {
    for reschedule in [Ok(None), Err("timeout".to_string())] {
        let h = harness(FakeGateway {
            identify: Ok(Some("1710511300000".to_string())),
            reschedule,
        });

        say(&h.engine, "move gym").await;

        assert_eq!(h.engine.state().await, ConversationState::Idle);
        assert!(h.engine.session().lock().await.staged.is_none());
        assert_eq!(h.store.list().await.unwrap(), calendar());
        let replies = h.responder.replies.lock().await;
        assert!(replies.last().unwrap().contains("Your calendar is unchanged"));
    }
}

#[tokio::test]
async fn confirm_or_cancel_without_staged_change_is_noop() {
    let h = harness(FakeGateway {
        identify: Ok(None),
        reschedule: Ok(None),
    });

    h.engine.handle_event(ChatEvent::ChangeConfirmed).await;
    h.engine.handle_event(ChatEvent::ChangeCanceled).await;

    assert_eq!(h.engine.state().await, ConversationState::Idle);
    assert_eq!(h.store.list().await.unwrap(), calendar());
    assert!(h.responder.replies.lock().await.is_empty());
}

#[tokio::test]
async fn new_message_while_awaiting_confirmation_keeps_staged_change() {
    let h = harness(FakeGateway {
        identify: Ok(Some("1710511300000".to_string())),
        reschedule: Ok(Some(evening_slot())),
    });

    say(&h.engine, "move gym to the evening").await;
    say(&h.engine, "actually move the dentist").await;

    assert_eq!(h.engine.state().await, ConversationState::AwaitingConfirmation);
    assert!(h.engine.session().lock().await.staged.is_some());
    let replies = h.responder.replies.lock().await;
    assert_eq!(replies.last().unwrap(), PENDING_MESSAGE);
}

#[tokio::test]
async fn blank_message_is_ignored() {
    let h = harness(FakeGateway {
        identify: Ok(Some("1710511300000".to_string())),
        reschedule: Ok(Some(evening_slot())),
    });

    say(&h.engine, "   ").await;

    assert_eq!(h.engine.state().await, ConversationState::Idle);
    assert!(h.engine.session().lock().await.transcript.is_empty());
    assert!(h.responder.replies.lock().await.is_empty());
}

#[tokio::test]
async fn transcript_records_both_sides() {
    let h = harness(FakeGateway {
        identify: Ok(None),
        reschedule: Ok(None),
    });

    say(&h.engine, "move that thing").await;

    let session = h.engine.session();
    let guard = session.lock().await;
    let senders: Vec<Sender> = guard.transcript.iter().map(|m| m.sender).collect();
    assert_eq!(senders, vec![Sender::User, Sender::Ai]);
    assert_eq!(guard.transcript[0].text, "move that thing");
}

#[tokio::test]
async fn failed_persist_keeps_change_staged() {
    let store = Arc::new(BrokenStore { events: calendar() });
    let responder = Arc::new(CapturingResponder::default());
    let engine = RescheduleEngine::new(
        Arc::new(Mutex::new(ChatSession::new())),
        Arc::new(FakeGateway {
            identify: Ok(Some("1710511300000".to_string())),
            reschedule: Ok(Some(evening_slot())),
        }),
        store,
        responder.clone(),
        chrono_tz::UTC,
    );

    say(&engine, "move gym to the evening").await;
    engine.handle_event(ChatEvent::ChangeConfirmed).await;

    assert!(engine.session().lock().await.staged.is_some());
    assert_eq!(engine.state().await, ConversationState::AwaitingConfirmation);
    let replies = responder.replies.lock().await;
    assert!(replies.last().unwrap().contains("couldn't save"));
}

#[tokio::test]
async fn unrepresentable_end_time_keeps_worker_alive() {
    let mut events = calendar();
    events[1].duration = Some(i64::MAX / 2);
    let store = Arc::new(MemoryStore::with_events(events.clone()));
    let responder = Arc::new(CapturingResponder::default());
    let engine = RescheduleEngine::new(
        Arc::new(Mutex::new(ChatSession::new())),
        Arc::new(FakeGateway {
            identify: Ok(Some("1710511300000".to_string())),
            reschedule: Ok(Some(evening_slot())),
        }),
        store.clone(),
        responder.clone(),
        chrono_tz::UTC,
    );

    say(&engine, "move gym to the evening").await;

    assert_eq!(engine.state().await, ConversationState::Idle);
    assert!(engine.session().lock().await.staged.is_none());
    assert_eq!(store.list().await.unwrap(), events);
    let replies = responder.replies.lock().await;
    assert!(replies.last().unwrap().contains("Your calendar is unchanged"));
}
