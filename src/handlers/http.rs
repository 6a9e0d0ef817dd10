use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::error;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

use crate::error::{CalendarError, Result};
use crate::events::queue::EventBus;
use crate::handlers::reschedule::ChatEvent;
use crate::models::chat::{ChatMessage, ChatSession, ConversationState, StagedChange};
use crate::models::event::{Event, EventDraft};
use crate::models::user::UserData;
use crate::service::auth_service::AuthService;
use crate::service::calendar_view::{self, DateMarker};
use crate::service::event_service::{AddedEvent, EventService};
use crate::timefmt;

#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarksQuery {
    pub selected: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Queued {
    pub queued: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatView {
    pub state: ConversationState,
    pub staged: Option<StagedChange>,
    pub transcript: Vec<ChatMessage>,
}

#[derive(Clone)]
pub struct ApiContext {
    pub auth: Arc<AuthService>,
    pub events: Arc<EventService>,
    pub session: Arc<Mutex<ChatSession>>,
    pub bus: EventBus,
}

pub fn routes(
    ctx: ApiContext,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let with_ctx = warp::any().map(move || ctx.clone());

    let login_route = warp::path!("login")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_ctx.clone())
        .then(|body: LoginRequest, ctx: ApiContext| async move {
            respond(login(&ctx, body).await, StatusCode::OK)
        });

    let list_events_route = warp::path!("events")
        .and(warp::get())
        .and(warp::query::<DayQuery>())
        .and(with_ctx.clone())
        .then(|query: DayQuery, ctx: ApiContext| async move {
            respond(list_events(&ctx, query).await, StatusCode::OK)
        });

    let add_event_route = warp::path!("events")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_ctx.clone())
        .then(|draft: EventDraft, ctx: ApiContext| async move {
            respond(add_event(&ctx, draft).await, StatusCode::CREATED)
        });

    let event_detail_route = warp::path!("events" / String)
        .and(warp::get())
        .and(with_ctx.clone())
        .then(|id: String, ctx: ApiContext| async move {
            respond(event_detail(&ctx, &id).await, StatusCode::OK)
        });

    let insights_route = warp::path!("insights")
        .and(warp::get())
        .and(with_ctx.clone())
        .then(|ctx: ApiContext| async move { respond(insights(&ctx).await, StatusCode::OK) });

    let marks_route = warp::path!("calendar" / "marks")
        .and(warp::get())
        .and(warp::query::<MarksQuery>())
        .and(with_ctx.clone())
        .then(|query: MarksQuery, ctx: ApiContext| async move {
            respond(marks(&ctx, query).await, StatusCode::OK)
        });

    let send_chat_route = warp::path!("chat")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_ctx.clone())
        .then(|body: ChatRequest, ctx: ApiContext| async move {
            let event = ChatEvent::MessageSent { text: body.message };
            respond(enqueue(&ctx, event).await, StatusCode::ACCEPTED)
        });

    let confirm_route = warp::path!("chat" / "confirm")
        .and(warp::post())
        .and(with_ctx.clone())
        .then(|ctx: ApiContext| async move {
            respond(enqueue(&ctx, ChatEvent::ChangeConfirmed).await, StatusCode::ACCEPTED)
        });

    let cancel_route = warp::path!("chat" / "cancel")
        .and(warp::post())
        .and(with_ctx.clone())
        .then(|ctx: ApiContext| async move {
            respond(enqueue(&ctx, ChatEvent::ChangeCanceled).await, StatusCode::ACCEPTED)
        });

    let chat_view_route = warp::path!("chat")
        .and(warp::get())
        .and(with_ctx)
        .then(|ctx: ApiContext| async move { respond(chat_view(&ctx).await, StatusCode::OK) });

    login_route
        .or(list_events_route)
        .unify()
        .or(add_event_route)
        .unify()
        .or(event_detail_route)
        .unify()
        .or(insights_route)
        .unify()
        .or(marks_route)
        .unify()
        .or(send_chat_route)
        .unify()
        .or(confirm_route)
        .unify()
        .or(cancel_route)
        .unify()
        .or(chat_view_route)
        .unify()
}

async fn login(ctx: &ApiContext, body: LoginRequest) -> Result<UserData> {
    ctx.auth.login(&body.username, &body.password).await
}

async fn list_events(ctx: &ApiContext, query: DayQuery) -> Result<Vec<Event>> {
    ctx.auth.require_user().await?;
    let events = ctx.events.list().await?;
    match query.date {
        Some(date) => {
            let date = timefmt::parse_calendar_date(&date)?;
            Ok(calendar_view::day_events(&events, date, ctx.events.timezone()))
        }
        None => Ok(events),
    }
}

async fn add_event(ctx: &ApiContext, draft: EventDraft) -> Result<AddedEvent> {
    ctx.auth.require_user().await?;
    ctx.events.submit(draft, Utc::now()).await
}

async fn event_detail(ctx: &ApiContext, id: &str) -> Result<Event> {
    ctx.auth.require_user().await?;
    ctx.events.find(id).await
}

async fn insights(ctx: &ApiContext) -> Result<Vec<Event>> {
    ctx.auth.require_user().await?;
    Ok(calendar_view::ai_insights(&ctx.events.list().await?))
}

async fn marks(ctx: &ApiContext, query: MarksQuery) -> Result<BTreeMap<String, DateMarker>> {
    ctx.auth.require_user().await?;
    let selected = timefmt::parse_calendar_date(&query.selected)?;
    let events = ctx.events.list().await?;
    Ok(
        calendar_view::marked_dates(&events, selected, ctx.events.timezone())
            .into_iter()
            .map(|(date, marker)| (date.format(timefmt::DATE_FORMAT).to_string(), marker))
            .collect(),
    )
}

async fn enqueue(ctx: &ApiContext, event: ChatEvent) -> Result<Queued> {
    ctx.auth.require_user().await?;
    if ctx.bus.emit(event).await {
        Ok(Queued { queued: true })
    } else {
        Err(CalendarError::State("chat worker is not running".to_string()))
    }
}

async fn chat_view(ctx: &ApiContext) -> Result<ChatView> {
    ctx.auth.require_user().await?;
    let session = ctx.session.lock().await;
    Ok(ChatView {
        state: session.state,
        staged: session.staged.clone(),
        transcript: session.transcript.clone(),
    })
}

pub fn status_for(err: &CalendarError) -> StatusCode {
    match err {
        CalendarError::Validation(_) => StatusCode::BAD_REQUEST,
        CalendarError::Unauthorized => StatusCode::UNAUTHORIZED,
        CalendarError::NotFound(_) => StatusCode::NOT_FOUND,
        CalendarError::State(_) => StatusCode::CONFLICT,
        CalendarError::Gateway(_) | CalendarError::Http(_) | CalendarError::Decode(_) => {
            StatusCode::BAD_GATEWAY
        }
        CalendarError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn respond<T: Serialize>(result: Result<T>, success: StatusCode) -> Response {
    match result {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), success).into_response(),
        Err(err) => {
            let status = status_for(&err);
            if status.is_server_error() {
                error!("request failed: {}", err);
            }
            warp::reply::with_status(
                warp::reply::json(&ErrorMessage {
                    error: err.to_string(),
                }),
                status,
            )
            .into_response()
        }
    }
}
