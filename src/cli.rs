use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use inquire::{Confirm, InquireError, Password, PasswordDisplayMode, Select, Text};
use tokio::sync::Mutex;
use tracing::error;

use crate::error::Result;
use crate::handlers::reschedule::{ChatEvent, RescheduleEngine};
use crate::handlers::responder::ConsoleResponder;
use crate::models::chat::{ChatSession, ConversationState};
use crate::models::event::{DraftTiming, Event, EventDraft};
use crate::runtime::Services;
use crate::service::calendar_view;
use crate::timefmt;

#[derive(Parser)]
#[command(name = "smart-calendar", about = "Calendar with AI-suggested times")]
pub struct Cli {
    /// KEY=value file read before the environment.
    #[arg(long)]
    pub config: Option<String>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive calendar in the terminal.
    Shell,
    /// HTTP API.
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

const MENU: [&str; 6] = [
    "Add event",
    "Day view",
    "Event details",
    "AI insights",
    "Chat",
    "Quit",
];

pub async fn shell(services: Services) -> Result<()> {
    if !login(&services).await? {
        return Ok(());
    }

    let session = Arc::new(Mutex::new(ChatSession::new()));
    let engine = services.reschedule_engine(session, Arc::new(ConsoleResponder));

    loop {
        let choice = match Select::new("What next?", MENU.to_vec()).prompt() {
            Ok(choice) => choice,
            Err(_) => return Ok(()),
        };
        let outcome = match choice {
            "Add event" => add_event(&services).await,
            "Day view" => day_view(&services).await,
            "Event details" => event_details(&services).await,
            "AI insights" => insights(&services).await,
            "Chat" => {
                chat(&engine).await;
                Ok(())
            }
            _ => return Ok(()),
        };
        if let Err(err) = outcome {
            error!("{}", err);
            println!("Something went wrong: {}", err);
        }
    }
}

// Returns false when the user backs out of the prompt.
async fn login(services: &Services) -> Result<bool> {
    if services.auth.current_user().await?.is_some() {
        return Ok(true);
    }
    loop {
        let Some(username) = ask(Text::new("Username:").prompt()) else {
            return Ok(false);
        };
        let Some(password) = ask(
            Password::new("Password:")
                .without_confirmation()
                .with_display_mode(PasswordDisplayMode::Masked)
                .prompt(),
        ) else {
            return Ok(false);
        };
        match services.auth.login(username.trim(), &password).await {
            Ok(user) => {
                println!("Welcome, {}!", user.username);
                return Ok(true);
            }
            Err(err) => println!("{}", err),
        }
    }
}

async fn add_event(services: &Services) -> Result<()> {
    services.auth.require_user().await?;
    let Some(title) = ask(Text::new("Event title:").prompt()) else {
        return Ok(());
    };
    let Some(location) = ask(Text::new("Location:").prompt()) else {
        return Ok(());
    };
    let Some(flexible) = ask(Confirm::new("Flexible event?").with_default(false).prompt()) else {
        return Ok(());
    };
    let timing = if flexible {
        let Some(duration) = ask(Text::new("Duration (minutes):").prompt()) else {
            return Ok(());
        };
        DraftTiming::Flexible { duration }
    } else {
        let Some(start) = ask(
            Text::new("Start time:")
                .with_placeholder("YYYY-MM-DD HH:mm")
                .prompt(),
        ) else {
            return Ok(());
        };
        let Some(end) = ask(Text::new("End time:").with_placeholder("YYYY-MM-DD HH:mm").prompt())
        else {
            return Ok(());
        };
        DraftTiming::Fixed { start, end }
    };
    let note = ask(Text::new("Notes:").prompt()).filter(|note| !note.trim().is_empty());

    let added = services
        .events
        .submit(
            EventDraft {
                title,
                location,
                note,
                timing,
            },
            Utc::now(),
        )
        .await?;
    let event = added.event;
    match event.ai_suggestion.as_ref() {
        Some(suggestion) => println!(
            "Added {}.\nAI suggestion: {}",
            event.describe(services.tz),
            suggestion.reason
        ),
        None => println!("Added {}.", event.describe(services.tz)),
    }
    if added.ai_error.is_some() {
        println!("The AI scheduler could not be reached, so the event was saved without a time.");
    }
    Ok(())
}

async fn day_view(services: &Services) -> Result<()> {
    services.auth.require_user().await?;
    let today = Utc::now()
        .with_timezone(&services.tz)
        .format(timefmt::DATE_FORMAT)
        .to_string();
    let Some(raw) = ask(Text::new("Date:").with_default(&today).prompt()) else {
        return Ok(());
    };
    let date = timefmt::parse_calendar_date(raw.trim())?;
    let events = services.events.list().await?;

    let marked: Vec<String> = calendar_view::marked_dates(&events, date, services.tz)
        .into_iter()
        .filter(|(_, marker)| marker.marked)
        .map(|(day, _)| day.format(timefmt::DATE_FORMAT).to_string())
        .collect();
    if !marked.is_empty() {
        println!("Days with events: {}", marked.join(", "));
    }

    println!("Events for {}", date.format(timefmt::DATE_FORMAT));
    let day = calendar_view::day_events(&events, date, services.tz);
    if day.is_empty() {
        println!("  (nothing scheduled)");
    }
    for event in day {
        print_summary(&event, services);
    }
    Ok(())
}

async fn event_details(services: &Services) -> Result<()> {
    services.auth.require_user().await?;
    let Some(id) = ask(Text::new("Event id:").prompt()) else {
        return Ok(());
    };
    let event = services.events.find(id.trim()).await?;
    println!("{} [{:?}]", event.title, event.event_type);
    println!("  Location: {}", event.location);
    match (event.start_time, event.end_time) {
        (Some(start), Some(end)) => println!(
            "  Time: {} -> {}",
            timefmt::to_wire_local(&start, services.tz),
            timefmt::to_wire_local(&end, services.tz)
        ),
        _ => println!("  Time: unscheduled"),
    }
    if let Some(minutes) = event.duration_minutes() {
        println!("  Duration: {} minutes", minutes);
    }
    if let Some(note) = &event.note {
        println!("  Notes: {}", note);
    }
    if let Some(suggestion) = &event.ai_suggestion {
        println!(
            "  AI suggestion: {} ({})",
            timefmt::to_wire_local(&suggestion.starting_time, services.tz),
            suggestion.reason
        );
    }
    Ok(())
}

async fn insights(services: &Services) -> Result<()> {
    services.auth.require_user().await?;
    let insights = calendar_view::ai_insights(&services.events.list().await?);
    if insights.is_empty() {
        println!("No AI suggestions available. Add some flexible events to get started!");
    }
    for event in insights {
        if let Some(suggestion) = &event.ai_suggestion {
            println!(
                "{} - suggested {}\n  Reason: {}\n  Location: {}",
                event.title,
                timefmt::to_wire_local(&suggestion.starting_time, services.tz),
                suggestion.reason,
                event.location
            );
        }
    }
    Ok(())
}

async fn chat(engine: &RescheduleEngine) {
    println!("Tell me which event to move. Leave the line empty to go back.");
    loop {
        let Some(text) = ask(Text::new("You:").prompt()) else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }
        engine.handle_event(ChatEvent::MessageSent { text }).await;

        if engine.state().await == ConversationState::AwaitingConfirmation {
            let decision = ask(Select::new("Apply this change?", vec!["Confirm", "Cancel"]).prompt());
            let event = match decision {
                Some("Confirm") => ChatEvent::ChangeConfirmed,
                _ => ChatEvent::ChangeCanceled,
            };
            engine.handle_event(event).await;
        }
    }
}

fn print_summary(event: &Event, services: &Services) {
    let times = match (event.start_time, event.end_time) {
        (Some(start), Some(end)) => format!(
            "{} - {}",
            start.with_timezone(&services.tz).format("%H:%M"),
            end.with_timezone(&services.tz).format("%H:%M")
        ),
        _ => String::new(),
    };
    println!(
        "  [{}] {} @ {} {} ({:?})",
        event.id, event.title, event.location, times, event.event_type
    );
}

fn ask<T>(result: std::result::Result<T, InquireError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => None,
        Err(err) => {
            error!("prompt failed: {}", err);
            None
        }
    }
}
