//! Read-side projections over the event collection: the day list, the
//! calendar markers and the AI insights list. Nothing here mutates.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::event::{Event, EventType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateMarker {
    pub selected: bool,
    pub marked: bool,
}

/// Events starting on `date`, earliest first. Unscheduled events never
/// show up on any day.
pub fn day_events(events: &[Event], date: NaiveDate, tz: Tz) -> Vec<Event> {
    let mut day: Vec<Event> = events
        .iter()
        .filter(|event| event.starts_on(date, tz))
        .cloned()
        .collect();
    day.sort_by_key(|event| event.start_time);
    day
}

pub fn marked_dates(events: &[Event], selected: NaiveDate, tz: Tz) -> BTreeMap<NaiveDate, DateMarker> {
    let mut markers: BTreeMap<NaiveDate, DateMarker> = BTreeMap::new();
    for start in events.iter().filter_map(|event| event.start_time) {
        markers
            .entry(start.with_timezone(&tz).date_naive())
            .or_default()
            .marked = true;
    }
    markers.entry(selected).or_default().selected = true;
    markers
}

/// Flexible events carrying a suggestion, ordered by suggested start.
pub fn ai_insights(events: &[Event]) -> Vec<Event> {
    let mut insights: Vec<Event> = events
        .iter()
        .filter(|event| event.event_type == EventType::Flexible && event.ai_suggestion.is_some())
        .cloned()
        .collect();
    insights.sort_by_key(|event| event.ai_suggestion.as_ref().map(|s| s.starting_time));
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::AiSuggestion;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(id: &str, start: Option<DateTime<Utc>>) -> Event {
        Event {
            id: id.to_string(),
            title: id.to_string(),
            location: "x".to_string(),
            event_type: EventType::Fixed,
            start_time: start,
            end_time: start.map(|s| s + chrono::Duration::minutes(30)),
            duration: Some(30),
            note: None,
            ai_suggestion: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_events_filters_and_orders() {
        let events = vec![
            at("late", Some(Utc.with_ymd_and_hms(2024, 3, 15, 18, 0, 0).unwrap())),
            at("other-day", Some(Utc.with_ymd_and_hms(2024, 3, 16, 9, 0, 0).unwrap())),
            at("unscheduled", None),
            at("early", Some(Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap())),
        ];
        let ids: Vec<String> = day_events(&events, date(2024, 3, 15), Tz::UTC)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn day_events_is_idempotent() {
        let events = vec![
            at("b", Some(Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap())),
            at("a", Some(Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap())),
        ];
        let first = day_events(&events, date(2024, 3, 15), Tz::UTC);
        let second = day_events(&events, date(2024, 3, 15), Tz::UTC);
        assert_eq!(first, second);
    }

    #[test]
    fn day_uses_wall_clock_of_zone() {
        // 02:00 UTC on the 16th is still the evening of the 15th in New York.
        let events = vec![at("evening", Some(Utc.with_ymd_and_hms(2024, 3, 16, 2, 0, 0).unwrap()))];
        let tz = chrono_tz::America::New_York;
        assert_eq!(day_events(&events, date(2024, 3, 15), tz).len(), 1);
        assert!(day_events(&events, date(2024, 3, 16), tz).is_empty());
    }

    #[test]
    fn markers_flag_event_days_and_selection_separately() {
        let events = vec![
            at("a", Some(Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap())),
            at("b", Some(Utc.with_ymd_and_hms(2024, 3, 17, 10, 0, 0).unwrap())),
            at("c", None),
        ];
        let markers = marked_dates(&events, date(2024, 3, 17), Tz::UTC);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[&date(2024, 3, 15)], DateMarker { selected: false, marked: true });
        assert_eq!(markers[&date(2024, 3, 17)], DateMarker { selected: true, marked: true });

        let markers = marked_dates(&events, date(2024, 3, 20), Tz::UTC);
        assert_eq!(markers[&date(2024, 3, 20)], DateMarker { selected: true, marked: false });
    }

    #[test]
    fn insights_only_suggested_flexible_events() {
        let suggestion = |h| AiSuggestion {
            starting_time: Utc.with_ymd_and_hms(2024, 3, 15, h, 0, 0).unwrap(),
            reason: "r".to_string(),
        };
        let mut later = at("later", None);
        later.event_type = EventType::Flexible;
        later.ai_suggestion = Some(suggestion(15));
        let mut sooner = at("sooner", None);
        sooner.event_type = EventType::Flexible;
        sooner.ai_suggestion = Some(suggestion(9));
        let mut unsuggested = at("unsuggested", None);
        unsuggested.event_type = EventType::Flexible;
        let mut fixed = at("fixed", None);
        fixed.ai_suggestion = Some(suggestion(8));

        let ids: Vec<String> = ai_insights(&[later, unsuggested, fixed, sooner])
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["sooner", "later"]);
    }
}
