use chrono::NaiveDate;

use crate::models::{Event, EventId, NewEvent};

/// Built-in events shown before (or without) the remote list.
pub fn baseline_events() -> Vec<Event> {
    [
        (1, "Hackathon", (2025, 10, 12), "Klaus"),
        (2, "Gourd Workshop", (2025, 10, 17), "Clough"),
        (3, "Science Fair", (2025, 10, 28), "McCamish Pavilion"),
    ]
    .into_iter()
    .filter_map(|(id, title, (y, m, d), location)| {
        let date = NaiveDate::from_ymd_opt(y, m, d)?;
        Some(Event::from_new(
            EventId::from(id as i64),
            NewEvent {
                title: title.to_string(),
                date,
                time: String::new(),
                end_time: String::new(),
                location: location.to_string(),
                category: String::new(),
                description: String::new(),
                organizer: String::new(),
                image: String::new(),
                created_by: String::new(),
            },
        ))
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_ids_and_locations() {
        let events = baseline_events();
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(events[2].location, "McCamish Pavilion");
        assert!(events.iter().all(|e| e.likes == 0 && e.liked_by.is_empty()));
    }
}
