// View projections - list, calendar grid and filters over the event store

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::Event;

/// Parses the free-form start times the form accepts ("6:00 PM", "6 pm", "18:30").
pub fn parse_display_time(raw: &str) -> Option<NaiveTime> {
    let mut normalized = raw.trim().to_uppercase();
    if normalized.is_empty() {
        return None;
    }
    // chrono wants minutes, so "6 PM" becomes "6:00 PM"
    if !normalized.contains(':') {
        let hour_end = normalized
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(normalized.len());
        normalized.insert_str(hour_end, ":00");
    }

    ["%I:%M %p", "%I:%M%p", "%H:%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&normalized, format).ok())
}

/// Events by date, then start time; unparseable times sort last within their day.
pub fn sorted_by_date(events: &[Event]) -> Vec<&Event> {
    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by_key(|event| {
        let time = parse_display_time(&event.time);
        (event.date, time.is_none(), time)
    });
    sorted
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateGroup<'a> {
    pub date: NaiveDate,
    /// e.g. "Sunday, October 12"
    pub heading: String,
    pub events: Vec<&'a Event>,
}

/// List view: sorted events grouped under one heading per day.
pub fn group_by_date(events: &[Event]) -> Vec<DateGroup<'_>> {
    let mut groups: Vec<DateGroup<'_>> = Vec::new();

    for event in sorted_by_date(events) {
        match groups.last_mut() {
            Some(group) if group.date == event.date => group.events.push(event),
            _ => groups.push(DateGroup {
                date: event.date,
                heading: event.date.format("%A, %B %-d").to_string(),
                events: vec![event],
            }),
        }
    }

    groups
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    pub events: Vec<&'a Event>,
}

/// A month as Sunday-first weeks. Cells outside the month are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthGrid<'a> {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<[Option<DayCell<'a>>; 7]>,
}

impl<'a> MonthGrid<'a> {
    pub fn day(&self, day: u32) -> Option<&DayCell<'a>> {
        self.weeks
            .iter()
            .flatten()
            .flatten()
            .find(|cell| cell.date.day() == day)
    }
}

/// Calendar view for `month` of `year`; `None` when the month does not exist.
pub fn month_grid(year: i32, month: u32, events: &[Event]) -> Option<MonthGrid<'_>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let sorted = sorted_by_date(events);

    let mut weeks = Vec::new();
    let mut week: [Option<DayCell<'_>>; 7] = Default::default();
    let mut column = first.weekday().num_days_from_sunday() as usize;
    let mut date = first;

    while date.month() == month {
        week[column] = Some(DayCell {
            date,
            events: sorted.iter().copied().filter(|event| event.date == date).collect(),
        });

        column += 1;
        if column == 7 {
            weeks.push(std::mem::take(&mut week));
            column = 0;
        }
        date += Duration::days(1);
    }
    if column > 0 {
        weeks.push(week);
    }

    Some(MonthGrid { year, month, weeks })
}

/// List filters; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    pub category: Option<String>,
    pub location: Option<String>,
    pub organizer: Option<String>,
}

impl EventFilter {
    /// Category must match exactly; location and organizer match on substring.
    /// All comparisons ignore case.
    pub fn matches(&self, event: &Event) -> bool {
        fn wanted(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_lowercase)
        }

        let category = wanted(&self.category).map_or(true, |c| event.category.to_lowercase() == c);
        let location = wanted(&self.location).map_or(true, |l| event.location.to_lowercase().contains(&l));
        let organizer =
            wanted(&self.organizer).map_or(true, |o| event.organizer.to_lowercase().contains(&o));

        category && location && organizer
    }

    pub fn apply<'a>(&self, events: &'a [Event]) -> Vec<&'a Event> {
        events.iter().filter(|event| self.matches(event)).collect()
    }
}

/// RSVP search over an event's attendees.
pub fn search_attendees<'a>(event: &'a Event, query: &str) -> Vec<&'a str> {
    let query = query.trim().to_lowercase();
    event
        .attending_users
        .iter()
        .filter(|user| user.to_lowercase().contains(&query))
        .map(String::as_str)
        .collect()
}
