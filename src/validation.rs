// Event form validation - checks a draft before it may reach the network

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Event, EventChanges, NewEvent};

pub const CATEGORIES: [&str; 7] = [
    "Tech",
    "Career",
    "Sports",
    "Entrepreneurship",
    "Social",
    "Academic",
    "Cultural",
];

pub const DEFAULT_CATEGORY: &str = "Tech";

/// Form fields that carry validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Date,
    Location,
    Description,
    Organizer,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Date => "date",
            Field::Location => "location",
            Field::Description => "description",
            Field::Organizer => "organizer",
        }
    }
}

/// One message per failing field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    fn set(&mut self, field: Field, message: &str) {
        self.0.insert(field, message.to_string());
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.values().map(String::as_str).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

/// The event form as entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventDraft {
    pub title: String,
    pub date: String,
    pub time: String,
    pub end_time: String,
    pub location: String,
    pub category: String,
    pub description: String,
    pub organizer: String,
    pub image: String,
}

impl Default for EventDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            date: String::new(),
            time: String::new(),
            end_time: String::new(),
            location: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            description: String::new(),
            organizer: String::new(),
            image: String::new(),
        }
    }
}

impl EventDraft {
    /// Blank form with the date pre-filled, as when a calendar day is clicked.
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date: date.format("%Y-%m-%d").to_string(),
            ..Self::default()
        }
    }

    /// Edit form pre-filled from an existing record.
    pub fn from_event(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            date: event.date.format("%Y-%m-%d").to_string(),
            time: event.time.clone(),
            end_time: event.end_time.clone(),
            location: event.location.clone(),
            category: event.category.clone(),
            description: event.description.clone(),
            organizer: event.organizer.clone(),
            image: event.image.clone(),
        }
    }

    /// Checks the draft and builds the create payload. Dates before `today`
    /// are rejected; `today` itself is allowed.
    pub fn validate(&self, today: NaiveDate, created_by: &str) -> Result<NewEvent, FieldErrors> {
        let mut errors = FieldErrors::default();

        let required = [
            (Field::Title, &self.title, "Title is required"),
            (Field::Location, &self.location, "Location is required"),
            (Field::Description, &self.description, "Description is required"),
            (Field::Organizer, &self.organizer, "Organizer is required"),
        ];
        for (field, value, message) in required {
            if value.trim().is_empty() {
                errors.set(field, message);
            }
        }

        let date = match self.date.trim() {
            "" => {
                errors.set(Field::Date, "Date is required");
                None
            }
            raw => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) if date < today => {
                    errors.set(Field::Date, "Event date cannot be in the past");
                    None
                }
                Ok(date) => Some(date),
                Err(_) => {
                    errors.set(Field::Date, "Date must be YYYY-MM-DD");
                    None
                }
            },
        };

        match date {
            Some(date) if errors.is_empty() => Ok(NewEvent {
                title: self.title.trim().to_string(),
                date,
                time: self.time.trim().to_string(),
                end_time: self.end_time.trim().to_string(),
                location: self.location.trim().to_string(),
                category: self.category_or_default(),
                description: self.description.trim().to_string(),
                organizer: self.organizer.trim().to_string(),
                image: self.image.trim().to_string(),
                created_by: created_by.to_string(),
            }),
            _ => Err(errors),
        }
    }

    /// Same checks as `validate`, producing a full edit of the descriptive fields.
    pub fn validate_changes(&self, today: NaiveDate) -> Result<EventChanges, FieldErrors> {
        let new = self.validate(today, "")?;
        Ok(EventChanges {
            title: Some(new.title),
            date: Some(new.date),
            time: Some(new.time),
            end_time: Some(new.end_time),
            location: Some(new.location),
            category: Some(new.category),
            description: Some(new.description),
            organizer: Some(new.organizer),
            image: Some(new.image),
        })
    }

    fn category_or_default(&self) -> String {
        match self.category.trim() {
            "" => DEFAULT_CATEGORY.to_string(),
            category => category.to_string(),
        }
    }
}
