use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Event identifier.
///
/// Server ids are opaque strings. Seeded baseline events carry small numeric
/// ids, so a JSON number is accepted as well and kept in its decimal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id for an optimistic record that the server has not confirmed yet.
    pub fn temporary(stamp: i64) -> Self {
        Self(format!("local-{}", stamp))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i64> for EventId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Number(number) => Self(number.to_string()),
        })
    }
}

/// The two membership sets an event tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engagement {
    Like,
    Attend,
}

impl Engagement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engagement::Like => "like",
            Engagement::Attend => "attend",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(alias = "_id")]
    pub id: EventId,
    pub title: String,
    #[serde(deserialize_with = "calendar_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub organizer: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub liked_by: BTreeSet<String>,
    #[serde(default)]
    pub comments: u32,
    #[serde(default)]
    pub attendees: u32,
    #[serde(default)]
    pub attending_users: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Accepts `YYYY-MM-DD` as well as full timestamps, keeping only the date part.
fn calendar_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let day = raw.get(..10).unwrap_or(&raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(serde::de::Error::custom)
}

impl Event {
    /// Builds a fresh record with empty social state.
    pub fn from_new(id: EventId, new: NewEvent) -> Self {
        Self {
            id,
            title: new.title,
            date: new.date,
            time: new.time,
            end_time: new.end_time,
            location: new.location,
            category: new.category,
            description: new.description,
            organizer: new.organizer,
            image: new.image,
            created_by: new.created_by,
            likes: 0,
            liked_by: BTreeSet::new(),
            comments: 0,
            attendees: 0,
            attending_users: BTreeSet::new(),
            created_at: None,
        }
    }

    /// Key used when merging a local baseline with the remote list.
    pub fn dedup_key(&self) -> (&str, NaiveDate) {
        (self.title.as_str(), self.date)
    }

    pub fn members(&self, kind: Engagement) -> &BTreeSet<String> {
        match kind {
            Engagement::Like => &self.liked_by,
            Engagement::Attend => &self.attending_users,
        }
    }

    pub fn count(&self, kind: Engagement) -> u32 {
        match kind {
            Engagement::Like => self.likes,
            Engagement::Attend => self.attendees,
        }
    }

    pub fn is_member(&self, kind: Engagement, user_id: &str) -> bool {
        self.members(kind).contains(user_id)
    }

    /// Flips `user_id`'s membership, or moves it to `desired` when given.
    ///
    /// The count moves by exactly the change in set membership, so a record
    /// whose count matched its set keeps matching. Returns the membership
    /// after the call.
    pub fn toggle(&mut self, kind: Engagement, user_id: &str, desired: Option<bool>) -> bool {
        let (count, members) = match kind {
            Engagement::Like => (&mut self.likes, &mut self.liked_by),
            Engagement::Attend => (&mut self.attendees, &mut self.attending_users),
        };

        let present = members.contains(user_id);
        let wanted = desired.unwrap_or(!present);
        if wanted && !present {
            members.insert(user_id.to_string());
            *count += 1;
        } else if !wanted && present {
            members.remove(user_id);
            *count = count.saturating_sub(1);
        }
        wanted
    }

    /// Overwrites one membership set with authoritative values.
    pub fn set_members(&mut self, kind: Engagement, count: u32, members: BTreeSet<String>) {
        match kind {
            Engagement::Like => {
                self.likes = count;
                self.liked_by = members;
            }
            Engagement::Attend => {
                self.attendees = count;
                self.attending_users = members;
            }
        }
    }

    /// Applies descriptive edits. Ownership and social state are untouched.
    pub fn apply_changes(&mut self, changes: &EventChanges) {
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(date) = changes.date {
            self.date = date;
        }
        if let Some(time) = &changes.time {
            self.time = time.clone();
        }
        if let Some(end_time) = &changes.end_time {
            self.end_time = end_time.clone();
        }
        if let Some(location) = &changes.location {
            self.location = location.clone();
        }
        if let Some(category) = &changes.category {
            self.category = category.clone();
        }
        if let Some(description) = &changes.description {
            self.description = description.clone();
        }
        if let Some(organizer) = &changes.organizer {
            self.organizer = organizer.clone();
        }
        if let Some(image) = &changes.image {
            self.image = image.clone();
        }
    }
}

/// Payload for creating an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub organizer: String,
    #[serde(default)]
    pub image: String,
    pub created_by: String,
}

impl From<&Event> for NewEvent {
    fn from(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            date: event.date,
            time: event.time.clone(),
            end_time: event.end_time.clone(),
            location: event.location.clone(),
            category: event.category.clone(),
            description: event.description.clone(),
            organizer: event.organizer.clone(),
            image: event.image.clone(),
            created_by: event.created_by.clone(),
        }
    }
}

/// Partial update of an event's descriptive attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl EventChanges {
    /// Descriptive fields of `target` that differ from `base`.
    pub fn between(base: &Event, target: &Event) -> Self {
        fn changed<T: PartialEq + Clone>(base: &T, target: &T) -> Option<T> {
            (base != target).then(|| target.clone())
        }

        Self {
            title: changed(&base.title, &target.title),
            date: changed(&base.date, &target.date),
            time: changed(&base.time, &target.time),
            end_time: changed(&base.end_time, &target.end_time),
            location: changed(&base.location, &target.location),
            category: changed(&base.category, &target.category),
            description: changed(&base.description, &target.description),
            organizer: changed(&base.organizer, &target.organizer),
            image: changed(&base.image, &target.image),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Body of the like/attend endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRequest {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteConfirmation {
    pub message: String,
}
