use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::EventId;
use super::user::UserIdentity;

/// A top-level post on an event's discussion board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discussion {
    pub id: i64,
    pub event_id: EventId,
    pub user: UserIdentity,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Append-only; insertion order is display order.
    #[serde(default)]
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub id: i64,
    pub user: UserIdentity,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
