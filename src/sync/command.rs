// Calendar commands - every mutation of the client state as a value
// The sync layer applies a command once speculatively and, when the server
// answers, once more with the authoritative values.

use std::collections::BTreeSet;

use crate::models::{Discussion, Engagement, Event, EventChanges, EventId, Reply};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the whole event list (initial load).
    ReplaceAll(Vec<Event>),
    /// Add an event; `pending` marks a temporary id awaiting confirmation.
    Insert { event: Event, pending: bool },
    /// Swap a temporary id for the server's permanent one.
    ConfirmCreated { temp_id: EventId, event: Event },
    Update { id: EventId, changes: EventChanges },
    /// Authoritative copy of a whole record.
    Reconcile(Event),
    Remove { id: EventId },
    Toggle {
        id: EventId,
        kind: Engagement,
        user_id: String,
        desired: Option<bool>,
    },
    /// Authoritative membership set and count.
    SetMembers {
        id: EventId,
        kind: Engagement,
        count: u32,
        members: BTreeSet<String>,
    },
    IncrementComments { id: EventId },
    SetComments { id: EventId, count: u32 },
    LoadDiscussions { event_id: EventId, discussions: Vec<Discussion> },
    AddDiscussion(Discussion),
    AddReply { discussion_id: i64, reply: Reply },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::ReplaceAll(_) => "replace_all",
            Command::Insert { .. } => "insert",
            Command::ConfirmCreated { .. } => "confirm_created",
            Command::Update { .. } => "update",
            Command::Reconcile(_) => "reconcile",
            Command::Remove { .. } => "remove",
            Command::Toggle { .. } => "toggle",
            Command::SetMembers { .. } => "set_members",
            Command::IncrementComments { .. } => "increment_comments",
            Command::SetComments { .. } => "set_comments",
            Command::LoadDiscussions { .. } => "load_discussions",
            Command::AddDiscussion(_) => "add_discussion",
            Command::AddReply { .. } => "add_reply",
        }
    }
}
