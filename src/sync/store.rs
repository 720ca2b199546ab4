use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::command::Command;
use super::error::{SyncError, SyncResult};
use crate::models::{Discussion, Event, EventId};

/// Client-side event list in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventStore {
    events: Vec<Event>,
    pending: HashSet<EventId>,
}

impl EventStore {
    pub fn all(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: &EventId) -> Option<&Event> {
        self.events.iter().find(|event| &event.id == id)
    }

    fn get_mut(&mut self, id: &EventId) -> Option<&mut Event> {
        self.events.iter_mut().find(|event| &event.id == id)
    }

    fn require(&mut self, id: &EventId) -> SyncResult<&mut Event> {
        self.events
            .iter_mut()
            .find(|event| &event.id == id)
            .ok_or_else(|| SyncError::UnknownEvent(id.clone()))
    }

    /// True while the record still carries a temporary id.
    pub fn is_pending(&self, id: &EventId) -> bool {
        self.pending.contains(id)
    }

    fn upsert(&mut self, event: Event) {
        match self.get_mut(&event.id) {
            Some(existing) => *existing = event,
            None => self.events.push(event),
        }
    }

    fn remove(&mut self, id: &EventId) -> Option<Event> {
        self.pending.remove(id);
        let index = self.events.iter().position(|event| &event.id == id)?;
        Some(self.events.remove(index))
    }
}

/// Discussions per event, each list in posting order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscussionStore {
    by_event: HashMap<EventId, Vec<Discussion>>,
}

impl DiscussionStore {
    pub fn for_event(&self, event_id: &EventId) -> &[Discussion] {
        self.by_event.get(event_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, discussion_id: i64) -> Option<&Discussion> {
        self.by_event
            .values()
            .flatten()
            .find(|discussion| discussion.id == discussion_id)
    }

    /// Event a discussion belongs to.
    pub fn owner_of(&self, discussion_id: i64) -> Option<&EventId> {
        self.get(discussion_id).map(|discussion| &discussion.event_id)
    }

    fn get_mut(&mut self, discussion_id: i64) -> Option<&mut Discussion> {
        self.by_event
            .values_mut()
            .flatten()
            .find(|discussion| discussion.id == discussion_id)
    }

    /// Moves everything filed under `from` to `to`, rewriting the foreign keys.
    fn rekey(&mut self, from: &EventId, to: &EventId) {
        let Some(mut moved) = self.by_event.remove(from) else {
            return;
        };
        for discussion in &mut moved {
            discussion.event_id = to.clone();
        }
        self.by_event.entry(to.clone()).or_default().extend(moved);
    }
}

/// The single state container the sync layer owns and hands out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarState {
    pub events: EventStore,
    pub discussions: DiscussionStore,
}

impl CalendarState {
    pub fn new(events: Vec<Event>) -> Self {
        let mut state = Self::default();
        state.events.events = events;
        state
    }

    /// Reducer: applies one command. Commands that carry authoritative data
    /// for a record that is gone by now (deleted while the call was in
    /// flight) are dropped; user intents on unknown ids are errors.
    pub fn apply(&mut self, command: Command) -> SyncResult<()> {
        debug!(command = command.name(), "Applying command");

        match command {
            Command::ReplaceAll(events) => {
                // Records still awaiting their create call survive a reload
                let pending: Vec<Event> = std::mem::take(&mut self.events.events)
                    .into_iter()
                    .filter(|event| self.events.pending.contains(&event.id))
                    .collect();
                self.events.events = events;
                self.events.events.extend(pending);

                let live: HashSet<EventId> = self.events.events.iter().map(|event| event.id.clone()).collect();
                self.events.pending.retain(|id| live.contains(id));
                self.discussions.by_event.retain(|event_id, _| live.contains(event_id));
            }
            Command::Insert { event, pending } => {
                if pending {
                    self.events.pending.insert(event.id.clone());
                }
                self.events.upsert(event);
            }
            Command::ConfirmCreated { temp_id, event } => {
                self.events.pending.remove(&temp_id);
                let permanent = event.id;

                let Some(index) = self.events.events.iter().position(|e| e.id == temp_id) else {
                    return Ok(());
                };
                // Everything done to the record while the create was in flight
                // is kept; only the server-assigned attributes are taken
                let local = &mut self.events.events[index];
                local.id = permanent.clone();
                if event.created_at.is_some() {
                    local.created_at = event.created_at;
                }

                // A reload may have brought in the server copy already
                let mut position = 0;
                self.events.events.retain(|e| {
                    let keep = position == index || e.id != permanent;
                    position += 1;
                    keep
                });
                self.discussions.rekey(&temp_id, &permanent);
            }
            Command::Update { id, changes } => {
                self.events.require(&id)?.apply_changes(&changes);
            }
            Command::Reconcile(event) => {
                if let Some(local) = self.events.get_mut(&event.id) {
                    *local = event;
                }
            }
            Command::Remove { id } => {
                if self.events.remove(&id).is_none() {
                    return Err(SyncError::UnknownEvent(id));
                }
                self.discussions.by_event.remove(&id);
            }
            Command::Toggle {
                id,
                kind,
                user_id,
                desired,
            } => {
                self.events.require(&id)?.toggle(kind, &user_id, desired);
            }
            Command::SetMembers {
                id,
                kind,
                count,
                members,
            } => {
                if let Some(event) = self.events.get_mut(&id) {
                    event.set_members(kind, count, members);
                }
            }
            Command::IncrementComments { id } => {
                self.events.require(&id)?.comments += 1;
            }
            Command::SetComments { id, count } => {
                if let Some(event) = self.events.get_mut(&id) {
                    event.comments = count;
                }
            }
            Command::LoadDiscussions {
                event_id,
                discussions,
            } => {
                self.discussions.by_event.insert(event_id, discussions);
            }
            Command::AddDiscussion(discussion) => {
                if self.events.get(&discussion.event_id).is_none() {
                    return Err(SyncError::UnknownEvent(discussion.event_id));
                }
                self.discussions
                    .by_event
                    .entry(discussion.event_id.clone())
                    .or_default()
                    .push(discussion);
            }
            Command::AddReply {
                discussion_id,
                reply,
            } => {
                self.discussions
                    .get_mut(discussion_id)
                    .ok_or(SyncError::UnknownDiscussion(discussion_id))?
                    .replies
                    .push(reply);
            }
        }

        Ok(())
    }
}
