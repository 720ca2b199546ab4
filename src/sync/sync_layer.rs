// Sync Layer - optimistic local mutations reconciled with the remote API
// Every operation applies its command to local state before the first await,
// then calls the remote. A successful answer is applied as an authoritative
// command; a failed one is logged and local state stands. No retries.
// Intents on a record still under its temporary id stay local until the
// create is confirmed, then are replayed against the permanent id.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::command::Command;
use super::error::{SyncError, SyncResult};
use super::merge::merge_events;
use super::remote::RemoteApi;
use super::store::CalendarState;
use crate::infrastructure::LocalIdGenerator;
use crate::models::{CurrentUser, Discussion, Engagement, Event, EventChanges, EventId, NewEvent, Reply};
use crate::validation::{EventDraft, FieldErrors};

pub struct SyncLayer<R: RemoteApi> {
    state: Arc<RwLock<CalendarState>>,
    remote: Arc<R>,
    ids: LocalIdGenerator,
    user: CurrentUser,
}

impl<R: RemoteApi> SyncLayer<R> {
    pub fn new(remote: R, user: CurrentUser) -> Self {
        Self::with_state(Arc::new(RwLock::new(CalendarState::default())), Arc::new(remote), user)
    }

    /// Shares an existing state container, e.g. with a view that renders it.
    pub fn with_state(state: Arc<RwLock<CalendarState>>, remote: Arc<R>, user: CurrentUser) -> Self {
        Self {
            state,
            remote,
            ids: LocalIdGenerator::new(),
            user,
        }
    }

    pub fn state(&self) -> Arc<RwLock<CalendarState>> {
        self.state.clone()
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub async fn snapshot(&self) -> CalendarState {
        self.state.read().await.clone()
    }

    pub async fn events(&self) -> Vec<Event> {
        self.state.read().await.events.all().to_vec()
    }

    pub async fn event(&self, id: &EventId) -> Option<Event> {
        self.state.read().await.events.get(id).cloned()
    }

    pub async fn discussions(&self, event_id: &EventId) -> Vec<Discussion> {
        self.state.read().await.discussions.for_event(event_id).to_vec()
    }

    async fn apply(&self, command: Command) -> SyncResult<()> {
        self.state.write().await.apply(command)
    }

    /// Applies a server answer; authoritative commands for vanished records are dropped.
    async fn apply_authoritative(&self, command: Command) {
        let name = command.name();
        if let Err(err) = self.apply(command).await {
            warn!(command = name, error = %err, "Failed to apply server answer");
        }
    }

    async fn is_pending(&self, id: &EventId) -> bool {
        self.state.read().await.events.is_pending(id)
    }

    /// Initial load: baseline merged with the remote list, or the baseline
    /// alone when the remote is unreachable. Discussions are fetched for
    /// every event that came from the remote.
    #[instrument(skip_all)]
    pub async fn load(&self, baseline: Vec<Event>) -> Vec<Event> {
        let baseline_ids: HashSet<EventId> = baseline.iter().map(|e| e.id.clone()).collect();

        let events = match self.remote.list_events().await {
            Ok(remote) => {
                info!(remote = remote.len(), baseline = baseline.len(), "Loaded remote events");
                merge_events(baseline, remote)
            }
            Err(err) => {
                warn!(error = %err, "Remote event list unavailable; using baseline only");
                baseline
            }
        };

        let remote_ids: Vec<EventId> = events
            .iter()
            .map(|e| e.id.clone())
            .filter(|id| !baseline_ids.contains(id))
            .collect();

        let loads = remote_ids.iter().map(|id| async move { (id, self.remote.list_discussions(id).await) });
        let results = join_all(loads).await;

        let mut state = self.state.write().await;
        // ReplaceAll never fails
        let _ = state.apply(Command::ReplaceAll(events));
        for (event_id, result) in results {
            match result {
                Ok(discussions) => {
                    if let Err(err) = state.apply(Command::LoadDiscussions {
                        event_id: event_id.clone(),
                        discussions,
                    }) {
                        warn!(event_id = %event_id, error = %err, "Failed to apply discussions");
                    }
                }
                Err(err) => warn!(event_id = %event_id, error = %err, "Failed to load discussions"),
            }
        }

        state.events.all().to_vec()
    }

    /// Replaces the local discussion list of one event with the remote one.
    #[instrument(skip(self))]
    pub async fn load_discussions(&self, event_id: &EventId) -> SyncResult<Vec<Discussion>> {
        if self.event(event_id).await.is_none() {
            return Err(SyncError::UnknownEvent(event_id.clone()));
        }
        if self.is_pending(event_id).await {
            return Ok(self.discussions(event_id).await);
        }

        match self.remote.list_discussions(event_id).await {
            Ok(discussions) => {
                self.apply(Command::LoadDiscussions {
                    event_id: event_id.clone(),
                    discussions,
                })
                .await?;
            }
            Err(err) => warn!(error = %err, "Failed to load discussions; keeping local list"),
        }
        Ok(self.discussions(event_id).await)
    }

    /// Inserts the event under a temporary id, then swaps in the server's id.
    /// Returns whichever id the record carries once the call has settled.
    #[instrument(skip_all, fields(title = %new.title))]
    pub async fn create_event(&self, new: NewEvent) -> EventId {
        let temp_id = self.ids.next_event_id();
        let event = Event::from_new(temp_id.clone(), new.clone());
        // Insert is an upsert and cannot fail
        self.apply_authoritative(Command::Insert { event, pending: true }).await;
        debug!(temp_id = %temp_id, "Inserted optimistic event");

        match self.remote.create_event(&new).await {
            Ok(created) => self.confirm_created(temp_id, created).await,
            Err(err) => {
                warn!(temp_id = %temp_id, error = %err, "Remote create failed; event stays local");
                temp_id
            }
        }
    }

    async fn confirm_created(&self, temp_id: EventId, created: Event) -> EventId {
        let permanent = created.id.clone();
        let (local, discussions) = {
            let mut state = self.state.write().await;
            let local = state.events.get(&temp_id).cloned();
            let discussions = state.discussions.for_event(&temp_id).to_vec();
            if let Err(err) = state.apply(Command::ConfirmCreated {
                temp_id: temp_id.clone(),
                event: created.clone(),
            }) {
                warn!(temp_id = %temp_id, error = %err, "Failed to confirm created event");
            }
            (local, discussions)
        };

        let Some(local) = local else {
            warn!(id = %permanent, "Event confirmed after local delete; deleting remote copy");
            if let Err(err) = self.remote.delete_event(&permanent).await {
                warn!(id = %permanent, error = %err, "Remote delete of confirmed event failed");
            }
            return temp_id;
        };

        info!(temp_id = %temp_id, id = %permanent, "Event confirmed");
        self.replay_pending(&local, &created, discussions).await;
        permanent
    }

    /// Sends what was done to a record while it only had a temporary id.
    async fn replay_pending(&self, local: &Event, created: &Event, discussions: Vec<Discussion>) {
        let id = &created.id;

        let changes = EventChanges::between(created, local);
        if !changes.is_empty() {
            if let Err(err) = self.remote.update_event(id, &changes).await {
                warn!(id = %id, error = %err, "Replaying edits failed");
            }
        }

        for kind in [Engagement::Like, Engagement::Attend] {
            let member = local.is_member(kind, &self.user.id);
            if member == created.is_member(kind, &self.user.id) {
                continue;
            }
            match self.remote.toggle(kind, id, &self.user.id, Some(member)).await {
                Ok(event) => {
                    self.apply_authoritative(Command::SetMembers {
                        id: id.clone(),
                        kind,
                        count: event.count(kind),
                        members: event.members(kind).clone(),
                    })
                    .await
                }
                Err(err) => warn!(id = %id, kind = kind.as_str(), error = %err, "Replaying membership failed"),
            }
        }

        for discussion in discussions {
            let post = Discussion {
                event_id: id.clone(),
                replies: Vec::new(),
                ..discussion.clone()
            };
            if let Err(err) = self.remote.create_discussion(&post).await {
                warn!(id = %id, discussion_id = discussion.id, error = %err, "Replaying discussion failed");
                continue;
            }
            for reply in &discussion.replies {
                if let Err(err) = self.remote.add_reply(discussion.id, reply).await {
                    warn!(discussion_id = discussion.id, error = %err, "Replaying reply failed");
                }
            }
        }

        let mut count = None;
        for _ in created.comments..local.comments {
            match self.remote.increment_comments(id).await {
                Ok(event) => count = Some(event.comments),
                Err(err) => warn!(id = %id, error = %err, "Replaying comment count failed"),
            }
        }
        if let Some(count) = count {
            self.apply_authoritative(Command::SetComments { id: id.clone(), count }).await;
        }
    }

    /// Validates the form and creates the event on behalf of the current user.
    /// An invalid draft never reaches the store or the network.
    pub async fn submit_draft(&self, draft: &EventDraft, today: NaiveDate) -> Result<EventId, FieldErrors> {
        let new = draft.validate(today, &self.user.id)?;
        Ok(self.create_event(new).await)
    }

    #[instrument(skip(self, changes))]
    pub async fn update_event(&self, id: &EventId, changes: EventChanges) -> SyncResult<()> {
        let pending = {
            let mut state = self.state.write().await;
            state.apply(Command::Update {
                id: id.clone(),
                changes: changes.clone(),
            })?;
            state.events.is_pending(id)
        };
        if pending {
            return Ok(());
        }

        match self.remote.update_event(id, &changes).await {
            Ok(event) => self.apply(Command::Reconcile(event)).await,
            Err(err) => {
                warn!(error = %err, "Remote update failed; keeping local edit");
                Ok(())
            }
        }
    }

    /// Removes the event locally whatever the remote says.
    #[instrument(skip(self))]
    pub async fn delete_event(&self, id: &EventId) -> SyncResult<()> {
        let pending = {
            let mut state = self.state.write().await;
            let pending = state.events.is_pending(id);
            state.apply(Command::Remove { id: id.clone() })?;
            pending
        };
        if pending {
            return Ok(());
        }

        if let Err(err) = self.remote.delete_event(id).await {
            warn!(error = %err, "Remote delete failed; event removed locally only");
        }
        Ok(())
    }

    /// Returns whether the current user likes the event afterwards.
    pub async fn toggle_like(&self, id: &EventId, desired: Option<bool>) -> SyncResult<bool> {
        self.toggle(Engagement::Like, id, desired).await
    }

    /// Returns whether the current user attends the event afterwards.
    pub async fn toggle_attend(&self, id: &EventId, desired: Option<bool>) -> SyncResult<bool> {
        self.toggle(Engagement::Attend, id, desired).await
    }

    #[instrument(skip(self, kind), fields(kind = kind.as_str()))]
    async fn toggle(&self, kind: Engagement, id: &EventId, desired: Option<bool>) -> SyncResult<bool> {
        let (member, pending) = {
            let mut state = self.state.write().await;
            state.apply(Command::Toggle {
                id: id.clone(),
                kind,
                user_id: self.user.id.clone(),
                desired,
            })?;
            (
                state.events.get(id).is_some_and(|e| e.is_member(kind, &self.user.id)),
                state.events.is_pending(id),
            )
        };
        if pending {
            return Ok(member);
        }

        // The resolved membership is sent, so a replayed call cannot flip it back
        match self.remote.toggle(kind, id, &self.user.id, Some(member)).await {
            Ok(event) => {
                self.apply(Command::SetMembers {
                    id: id.clone(),
                    kind,
                    count: event.count(kind),
                    members: event.members(kind).clone(),
                })
                .await?;
            }
            Err(err) => warn!(error = %err, "Remote toggle failed; keeping local state"),
        }

        Ok(member)
    }

    #[instrument(skip(self))]
    pub async fn increment_comment(&self, id: &EventId) -> SyncResult<()> {
        let pending = {
            let mut state = self.state.write().await;
            state.apply(Command::IncrementComments { id: id.clone() })?;
            state.events.is_pending(id)
        };
        if pending {
            return Ok(());
        }

        match self.remote.increment_comments(id).await {
            Ok(event) => {
                self.apply(Command::SetComments {
                    id: id.clone(),
                    count: event.comments,
                })
                .await
            }
            Err(err) => {
                warn!(error = %err, "Remote comment increment failed; keeping local count");
                Ok(())
            }
        }
    }

    /// Posts a top-level discussion as the current user and bumps the
    /// event's comment count. The remote calls are not reconciled.
    #[instrument(skip(self, content))]
    pub async fn add_discussion(&self, event_id: &EventId, content: &str) -> SyncResult<Discussion> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SyncError::EmptyContent);
        }

        let discussion = Discussion {
            id: self.ids.next_id(),
            event_id: event_id.clone(),
            user: self.user.identity.clone(),
            content: content.to_string(),
            timestamp: Utc::now(),
            replies: Vec::new(),
        };

        let pending = {
            let mut state = self.state.write().await;
            state.apply(Command::AddDiscussion(discussion.clone()))?;
            state.apply(Command::IncrementComments { id: event_id.clone() })?;
            state.events.is_pending(event_id)
        };
        if pending {
            return Ok(discussion);
        }

        let (created, counted) = futures::join!(
            self.remote.create_discussion(&discussion),
            self.remote.increment_comments(event_id)
        );
        if let Err(err) = created {
            warn!(error = %err, "Remote discussion post failed; kept locally");
        }
        if let Err(err) = counted {
            warn!(error = %err, "Remote comment increment failed");
        }

        Ok(discussion)
    }

    /// Appends a reply as the current user; counts as a comment on the owning event.
    #[instrument(skip(self, content))]
    pub async fn add_reply(&self, discussion_id: i64, content: &str) -> SyncResult<Reply> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SyncError::EmptyContent);
        }

        let reply = Reply {
            id: self.ids.next_id(),
            user: self.user.identity.clone(),
            content: content.to_string(),
            timestamp: Utc::now(),
        };

        let (event_id, pending) = {
            let mut state = self.state.write().await;
            let event_id = state
                .discussions
                .owner_of(discussion_id)
                .cloned()
                .ok_or(SyncError::UnknownDiscussion(discussion_id))?;
            state.apply(Command::AddReply {
                discussion_id,
                reply: reply.clone(),
            })?;
            state.apply(Command::IncrementComments { id: event_id.clone() })?;
            let pending = state.events.is_pending(&event_id);
            (event_id, pending)
        };
        if pending {
            return Ok(reply);
        }

        let (appended, counted) = futures::join!(
            self.remote.add_reply(discussion_id, &reply),
            self.remote.increment_comments(&event_id)
        );
        if let Err(err) = appended {
            warn!(error = %err, "Remote reply failed; kept locally");
        }
        if let Err(err) = counted {
            warn!(error = %err, "Remote comment increment failed");
        }

        Ok(reply)
    }
}
