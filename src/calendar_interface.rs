// Calendar REST interface - event and discussion endpoints over CalendarDatabase

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use crate::{
    database::CalendarDatabase,
    error::{AppError, AppResult},
    models::{
        DeleteConfirmation, Discussion, Engagement, Event, EventChanges, EventId,
        MembershipRequest, NewEvent, Reply, UserIdentity,
    },
};

const MISSING_FIELDS: &str = "Missing required fields";

#[derive(Clone)]
pub struct CalendarInterface {
    db: Arc<CalendarDatabase>,
}

impl CalendarInterface {
    pub fn new(db: Arc<CalendarDatabase>) -> Self {
        Self { db }
    }

    pub async fn list_events(&self) -> AppResult<Json<Vec<Event>>> {
        Ok(Json(self.db.list_events().await?))
    }

    pub async fn create_event(&self, request: CreateEventRequest) -> AppResult<(StatusCode, Json<Event>)> {
        let new = request.into_new_event()?;
        let event = self.db.insert_event(new).await?;
        info!("Created event {} ({})", event.id, event.title);
        Ok((StatusCode::CREATED, Json(event)))
    }

    pub async fn update_event(&self, id: &str, changes: EventChanges) -> AppResult<Json<Event>> {
        if changes.title.as_deref().is_some_and(|title| title.trim().is_empty()) {
            return Err(AppError::Validation("Title cannot be empty".to_string()));
        }

        self.db
            .update_event(id, &changes)
            .await?
            .map(Json)
            .ok_or_else(event_not_found)
    }

    pub async fn delete_event(&self, id: &str) -> AppResult<Json<DeleteConfirmation>> {
        if !self.db.delete_event(id).await? {
            return Err(event_not_found());
        }
        info!("Deleted event {}", id);
        Ok(Json(DeleteConfirmation {
            message: "Event deleted successfully".to_string(),
        }))
    }

    pub async fn toggle(
        &self,
        id: &str,
        kind: Engagement,
        request: MembershipRequest,
    ) -> AppResult<Json<Event>> {
        if request.user_id.trim().is_empty() {
            return Err(AppError::BadRequest("userId is required".to_string()));
        }

        self.db
            .toggle_membership(id, kind, &request.user_id, request.desired)
            .await?
            .map(Json)
            .ok_or_else(event_not_found)
    }

    pub async fn increment_comments(&self, id: &str) -> AppResult<Json<Event>> {
        self.db
            .increment_comments(id)
            .await?
            .map(Json)
            .ok_or_else(event_not_found)
    }

    pub async fn list_discussions(&self, event_id: &str) -> AppResult<Json<Vec<Discussion>>> {
        Ok(Json(self.db.list_discussions(event_id).await?))
    }

    pub async fn create_discussion(
        &self,
        event_id: &str,
        request: PostRequest,
    ) -> AppResult<(StatusCode, Json<Discussion>)> {
        let (id, user, content, timestamp) = request.into_parts()?;

        if self.db.get_event(event_id).await?.is_none() {
            return Err(event_not_found());
        }

        let discussion = Discussion {
            id,
            event_id: EventId::from(event_id),
            user,
            content,
            timestamp,
            replies: Vec::new(),
        };
        let saved = self.db.insert_discussion(&discussion).await?;
        Ok((StatusCode::CREATED, Json(saved)))
    }

    pub async fn add_reply(
        &self,
        discussion_id: i64,
        request: PostRequest,
    ) -> AppResult<(StatusCode, Json<Discussion>)> {
        let (id, user, content, timestamp) = request.into_parts()?;
        let reply = Reply {
            id,
            user,
            content,
            timestamp,
        };

        self.db
            .append_reply(discussion_id, &reply)
            .await?
            .map(|discussion| (StatusCode::CREATED, Json(discussion)))
            .ok_or_else(|| AppError::NotFound("Discussion not found".to_string()))
    }
}

fn event_not_found() -> AppError {
    AppError::NotFound("Event not found".to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// HTTP Request types

/// Create body; required fields are checked by hand so that a missing one
/// yields a 400 with a readable message instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub organizer: Option<String>,
    pub image: Option<String>,
    pub created_by: Option<String>,
}

impl CreateEventRequest {
    fn into_new_event(self) -> AppResult<NewEvent> {
        let (title, date, created_by) = match (
            non_blank(self.title),
            non_blank(self.date),
            non_blank(self.created_by),
        ) {
            (Some(title), Some(date), Some(created_by)) => (title, date, created_by),
            _ => return Err(AppError::BadRequest(MISSING_FIELDS.to_string())),
        };

        let day = date.get(..10).unwrap_or(&date);
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|_| AppError::Validation(format!("Invalid date: {}", date)))?;

        Ok(NewEvent {
            title,
            date,
            time: self.time.unwrap_or_default(),
            end_time: self.end_time.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            organizer: self.organizer.unwrap_or_default(),
            image: self.image.unwrap_or_default(),
            created_by,
        })
    }
}

/// Body shared by discussion posts and replies.
#[derive(Debug, Default, Deserialize)]
pub struct PostRequest {
    pub id: Option<i64>,
    pub user: Option<UserIdentity>,
    pub content: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl PostRequest {
    fn into_parts(self) -> AppResult<(i64, UserIdentity, String, DateTime<Utc>)> {
        match (
            self.id.filter(|id| *id != 0),
            self.user.filter(|user| !user.name.trim().is_empty()),
            non_blank(self.content),
            self.timestamp,
        ) {
            (Some(id), Some(user), Some(content), Some(timestamp)) => Ok((id, user, content, timestamp)),
            _ => Err(AppError::BadRequest(MISSING_FIELDS.to_string())),
        }
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

// HTTP Handlers

pub async fn health_handler() -> &'static str {
    "Backend is running"
}

pub async fn list_events_handler(State(calendar): State<CalendarInterface>) -> AppResult<Json<Vec<Event>>> {
    calendar.list_events().await
}

pub async fn create_event_handler(
    State(calendar): State<CalendarInterface>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Event>)> {
    calendar.create_event(json_body(payload)?).await
}

pub async fn update_event_handler(
    State(calendar): State<CalendarInterface>,
    Path(id): Path<String>,
    payload: Result<Json<EventChanges>, JsonRejection>,
) -> AppResult<Json<Event>> {
    calendar.update_event(&id, json_body(payload)?).await
}

pub async fn delete_event_handler(
    State(calendar): State<CalendarInterface>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteConfirmation>> {
    calendar.delete_event(&id).await
}

pub async fn like_handler(
    State(calendar): State<CalendarInterface>,
    Path(id): Path<String>,
    payload: Result<Json<MembershipRequest>, JsonRejection>,
) -> AppResult<Json<Event>> {
    calendar.toggle(&id, Engagement::Like, json_body(payload)?).await
}

pub async fn attend_handler(
    State(calendar): State<CalendarInterface>,
    Path(id): Path<String>,
    payload: Result<Json<MembershipRequest>, JsonRejection>,
) -> AppResult<Json<Event>> {
    calendar.toggle(&id, Engagement::Attend, json_body(payload)?).await
}

pub async fn comment_handler(
    State(calendar): State<CalendarInterface>,
    Path(id): Path<String>,
) -> AppResult<Json<Event>> {
    calendar.increment_comments(&id).await
}

pub async fn list_discussions_handler(
    State(calendar): State<CalendarInterface>,
    Path(event_id): Path<String>,
) -> AppResult<Json<Vec<Discussion>>> {
    calendar.list_discussions(&event_id).await
}

pub async fn create_discussion_handler(
    State(calendar): State<CalendarInterface>,
    Path(event_id): Path<String>,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Discussion>)> {
    calendar.create_discussion(&event_id, json_body(payload)?).await
}

pub async fn add_reply_handler(
    State(calendar): State<CalendarInterface>,
    Path(discussion_id): Path<String>,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Discussion>)> {
    let discussion_id = discussion_id
        .parse::<i64>()
        .map_err(|_| AppError::NotFound("Discussion not found".to_string()))?;
    calendar.add_reply(discussion_id, json_body(payload)?).await
}

// Create calendar router
pub fn create_calendar_router(calendar: CalendarInterface) -> Router {
    Router::new()
        .route("/", get(health_handler))
        // Events
        .route("/api/events", get(list_events_handler).post(create_event_handler))
        .route("/api/events/{id}", put(update_event_handler).delete(delete_event_handler))
        .route("/api/events/{id}/like", post(like_handler))
        .route("/api/events/{id}/attend", post(attend_handler))
        .route("/api/events/{id}/comment", post(comment_handler))
        // Discussions
        .route(
            "/api/discussions/event/{event_id}",
            get(list_discussions_handler).post(create_discussion_handler),
        )
        .route("/api/discussions/{discussion_id}/replies", post(add_reply_handler))
        .with_state(calendar)
}
