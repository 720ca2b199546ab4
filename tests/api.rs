use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use gt_cal::{calendar_interface::{create_calendar_router, CalendarInterface}, database::CalendarDatabase};

async fn app() -> Router {
    let db = CalendarDatabase::new_in_memory().await.unwrap();
    create_calendar_router(CalendarInterface::new(Arc::new(db)))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create_hackathon(app: &Router) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/events",
        Some(json!({
            "title": "Hackathon",
            "date": "2025-10-12",
            "time": "6:00 PM",
            "location": "Klaus",
            "category": "Tech",
            "createdBy": "owner"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_and_list_events() {
    let app = app().await;
    let id = create_hackathon(&app).await;

    let (status, body) = send(&app, Method::GET, "/api/events", None).await;
    assert_eq!(status, StatusCode::OK);
    let events = body.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["id"], id.as_str());
    assert_eq!(events[0]["date"], "2025-10-12");
    assert_eq!(events[0]["likes"], 0);
    assert_eq!(events[0]["likedBy"], json!([]));
    assert_eq!(events[0]["createdBy"], "owner");
    assert!(events[0]["createdAt"].is_string());
}

#[tokio::test]
async fn test_create_requires_title_date_and_creator() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/events",
        Some(json!({ "title": "Hackathon", "date": "2025-10-12" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_update_keeps_owner_and_social_state() {
    let app = app().await;
    let id = create_hackathon(&app).await;
    send(&app, Method::POST, &format!("/api/events/{}/like", id), Some(json!({ "userId": "u1" }))).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/events/{}", id),
        Some(json!({ "title": "Hackathon II", "createdBy": "intruder", "likes": 40 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Hackathon II");
    assert_eq!(body["createdBy"], "owner");
    assert_eq!(body["likes"], 1);

    let (status, _) = send(&app, Method::PUT, "/api/events/missing", Some(json!({ "title": "X" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_event() {
    let app = app().await;
    let id = create_hackathon(&app).await;

    let (status, body) = send(&app, Method::DELETE, &format!("/api/events/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event deleted successfully");

    let (status, body) = send(&app, Method::DELETE, &format!("/api/events/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Event not found");
}

#[tokio::test]
async fn test_like_and_attend_toggle_membership() {
    let app = app().await;
    let id = create_hackathon(&app).await;
    let like = format!("/api/events/{}/like", id);

    let (_, body) = send(&app, Method::POST, &like, Some(json!({ "userId": "u1" }))).await;
    assert_eq!(body["likes"], 1);
    assert_eq!(body["likedBy"], json!(["u1"]));

    let (_, body) = send(&app, Method::POST, &like, Some(json!({ "userId": "u2" }))).await;
    assert_eq!(body["likes"], 2);

    let (_, body) = send(&app, Method::POST, &like, Some(json!({ "userId": "u1" }))).await;
    assert_eq!(body["likes"], 1);
    assert_eq!(body["likedBy"], json!(["u2"]));

    // A desired state is idempotent
    let attend = format!("/api/events/{}/attend", id);
    for _ in 0..2 {
        let (_, body) = send(&app, Method::POST, &attend, Some(json!({ "userId": "u3", "desired": true }))).await;
        assert_eq!(body["attendees"], 1);
        assert_eq!(body["attendingUsers"], json!(["u3"]));
    }

    let (status, _) = send(&app, Method::POST, &like, Some(json!({ "userId": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::POST, "/api/events/missing/like", Some(json!({ "userId": "u1" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comment_increment() {
    let app = app().await;
    let id = create_hackathon(&app).await;
    let uri = format!("/api/events/{}/comment", id);

    send(&app, Method::POST, &uri, None).await;
    let (status, body) = send(&app, Method::POST, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["comments"], 2);
}

#[tokio::test]
async fn test_discussions_and_replies() {
    let app = app().await;
    let id = create_hackathon(&app).await;
    let board = format!("/api/discussions/event/{}", id);
    let user = json!({ "name": "Caroline Tran", "initials": "CT" });

    let (status, body) = send(
        &app,
        Method::POST,
        &board,
        Some(json!({ "id": 100, "user": user, "content": "Who is going?", "timestamp": "2025-10-01T12:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["eventId"], id.as_str());
    assert_eq!(body["replies"], json!([]));

    send(
        &app,
        Method::POST,
        &board,
        Some(json!({ "id": 200, "user": user, "content": "Me!", "timestamp": "2025-10-01T12:05:00Z" })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/discussions/100/replies",
        Some(json!({ "id": 101, "user": user, "content": "I am", "timestamp": "2025-10-01T12:10:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["replies"][0]["content"], "I am");

    let (_, body) = send(&app, Method::GET, &board, None).await;
    let ids: Vec<i64> = body.as_array().unwrap().iter().map(|d| d["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![100, 200]);
}

#[tokio::test]
async fn test_discussion_errors() {
    let app = app().await;
    let user = json!({ "name": "Buzz", "initials": "B" });

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/discussions/event/missing",
        Some(json!({ "id": 1, "user": user, "content": "hi", "timestamp": "2025-10-01T12:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let id = create_hackathon(&app).await;
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/discussions/event/{}", id),
        Some(json!({ "id": 1, "user": user, "content": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/discussions/42/replies",
        Some(json!({ "id": 2, "user": user, "content": "hi", "timestamp": "2025-10-01T12:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Discussion not found");
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Backend is running");
}
