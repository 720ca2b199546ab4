// Remote API client - the sync layer's view of the REST server

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::error::RemoteError;
use crate::config::ApiConfig;
use crate::models::{Discussion, Engagement, Event, EventChanges, EventId, MembershipRequest, NewEvent, Reply};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote persistence as seen by the sync layer.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn list_events(&self) -> RemoteResult<Vec<Event>>;

    async fn create_event(&self, event: &NewEvent) -> RemoteResult<Event>;

    async fn update_event(&self, id: &EventId, changes: &EventChanges) -> RemoteResult<Event>;

    async fn delete_event(&self, id: &EventId) -> RemoteResult<()>;

    async fn toggle(
        &self,
        kind: Engagement,
        id: &EventId,
        user_id: &str,
        desired: Option<bool>,
    ) -> RemoteResult<Event>;

    async fn increment_comments(&self, id: &EventId) -> RemoteResult<Event>;

    async fn list_discussions(&self, event_id: &EventId) -> RemoteResult<Vec<Discussion>>;

    async fn create_discussion(&self, discussion: &Discussion) -> RemoteResult<Discussion>;

    async fn add_reply(&self, discussion_id: i64, reply: &Reply) -> RemoteResult<Discussion>;
}

/// `RemoteApi` over HTTP/JSON.
#[derive(Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn event_url(&self, id: &EventId, suffix: &str) -> String {
        self.url(&format!("/api/events/{}{}", id, suffix))
    }
}

/// Turns a non-2xx answer into `RemoteError::Status`, keeping the server's message.
async fn decode<T: DeserializeOwned>(response: Response) -> RemoteResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| value.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or(body);
        return Err(RemoteError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json::<T>().await?)
}

#[async_trait]
impl RemoteApi for HttpRemote {
    async fn list_events(&self) -> RemoteResult<Vec<Event>> {
        let response = self.client.get(self.url("/api/events")).send().await?;
        decode(response).await
    }

    async fn create_event(&self, event: &NewEvent) -> RemoteResult<Event> {
        let response = self.client.post(self.url("/api/events")).json(event).send().await?;
        decode(response).await
    }

    async fn update_event(&self, id: &EventId, changes: &EventChanges) -> RemoteResult<Event> {
        let response = self.client.put(self.event_url(id, "")).json(changes).send().await?;
        decode(response).await
    }

    async fn delete_event(&self, id: &EventId) -> RemoteResult<()> {
        let response = self.client.delete(self.event_url(id, "")).send().await?;
        decode::<serde_json::Value>(response).await.map(|_| ())
    }

    async fn toggle(
        &self,
        kind: Engagement,
        id: &EventId,
        user_id: &str,
        desired: Option<bool>,
    ) -> RemoteResult<Event> {
        let body = MembershipRequest {
            user_id: user_id.to_string(),
            desired,
        };
        let suffix = format!("/{}", kind.as_str());
        let response = self.client.post(self.event_url(id, &suffix)).json(&body).send().await?;
        decode(response).await
    }

    async fn increment_comments(&self, id: &EventId) -> RemoteResult<Event> {
        let response = self.client.post(self.event_url(id, "/comment")).send().await?;
        decode(response).await
    }

    async fn list_discussions(&self, event_id: &EventId) -> RemoteResult<Vec<Discussion>> {
        let url = self.url(&format!("/api/discussions/event/{}", event_id));
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    async fn create_discussion(&self, discussion: &Discussion) -> RemoteResult<Discussion> {
        let url = self.url(&format!("/api/discussions/event/{}", discussion.event_id));
        let body = json!({
            "id": discussion.id,
            "user": discussion.user,
            "content": discussion.content,
            "timestamp": discussion.timestamp,
        });
        let response = self.client.post(url).json(&body).send().await?;
        decode(response).await
    }

    async fn add_reply(&self, discussion_id: i64, reply: &Reply) -> RemoteResult<Discussion> {
        let url = self.url(&format!("/api/discussions/{}/replies", discussion_id));
        let response = self.client.post(url).json(reply).send().await?;
        decode(response).await
    }
}
