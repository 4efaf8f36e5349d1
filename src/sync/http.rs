use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{ReminderStore, RemoteError};
use crate::core::reminder::{NewReminder, Reminder, ReminderId, ReminderPatch, ReminderStatus};

/// Pagination and filter parameters for `GET /api/reminders`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<ReminderStatus>,
}

impl ListQuery {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(skip) = self.skip.filter(|s| *s > 0) {
            pairs.push(("skip", skip.to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
}

/// REST client for the reminder backend.
#[derive(Clone)]
pub struct HttpStore {
    base_url: String,
    http: Client,
}

impl HttpStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<Health, RemoteError> {
        let resp = self.request(Method::GET, "/health").send().await?;
        read_json(resp, None).await
    }

    pub async fn list_page(&self, query: &ListQuery) -> Result<Vec<Reminder>, RemoteError> {
        let resp = self
            .request(Method::GET, "/api/reminders")
            .query(&query.to_pairs())
            .send()
            .await?;
        let reminders: Vec<Reminder> = read_json(resp, None).await?;
        log::debug!("Fetched {} reminders (status={:?})", reminders.len(), query.status);
        Ok(reminders)
    }
}

#[async_trait]
impl ReminderStore for HttpStore {
    async fn list(&self, status: Option<ReminderStatus>) -> Result<Vec<Reminder>, RemoteError> {
        self.list_page(&ListQuery {
            status,
            ..ListQuery::default()
        })
        .await
    }

    async fn get(&self, id: ReminderId) -> Result<Reminder, RemoteError> {
        let resp = self
            .request(Method::GET, &format!("/api/reminders/{}", id))
            .send()
            .await?;
        read_json(resp, Some(id)).await
    }

    async fn create(&self, data: &NewReminder) -> Result<Reminder, RemoteError> {
        let resp = self
            .request(Method::POST, "/api/reminders")
            .json(data)
            .send()
            .await?;
        let created: Reminder = read_json(resp, None).await?;
        log::info!("Created reminder {} ({})", created.id, created.title);
        Ok(created)
    }

    async fn update(&self, id: ReminderId, patch: &ReminderPatch) -> Result<Reminder, RemoteError> {
        let resp = self
            .request(Method::PUT, &format!("/api/reminders/{}", id))
            .json(patch)
            .send()
            .await?;
        read_json(resp, Some(id)).await
    }

    async fn delete(&self, id: ReminderId) -> Result<(), RemoteError> {
        let resp = self
            .request(Method::DELETE, &format!("/api/reminders/{}", id))
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        Err(status_error(status, &text, Some(id)))
    }
}

async fn read_json<T: DeserializeOwned>(
    resp: Response,
    id: Option<ReminderId>,
) -> Result<T, RemoteError> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(status_error(status, &text, id));
    }
    serde_json::from_str(&text).map_err(|e| RemoteError::Decode(e.to_string()))
}

fn status_error(status: StatusCode, body: &str, id: Option<ReminderId>) -> RemoteError {
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return RemoteError::NotFound(id);
        }
    }
    RemoteError::Rejected {
        status: status.as_u16(),
        detail: extract_detail(status, body),
    }
}

/// Pull a readable message out of a FastAPI error body.
///
/// `detail` is either a string or a list of `{loc, msg}` validation errors.
fn extract_detail(status: StatusCode, body: &str) -> String {
    let fallback = || format!("API error: {}", status.as_u16());
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return fallback();
    };
    match &value["detail"] {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    let msg = item["msg"].as_str()?;
                    let field = item["loc"]
                        .as_array()
                        .and_then(|loc| loc.last())
                        .and_then(|f| f.as_str());
                    Some(match field {
                        Some(field) => format!("{}: {}", field, msg),
                        None => msg.to_string(),
                    })
                })
                .collect();
            if messages.is_empty() {
                fallback()
            } else {
                messages.join("; ")
            }
        }
        _ => fallback(),
    }
}
