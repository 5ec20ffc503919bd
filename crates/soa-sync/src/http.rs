//! HTTP client for the compliance API: tasks, attachments, comments, people, context entries.

use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use soa_core::api::{
    Attachment, Comment, ContextResponse, CreateCommentRequest, EntityType, PeopleResponse, Task,
    UploadAttachmentRequest,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::mask::{mask_body, mask_headers};

pub const DEFAULT_BASE_URL: &str = "https://api.trycomp.ai/v1";

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Credentials and endpoint for the compliance API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub organization_id: Option<String>,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            organization_id: None,
        }
    }
}

#[derive(Serialize)]
struct UpdateComment<'a> {
    content: &'a str,
}

/// HTTP client for the compliance API.
pub struct ComplianceClient {
    client: reqwest::Client,
    config: ApiConfig,
}

impl ComplianceClient {
    /// Create a client. `config.base_url` should be like `https://api.trycomp.ai/v1`
    /// (a trailing slash is removed).
    pub fn new(mut config: ApiConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn headers(&self) -> Vec<(&'static str, &str)> {
        let mut headers = vec![
            ("Content-Type", "application/json"),
            ("X-API-Key", self.config.api_key.as_str()),
        ];
        if let Some(org) = &self.config.organization_id {
            headers.push(("X-Organization-Id", org.as_str()));
        }
        headers
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        let headers = self.headers();
        info!(method = %method, url = %url, "compliance API request");
        debug!(headers = ?mask_headers(headers.iter().copied()), "request headers");

        headers
            .into_iter()
            .fold(self.client.request(method, &url), |req, (name, value)| {
                req.header(name, value)
            })
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, SyncError> {
        let body = self.send_raw(req).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_raw(&self, req: RequestBuilder) -> Result<String, SyncError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(SyncError::Server {
                status: status.as_u16(),
                message: server_message(status.as_u16(), &body),
            });
        }
        Ok(body)
    }

    pub async fn tasks(&self) -> Result<Vec<Task>, SyncError> {
        let tasks: Vec<Task> = self.send(self.request(Method::GET, "/tasks")).await?;
        info!(count = tasks.len(), "fetched tasks");
        Ok(tasks)
    }

    pub async fn task(&self, task_id: &str) -> Result<Task, SyncError> {
        self.send(self.request(Method::GET, &format!("/tasks/{task_id}")))
            .await
    }

    pub async fn task_attachments(&self, task_id: &str) -> Result<Vec<Attachment>, SyncError> {
        self.send(self.request(Method::GET, &format!("/tasks/{task_id}/attachments")))
            .await
    }

    pub async fn upload_task_attachment(
        &self,
        task_id: &str,
        attachment: &UploadAttachmentRequest,
    ) -> Result<Attachment, SyncError> {
        info!(
            task_id,
            file_name = %attachment.file_name,
            file_type = %attachment.file_type,
            bytes_b64 = attachment.file_data.len(),
            "uploading task attachment"
        );
        let mut logged = serde_json::to_value(attachment)?;
        if let Some(obj) = logged.as_object_mut() {
            obj.remove("fileData");
        }
        debug!(body = %mask_body(&logged), "upload body");

        let req = self
            .request(Method::POST, &format!("/tasks/{task_id}/attachments"))
            .json(attachment);
        self.send(req).await
    }

    pub async fn delete_task_attachment(
        &self,
        task_id: &str,
        attachment_id: &str,
    ) -> Result<(), SyncError> {
        let req = self.request(
            Method::DELETE,
            &format!("/tasks/{task_id}/attachments/{attachment_id}"),
        );
        self.send_raw(req).await.map(|_| ())
    }

    pub async fn comments(
        &self,
        entity_id: &str,
        entity_type: EntityType,
    ) -> Result<Vec<Comment>, SyncError> {
        let req = self
            .request(Method::GET, "/comments")
            .query(&[("entityId", entity_id), ("entityType", entity_type.as_str())]);
        self.send(req).await
    }

    pub async fn create_comment(&self, comment: &CreateCommentRequest) -> Result<Comment, SyncError> {
        debug!(body = %mask_body(&serde_json::to_value(comment)?), "create comment body");
        let req = self.request(Method::POST, "/comments").json(comment);
        self.send(req).await
    }

    pub async fn update_comment(&self, comment_id: &str, content: &str) -> Result<Comment, SyncError> {
        let req = self
            .request(Method::PUT, &format!("/comments/{comment_id}"))
            .json(&UpdateComment { content });
        self.send(req).await
    }

    pub async fn delete_comment(&self, comment_id: &str) -> Result<(), SyncError> {
        let req = self.request(Method::DELETE, &format!("/comments/{comment_id}"));
        self.send_raw(req).await.map(|_| ())
    }

    pub async fn people(&self) -> Result<PeopleResponse, SyncError> {
        self.send(self.request(Method::GET, "/people")).await
    }

    pub async fn context_entries(&self) -> Result<ContextResponse, SyncError> {
        let resp: ContextResponse = self.send(self.request(Method::GET, "/context")).await?;
        info!(count = resp.data.len(), "fetched context entries");
        Ok(resp)
    }
}

/// Best human-readable message from an error response body.
///
/// Prefers a JSON `message` or `error` string, then the raw body, then `HTTP <status>`.
fn server_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str())
                && !msg.is_empty()
            {
                return msg.to_string();
            }
        }
    }
    if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        body.to_string()
    }
}
