//! HTTP client for the background task service.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroize;

/// Bound on a single task-creation request.
pub const TASK_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Value of the `source` field on every task created from a call.
pub const TASK_SOURCE: &str = "dialaifriend-phone";

/// Titles are cut to this many characters.
pub const TITLE_MAX_CHARS: usize = 120;

/// Side-channel failures. `Display` is what the caller ends up hearing about.
#[derive(Debug, Error)]
pub enum TaskServiceError {
    #[error("task service URL not configured")]
    NotConfigured,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("exception contacting task service: {0}")]
    Transport(String),
}

pub type TaskResult<T> = Result<T, TaskServiceError>;

/// Call metadata attached to every task.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskMetadata {
    pub voice: String,
    #[serde(rename = "streamSid")]
    pub stream_sid: Option<String>,
    /// Unix seconds
    pub timestamp: u64,
}

/// Body of a task-creation request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskRequest {
    pub title: String,
    pub description: String,
    pub source: String,
    pub metadata: TaskMetadata,
}

impl TaskRequest {
    /// Build a request for `command`, stamped with the current time.
    pub fn new(command: &str, voice: &str, stream_sid: Option<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            title: command.chars().take(TITLE_MAX_CHARS).collect(),
            description: command.to_string(),
            source: TASK_SOURCE.to_string(),
            metadata: TaskMetadata {
                voice: voice.to_string(),
                stream_sid,
                timestamp,
            },
        }
    }
}

/// Successful task creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReceipt {
    /// Identifier or link returned by the service, or `created`
    pub reference: String,
}

impl TaskReceipt {
    /// Pick the most useful identifier out of a 2xx response body.
    pub fn from_body(body: &serde_json::Value) -> Self {
        let reference = ["url", "html_url", "id", "task_id"]
            .iter()
            .filter_map(|key| body.get(*key))
            .find_map(|value| match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) if s.is_empty() => None,
                serde_json::Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .unwrap_or_else(|| "created".to_string());
        Self { reference }
    }
}

/// Anything that can create a task. The relay only depends on this.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn create_task(&self, request: &TaskRequest) -> TaskResult<TaskReceipt>;
}

/// Task service configuration. The token is wiped on drop.
#[derive(Clone, Default, Deserialize)]
pub struct TaskServiceConfig {
    pub url: Option<String>,
    pub token: Option<String>,
}

impl std::fmt::Debug for TaskServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskServiceConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Drop for TaskServiceConfig {
    fn drop(&mut self) {
        if let Some(ref mut token) = self.token {
            token.zeroize();
        }
    }
}

/// reqwest-backed [`TaskBackend`].
#[derive(Clone)]
pub struct TaskServiceClient {
    url: Option<String>,
    token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for TaskServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskServiceClient")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Drop for TaskServiceClient {
    fn drop(&mut self) {
        if let Some(ref mut token) = self.token {
            token.zeroize();
        }
    }
}

impl TaskServiceClient {
    pub fn new(mut config: TaskServiceConfig) -> Self {
        Self {
            url: config.url.take().filter(|u| !u.trim().is_empty()),
            token: config.token.take().filter(|t| !t.is_empty()),
            timeout: TASK_REQUEST_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

#[async_trait]
impl TaskBackend for TaskServiceClient {
    async fn create_task(&self, request: &TaskRequest) -> TaskResult<TaskReceipt> {
        let url = self.url.as_deref().ok_or(TaskServiceError::NotConfigured)?;

        debug!(url = %url, title = %request.title, "Creating background task");

        let mut builder = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header("Accept", "application/json")
            .json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TaskServiceError::Timeout(self.timeout)
            } else {
                TaskServiceError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TaskServiceError::Timeout(self.timeout)
            } else {
                TaskServiceError::Transport(e.to_string())
            }
        })?;

        if !status.is_success() {
            warn!(url = %url, status = %status, "Task service returned non-success status");
            return Err(TaskServiceError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let body = serde_json::from_str::<serde_json::Value>(&text)
            .unwrap_or(serde_json::Value::Null);
        Ok(TaskReceipt::from_body(&body))
    }
}
