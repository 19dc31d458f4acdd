use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tasktrack_shared::{ClearReport, Statistics, Task, TaskDraft, TaskFilter, TaskId, TaskPatch};
use tracing::{debug, instrument, warn};

use super::{TaskStore, validate_draft, validate_patch};
use crate::error::{StoreError, StoreErrorKind, StoreResult};

/// Store client speaking JSON over HTTP.
///
/// `base_url` is the API root, e.g. `http://localhost:5001/api`.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: T,
}

#[derive(Debug, Deserialize)]
struct TasksBody {
    tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
struct TaskBody {
    task: Task,
}

#[derive(Debug, Deserialize)]
struct ClearBody {
    #[serde(default)]
    count: u64,
}

#[derive(Debug, Deserialize)]
struct StatisticsBody {
    statistics: Statistics,
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct Ack {}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

impl HttpStore {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(&format!("{trimmed}/"))
            .with_context(|| format!("invalid store URL: {base_url}"))?;
        let client = reqwest::Client::builder()
            .build()
            .context("failed building HTTP client for task store")?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> StoreResult<Url> {
        self.base_url
            .join(path)
            .map_err(|err| StoreError::malformed(format!("invalid endpoint {path}: {err}")))
    }

    async fn send<T>(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> StoreResult<T>
    where
        T: DeserializeOwned,
    {
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await.map_err(|err| {
            warn!(%method, %url, error = %err, "task store request failed");
            StoreError::network(format!("request to {url} failed: {err}"))
        })?;

        let status = response.status();
        let text = response.text().await.map_err(StoreError::from)?;
        debug!(%method, %url, status = status.as_u16(), bytes = text.len(), "task store responded");

        if !status.is_success() {
            return Err(error_from_response(status, &text));
        }

        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        let envelope: Envelope<T> = serde_json::from_str(text).map_err(|err| {
            StoreError::malformed(format!("invalid response from store: {err}"))
        })?;

        if envelope.success == Some(false) {
            let message = envelope
                .error
                .unwrap_or_else(|| "Unknown API error".to_string());
            return Err(StoreError::new(classify_message(&message, None), message));
        }

        Ok(envelope.body)
    }

    fn encode<T: serde::Serialize>(value: &T) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|err| StoreError::malformed(format!("failed to encode request: {err}")))
    }
}

#[async_trait]
impl TaskStore for HttpStore {
    #[instrument(skip(self), fields(status = %filter.status, category = %filter.category, priority = %filter.priority))]
    async fn list(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let mut url = self.endpoint("tasks")?;
        let pairs = filter.query_pairs();
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }
        let body: TasksBody = self.send(Method::GET, url, None).await?;
        Ok(body.tasks)
    }

    #[instrument(skip(self, draft), fields(description_len = draft.description.len(), priority = %draft.priority))]
    async fn create(&self, draft: TaskDraft) -> StoreResult<Task> {
        let draft = validate_draft(draft)?;
        let url = self.endpoint("tasks")?;
        let body: TaskBody = self
            .send(Method::POST, url, Some(Self::encode(&draft)?))
            .await?;
        Ok(body.task)
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: TaskId, patch: TaskPatch) -> StoreResult<Task> {
        let patch = validate_patch(patch)?;
        let url = self.endpoint(&format!("tasks/{id}"))?;
        let body: TaskBody = self
            .send(Method::PUT, url, Some(Self::encode(&patch)?))
            .await?;
        Ok(body.task)
    }

    #[instrument(skip(self))]
    async fn complete(&self, id: TaskId) -> StoreResult<Task> {
        let url = self.endpoint(&format!("tasks/{id}/complete"))?;
        let body: TaskBody = self.send(Method::POST, url, None).await?;
        Ok(body.task)
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: TaskId) -> StoreResult<()> {
        let url = self.endpoint(&format!("tasks/{id}"))?;
        let _: Ack = self.send(Method::DELETE, url, None).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_completed(&self) -> StoreResult<ClearReport> {
        let url = self.endpoint("tasks/clear-completed")?;
        let body: ClearBody = self.send(Method::POST, url, None).await?;
        Ok(ClearReport {
            removed_count: body.count,
        })
    }

    #[instrument(skip(self))]
    async fn statistics(&self) -> StoreResult<Statistics> {
        let url = self.endpoint("statistics")?;
        let body: StatisticsBody = self.send(Method::GET, url, None).await?;
        Ok(body.statistics)
    }

    #[instrument(skip(self))]
    async fn health(&self) -> StoreResult<bool> {
        let url = self.endpoint("health")?;
        let body: HealthBody = self.send(Method::GET, url, None).await?;
        Ok(body.status == "healthy")
    }
}

fn error_from_response(status: StatusCode, body: &str) -> StoreError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| format!("store returned HTTP {}", status.as_u16()));

    StoreError::new(classify_message(&message, Some(status)), message)
}

fn classify_message(message: &str, status: Option<StatusCode>) -> StoreErrorKind {
    if message.to_ascii_lowercase().contains("already completed") {
        return StoreErrorKind::AlreadyCompleted;
    }
    match status {
        Some(StatusCode::NOT_FOUND) => StoreErrorKind::NotFound,
        Some(StatusCode::CONFLICT) => StoreErrorKind::AlreadyCompleted,
        Some(StatusCode::BAD_REQUEST) | Some(StatusCode::UNPROCESSABLE_ENTITY) => {
            StoreErrorKind::Validation
        }
        Some(other) => StoreErrorKind::Http {
            status: other.as_u16(),
        },
        None if message.to_ascii_lowercase().contains("not found") => StoreErrorKind::NotFound,
        None => StoreErrorKind::Rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_message_is_used_verbatim() {
        let err = error_from_response(
            StatusCode::NOT_FOUND,
            r#"{"success": false, "error": "Task 9 not found"}"#,
        );
        assert_eq!(err.kind, StoreErrorKind::NotFound);
        assert_eq!(err.message, "Task 9 not found");
    }

    #[test]
    fn conflict_maps_to_already_completed() {
        let err = error_from_response(StatusCode::CONFLICT, "");
        assert_eq!(err.kind, StoreErrorKind::AlreadyCompleted);
        assert_eq!(err.message, "store returned HTTP 409");
    }

    #[test]
    fn plain_text_body_becomes_message() {
        let err = error_from_response(StatusCode::INTERNAL_SERVER_ERROR, "boom\n");
        assert_eq!(err.kind, StoreErrorKind::Http { status: 500 });
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn envelope_failure_on_success_status_is_rejected() {
        assert_eq!(
            classify_message("Failed to save tasks: disk full", None),
            StoreErrorKind::Rejected
        );
        assert_eq!(
            classify_message("Task 4 not found", None),
            StoreErrorKind::NotFound
        );
    }

    #[test]
    fn unbuildable_endpoint_is_malformed() {
        let store = HttpStore::new("http://localhost:5001/api").expect("store");
        let err = store.endpoint("http://[::1").expect_err("bad url");
        assert_eq!(err.kind, StoreErrorKind::Malformed);
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let store = HttpStore::new("http://localhost:5001/api").expect("store");
        assert_eq!(
            store.endpoint("tasks/3/complete").expect("url").as_str(),
            "http://localhost:5001/api/tasks/3/complete"
        );
    }
}
