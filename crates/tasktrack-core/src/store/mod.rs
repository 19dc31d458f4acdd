pub mod http;
pub mod memory;

use async_trait::async_trait;
use tasktrack_shared::{ClearReport, Statistics, Task, TaskDraft, TaskFilter, TaskId, TaskPatch};

use crate::error::StoreResult;

pub use http::HttpStore;
pub use memory::MemoryStore;

/// One method per capability of the remote task store.
///
/// Every call is a single attempt: implementations never retry, and errors
/// reach the caller as-is. Filtering happens on the store side.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    /// Fails with `Validation` before contacting the store when the
    /// description is blank.
    async fn create(&self, draft: TaskDraft) -> StoreResult<Task>;

    async fn update(&self, id: TaskId, patch: TaskPatch) -> StoreResult<Task>;

    async fn complete(&self, id: TaskId) -> StoreResult<Task>;

    async fn remove(&self, id: TaskId) -> StoreResult<()>;

    /// Succeeds with `removed_count == 0` when nothing is completed.
    async fn clear_completed(&self) -> StoreResult<ClearReport>;

    async fn statistics(&self) -> StoreResult<Statistics>;

    async fn health(&self) -> StoreResult<bool>;
}

/// Client-side checks shared by every store implementation.
pub(crate) fn validate_draft(draft: TaskDraft) -> StoreResult<TaskDraft> {
    if draft.has_blank_description() {
        return Err(crate::error::StoreError::validation(
            "Task description cannot be empty",
        ));
    }
    Ok(draft.normalized())
}

pub(crate) fn validate_patch(patch: TaskPatch) -> StoreResult<TaskPatch> {
    if patch.has_blank_description() {
        return Err(crate::error::StoreError::validation(
            "Task description cannot be empty",
        ));
    }
    let patch = patch.normalized();
    if patch.is_empty() {
        return Err(crate::error::StoreError::validation(
            "At least one field must be specified for update",
        ));
    }
    Ok(patch)
}
