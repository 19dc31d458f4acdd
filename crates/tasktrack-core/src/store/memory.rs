use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tasktrack_shared::{
    ClearReport, Statistics, Task, TaskDraft, TaskFilter, TaskId, TaskPatch, TaskStatus,
};
use tracing::{debug, instrument};

use super::{TaskStore, validate_draft, validate_patch};
use crate::error::{StoreError, StoreResult};

/// Store operations, as seen by [`MemoryStore`]'s call log and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Create,
    Update,
    Complete,
    Remove,
    ClearCompleted,
    Statistics,
    Health,
}

#[derive(Debug, Default)]
struct Inner {
    tasks: Vec<Task>,
    next_id: u64,
    calls: Vec<StoreOp>,
    failures: HashMap<StoreOp, StoreError>,
}

/// In-process store honoring the same contract as the HTTP one.
///
/// Tasks are kept in insertion order, ids start at 1. A failure armed with
/// [`MemoryStore::fail_next`] is returned once, in place of the next call to
/// that operation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let next_id = tasks.iter().map(|t| t.id.0).max().unwrap_or(0);
        Self {
            inner: Mutex::new(Inner {
                tasks,
                next_id,
                ..Inner::default()
            }),
        }
    }

    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.inner.lock().failures.insert(op, error);
    }

    /// Operations that reached the store, oldest first.
    pub fn calls(&self) -> Vec<StoreOp> {
        self.inner.lock().calls.clone()
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.inner.lock().tasks.clone()
    }

    fn enter(&self, op: StoreOp) -> StoreResult<parking_lot::MutexGuard<'_, Inner>> {
        let mut inner = self.inner.lock();
        inner.calls.push(op);
        if let Some(err) = inner.failures.remove(&op) {
            debug!(?op, error = %err, "injected store failure");
            return Err(err);
        }
        Ok(inner)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    #[instrument(skip(self))]
    async fn list(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let inner = self.enter(StoreOp::List)?;
        Ok(inner
            .tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect())
    }

    #[instrument(skip(self, draft))]
    async fn create(&self, draft: TaskDraft) -> StoreResult<Task> {
        let draft = validate_draft(draft)?;
        let mut inner = self.enter(StoreOp::Create)?;
        inner.next_id += 1;
        let task = Task {
            id: TaskId(inner.next_id),
            description: draft.description,
            priority: draft.priority,
            category: draft.category,
            status: TaskStatus::Pending,
            created_at: Some(Utc::now().to_rfc3339()),
            completed_at: None,
        };
        inner.tasks.push(task.clone());
        Ok(task)
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: TaskId, patch: TaskPatch) -> StoreResult<Task> {
        let patch = validate_patch(patch)?;
        let mut inner = self.enter(StoreOp::Update)?;
        let task = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::not_found(id))?;

        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(category) = patch.category {
            task.category = category;
        }
        Ok(task.clone())
    }

    #[instrument(skip(self))]
    async fn complete(&self, id: TaskId) -> StoreResult<Task> {
        let mut inner = self.enter(StoreOp::Complete)?;
        let task = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::not_found(id))?;

        if task.is_completed() {
            return Err(StoreError::already_completed(id));
        }
        task.status = TaskStatus::Completed;
        task.completed_at = Some(Utc::now().to_rfc3339());
        Ok(task.clone())
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: TaskId) -> StoreResult<()> {
        let mut inner = self.enter(StoreOp::Remove)?;
        let idx = inner
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::not_found(id))?;
        inner.tasks.remove(idx);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_completed(&self) -> StoreResult<ClearReport> {
        let mut inner = self.enter(StoreOp::ClearCompleted)?;
        let before = inner.tasks.len();
        inner.tasks.retain(|t| !t.is_completed());
        let removed_count = (before - inner.tasks.len()) as u64;
        debug!(removed_count, "cleared completed tasks");
        Ok(ClearReport { removed_count })
    }

    #[instrument(skip(self))]
    async fn statistics(&self) -> StoreResult<Statistics> {
        let inner = self.enter(StoreOp::Statistics)?;
        Ok(Statistics::compute(&inner.tasks))
    }

    async fn health(&self) -> StoreResult<bool> {
        drop(self.enter(StoreOp::Health)?);
        Ok(true)
    }
}
