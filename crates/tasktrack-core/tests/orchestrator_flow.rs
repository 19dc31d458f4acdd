use std::time::Duration;

use async_trait::async_trait;
use tasktrack_core::store::memory::StoreOp;
use tasktrack_core::{MemoryStore, Orchestrator, StoreError, StoreResult, TaskStore};
use tasktrack_shared::{
    ClearReport, Statistics, Task, TaskDraft, TaskFilter, TaskId, TaskPatch, TaskPriority,
    TaskStatus,
};

/// Memory store whose statistics call never answers.
struct StalledStatistics(MemoryStore);

#[async_trait]
impl TaskStore for StalledStatistics {
    async fn list(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        self.0.list(filter).await
    }

    async fn create(&self, draft: TaskDraft) -> StoreResult<Task> {
        self.0.create(draft).await
    }

    async fn update(&self, id: TaskId, patch: TaskPatch) -> StoreResult<Task> {
        self.0.update(id, patch).await
    }

    async fn complete(&self, id: TaskId) -> StoreResult<Task> {
        self.0.complete(id).await
    }

    async fn remove(&self, id: TaskId) -> StoreResult<()> {
        self.0.remove(id).await
    }

    async fn clear_completed(&self) -> StoreResult<ClearReport> {
        self.0.clear_completed().await
    }

    async fn statistics(&self) -> StoreResult<Statistics> {
        std::future::pending().await
    }

    async fn health(&self) -> StoreResult<bool> {
        self.0.health().await
    }
}

fn orchestrator() -> Orchestrator<MemoryStore> {
    Orchestrator::new(MemoryStore::new())
}

async fn seeded() -> Orchestrator<MemoryStore> {
    let mut orch = orchestrator();
    orch.add_task(
        TaskDraft::new("Write report")
            .with_priority(TaskPriority::Low)
            .with_category("work"),
    )
    .await
    .expect("add work task");
    let home = orch
        .add_task(
            TaskDraft::new("Fix sink")
                .with_priority(TaskPriority::High)
                .with_category("home"),
        )
        .await
        .expect("add home task");
    orch.complete_task(home.id).await.expect("complete home task");
    orch
}

#[tokio::test]
async fn buy_milk_scenario() {
    let mut orch = orchestrator();
    orch.load().await;
    assert!(orch.tasks().is_empty());

    let task = orch
        .add_task(
            TaskDraft::new("Buy milk")
                .with_priority(TaskPriority::Medium)
                .with_category("general"),
        )
        .await
        .expect("add task");

    assert_eq!(orch.tasks().len(), 1);
    assert_eq!(orch.tasks()[0].status, TaskStatus::Pending);
    assert_eq!(orch.tasks()[0].description, "Buy milk");

    orch.complete_task(task.id).await.expect("complete task");

    let stats = orch.statistics().expect("statistics loaded");
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.completion_rate, 100.0);
    assert_eq!(orch.error(), None);
}

#[tokio::test]
async fn created_task_is_listed_as_pending() {
    let mut orch = orchestrator();
    for description in ["one", "two", "three"] {
        let created = orch
            .add_task(TaskDraft::new(description))
            .await
            .expect("add task");

        let listed = orch
            .store()
            .list(&TaskFilter::default())
            .await
            .expect("list tasks");
        let found = listed
            .iter()
            .find(|t| t.id == created.id)
            .expect("created task listed");
        assert_eq!(found.status, TaskStatus::Pending);
    }
}

#[tokio::test]
async fn store_failure_on_create_leaves_collection_unchanged() {
    let mut orch = orchestrator();
    orch.add_task(TaskDraft::new("existing")).await.expect("add task");
    let before = orch.tasks().to_vec();

    orch.store()
        .fail_next(StoreOp::Create, StoreError::network("connection refused"));
    let result = orch.add_task(TaskDraft::new("Buy milk")).await;

    assert!(result.is_none());
    assert_eq!(orch.tasks(), before.as_slice());
    let error = orch.error().expect("error surfaced");
    assert!(error.contains("Failed to add task"), "{error}");
    assert!(error.contains("connection refused"), "{error}");
}

#[tokio::test]
async fn blank_description_is_never_sent() {
    let mut orch = orchestrator();
    let result = orch.add_task(TaskDraft::new("   ")).await;

    assert!(result.is_none());
    assert!(!orch.store().calls().contains(&StoreOp::Create));
    assert_eq!(
        orch.error(),
        Some("Failed to add task: Task description cannot be empty")
    );
}

#[tokio::test]
async fn second_completion_reports_already_completed() {
    let mut orch = orchestrator();
    let task = orch.add_task(TaskDraft::new("once")).await.expect("add task");

    assert!(orch.complete_task(task.id).await.is_some());
    assert!(orch.complete_task(task.id).await.is_none());

    let error = orch.error().expect("error surfaced");
    assert!(error.starts_with("Failed to complete task:"), "{error}");
    assert!(error.contains("already completed"), "{error}");
    assert_eq!(orch.tasks()[0].status, TaskStatus::Completed);
    assert_eq!(orch.state().in_flight(), None);
}

#[tokio::test]
async fn every_mutation_refreshes_tasks_and_statistics() {
    let mut orch = orchestrator();
    let task = orch.add_task(TaskDraft::new("a")).await.expect("add task");
    assert_eq!(
        orch.store().calls(),
        vec![StoreOp::Create, StoreOp::List, StoreOp::Statistics]
    );

    orch.update_task(
        task.id,
        TaskPatch {
            category: Some("errands".into()),
            ..TaskPatch::default()
        },
    )
    .await
    .expect("update task");
    assert_eq!(
        &orch.store().calls()[3..],
        &[StoreOp::Update, StoreOp::List, StoreOp::Statistics]
    );
    assert!(!orch.state().is_loading());
}

#[tokio::test]
async fn failed_mutation_skips_refresh() {
    let mut orch = orchestrator();
    orch.delete_task(TaskId(99)).await;

    assert_eq!(orch.store().calls(), vec![StoreOp::Remove]);
    assert_eq!(orch.error(), Some("Failed to delete task: Task 99 not found"));
}

#[tokio::test]
async fn update_changes_fields_but_not_status() {
    let mut orch = orchestrator();
    let task = orch.add_task(TaskDraft::new("draft")).await.expect("add task");

    let updated = orch
        .update_task(
            task.id,
            TaskPatch {
                description: Some("  final  ".into()),
                priority: Some(TaskPriority::High),
                category: None,
            },
        )
        .await
        .expect("update task");

    assert_eq!(updated.id, task.id);
    assert_eq!(updated.description, "final");
    assert_eq!(updated.priority, TaskPriority::High);
    assert_eq!(updated.category, "general");
    assert_eq!(updated.status, TaskStatus::Pending);
}

#[tokio::test]
async fn empty_update_is_rejected_client_side() {
    let mut orch = orchestrator();
    let task = orch.add_task(TaskDraft::new("x")).await.expect("add task");
    let calls_before = orch.store().calls().len();

    assert!(orch.update_task(task.id, TaskPatch::default()).await.is_none());
    assert_eq!(orch.store().calls().len(), calls_before);
    assert_eq!(
        orch.error(),
        Some("Failed to update task: At least one field must be specified for update")
    );
}

#[tokio::test]
async fn filter_changes_refetch_from_store() {
    let mut orch = seeded().await;

    orch.set_filter(TaskFilter::default().with_status("pending"))
        .await;
    assert_eq!(orch.tasks().len(), 1);
    assert_eq!(orch.tasks()[0].category, "work");

    orch.set_filter(TaskFilter::default().with_priority("high"))
        .await;
    assert_eq!(orch.tasks().len(), 1);
    assert_eq!(orch.tasks()[0].category, "home");

    orch.set_filter(TaskFilter::default().with_category("home"))
        .await;
    assert_eq!(orch.tasks().len(), 1);
    assert_eq!(orch.tasks()[0].priority, TaskPriority::High);

    assert_eq!(orch.state().filter.revision(), 3);
    assert!(!orch.state().is_loading());
}

#[tokio::test]
async fn mutation_keeps_active_filter() {
    let mut orch = seeded().await;
    orch.set_filter(TaskFilter::default().with_status("pending"))
        .await;

    orch.add_task(TaskDraft::new("Call plumber").with_category("home"))
        .await
        .expect("add task");

    assert_eq!(orch.tasks().len(), 2);
    assert!(orch.tasks().iter().all(|t| t.status == TaskStatus::Pending));
    assert_eq!(orch.statistics().map(|s| s.total), Some(3));
}

#[tokio::test]
async fn filter_change_clears_previous_error() {
    let mut orch = orchestrator();
    orch.complete_task(TaskId(5)).await;
    assert!(orch.error().is_some());

    orch.set_filter(TaskFilter::default()).await;
    assert_eq!(orch.error(), None);
}

#[tokio::test]
async fn dismissing_error_clears_it() {
    let mut orch = orchestrator();
    orch.complete_task(TaskId(5)).await;
    orch.dismiss_error();
    assert_eq!(orch.error(), None);
}

#[tokio::test]
async fn statistics_failure_is_logged_only() {
    let mut orch = orchestrator();
    orch.add_task(TaskDraft::new("a")).await.expect("add task");
    let stats_before = orch.statistics().cloned();

    orch.store()
        .fail_next(StoreOp::Statistics, StoreError::network("timeout"));
    orch.add_task(TaskDraft::new("b")).await.expect("add task");

    assert_eq!(orch.error(), None);
    assert_eq!(orch.tasks().len(), 2);
    assert_eq!(orch.statistics().cloned(), stats_before);
}

#[tokio::test]
async fn task_list_failure_is_surfaced_and_keeps_old_list() {
    let mut orch = orchestrator();
    orch.add_task(TaskDraft::new("a")).await.expect("add task");

    orch.store()
        .fail_next(StoreOp::List, StoreError::network("connection reset"));
    orch.set_filter(TaskFilter::default().with_status("completed"))
        .await;

    assert_eq!(orch.tasks().len(), 1);
    assert!(!orch.state().is_loading());
    assert_eq!(
        orch.error(),
        Some("Failed to load tasks: connection reset")
    );
}

#[tokio::test]
async fn clear_completed_twice_second_removes_nothing() {
    let mut orch = seeded().await;

    let token = orch.request_clear_completed();
    let first = orch.confirm_clear_completed(token).await.expect("first clear");
    assert_eq!(first.removed_count, 1);

    let token = orch.request_clear_completed();
    let second = orch.confirm_clear_completed(token).await.expect("second clear");
    assert_eq!(second.removed_count, 0);

    assert_eq!(orch.tasks().len(), 1);
    assert_eq!(orch.statistics().map(|s| s.completed), Some(0));
}

#[tokio::test]
async fn clear_completed_requires_live_token() {
    let mut orch = seeded().await;
    let calls_before = orch.store().calls().len();

    let token = orch.request_clear_completed();
    orch.cancel_clear_completed(token);
    assert!(orch.confirm_clear_completed(token).await.is_none());

    let token = orch.request_clear_completed();
    orch.confirm_clear_completed(token).await.expect("clear");
    assert!(orch.confirm_clear_completed(token).await.is_none());

    let clear_calls = orch.store().calls()[calls_before..]
        .iter()
        .filter(|op| **op == StoreOp::ClearCompleted)
        .count();
    assert_eq!(clear_calls, 1);
    assert_eq!(
        orch.error(),
        Some("Failed to clear completed tasks: confirmation token is not valid")
    );
}

#[tokio::test]
async fn late_mutation_refresh_does_not_override_filter_refresh() {
    let mut orch = seeded().await;

    // a mutation-triggered refresh is issued but its response is held back
    let ticket = orch.begin_refresh(false);
    let late = orch.store().list(&ticket.filter).await;
    assert_eq!(late.as_ref().map(Vec::len).ok(), Some(2));

    orch.set_filter(TaskFilter::default().with_category("home"))
        .await;
    assert_eq!(orch.tasks().len(), 1);

    orch.finish_tasks(ticket.seq, late);
    assert_eq!(orch.tasks().len(), 1);
    assert_eq!(orch.tasks()[0].category, "home");
}

#[tokio::test]
async fn loading_flag_tracks_filter_refresh_only() {
    let mut orch = orchestrator();

    let ticket = orch.begin_refresh(true);
    assert!(orch.state().is_loading());
    let tasks = orch.store().list(&ticket.filter).await;
    orch.finish_tasks(ticket.seq, tasks);
    assert!(!orch.state().is_loading());

    let ticket = orch.begin_refresh(false);
    assert!(!orch.state().is_loading());
    orch.finish_tasks(ticket.seq, Ok(vec![]));
}

#[tokio::test]
async fn task_list_lands_while_statistics_is_pending() {
    let inner = MemoryStore::new();
    inner
        .create(TaskDraft::new("Buy milk"))
        .await
        .expect("seed task");
    let mut orch = Orchestrator::new(StalledStatistics(inner));

    let finished = tokio::time::timeout(Duration::from_millis(200), orch.load()).await;

    assert!(finished.is_err(), "statistics never answers");
    assert_eq!(orch.tasks().len(), 1);
    assert_eq!(orch.tasks()[0].description, "Buy milk");
    assert!(!orch.state().is_loading());
    assert!(orch.statistics().is_none());
    assert_eq!(orch.error(), None);
}

#[tokio::test]
async fn stale_statistics_response_is_discarded() {
    let mut orch = seeded().await;
    let early = orch.begin_refresh(false);
    let late = orch.begin_refresh(false);
    let snapshot = orch.store().statistics().await.expect("statistics");

    orch.finish_statistics(late.seq, Ok(snapshot.clone()));
    orch.finish_statistics(
        early.seq,
        Ok(Statistics {
            total: 99,
            ..snapshot.clone()
        }),
    );

    assert_eq!(orch.statistics(), Some(&snapshot));
    assert_eq!(orch.state().statistics.applied_seq(), late.seq);
}
