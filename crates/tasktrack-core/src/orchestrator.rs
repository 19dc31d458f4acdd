use tasktrack_shared::{ClearReport, Statistics, Task, TaskDraft, TaskFilter, TaskId, TaskPatch};
use tracing::{debug, error, info, instrument, warn};

use crate::error::StoreResult;
use crate::state::{AppState, Command, ConfirmationToken, Event, reduce};
use crate::store::TaskStore;

/// A refresh round handed out by [`Orchestrator::begin_refresh`].
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTicket {
    pub seq: u64,
    pub filter: TaskFilter,
}

/// Sequences user commands into store calls and the refreshes that follow.
///
/// Owns the only [`AppState`]. Command failures are recorded in the state and
/// never returned as errors; a command's return value is `None` when it
/// failed.
pub struct Orchestrator<S> {
    store: S,
    state: AppState,
}

impl<S: TaskStore> Orchestrator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: AppState::default(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        self.state.tasks.current()
    }

    pub fn statistics(&self) -> Option<&Statistics> {
        self.state.statistics.current()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }

    pub fn filter(&self) -> &TaskFilter {
        self.state.filter.current()
    }

    fn dispatch(&mut self, event: Event) {
        apply(&mut self.state, event);
    }

    /// Initial fetch of the task list and statistics.
    #[instrument(skip(self))]
    pub async fn load(&mut self) {
        self.refresh(true).await;
    }

    #[instrument(skip(self))]
    pub async fn set_filter(&mut self, filter: TaskFilter) {
        info!("filter change requested");
        self.dispatch(Event::FilterChanged(filter));
        self.refresh(true).await;
    }

    pub fn dismiss_error(&mut self) {
        self.dispatch(Event::ErrorDismissed);
    }

    /// Opens a refresh round: allocates its sequence number and captures the
    /// filter it will fetch with.
    pub fn begin_refresh(&mut self, show_loading: bool) -> RefreshTicket {
        self.dispatch(Event::RefreshIssued { show_loading });
        RefreshTicket {
            seq: self.state.last_refresh_seq(),
            filter: self.state.filter.current().clone(),
        }
    }

    pub fn finish_tasks(&mut self, seq: u64, result: StoreResult<Vec<Task>>) {
        apply_tasks(&mut self.state, seq, result);
    }

    pub fn finish_statistics(&mut self, seq: u64, result: StoreResult<Statistics>) {
        apply_statistics(&mut self.state, seq, result);
    }

    /// Fetches the task list and statistics concurrently. Each result is
    /// applied as soon as it arrives, so a slow statistics call never holds
    /// back the task list.
    async fn refresh(&mut self, show_loading: bool) {
        let ticket = self.begin_refresh(show_loading);
        let Self { store, state } = self;
        let mut tasks = store.list(&ticket.filter);
        let mut statistics = store.statistics();
        let (mut tasks_done, mut statistics_done) = (false, false);

        while !(tasks_done && statistics_done) {
            tokio::select! {
                result = &mut tasks, if !tasks_done => {
                    tasks_done = true;
                    apply_tasks(state, ticket.seq, result);
                }
                result = &mut statistics, if !statistics_done => {
                    statistics_done = true;
                    apply_statistics(state, ticket.seq, result);
                }
            }
        }
    }

    fn command_started(&mut self, command: Command) {
        info!(action = command.action(), ?command, "command invoked");
        self.dispatch(Event::CommandIssued(command));
    }

    async fn command_finished<T>(&mut self, command: Command, result: StoreResult<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.dispatch(Event::CommandSucceeded(command));
                self.refresh(false).await;
                Some(value)
            }
            Err(err) => {
                error!(action = command.action(), kind = %err.kind, error = %err, "command failed");
                self.dispatch(Event::CommandFailed {
                    command,
                    message: err.message,
                });
                None
            }
        }
    }

    #[instrument(skip(self, draft))]
    pub async fn add_task(&mut self, draft: TaskDraft) -> Option<Task> {
        self.command_started(Command::Add);
        let result = self.store.create(draft).await;
        self.command_finished(Command::Add, result).await
    }

    #[instrument(skip(self, patch))]
    pub async fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Option<Task> {
        let command = Command::Update(id);
        self.command_started(command);
        let result = self.store.update(id, patch).await;
        self.command_finished(command, result).await
    }

    #[instrument(skip(self))]
    pub async fn complete_task(&mut self, id: TaskId) -> Option<Task> {
        let command = Command::Complete(id);
        self.command_started(command);
        let result = self.store.complete(id).await;
        self.command_finished(command, result).await
    }

    #[instrument(skip(self))]
    pub async fn delete_task(&mut self, id: TaskId) -> bool {
        let command = Command::Delete(id);
        self.command_started(command);
        let result = self.store.remove(id).await;
        self.command_finished(command, result).await.is_some()
    }

    /// First phase of clear-completed. Nothing is sent to the store until
    /// the returned token is confirmed.
    pub fn request_clear_completed(&mut self) -> ConfirmationToken {
        let token = ConfirmationToken::new();
        debug!(%token, "clear-completed confirmation requested");
        self.dispatch(Event::ClearRequested(token));
        token
    }

    pub fn cancel_clear_completed(&mut self, token: ConfirmationToken) {
        debug!(%token, "clear-completed cancelled");
        self.dispatch(Event::ClearCancelled(token));
    }

    #[instrument(skip(self))]
    pub async fn confirm_clear_completed(&mut self, token: ConfirmationToken) -> Option<ClearReport> {
        if self.state.pending_clear() != Some(token) {
            warn!(%token, "clear-completed confirmed with an unknown token");
            self.dispatch(Event::CommandFailed {
                command: Command::ClearCompleted,
                message: "confirmation token is not valid".to_string(),
            });
            return None;
        }
        self.dispatch(Event::ClearConfirmed(token));

        self.command_started(Command::ClearCompleted);
        let result = self.store.clear_completed().await;
        self.command_finished(Command::ClearCompleted, result).await
    }
}

fn apply(state: &mut AppState, event: Event) {
    *state = reduce(std::mem::take(state), event);
}

fn apply_tasks(state: &mut AppState, seq: u64, result: StoreResult<Vec<Task>>) {
    if state.tasks.is_stale(seq) {
        debug!(seq, applied = state.tasks.applied_seq(), "discarding stale task list response");
        return;
    }
    match result {
        Ok(tasks) => {
            debug!(seq, count = tasks.len(), "task list refreshed");
            apply(state, Event::TasksLoaded { seq, tasks });
        }
        Err(err) => {
            error!(seq, kind = %err.kind, error = %err, "task list refresh failed");
            apply(
                state,
                Event::TasksFailed {
                    seq,
                    message: err.message,
                },
            );
        }
    }
}

fn apply_statistics(state: &mut AppState, seq: u64, result: StoreResult<Statistics>) {
    match result {
        Ok(statistics) if seq <= state.statistics.applied_seq() => {
            debug!(
                seq,
                applied = state.statistics.applied_seq(),
                total = statistics.total,
                "discarding stale statistics response"
            );
        }
        Ok(statistics) => {
            apply(state, Event::StatisticsLoaded { seq, statistics });
        }
        Err(err) => {
            warn!(seq, kind = %err.kind, error = %err, "failed to load statistics");
            apply(
                state,
                Event::StatisticsFailed {
                    seq,
                    message: err.message,
                },
            );
        }
    }
}
