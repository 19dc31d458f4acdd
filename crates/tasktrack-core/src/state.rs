//! Session state and the reducer that drives it.
//!
//! Every change to [`AppState`] goes through [`reduce`], which is pure: the
//! orchestrator performs the store calls and feeds their results back in as
//! [`Event`]s.

use std::fmt;

use tasktrack_shared::{Statistics, Task, TaskFilter, TaskId};
use uuid::Uuid;

use crate::collection::{Applied, TaskCollection};
use crate::filter::FilterState;
use crate::stats::StatisticsAggregator;

/// User-initiated mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Add,
    Update(TaskId),
    Complete(TaskId),
    Delete(TaskId),
    ClearCompleted,
}

impl Command {
    /// Verb phrase used in user-facing failure messages.
    pub fn action(&self) -> &'static str {
        match self {
            Command::Add => "add task",
            Command::Update(_) => "update task",
            Command::Complete(_) => "complete task",
            Command::Delete(_) => "delete task",
            Command::ClearCompleted => "clear completed tasks",
        }
    }
}

pub const LOAD_TASKS_ACTION: &str = "load tasks";

/// Single-use ticket handed out by a clear-completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfirmationToken(Uuid);

impl ConfirmationToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConfirmationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConfirmationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    FilterChanged(TaskFilter),
    /// Starts a refresh round for both the task list and statistics. The
    /// round gets the next sequence number.
    RefreshIssued { show_loading: bool },
    TasksLoaded { seq: u64, tasks: Vec<Task> },
    TasksFailed { seq: u64, message: String },
    StatisticsLoaded { seq: u64, statistics: Statistics },
    StatisticsFailed { seq: u64, message: String },
    CommandIssued(Command),
    CommandSucceeded(Command),
    CommandFailed { command: Command, message: String },
    ClearRequested(ConfirmationToken),
    ClearConfirmed(ConfirmationToken),
    ClearCancelled(ConfirmationToken),
    ErrorDismissed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub filter: FilterState,
    pub tasks: TaskCollection,
    pub statistics: StatisticsAggregator,
    error: Option<String>,
    in_flight: Option<Command>,
    pending_clear: Option<ConfirmationToken>,
    last_refresh_seq: u64,
}

impl AppState {
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.tasks.is_loading()
    }

    /// `Some` while a command's store call is outstanding.
    pub fn in_flight(&self) -> Option<Command> {
        self.in_flight
    }

    pub fn pending_clear(&self) -> Option<ConfirmationToken> {
        self.pending_clear
    }

    /// Sequence number of the most recently issued refresh round.
    pub fn last_refresh_seq(&self) -> u64 {
        self.last_refresh_seq
    }
}

pub fn failure_message(action: &str, message: &str) -> String {
    format!("Failed to {action}: {message}")
}

/// Applies one event. Unknown or outdated events leave the state untouched.
pub fn reduce(mut state: AppState, event: Event) -> AppState {
    match event {
        Event::FilterChanged(filter) => {
            state.filter.set(filter);
            state.error = None;
        }
        Event::RefreshIssued { show_loading } => {
            state.last_refresh_seq += 1;
            if show_loading {
                state.tasks.begin_loading(state.last_refresh_seq);
            }
        }
        Event::TasksLoaded { seq, tasks } => {
            state.tasks.replace(seq, tasks);
        }
        Event::TasksFailed { seq, message } => {
            if state.tasks.reject(seq) == Applied::Fresh {
                state.error = Some(failure_message(LOAD_TASKS_ACTION, &message));
            }
        }
        Event::StatisticsLoaded { seq, statistics } => {
            state.statistics.replace(seq, statistics);
        }
        Event::StatisticsFailed { .. } => {}
        Event::CommandIssued(command) => {
            state.in_flight = Some(command);
            state.error = None;
        }
        Event::CommandSucceeded(command) => {
            if state.in_flight == Some(command) {
                state.in_flight = None;
            }
        }
        Event::CommandFailed { command, message } => {
            if state.in_flight == Some(command) {
                state.in_flight = None;
            }
            state.error = Some(failure_message(command.action(), &message));
        }
        Event::ClearRequested(token) => {
            state.pending_clear = Some(token);
        }
        Event::ClearConfirmed(token) | Event::ClearCancelled(token) => {
            if state.pending_clear == Some(token) {
                state.pending_clear = None;
            }
        }
        Event::ErrorDismissed => {
            state.error = None;
        }
    }
    state
}
