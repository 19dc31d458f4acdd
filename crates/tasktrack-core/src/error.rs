//! Errors raised at the task store boundary.

use std::fmt;

use tasktrack_shared::TaskId;

/// What went wrong talking to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Transport failure; no response was received.
    Network,
    /// The store answered with a non-2xx status not covered below.
    Http { status: u16 },
    /// The response body could not be decoded, or no valid request could
    /// be built.
    Malformed,
    /// A 2xx reply whose envelope reported `success: false`.
    Rejected,
    /// Rejected input. Raised client-side before any request is sent.
    Validation,
    NotFound,
    AlreadyCompleted,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreErrorKind::Network => f.write_str("network"),
            StoreErrorKind::Http { status } => write!(f, "http {status}"),
            StoreErrorKind::Malformed => f.write_str("malformed"),
            StoreErrorKind::Rejected => f.write_str("rejected"),
            StoreErrorKind::Validation => f.write_str("validation"),
            StoreErrorKind::NotFound => f.write_str("not found"),
            StoreErrorKind::AlreadyCompleted => f.write_str("already completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Network, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Malformed, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Validation, message)
    }

    pub fn not_found(id: TaskId) -> Self {
        Self::new(StoreErrorKind::NotFound, format!("Task {id} not found"))
    }

    pub fn already_completed(id: TaskId) -> Self {
        Self::new(
            StoreErrorKind::AlreadyCompleted,
            format!("Task {id} is already completed"),
        )
    }

    pub fn is_validation(&self) -> bool {
        self.kind == StoreErrorKind::Validation
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::malformed(format!("invalid response from store: {err}"))
        } else {
            StoreError::network(err.to_string())
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
