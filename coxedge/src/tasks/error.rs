use std::time::Duration;
use thiserror::Error;

use super::TaskId;
use crate::api::ApiError;

/// Terminal outcomes of submitting and awaiting a task, other than success
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task submission failed: {0}")]
    Submission(#[source] ApiError),

    #[error("task {task_id} failed: {message}")]
    Failed { task_id: TaskId, message: String },

    #[error("task {task_id} still not complete after {elapsed:?} ({attempts} status checks)")]
    Timeout {
        task_id: TaskId,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("status of task {task_id} unavailable after {errors} consecutive errors: {source}")]
    Unavailable {
        task_id: TaskId,
        errors: u32,
        #[source]
        source: ApiError,
    },

    #[error("task {task_id} not found")]
    NotFound { task_id: TaskId },

    #[error("status query for task {task_id} failed: {source}")]
    Query {
        task_id: TaskId,
        #[source]
        source: ApiError,
    },

    #[error("waiting for task {task_id} was cancelled")]
    Cancelled { task_id: TaskId },

    #[error("task id must not be empty")]
    EmptyTaskId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskErrorKind {
    Submission,
    RemoteFailure,
    Timeout,
    Unavailable,
    NotFound,
    Query,
    Cancelled,
    InvalidTaskId,
}

impl TaskError {
    pub fn kind(&self) -> TaskErrorKind {
        match self {
            TaskError::Submission(_) => TaskErrorKind::Submission,
            TaskError::Failed { .. } => TaskErrorKind::RemoteFailure,
            TaskError::Timeout { .. } => TaskErrorKind::Timeout,
            TaskError::Unavailable { .. } => TaskErrorKind::Unavailable,
            TaskError::NotFound { .. } => TaskErrorKind::NotFound,
            TaskError::Query { .. } => TaskErrorKind::Query,
            TaskError::Cancelled { .. } => TaskErrorKind::Cancelled,
            TaskError::EmptyTaskId => TaskErrorKind::InvalidTaskId,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == TaskErrorKind::Cancelled
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            TaskError::Failed { task_id, .. }
            | TaskError::Timeout { task_id, .. }
            | TaskError::Unavailable { task_id, .. }
            | TaskError::NotFound { task_id }
            | TaskError::Query { task_id, .. }
            | TaskError::Cancelled { task_id } => Some(task_id),
            TaskError::Submission(_) | TaskError::EmptyTaskId => None,
        }
    }
}
