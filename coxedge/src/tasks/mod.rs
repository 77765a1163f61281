//! Asynchronous task handling
//!
//! Every mutating call against the edge API is accepted asynchronously: the
//! response carries a task id, and the outcome only becomes known by polling
//! `GET /tasks/{id}` until the task reaches a terminal state. [`submit`] covers
//! the first half, [`resolver`] the second.

pub mod error;
pub mod resolver;
pub mod submit;

pub use error::{TaskError, TaskErrorKind};
pub use resolver::{AwaitConfig, TaskResolver};
pub use submit::TaskHandle;

use crate::api::{ApiError, Client};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Opaque identifier the remote service assigns to a submitted task
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Status vocabulary reported by the task endpoint.
///
/// Anything outside the known set is kept verbatim and treated as still in
/// progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskState {
    Pending,
    Running,
    Success,
    Failed,
    Other(String),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failed)
    }
}

impl From<String> for TaskState {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "PENDING" => TaskState::Pending,
            "RUNNING" => TaskState::Running,
            "SUCCESS" => TaskState::Success,
            "FAILED" | "FAILURE" => TaskState::Failed,
            _ => TaskState::Other(value),
        }
    }
}

impl From<TaskState> for String {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Pending => "PENDING".to_string(),
            TaskState::Running => "RUNNING".to_string(),
            TaskState::Success => "SUCCESS".to_string(),
            TaskState::Failed => "FAILED".to_string(),
            TaskState::Other(value) => value,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

/// Body of `GET /tasks/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(alias = "taskId")]
    pub id: String,
    #[serde(alias = "taskStatus")]
    pub status: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Payload of a task that resolved successfully
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub data: Value,
}

impl TaskResult {
    /// Identifier of the resource the task created or touched, when reported.
    pub fn resource_id(&self) -> Option<&str> {
        self.data
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }
}

/// Read-only view of task status, the only thing the resolver needs.
#[async_trait]
pub trait TaskStatusSource: Send + Sync {
    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatus, ApiError>;
}

#[async_trait]
impl<T: TaskStatusSource + ?Sized> TaskStatusSource for Arc<T> {
    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatus, ApiError> {
        (**self).task_status(task_id).await
    }
}

#[async_trait]
impl TaskStatusSource for Client {
    /// GET /tasks/{id}, one attempt. The resolver counts transient errors.
    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatus, ApiError> {
        let path = format!(
            "/tasks/{}",
            crate::api::common::encode_segment(task_id.as_str())
        );
        self.get_raw_once(&path).await
    }
}
