//! User-facing diagnostics reported by validation and lifecycle operations

use crate::tasks::TaskError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    /// Dotted attribute path, e.g. `owasp_threats.sql_injection`
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: impl Into<String>) -> Self {
        self.attribute = Some(path.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.summary)?;
        if let Some(attribute) = &self.attribute {
            write!(f, " ({})", attribute)?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

impl From<&TaskError> for Diagnostic {
    fn from(err: &TaskError) -> Self {
        let summary = match err {
            TaskError::Submission(_) => "Request rejected",
            TaskError::Failed { .. } => "Remote task failed",
            TaskError::Timeout { .. } => "Timed out waiting for task",
            TaskError::Unavailable { .. } => "Task status unavailable",
            TaskError::NotFound { .. } => "Task not found",
            TaskError::Query { .. } => "Task status query failed",
            TaskError::Cancelled { .. } => "Operation cancelled",
            TaskError::EmptyTaskId => "Invalid task id",
        };
        Diagnostic::error(summary, err.to_string())
    }
}

impl From<TaskError> for Diagnostic {
    fn from(err: TaskError) -> Self {
        Diagnostic::from(&err)
    }
}
