//! Resource implementations
//!
//! Every mutating lifecycle step follows the same shape: submit the request,
//! await the task it returns, then refresh state with exactly one read.

pub mod firewall_rule;
pub mod script;

pub use firewall_rule::{FirewallRuleConfig, FirewallRuleResource, FirewallRuleState};
pub use script::{ScriptConfig, ScriptResource, ScriptState};

use crate::api::ApiError;
use crate::context::Context;
use crate::diagnostics::{has_errors, Diagnostic};
use crate::provider_data::ProviderData;
use crate::schema;
use crate::tasks::{TaskError, TaskId, TaskResult};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use thiserror::Error;

/// RFC 850 layout used for `last_updated`
const LAST_UPDATED_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S UTC";

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("invalid {type_name} configuration: {}", first_problem(.diagnostics))]
    InvalidConfig {
        type_name: &'static str,
        diagnostics: Vec<Diagnostic>,
    },

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("API request failed: {0}")]
    Api(#[from] ApiError),

    #[error("task {task_id} completed without reporting a resource id")]
    MissingResourceId { task_id: TaskId },

    #[error("{type_name} {key} not found")]
    NotFound {
        type_name: &'static str,
        key: ResourceKey,
    },

    #[error("invalid import id {0:?}: expected <environment_name>:<site_id>:<id>")]
    InvalidImportId(String),

    #[error("operation cancelled")]
    Cancelled,
}

fn first_problem(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .find(|d| d.is_error())
        .map(|d| d.to_string())
        .unwrap_or_else(|| "no details".to_string())
}

impl ResourceError {
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            ResourceError::InvalidConfig { diagnostics, .. } => diagnostics.clone(),
            ResourceError::Task(e) => vec![Diagnostic::from(e)],
            ResourceError::Api(e) => vec![Diagnostic::error("API request failed", e.to_string())],
            ResourceError::MissingResourceId { .. } => {
                vec![Diagnostic::error("Missing resource id", self.to_string())]
            }
            ResourceError::NotFound { .. } => {
                vec![Diagnostic::error("Resource not found", self.to_string())]
            }
            ResourceError::InvalidImportId(_) => {
                vec![Diagnostic::error("Invalid import id", self.to_string())]
            }
            ResourceError::Cancelled => {
                vec![Diagnostic::error("Operation cancelled", self.to_string())]
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            ResourceError::Cancelled => true,
            ResourceError::Task(e) => e.is_cancelled(),
            _ => false,
        }
    }
}

/// Identity of a site-scoped resource; also its import id format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKey {
    pub environment_name: String,
    pub site_id: String,
    pub id: String,
}

impl ResourceKey {
    pub fn new(
        environment_name: impl Into<String>,
        site_id: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            environment_name: environment_name.into(),
            site_id: site_id.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.environment_name, self.site_id, self.id)
    }
}

impl FromStr for ResourceKey {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        match parts.as_slice() {
            [env, site, id] if !env.is_empty() && !site.is_empty() && !id.is_empty() => {
                Ok(ResourceKey::new(*env, *site, *id))
            }
            _ => Err(ResourceError::InvalidImportId(s.to_string())),
        }
    }
}

/// Validate `attrs` against the schema registered for `type_name`.
pub(crate) fn validate_attributes(
    type_name: &'static str,
    attrs: &Map<String, Value>,
) -> Result<(), ResourceError> {
    let diagnostics = match schema::lookup(type_name) {
        Some(schema) => schema::validate(schema, attrs),
        None => vec![Diagnostic::error(
            "Unknown resource type",
            format!("{:?} is not in the schema catalog", type_name),
        )],
    };

    if has_errors(&diagnostics) {
        return Err(ResourceError::InvalidConfig {
            type_name,
            diagnostics,
        });
    }
    Ok(())
}

pub(crate) fn string_attr(attrs: &Map<String, Value>, name: &str) -> Option<String> {
    attrs.get(name).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn string_list_attr(attrs: &Map<String, Value>, name: &str) -> Vec<String> {
    attrs
        .get(name)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn to_attributes<T: Serialize>(state: &T) -> Map<String, Value> {
    match serde_json::to_value(state) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

pub(crate) fn last_updated_now() -> String {
    chrono::Utc::now().format(LAST_UPDATED_FORMAT).to_string()
}

/// Submit through `submit`, then await the task it returns.
pub(crate) async fn submit_and_await<F>(
    data: &ProviderData,
    ctx: &Context,
    submit: F,
) -> Result<TaskResult, ResourceError>
where
    F: Future<Output = Result<TaskId, TaskError>>,
{
    if ctx.is_cancelled() {
        return Err(ResourceError::Cancelled);
    }

    let task_id = submit.await?;
    Ok(data.await_task(ctx, &task_id).await?)
}

/// Run a read, giving up as soon as `ctx` is done.
pub(crate) async fn cancellable<T, F>(ctx: &Context, request: F) -> Result<T, ResourceError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    if ctx.is_cancelled() {
        return Err(ResourceError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(ResourceError::Cancelled),
        result = request => result.map_err(ResourceError::from),
    }
}
