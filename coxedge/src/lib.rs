pub mod api;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod provider_data;
pub mod resources;
pub mod schema;
pub mod tasks;

pub use config::{ConfigError, ProviderConfig};
pub use context::Context;
pub use diagnostics::{Diagnostic, Severity};
pub use provider_data::ProviderData;

use resources::{FirewallRuleResource, ScriptResource};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider not configured")]
    NotConfigured,
}

pub struct CoxEdgeProvider {
    data: Option<ProviderData>,
}

impl Default for CoxEdgeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CoxEdgeProvider {
    pub fn new() -> Self {
        Self { data: None }
    }

    /// Configure from the provider attribute map, falling back to
    /// `COXEDGE_*` environment variables. Returns the problems found; on
    /// any error the provider stays unconfigured.
    pub fn configure(&mut self, attrs: &Map<String, Value>) -> Vec<Diagnostic> {
        let config = match ProviderConfig::from_attributes(attrs) {
            Ok(config) => config,
            Err(errors) => {
                return errors
                    .into_iter()
                    .map(|e| Diagnostic::error(e.to_string(), String::new()))
                    .collect();
            }
        };

        match config.build_client() {
            Ok(client) => {
                tracing::info!("Configured Cox Edge provider for {}", config.base_url);
                self.data = Some(ProviderData::new(client, config.await_config));
                Vec::new()
            }
            Err(e) => vec![Diagnostic::error(
                format!("Failed to create API client: {}", e),
                String::new(),
            )],
        }
    }

    pub fn is_configured(&self) -> bool {
        self.data.is_some()
    }

    pub fn provider_data(&self) -> Result<&ProviderData, ProviderError> {
        self.data.as_ref().ok_or(ProviderError::NotConfigured)
    }

    pub fn firewall_rules(&self) -> Result<FirewallRuleResource, ProviderError> {
        Ok(FirewallRuleResource::new(self.provider_data()?.clone()))
    }

    pub fn scripts(&self) -> Result<ScriptResource, ProviderError> {
        Ok(ScriptResource::new(self.provider_data()?.clone()))
    }

    pub fn resource_types(&self) -> Vec<&'static str> {
        schema::catalog().iter().map(|s| s.type_name).collect()
    }

    pub fn validate_resource_config(
        &self,
        type_name: &str,
        attrs: &Map<String, Value>,
    ) -> Vec<Diagnostic> {
        match schema::lookup(type_name) {
            Some(schema) => schema::validate(schema, attrs),
            None => vec![Diagnostic::error(
                "Unknown resource type",
                format!("{:?} is not a Cox Edge resource", type_name),
            )],
        }
    }
}
