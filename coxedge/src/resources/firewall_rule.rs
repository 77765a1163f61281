//! Firewall rule resource

use super::{
    cancellable, last_updated_now, string_attr, submit_and_await, to_attributes,
    validate_attributes, ResourceError, ResourceKey,
};
use crate::api::{FirewallAction, FirewallRule, FirewallRuleRequest};
use crate::context::Context;
use crate::diagnostics::Diagnostic;
use crate::provider_data::ProviderData;
use crate::schema::FIREWALL_RULE;
use crate::tasks::TaskError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Validated firewall rule configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FirewallRuleConfig {
    pub environment_name: String,
    pub site_id: String,
    pub name: String,
    pub action: FirewallAction,
    pub ip_start: String,
    pub ip_end: Option<String>,
    pub enabled: bool,
}

impl FirewallRuleConfig {
    pub fn from_attributes(attrs: &Map<String, Value>) -> Result<Self, ResourceError> {
        validate_attributes(FIREWALL_RULE, attrs)?;

        let action = string_attr(attrs, "action")
            .unwrap_or_default()
            .parse::<FirewallAction>()
            .map_err(|e| ResourceError::InvalidConfig {
                type_name: FIREWALL_RULE,
                diagnostics: vec![Diagnostic::error("wrong value", e).with_attribute("action")],
            })?;

        Ok(Self {
            environment_name: string_attr(attrs, "environment_name").unwrap_or_default(),
            site_id: string_attr(attrs, "site_id").unwrap_or_default(),
            name: string_attr(attrs, "name").unwrap_or_default(),
            action,
            ip_start: string_attr(attrs, "ip_start").unwrap_or_default(),
            ip_end: string_attr(attrs, "ip_end"),
            enabled: attrs
                .get("enabled")
                .and_then(Value::as_bool)
                .unwrap_or(true),
        })
    }

    fn request(&self) -> FirewallRuleRequest {
        FirewallRuleRequest {
            site_id: self.site_id.clone(),
            action: self.action,
            ip_start: self.ip_start.clone(),
            ip_end: self.ip_end.clone(),
            name: self.name.clone(),
            enabled: self.enabled,
        }
    }
}

/// Firewall rule state as recorded after each lifecycle step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallRuleState {
    pub id: String,
    pub environment_name: String,
    pub site_id: String,
    pub stack_id: Option<String>,
    pub name: String,
    pub action: FirewallAction,
    pub ip_start: String,
    pub ip_end: Option<String>,
    pub enabled: bool,
    pub last_updated: Option<String>,
}

impl FirewallRuleState {
    fn from_rule(environment_name: &str, rule: FirewallRule) -> Self {
        Self {
            id: rule.id,
            environment_name: environment_name.to_string(),
            site_id: rule.site_id,
            stack_id: rule.stack_id,
            name: rule.name,
            action: rule.action,
            ip_start: rule.ip_start,
            ip_end: rule.ip_end,
            enabled: rule.enabled,
            last_updated: None,
        }
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.environment_name, &self.site_id, &self.id)
    }

    pub fn to_attributes(&self) -> Map<String, Value> {
        to_attributes(self)
    }
}

pub struct FirewallRuleResource {
    data: ProviderData,
}

impl FirewallRuleResource {
    pub fn new(data: ProviderData) -> Self {
        Self { data }
    }

    pub fn type_name(&self) -> &'static str {
        FIREWALL_RULE
    }

    pub async fn create(
        &self,
        ctx: &Context,
        config: &FirewallRuleConfig,
    ) -> Result<FirewallRuleState, ResourceError> {
        let request = config.request();
        let result = submit_and_await(
            &self.data,
            ctx,
            self.data
                .client
                .create_firewall_rule(&config.environment_name, &request),
        )
        .await?;

        let id = result
            .resource_id()
            .ok_or_else(|| ResourceError::MissingResourceId {
                task_id: result.task_id.clone(),
            })?;
        tracing::info!("Created firewall rule {} in site {}", id, config.site_id);

        let key = ResourceKey::new(&config.environment_name, &config.site_id, id);
        let state = self.read(ctx, &key).await?;
        state.ok_or(ResourceError::NotFound {
            type_name: FIREWALL_RULE,
            key,
        })
    }

    /// `Ok(None)` when the rule no longer exists.
    pub async fn read(
        &self,
        ctx: &Context,
        key: &ResourceKey,
    ) -> Result<Option<FirewallRuleState>, ResourceError> {
        let fetched = cancellable(
            ctx,
            self.data
                .client
                .get_firewall_rule(&key.environment_name, &key.site_id, &key.id),
        )
        .await;

        match fetched {
            Ok(rule) => Ok(Some(FirewallRuleState::from_rule(&key.environment_name, rule))),
            Err(ResourceError::Api(e)) if e.is_not_found() => {
                tracing::warn!("Firewall rule {} is gone", key);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn update(
        &self,
        ctx: &Context,
        id: &str,
        config: &FirewallRuleConfig,
    ) -> Result<FirewallRuleState, ResourceError> {
        let request = config.request();
        submit_and_await(
            &self.data,
            ctx,
            self.data
                .client
                .update_firewall_rule(&config.environment_name, id, &request),
        )
        .await?;
        tracing::info!("Updated firewall rule {} in site {}", id, config.site_id);

        let key = ResourceKey::new(&config.environment_name, &config.site_id, id);
        let state = self.read(ctx, &key).await?;
        let mut state = state.ok_or(ResourceError::NotFound {
            type_name: FIREWALL_RULE,
            key,
        })?;
        state.last_updated = Some(last_updated_now());
        Ok(state)
    }

    pub async fn delete(&self, ctx: &Context, key: &ResourceKey) -> Result<(), ResourceError> {
        let deleted = submit_and_await(
            &self.data,
            ctx,
            self.data
                .client
                .delete_firewall_rule(&key.environment_name, &key.site_id, &key.id),
        )
        .await;

        match deleted {
            Ok(_) => {
                tracing::info!("Deleted firewall rule {}", key);
                Ok(())
            }
            Err(ResourceError::Task(TaskError::Submission(e))) if e.is_not_found() => {
                tracing::warn!("Firewall rule {} was already deleted", key);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Import from `<environment_name>:<site_id>:<id>`.
    pub async fn import(
        &self,
        ctx: &Context,
        import_id: &str,
    ) -> Result<FirewallRuleState, ResourceError> {
        let key: ResourceKey = import_id.parse()?;
        let state = self.read(ctx, &key).await?;
        state.ok_or(ResourceError::NotFound {
            type_name: FIREWALL_RULE,
            key,
        })
    }
}
