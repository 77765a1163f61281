//! Firewall rule API implementation

use super::common::{site_query, EdgeServiceResource};
use super::{ApiError, Client};
use crate::tasks::{TaskError, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FirewallAction {
    Allow,
    Block,
}

impl FirewallAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirewallAction::Allow => "ALLOW",
            FirewallAction::Block => "BLOCK",
        }
    }
}

impl fmt::Display for FirewallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FirewallAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALLOW" => Ok(FirewallAction::Allow),
            "BLOCK" => Ok(FirewallAction::Block),
            other => Err(format!("{:?} is not one of ALLOW, BLOCK", other)),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Firewall rule as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRule {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<String>,
    pub site_id: String,
    pub action: FirewallAction,
    pub ip_start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_end: Option<String>,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Request body for creating and updating firewall rules
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRuleRequest {
    pub site_id: String,
    pub action: FirewallAction,
    pub ip_start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_end: Option<String>,
    pub name: String,
    pub enabled: bool,
}

impl EdgeServiceResource for FirewallRule {
    fn service() -> &'static str {
        "firewallrules"
    }
}

impl Client {
    /// GET /services/{environment}/firewallrules/{id}?siteId={site_id}
    pub async fn get_firewall_rule(
        &self,
        environment: &str,
        site_id: &str,
        id: &str,
    ) -> Result<FirewallRule, ApiError> {
        let path = format!(
            "{}{}",
            FirewallRule::resource_path(environment, id),
            site_query(site_id)
        );
        self.get(&path).await
    }

    /// POST /services/{environment}/firewallrules?siteId={site_id}
    pub async fn create_firewall_rule(
        &self,
        environment: &str,
        request: &FirewallRuleRequest,
    ) -> Result<TaskId, TaskError> {
        let path = format!(
            "{}{}",
            FirewallRule::collection_path(environment),
            site_query(&request.site_id)
        );
        self.submit_create(&path, request).await
    }

    /// PUT /services/{environment}/firewallrules/{id}?siteId={site_id}
    pub async fn update_firewall_rule(
        &self,
        environment: &str,
        id: &str,
        request: &FirewallRuleRequest,
    ) -> Result<TaskId, TaskError> {
        let path = format!(
            "{}{}",
            FirewallRule::resource_path(environment, id),
            site_query(&request.site_id)
        );
        self.submit_update(&path, request).await
    }

    /// DELETE /services/{environment}/firewallrules/{id}?siteId={site_id}
    pub async fn delete_firewall_rule(
        &self,
        environment: &str,
        site_id: &str,
        id: &str,
    ) -> Result<TaskId, TaskError> {
        let path = format!(
            "{}{}",
            FirewallRule::resource_path(environment, id),
            site_query(site_id)
        );
        self.submit_delete(&path).await
    }
}
