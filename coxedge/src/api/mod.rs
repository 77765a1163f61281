//! HTTP client and typed endpoints of the Cox Edge API

pub mod client;
pub mod common;
pub mod error;
pub mod firewall_rules;
pub mod scripts;

#[cfg(test)]
pub mod test_helpers;

pub use client::{Client, PoolConfig, RetryConfig, API_KEY_HEADER, DEFAULT_BASE_URL};
pub use common::{ApiErrorDetails, ApiQueryParams, ApiResponse, EdgeServiceResource};
pub use error::ApiError;
pub use firewall_rules::{FirewallAction, FirewallRule, FirewallRuleRequest};
pub use scripts::{Script, ScriptRequest};
