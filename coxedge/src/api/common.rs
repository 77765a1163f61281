//! Common types and utilities for the Cox Edge API

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub errors: Option<Vec<String>>,
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("API error details: errors={errors:?}, message={message:?}")]
pub struct ApiErrorDetails {
    pub errors: Option<Vec<String>>,
    pub message: Option<String>,
}

/// Percent-encode a single path segment.
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// A collection exposed under `/services/{environment}/{service}`.
pub trait EdgeServiceResource {
    fn service() -> &'static str;

    fn collection_path(environment: &str) -> String {
        format!("/services/{}/{}", encode_segment(environment), Self::service())
    }

    fn resource_path(environment: &str, id: &str) -> String {
        format!(
            "{}/{}",
            Self::collection_path(environment),
            encode_segment(id)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// `siteId` scoping shared by every per-site service call.
pub fn site_query(site_id: &str) -> String {
    ApiQueryParams::new().add("siteId", site_id).to_query_string()
}
