//! Test helpers for the Cox Edge API

pub const TEST_API_KEY: &str = "test-api-key";

/// Client with near-instant retries so failure paths stay fast.
pub fn create_test_client(url: &str) -> super::Client {
    let retry = super::RetryConfig {
        max_retries: 1,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        timeout_seconds: 5,
    };
    super::Client::with_config(url, TEST_API_KEY, true, retry).unwrap()
}

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_pool_config() {
        let config = PoolConfig::default();
        assert_eq!(config.max_idle_connections, 10);
        assert_eq!(config.idle_timeout.as_secs(), 90);
        assert_eq!(config.connection_timeout.as_secs(), 10);
        assert_eq!(config.tcp_keepalive.unwrap().as_secs(), 30);
    }

    #[test]
    fn test_api_error_formatting() {
        let details = common::ApiErrorDetails {
            errors: Some(vec!["general error".to_string()]),
            message: None,
        };

        let error = ApiError::ApiError {
            status: 400,
            message: "Bad Request".to_string(),
            details: Some(Box::new(details)),
        };

        let error_str = error.to_string();
        assert!(error_str.contains("HTTP 400"));
        assert!(error_str.contains("Bad Request"));
    }
}
