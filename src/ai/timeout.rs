//! Request Timeouts
//!
//! Every completion call is bounded; there is no cancellation mid-flight, so
//! the timeout is the only way a hung backend call ends.

use std::future::Future;
use std::time::Duration;

use crate::constants::network as net_constants;
use crate::types::{LensError, Result};

/// Timeouts applied around backend traffic
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Upper bound on one completion call (default: 5 minutes)
    pub llm_request: Duration,
    /// TCP connect timeout for HTTP providers (default: 30 seconds)
    pub connection: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_request: Duration::from_secs(net_constants::DEFAULT_TIMEOUT_SECS),
            connection: Duration::from_secs(net_constants::CONNECTION_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    /// Request timeout from `llm.timeout_secs`
    pub fn from_secs(request_secs: u64) -> Self {
        Self {
            llm_request: Duration::from_secs(request_secs),
            ..Self::default()
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns [`LensError::Timeout`] if the operation doesn't complete within the
/// specified duration.
///
/// ```ignore
/// let response = with_timeout(
///     Duration::from_secs(30),
///     provider.generate(&prompt),
///     "Analyst completion"
/// ).await?;
/// ```
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(LensError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_config_defaults() {
        let config = TimeoutConfig::default();
        assert_eq!(config.llm_request.as_secs(), 300);
        assert_eq!(config.connection.as_secs(), 30);
    }

    #[test]
    fn test_timeout_config_from_secs() {
        let config = TimeoutConfig::from_secs(12);
        assert_eq!(config.llm_request, Duration::from_secs(12));
        assert_eq!(config.connection.as_secs(), 30);
    }

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, LensError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, LensError>(42)
            },
            "slow operation",
        )
        .await;
        assert!(matches!(result.unwrap_err(), LensError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_inner_error() {
        let result: Result<()> = with_timeout(
            Duration::from_secs(1),
            async { Err(LensError::LlmApi("boom".to_string())) },
            "failing operation",
        )
        .await;
        assert!(matches!(result.unwrap_err(), LensError::LlmApi(_)));
    }
}
