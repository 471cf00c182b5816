//! Retry policy, backoff computation, and error classification for API requests.

use std::time::Duration;

use serde::Deserialize;

/// Response header carrying the server's rate-limit reset hint, in seconds.
pub const RATE_LIMIT_RESET_HEADER: &str = "X-RateLimit-Reset";

/// Retry configuration, fixed for the lifetime of a client instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff delay for a zero-indexed attempt:
    /// `base_delay * 2^attempt`.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let multiplier = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(multiplier)
    }

    /// Delay before retrying a rate-limited request. Prefers the
    /// server-supplied reset hint over exponential backoff.
    pub fn rate_limit_delay(&self, attempt: usize, reset_secs: Option<u64>) -> Duration {
        match reset_secs {
            Some(secs) => Duration::from_secs(secs),
            None => self.backoff(attempt),
        }
    }
}

/// Error body shape the API returns on failure responses.
#[derive(Deserialize, Debug, Default)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Terminal API failure: a non-2xx response, or exhausted rate-limit retries.
/// Transport-level failures are never wrapped in this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    /// Server-reported error strings, in the order they were returned.
    pub errors: Vec<String>,
}

impl ApiError {
    /// Builds an error for a failure response. The message is the joined
    /// server-reported errors, or `HTTP <status>` when the body carried none.
    pub fn from_response(status: u16, errors: Vec<String>) -> Self {
        let message = if errors.is_empty() {
            format!("HTTP {}", status)
        } else {
            errors.join(", ")
        };
        Self {
            status,
            message,
            errors,
        }
    }

    /// Error raised once all rate-limit retries are exhausted.
    pub fn rate_limited() -> Self {
        Self {
            status: 429,
            message: "Rate limit exceeded".to_string(),
            errors: Vec::new(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (status {})", self.message, self.status)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff(2), Duration::from_millis(4000));
        assert_eq!(policy.backoff(3), Duration::from_millis(8000));
    }

    #[test]
    fn test_backoff_does_not_overflow_on_large_attempts() {
        let policy = RetryPolicy {
            max_retries: 100,
            base_delay: Duration::from_secs(u64::MAX / 2),
        };
        // Saturates instead of panicking
        let _ = policy.backoff(100);
    }

    #[test]
    fn test_rate_limit_delay_prefers_reset_hint() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.rate_limit_delay(3, Some(2)),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_rate_limit_delay_falls_back_to_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.rate_limit_delay(1, None), Duration::from_millis(2000));
    }

    #[test]
    fn test_api_error_joins_server_errors() {
        let err = ApiError::from_response(
            403,
            vec!["Forbidden".to_string(), "Bad key".to_string()],
        );
        assert_eq!(err.status, 403);
        assert_eq!(err.message, "Forbidden, Bad key");
        assert_eq!(err.errors.len(), 2);
    }

    #[test]
    fn test_api_error_without_server_errors_uses_status() {
        let err = ApiError::from_response(502, Vec::new());
        assert_eq!(err.message, "HTTP 502");
        assert!(err.errors.is_empty());
    }

    #[test]
    fn test_api_error_rate_limited() {
        let err = ApiError::rate_limited();
        assert_eq!(err.status, 429);
        assert_eq!(err.message, "Rate limit exceeded");
    }

    #[test]
    fn test_api_error_display_includes_status() {
        let err = ApiError::from_response(404, vec!["Not found".to_string()]);
        assert_eq!(err.to_string(), "Not found (status 404)");
    }

    #[test]
    fn test_error_body_defaults_to_empty_list() {
        let body: ApiErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.errors.is_empty());

        let body: ApiErrorBody =
            serde_json::from_str(r#"{"errors": ["a", "b"]}"#).unwrap();
        assert_eq!(body.errors, vec!["a", "b"]);
    }
}
