//! Datadog API client with authenticated requests and rate-limit-aware retry.

mod client;
mod retry;

pub use client::{DatadogClient, RequestOptions};
pub use retry::{ApiError, RetryPolicy, RATE_LIMIT_RESET_HEADER};
