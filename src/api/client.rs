//! Authenticated HTTP client for the Datadog API.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;

use super::retry::{ApiError, ApiErrorBody, RATE_LIMIT_RESET_HEADER, RetryPolicy};

const API_KEY_HEADER: &str = "dd-api-key";
const APP_KEY_HEADER: &str = "dd-application-key";

/// Options for a single API request.
#[derive(Debug, Default)]
pub struct RequestOptions {
    /// JSON body; the request carries no body at all when `None`.
    pub body: Option<Value>,
    /// Query parameters; entries with a `None` value are omitted entirely.
    pub params: Vec<(String, Option<String>)>,
    /// Extra headers; these win over the defaults on name collision.
    pub headers: Vec<(String, String)>,
}

#[derive(Deserialize, Debug)]
struct ValidateResponse {
    #[serde(default)]
    valid: bool,
}

/// Datadog API client. Credentials, site, and retry policy are fixed at
/// construction; concurrent calls share no mutable state.
#[derive(Clone)]
pub struct DatadogClient {
    client: Client,
    base_url: String,
    api_key: String,
    app_key: String,
    policy: RetryPolicy,
}

impl DatadogClient {
    /// Creates a client for the configured site with the default retry policy.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_policy(config, RetryPolicy::default())
    }

    /// Creates a client with an explicit retry policy.
    pub fn with_policy(config: &Config, policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .user_agent("dog-cli")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.site.base_url(),
            api_key: config.api_key.clone(),
            app_key: config.app_key.clone(),
            policy,
        })
    }

    /// Replaces the site-derived base URL (`--api-url`, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues a request and decodes the JSON response, retrying rate limits
    /// and transport failures with exponential backoff. All verb helpers
    /// funnel through here.
    #[tracing::instrument(skip(self, options))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let url = self.build_url(path, &options.params)?;
        let headers = self.build_headers(&options.headers)?;

        let mut last_error: Option<anyhow::Error> = None;

        for attempt in 0..=self.policy.max_retries {
            debug!(
                "{} {} (attempt {}/{})",
                method,
                url,
                attempt + 1,
                self.policy.max_retries + 1
            );

            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .headers(headers.clone());
            if let Some(body) = &options.body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(err) => {
                    if attempt < self.policy.max_retries {
                        let delay = self.policy.backoff(attempt);
                        warn!(
                            "{} {} failed ({}), retrying in {:?}...",
                            method, url, err, delay
                        );
                        last_error = Some(err.into());
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    // Out of attempts: surface the transport error itself
                    return Err(anyhow::Error::from(err).context("Failed to send request"));
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt < self.policy.max_retries {
                    let reset = response
                        .headers()
                        .get(RATE_LIMIT_RESET_HEADER)
                        .and_then(|value| value.to_str().ok())
                        .and_then(|value| value.parse::<u64>().ok());
                    let delay = self.policy.rate_limit_delay(attempt, reset);
                    warn!("{} {} rate limited, retrying in {:?}...", method, url, delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(ApiError::rate_limited().into());
            }

            // Non-2xx, non-429 responses are terminal on the first attempt
            if !status.is_success() {
                let errors = response
                    .json::<ApiErrorBody>()
                    .await
                    .map(|body| body.errors)
                    .unwrap_or_default();
                return Err(ApiError::from_response(status.as_u16(), errors).into());
            }

            if status == StatusCode::NO_CONTENT {
                let empty = serde_json::from_value(Value::Object(serde_json::Map::new()))
                    .context("Failed to decode empty response")?;
                return Ok(empty);
            }

            match response.json::<T>().await {
                Ok(payload) => return Ok(payload),
                Err(err) => {
                    // An unreadable success body follows the transport-retry path
                    if attempt < self.policy.max_retries {
                        let delay = self.policy.backoff(attempt);
                        warn!(
                            "{} {} returned an unreadable body ({}), retrying in {:?}...",
                            method, url, err, delay
                        );
                        last_error =
                            Some(anyhow::Error::from(err).context("Failed to parse JSON response"));
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(anyhow::Error::from(err).context("Failed to parse JSON response"));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
    }

    /// GET request helper.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, Option<&str>)],
    ) -> Result<T> {
        self.request(
            Method::GET,
            path,
            RequestOptions {
                params: owned_params(params),
                ..Default::default()
            },
        )
        .await
    }

    /// POST request helper.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
        params: &[(&str, Option<&str>)],
    ) -> Result<T> {
        self.request(
            Method::POST,
            path,
            RequestOptions {
                body,
                params: owned_params(params),
                ..Default::default()
            },
        )
        .await
    }

    /// PUT request helper.
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
        params: &[(&str, Option<&str>)],
    ) -> Result<T> {
        self.request(
            Method::PUT,
            path,
            RequestOptions {
                body,
                params: owned_params(params),
                ..Default::default()
            },
        )
        .await
    }

    /// PATCH request helper.
    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
        params: &[(&str, Option<&str>)],
    ) -> Result<T> {
        self.request(
            Method::PATCH,
            path,
            RequestOptions {
                body,
                params: owned_params(params),
                ..Default::default()
            },
        )
        .await
    }

    /// DELETE request helper.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, Option<&str>)],
    ) -> Result<T> {
        self.request(
            Method::DELETE,
            path,
            RequestOptions {
                params: owned_params(params),
                ..Default::default()
            },
        )
        .await
    }

    /// Checks whether the configured credentials are valid. Any failure, of
    /// any kind, reports invalid rather than propagating; the cause is logged
    /// at debug level.
    #[tracing::instrument(skip(self))]
    pub async fn validate(&self) -> bool {
        match self.get::<ValidateResponse>("/api/v1/validate", &[]).await {
            Ok(response) => response.valid,
            Err(err) => {
                debug!("Credential validation failed: {:#}", err);
                false
            }
        }
    }

    fn build_url(&self, path: &str, params: &[(String, Option<String>)]) -> Result<Url> {
        let base = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base URL: {}", self.base_url))?;
        let mut url = base
            .join(path)
            .with_context(|| format!("Invalid request path: {}", path))?;

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                if let Some(value) = value {
                    pairs.append_pair(key, value);
                }
            }
        }
        // `query_pairs_mut` leaves an empty query (a bare trailing `?`) when
        // nothing was appended; drop it so the path is emitted unchanged.
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }

    fn build_headers(&self, extra: &[(String, String)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        let mut api_key = HeaderValue::from_str(&self.api_key)
            .context("API key is not a valid header value")?;
        api_key.set_sensitive(true);
        headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key);

        let mut app_key = HeaderValue::from_str(&self.app_key)
            .context("Application key is not a valid header value")?;
        app_key.set_sensitive(true);
        headers.insert(HeaderName::from_static(APP_KEY_HEADER), app_key);

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in extra {
            let header_name: HeaderName = name
                .parse()
                .with_context(|| format!("Invalid header name: {}", name))?;
            let header_value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header {}", name))?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

fn owned_params(params: &[(&str, Option<&str>)]) -> Vec<(String, Option<String>)> {
    params
        .iter()
        .map(|(key, value)| (key.to_string(), value.map(str::to_string)))
        .collect()
}
