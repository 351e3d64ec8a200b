//! Application error taxonomy and error helpers
//!
//! [`AppError`] is the error carried through client and dispatcher state. It is
//! `Clone` so it can sit inside published [`OperationState`](crate::dispatcher::OperationState)
//! snapshots. The helpers below cover the non-throwing call styles the UI layer
//! relies on: tuple results, bounded retry with backoff, and parsing of GraphQL
//! and HTTP error payloads.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

/// Message used when an error carries no usable text.
pub const DEFAULT_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Upper bound for a single retry wait.
const MAX_RETRY_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Application error with a machine-readable code and an HTTP-like status.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppError {
    /// Input failed validation (client- or server-side)
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<JsonValue>,
    },

    /// Transport failure or a 5xx response
    #[error("{message}")]
    Network {
        message: String,
        status_code: Option<u16>,
    },

    /// Caller is not authenticated
    #[error("{message}")]
    Auth { message: String },

    /// Caller is authenticated but not allowed
    #[error("{message}")]
    Authorization { message: String },

    /// Requested resource does not exist
    #[error("{message}")]
    NotFound {
        message: String,
        resource: Option<String>,
    },

    /// Any other failure
    #[error("{message}")]
    Generic {
        message: String,
        code: String,
        status_code: u16,
        details: Option<JsonValue>,
    },
}

impl AppError {
    pub fn new(message: impl Into<String>, code: impl Into<String>, status_code: u16) -> Self {
        Self::Generic {
            message: message.into(),
            code: code.into(),
            status_code,
            details: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status_code: None,
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource: None,
        }
    }

    /// Attach structured details. Only `Validation` and `Generic` carry them;
    /// other variants are returned unchanged.
    pub fn with_details(self, details: JsonValue) -> Self {
        match self {
            Self::Validation { message, .. } => Self::Validation {
                message,
                details: Some(details),
            },
            Self::Generic {
                message,
                code,
                status_code,
                ..
            } => Self::Generic {
                message,
                code,
                status_code,
                details: Some(details),
            },
            other => other,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::Network { message, .. }
            | Self::Auth { message }
            | Self::Authorization { message }
            | Self::NotFound { message, .. }
            | Self::Generic { message, .. } => message,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Network { .. } => "NETWORK_ERROR",
            Self::Auth { .. } => "AUTH_ERROR",
            Self::Authorization { .. } => "AUTHORIZATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Generic { code, .. } => code,
        }
    }

    /// HTTP-like status. `0` means the failure happened before any response.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Network { status_code, .. } => status_code.unwrap_or(0),
            Self::Auth { .. } => 401,
            Self::Authorization { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Generic { status_code, .. } => *status_code,
        }
    }

    pub fn details(&self) -> Option<&JsonValue> {
        match self {
            Self::Validation { details, .. } | Self::Generic { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { status_code, .. } => {
                matches!(status_code, None | Some(0) | Some(408) | Some(429) | Some(500..=599))
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::network("Request timed out");
        }
        match err.status() {
            Some(status) => parse_api_error(status.as_u16(), &err.to_string()),
            None => Self::network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(
            format!("Failed to decode response: {}", err),
            "DECODE_ERROR",
            500,
        )
    }
}

/// Serializable snapshot of an error for logging or display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    pub message: String,
    pub code: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

/// Turn any displayable error into a user-facing message.
pub fn format_error<E: fmt::Display + ?Sized>(error: &E) -> String {
    let message = error.to_string();
    let message = message.trim();
    if message.is_empty() {
        DEFAULT_ERROR_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}

pub fn get_error_details(error: &AppError) -> ErrorDetails {
    ErrorDetails {
        message: format_error(error),
        code: error.code().to_string(),
        status_code: error.status_code(),
        details: error.details().cloned(),
    }
}

/// Await a fallible future and return `(data, error)` instead of a `Result`.
pub async fn handle_async<T, E, Fut>(future: Fut) -> (Option<T>, Option<AppError>)
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<AppError>,
{
    match future.await {
        Ok(data) => (Some(data), None),
        Err(err) => (None, Some(err.into())),
    }
}

/// How the wait between attempts grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// `delay * k` after the k-th failure
    Linear,
    /// `delay * 2^k` after the k-th failure
    #[default]
    Exponential,
}

/// Callback invoked before each retry with the failed attempt number and its error.
pub type RetryCallback<E> = Arc<dyn Fn(u32, &E) + Send + Sync>;

/// Options for [`retry`].
pub struct RetryOptions<E> {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: BackoffStrategy,
    pub on_retry: Option<RetryCallback<E>>,
}

impl<E> Default for RetryOptions<E> {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
            backoff: BackoffStrategy::Exponential,
            on_retry: None,
        }
    }
}

impl<E> Clone for RetryOptions<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            delay: self.delay,
            backoff: self.backoff,
            on_retry: self.on_retry.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .field("backoff", &self.backoff)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "..."))
            .finish()
    }
}

impl<E> RetryOptions<E> {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            ..Default::default()
        }
    }

    pub fn linear(mut self) -> Self {
        self.backoff = BackoffStrategy::Linear;
        self
    }

    pub fn exponential(mut self) -> Self {
        self.backoff = BackoffStrategy::Exponential;
        self
    }

    pub fn on_retry(mut self, callback: impl Fn(u32, &E) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    fn to_backoff(&self) -> RetryBackoff {
        match self.backoff {
            BackoffStrategy::Linear => RetryBackoff::Linear {
                step: self.delay,
                failures: 0,
            },
            BackoffStrategy::Exponential => {
                let first = self.delay.saturating_mul(2).min(MAX_RETRY_INTERVAL);
                RetryBackoff::Exponential(ExponentialBackoff {
                    current_interval: first,
                    initial_interval: first,
                    randomization_factor: 0.0,
                    multiplier: 2.0,
                    max_interval: MAX_RETRY_INTERVAL,
                    max_elapsed_time: None,
                    ..Default::default()
                })
            }
        }
    }
}

enum RetryBackoff {
    Linear { step: Duration, failures: u32 },
    Exponential(ExponentialBackoff),
}

impl Backoff for RetryBackoff {
    fn reset(&mut self) {
        match self {
            Self::Linear { failures, .. } => *failures = 0,
            Self::Exponential(inner) => inner.reset(),
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        match self {
            Self::Linear { step, failures } => {
                *failures += 1;
                Some(step.saturating_mul(*failures).min(MAX_RETRY_INTERVAL))
            }
            Self::Exponential(inner) => inner.next_backoff(),
        }
    }
}

/// Run `operation` up to `max_attempts` times, sleeping between failures.
///
/// The last error is returned unchanged once attempts are exhausted. There is
/// no overall wall-clock bound beyond the attempt count.
pub async fn retry<T, E, Fut, F>(mut operation: F, options: &RetryOptions<E>) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let max_attempts = options.max_attempts.max(1);
    let mut backoff = options.to_backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_attempts {
                    warn!(attempts = attempt, error = %err, "Operation failed after max attempts");
                    return Err(err);
                }

                let Some(wait) = backoff.next_backoff() else {
                    return Err(err);
                };

                debug!(
                    attempt = attempt,
                    error = %err,
                    retry_in_ms = wait.as_millis() as u64,
                    "Operation failed, retrying"
                );
                if let Some(callback) = &options.on_retry {
                    callback(attempt, &err);
                }
                tokio::time::sleep(wait).await;
            }
        }
    }
}

/// One entry of a GraphQL response `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<JsonValue>,
}

impl GraphqlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            locations: None,
            extensions: None,
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.extensions = Some(serde_json::json!({ "code": code }));
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .and_then(|code| code.as_str())
    }
}

/// Map a GraphQL `errors` array to an [`AppError`], classified by the first
/// error's `extensions.code`. All messages are kept in `details`.
pub fn parse_graphql_error(errors: &[GraphqlError]) -> AppError {
    let Some(first) = errors.first() else {
        return AppError::new(DEFAULT_ERROR_MESSAGE, "GRAPHQL_ERROR", 500);
    };

    let message = first.message.clone();
    match first.code() {
        Some("UNAUTHENTICATED") => AppError::auth(message),
        Some("FORBIDDEN") => AppError::authorization(message),
        Some("NOT_FOUND") => AppError::not_found(message),
        Some("BAD_USER_INPUT") | Some("GRAPHQL_VALIDATION_FAILED") => {
            AppError::validation(message).with_details(errors_as_details(errors))
        }
        code => AppError::new(message, code.unwrap_or("GRAPHQL_ERROR"), 500)
            .with_details(errors_as_details(errors)),
    }
}

fn errors_as_details(errors: &[GraphqlError]) -> JsonValue {
    serde_json::to_value(errors).unwrap_or(JsonValue::Null)
}

/// Map an HTTP status and body to an [`AppError`].
///
/// A JSON body with a `message` or `error` string supplies the message;
/// otherwise the raw body (or a generic message) is used.
pub fn parse_api_error(status: u16, body: &str) -> AppError {
    let parsed: Option<JsonValue> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("error")))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| format!("Request failed with status {}", status));

    match status {
        400 | 422 => match parsed {
            Some(details) => AppError::validation(message).with_details(details),
            None => AppError::validation(message),
        },
        401 => AppError::auth(message),
        403 => AppError::authorization(message),
        404 => AppError::not_found(message),
        0 | 408 | 429 | 500..=599 => AppError::Network {
            message,
            status_code: Some(status),
        },
        _ => AppError::new(message, "API_ERROR", status),
    }
}

/// Parse JSON, falling back to `fallback` on any error.
pub fn safe_json_parse<T: DeserializeOwned>(input: &str, fallback: T) -> T {
    serde_json::from_str(input).unwrap_or(fallback)
}

/// Unwrap an option or fail with an [`AppError`].
pub fn assert_exists<T>(value: Option<T>, message: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::new(message, "ASSERTION_FAILED", 500))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use assert_matches::assert_matches;
    use parking_lot::Mutex;

    #[test]
    fn test_codes_and_status() {
        assert_eq!(AppError::validation("x").status_code(), 400);
        assert_eq!(AppError::auth("x").code(), "AUTH_ERROR");
        assert_eq!(AppError::authorization("x").status_code(), 403);
        assert_eq!(AppError::not_found("x").code(), "NOT_FOUND");
        assert_eq!(AppError::network("x").status_code(), 0);
        assert_eq!(AppError::new("x", "CUSTOM", 418).code(), "CUSTOM");
    }

    #[test]
    fn test_format_error_falls_back_on_empty_message() {
        assert_eq!(format_error(&AppError::validation("bad email")), "bad email");
        assert_eq!(format_error(&AppError::validation("  ")), DEFAULT_ERROR_MESSAGE);
    }

    #[test]
    fn test_error_details_serialize_camel_case() {
        let details = get_error_details(&AppError::not_found("no such product"));
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["statusCode"], 404);
        assert_eq!(json["code"], "NOT_FOUND");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_handle_async_tuple() {
        let (data, err) = tokio_test::block_on(handle_async(async { Ok::<_, AppError>(5) }));
        assert_eq!(data, Some(5));
        assert!(err.is_none());

        let (data, err) = tokio_test::block_on(handle_async(async {
            Err::<i32, _>(AppError::auth("login required"))
        }));
        assert!(data.is_none());
        assert_matches!(err, Some(AppError::Auth { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exponential_delays() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let start = tokio::time::Instant::now();
        let options = RetryOptions::new(3, Duration::from_millis(100)).exponential();

        let recorded = calls.clone();
        let result: Result<(), AppError> = retry(
            || {
                let recorded = recorded.clone();
                async move {
                    recorded.lock().push(start.elapsed());
                    Err(AppError::network("down"))
                }
            },
            &options,
        )
        .await;

        assert_eq!(result, Err(AppError::network("down")));
        let calls = calls.lock();
        assert_eq!(calls.len(), 3);
        let first_gap = calls[1] - calls[0];
        let second_gap = calls[2] - calls[1];
        assert!(first_gap >= Duration::from_millis(200) && first_gap < Duration::from_millis(210));
        assert!(second_gap >= Duration::from_millis(400) && second_gap < Duration::from_millis(410));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_linear_and_on_retry() {
        let seen = Arc::new(AtomicU32::new(0));
        let counter = seen.clone();
        let attempts = Arc::new(AtomicU32::new(0));
        let options = RetryOptions::new(4, Duration::from_millis(50))
            .linear()
            .on_retry(move |_, _: &String| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let a = attempts.clone();
        let start = tokio::time::Instant::now();
        let result = retry(
            || {
                let a = a.clone();
                async move {
                    let n = a.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 { Err(format!("fail {}", n)) } else { Ok(n) }
                }
            },
            &options,
        )
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        // 50ms + 100ms
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_retry_single_attempt_does_not_sleep() {
        let options = RetryOptions::new(1, Duration::from_secs(10));
        let result: Result<(), String> = retry(|| async { Err("nope".to_string()) }, &options).await;
        assert_eq!(result, Err("nope".to_string()));
    }

    #[test]
    fn test_parse_graphql_error_codes() {
        let errors = vec![GraphqlError::new("Not signed in").with_code("UNAUTHENTICATED")];
        assert_matches!(parse_graphql_error(&errors), AppError::Auth { .. });

        let errors = vec![GraphqlError::new("Bad input").with_code("BAD_USER_INPUT")];
        let err = parse_graphql_error(&errors);
        assert_matches!(err, AppError::Validation { .. });
        assert!(err.details().is_some());

        let errors = vec![GraphqlError::new("boom")];
        let err = parse_graphql_error(&errors);
        assert_eq!(err.code(), "GRAPHQL_ERROR");
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn test_parse_api_error_statuses() {
        assert_matches!(
            parse_api_error(401, r#"{"message":"expired"}"#),
            AppError::Auth { message } if message == "expired"
        );
        assert_matches!(parse_api_error(404, ""), AppError::NotFound { .. });
        assert_matches!(
            parse_api_error(503, "unavailable"),
            AppError::Network { status_code: Some(503), .. }
        );
        assert_eq!(parse_api_error(409, r#"{"error":"dup"}"#).code(), "API_ERROR");
        assert!(parse_api_error(502, "").is_transient());
    }

    #[test]
    fn test_safe_json_parse_and_assert_exists() {
        let parsed: Vec<i32> = safe_json_parse("[1,2]", vec![]);
        assert_eq!(parsed, vec![1, 2]);
        let fallback: Vec<i32> = safe_json_parse("{oops", vec![9]);
        assert_eq!(fallback, vec![9]);

        assert_eq!(assert_exists(Some(3), "missing"), Ok(3));
        let err = assert_exists::<i32>(None, "user missing").unwrap_err();
        assert_eq!(err.code(), "ASSERTION_FAILED");
    }
}
