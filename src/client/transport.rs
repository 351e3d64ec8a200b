//! HTTP transport for GraphQL requests
//!
//! [`HttpTransport`] posts each request to the configured endpoint behind a
//! rate limiter so a busy admin screen cannot flood the API.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::graphql::{GraphqlRequest, GraphqlResponse};
use crate::util::errors::{AppError, parse_api_error};

use super::auth::bearer;

/// Sends GraphQL requests. Implemented over HTTP here; tests and embedders
/// can supply their own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &GraphqlRequest,
        token: Option<&str>,
    ) -> Result<GraphqlResponse, AppError>;
}

/// Configuration for rate limiting
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub requests_per_second: u32,
    /// Burst capacity (allows short bursts above the rate)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 20,
        }
    }
}

/// A rate-limited GraphQL-over-HTTP transport
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, client: Client, rate: RateLimitConfig) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(rate.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(rate.burst_size).unwrap_or(NonZeroU32::MIN));

        Self {
            client,
            endpoint: endpoint.into(),
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Build a transport from client configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::new(
            config.endpoint.clone(),
            client,
            RateLimitConfig {
                requests_per_second: config.requests_per_second,
                burst_size: config.request_burst,
            },
        ))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Wait for a rate limit permit
    async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &GraphqlRequest,
        token: Option<&str>,
    ) -> Result<GraphqlResponse, AppError> {
        self.wait_for_permit().await;
        debug!(
            endpoint = %self.endpoint,
            operation = request.operation_name,
            authenticated = token.is_some(),
            "Sending GraphQL request"
        );

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(request);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, bearer(token));
        }

        let response = builder.send().await?;
        let status = response.status();

        // GraphQL servers may answer errors with a non-2xx status and a
        // regular `{ errors }` body, so try the envelope first.
        let body = response.text().await?;
        match serde_json::from_str::<GraphqlResponse>(&body) {
            Ok(parsed) if status.is_success() || !parsed.errors.is_empty() => Ok(parsed),
            Err(e) if status.is_success() => Err(e.into()),
            _ => {
                warn!(
                    endpoint = %self.endpoint,
                    operation = request.operation_name,
                    status = %status,
                    "GraphQL request failed"
                );
                Err(parse_api_error(status.as_u16(), &body))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::Operation;
    use assert_matches::assert_matches;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Serves one canned response per connection and hands back the raw
    /// requests it received.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/graphql", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                seen.push(read_request(&mut stream).await);
                let reply = format!(
                    "HTTP/1.1 {} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(reply.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
            seen
        });
        (endpoint, server)
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(split) = text.find("\r\n\r\n") {
                let length = text[..split]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= split + 4 + length {
                    return text;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn transport(endpoint: String) -> HttpTransport {
        let client = Client::builder().no_proxy().build().unwrap();
        HttpTransport::new(endpoint, client, RateLimitConfig::default())
    }

    fn count_request() -> GraphqlRequest {
        GraphqlRequest {
            query: Operation::Count.document(),
            operation_name: Operation::Count.name(),
            variables: json!({ "model": "User" }),
        }
    }

    #[test]
    fn test_rate_limit_config_default() {
        let config = RateLimitConfig::default();
        assert_eq!(config.requests_per_second, 10);
        assert_eq!(config.burst_size, 20);
    }

    #[test]
    fn test_from_config_keeps_endpoint() {
        let config = ClientConfig {
            endpoint: "https://api.shop.example/graphql".into(),
            ..Default::default()
        };
        let transport = HttpTransport::from_config(&config).unwrap();
        assert_eq!(transport.endpoint(), "https://api.shop.example/graphql");
    }

    #[tokio::test]
    async fn test_bearer_header_only_with_token() {
        let ok = r#"{"data":{"count":3}}"#;
        let (endpoint, server) = serve(vec![(200, ok), (200, ok)]).await;
        let transport = transport(endpoint);

        let with_token = transport.send(&count_request(), Some("abc123")).await.unwrap();
        assert_eq!(with_token.data, Some(json!({ "count": 3 })));
        transport.send(&count_request(), None).await.unwrap();

        let seen = server.await.unwrap();
        let first = seen[0].to_lowercase();
        assert!(first.starts_with("post /graphql"));
        assert!(first.contains("authorization: bearer abc123"));
        assert!(seen[0].contains(r#""operationName":"Count""#));
        assert!(!seen[1].to_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_error_status_with_graphql_body_is_parsed() {
        let body = r#"{"errors":[{"message":"Unknown model Usr","extensions":{"code":"BAD_USER_INPUT"}}]}"#;
        let (endpoint, server) = serve(vec![(400, body)]).await;

        let response = transport(endpoint).send(&count_request(), None).await.unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "Unknown model Usr");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_without_envelope_uses_api_error() {
        let (endpoint, server) = serve(vec![(503, "upstream unavailable"), (404, r#"{"message":"no route"}"#)]).await;
        let transport = transport(endpoint);

        let err = transport.send(&count_request(), None).await.unwrap_err();
        assert_matches!(
            err,
            AppError::Network { ref message, status_code: Some(503) } if message == "upstream unavailable"
        );

        let err = transport.send(&count_request(), None).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "no route");
        server.await.unwrap();
    }
}
