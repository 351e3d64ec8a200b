//! GraphQL client handle
//!
//! One [`GraphqlClient`] is built at start-up and passed by reference (or
//! cheaply cloned) into every dispatcher call. It owns the transport, the auth
//! token store, the query cache and the invalidation channel.

pub mod auth;
pub mod cache;
pub mod transport;

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::graphql::pagination::DEFAULT_PAGE_SIZE;
use crate::graphql::{GraphqlRequest, ModelName, Operation, OperationKind};
use crate::util::errors::{AppError, parse_graphql_error};

pub use auth::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use cache::{CacheInvalidation, CacheKey, FetchPolicy, QueryCache};
pub use transport::{HttpTransport, RateLimitConfig, Transport};

/// Capacity of the invalidation broadcast channel.
const INVALIDATION_CAPACITY: usize = 256;

struct ClientInner {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
    cache: QueryCache,
    invalidations: broadcast::Sender<CacheInvalidation>,
    default_page_size: u32,
}

/// Shared handle to the unified GraphQL API.
#[derive(Clone)]
pub struct GraphqlClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for GraphqlClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphqlClient")
            .field("cached_entries", &self.inner.cache.len())
            .field("authenticated", &self.is_authenticated())
            .field("default_page_size", &self.inner.default_page_size)
            .finish()
    }
}

impl GraphqlClient {
    pub fn new(transport: Arc<dyn Transport>, tokens: Arc<dyn TokenStore>) -> Self {
        Self::with_page_size(transport, tokens, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenStore>,
        default_page_size: u32,
    ) -> Self {
        let (invalidations, _) = broadcast::channel(INVALIDATION_CAPACITY);
        Self {
            inner: Arc::new(ClientInner {
                transport,
                tokens,
                cache: QueryCache::new(),
                invalidations,
                default_page_size: default_page_size.max(1),
            }),
        }
    }

    /// Build an HTTP client from configuration. An `AUTH_TOKEN` in the
    /// environment wins over the stored token file.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        let transport = Arc::new(HttpTransport::from_config(config)?);
        let tokens: Arc<dyn TokenStore> = match &config.auth_token {
            Some(token) => Arc::new(MemoryTokenStore::new(Some(token.clone()))),
            None => Arc::new(FileTokenStore::new(config.token_path())),
        };
        info!(endpoint = %config.endpoint, "GraphQL client configured");
        Ok(Self::with_page_size(transport, tokens, config.default_page_size))
    }

    pub fn token(&self) -> Option<String> {
        self.inner.tokens.token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.tokens.has_token()
    }

    pub fn default_page_size(&self) -> u32 {
        self.inner.default_page_size
    }

    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    /// Cached result of a read, if any.
    pub fn cached(
        &self,
        operation: Operation,
        model: Option<&ModelName>,
        variables: &JsonValue,
    ) -> Option<JsonValue> {
        self.inner
            .cache
            .get(&CacheKey::new(operation, model, variables))
    }

    /// Execute an operation and return its root field.
    ///
    /// Query results are written to the cache unless the policy is
    /// `CacheOnly`. `CacheAndNetwork` behaves like `NetworkOnly` here; serving
    /// the cached value first is the caller's job (see [`Self::cached`]).
    pub async fn execute(
        &self,
        operation: Operation,
        model: Option<&ModelName>,
        variables: JsonValue,
        policy: FetchPolicy,
    ) -> Result<JsonValue, AppError> {
        let key = (operation.kind() == OperationKind::Query)
            .then(|| CacheKey::new(operation, model, &variables));

        if let Some(key) = &key {
            match policy {
                FetchPolicy::CacheFirst => {
                    if let Some(hit) = self.inner.cache.get(key) {
                        debug!(operation = %operation, "Cache hit");
                        return Ok(hit);
                    }
                }
                FetchPolicy::CacheOnly => {
                    return Ok(self.inner.cache.get(key).unwrap_or(JsonValue::Null));
                }
                FetchPolicy::CacheAndNetwork | FetchPolicy::NetworkOnly => {}
            }
        }

        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "graphql",
            operation = %operation,
            model = model.map(|m| m.as_str()).unwrap_or("-"),
            request_id = %request_id
        );
        let value = self.send(operation, variables).instrument(span).await?;

        if let Some(key) = key {
            self.inner.cache.put(key, value.clone());
        }
        Ok(value)
    }

    async fn send(&self, operation: Operation, variables: JsonValue) -> Result<JsonValue, AppError> {
        let request = GraphqlRequest {
            query: operation.document(),
            operation_name: operation.name(),
            variables,
        };
        let token = self.token();
        let response = self.inner.transport.send(&request, token.as_deref()).await?;

        if !response.errors.is_empty() {
            let err = parse_graphql_error(&response.errors);
            warn!(code = err.code(), error = %err, "GraphQL operation returned errors");
            return Err(err);
        }

        Ok(response
            .data
            .and_then(|mut data| data.get_mut(operation.root_field()).map(JsonValue::take))
            .unwrap_or(JsonValue::Null))
    }

    /// Subscribe to invalidation hints emitted after successful mutations.
    pub fn invalidations(&self) -> broadcast::Receiver<CacheInvalidation> {
        self.inner.invalidations.subscribe()
    }

    /// Publish an invalidation hint. Having no subscribers is not an error.
    pub fn emit_invalidation(&self, invalidation: CacheInvalidation) {
        debug!(
            model = %invalidation.model,
            operation = %invalidation.operation,
            "Emitting cache invalidation"
        );
        let _ = self.inner.invalidations.send(invalidation);
    }

    /// Evict the cache entries an invalidation refers to.
    pub fn apply_invalidation(&self, invalidation: &CacheInvalidation) -> usize {
        self.inner.cache.apply(invalidation)
    }

    /// Names of the models the server exposes.
    pub async fn available_models(&self) -> Result<Vec<String>, AppError> {
        let value = self
            .execute(
                Operation::GetAvailableModels,
                None,
                Operation::GetAvailableModels.variables(&ModelName::new(""), JsonValue::Null),
                FetchPolicy::NetworkOnly,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Ask the server to drop its cache. The local query cache is cleared too.
    pub async fn clear_server_cache(&self) -> Result<JsonValue, AppError> {
        let ack = self
            .execute(
                Operation::ClearCache,
                None,
                Operation::ClearCache.variables(&ModelName::new(""), JsonValue::Null),
                FetchPolicy::NetworkOnly,
            )
            .await?;
        self.inner.cache.clear();
        info!("Server and local query caches cleared");
        Ok(ack)
    }
}
