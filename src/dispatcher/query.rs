//! Read handles: `find_many`, `find_unique`, `count`
//!
//! A handle is created with its arguments and executes on [`QueryHandle::run`].
//! Every state change is published on a `watch` channel so observers see the
//! same sequence a re-rendering component would.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use tokio::sync::watch;
use tracing::debug;

use crate::client::{FetchPolicy, GraphqlClient};
use crate::graphql::{ModelName, Operation, QueryArgs, SelectArgs, resolve_record_id};
use crate::util::errors::AppError;

use super::state::{ExecutionGate, LoadingGuard, OperationState, QueryOptions};

/// A read operation bound to a model and its variables.
pub struct QueryHandle<T> {
    client: GraphqlClient,
    operation: Operation,
    model: ModelName,
    variables: JsonValue,
    options: QueryOptions,
    missing_params: bool,
    state: watch::Sender<OperationState<T>>,
}

impl<T> QueryHandle<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        client: &GraphqlClient,
        operation: Operation,
        model: ModelName,
        input: JsonValue,
        options: QueryOptions,
    ) -> Self {
        let variables = operation.variables(&model, input);
        let (state, _) = watch::channel(OperationState::default());
        Self {
            client: client.clone(),
            operation,
            model,
            variables,
            options,
            missing_params: false,
            state,
        }
    }

    pub(crate) fn missing_params(mut self, missing: bool) -> Self {
        self.missing_params = missing;
        self
    }

    pub(crate) fn set_input(&mut self, input: JsonValue) {
        self.variables = self.operation.variables(&self.model, input);
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn model(&self) -> &ModelName {
        &self.model
    }

    pub fn variables(&self) -> &JsonValue {
        &self.variables
    }

    pub fn state(&self) -> OperationState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationState<T>> {
        self.state.subscribe()
    }

    /// Current gate, re-evaluated against the client's token.
    pub fn gate(&self) -> ExecutionGate {
        if self.missing_params && !self.options.skip {
            return ExecutionGate::SkippedMissingParams;
        }
        self.options.gate(&self.client)
    }

    /// Execute according to the fetch policy and return the final state.
    pub async fn run(&self) -> OperationState<T> {
        if let Some(skipped) = self.skip_if_gated() {
            return skipped;
        }

        let policy = self.options.fetch_policy;
        if policy.reads_cache() {
            let cached = self
                .client
                .cached(self.operation, Some(&self.model), &self.variables)
                .and_then(|value| serde_json::from_value::<T>(value).ok());

            match (policy, cached) {
                (FetchPolicy::CacheFirst | FetchPolicy::CacheOnly, Some(data)) => {
                    return self.publish(Some(data), false, None);
                }
                (FetchPolicy::CacheOnly, None) => return self.publish(None, false, None),
                (FetchPolicy::CacheAndNetwork, Some(data)) => {
                    debug!(model = %self.model, operation = %self.operation, "Serving cached result while refreshing");
                    self.publish(Some(data), true, None);
                }
                _ => {}
            }
        }

        self.fetch_network().await
    }

    /// Bypass the cache and fetch again. A gated handle stays skipped.
    pub async fn refetch(&self) -> Result<Option<T>, AppError> {
        if self.skip_if_gated().is_some() {
            return Ok(None);
        }
        let state = self.fetch_network().await;
        match state.error {
            Some(err) => Err(err),
            None => Ok(state.data),
        }
    }

    fn skip_if_gated(&self) -> Option<OperationState<T>> {
        let gate = self.gate();
        if gate.is_ready() {
            return None;
        }
        debug!(model = %self.model, operation = %self.operation, gate = ?gate, "Query skipped");
        let skipped = OperationState::skipped(gate);
        self.state.send_replace(skipped.clone());
        Some(skipped)
    }

    async fn fetch_network(&self) -> OperationState<T> {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
            s.gate = ExecutionGate::Ready;
        });
        let guard = LoadingGuard::new(&self.state, |s| s.loading = false);

        let result = self
            .client
            .execute(
                self.operation,
                Some(&self.model),
                self.variables.clone(),
                FetchPolicy::NetworkOnly,
            )
            .await
            .and_then(|value| serde_json::from_value::<T>(value).map_err(AppError::from));

        let next = match result {
            Ok(data) => self.publish(Some(data), false, None),
            Err(err) => {
                // stale data stays visible next to the error
                let stale = self.state.borrow().data.clone();
                self.publish(stale, false, Some(err))
            }
        };
        guard.disarm();
        next
    }

    fn publish(&self, data: Option<T>, loading: bool, error: Option<AppError>) -> OperationState<T> {
        let next = OperationState {
            data,
            loading,
            error,
            gate: ExecutionGate::Ready,
        };
        self.state.send_replace(next.clone());
        next
    }
}

/// Read many records of `model`.
pub fn find_many<T>(
    client: &GraphqlClient,
    model: impl Into<ModelName>,
    args: QueryArgs,
    options: QueryOptions,
) -> QueryHandle<Vec<T>>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    QueryHandle::new(client, Operation::FindMany, model.into(), args.to_input(), options)
}

/// Read one record by id. `id_or_where` is an id string or an object with
/// an `id` field; without one the handle is gated as missing params.
pub fn find_unique<T>(
    client: &GraphqlClient,
    model: impl Into<ModelName>,
    id_or_where: &JsonValue,
    select: SelectArgs,
    options: QueryOptions,
) -> QueryHandle<Option<T>>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let id = resolve_record_id(id_or_where);
    let mut input = Map::new();
    if let Some(id) = &id {
        input.insert("id".into(), JsonValue::String(id.clone()));
    }
    select.merge_into(&mut input);

    QueryHandle::new(
        client,
        Operation::FindUnique,
        model.into(),
        JsonValue::Object(input),
        options,
    )
    .missing_params(id.is_none())
}

/// Count records of `model` matching `filter`.
pub fn count(
    client: &GraphqlClient,
    model: impl Into<ModelName>,
    filter: Option<JsonValue>,
    options: QueryOptions,
) -> QueryHandle<i64> {
    let input = serde_json::json!({ "where": filter });
    QueryHandle::new(client, Operation::Count, model.into(), input, options)
}

