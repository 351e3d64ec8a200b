//! Write handles: `create_one`, `update_one`, `delete_one`
//!
//! Every handle walks `Idle -> Loading -> Success | Error` per call and goes
//! back to `Loading` on the next one. A call dropped mid-flight returns the
//! handle to `Idle`. Nothing is retried automatically. A
//! successful write emits one [`CacheInvalidation`] on the client; cache
//! eviction is left to whoever listens.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::client::{CacheInvalidation, FetchPolicy, GraphqlClient};
use crate::graphql::{ModelName, Operation, SelectArgs, resolve_record_id};
use crate::util::errors::AppError;

use super::CrudError;
use super::state::{LoadingGuard, MutationState, MutationStatus};

/// Counts a mutation as in flight for as long as it lives.
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A write operation bound to a model.
pub struct MutationHandle<T> {
    client: GraphqlClient,
    operation: Operation,
    model: ModelName,
    refetch: Vec<Operation>,
    in_flight: Option<Arc<AtomicUsize>>,
    state: watch::Sender<MutationState<T>>,
}

impl<T> MutationHandle<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(client: &GraphqlClient, operation: Operation, model: impl Into<ModelName>) -> Self {
        let (state, _) = watch::channel(MutationState::default());
        Self {
            client: client.clone(),
            operation,
            model: model.into(),
            refetch: CacheInvalidation::DEFAULT_REFETCH.to_vec(),
            in_flight: None,
            state,
        }
    }

    /// Reads named in the invalidation emitted after success.
    pub fn with_refetch(mut self, refetch: Vec<Operation>) -> Self {
        self.refetch = refetch;
        self
    }

    pub(crate) fn with_in_flight(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.in_flight = Some(counter);
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn model(&self) -> &ModelName {
        &self.model
    }

    pub fn state(&self) -> MutationState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationState<T>> {
        self.state.subscribe()
    }

    pub fn reset(&self) {
        self.state.send_replace(MutationState::default());
    }

    /// Send the mutation with `input` as its operation-specific payload.
    pub async fn run(&self, input: JsonValue) -> Result<T, CrudError> {
        let _guard = self.in_flight.as_ref().map(InFlightGuard::enter);
        self.state.send_replace(MutationState {
            status: MutationStatus::Loading,
            data: None,
            error: None,
        });
        let guard = LoadingGuard::new(&self.state, |s| *s = MutationState::default());

        let variables = self.operation.variables(&self.model, input);
        let result = self
            .client
            .execute(self.operation, Some(&self.model), variables, FetchPolicy::NetworkOnly)
            .await
            .and_then(|value| serde_json::from_value::<T>(value).map_err(AppError::from));

        guard.disarm();
        match result {
            Ok(data) => {
                debug!(model = %self.model, operation = %self.operation, "Mutation succeeded");
                self.state.send_replace(MutationState {
                    status: MutationStatus::Success,
                    data: Some(data.clone()),
                    error: None,
                });
                let mut invalidation = CacheInvalidation::new(self.model.clone(), self.operation);
                invalidation.refetch = self.refetch.clone();
                self.client.emit_invalidation(invalidation);
                Ok(data)
            }
            Err(err) => {
                warn!(model = %self.model, operation = %self.operation, error = %err, "Mutation failed");
                let err = CrudError::from(err);
                self.state.send_replace(MutationState {
                    status: MutationStatus::Error,
                    data: None,
                    error: Some(err.clone()),
                });
                Err(err)
            }
        }
    }

    fn require_id(&self, target: &JsonValue) -> Result<String, CrudError> {
        resolve_record_id(target).ok_or_else(|| CrudError::MissingId {
            operation: self.operation,
            model: self.model.clone(),
        })
    }
}

macro_rules! delegate_handle {
    ($name:ident) => {
        impl<T> $name<T>
        where
            T: DeserializeOwned + Clone + Send + Sync + 'static,
        {
            pub fn with_refetch(self, refetch: Vec<Operation>) -> Self {
                Self(self.0.with_refetch(refetch))
            }

            pub fn handle(&self) -> &MutationHandle<T> {
                &self.0
            }

            pub fn state(&self) -> MutationState<T> {
                self.0.state()
            }

            pub fn subscribe(&self) -> watch::Receiver<MutationState<T>> {
                self.0.subscribe()
            }

            pub fn reset(&self) {
                self.0.reset()
            }
        }
    };
}

/// Create one record.
pub struct CreateOne<T>(MutationHandle<T>);

/// Update one record identified by id.
pub struct UpdateOne<T>(MutationHandle<T>);

/// Delete one record identified by id.
pub struct DeleteOne<T>(MutationHandle<T>);

delegate_handle!(CreateOne);
delegate_handle!(UpdateOne);
delegate_handle!(DeleteOne);

impl<T> CreateOne<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub(crate) fn from_handle(handle: MutationHandle<T>) -> Self {
        Self(handle)
    }

    pub async fn execute(&self, data: JsonValue, select: SelectArgs) -> Result<T, CrudError> {
        let mut input = Map::new();
        input.insert("data".into(), data);
        select.merge_into(&mut input);
        self.0.run(JsonValue::Object(input)).await
    }
}

impl<T> UpdateOne<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub(crate) fn from_handle(handle: MutationHandle<T>) -> Self {
        Self(handle)
    }

    /// `target` is an id string or an object with an `id` field. Without one
    /// this fails with [`CrudError::MissingId`] and nothing is sent.
    pub async fn execute(
        &self,
        target: &JsonValue,
        data: JsonValue,
        select: SelectArgs,
    ) -> Result<T, CrudError> {
        let id = self.0.require_id(target)?;
        let mut input = Map::new();
        input.insert("id".into(), JsonValue::String(id));
        input.insert("data".into(), data);
        select.merge_into(&mut input);
        self.0.run(JsonValue::Object(input)).await
    }
}

impl<T> DeleteOne<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub(crate) fn from_handle(handle: MutationHandle<T>) -> Self {
        Self(handle)
    }

    /// `target` is an id string or an object with an `id` field. Without one
    /// this fails with [`CrudError::MissingId`] and nothing is sent.
    pub async fn execute(&self, target: &JsonValue, select: Option<JsonValue>) -> Result<T, CrudError> {
        let id = self.0.require_id(target)?;
        let mut input = Map::new();
        input.insert("id".into(), JsonValue::String(id));
        if let Some(select) = select {
            input.insert("select".into(), select);
        }
        self.0.run(JsonValue::Object(input)).await
    }
}

pub fn create_one<T>(client: &GraphqlClient, model: impl Into<ModelName>) -> CreateOne<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    CreateOne(MutationHandle::new(client, Operation::CreateOne, model))
}

pub fn update_one<T>(client: &GraphqlClient, model: impl Into<ModelName>) -> UpdateOne<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    UpdateOne(MutationHandle::new(client, Operation::UpdateOne, model))
}

pub fn delete_one<T>(client: &GraphqlClient, model: impl Into<ModelName>) -> DeleteOne<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    DeleteOne(MutationHandle::new(client, Operation::DeleteOne, model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_guard_releases_on_drop() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let _a = InFlightGuard::enter(&counter);
            let _b = InFlightGuard::enter(&counter);
            assert_eq!(counter.load(Ordering::SeqCst), 2);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
