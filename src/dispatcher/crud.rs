//! All operations of one model behind a single value
//!
//! [`Crud`] owns one mutation handle per write operation and shares an
//! in-flight counter between them, so [`Crud::loading`] is true while any of
//! its writes is pending. Reads are one-off and always go to the network.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use tracing::debug;

use crate::client::{FetchPolicy, GraphqlClient};
use crate::graphql::{ModelName, Operation, PaginatedResult, QueryArgs, SelectArgs, resolve_record_id};
use crate::util::errors::AppError;

use super::CrudError;
use super::mutation::{CreateOne, DeleteOne, MutationHandle, UpdateOne};

/// Arguments of an upsert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertArgs {
    #[serde(rename = "where")]
    pub filter: JsonValue,
    pub create: JsonValue,
    pub update: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<JsonValue>,
}

impl UpsertArgs {
    pub fn new(filter: JsonValue, create: JsonValue, update: JsonValue) -> Self {
        Self {
            filter,
            create,
            update,
            select: None,
            include: None,
        }
    }
}

/// Every generic operation for one model.
pub struct Crud<T> {
    client: GraphqlClient,
    model: ModelName,
    in_flight: Arc<AtomicUsize>,
    create: CreateOne<T>,
    update: UpdateOne<T>,
    delete: DeleteOne<T>,
    upsert: MutationHandle<T>,
    create_many: MutationHandle<JsonValue>,
    update_many: MutationHandle<JsonValue>,
    delete_many: MutationHandle<JsonValue>,
}

impl<T> Crud<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(client: &GraphqlClient, model: impl Into<ModelName>) -> Self {
        let model = model.into();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let handle = |operation: Operation| {
            MutationHandle::<T>::new(client, operation, model.clone()).with_in_flight(in_flight.clone())
        };
        let batch = |operation: Operation| {
            MutationHandle::<JsonValue>::new(client, operation, model.clone())
                .with_in_flight(in_flight.clone())
        };

        Self {
            create: CreateOne::from_handle(handle(Operation::CreateOne)),
            update: UpdateOne::from_handle(handle(Operation::UpdateOne)),
            delete: DeleteOne::from_handle(handle(Operation::DeleteOne)),
            upsert: handle(Operation::Upsert),
            create_many: batch(Operation::CreateMany),
            update_many: batch(Operation::UpdateMany),
            delete_many: batch(Operation::DeleteMany),
            client: client.clone(),
            model,
            in_flight,
        }
    }

    pub fn model(&self) -> &ModelName {
        &self.model
    }

    /// True while any write issued through this value is pending.
    pub fn loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn create_handle(&self) -> &CreateOne<T> {
        &self.create
    }

    pub fn update_handle(&self) -> &UpdateOne<T> {
        &self.update
    }

    pub fn delete_handle(&self) -> &DeleteOne<T> {
        &self.delete
    }

    pub async fn create_one(&self, data: JsonValue, select: SelectArgs) -> Result<T, CrudError> {
        self.create.execute(data, select).await
    }

    pub async fn update_one(
        &self,
        target: &JsonValue,
        data: JsonValue,
        select: SelectArgs,
    ) -> Result<T, CrudError> {
        self.update.execute(target, data, select).await
    }

    pub async fn delete_one(&self, target: &JsonValue, select: Option<JsonValue>) -> Result<T, CrudError> {
        self.delete.execute(target, select).await
    }

    pub async fn create_many(
        &self,
        data: Vec<JsonValue>,
        skip_duplicates: Option<bool>,
    ) -> Result<JsonValue, CrudError> {
        self.create_many
            .run(json!({ "data": data, "skipDuplicates": skip_duplicates }))
            .await
    }

    pub async fn update_many(&self, filter: JsonValue, data: JsonValue) -> Result<JsonValue, CrudError> {
        self.update_many.run(json!({ "where": filter, "data": data })).await
    }

    pub async fn delete_many(&self, filter: JsonValue) -> Result<JsonValue, CrudError> {
        self.delete_many.run(json!({ "where": filter })).await
    }

    pub async fn upsert(&self, args: UpsertArgs) -> Result<T, CrudError> {
        let input = serde_json::to_value(&args).map_err(AppError::from)?;
        self.upsert.run(input).await
    }

    pub async fn aggregate(&self, options: JsonValue) -> Result<JsonValue, CrudError> {
        self.read(Operation::Aggregate, json!({ "options": options })).await
    }

    pub async fn group_by(&self, options: JsonValue) -> Result<JsonValue, CrudError> {
        self.read(Operation::GroupBy, json!({ "options": options })).await
    }

    pub async fn find_many(&self, args: QueryArgs) -> Result<Vec<T>, CrudError> {
        self.read(Operation::FindMany, args.to_input()).await
    }

    /// Fetch one record. Fails with [`CrudError::MissingParams`] when no id
    /// resolves from `id_or_where`.
    pub async fn find_unique(
        &self,
        id_or_where: &JsonValue,
        select: SelectArgs,
    ) -> Result<Option<T>, CrudError> {
        let id = resolve_record_id(id_or_where).ok_or_else(|| CrudError::MissingParams {
            operation: Operation::FindUnique,
            model: self.model.clone(),
            param: "id",
        })?;
        let mut input = Map::new();
        input.insert("id".into(), JsonValue::String(id));
        select.merge_into(&mut input);
        self.read(Operation::FindUnique, JsonValue::Object(input)).await
    }

    pub async fn count(&self, filter: Option<JsonValue>) -> Result<i64, CrudError> {
        self.read(Operation::Count, json!({ "where": filter })).await
    }

    pub async fn find_many_paginated(&self, args: QueryArgs) -> Result<PaginatedResult<T>, CrudError> {
        self.read(Operation::FindManyPaginated, args.to_input()).await
    }

    async fn read<R: DeserializeOwned>(&self, operation: Operation, input: JsonValue) -> Result<R, CrudError> {
        debug!(model = %self.model, operation = %operation, "Imperative read");
        let variables = operation.variables(&self.model, input);
        let value = self
            .client
            .execute(operation, Some(&self.model), variables, FetchPolicy::NetworkOnly)
            .await?;
        serde_json::from_value(value).map_err(|e| CrudError::from(AppError::from(e)))
    }
}
