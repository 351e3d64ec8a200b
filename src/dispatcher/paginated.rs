//! Paginated reads with page/limit owned by the handle
//!
//! Every change to page, limit, filter or ordering re-issues the query.
//! Changing the page size always restarts at page 1 so the handle can never
//! point past the last page of the new size.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::watch;
use tracing::debug;

use crate::client::GraphqlClient;
use crate::graphql::pagination::clamp_limit;
use crate::graphql::{ModelName, Operation, PageMeta, PaginatedResult, QueryArgs};

use super::query::QueryHandle;
use super::state::{OperationState, QueryOptions};

/// Initial arguments for [`find_many_paginated`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub filter: Option<JsonValue>,
    pub order_by: Option<JsonValue>,
    pub select: Option<JsonValue>,
    pub include: Option<JsonValue>,
}

impl PaginationParams {
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn filter(mut self, filter: JsonValue) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, order_by: JsonValue) -> Self {
        self.order_by = Some(order_by);
        self
    }
}

/// A paginated read of one model.
pub struct PaginatedQuery<T> {
    query: QueryHandle<PaginatedResult<T>>,
    page: u32,
    limit: u32,
    filter: Option<JsonValue>,
    order_by: Option<JsonValue>,
    select: Option<JsonValue>,
    include: Option<JsonValue>,
}

impl<T> PaginatedQuery<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn new(
        client: &GraphqlClient,
        model: ModelName,
        params: PaginationParams,
        options: QueryOptions,
    ) -> Self {
        let mut paginated = Self {
            query: QueryHandle::new(
                client,
                Operation::FindManyPaginated,
                model,
                JsonValue::Null,
                options,
            ),
            page: params.page.unwrap_or(1).max(1),
            limit: clamp_limit(params.limit.unwrap_or(client.default_page_size())),
            filter: params.filter,
            order_by: params.order_by,
            select: params.select,
            include: params.include,
        };
        paginated.sync_input();
        paginated
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn args(&self) -> QueryArgs {
        QueryArgs {
            filter: self.filter.clone(),
            order_by: self.order_by.clone(),
            select: self.select.clone(),
            include: self.include.clone(),
            page: Some(self.page),
            limit: Some(self.limit),
        }
    }

    pub fn state(&self) -> OperationState<PaginatedResult<T>> {
        self.query.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationState<PaginatedResult<T>>> {
        self.query.subscribe()
    }

    /// Meta block of the last successful page, if any.
    pub fn meta(&self) -> Option<PageMeta> {
        self.query.state().data.map(|result| result.meta)
    }

    /// Run the query for the current page.
    pub async fn fetch(&self) -> OperationState<PaginatedResult<T>> {
        self.query.run().await
    }

    pub async fn refetch(&self) -> OperationState<PaginatedResult<T>> {
        let _ = self.query.refetch().await;
        self.query.state()
    }

    /// Jump to `page` (at least 1).
    pub async fn go_to_page(&mut self, page: u32) -> OperationState<PaginatedResult<T>> {
        let page = page.max(1);
        if page == self.page {
            return self.state();
        }
        self.page = page;
        self.reissue().await
    }

    /// Advance one page; a no-op when the last result has no next page.
    pub async fn next_page(&mut self) -> OperationState<PaginatedResult<T>> {
        match self.meta() {
            Some(meta) if meta.has_next_page => {
                self.page += 1;
                self.reissue().await
            }
            _ => self.state(),
        }
    }

    /// Go back one page; a no-op when the last result has no previous page.
    pub async fn prev_page(&mut self) -> OperationState<PaginatedResult<T>> {
        match self.meta() {
            Some(meta) if meta.has_prev_page && self.page > 1 => {
                self.page -= 1;
                self.reissue().await
            }
            _ => self.state(),
        }
    }

    /// Change the page size and restart at page 1.
    pub async fn change_limit(&mut self, limit: u32) -> OperationState<PaginatedResult<T>> {
        let limit = clamp_limit(limit);
        let changed = limit != self.limit || self.page != 1;
        self.limit = limit;
        self.page = 1;
        if changed {
            self.reissue().await
        } else {
            self.state()
        }
    }

    /// Replace the filter. The current page is kept.
    pub async fn set_where(
        &mut self,
        filter: Option<JsonValue>,
    ) -> OperationState<PaginatedResult<T>> {
        if filter == self.filter {
            return self.state();
        }
        self.filter = filter;
        self.reissue().await
    }

    pub async fn set_order_by(
        &mut self,
        order_by: Option<JsonValue>,
    ) -> OperationState<PaginatedResult<T>> {
        if order_by == self.order_by {
            return self.state();
        }
        self.order_by = order_by;
        self.reissue().await
    }

    fn sync_input(&mut self) {
        let input = self.args().to_input();
        self.query.set_input(input);
    }

    async fn reissue(&mut self) -> OperationState<PaginatedResult<T>> {
        debug!(
            model = %self.query.model(),
            page = self.page,
            limit = self.limit,
            "Re-issuing paginated query"
        );
        self.sync_input();
        self.query.run().await
    }
}

/// Paginated read of `model`; call [`PaginatedQuery::fetch`] for the first page.
pub fn find_many_paginated<T>(
    client: &GraphqlClient,
    model: impl Into<ModelName>,
    params: PaginationParams,
    options: QueryOptions,
) -> PaginatedQuery<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    PaginatedQuery::new(client, model.into(), params, options)
}
