//! Unified GraphQL API surface
//!
//! The backend exposes one parametrized operation per CRUD verb, keyed by a
//! runtime model name. This module holds the operation registry and the
//! argument and result envelopes those operations exchange.

pub mod filters;
pub mod operations;
pub mod pagination;
pub mod types;

pub use filters::{QueryArgs, SelectArgs, SortOrder};
pub use operations::{Operation, OperationKind};
pub use pagination::{PageMeta, PaginatedResult};
pub use types::{GraphqlRequest, GraphqlResponse, ModelName, Record, resolve_record_id};
