//! crudkit - model-agnostic CRUD over a unified GraphQL API
//!
//! A single parametrized GraphQL API (`findMany`, `findById`, `createOne`, ...)
//! is exposed as typed client handles that publish `{ data, loading, error }`
//! state, alongside local UI state helpers and pure utilities.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod graphql;
pub mod state;
pub mod util;

pub use client::{FetchPolicy, GraphqlClient};
pub use config::ClientConfig;
pub use dispatcher::{Crud, CrudError, QueryOptions};
pub use graphql::{ModelName, Operation, QueryArgs, Record};
pub use util::errors::AppError;
