//! Dynamic CRUD dispatcher
//!
//! Model-agnostic read and write handles over the operation registry. The
//! model is a runtime string; records are decoded into whatever `T` the
//! caller asks for (use [`crate::graphql::Record`] for untyped JSON).

pub mod crud;
pub mod mutation;
pub mod paginated;
pub mod query;
pub mod state;

use thiserror::Error;

use crate::graphql::{ModelName, Operation};
use crate::util::errors::AppError;

pub use crud::{Crud, UpsertArgs};
pub use mutation::{CreateOne, DeleteOne, MutationHandle, UpdateOne, create_one, delete_one, update_one};
pub use paginated::{PaginatedQuery, PaginationParams, find_many_paginated};
pub use query::{QueryHandle, count, find_many, find_unique};
pub use state::{ExecutionGate, MutationState, MutationStatus, OperationState, QueryOptions};

/// Failure of a dispatcher call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrudError {
    /// Update or delete called without a resolvable record id. Raised
    /// before any request is sent.
    #[error(
        "ID is required for update/delete operation. Pass a string id or an object with an `id` field ({operation} on {model})"
    )]
    MissingId { operation: Operation, model: ModelName },

    /// A required argument was absent, so the operation was not sent.
    #[error("Missing required parameter `{param}` for {operation} on {model}")]
    MissingParams {
        operation: Operation,
        model: ModelName,
        param: &'static str,
    },

    #[error(transparent)]
    Request(#[from] AppError),
}

impl CrudError {
    pub fn is_precondition(&self) -> bool {
        matches!(self, CrudError::MissingId { .. } | CrudError::MissingParams { .. })
    }

    /// The underlying request error, if the call reached the server.
    pub fn as_app_error(&self) -> Option<&AppError> {
        match self {
            CrudError::Request(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_id_message() {
        let err = CrudError::MissingId {
            operation: Operation::UpdateOne,
            model: ModelName::new("User"),
        };
        assert!(err.to_string().starts_with("ID is required for update/delete operation"));
        assert!(err.to_string().contains("User"));
        assert!(err.is_precondition());
        assert!(err.as_app_error().is_none());
    }

    #[test]
    fn test_request_wraps_app_error() {
        let err: CrudError = AppError::not_found("Record not found").into();
        assert!(!err.is_precondition());
        assert_eq!(err.to_string(), "Record not found");
        assert_eq!(err.as_app_error().map(|e| e.code()), Some("NOT_FOUND"));
    }
}
