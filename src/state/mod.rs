//! Local UI state helpers
//!
//! Plain owned values with no network access of their own. They compose with
//! the dispatcher: a [`DataTable`] produces the arguments a paginated read
//! takes, an [`AsyncAction`] wraps any dispatcher call.

pub mod async_action;
pub mod data_table;
pub mod debounce;
pub mod form;
pub mod modal;

pub use async_action::{ActionState, AsyncAction, AsyncActionOptions, AsyncActions};
pub use data_table::DataTable;
pub use debounce::{DebouncedValue, Debouncer, ThrottledValue};
pub use form::{FieldRule, FormHandlers, FormState};
pub use modal::{Modal, ModalWithData};
