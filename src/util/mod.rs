pub mod array;
pub mod errors;
pub mod validation;

pub use errors::{AppError, format_error, retry};
