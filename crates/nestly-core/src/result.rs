//! Convenience result type alias for Nestly.

use crate::error::AppError;

/// A specialized `Result` type for Nestly operations.
pub type AppResult<T> = Result<T, AppError>;
