//! Convenience result type alias for Lovebirds.

use crate::error::AppError;

/// A specialized `Result` type for Lovebirds operations.
pub type AppResult<T> = Result<T, AppError>;
