use thiserror::Error;

use crate::errors::StoreError;

/// Business errors for user record workflows.
///
/// The `Display` text of each variant is what API clients see in `{error}`.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Missing fields.")]
    Validation,
    #[error("Username already exists.")]
    Conflict,
    #[error("Username not found.")]
    NotFound,
    /// Update or delete matched nothing. Deliberately not told apart from a missing user.
    #[error("Something went wrong.")]
    OperationFailed,
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl UserError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            UserError::Validation => 1001,
            UserError::Conflict => 1002,
            UserError::NotFound => 1003,
            UserError::OperationFailed => 1004,
            UserError::Storage(_) => 1200,
        }
    }
}
