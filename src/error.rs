//! Error type shared by the managers and the HTTP layer.

use crate::sqlite_persistence::PoolError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or out of range input. Nothing was mutated.
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired credentials.
    #[error("{0}")]
    Auth(String),

    /// Missing resource, or one the requester is not allowed to see.
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Server(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation<T: Into<String>>(message: T) -> Self {
        AppError::Validation(message.into())
    }

    pub fn auth<T: Into<String>>(message: T) -> Self {
        AppError::Auth(message.into())
    }

    pub fn not_found<T: Into<String>>(message: T) -> Self {
        AppError::NotFound(message.into())
    }
}

impl From<PoolError> for AppError {
    fn from(err: PoolError) -> Self {
        AppError::Server(err.into())
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
