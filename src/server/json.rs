//! JSON request/response plumbing and the mapping of AppError to HTTP.

use crate::error::AppError;
use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::error;

pub const INTERNAL_SERVER_ERROR: &str = "Internal server error";

#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new<T: Into<String>>(message: T) -> Self {
        MessageResponse {
            message: message.into(),
        }
    }
}

/// Like `Json`, but a malformed body is a validation error with a JSON message.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AppError::Validation(message) | AppError::Auth(message) | AppError::NotFound(message) => {
                message
            }
            AppError::Server(err) => {
                error!("Internal server error: {:#}", err);
                INTERNAL_SERVER_ERROR.to_string()
            }
        };
        (status, Json(MessageResponse { message })).into_response()
    }
}
