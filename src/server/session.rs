use super::state::GuardedAuthManager;
use crate::error::AppError;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

pub const AUTHENTICATION_REQUIRED: &str = "Authentication required";

/// The authenticated caller, attached to the request by `require_session`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub username: String,
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Rejects requests without a valid bearer token, otherwise attaches the `Session`.
pub async fn require_session(
    State(auth_manager): State<GuardedAuthManager>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = match extract_bearer_token(request.headers()) {
        Some(token) => token,
        None => {
            debug!("No bearer token in request to {}", request.uri());
            return Err(AppError::auth(AUTHENTICATION_REQUIRED));
        }
    };

    let user = auth_manager.authenticate(&token)?;
    debug!("Authenticated user {} ({})", user.username, user.user_id);
    request.extensions_mut().insert(Session {
        user_id: user.user_id,
        username: user.username,
    });

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::auth(AUTHENTICATION_REQUIRED))
    }
}
