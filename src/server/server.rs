use anyhow::Result;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tracing::{debug, info};

use super::json::{ApiJson, MessageResponse};
use super::library_routes::make_library_routes;
use super::session::require_session;
use super::user_routes::make_user_routes;
use super::{log_requests, state::*, ServerConfig};
use crate::error::{AppError, AppResult};
use crate::user::{AuthOutcome, UserProfile};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct RegisterBody {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct RefreshBody {
    pub token: Option<String>,
}

#[derive(Serialize)]
struct AuthResponse {
    message: String,
    user: UserProfile,
    token: String,
}

impl AuthResponse {
    fn new(message: &str, outcome: AuthOutcome) -> Self {
        AuthResponse {
            message: message.to_string(),
            user: outcome.user,
            token: outcome.token,
        }
    }
}

#[derive(Serialize)]
struct RefreshResponse {
    message: String,
    token: String,
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    Json(stats)
}

/// Runs password hashing off the async workers.
async fn blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| AppError::Server(err.into()))?
}

async fn register(
    State(auth_manager): State<GuardedAuthManager>,
    ApiJson(body): ApiJson<RegisterBody>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    debug!("register() called for {}", body.username);
    let outcome =
        blocking(move || auth_manager.register(&body.username, &body.email, &body.password))
            .await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new("User registered successfully", outcome)),
    ))
}

async fn login(
    State(auth_manager): State<GuardedAuthManager>,
    ApiJson(body): ApiJson<LoginBody>,
) -> AppResult<Json<AuthResponse>> {
    debug!("login() called for {}", body.email);
    let outcome = blocking(move || auth_manager.login(&body.email, &body.password)).await?;
    Ok(Json(AuthResponse::new("Login successful", outcome)))
}

/// An empty body is treated like a missing token.
async fn refresh(
    State(auth_manager): State<GuardedAuthManager>,
    body: Bytes,
) -> AppResult<Json<RefreshResponse>> {
    let body: RefreshBody = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|err| AppError::validation(format!("Invalid request body: {}", err)))?
    };
    let token = auth_manager.refresh(body.token.as_deref())?;
    Ok(Json(RefreshResponse {
        message: "Token refreshed".to_string(),
        token,
    }))
}

async fn logout(State(auth_manager): State<GuardedAuthManager>) -> Json<MessageResponse> {
    auth_manager.logout();
    Json(MessageResponse::new("Logout successful"))
}

pub fn make_app(
    config: ServerConfig,
    auth_manager: GuardedAuthManager,
    library_manager: GuardedLibraryManager,
) -> Result<Router> {
    let state = ServerState::new(config.clone(), auth_manager, library_manager);

    let auth_routes: Router = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state.clone());

    let user_routes: Router = make_user_routes(state.clone()).route_layer(
        middleware::from_fn_with_state(state.clone(), require_session),
    );

    let library_routes: Router = make_library_routes(state.clone()).route_layer(
        middleware::from_fn_with_state(state.clone(), require_session),
    );

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let app: Router = home_router
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .merge(library_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    auth_manager: GuardedAuthManager,
    library_manager: GuardedLibraryManager,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, auth_manager, library_manager)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
