//! Projects, songs, versions and feedback.
//!
//! Every handler runs behind `require_session`, and the library manager
//! answers NotFound for anything outside the caller's projects.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::json::ApiJson;
use super::session::Session;
use super::state::{GuardedLibraryManager, ServerState};
use crate::error::{AppError, AppResult};
use crate::library::{
    Feedback, FeedbackUpdate, NewFeedback, NewProject, NewSong, NewVersion, Project,
    ProjectUpdate, Song, SongUpdate, Version, VersionUpdate,
};

#[derive(Deserialize, Debug)]
struct SongsQuery {
    pub project_id: Option<String>,
}

#[derive(Deserialize, Debug)]
struct VersionsQuery {
    pub song_id: Option<String>,
}

#[derive(Deserialize, Debug)]
struct FeedbackQuery {
    pub version_id: Option<String>,
}

fn required_param(value: Option<String>, name: &str) -> AppResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::validation(format!("{} is required", name))),
    }
}

type Created<T> = (StatusCode, Json<T>);

fn created<T>(value: T) -> Created<T> {
    (StatusCode::CREATED, Json(value))
}

// =============================================================================
// Projects
// =============================================================================

async fn list_projects(
    session: Session,
    State(library): State<GuardedLibraryManager>,
) -> AppResult<Json<Vec<Project>>> {
    Ok(Json(library.list_projects(&session.user_id)?))
}

async fn post_project(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    ApiJson(body): ApiJson<NewProject>,
) -> AppResult<Created<Project>> {
    Ok(created(library.create_project(&session.user_id, body)?))
}

async fn get_project(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(id): Path<String>,
) -> AppResult<Json<Project>> {
    Ok(Json(library.get_project(&session.user_id, &id)?))
}

async fn put_project(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProjectUpdate>,
) -> AppResult<Json<Project>> {
    Ok(Json(library.update_project(&session.user_id, &id, body)?))
}

// =============================================================================
// Songs
// =============================================================================

async fn list_songs(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Query(query): Query<SongsQuery>,
) -> AppResult<Json<Vec<Song>>> {
    let project_id = required_param(query.project_id, "project_id")?;
    Ok(Json(library.list_songs(&session.user_id, &project_id)?))
}

async fn post_song(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    ApiJson(body): ApiJson<NewSong>,
) -> AppResult<Created<Song>> {
    Ok(created(library.create_song(&session.user_id, body)?))
}

async fn get_song(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(id): Path<String>,
) -> AppResult<Json<Song>> {
    Ok(Json(library.get_song(&session.user_id, &id)?))
}

async fn put_song(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SongUpdate>,
) -> AppResult<Json<Song>> {
    Ok(Json(library.update_song(&session.user_id, &id, body)?))
}

async fn get_current_version(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(id): Path<String>,
) -> AppResult<Json<Version>> {
    Ok(Json(library.current_version(&session.user_id, &id)?))
}

// =============================================================================
// Versions
// =============================================================================

async fn list_versions(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Query(query): Query<VersionsQuery>,
) -> AppResult<Json<Vec<Version>>> {
    let song_id = required_param(query.song_id, "song_id")?;
    Ok(Json(library.list_versions(&session.user_id, &song_id)?))
}

async fn post_version(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    ApiJson(body): ApiJson<NewVersion>,
) -> AppResult<Created<Version>> {
    Ok(created(library.create_version(&session.user_id, body)?))
}

async fn get_version(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(id): Path<String>,
) -> AppResult<Json<Version>> {
    Ok(Json(library.get_version(&session.user_id, &id)?))
}

async fn put_version(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<VersionUpdate>,
) -> AppResult<Json<Version>> {
    Ok(Json(library.update_version(&session.user_id, &id, body)?))
}

// =============================================================================
// Feedback
// =============================================================================

async fn list_feedback(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Query(query): Query<FeedbackQuery>,
) -> AppResult<Json<Vec<Feedback>>> {
    let version_id = required_param(query.version_id, "version_id")?;
    Ok(Json(library.list_feedback(&session.user_id, &version_id)?))
}

async fn post_feedback(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    ApiJson(body): ApiJson<NewFeedback>,
) -> AppResult<Created<Feedback>> {
    Ok(created(library.create_feedback(&session.user_id, body)?))
}

async fn get_feedback(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(id): Path<String>,
) -> AppResult<Json<Feedback>> {
    Ok(Json(library.get_feedback(&session.user_id, &id)?))
}

async fn put_feedback(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<FeedbackUpdate>,
) -> AppResult<Json<Feedback>> {
    Ok(Json(library.update_feedback(&session.user_id, &id, body)?))
}

pub fn make_library_routes(state: ServerState) -> Router {
    Router::new()
        .route("/projects", get(list_projects).post(post_project))
        .route("/projects/{id}", get(get_project).put(put_project))
        .route("/songs", get(list_songs).post(post_song))
        .route("/songs/{id}", get(get_song).put(put_song))
        .route("/songs/{id}/current-version", get(get_current_version))
        .route("/versions", get(list_versions).post(post_version))
        .route("/versions/{id}", get(get_version).put(put_version))
        .route("/feedback", get(list_feedback).post(post_feedback))
        .route("/feedback/{id}", get(get_feedback).put(put_feedback))
        .with_state(state)
}
