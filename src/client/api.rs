//! Typed HTTP client for the wavenote API.
//!
//! One method per endpoint. The bearer token, once set, is attached to every
//! request.

use std::sync::RwLock;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use crate::library::{
    Feedback, FeedbackUpdate, NewFeedback, NewProject, NewSong, NewVersion, Project,
    ProjectUpdate, Song, SongUpdate, Version, VersionUpdate,
};
use crate::user::{PublicProfile, UserProfile};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{status}: {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(err) => err.status().map(|s| s.as_u16()),
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthSession {
    pub message: String,
    pub user: UserProfile,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefresh {
    pub message: String,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerStats {
    pub uptime: String,
    pub version: String,
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new<T: Into<String>>(base_url: T, timeout_secs: u64) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    pub fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let request = match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }
        Ok(response.json().await?)
    }

    // =========================================================================
    // Auth
    // =========================================================================

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ClientResult<AuthSession> {
        let body = json!({ "username": username, "email": email, "password": password });
        self.send(self.client.post(self.url("/auth/register")).json(&body))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthSession> {
        let body = json!({ "email": email, "password": password });
        self.send(self.client.post(self.url("/auth/login")).json(&body))
            .await
    }

    pub async fn refresh(&self, token: &str) -> ClientResult<TokenRefresh> {
        let body = json!({ "token": token });
        self.send(self.client.post(self.url("/auth/refresh")).json(&body))
            .await
    }

    pub async fn logout(&self) -> ClientResult<Message> {
        self.send(self.client.post(self.url("/auth/logout"))).await
    }

    pub async fn server_stats(&self) -> ClientResult<ServerStats> {
        self.send(self.client.get(self.url("/"))).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn me(&self) -> ClientResult<UserProfile> {
        self.send(self.client.get(self.url("/users/me"))).await
    }

    pub async fn update_me(
        &self,
        display_name: Option<&str>,
        profile_image_url: Option<&str>,
    ) -> ClientResult<UserProfile> {
        let body = json!({
            "display_name": display_name,
            "profile_image_url": profile_image_url,
        });
        self.send(self.client.put(self.url("/users/me")).json(&body))
            .await
    }

    pub async fn get_user(&self, user_id: &str) -> ClientResult<PublicProfile> {
        self.send(self.client.get(self.url(&format!("/users/{}", user_id))))
            .await
    }

    // =========================================================================
    // Projects
    // =========================================================================

    pub async fn list_projects(&self) -> ClientResult<Vec<Project>> {
        self.send(self.client.get(self.url("/projects"))).await
    }

    pub async fn create_project(&self, project: &NewProject) -> ClientResult<Project> {
        self.send(self.client.post(self.url("/projects")).json(project))
            .await
    }

    pub async fn get_project(&self, project_id: &str) -> ClientResult<Project> {
        self.send(self.client.get(self.url(&format!("/projects/{}", project_id))))
            .await
    }

    pub async fn update_project(
        &self,
        project_id: &str,
        update: &ProjectUpdate,
    ) -> ClientResult<Project> {
        let url = self.url(&format!("/projects/{}", project_id));
        self.send(self.client.put(url).json(update)).await
    }

    // =========================================================================
    // Songs
    // =========================================================================

    pub async fn list_songs(&self, project_id: &str) -> ClientResult<Vec<Song>> {
        let request = self
            .client
            .get(self.url("/songs"))
            .query(&[("project_id", project_id)]);
        self.send(request).await
    }

    pub async fn create_song(&self, song: &NewSong) -> ClientResult<Song> {
        self.send(self.client.post(self.url("/songs")).json(song)).await
    }

    pub async fn get_song(&self, song_id: &str) -> ClientResult<Song> {
        self.send(self.client.get(self.url(&format!("/songs/{}", song_id))))
            .await
    }

    pub async fn update_song(&self, song_id: &str, update: &SongUpdate) -> ClientResult<Song> {
        let url = self.url(&format!("/songs/{}", song_id));
        self.send(self.client.put(url).json(update)).await
    }

    pub async fn current_version(&self, song_id: &str) -> ClientResult<Version> {
        let url = self.url(&format!("/songs/{}/current-version", song_id));
        self.send(self.client.get(url)).await
    }

    // =========================================================================
    // Versions
    // =========================================================================

    pub async fn list_versions(&self, song_id: &str) -> ClientResult<Vec<Version>> {
        let request = self
            .client
            .get(self.url("/versions"))
            .query(&[("song_id", song_id)]);
        self.send(request).await
    }

    pub async fn create_version(&self, version: &NewVersion) -> ClientResult<Version> {
        self.send(self.client.post(self.url("/versions")).json(version))
            .await
    }

    pub async fn get_version(&self, version_id: &str) -> ClientResult<Version> {
        self.send(self.client.get(self.url(&format!("/versions/{}", version_id))))
            .await
    }

    pub async fn update_version(
        &self,
        version_id: &str,
        update: &VersionUpdate,
    ) -> ClientResult<Version> {
        let url = self.url(&format!("/versions/{}", version_id));
        self.send(self.client.put(url).json(update)).await
    }

    // =========================================================================
    // Feedback
    // =========================================================================

    pub async fn list_feedback(&self, version_id: &str) -> ClientResult<Vec<Feedback>> {
        let request = self
            .client
            .get(self.url("/feedback"))
            .query(&[("version_id", version_id)]);
        self.send(request).await
    }

    pub async fn create_feedback(&self, feedback: &NewFeedback) -> ClientResult<Feedback> {
        self.send(self.client.post(self.url("/feedback")).json(feedback))
            .await
    }

    pub async fn get_feedback(&self, feedback_id: &str) -> ClientResult<Feedback> {
        self.send(self.client.get(self.url(&format!("/feedback/{}", feedback_id))))
            .await
    }

    pub async fn update_feedback(
        &self,
        feedback_id: &str,
        update: &FeedbackUpdate,
    ) -> ClientResult<Feedback> {
        let url = self.url(&format!("/feedback/{}", feedback_id));
        self.send(self.client.put(url).json(update)).await
    }
}

/// Builds an `Api` error from an error response, using its `message` field when present.
fn api_error(status: StatusCode, body: String) -> ClientError {
    let message = serde_json::from_str::<Message>(&body)
        .map(|m| m.message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                body
            }
        });
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}
