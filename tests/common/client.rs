//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all wavenote-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::{RequestBuilder, Response};
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client holding an optional bearer token
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Bearer token sent with every request, once logged in
    pub token: Option<String>,
}

impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client logged in as `TEST_USER`
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_EMAIL, TEST_PASS).await
    }

    /// Creates a client logged in as `OTHER_USER`
    pub async fn authenticated_other(base_url: String) -> Self {
        Self::authenticated_as(base_url, OTHER_EMAIL, OTHER_PASS).await
    }

    async fn authenticated_as(base_url: String, email: &str, password: &str) -> Self {
        let mut client = Self::new(base_url);

        let response = client.login(email, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Test user authentication failed"
        );
        let body: Value = response.json().await.expect("Login response is not JSON");
        client.token = body["token"].as_str().map(str::to_string);
        assert!(client.token.is_some(), "Login response has no token");

        client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Response {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        request.send().await.expect("Request failed")
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /auth/register
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Response {
        let body = json!({ "username": username, "email": email, "password": password });
        self.send(self.client.post(self.url("/auth/register")).json(&body))
            .await
    }

    /// POST /auth/login
    pub async fn login(&self, email: &str, password: &str) -> Response {
        let body = json!({ "email": email, "password": password });
        self.send(self.client.post(self.url("/auth/login")).json(&body))
            .await
    }

    /// POST /auth/refresh
    pub async fn refresh(&self, body: Value) -> Response {
        self.send(self.client.post(self.url("/auth/refresh")).json(&body))
            .await
    }

    /// POST /auth/logout
    pub async fn logout(&self) -> Response {
        self.send(self.client.post(self.url("/auth/logout"))).await
    }

    /// GET /
    pub async fn home(&self) -> Response {
        self.send(self.client.get(self.url("/"))).await
    }

    // ========================================================================
    // User Endpoints
    // ========================================================================

    /// GET /users/me
    pub async fn get_me(&self) -> Response {
        self.send(self.client.get(self.url("/users/me"))).await
    }

    /// PUT /users/me
    pub async fn update_me(&self, body: Value) -> Response {
        self.send(self.client.put(self.url("/users/me")).json(&body))
            .await
    }

    /// GET /users/{id}
    pub async fn get_user(&self, id: &str) -> Response {
        self.send(self.client.get(self.url(&format!("/users/{}", id))))
            .await
    }

    // ========================================================================
    // Library Endpoints
    // ========================================================================

    /// GET /projects
    pub async fn list_projects(&self) -> Response {
        self.send(self.client.get(self.url("/projects"))).await
    }

    /// POST /projects
    pub async fn create_project(&self, body: Value) -> Response {
        self.send(self.client.post(self.url("/projects")).json(&body))
            .await
    }

    /// GET /projects/{id}
    pub async fn get_project(&self, id: &str) -> Response {
        self.send(self.client.get(self.url(&format!("/projects/{}", id))))
            .await
    }

    /// PUT /projects/{id}
    pub async fn update_project(&self, id: &str, body: Value) -> Response {
        let url = self.url(&format!("/projects/{}", id));
        self.send(self.client.put(url).json(&body)).await
    }

    /// GET /songs?project_id=
    pub async fn list_songs(&self, project_id: &str) -> Response {
        let request = self
            .client
            .get(self.url("/songs"))
            .query(&[("project_id", project_id)]);
        self.send(request).await
    }

    /// POST /songs
    pub async fn create_song(&self, body: Value) -> Response {
        self.send(self.client.post(self.url("/songs")).json(&body))
            .await
    }

    /// GET /songs/{id}
    pub async fn get_song(&self, id: &str) -> Response {
        self.send(self.client.get(self.url(&format!("/songs/{}", id))))
            .await
    }

    /// PUT /songs/{id}
    pub async fn update_song(&self, id: &str, body: Value) -> Response {
        let url = self.url(&format!("/songs/{}", id));
        self.send(self.client.put(url).json(&body)).await
    }

    /// GET /songs/{id}/current-version
    pub async fn current_version(&self, song_id: &str) -> Response {
        let url = self.url(&format!("/songs/{}/current-version", song_id));
        self.send(self.client.get(url)).await
    }

    /// GET /versions?song_id=
    pub async fn list_versions(&self, song_id: &str) -> Response {
        let request = self
            .client
            .get(self.url("/versions"))
            .query(&[("song_id", song_id)]);
        self.send(request).await
    }

    /// POST /versions
    pub async fn create_version(&self, body: Value) -> Response {
        self.send(self.client.post(self.url("/versions")).json(&body))
            .await
    }

    /// GET /versions/{id}
    pub async fn get_version(&self, id: &str) -> Response {
        self.send(self.client.get(self.url(&format!("/versions/{}", id))))
            .await
    }

    /// PUT /versions/{id}
    pub async fn update_version(&self, id: &str, body: Value) -> Response {
        let url = self.url(&format!("/versions/{}", id));
        self.send(self.client.put(url).json(&body)).await
    }

    /// GET /feedback?version_id=
    pub async fn list_feedback(&self, version_id: &str) -> Response {
        let request = self
            .client
            .get(self.url("/feedback"))
            .query(&[("version_id", version_id)]);
        self.send(request).await
    }

    /// POST /feedback
    pub async fn create_feedback(&self, body: Value) -> Response {
        self.send(self.client.post(self.url("/feedback")).json(&body))
            .await
    }

    /// GET /feedback/{id}
    pub async fn get_feedback(&self, id: &str) -> Response {
        self.send(self.client.get(self.url(&format!("/feedback/{}", id))))
            .await
    }

    /// PUT /feedback/{id}
    pub async fn update_feedback(&self, id: &str, body: Value) -> Response {
        let url = self.url(&format!("/feedback/{}", id));
        self.send(self.client.put(url).json(&body)).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Creates a project, a song in it and one version of that song.
    /// Returns (project_id, song_id, version_id)
    pub async fn create_song_with_version(&self) -> (String, String, String) {
        let response = self.create_project(json!({ "name": "Demos" })).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let project: Value = response.json().await.unwrap();
        let project_id = project["id"].as_str().unwrap().to_string();

        let response = self
            .create_song(json!({ "project_id": project_id, "title": "Night Drive" }))
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let song: Value = response.json().await.unwrap();
        let song_id = song["id"].as_str().unwrap().to_string();

        let response = self
            .create_version(json!({
                "song_id": song_id,
                "file_url": TEST_FILE_URL,
                "duration_secs": TEST_DURATION_SECS,
            }))
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let version: Value = response.json().await.unwrap();
        let version_id = version["id"].as_str().unwrap().to_string();

        (project_id, song_id, version_id)
    }
}
