//! Client-side state for a wavenote frontend.
//!
//! The store keeps normalized copies of what the API returned: entities by id
//! plus ordered id lists per parent. Every fetch takes a ticket from
//! `RequestGenerations` and its response is dropped if a newer fetch for the
//! same key started, or the key was cancelled, in the meantime.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use super::api::{ApiClient, ClientError, ClientResult};
use crate::library::{Feedback, NewFeedback, NewProject, NewSong, NewVersion, Project, Song, Version};
use crate::user::UserProfile;

/// What a fetch is loading. One generation counter and loading flag per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchKey {
    Projects,
    Songs(String),
    Versions(String),
    Feedback(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    key: FetchKey,
    generation: u64,
}

impl Ticket {
    pub fn key(&self) -> &FetchKey {
        &self.key
    }
}

#[derive(Default)]
pub struct RequestGenerations {
    generations: Mutex<HashMap<FetchKey, u64>>,
}

impl RequestGenerations {
    fn lock(&self) -> MutexGuard<'_, HashMap<FetchKey, u64>> {
        self.generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts a request for `key`. Any ticket issued earlier for it becomes stale.
    pub fn begin(&self, key: FetchKey) -> Ticket {
        let mut generations = self.lock();
        let generation = generations.entry(key.clone()).or_insert(0);
        *generation += 1;
        Ticket {
            key,
            generation: *generation,
        }
    }

    /// Invalidates the in-flight request for `key`, if any.
    pub fn cancel(&self, key: &FetchKey) {
        if let Some(generation) = self.lock().get_mut(key) {
            *generation += 1;
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.lock().get(&ticket.key) == Some(&ticket.generation)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: UserProfile,
    pub token: String,
}

#[derive(Default)]
struct StoreState {
    auth: Option<AuthState>,
    projects: HashMap<String, Project>,
    project_ids: Vec<String>,
    songs: HashMap<String, Song>,
    song_ids_by_project: HashMap<String, Vec<String>>,
    versions: HashMap<String, Version>,
    version_ids_by_song: HashMap<String, Vec<String>>,
    feedback_by_version: HashMap<String, Vec<Feedback>>,
    selected_versions: HashMap<String, String>,
    loading: HashSet<FetchKey>,
    last_error: Option<String>,
}

impl StoreState {
    fn put_project(&mut self, project: Project) {
        if !self.project_ids.contains(&project.id) {
            self.project_ids.insert(0, project.id.clone());
        }
        self.projects.insert(project.id.clone(), project);
    }

    fn put_song(&mut self, song: Song) {
        let ids = self
            .song_ids_by_project
            .entry(song.project_id.clone())
            .or_default();
        if !ids.contains(&song.id) {
            ids.push(song.id.clone());
        }
        self.songs.insert(song.id.clone(), song);
    }

    fn put_version(&mut self, version: Version) {
        let ids = self
            .version_ids_by_song
            .entry(version.song_id.clone())
            .or_default();
        if !ids.contains(&version.id) {
            ids.push(version.id.clone());
        }
        let song_id = version.song_id.clone();
        self.versions.insert(version.id.clone(), version);

        let versions = &self.versions;
        if let Some(ids) = self.version_ids_by_song.get_mut(&song_id) {
            ids.sort_by_key(|id| versions.get(id).map(|v| v.version_number));
        }
    }

    fn put_feedback(&mut self, feedback: Feedback) {
        let list = self
            .feedback_by_version
            .entry(feedback.version_id.clone())
            .or_default();
        match list.iter_mut().find(|f| f.id == feedback.id) {
            Some(existing) => *existing = feedback,
            None => list.push(feedback),
        }
        sort_by_timestamp(list);
    }
}

/// Stable, so equal timestamps keep their creation order.
fn sort_by_timestamp(feedback: &mut [Feedback]) {
    feedback.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
}

pub struct ClientStore {
    api: ApiClient,
    state: Mutex<StoreState>,
    generations: RequestGenerations,
}

impl ClientStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Mutex::new(StoreState::default()),
            generations: RequestGenerations::default(),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_error<T>(&self, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(err) = &result {
            self.lock().last_error = Some(err.to_string());
        }
        result
    }

    // =========================================================================
    // Fetch lifecycle
    // =========================================================================

    // Generation changes and checks happen under the state lock, so a response
    // is either applied before a cancel or discarded after it.

    pub fn begin(&self, key: FetchKey) -> Ticket {
        let mut state = self.lock();
        state.loading.insert(key.clone());
        self.generations.begin(key)
    }

    /// Drops whatever is in flight for `key`, e.g. when the view showing it goes away.
    pub fn cancel(&self, key: &FetchKey) {
        let mut state = self.lock();
        self.generations.cancel(key);
        state.loading.remove(key);
    }

    pub fn is_loading(&self, key: &FetchKey) -> bool {
        self.lock().loading.contains(key)
    }

    /// Applies a response if `ticket` is still current. Returns `Ok(false)` for a
    /// stale response, which leaves the state untouched.
    pub fn finish<T, F>(&self, ticket: &Ticket, result: ClientResult<T>, apply: F) -> ClientResult<bool>
    where
        F: FnOnce(&mut StoreStateView<'_>, T),
    {
        let mut state = self.lock();
        if !self.generations.is_current(ticket) {
            debug!("Discarding stale response for {:?}", ticket.key);
            return Ok(false);
        }
        state.loading.remove(&ticket.key);
        match result {
            Ok(value) => {
                state.last_error = None;
                apply(&mut StoreStateView { state: &mut *state }, value);
                Ok(true)
            }
            Err(err) => {
                warn!("Fetch for {:?} failed: {}", ticket.key, err);
                state.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    // =========================================================================
    // Auth
    // =========================================================================

    pub async fn register(&self, username: &str, email: &str, password: &str) -> ClientResult<UserProfile> {
        let session = self
            .record_error(self.api.register(username, email, password).await)?;
        Ok(self.sign_in(session.user, session.token))
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<UserProfile> {
        let session = self.record_error(self.api.login(email, password).await)?;
        Ok(self.sign_in(session.user, session.token))
    }

    fn sign_in(&self, user: UserProfile, token: String) -> UserProfile {
        self.api.set_token(Some(token.clone()));
        let mut state = self.lock();
        *state = StoreState::default();
        state.auth = Some(AuthState {
            user: user.clone(),
            token,
        });
        user
    }

    /// Swaps the stored token for a fresh one. Signs out if the server refuses it.
    pub async fn refresh_token(&self) -> ClientResult<()> {
        let token = match self.api.token() {
            Some(token) => token,
            None => {
                return Err(ClientError::Api {
                    status: 400,
                    message: "Token is required".to_string(),
                })
            }
        };
        match self.api.refresh(&token).await {
            Ok(refreshed) => {
                self.api.set_token(Some(refreshed.token.clone()));
                if let Some(auth) = self.lock().auth.as_mut() {
                    auth.token = refreshed.token;
                }
                Ok(())
            }
            Err(err) => {
                if err.status() == Some(401) {
                    self.clear_session();
                }
                self.record_error(Err(err))
            }
        }
    }

    pub async fn logout(&self) -> ClientResult<()> {
        let result = self.api.logout().await;
        self.clear_session();
        result.map(|_| ())
    }

    fn clear_session(&self) {
        self.api.set_token(None);
        *self.lock() = StoreState::default();
    }

    pub fn auth(&self) -> Option<AuthState> {
        self.lock().auth.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    // =========================================================================
    // Projects and songs
    // =========================================================================

    pub async fn fetch_projects(&self) -> ClientResult<bool> {
        let ticket = self.begin(FetchKey::Projects);
        let result = self.api.list_projects().await;
        self.finish(&ticket, result, |view, projects| view.replace_projects(projects))
    }

    pub async fn create_project(&self, project: &NewProject) -> ClientResult<Project> {
        let project = self.record_error(self.api.create_project(project).await)?;
        self.lock().put_project(project.clone());
        Ok(project)
    }

    pub fn projects(&self) -> Vec<Project> {
        let state = self.lock();
        state
            .project_ids
            .iter()
            .filter_map(|id| state.projects.get(id).cloned())
            .collect()
    }

    pub async fn fetch_songs(&self, project_id: &str) -> ClientResult<bool> {
        let ticket = self.begin(FetchKey::Songs(project_id.to_string()));
        let result = self.api.list_songs(project_id).await;
        self.finish(&ticket, result, |view, songs| view.replace_songs(project_id, songs))
    }

    pub async fn create_song(&self, song: &NewSong) -> ClientResult<Song> {
        let song = self.record_error(self.api.create_song(song).await)?;
        self.lock().put_song(song.clone());
        Ok(song)
    }

    pub fn songs(&self, project_id: &str) -> Vec<Song> {
        let state = self.lock();
        state
            .song_ids_by_project
            .get(project_id)
            .map(|ids| ids.iter().filter_map(|id| state.songs.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Versions
    // =========================================================================

    pub async fn fetch_versions(&self, song_id: &str) -> ClientResult<bool> {
        let ticket = self.begin(FetchKey::Versions(song_id.to_string()));
        let result = self.api.list_versions(song_id).await;
        self.finish(&ticket, result, |view, versions| view.replace_versions(song_id, versions))
    }

    pub async fn create_version(&self, version: &NewVersion) -> ClientResult<Version> {
        let version = self.record_error(self.api.create_version(version).await)?;
        self.lock().put_version(version.clone());
        Ok(version)
    }

    /// Versions of a song in ascending version number.
    pub fn versions(&self, song_id: &str) -> Vec<Version> {
        let state = self.lock();
        state
            .version_ids_by_song
            .get(song_id)
            .map(|ids| ids.iter().filter_map(|id| state.versions.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    /// Selects which version of `song_id` is shown. Unknown versions are ignored.
    pub fn select_version(&self, song_id: &str, version_id: &str) -> bool {
        let mut state = self.lock();
        let belongs = state
            .versions
            .get(version_id)
            .is_some_and(|v| v.song_id == song_id);
        if belongs {
            state
                .selected_versions
                .insert(song_id.to_string(), version_id.to_string());
        }
        belongs
    }

    /// The selected version, or the highest-numbered one when none is selected.
    pub fn current_version(&self, song_id: &str) -> Option<Version> {
        let state = self.lock();
        if let Some(selected) = state
            .selected_versions
            .get(song_id)
            .and_then(|id| state.versions.get(id))
        {
            return Some(selected.clone());
        }
        state
            .version_ids_by_song
            .get(song_id)?
            .iter()
            .filter_map(|id| state.versions.get(id))
            .max_by_key(|v| v.version_number)
            .cloned()
    }

    // =========================================================================
    // Feedback
    // =========================================================================

    pub async fn fetch_feedback(&self, version_id: &str) -> ClientResult<bool> {
        let ticket = self.begin(FetchKey::Feedback(version_id.to_string()));
        let result = self.api.list_feedback(version_id).await;
        self.finish(&ticket, result, |view, feedback| {
            view.replace_feedback(version_id, feedback)
        })
    }

    pub async fn add_feedback(&self, feedback: &NewFeedback) -> ClientResult<Feedback> {
        let feedback = self.record_error(self.api.create_feedback(feedback).await)?;
        self.lock().put_feedback(feedback.clone());
        Ok(feedback)
    }

    pub async fn edit_feedback(&self, feedback_id: &str, comment: &str) -> ClientResult<Feedback> {
        let update = crate::library::FeedbackUpdate {
            comment: comment.to_string(),
        };
        let feedback = self.record_error(self.api.update_feedback(feedback_id, &update).await)?;
        self.lock().put_feedback(feedback.clone());
        Ok(feedback)
    }

    /// Feedback of a version ordered by timestamp.
    pub fn feedback(&self, version_id: &str) -> Vec<Feedback> {
        self.lock()
            .feedback_by_version
            .get(version_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Write access to the store state handed to `ClientStore::finish`.
pub struct StoreStateView<'a> {
    state: &'a mut StoreState,
}

impl StoreStateView<'_> {
    pub fn replace_projects(&mut self, projects: Vec<Project>) {
        self.state.project_ids = projects.iter().map(|p| p.id.clone()).collect();
        self.state.projects = projects.into_iter().map(|p| (p.id.clone(), p)).collect();
    }

    pub fn replace_songs(&mut self, project_id: &str, songs: Vec<Song>) {
        let ids = songs.iter().map(|s| s.id.clone()).collect();
        self.state
            .song_ids_by_project
            .insert(project_id.to_string(), ids);
        for song in songs {
            self.state.songs.insert(song.id.clone(), song);
        }
    }

    pub fn replace_versions(&mut self, song_id: &str, mut versions: Vec<Version>) {
        versions.sort_by_key(|v| v.version_number);
        let ids = versions.iter().map(|v| v.id.clone()).collect();
        self.state
            .version_ids_by_song
            .insert(song_id.to_string(), ids);
        for version in versions {
            self.state.versions.insert(version.id.clone(), version);
        }
    }

    pub fn replace_feedback(&mut self, version_id: &str, mut feedback: Vec<Feedback>) {
        sort_by_timestamp(&mut feedback);
        self.state
            .feedback_by_version
            .insert(version_id.to_string(), feedback);
    }
}
