use super::models::{
    Feedback, FeedbackUpdate, NewFeedback, NewProject, NewSong, NewVersion, Project,
    ProjectUpdate, Song, SongUpdate, Version, VersionUpdate,
};
use super::trait_def::LibraryStore;
use super::validation;
use crate::error::{AppError, AppResult};
use std::sync::Arc;
use tracing::debug;

pub const PROJECT_NOT_FOUND: &str = "Project not found";
pub const SONG_NOT_FOUND: &str = "Song not found";
pub const VERSION_NOT_FOUND: &str = "Version not found";
pub const FEEDBACK_NOT_FOUND: &str = "Feedback not found";
pub const NO_VERSIONS: &str = "Song has no versions";

/// Owner-scoped access to the library.
///
/// Every operation takes the requesting user's id. Anything outside that
/// user's projects is reported as not found.
pub struct LibraryManager {
    store: Arc<dyn LibraryStore>,
}

impl LibraryManager {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        LibraryManager { store }
    }

    fn ensure_owner(
        &self,
        owner: Option<String>,
        user_id: &str,
        not_found: &'static str,
    ) -> AppResult<()> {
        match owner {
            Some(owner) if owner == user_id => Ok(()),
            Some(_) => {
                debug!("User {} denied access: {}", user_id, not_found);
                Err(AppError::not_found(not_found))
            }
            None => Err(AppError::not_found(not_found)),
        }
    }

    // =========================================================================
    // Projects
    // =========================================================================

    pub fn list_projects(&self, user_id: &str) -> AppResult<Vec<Project>> {
        Ok(self.store.list_projects(user_id)?)
    }

    pub fn create_project(&self, user_id: &str, project: NewProject) -> AppResult<Project> {
        let project = NewProject {
            name: validation::project_name(&project.name)?,
            description: validation::optional_text(project.description)
                .filter(|d| !d.is_empty()),
        };
        Ok(self.store.create_project(user_id, &project)?)
    }

    pub fn get_project(&self, user_id: &str, project_id: &str) -> AppResult<Project> {
        let project = self
            .store
            .get_project(project_id)?
            .ok_or_else(|| AppError::not_found(PROJECT_NOT_FOUND))?;
        self.ensure_owner(Some(project.owner_id.clone()), user_id, PROJECT_NOT_FOUND)?;
        Ok(project)
    }

    pub fn update_project(
        &self,
        user_id: &str,
        project_id: &str,
        update: ProjectUpdate,
    ) -> AppResult<Project> {
        let update = ProjectUpdate {
            name: update
                .name
                .map(|name| validation::project_name(&name))
                .transpose()?,
            description: validation::optional_text(update.description),
        };
        self.get_project(user_id, project_id)?;
        self.store
            .update_project(project_id, &update)?
            .ok_or_else(|| AppError::not_found(PROJECT_NOT_FOUND))
    }

    // =========================================================================
    // Songs
    // =========================================================================

    pub fn list_songs(&self, user_id: &str, project_id: &str) -> AppResult<Vec<Song>> {
        self.get_project(user_id, project_id)?;
        Ok(self.store.list_songs(project_id)?)
    }

    pub fn create_song(&self, user_id: &str, song: NewSong) -> AppResult<Song> {
        let song = NewSong {
            project_id: song.project_id,
            title: validation::song_title(&song.title)?,
            description: validation::optional_text(song.description).filter(|d| !d.is_empty()),
            genre: validation::optional_text(song.genre).filter(|g| !g.is_empty()),
            bpm: song.bpm.map(validation::bpm).transpose()?,
            key: song
                .key
                .map(|key| validation::song_key(&key))
                .transpose()?
                .filter(|k| !k.is_empty()),
        };
        self.get_project(user_id, &song.project_id)?;
        Ok(self.store.create_song(&song)?)
    }

    pub fn get_song(&self, user_id: &str, song_id: &str) -> AppResult<Song> {
        self.ensure_owner(self.store.song_owner(song_id)?, user_id, SONG_NOT_FOUND)?;
        self.store
            .get_song(song_id)?
            .ok_or_else(|| AppError::not_found(SONG_NOT_FOUND))
    }

    pub fn update_song(&self, user_id: &str, song_id: &str, update: SongUpdate) -> AppResult<Song> {
        let update = SongUpdate {
            title: update
                .title
                .map(|title| validation::song_title(&title))
                .transpose()?,
            description: validation::optional_text(update.description),
            genre: validation::optional_text(update.genre),
            bpm: update.bpm.map(validation::bpm).transpose()?,
            key: update
                .key
                .map(|key| validation::song_key(&key))
                .transpose()?,
        };
        self.ensure_owner(self.store.song_owner(song_id)?, user_id, SONG_NOT_FOUND)?;
        self.store
            .update_song(song_id, &update)?
            .ok_or_else(|| AppError::not_found(SONG_NOT_FOUND))
    }

    /// The highest numbered version of the song.
    pub fn current_version(&self, user_id: &str, song_id: &str) -> AppResult<Version> {
        self.ensure_owner(self.store.song_owner(song_id)?, user_id, SONG_NOT_FOUND)?;
        self.store
            .latest_version(song_id)?
            .ok_or_else(|| AppError::not_found(NO_VERSIONS))
    }

    // =========================================================================
    // Versions
    // =========================================================================

    pub fn list_versions(&self, user_id: &str, song_id: &str) -> AppResult<Vec<Version>> {
        self.ensure_owner(self.store.song_owner(song_id)?, user_id, SONG_NOT_FOUND)?;
        Ok(self.store.list_versions(song_id)?)
    }

    pub fn create_version(&self, user_id: &str, version: NewVersion) -> AppResult<Version> {
        let version = NewVersion {
            song_id: version.song_id,
            file_url: validation::file_url(&version.file_url)?,
            duration_secs: validation::duration_secs(version.duration_secs)?,
            notes: validation::optional_text(version.notes).filter(|n| !n.is_empty()),
        };
        self.ensure_owner(
            self.store.song_owner(&version.song_id)?,
            user_id,
            SONG_NOT_FOUND,
        )?;
        Ok(self.store.create_version(&version)?)
    }

    pub fn get_version(&self, user_id: &str, version_id: &str) -> AppResult<Version> {
        self.ensure_owner(
            self.store.version_owner(version_id)?,
            user_id,
            VERSION_NOT_FOUND,
        )?;
        self.store
            .get_version(version_id)?
            .ok_or_else(|| AppError::not_found(VERSION_NOT_FOUND))
    }

    pub fn update_version(
        &self,
        user_id: &str,
        version_id: &str,
        update: VersionUpdate,
    ) -> AppResult<Version> {
        self.get_version(user_id, version_id)?;
        let notes = validation::optional_text(update.notes);
        self.store
            .update_version_notes(version_id, notes.as_deref())?
            .ok_or_else(|| AppError::not_found(VERSION_NOT_FOUND))
    }

    // =========================================================================
    // Feedback
    // =========================================================================

    pub fn list_feedback(&self, user_id: &str, version_id: &str) -> AppResult<Vec<Feedback>> {
        self.get_version(user_id, version_id)?;
        Ok(self.store.list_feedback(version_id)?)
    }

    pub fn create_feedback(&self, user_id: &str, feedback: NewFeedback) -> AppResult<Feedback> {
        let comment = validation::comment(&feedback.comment)?;
        if !feedback.timestamp.is_finite() {
            return Err(AppError::validation("Timestamp must be a finite number"));
        }
        let version = self.get_version(user_id, &feedback.version_id)?;
        let timestamp = validation::feedback_timestamp(feedback.timestamp, version.duration_secs)?;

        Ok(self.store.create_feedback(
            user_id,
            &NewFeedback {
                version_id: version.id,
                timestamp,
                comment,
            },
        )?)
    }

    pub fn get_feedback(&self, user_id: &str, feedback_id: &str) -> AppResult<Feedback> {
        self.ensure_owner(
            self.store.feedback_owner(feedback_id)?,
            user_id,
            FEEDBACK_NOT_FOUND,
        )?;
        self.store
            .get_feedback(feedback_id)?
            .ok_or_else(|| AppError::not_found(FEEDBACK_NOT_FOUND))
    }

    /// Only the author may edit a comment.
    pub fn update_feedback(
        &self,
        user_id: &str,
        feedback_id: &str,
        update: FeedbackUpdate,
    ) -> AppResult<Feedback> {
        let comment = validation::comment(&update.comment)?;
        let feedback = self.get_feedback(user_id, feedback_id)?;
        if feedback.user_id != user_id {
            return Err(AppError::not_found(FEEDBACK_NOT_FOUND));
        }
        self.store
            .update_feedback_comment(feedback_id, &comment)?
            .ok_or_else(|| AppError::not_found(FEEDBACK_NOT_FOUND))
    }
}
