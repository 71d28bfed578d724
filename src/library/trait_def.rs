//! LibraryStore trait definition.

use super::models::{
    Feedback, NewFeedback, NewProject, NewSong, NewVersion, Project, ProjectUpdate, Song,
    SongUpdate, Version,
};
use anyhow::Result;

/// Storage for projects, songs, versions and feedback.
///
/// Lookups return `Ok(None)` for missing rows. Ownership is not enforced here,
/// the `*_owner` lookups let the caller do it.
pub trait LibraryStore: Send + Sync {
    // =========================================================================
    // Projects
    // =========================================================================

    fn create_project(&self, owner_id: &str, project: &NewProject) -> Result<Project>;

    /// Projects owned by `owner_id`, most recently created first.
    fn list_projects(&self, owner_id: &str) -> Result<Vec<Project>>;

    fn get_project(&self, project_id: &str) -> Result<Option<Project>>;

    fn update_project(&self, project_id: &str, update: &ProjectUpdate) -> Result<Option<Project>>;

    // =========================================================================
    // Songs
    // =========================================================================

    fn create_song(&self, song: &NewSong) -> Result<Song>;

    /// Songs of a project in creation order.
    fn list_songs(&self, project_id: &str) -> Result<Vec<Song>>;

    fn get_song(&self, song_id: &str) -> Result<Option<Song>>;

    fn update_song(&self, song_id: &str, update: &SongUpdate) -> Result<Option<Song>>;

    /// Owner of the project the song belongs to.
    fn song_owner(&self, song_id: &str) -> Result<Option<String>>;

    // =========================================================================
    // Versions
    // =========================================================================

    /// Inserts the version with the next free version number of its song.
    fn create_version(&self, version: &NewVersion) -> Result<Version>;

    /// Versions of a song by ascending version number.
    fn list_versions(&self, song_id: &str) -> Result<Vec<Version>>;

    fn get_version(&self, version_id: &str) -> Result<Option<Version>>;

    /// The version with the highest number, if the song has any.
    fn latest_version(&self, song_id: &str) -> Result<Option<Version>>;

    fn update_version_notes(&self, version_id: &str, notes: Option<&str>)
        -> Result<Option<Version>>;

    /// Owner of the project the version's song belongs to.
    fn version_owner(&self, version_id: &str) -> Result<Option<String>>;

    // =========================================================================
    // Feedback
    // =========================================================================

    fn create_feedback(&self, user_id: &str, feedback: &NewFeedback) -> Result<Feedback>;

    /// Feedback of a version by timestamp, ties in creation order.
    fn list_feedback(&self, version_id: &str) -> Result<Vec<Feedback>>;

    fn get_feedback(&self, feedback_id: &str) -> Result<Option<Feedback>>;

    fn update_feedback_comment(&self, feedback_id: &str, comment: &str)
        -> Result<Option<Feedback>>;

    /// Owner of the project the feedback's version belongs to.
    fn feedback_owner(&self, feedback_id: &str) -> Result<Option<String>>;
}
