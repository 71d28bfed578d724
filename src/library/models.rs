//! Library models: projects own songs, songs have numbered versions,
//! versions collect timestamped feedback.

use serde::{Deserialize, Serialize};

// =============================================================================
// Stored entities
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub bpm: Option<u32>,
    /// Musical key, e.g. "F#m".
    pub key: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    pub song_id: String,
    /// 1 for the first upload of a song, then increasing by one.
    pub version_number: i64,
    pub file_url: String,
    pub duration_secs: f64,
    pub notes: Option<String>,
    pub created_at: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAuthor {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub version_id: String,
    pub user_id: String,
    /// Offset into the version's audio, in seconds.
    pub timestamp: f64,
    pub comment: String,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub author: FeedbackAuthor,
}

// =============================================================================
// Inputs
// =============================================================================
//
// Update records: `None` leaves a field untouched, an empty string clears an
// optional text field.

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewSong {
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub bpm: Option<u32>,
    pub key: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SongUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub bpm: Option<u32>,
    pub key: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewVersion {
    pub song_id: String,
    pub file_url: String,
    pub duration_secs: f64,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionUpdate {
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewFeedback {
    pub version_id: String,
    pub timestamp: f64,
    pub comment: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackUpdate {
    pub comment: String,
}
