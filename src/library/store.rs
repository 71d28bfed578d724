//! SQLite-backed LibraryStore.

use super::models::{
    Feedback, FeedbackAuthor, NewFeedback, NewProject, NewSong, NewVersion, Project,
    ProjectUpdate, Song, SongUpdate, Version,
};
use super::trait_def::LibraryStore;
use crate::sqlite_persistence::{now_unix_secs, DbPool};
use anyhow::{Context, Result};
use rusqlite::{params, Row, TransactionBehavior};
use tracing::debug;

const PROJECT_COLUMNS: &str = "id, owner_id, name, description, created_at, updated_at";
const SONG_COLUMNS: &str =
    "id, project_id, title, description, genre, bpm, musical_key, created_at, updated_at";
const VERSION_COLUMNS: &str =
    "id, song_id, version_number, file_url, duration_secs, notes, created_at";
const FEEDBACK_SELECT: &str = "SELECT f.id, f.version_id, f.user_id, f.timestamp_secs, f.comment,
        f.created_at, f.updated_at, u.username, u.display_name, u.profile_image_url
    FROM feedback f JOIN users u ON u.id = f.user_id";

/// SQL for an optional text column update: NULL keeps the value, '' clears it.
fn optional_text_update(column: &str, param: usize) -> String {
    format!(
        "{column} = CASE WHEN ?{param} IS NULL THEN {column} WHEN ?{param} = '' THEN NULL ELSE ?{param} END"
    )
}

pub struct SqliteLibraryStore {
    pool: DbPool,
}

impl SqliteLibraryStore {
    pub fn new(pool: DbPool) -> Self {
        SqliteLibraryStore { pool }
    }

    fn parse_project(row: &Row<'_>) -> rusqlite::Result<Project> {
        Ok(Project {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn parse_song(row: &Row<'_>) -> rusqlite::Result<Song> {
        Ok(Song {
            id: row.get(0)?,
            project_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            genre: row.get(4)?,
            bpm: row.get(5)?,
            key: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn parse_version(row: &Row<'_>) -> rusqlite::Result<Version> {
        Ok(Version {
            id: row.get(0)?,
            song_id: row.get(1)?,
            version_number: row.get(2)?,
            file_url: row.get(3)?,
            duration_secs: row.get(4)?,
            notes: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn parse_feedback(row: &Row<'_>) -> rusqlite::Result<Feedback> {
        let user_id: String = row.get(2)?;
        Ok(Feedback {
            id: row.get(0)?,
            version_id: row.get(1)?,
            timestamp: row.get(3)?,
            comment: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            author: FeedbackAuthor {
                id: user_id.clone(),
                username: row.get(7)?,
                display_name: row.get(8)?,
                profile_image_url: row.get(9)?,
            },
            user_id,
        })
    }

    fn single_owner(&self, sql: &str, id: &str) -> Result<Option<String>> {
        self.pool
            .query_optional(sql, params![id], |row| row.get::<_, String>(0))
    }
}

impl LibraryStore for SqliteLibraryStore {
    fn create_project(&self, owner_id: &str, project: &NewProject) -> Result<Project> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_unix_secs();
        self.pool.execute(
            "INSERT INTO projects (id, owner_id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, owner_id, project.name, project.description, now],
        )?;
        debug!("Created project {} for user {}", id, owner_id);
        self.get_project(&id)?
            .with_context(|| format!("Project {} missing after insert", id))
    }

    fn list_projects(&self, owner_id: &str) -> Result<Vec<Project>> {
        self.pool.query_rows(
            &format!(
                "SELECT {} FROM projects WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
                PROJECT_COLUMNS
            ),
            params![owner_id],
            Self::parse_project,
        )
    }

    fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        self.pool.query_optional(
            &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS),
            params![project_id],
            Self::parse_project,
        )
    }

    fn update_project(&self, project_id: &str, update: &ProjectUpdate) -> Result<Option<Project>> {
        let sql = format!(
            "UPDATE projects SET name = COALESCE(?2, name), {}, updated_at = ?4 WHERE id = ?1",
            optional_text_update("description", 3)
        );
        let changed = self.pool.execute(
            &sql,
            params![project_id, update.name, update.description, now_unix_secs()],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_project(project_id)
    }

    fn create_song(&self, song: &NewSong) -> Result<Song> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_unix_secs();
        self.pool.execute(
            "INSERT INTO songs (id, project_id, title, description, genre, bpm, musical_key, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                id,
                song.project_id,
                song.title,
                song.description,
                song.genre,
                song.bpm,
                song.key,
                now
            ],
        )?;
        debug!("Created song {} in project {}", id, song.project_id);
        self.get_song(&id)?
            .with_context(|| format!("Song {} missing after insert", id))
    }

    fn list_songs(&self, project_id: &str) -> Result<Vec<Song>> {
        self.pool.query_rows(
            &format!(
                "SELECT {} FROM songs WHERE project_id = ?1 ORDER BY created_at, rowid",
                SONG_COLUMNS
            ),
            params![project_id],
            Self::parse_song,
        )
    }

    fn get_song(&self, song_id: &str) -> Result<Option<Song>> {
        self.pool.query_optional(
            &format!("SELECT {} FROM songs WHERE id = ?1", SONG_COLUMNS),
            params![song_id],
            Self::parse_song,
        )
    }

    fn update_song(&self, song_id: &str, update: &SongUpdate) -> Result<Option<Song>> {
        let sql = format!(
            "UPDATE songs SET title = COALESCE(?2, title), {}, {}, bpm = COALESCE(?5, bpm), {},
                updated_at = ?7
             WHERE id = ?1",
            optional_text_update("description", 3),
            optional_text_update("genre", 4),
            optional_text_update("musical_key", 6),
        );
        let changed = self.pool.execute(
            &sql,
            params![
                song_id,
                update.title,
                update.description,
                update.genre,
                update.bpm,
                update.key,
                now_unix_secs()
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_song(song_id)
    }

    fn song_owner(&self, song_id: &str) -> Result<Option<String>> {
        self.single_owner(
            "SELECT p.owner_id FROM songs s JOIN projects p ON p.id = s.project_id WHERE s.id = ?1",
            song_id,
        )
    }

    fn create_version(&self, version: &NewVersion) -> Result<Version> {
        let id = uuid::Uuid::new_v4().to_string();
        {
            let mut conn = self.pool.get()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let version_number: i64 = tx.query_row(
                "SELECT COALESCE(MAX(version_number), 0) + 1 FROM versions WHERE song_id = ?1",
                params![version.song_id],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO versions (id, song_id, version_number, file_url, duration_secs, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    version.song_id,
                    version_number,
                    version.file_url,
                    version.duration_secs,
                    version.notes,
                    now_unix_secs()
                ],
            )?;
            tx.commit()?;
            debug!(
                "Created version {} of song {} ({})",
                version_number, version.song_id, id
            );
        }
        self.get_version(&id)?
            .with_context(|| format!("Version {} missing after insert", id))
    }

    fn list_versions(&self, song_id: &str) -> Result<Vec<Version>> {
        self.pool.query_rows(
            &format!(
                "SELECT {} FROM versions WHERE song_id = ?1 ORDER BY version_number ASC",
                VERSION_COLUMNS
            ),
            params![song_id],
            Self::parse_version,
        )
    }

    fn get_version(&self, version_id: &str) -> Result<Option<Version>> {
        self.pool.query_optional(
            &format!("SELECT {} FROM versions WHERE id = ?1", VERSION_COLUMNS),
            params![version_id],
            Self::parse_version,
        )
    }

    fn latest_version(&self, song_id: &str) -> Result<Option<Version>> {
        self.pool.query_optional(
            &format!(
                "SELECT {} FROM versions WHERE song_id = ?1 ORDER BY version_number DESC LIMIT 1",
                VERSION_COLUMNS
            ),
            params![song_id],
            Self::parse_version,
        )
    }

    fn update_version_notes(
        &self,
        version_id: &str,
        notes: Option<&str>,
    ) -> Result<Option<Version>> {
        let changed = self.pool.execute(
            &format!(
                "UPDATE versions SET {} WHERE id = ?1",
                optional_text_update("notes", 2)
            ),
            params![version_id, notes],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_version(version_id)
    }

    fn version_owner(&self, version_id: &str) -> Result<Option<String>> {
        self.single_owner(
            "SELECT p.owner_id FROM versions v
                JOIN songs s ON s.id = v.song_id
                JOIN projects p ON p.id = s.project_id
             WHERE v.id = ?1",
            version_id,
        )
    }

    fn create_feedback(&self, user_id: &str, feedback: &NewFeedback) -> Result<Feedback> {
        let id = uuid::Uuid::new_v4().to_string();
        self.pool.execute(
            "INSERT INTO feedback (id, version_id, user_id, timestamp_secs, comment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                feedback.version_id,
                user_id,
                feedback.timestamp,
                feedback.comment,
                now_unix_secs()
            ],
        )?;
        debug!(
            "Created feedback {} on version {} at {}s",
            id, feedback.version_id, feedback.timestamp
        );
        self.get_feedback(&id)?
            .with_context(|| format!("Feedback {} missing after insert", id))
    }

    fn list_feedback(&self, version_id: &str) -> Result<Vec<Feedback>> {
        self.pool.query_rows(
            &format!(
                "{} WHERE f.version_id = ?1 ORDER BY f.timestamp_secs ASC, f.rowid ASC",
                FEEDBACK_SELECT
            ),
            params![version_id],
            Self::parse_feedback,
        )
    }

    fn get_feedback(&self, feedback_id: &str) -> Result<Option<Feedback>> {
        self.pool.query_optional(
            &format!("{} WHERE f.id = ?1", FEEDBACK_SELECT),
            params![feedback_id],
            Self::parse_feedback,
        )
    }

    fn update_feedback_comment(
        &self,
        feedback_id: &str,
        comment: &str,
    ) -> Result<Option<Feedback>> {
        let changed = self.pool.execute(
            "UPDATE feedback SET comment = ?2, updated_at = ?3 WHERE id = ?1",
            params![feedback_id, comment, now_unix_secs()],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_feedback(feedback_id)
    }

    fn feedback_owner(&self, feedback_id: &str) -> Result<Option<String>> {
        self.single_owner(
            "SELECT p.owner_id FROM feedback f
                JOIN versions v ON v.id = f.version_id
                JOIN songs s ON s.id = v.song_id
                JOIN projects p ON p.id = s.project_id
             WHERE f.id = ?1",
            feedback_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_persistence::{MigrationRunner, PoolConfig};
    use std::sync::Arc;
    use tempfile::TempDir;

    const OWNER_ID: &str = "owner-1";

    fn create_tmp_store() -> (SqliteLibraryStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = DbPool::new(PoolConfig::new(temp_dir.path().join("test.db"))).unwrap();
        MigrationRunner::embedded().run(&pool).unwrap();
        pool.execute(
            "INSERT INTO users (id, username, email, password_hash) VALUES (?1, 'owner', 'owner@x.com', 'h')",
            params![OWNER_ID],
        )
        .unwrap();
        (SqliteLibraryStore::new(pool), temp_dir)
    }

    fn create_song(store: &SqliteLibraryStore) -> Song {
        let project = store
            .create_project(
                OWNER_ID,
                &NewProject {
                    name: "Album".to_string(),
                    description: None,
                },
            )
            .unwrap();
        store
            .create_song(&NewSong {
                project_id: project.id,
                title: "Track".to_string(),
                ..Default::default()
            })
            .unwrap()
    }

    fn new_version(song_id: &str, duration_secs: f64) -> NewVersion {
        NewVersion {
            song_id: song_id.to_string(),
            file_url: "https://files/track.mp3".to_string(),
            duration_secs,
            notes: None,
        }
    }

    #[test]
    fn creates_and_updates_project() {
        let (store, _temp_dir) = create_tmp_store();
        let project = store
            .create_project(
                OWNER_ID,
                &NewProject {
                    name: "Demo".to_string(),
                    description: Some("first".to_string()),
                },
            )
            .unwrap();
        assert_eq!(project.owner_id, OWNER_ID);
        assert_eq!(store.list_projects(OWNER_ID).unwrap(), vec![project.clone()]);
        assert!(store.list_projects("someone-else").unwrap().is_empty());

        let updated = store
            .update_project(
                &project.id,
                &ProjectUpdate {
                    name: None,
                    description: Some(String::new()),
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Demo");
        assert_eq!(updated.description, None);
        assert!(store
            .update_project("missing", &ProjectUpdate::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn song_requires_existing_project() {
        let (store, _temp_dir) = create_tmp_store();
        let result = store.create_song(&NewSong {
            project_id: "missing".to_string(),
            title: "Orphan".to_string(),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn updates_song_fields_selectively() {
        let (store, _temp_dir) = create_tmp_store();
        let song = create_song(&store);

        let updated = store
            .update_song(
                &song.id,
                &SongUpdate {
                    bpm: Some(120),
                    key: Some("F#m".to_string()),
                    genre: Some("ambient".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Track");
        assert_eq!(updated.bpm, Some(120));
        assert_eq!(updated.key.as_deref(), Some("F#m"));

        let updated = store
            .update_song(
                &song.id,
                &SongUpdate {
                    genre: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.genre, None);
        assert_eq!(updated.bpm, Some(120));
        assert_eq!(store.song_owner(&song.id).unwrap().as_deref(), Some(OWNER_ID));
    }

    #[test]
    fn version_numbers_increase_per_song() {
        let (store, _temp_dir) = create_tmp_store();
        let song = create_song(&store);
        let other_song = create_song(&store);

        for _ in 0..3 {
            store.create_version(&new_version(&song.id, 90.0)).unwrap();
        }
        let other = store.create_version(&new_version(&other_song.id, 30.0)).unwrap();

        let numbers: Vec<i64> = store
            .list_versions(&song.id)
            .unwrap()
            .iter()
            .map(|v| v.version_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(other.version_number, 1);
        assert_eq!(
            store.latest_version(&song.id).unwrap().unwrap().version_number,
            3
        );
        assert!(store.latest_version("missing").unwrap().is_none());
    }

    #[test]
    fn concurrent_version_creation_never_reuses_numbers() {
        let temp_dir = TempDir::new().unwrap();
        let pool = DbPool::new(PoolConfig::new(temp_dir.path().join("test.db"))).unwrap();
        MigrationRunner::embedded().run(&pool).unwrap();
        pool.execute(
            "INSERT INTO users (id, username, email, password_hash) VALUES (?1, 'owner', 'owner@x.com', 'h')",
            params![OWNER_ID],
        )
        .unwrap();
        let store = Arc::new(SqliteLibraryStore::new(pool));
        let song = create_song(&store);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                let song_id = song.id.clone();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        store.create_version(&new_version(&song_id, 10.0)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let numbers: Vec<i64> = store
            .list_versions(&song.id)
            .unwrap()
            .iter()
            .map(|v| v.version_number)
            .collect();
        assert_eq!(numbers, (1..=20).collect::<Vec<i64>>());
    }

    #[test]
    fn feedback_is_ordered_by_timestamp_then_creation() {
        let (store, _temp_dir) = create_tmp_store();
        let song = create_song(&store);
        let version = store.create_version(&new_version(&song.id, 200.0)).unwrap();

        for (timestamp, comment) in [(42.0, "b"), (10.5, "a"), (42.0, "c"), (0.0, "start")] {
            store
                .create_feedback(
                    OWNER_ID,
                    &NewFeedback {
                        version_id: version.id.clone(),
                        timestamp,
                        comment: comment.to_string(),
                    },
                )
                .unwrap();
        }

        let listed = store.list_feedback(&version.id).unwrap();
        let comments: Vec<&str> = listed.iter().map(|f| f.comment.as_str()).collect();
        assert_eq!(comments, vec!["start", "a", "b", "c"]);
        assert_eq!(listed[0].author.username, "owner");
        assert_eq!(listed[0].user_id, OWNER_ID);

        let edited = store
            .update_feedback_comment(&listed[1].id, "edited")
            .unwrap()
            .unwrap();
        assert_eq!(edited.comment, "edited");
        assert!(edited.updated_at.is_some());
        assert_eq!(
            store.feedback_owner(&listed[1].id).unwrap().as_deref(),
            Some(OWNER_ID)
        );
        assert_eq!(
            store.version_owner(&version.id).unwrap().as_deref(),
            Some(OWNER_ID)
        );
    }

    #[test]
    fn negative_feedback_timestamp_is_refused_by_schema() {
        let (store, _temp_dir) = create_tmp_store();
        let song = create_song(&store);
        let version = store.create_version(&new_version(&song.id, 200.0)).unwrap();

        let result = store.create_feedback(
            OWNER_ID,
            &NewFeedback {
                version_id: version.id,
                timestamp: -1.0,
                comment: "before start".to_string(),
            },
        );
        assert!(result.is_err());
    }
}
