use super::user_models::{NewUser, ProfileUpdate, User};
use super::user_store::UserStore;
use crate::sqlite_persistence::DbPool;
use anyhow::{Context, Result};
use rusqlite::{params, Row};
use tracing::debug;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, display_name, profile_image_url, created_at, last_login";

pub struct SqliteUserStore {
    pool: DbPool,
}

impl SqliteUserStore {
    pub fn new(pool: DbPool) -> Self {
        SqliteUserStore { pool }
    }

    fn parse_user(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            display_name: row.get(4)?,
            profile_image_url: row.get(5)?,
            created_at: row.get(6)?,
            last_login: row.get(7)?,
        })
    }

    fn get_user_where(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
        self.pool
            .query_optional(&sql, params![value], Self::parse_user)
            .with_context(|| format!("Failed to look up user by {}", column))
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, user: &NewUser) -> Result<()> {
        self.pool.execute(
            "INSERT INTO users (id, username, email, password_hash) VALUES (?1, ?2, ?3, ?4)",
            params![user.id, user.username, user.email, user.password_hash],
        )?;
        debug!("Created user {} ({})", user.username, user.id);
        Ok(())
    }

    fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>> {
        self.get_user_where("id", user_id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_user_where("email", email)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_user_where("username", username)
    }

    fn update_last_login(&self, user_id: &str, timestamp: i64) -> Result<()> {
        self.pool.execute(
            "UPDATE users SET last_login = ?2 WHERE id = ?1",
            params![user_id, timestamp],
        )?;
        Ok(())
    }

    fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<Option<User>> {
        let changed = self.pool.execute(
            "UPDATE users SET
                display_name = CASE WHEN ?2 IS NULL THEN display_name WHEN ?2 = '' THEN NULL ELSE ?2 END,
                profile_image_url = CASE WHEN ?3 IS NULL THEN profile_image_url WHEN ?3 = '' THEN NULL ELSE ?3 END
             WHERE id = ?1",
            params![user_id, update.display_name, update.profile_image_url],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_user_by_id(user_id)
    }
}
