//! Test fixture creation for the database

use super::constants::*;
use anyhow::Result;
use std::path::PathBuf;
use tempfile::TempDir;
use wavenote_server::user::user_models::NewUser;
use wavenote_server::user::{UserStore, WavenoteHasher};
use wavenote_server::{DbPool, MigrationRunner, PoolConfig, SqliteUserStore};

/// Creates a temporary, migrated database holding the two test users.
/// Returns (temp_dir, db_path, [test user id, other user id])
pub fn create_test_db_with_users() -> Result<(TempDir, PathBuf, [String; 2])> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("wavenote.db");

    let pool = DbPool::new(PoolConfig::new(&db_path))?;
    MigrationRunner::embedded().run(&pool)?;
    let user_store = SqliteUserStore::new(pool);

    let mut ids = vec![];
    for (username, email, password) in [
        (TEST_USER, TEST_EMAIL, TEST_PASS),
        (OTHER_USER, OTHER_EMAIL, OTHER_PASS),
    ] {
        let id = uuid::Uuid::new_v4().to_string();
        user_store.create_user(&NewUser {
            id: id.clone(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: WavenoteHasher::Argon2.hash(password)?,
        })?;
        ids.push(id);
    }

    Ok((dir, db_path, [ids[0].clone(), ids[1].clone()]))
}
