use super::user_models::{NewUser, ProfileUpdate, User};
use anyhow::Result;

pub trait UserStore: Send + Sync {
    /// Persists a new user. Fails if the username or email is already taken.
    fn create_user(&self, user: &NewUser) -> Result<()>;

    /// Returns Ok(None) if the user does not exist.
    /// Returns Err if there is a database error.
    fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>>;

    /// Looks up a user by normalized (lower-cased) email.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Sets last_login to the given unix timestamp.
    fn update_last_login(&self, user_id: &str, timestamp: i64) -> Result<()>;

    /// Applies the profile update and returns the updated user.
    /// Returns Ok(None) if the user does not exist.
    fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<Option<User>>;
}
