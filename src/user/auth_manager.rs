use super::auth::{TokenIssuer, WavenoteHasher};
use super::user_models::{NewUser, ProfileUpdate, PublicProfile, UserProfile};
use super::user_store::UserStore;
use super::validation;
use crate::error::{AppError, AppResult};
use crate::sqlite_persistence::{now_unix_secs, unique_violation_column};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const EMAIL_TAKEN: &str = "Email already registered";
pub const USERNAME_TAKEN: &str = "Username already taken";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const TOKEN_REQUIRED: &str = "Token is required";
pub const INVALID_TOKEN: &str = "Invalid or expired token";
pub const USER_GONE: &str = "User no longer exists";
pub const USER_NOT_FOUND: &str = "User not found";

/// Profile plus a fresh bearer token, returned by register and login.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: UserProfile,
    pub token: String,
}

/// The identity a valid bearer token resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
}

pub struct AuthManager {
    user_store: Arc<dyn UserStore>,
    tokens: TokenIssuer,
    hasher: WavenoteHasher,
}

impl AuthManager {
    pub fn new(user_store: Arc<dyn UserStore>, tokens: TokenIssuer) -> Self {
        AuthManager {
            user_store,
            tokens,
            hasher: WavenoteHasher::Argon2,
        }
    }

    pub fn register(&self, username: &str, email: &str, password: &str) -> AppResult<AuthOutcome> {
        let username = validation::normalize_username(username)?;
        let email = validation::normalize_email(email)?;
        validation::validate_new_password(password)?;

        if self.user_store.get_user_by_email(&email)?.is_some() {
            return Err(AppError::validation(EMAIL_TAKEN));
        }
        if self.user_store.get_user_by_username(&username)?.is_some() {
            return Err(AppError::validation(USERNAME_TAKEN));
        }

        let new_user = NewUser {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            email,
            password_hash: self.hasher.hash(password)?,
        };
        if let Err(err) = self.user_store.create_user(&new_user) {
            // Lost a race against a concurrent registration.
            return Err(match unique_violation_column(&err).as_deref() {
                Some("users.email") => AppError::validation(EMAIL_TAKEN),
                Some("users.username") => AppError::validation(USERNAME_TAKEN),
                _ => AppError::Server(err),
            });
        }
        info!("Registered user {} ({})", new_user.username, new_user.id);

        let user = self
            .user_store
            .get_user_by_id(&new_user.id)?
            .ok_or_else(|| anyhow::anyhow!("User {} vanished after insert", new_user.id))?;
        let token = self.tokens.issue(&user.id, &user.username)?;
        Ok(AuthOutcome {
            user: user.into(),
            token,
        })
    }

    pub fn login(&self, email: &str, password: &str) -> AppResult<AuthOutcome> {
        let email = validation::normalize_email(email)?;
        validation::validate_login_password(password)?;

        let mut user = match self.user_store.get_user_by_email(&email)? {
            Some(user) => user,
            None => {
                debug!("Login attempt for unknown email");
                return Err(AppError::auth(INVALID_CREDENTIALS));
            }
        };

        let verified = match self.hasher.verify(password, &user.password_hash) {
            Ok(verified) => verified,
            Err(err) => {
                warn!("Stored password hash for user {} is unreadable: {}", user.id, err);
                false
            }
        };
        if !verified {
            debug!("Wrong password for user {}", user.id);
            return Err(AppError::auth(INVALID_CREDENTIALS));
        }

        let now = now_unix_secs();
        self.user_store.update_last_login(&user.id, now)?;
        user.last_login = Some(now);

        let token = self.tokens.issue(&user.id, &user.username)?;
        Ok(AuthOutcome {
            user: user.into(),
            token,
        })
    }

    /// Issues a new token with the same identity as `token`.
    pub fn refresh(&self, token: Option<&str>) -> AppResult<String> {
        let token = match token.map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => return Err(AppError::validation(TOKEN_REQUIRED)),
        };

        let claims = self.tokens.verify(token).map_err(|err| {
            debug!("Refusing to refresh token: {}", err);
            AppError::auth(INVALID_TOKEN)
        })?;

        let user = self
            .user_store
            .get_user_by_id(&claims.id)?
            .ok_or_else(|| AppError::auth(USER_GONE))?;

        Ok(self.tokens.issue(&user.id, &claims.username)?)
    }

    /// Tokens are stateless, the client drops its copy. It stays valid until it expires.
    pub fn logout(&self) {
        debug!("Logout requested");
    }

    /// Resolves a bearer token to the user it was issued to.
    pub fn authenticate(&self, token: &str) -> AppResult<AuthenticatedUser> {
        let claims = self.tokens.verify(token).map_err(|err| {
            debug!("Rejected bearer token: {}", err);
            AppError::auth(INVALID_TOKEN)
        })?;

        let user = self
            .user_store
            .get_user_by_id(&claims.id)?
            .ok_or_else(|| AppError::auth(USER_NOT_FOUND))?;

        Ok(AuthenticatedUser {
            user_id: user.id,
            username: user.username,
        })
    }

    pub fn profile(&self, user_id: &str) -> AppResult<UserProfile> {
        self.user_store
            .get_user_by_id(user_id)?
            .map(UserProfile::from)
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))
    }

    pub fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> AppResult<UserProfile> {
        let update = ProfileUpdate {
            display_name: update.display_name.map(|name| name.trim().to_string()),
            profile_image_url: update.profile_image_url.map(|url| url.trim().to_string()),
        };
        if let Some(display_name) = &update.display_name {
            validation::validate_display_name(display_name)?;
        }
        if let Some(url) = &update.profile_image_url {
            validation::validate_profile_image_url(url)?;
        }

        self.user_store
            .update_profile(user_id, &update)?
            .map(UserProfile::from)
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))
    }

    pub fn public_profile(&self, user_id: &str) -> AppResult<PublicProfile> {
        self.user_store
            .get_user_by_id(user_id)?
            .map(PublicProfile::from)
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))
    }
}
