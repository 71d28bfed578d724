use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::OnceLock;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const DISPLAY_NAME_MAX_LEN: usize = 100;
pub const PROFILE_IMAGE_URL_MAX_LEN: usize = 2048;

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
            .expect("email regex is valid")
    })
}

/// Trims the username and checks its length.
pub fn normalize_username(username: &str) -> AppResult<String> {
    let trimmed = username.trim();
    let len = trimmed.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(AppError::validation(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Trims and lower-cases the email, fails if it is not an address.
pub fn normalize_email(email: &str) -> AppResult<String> {
    let normalized = email.trim().to_lowercase();
    if normalized.len() > 254 || !email_regex().is_match(&normalized) {
        return Err(AppError::validation("Must be a valid email address"));
    }
    Ok(normalized)
}

pub fn validate_new_password(password: &str) -> AppResult<()> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LEN
        )));
    }
    Ok(())
}

pub fn validate_login_password(password: &str) -> AppResult<()> {
    if password.is_empty() {
        return Err(AppError::validation("Password is required"));
    }
    Ok(())
}

pub fn validate_display_name(display_name: &str) -> AppResult<()> {
    if display_name.trim().chars().count() > DISPLAY_NAME_MAX_LEN {
        return Err(AppError::validation(format!(
            "Display name must be at most {} characters",
            DISPLAY_NAME_MAX_LEN
        )));
    }
    Ok(())
}

pub fn validate_profile_image_url(url: &str) -> AppResult<()> {
    if url.len() > PROFILE_IMAGE_URL_MAX_LEN {
        return Err(AppError::validation(format!(
            "Profile image URL must be at most {} characters",
            PROFILE_IMAGE_URL_MAX_LEN
        )));
    }
    Ok(())
}
