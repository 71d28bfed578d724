use crate::error::{AppError, AppResult};

pub const PROJECT_NAME_MAX_LEN: usize = 100;
pub const SONG_TITLE_MAX_LEN: usize = 200;
pub const SONG_KEY_MAX_LEN: usize = 16;
pub const BPM_RANGE: std::ops::RangeInclusive<u32> = 1..=999;
pub const COMMENT_MAX_LEN: usize = 2000;

fn required_text(value: &str, field: &str, max_len: usize) -> AppResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    if len > max_len {
        return Err(AppError::validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(trimmed.to_string())
}

pub fn project_name(name: &str) -> AppResult<String> {
    required_text(name, "Project name", PROJECT_NAME_MAX_LEN)
}

pub fn song_title(title: &str) -> AppResult<String> {
    required_text(title, "Song title", SONG_TITLE_MAX_LEN)
}

pub fn bpm(bpm: u32) -> AppResult<u32> {
    if !BPM_RANGE.contains(&bpm) {
        return Err(AppError::validation(format!(
            "BPM must be between {} and {}",
            BPM_RANGE.start(),
            BPM_RANGE.end()
        )));
    }
    Ok(bpm)
}

/// An empty key is allowed, it clears the field on update.
pub fn song_key(key: &str) -> AppResult<String> {
    let trimmed = key.trim();
    if trimmed.chars().count() > SONG_KEY_MAX_LEN {
        return Err(AppError::validation(format!(
            "Key must be at most {} characters",
            SONG_KEY_MAX_LEN
        )));
    }
    Ok(trimmed.to_string())
}

pub fn file_url(url: &str) -> AppResult<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("File URL is required"));
    }
    Ok(trimmed.to_string())
}

pub fn duration_secs(duration: f64) -> AppResult<f64> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(AppError::validation("Duration must be a positive number of seconds"));
    }
    Ok(duration)
}

/// The timestamp must fall inside the audio: `0 <= timestamp <= duration`.
pub fn feedback_timestamp(timestamp: f64, duration: f64) -> AppResult<f64> {
    if !timestamp.is_finite() || timestamp < 0.0 || timestamp > duration {
        return Err(AppError::validation(format!(
            "Timestamp must be between 0 and {} seconds",
            duration
        )));
    }
    Ok(timestamp)
}

pub fn comment(comment: &str) -> AppResult<String> {
    required_text(comment, "Comment", COMMENT_MAX_LEN)
}

pub fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}
