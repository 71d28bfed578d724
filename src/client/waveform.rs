//! Geometry and playback state behind a waveform view with feedback markers.

use crate::library::Feedback;

/// Finite and strictly greater than zero. NaN is rejected.
fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Maps a click at `click_x` pixels into a container `width` pixels wide to a
/// time in a track of `duration` seconds. Clicks outside the container clamp
/// to its edges.
pub fn timestamp_for_click(click_x: f64, width: f64, duration: f64) -> Option<f64> {
    if !is_positive(width) || !is_positive(duration) || !click_x.is_finite() {
        return None;
    }
    let fraction = (click_x / width).clamp(0.0, 1.0);
    Some((fraction * duration).clamp(0.0, duration))
}

/// Horizontal position of a marker, in percent of the waveform width.
pub fn marker_position_percent(timestamp: f64, duration: f64) -> Option<f64> {
    if !is_positive(duration) || !timestamp.is_finite() {
        return None;
    }
    Some(timestamp / duration * 100.0)
}

/// `m:ss`, e.g. `3:07`. Negative or non-finite input reads as `0:00`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackMarker {
    pub feedback_id: String,
    pub position_percent: f64,
    pub label: String,
}

/// One marker per feedback entry. Empty until the duration is known.
pub fn markers(feedback: &[Feedback], duration: f64) -> Vec<FeedbackMarker> {
    feedback
        .iter()
        .filter_map(|f| {
            marker_position_percent(f.timestamp, duration).map(|position_percent| FeedbackMarker {
                feedback_id: f.id.clone(),
                position_percent,
                label: format!("{} @ {}", f.author.username, format_time(f.timestamp)),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackIcon {
    Play,
    Pause,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,
}

impl PlaybackState {
    /// Audio loaded.
    pub fn ready(&mut self, duration: f64) {
        self.duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        self.current_time = 0.0;
        self.is_playing = false;
    }

    /// Progress tick from the player. Ignored while paused.
    pub fn audio_process(&mut self, current_time: f64) {
        if self.is_playing && current_time.is_finite() {
            self.current_time = current_time.clamp(0.0, self.duration);
        }
    }

    /// Returns whether playback is running afterwards. Nothing plays before `ready`.
    pub fn toggle_play_pause(&mut self) -> bool {
        if self.duration > 0.0 {
            self.is_playing = !self.is_playing;
        }
        self.is_playing
    }

    pub fn finish(&mut self) {
        self.is_playing = false;
        self.current_time = self.duration;
    }

    pub fn icon(&self) -> PlaybackIcon {
        if self.is_playing {
            PlaybackIcon::Pause
        } else {
            PlaybackIcon::Play
        }
    }

    /// `current / total`, e.g. `0:42 / 3:07`.
    pub fn time_label(&self) -> String {
        format!("{} / {}", format_time(self.current_time), format_time(self.duration))
    }
}
