use std::fmt;

use serde::{Deserialize, Serialize};

/// Playback state reported by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl PlaybackStatus {
    /// Map a player state string. Anything unrecognized (e.g. "idle") is stopped.
    pub fn from_state(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "playing" => Self::Playing,
            "paused" => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Whether the current item is music or video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Audio,
    Video,
}

/// Descriptive metadata of the playing item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Title tag, or the file name when the item has no title tag.
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Release date tag (usually a year).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
}

impl MediaInfo {
    /// Collapse blank optional tags to `None` and trim the title.
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            artist: non_blank(self.artist),
            album: non_blank(self.album),
            date: non_blank(self.date),
            artwork_url: non_blank(self.artwork_url),
        }
    }

    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Playback progress, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Playback {
    /// Elapsed time in seconds.
    pub position: i64,
    /// Total length in seconds; 0 when unknown (e.g. live streams).
    pub duration: i64,
    /// Fractional progress (0.0–1.0) when the player reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraction: Option<f64>,
}

impl Playback {
    /// Build a playback value that honours `0 <= position <= duration`.
    pub fn new(position: i64, duration: i64, fraction: Option<f64>) -> Self {
        let duration = duration.max(0);
        let mut position = position.max(0);
        if duration > 0 {
            position = position.min(duration);
        }
        Self {
            position,
            duration,
            fraction,
        }
    }

    /// Seconds left until the end, never negative.
    pub fn remaining(&self) -> i64 {
        (self.duration - self.position).max(0)
    }
}

/// Video stream dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
}

impl VideoInfo {
    /// Parse a `"WIDTHxHEIGHT"` resolution string.
    pub fn parse_resolution(s: &str) -> Option<Self> {
        let (w, h) = s.trim().split_once(['x', 'X'])?;
        Some(Self {
            width: w.trim().parse().ok()?,
            height: h.trim().parse().ok()?,
        })
    }

    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl fmt::Display for VideoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Normalized view of the player state at one point in time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaSnapshot {
    pub active: bool,
    pub status: PlaybackStatus,
    /// Epoch seconds at which the snapshot was taken.
    pub timestamp: i64,
    pub media: MediaInfo,
    pub playback: Playback,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_info: Option<VideoInfo>,
}

impl MediaSnapshot {
    pub fn is_playing(&self) -> bool {
        self.active && self.status == PlaybackStatus::Playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_state() {
        assert_eq!(PlaybackStatus::from_state("playing"), PlaybackStatus::Playing);
        assert_eq!(PlaybackStatus::from_state("Paused"), PlaybackStatus::Paused);
        assert_eq!(PlaybackStatus::from_state("stopped"), PlaybackStatus::Stopped);
        assert_eq!(PlaybackStatus::from_state("idle"), PlaybackStatus::Stopped);
    }

    #[test]
    fn test_playback_clamps_position() {
        let p = Playback::new(400, 300, None);
        assert_eq!(p.position, 300);
        assert_eq!(p.remaining(), 0);

        let live = Playback::new(400, 0, None);
        assert_eq!(live.position, 400);
        assert_eq!(live.remaining(), 0);

        let negative = Playback::new(-5, 100, None);
        assert_eq!(negative.position, 0);
        assert_eq!(negative.remaining(), 100);
    }

    #[test]
    fn test_parse_resolution() {
        let v = VideoInfo::parse_resolution("1920x1080").unwrap();
        assert_eq!((v.width, v.height), (1920, 1080));
        assert_eq!(v.to_string(), "1920x1080");
        assert!(VideoInfo::parse_resolution("1920").is_none());
        assert!(VideoInfo::parse_resolution("axb").is_none());
        assert!(!VideoInfo::parse_resolution("0x0").unwrap().is_known());
    }

    #[test]
    fn test_media_info_normalized() {
        let info = MediaInfo {
            title: "  Money ".into(),
            artist: Some("".into()),
            album: Some(" The Dark Side of the Moon ".into()),
            date: None,
            artwork_url: Some("   ".into()),
        }
        .normalized();
        assert_eq!(info.title, "Money");
        assert_eq!(info.artist, None);
        assert_eq!(info.album.as_deref(), Some("The Dark Side of the Moon"));
        assert_eq!(info.artwork_url, None);
    }
}
