//! Status-file transport.
//!
//! A companion script inside the player writes a JSON file that already
//! mirrors the normalized snapshot shape. The file's modification time is
//! checked first so an idle player costs one `stat` per tick.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Deserialize;

use crate::change::{Change, ChangeDetector};
use crate::error::DetectError;
use crate::snapshot::{MediaInfo, MediaSnapshot, MediaType, Playback, PlaybackStatus, VideoInfo};
use crate::source::{PollOutcome, StatusSource};

/// File name written by the player-side companion script.
pub const STATUS_FILE_NAME: &str = "vlc_discord_status.json";

/// Status source backed by a polled JSON file.
#[derive(Debug)]
pub struct StatusFileSource {
    path: PathBuf,
    detector: ChangeDetector,
    last_modified: Option<SystemTime>,
}

impl StatusFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            detector: ChangeDetector::new(),
            last_modified: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&mut self, force: bool) -> Result<PollOutcome, DetectError> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Status file not found");
                self.detector.forget();
                self.last_modified = None;
                return Ok(PollOutcome::Unavailable);
            }
            Err(e) => return Err(e.into()),
        };

        let now = self.detector.clock();
        let modified = metadata.modified().ok();
        if !force && modified.is_some() && modified == self.last_modified {
            self.detector.touch(now);
            return Ok(PollOutcome::Unchanged);
        }

        let content = tokio::fs::read(&self.path).await?;
        self.last_modified = modified;

        let digest = match self.detector.check(&content, force) {
            Change::Unchanged => {
                self.detector.touch(now);
                return Ok(PollOutcome::Unchanged);
            }
            Change::Changed(digest) => digest,
        };

        let file: StatusFile = serde_json::from_slice(&content).map_err(|e| {
            tracing::error!(error = %e, path = %self.path.display(), "Invalid JSON in status file");
            // Re-read next tick even if the mtime does not move.
            self.last_modified = None;
            DetectError::Malformed(e)
        })?;

        self.detector.accept(digest, now);
        Ok(PollOutcome::Snapshot(file.into_snapshot(now)))
    }
}

impl StatusSource for StatusFileSource {
    async fn poll(&mut self, force: bool) -> Result<PollOutcome, DetectError> {
        self.read(force).await
    }

    fn change_detector(&self) -> &ChangeDetector {
        &self.detector
    }

    fn describe(&self) -> String {
        format!("status file {}", self.path.display())
    }
}

// ── File shape ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StatusFile {
    #[serde(default)]
    active: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    media: MediaInfo,
    #[serde(default)]
    playback: FilePlayback,
    #[serde(default)]
    media_type: Option<MediaType>,
    #[serde(default)]
    video_info: Option<VideoInfo>,
}

/// Older writers only emit `position`/`duration` (seconds); newer ones add
/// `time`, which then takes precedence as the elapsed position.
#[derive(Debug, Default, Deserialize)]
struct FilePlayback {
    #[serde(default)]
    position: Option<f64>,
    #[serde(default)]
    time: Option<f64>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    fraction: Option<f64>,
}

impl StatusFile {
    fn into_snapshot(self, now: i64) -> MediaSnapshot {
        let status = PlaybackStatus::from_state(&self.status);
        let media = self.media.normalized();

        // Without an explicit type, tagged music is the better guess.
        let media_type = self.media_type.unwrap_or(if media.artist.is_some() || media.album.is_some() {
            MediaType::Audio
        } else {
            MediaType::Video
        });

        let elapsed = self.playback.time.or(self.playback.position).unwrap_or(0.0);
        let playback = Playback::new(
            elapsed.max(0.0) as i64,
            self.playback.duration.unwrap_or(0.0).max(0.0) as i64,
            self.playback.fraction,
        );

        MediaSnapshot {
            active: self.active && status != PlaybackStatus::Stopped,
            status,
            timestamp: now,
            media,
            playback,
            media_type,
            video_info: self.video_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom, Write};

    const STATUS: &str = r#"{
        "active": true,
        "status": "playing",
        "timestamp": 1700000000,
        "media": { "title": "Money", "artist": "Pink Floyd", "album": "" },
        "playback": { "position": 30, "duration": 300 }
    }"#;

    fn write_status(file: &mut tempfile::NamedTempFile, content: &str) {
        let f = file.as_file_mut();
        f.set_len(0).unwrap();
        f.seek(SeekFrom::Start(0)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.sync_all().unwrap();
    }

    #[test]
    fn test_file_shape_conversion() {
        let file: StatusFile = serde_json::from_str(STATUS).unwrap();
        let snap = file.into_snapshot(1000);

        assert!(snap.is_playing());
        assert_eq!(snap.media.album, None);
        assert_eq!(snap.media_type, MediaType::Audio);
        assert_eq!(snap.playback.position, 30);
        assert_eq!(snap.playback.duration, 300);
        assert_eq!(snap.timestamp, 1000);
    }

    #[test]
    fn test_time_takes_precedence_over_position() {
        let file: StatusFile = serde_json::from_str(
            r#"{"active":true,"status":"paused","media":{"title":"clip.mp4"},
                "playback":{"position":0.5,"time":42,"duration":84,"fraction":0.5},
                "media_type":"video","video_info":{"width":640,"height":480}}"#,
        )
        .unwrap();
        let snap = file.into_snapshot(1000);

        assert_eq!(snap.status, PlaybackStatus::Paused);
        assert_eq!(snap.media_type, MediaType::Video);
        assert_eq!(snap.playback.position, 42);
        assert_eq!(snap.playback.fraction, Some(0.5));
        assert_eq!(snap.video_info, Some(VideoInfo { width: 640, height: 480 }));
    }

    #[test]
    fn test_idle_is_inactive() {
        let file: StatusFile =
            serde_json::from_str(r#"{"active":true,"status":"idle"}"#).unwrap();
        let snap = file.into_snapshot(1000);
        assert!(!snap.active);
        assert_eq!(snap.status, PlaybackStatus::Stopped);
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = StatusFileSource::new(dir.path().join(STATUS_FILE_NAME));
        assert_eq!(source.poll(false).await.unwrap(), PollOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_poll_and_dedup() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_status(&mut file, STATUS);

        let mut source = StatusFileSource::new(file.path());
        assert!(matches!(source.poll(false).await.unwrap(), PollOutcome::Snapshot(_)));
        assert_eq!(source.poll(false).await.unwrap(), PollOutcome::Unchanged);

        // Same bytes rewritten: mtime may move, digest does not.
        write_status(&mut file, STATUS);
        assert_eq!(source.poll(false).await.unwrap(), PollOutcome::Unchanged);

        assert!(matches!(source.poll(true).await.unwrap(), PollOutcome::Snapshot(_)));
    }

    #[tokio::test]
    async fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_status(&mut file, "{ truncated");

        let mut source = StatusFileSource::new(file.path());
        assert!(matches!(source.poll(false).await, Err(DetectError::Malformed(_))));
    }
}
