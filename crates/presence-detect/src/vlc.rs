//! VLC HTTP interface transport.
//!
//! Polls `/requests/status.json` with Basic auth (empty user, password only)
//! and normalizes VLC's status shape into a [`MediaSnapshot`].

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use crate::change::{Change, ChangeDetector};
use crate::error::DetectError;
use crate::snapshot::{
    MediaInfo, MediaSnapshot, MediaType, Playback, PlaybackStatus, VideoInfo,
};
use crate::source::{PollOutcome, StatusSource};

const STATUS_PATH: &str = "requests/status.json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Status source backed by VLC's HTTP interface.
#[derive(Debug)]
pub struct VlcHttpSource {
    http: Client,
    status_url: Url,
    password: Option<String>,
    detector: ChangeDetector,
    /// Set after a 401; the same credentials are never retried.
    auth_rejected: bool,
}

impl VlcHttpSource {
    /// Source for a local VLC instance on `port`.
    pub fn new(port: u16, password: Option<String>) -> Result<Self, DetectError> {
        Self::with_base_url(&format!("http://localhost:{port}/"), password)
    }

    /// Source for an arbitrary base URL (the status path is joined onto it).
    pub fn with_base_url(base_url: &str, password: Option<String>) -> Result<Self, DetectError> {
        let status_url = Url::parse(base_url)?.join(STATUS_PATH)?;
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            status_url,
            password: password.filter(|p| !p.is_empty()),
            detector: ChangeDetector::new(),
            auth_rejected: false,
        })
    }

    pub fn status_url(&self) -> &Url {
        &self.status_url
    }

    fn request(&self) -> RequestBuilder {
        let req = self.http.get(self.status_url.clone());
        match &self.password {
            Some(password) => req.basic_auth("", Some(password)),
            None => req,
        }
    }

    fn unavailable(&mut self) -> Result<PollOutcome, DetectError> {
        self.detector.forget();
        Ok(PollOutcome::Unavailable)
    }

    async fn fetch(&mut self, force: bool) -> Result<PollOutcome, DetectError> {
        if self.auth_rejected {
            return Err(DetectError::Unauthorized);
        }

        let resp = match self.request().send().await {
            Ok(resp) => resp,
            Err(e) if e.is_connect() || e.is_timeout() => {
                tracing::debug!(error = %e, "VLC is not running or HTTP interface is not accessible");
                return self.unavailable();
            }
            Err(e) => return Err(e.into()),
        };

        match resp.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => {
                tracing::error!(url = %self.status_url, "Authentication failed, check the VLC HTTP password");
                self.auth_rejected = true;
                return Err(DetectError::Unauthorized);
            }
            StatusCode::NOT_FOUND => {
                tracing::debug!("VLC is not running or HTTP interface is misconfigured");
                return self.unavailable();
            }
            other => {
                tracing::warn!(status = other.as_u16(), "Unexpected VLC status response");
                return self.unavailable();
            }
        }

        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                tracing::debug!(error = %e, "Timed out reading VLC status");
                return self.unavailable();
            }
            Err(e) => return Err(e.into()),
        };

        let now = self.detector.clock();
        let digest = match self.detector.check(&body, force) {
            Change::Unchanged => {
                self.detector.touch(now);
                return Ok(PollOutcome::Unchanged);
            }
            Change::Changed(digest) => digest,
        };

        let status: VlcStatus = serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(error = %e, "Invalid JSON in VLC response");
            DetectError::Malformed(e)
        })?;

        self.detector.accept(digest, now);
        Ok(PollOutcome::Snapshot(status.into_snapshot(now)))
    }

    /// Diagnose connectivity without touching change detection.
    ///
    /// Returns whether VLC answered and a message suitable for users.
    pub async fn check_status(&self) -> (bool, String) {
        match self.request().send().await {
            Ok(resp) => match resp.status() {
                StatusCode::OK => (true, "VLC is running and HTTP interface is accessible".into()),
                StatusCode::UNAUTHORIZED => (
                    false,
                    "VLC is running but authentication failed (incorrect password)".into(),
                ),
                StatusCode::NOT_FOUND => (
                    false,
                    "VLC is running but the HTTP interface is not properly configured".into(),
                ),
                other => (
                    false,
                    format!("VLC returned unexpected status code: {}", other.as_u16()),
                ),
            },
            Err(e) if e.is_timeout() => (false, "Connection to VLC timed out".into()),
            Err(e) if e.is_connect() => (
                false,
                "VLC is not running or HTTP interface is not enabled".into(),
            ),
            Err(e) => (false, format!("Error checking VLC status: {e}")),
        }
    }
}

impl StatusSource for VlcHttpSource {
    async fn poll(&mut self, force: bool) -> Result<PollOutcome, DetectError> {
        self.fetch(force).await
    }

    fn change_detector(&self) -> &ChangeDetector {
        &self.detector
    }

    fn describe(&self) -> String {
        format!("VLC HTTP interface at {}", self.status_url)
    }
}

// ── VLC status.json shape ────────────────────────────────────────

/// The subset of VLC's `status.json` the pipeline reads.
#[derive(Debug, Deserialize)]
pub struct VlcStatus {
    #[serde(default)]
    pub state: String,
    /// Elapsed seconds.
    #[serde(default)]
    pub time: f64,
    /// Duration in seconds.
    #[serde(default)]
    pub length: f64,
    /// Fractional progress 0..1.
    #[serde(default)]
    pub position: f64,
    /// `{"category": {"meta": {...}, "Stream 0": {...}}}`; VLC emits `[]` when empty.
    #[serde(default)]
    pub information: Value,
}

impl VlcStatus {
    fn categories(&self) -> Option<&Map<String, Value>> {
        self.information.get("category")?.as_object()
    }

    fn meta(&self) -> Option<&Map<String, Value>> {
        self.categories()?.get("meta")?.as_object()
    }

    /// Non-`meta` categories that describe a video stream.
    fn video_streams(&self) -> impl Iterator<Item = &Map<String, Value>> {
        self.categories()
            .into_iter()
            .flat_map(|c| c.iter())
            .filter(|(name, _)| name.as_str() != "meta")
            .filter_map(|(_, stream)| stream.as_object())
            .filter(|stream| stream.get("Type").and_then(Value::as_str) == Some("Video"))
    }

    /// Normalize into a snapshot taken at `now`.
    ///
    /// `time` becomes the elapsed position, `length` the duration and the
    /// fractional `position` is kept as `fraction`.
    pub fn into_snapshot(self, now: i64) -> MediaSnapshot {
        let status = PlaybackStatus::from_state(&self.state);

        let media_type = if self.video_streams().next().is_some() {
            MediaType::Video
        } else {
            MediaType::Audio
        };

        let video_info = self
            .video_streams()
            .next()
            .and_then(|stream| stream.get("Video_resolution")?.as_str())
            .and_then(VideoInfo::parse_resolution);

        let media = self.meta().map(media_from_meta).unwrap_or_default();

        let playback = Playback::new(
            self.time.max(0.0) as i64,
            self.length.max(0.0) as i64,
            Some(self.position.clamp(0.0, 1.0)),
        );

        MediaSnapshot {
            active: status != PlaybackStatus::Stopped,
            status,
            timestamp: now,
            media,
            playback,
            media_type,
            video_info,
        }
    }
}

fn media_from_meta(meta: &Map<String, Value>) -> MediaInfo {
    let text = |key: &str| meta.get(key).and_then(Value::as_str).map(str::to_string);

    MediaInfo {
        title: text("title")
            .or_else(|| text("filename"))
            .unwrap_or_else(|| "Unknown".into()),
        artist: text("artist"),
        album: text("album"),
        date: text("date"),
        artwork_url: text("artwork_url"),
    }
    .normalized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const AUDIO_STATUS: &str = r#"{
        "state": "playing",
        "time": 30,
        "length": 300,
        "position": 0.1,
        "information": {
            "category": {
                "meta": {
                    "title": "Money",
                    "artist": "Pink Floyd",
                    "album": "The Dark Side of the Moon",
                    "date": "1973",
                    "artwork_url": "file:///tmp/art.jpg"
                },
                "Stream 0": { "Type": "Audio", "Codec": "MPEG Audio layer 1/2/3" }
            }
        }
    }"#;

    const VIDEO_STATUS: &str = r#"{
        "state": "paused",
        "time": 600,
        "length": 2700,
        "position": 0.22,
        "information": {
            "category": {
                "meta": { "filename": "The.Office.S03E10.720p.HDTV.x264-DIMENSION.mkv" },
                "Stream 0": { "Type": "Video", "Video_resolution": "1280x720" },
                "Stream 1": { "Type": "Audio" }
            }
        }
    }"#;

    #[test]
    fn test_convert_audio_status() {
        let status: VlcStatus = serde_json::from_str(AUDIO_STATUS).unwrap();
        let snap = status.into_snapshot(1000);

        assert!(snap.active);
        assert_eq!(snap.status, PlaybackStatus::Playing);
        assert_eq!(snap.media_type, MediaType::Audio);
        assert_eq!(snap.media.title, "Money");
        assert_eq!(snap.media.artist.as_deref(), Some("Pink Floyd"));
        assert_eq!(snap.media.date.as_deref(), Some("1973"));
        assert_eq!(snap.playback.position, 30);
        assert_eq!(snap.playback.duration, 300);
        assert_eq!(snap.playback.fraction, Some(0.1));
        assert_eq!(snap.video_info, None);
        assert_eq!(snap.timestamp, 1000);
    }

    #[test]
    fn test_convert_video_status() {
        let status: VlcStatus = serde_json::from_str(VIDEO_STATUS).unwrap();
        let snap = status.into_snapshot(1000);

        assert_eq!(snap.status, PlaybackStatus::Paused);
        assert_eq!(snap.media_type, MediaType::Video);
        assert_eq!(snap.media.title, "The.Office.S03E10.720p.HDTV.x264-DIMENSION.mkv");
        assert_eq!(snap.media.artist, None);
        assert_eq!(snap.video_info, Some(VideoInfo { width: 1280, height: 720 }));
    }

    #[test]
    fn test_convert_stopped_without_information() {
        let status: VlcStatus =
            serde_json::from_str(r#"{"state":"stopped","time":0,"length":0,"position":0,"information":[]}"#)
                .unwrap();
        let snap = status.into_snapshot(1000);

        assert!(!snap.active);
        assert_eq!(snap.status, PlaybackStatus::Stopped);
        assert_eq!(snap.media_type, MediaType::Audio);
        assert!(!snap.media.has_title());
    }

    #[tokio::test]
    async fn test_poll_sends_password_and_dedups() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/requests/status.json"))
            .and(header("Authorization", "Basic OnNlY3JldA=="))
            .respond_with(ResponseTemplate::new(200).set_body_string(AUDIO_STATUS))
            .mount(&server)
            .await;

        let mut source = VlcHttpSource::with_base_url(&server.uri(), Some("secret".into())).unwrap();

        let first = source.poll(false).await.unwrap();
        assert!(matches!(first, PollOutcome::Snapshot(ref s) if s.media.title == "Money"));

        assert_eq!(source.poll(false).await.unwrap(), PollOutcome::Unchanged);
        assert!(matches!(source.poll(true).await.unwrap(), PollOutcome::Snapshot(_)));
        assert!(source.change_detector().last_seen().is_some());
    }

    #[tokio::test]
    async fn test_not_found_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut source = VlcHttpSource::with_base_url(&server.uri(), None).unwrap();
        assert_eq!(source.poll(false).await.unwrap(), PollOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        // Bind then drop a listener so the port is very likely closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut source =
            VlcHttpSource::with_base_url(&format!("http://127.0.0.1:{port}/"), None).unwrap();
        assert_eq!(source.poll(false).await.unwrap(), PollOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_unauthorized_is_latched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let mut source = VlcHttpSource::with_base_url(&server.uri(), Some("wrong".into())).unwrap();
        assert!(matches!(source.poll(false).await, Err(DetectError::Unauthorized)));
        // Second poll must not hit the server again.
        assert!(matches!(source.poll(false).await, Err(DetectError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_malformed_json_is_not_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let mut source = VlcHttpSource::with_base_url(&server.uri(), None).unwrap();
        assert!(matches!(source.poll(false).await, Err(DetectError::Malformed(_))));
        // The bad payload never became the baseline.
        assert!(matches!(source.poll(false).await, Err(DetectError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_check_status_messages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let source = VlcHttpSource::with_base_url(&server.uri(), None).unwrap();
        let (running, message) = source.check_status().await;
        assert!(!running);
        assert!(message.contains("authentication failed"));
    }

    #[test]
    fn test_status_url_join() {
        let source = VlcHttpSource::new(9080, None).unwrap();
        assert_eq!(
            source.status_url().as_str(),
            "http://localhost:9080/requests/status.json"
        );
    }
}
