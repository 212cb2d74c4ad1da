//! Presence state machine: snapshot in, presence action out.
//!
//! Every state has its own render function; all of them are pure so the
//! whole mapping can be tested without a sink or a clock.

use std::fmt;

use presence_detect::{MediaSnapshot, MediaType, PlaybackStatus};
use presence_parse::{ContentClassification, ContentType};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// Durations at or above this are live streams or garbage; no end timestamp.
const MAX_END_DURATION: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceState {
    /// Player closed, idle, or silent for longer than the status timeout.
    Stopped,
    /// No status has ever been read.
    NoStatus,
    Playing,
    Paused,
}

impl PresenceState {
    /// Pick the state for the latest (possibly synthetic) snapshot.
    pub fn dispatch(snapshot: Option<&MediaSnapshot>) -> Self {
        match snapshot {
            None => Self::NoStatus,
            Some(s) if !s.active || s.status == PlaybackStatus::Stopped => Self::Stopped,
            Some(s) if s.status == PlaybackStatus::Playing => Self::Playing,
            Some(_) => Self::Paused,
        }
    }

    /// States whose presence is cleared rather than shown.
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Stopped | Self::NoStatus)
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stopped => "stopped",
            Self::NoStatus => "no status",
            Self::Playing => "playing",
            Self::Paused => "paused",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Listening,
    Watching,
}

/// One presence update, ready for a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresencePayload {
    pub details: String,
    pub state: String,
    pub large_image: String,
    pub large_text: String,
    pub small_image: String,
    pub small_text: String,
    /// Epoch seconds at which playback (virtually) started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    pub activity_type: ActivityType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceAction {
    Clear,
    Update(PresencePayload),
}

/// Smallest text limit honoured from the config.
pub const MIN_TEXT_LIMIT: usize = 16;

/// Asset keys and limits used when rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceSettings {
    pub large_image: String,
    pub playing_image: String,
    pub paused_image: String,
    pub text_limit: usize,
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl PresenceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            large_image: config.discord.large_image.clone(),
            playing_image: config.discord.playing_image.clone(),
            paused_image: config.discord.paused_image.clone(),
            text_limit: config.general.text_limit.max(MIN_TEXT_LIMIT),
        }
    }
}

/// What the cycle learned about the media besides the snapshot itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Enrichment<'a> {
    pub classification: Option<&'a ContentClassification>,
    pub artwork_url: Option<&'a str>,
}

/// Cut `text` to at most `limit` characters, ending in `...` when shortened.
pub fn format_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit <= 3 {
        return text.chars().take(limit).collect();
    }
    let keep = limit.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Render the action for `state`. `snapshot` must be present for
/// `Playing`/`Paused`; without one those states clear too.
pub fn render(
    state: PresenceState,
    snapshot: Option<&MediaSnapshot>,
    enrichment: &Enrichment<'_>,
    settings: &PresenceSettings,
    now: i64,
) -> PresenceAction {
    match (state, snapshot) {
        (PresenceState::Playing, Some(s)) => render_playing(s, enrichment, settings, now),
        (PresenceState::Paused, Some(s)) => render_paused(s, enrichment, settings),
        (PresenceState::Stopped, _) => render_stopped(),
        (PresenceState::NoStatus, _) | (_, None) => render_no_status(),
    }
}

fn render_stopped() -> PresenceAction {
    PresenceAction::Clear
}

fn render_no_status() -> PresenceAction {
    PresenceAction::Clear
}

fn render_playing(
    snapshot: &MediaSnapshot,
    enrichment: &Enrichment<'_>,
    settings: &PresenceSettings,
    now: i64,
) -> PresenceAction {
    let start = now.saturating_sub(snapshot.playback.position);
    let duration = snapshot.playback.duration;
    let end = (duration > 0 && duration < MAX_END_DURATION).then_some(start + duration);

    let default_state = match snapshot.media_type {
        MediaType::Video => "Now watching",
        MediaType::Audio => "by Unknown Artist",
    };

    PresenceAction::Update(PresencePayload {
        start: Some(start),
        end,
        ..base_payload(
            snapshot,
            enrichment,
            settings,
            default_state,
            &settings.playing_image,
            "Playing",
        )
    })
}

fn render_paused(
    snapshot: &MediaSnapshot,
    enrichment: &Enrichment<'_>,
    settings: &PresenceSettings,
) -> PresenceAction {
    PresenceAction::Update(base_payload(
        snapshot,
        enrichment,
        settings,
        "Paused",
        &settings.paused_image,
        "Paused",
    ))
}

fn base_payload(
    snapshot: &MediaSnapshot,
    enrichment: &Enrichment<'_>,
    settings: &PresenceSettings,
    default_state: &str,
    small_image: &str,
    status_label: &str,
) -> PresencePayload {
    let small_text = match snapshot.video_info.as_ref().filter(|v| v.is_known()) {
        Some(video) => format!("{status_label} • {video}"),
        None => status_label.to_string(),
    };

    PresencePayload {
        details: format_text(&details(snapshot, enrichment), settings.text_limit),
        state: format_text(
            &state_line(snapshot).unwrap_or_else(|| default_state.to_string()),
            settings.text_limit,
        ),
        large_image: enrichment
            .artwork_url
            .map_or_else(|| settings.large_image.clone(), str::to_string),
        large_text: large_text(snapshot, enrichment).to_string(),
        small_image: small_image.to_string(),
        small_text,
        start: None,
        end: None,
        activity_type: match snapshot.media_type {
            MediaType::Audio => ActivityType::Listening,
            MediaType::Video => ActivityType::Watching,
        },
    }
}

fn recognized<'a>(
    snapshot: &MediaSnapshot,
    enrichment: &Enrichment<'a>,
) -> Option<&'a ContentClassification> {
    enrichment
        .classification
        .filter(|c| snapshot.media_type == MediaType::Video && c.content_type != ContentType::Video)
}

fn details(snapshot: &MediaSnapshot, enrichment: &Enrichment<'_>) -> String {
    if let Some(c) = recognized(snapshot, enrichment) {
        return c.display_title();
    }
    if snapshot.media.title.is_empty() {
        "Unknown".to_string()
    } else {
        snapshot.media.title.clone()
    }
}

fn state_line(snapshot: &MediaSnapshot) -> Option<String> {
    match (snapshot.media.artist.as_deref(), snapshot.media.album.as_deref()) {
        (Some(artist), Some(album)) => Some(format!("by {artist} • {album}")),
        (Some(artist), None) => Some(format!("by {artist}")),
        (None, Some(album)) => Some(format!("from {album}")),
        (None, None) => None,
    }
}

fn large_text(snapshot: &MediaSnapshot, enrichment: &Enrichment<'_>) -> &'static str {
    recognized(snapshot, enrichment)
        .and_then(ContentClassification::watching_label)
        .unwrap_or("VLC Media Player")
}
