use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use presence_detect::file::STATUS_FILE_NAME;
use presence_detect::{AnySource, StatusFileSource, VlcHttpSource};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PresenceError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Port of VLC's HTTP interface when neither the config nor vlcrc names one.
pub const DEFAULT_VLC_PORT: u16 = 9080;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub source: SourceConfig,
    pub vlc: VlcConfig,
    pub discord: DiscordConfig,
    pub cover_art: CoverArtConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub poll_interval_secs: u64,
    pub status_timeout_secs: u64,
    pub error_backoff_secs: u64,
    pub text_limit: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 1,
            status_timeout_secs: 5,
            error_backoff_secs: 5,
            text_limit: 128,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// HTTP when VLC's web interface is enabled, else a discovered status file.
    #[default]
    Auto,
    Http,
    File,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VlcConfig {
    pub read_vlcrc: bool,
    /// Overrides the platform vlcrc location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlcrc_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_enabled: Option<bool>,
}

impl Default for VlcConfig {
    fn default() -> Self {
        Self {
            read_vlcrc: true,
            vlcrc_path: None,
            port: None,
            password: None,
            http_enabled: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub client_id: String,
    pub large_image: String,
    pub playing_image: String,
    pub paused_image: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            client_id: "1345358480671772683".into(),
            large_image: "logo".into(),
            playing_image: "playing".into(),
            paused_image: "paused".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverArtConfig {
    pub enabled: bool,
    pub image_search: bool,
    pub cache_ttl_secs: u64,
}

impl Default for CoverArtConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            image_search: true,
            cache_ttl_secs: 3600,
        }
    }
}

impl AppConfig {
    /// Load config: user file (if exists) merged over built-in defaults.
    pub fn load() -> Result<Self, PresenceError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, PresenceError> {
        let mut table: toml::Table =
            toml::from_str(DEFAULT_CONFIG).map_err(|e| PresenceError::Config(e.to_string()))?;

        if path.exists() {
            let user_str = std::fs::read_to_string(path)?;
            let user: toml::Table = toml::from_str(&user_str)
                .map_err(|e| PresenceError::Config(format!("{}: {e}", path.display())))?;
            merge_tables(&mut table, user);
            tracing::debug!(path = %path.display(), "Loaded user config");
        }

        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| PresenceError::Config(e.to_string()))
    }

    /// Save current config to the user config file.
    pub fn save(&self) -> Result<PathBuf, PresenceError> {
        let path = Self::config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), PresenceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PresenceError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Directory for rolling log files.
    pub fn log_dir() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "vlc-presence")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.general.poll_interval_secs.max(1))
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.general.error_backoff_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cover_art.cache_ttl_secs)
    }

    /// VLC's own HTTP settings, when reading vlcrc is enabled and the file exists.
    pub fn vlcrc(&self) -> Option<VlcrcSettings> {
        if !self.vlc.read_vlcrc {
            return None;
        }
        let path = self.vlc.vlcrc_path.clone().or_else(vlcrc_path)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let settings = parse_vlcrc(&content);
                tracing::info!(
                    path = %path.display(),
                    http_enabled = settings.http_enabled,
                    port = ?settings.port,
                    "Read VLC config"
                );
                Some(settings)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "VLC config not readable, run VLC once to create it"
                );
                None
            }
        }
    }

    /// Decide which status transport to use.
    pub fn resolve_source(&self) -> Result<SourceSpec, PresenceError> {
        self.resolve_source_with(self.vlcrc().as_ref(), &status_file_candidates())
    }

    /// [`resolve_source`](Self::resolve_source) with explicit vlcrc settings
    /// and status-file candidates.
    pub fn resolve_source_with(
        &self,
        vlcrc: Option<&VlcrcSettings>,
        candidates: &[PathBuf],
    ) -> Result<SourceSpec, PresenceError> {
        let http = || SourceSpec::Http {
            port: self
                .vlc
                .port
                .or_else(|| vlcrc.and_then(|r| r.port))
                .unwrap_or(DEFAULT_VLC_PORT),
            password: self
                .vlc
                .password
                .clone()
                .or_else(|| vlcrc.and_then(|r| r.password.clone()))
                .filter(|p| !p.is_empty()),
        };
        let discovered = || candidates.iter().find(|p| p.is_file()).cloned();

        match self.source.kind {
            SourceKind::Http => Ok(http()),
            SourceKind::File => self
                .source
                .status_file
                .clone()
                .or_else(discovered)
                .map(SourceSpec::File)
                .ok_or_else(|| PresenceError::NoSource("no status file configured or found".into())),
            SourceKind::Auto => {
                let http_enabled = self
                    .vlc
                    .http_enabled
                    .or_else(|| vlcrc.map(|r| r.http_enabled))
                    .unwrap_or(false);
                if http_enabled {
                    return Ok(http());
                }
                if let Some(path) = self.source.status_file.clone().or_else(discovered) {
                    return Ok(SourceSpec::File(path));
                }
                Err(PresenceError::NoSource(
                    "VLC's HTTP interface is not enabled and no status file was found".into(),
                ))
            }
        }
    }
}

/// Overlay `overlay` onto `base`, recursing into tables.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(inner) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, inner),
                _ => {
                    base.insert(key, toml::Value::Table(inner));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}

// ── Status source selection ──────────────────────────────────────

/// A resolved status transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Http { port: u16, password: Option<String> },
    File(PathBuf),
}

impl SourceSpec {
    pub fn build(&self) -> Result<AnySource, PresenceError> {
        Ok(match self {
            Self::Http { port, password } => VlcHttpSource::new(*port, password.clone())?.into(),
            Self::File(path) => StatusFileSource::new(path).into(),
        })
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { port, .. } => write!(f, "VLC HTTP interface on port {port}"),
            Self::File(path) => write!(f, "status file {}", path.display()),
        }
    }
}

// ── vlcrc ────────────────────────────────────────────────────────

static RE_VLCRC_PASSWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^http-password=(.+)$").unwrap());
static RE_VLCRC_PORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^http-port=(\d+)").unwrap());
static RE_VLCRC_EXTRAINTF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^extraintf=(.+)$").unwrap());

/// HTTP interface settings read from VLC's `vlcrc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlcrcSettings {
    pub port: Option<u16>,
    pub password: Option<String>,
    pub http_enabled: bool,
}

/// Parse the relevant lines of a `vlcrc`. Commented-out keys are ignored.
pub fn parse_vlcrc(content: &str) -> VlcrcSettings {
    let password = RE_VLCRC_PASSWORD
        .captures(content)
        .map(|c| c[1].trim().to_string())
        .filter(|p| !p.is_empty());
    let port = RE_VLCRC_PORT
        .captures(content)
        .and_then(|c| c[1].parse().ok());
    let http_enabled = RE_VLCRC_EXTRAINTF
        .captures(content)
        .is_some_and(|c| c[1].contains("http"));

    VlcrcSettings {
        port,
        password,
        http_enabled,
    }
}

/// Platform location of VLC's `vlcrc`.
pub fn vlcrc_path() -> Option<PathBuf> {
    let base = BaseDirs::new()?;
    if cfg!(target_os = "macos") {
        Some(
            base.home_dir()
                .join("Library/Preferences/org.videolan.vlc/vlcrc"),
        )
    } else {
        // %APPDATA%\vlc on Windows, $XDG_CONFIG_HOME/vlc elsewhere.
        Some(base.config_dir().join("vlc").join("vlcrc"))
    }
}

/// Where the player-side script may write its status file, in lookup order.
pub fn status_file_candidates() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(base) = BaseDirs::new() {
        if cfg!(target_os = "macos") {
            dirs.push(
                base.home_dir()
                    .join("Library/Application Support/org.videolan.vlc"),
            );
        } else if cfg!(windows) {
            dirs.push(base.config_dir().join("vlc"));
        } else {
            dirs.push(base.data_dir().join("vlc"));
            dirs.push(base.config_dir().join("vlc"));
        }
    }
    dirs.push(std::env::temp_dir());
    dirs.into_iter().map(|d| d.join(STATUS_FILE_NAME)).collect()
}
