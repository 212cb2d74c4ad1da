use std::path::PathBuf;

use clap::Parser;
use presence_core::config::{AppConfig, SourceKind};

#[derive(Debug, Parser)]
#[command(name = "vlc-presence")]
#[command(author, version, about = "Show what VLC is playing as Discord rich presence")]
pub struct Cli {
    /// Path to config file (defaults to the platform config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// VLC HTTP interface port (implies the HTTP source)
    #[arg(long)]
    pub port: Option<u16>,

    /// VLC HTTP interface password (implies the HTTP source)
    #[arg(long)]
    pub password: Option<String>,

    /// Read status from this JSON file instead of the HTTP interface
    #[arg(long, conflicts_with_all = ["port", "password"])]
    pub status_file: Option<PathBuf>,

    /// Seconds between status polls
    #[arg(long)]
    pub interval: Option<u64>,

    /// Skip cover art lookups
    #[arg(long)]
    pub no_cover_art: bool,

    /// Check that VLC is reachable, then exit
    #[arg(long)]
    pub check: bool,

    /// Write the effective config to the config file, then exit
    #[arg(long)]
    pub write_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut AppConfig) {
        if self.port.is_some() || self.password.is_some() {
            config.source.kind = SourceKind::Http;
        }
        if let Some(port) = self.port {
            config.vlc.port = Some(port);
        }
        if let Some(password) = &self.password {
            config.vlc.password = Some(password.clone());
        }
        if let Some(path) = &self.status_file {
            config.source.kind = SourceKind::File;
            config.source.status_file = Some(path.clone());
        }
        if let Some(secs) = self.interval {
            config.general.poll_interval_secs = secs;
        }
        if self.no_cover_art {
            config.cover_art.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("vlc-presence").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_port_selects_http_source() {
        let mut config = AppConfig::default();
        parse(&["--port", "8080", "--password", "secret"]).apply(&mut config);

        assert_eq!(config.source.kind, SourceKind::Http);
        assert_eq!(config.vlc.port, Some(8080));
        assert_eq!(config.vlc.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_status_file_selects_file_source() {
        let mut config = AppConfig::default();
        parse(&["--status-file", "/tmp/status.json", "--no-cover-art"]).apply(&mut config);

        assert_eq!(config.source.kind, SourceKind::File);
        assert_eq!(
            config.source.status_file,
            Some(PathBuf::from("/tmp/status.json"))
        );
        assert!(!config.cover_art.enabled);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = AppConfig::default();
        parse(&[]).apply(&mut config);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_status_file_conflicts_with_port() {
        let result = Cli::try_parse_from(["vlc-presence", "--port", "1", "--status-file", "x"]);
        assert!(result.is_err());
    }
}
