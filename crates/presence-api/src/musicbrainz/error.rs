use thiserror::Error;

/// Errors from the MusicBrainz and Cover Art Archive clients.
#[derive(Debug, Error)]
pub enum MusicBrainzError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}
