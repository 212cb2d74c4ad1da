use thiserror::Error;

/// Errors from reading the player status.
///
/// "Player not running" is not an error: sources report it as
/// [`PollOutcome::Unavailable`](crate::PollOutcome::Unavailable).
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("authentication rejected by the player, check the HTTP password")]
    Unauthorized,

    #[error("malformed status payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid status URL: {0}")]
    Url(#[from] url::ParseError),
}
