use presence_detect::DetectError;
use thiserror::Error;

use crate::sink::SinkError;

#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("config error: {0}")]
    Config(String),

    #[error("no usable status source: {0}")]
    NoSource(String),

    #[error("status source error: {0}")]
    Detect(#[from] DetectError),

    #[error("presence sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
