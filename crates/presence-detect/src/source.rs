use std::future::Future;

use crate::change::ChangeDetector;
use crate::error::DetectError;
use crate::file::StatusFileSource;
use crate::snapshot::MediaSnapshot;
use crate::vlc::VlcHttpSource;

/// Outcome of one status read.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// New content, normalized.
    Snapshot(MediaSnapshot),
    /// Same content as the last accepted read; reuse the previous state.
    Unchanged,
    /// The player is not reachable (not running, refused, timed out).
    Unavailable,
}

/// A polled source of player status.
pub trait StatusSource: Send {
    /// Read the current status. `force` re-processes content even if unchanged.
    fn poll(&mut self, force: bool) -> impl Future<Output = Result<PollOutcome, DetectError>> + Send;

    /// Change/staleness bookkeeping for this source.
    fn change_detector(&self) -> &ChangeDetector;

    /// Epoch seconds used to timestamp this source's reads.
    fn clock(&self) -> i64 {
        self.change_detector().clock()
    }

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// The transports the pipeline can be configured with.
#[derive(Debug)]
pub enum AnySource {
    Http(VlcHttpSource),
    File(StatusFileSource),
}

impl StatusSource for AnySource {
    async fn poll(&mut self, force: bool) -> Result<PollOutcome, DetectError> {
        match self {
            Self::Http(source) => source.poll(force).await,
            Self::File(source) => source.poll(force).await,
        }
    }

    fn change_detector(&self) -> &ChangeDetector {
        match self {
            Self::Http(source) => source.change_detector(),
            Self::File(source) => source.change_detector(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Http(source) => source.describe(),
            Self::File(source) => source.describe(),
        }
    }
}

impl From<VlcHttpSource> for AnySource {
    fn from(source: VlcHttpSource) -> Self {
        Self::Http(source)
    }
}

impl From<StatusFileSource> for AnySource {
    fn from(source: StatusFileSource) -> Self {
        Self::File(source)
    }
}
