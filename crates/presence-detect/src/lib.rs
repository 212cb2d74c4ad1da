pub mod change;
pub mod error;
pub mod extrapolate;
pub mod file;
pub mod snapshot;
pub mod source;
pub mod vlc;

pub use change::{digest, Change, ChangeDetector};
pub use error::DetectError;
pub use extrapolate::PositionExtrapolator;
pub use file::StatusFileSource;
pub use snapshot::{MediaInfo, MediaSnapshot, MediaType, Playback, PlaybackStatus, VideoInfo};
pub use source::{AnySource, PollOutcome, StatusSource};
pub use vlc::VlcHttpSource;
