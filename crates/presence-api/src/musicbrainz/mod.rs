pub mod client;
pub mod error;
pub mod types;

pub use client::MusicBrainzClient;
pub use error::MusicBrainzError;
pub use types::{Alias, Artist, ArtistCredit, Recording, Release, ReleaseGroup};
