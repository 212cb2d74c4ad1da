//! Clients for the upstream services used to find cover art.

pub mod image_search;
pub mod musicbrainz;
pub mod traits;

pub use image_search::{GoogleImageSearch, ImageSearchError};
pub use musicbrainz::{MusicBrainzClient, MusicBrainzError};
pub use traits::{ImageSearch, MetadataSearch};
