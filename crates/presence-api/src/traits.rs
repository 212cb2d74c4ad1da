//! Seams between the cover-art resolver and the services it queries.
//!
//! The resolver is generic over these traits so tests can substitute
//! in-memory fakes and the image-page scraper can be swapped out.

use std::future::Future;

use crate::musicbrainz::{Recording, Release};

/// A music metadata catalogue with cover art lookup.
pub trait MetadataSearch: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Search releases (albums) with a Lucene-style query.
    fn search_releases(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<Release>, Self::Error>> + Send;

    /// Search recordings (tracks). Each recording lists the releases it appears on.
    fn search_recordings(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<Recording>, Self::Error>> + Send;

    /// URL of the front cover of `release_id`, if one exists.
    fn front_cover(
        &self,
        release_id: &str,
    ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;
}

/// A general-purpose image search used when the catalogue has no match.
pub trait ImageSearch: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Find one image URL for a free-text phrase.
    fn find_image(
        &self,
        phrase: &str,
    ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;
}
