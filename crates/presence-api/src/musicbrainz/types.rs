//! Response shapes of the MusicBrainz `ws/2` search endpoints.
//!
//! Only the fields used for scoring are modelled; everything else is ignored.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ReleaseSearchResponse {
    #[serde(default)]
    pub releases: Vec<Release>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordingSearchResponse {
    #[serde(default)]
    pub recordings: Vec<Recording>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Release {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Search relevance, 0-100.
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, rename = "artist-credit")]
    pub artist_credit: Vec<ArtistCredit>,
    #[serde(default, rename = "release-group")]
    pub release_group: Option<ReleaseGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Recording {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default, rename = "artist-credit")]
    pub artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    pub releases: Vec<Release>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistCredit {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: Option<Artist>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<Alias>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Alias {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseGroup {
    #[serde(default, rename = "secondary-types")]
    pub secondary_types: Vec<String>,
    #[serde(default, rename = "secondary-type-ids")]
    pub secondary_type_ids: Vec<String>,
}

impl Release {
    /// Credited artist names plus their aliases.
    pub fn artist_names(&self) -> impl Iterator<Item = &str> {
        self.artist_credit
            .iter()
            .filter_map(|credit| credit.artist.as_ref().map(|artist| (credit, artist)))
            .flat_map(|(credit, artist)| {
                std::iter::once(credit.name.as_str())
                    .chain(artist.aliases.iter().map(|alias| alias.name.as_str()))
            })
    }

    /// First credited artist, for logging.
    pub fn primary_artist(&self) -> &str {
        self.artist_credit.first().map_or("", |c| c.name.as_str())
    }
}
