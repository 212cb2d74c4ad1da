use std::fmt;

use serde::{Deserialize, Serialize};

/// What a media title most likely refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    TvShow,
    Movie,
    Anime,
    #[default]
    Video,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TvShow => "tv_show",
            Self::Movie => "movie",
            Self::Anime => "anime",
            Self::Video => "video",
        })
    }
}

/// Fields extracted from a title. Which ones are set depends on the content type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetadata {
    /// The title exactly as reported by the player.
    pub original_title: String,
    /// The title with container extension and one trailing release tag removed.
    pub clean_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie_name: Option<String>,
    /// Release year, kept as text ("2010").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anime_name: Option<String>,
    /// Generically cleaned title for unrecognized videos.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Result of [`classify`](crate::classify).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentClassification {
    pub content_type: ContentType,
    #[serde(flatten)]
    pub metadata: ContentMetadata,
}

impl ContentClassification {
    /// Title suitable for display, e.g. `"Show S03E10"` or `"Inception (2010)"`.
    ///
    /// Falls back to the original title when the classifier extracted nothing
    /// useful.
    pub fn display_title(&self) -> String {
        let m = &self.metadata;
        let shown = match self.content_type {
            ContentType::TvShow => m.show_name.as_deref().filter(|s| !s.is_empty()).map(|name| {
                match (m.season, m.episode) {
                    (Some(s), Some(e)) => format!("{name} S{s:02}E{e:02}"),
                    _ => name.to_string(),
                }
            }),
            ContentType::Movie => m.movie_name.as_deref().filter(|s| !s.is_empty()).map(|name| {
                match &m.year {
                    Some(year) => format!("{name} ({year})"),
                    None => name.to_string(),
                }
            }),
            ContentType::Anime => m.anime_name.as_deref().filter(|s| !s.is_empty()).map(|name| {
                match m.episode {
                    Some(ep) => format!("{name} - Episode {ep}"),
                    None => name.to_string(),
                }
            }),
            ContentType::Video => m.title.clone().filter(|s| !s.is_empty()),
        };
        shown.unwrap_or_else(|| m.original_title.clone())
    }

    /// Phrase handed to an image search when no catalogue match exists.
    pub fn search_phrase(&self) -> String {
        let m = &self.metadata;
        let named = |name: &Option<String>| name.as_deref().filter(|s| !s.is_empty()).map(str::to_string);
        match self.content_type {
            ContentType::TvShow => named(&m.show_name).map(|name| format!("{name} tv show poster")),
            ContentType::Movie => named(&m.movie_name).map(|name| match &m.year {
                Some(year) => format!("{name} {year} movie poster"),
                None => format!("{name} movie poster"),
            }),
            ContentType::Anime => named(&m.anime_name).map(|name| format!("{name} anime cover")),
            ContentType::Video => None,
        }
        .unwrap_or_else(|| format!("{} cover", m.original_title))
    }

    /// Label for the large image tooltip, if the content type has one.
    pub fn watching_label(&self) -> Option<&'static str> {
        match self.content_type {
            ContentType::TvShow => Some("Watching TV Show"),
            ContentType::Movie => Some("Watching a Movie"),
            ContentType::Anime => Some("Watching Anime"),
            ContentType::Video => None,
        }
    }
}
