use std::sync::LazyLock;

use regex::Regex;

use crate::content::{ContentClassification, ContentMetadata, ContentType};

// ── Cleaning ─────────────────────────────────────────────────────

static RE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(mkv|mp4|avi|mov|wmv|flv|webm)$").unwrap());

/// One trailing release group or quality tag.
static RE_RELEASE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-[A-Za-z0-9]+|\d{3,4}p|x264|x265|HEVC|WEB-DL|BluRay|WEBRip)$").unwrap()
});

// ── Episode / movie / anime patterns ─────────────────────────────

static RE_TV: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)(.*?)[\.\s_-]*S(\d{1,2})[\.\s_-]*E(\d{1,2})").unwrap(),
        Regex::new(r"(?i)(.*?)[\.\s_-]*(\d{1,2})x(\d{1,2})").unwrap(),
        Regex::new(r"(?i)(.*?)[\.\s_-]*Season[\.\s_-]*(\d{1,2})[\.\s_-]*Episode[\.\s_-]*(\d{1,2})")
            .unwrap(),
    ]
});

static RE_MOVIE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(.+?)[\.\s\[\(_-]+(19\d{2}|20\d{2})[\]\)\._\s-]").unwrap()
});

static RE_ANIME_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(sub|dub)\.").unwrap());

static RE_ANIME_EPISODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s\._](\d{1,3})[-\s\._]").unwrap());

// ── Normalization ────────────────────────────────────────────────

static RE_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\._\-]").unwrap());

static RE_TAGS_AND_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]|\(.*?\)|[\._\-]").unwrap());

static RE_GENERIC_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]|\(.*?\)|\.mkv|\.mp4|\.avi|[\._\-]").unwrap());

/// Strip the container extension, then a single trailing release tag.
pub fn clean_title(title: &str) -> String {
    let without_ext = RE_EXTENSION.replace(title, "");
    RE_RELEASE_TAG.replace(&without_ext, "").into_owned()
}

/// Classify a media title.
///
/// Patterns are tried in order (TV episode, movie, anime, generic) and the
/// first match wins.
pub fn classify(title: &str) -> ContentClassification {
    let clean = clean_title(title);
    let metadata = ContentMetadata {
        original_title: title.to_string(),
        clean_title: clean.clone(),
        ..Default::default()
    };

    if clean.trim().is_empty() {
        return ContentClassification {
            content_type: ContentType::Video,
            metadata,
        };
    }

    let classification = try_tv(&clean, metadata.clone())
        .or_else(|| try_movie(&clean, metadata.clone()))
        .or_else(|| try_anime(&clean, metadata.clone()))
        .unwrap_or_else(|| generic(&clean, metadata));

    tracing::trace!(
        title,
        content_type = %classification.content_type,
        "Classified media title"
    );
    classification
}

fn try_tv(clean: &str, mut metadata: ContentMetadata) -> Option<ContentClassification> {
    let caps = RE_TV.iter().find_map(|re| re.captures(clean))?;
    metadata.show_name = Some(squash(&RE_SEPARATORS.replace_all(&caps[1], " ")));
    metadata.season = caps[2].parse().ok();
    metadata.episode = caps[3].parse().ok();
    Some(ContentClassification {
        content_type: ContentType::TvShow,
        metadata,
    })
}

fn try_movie(clean: &str, mut metadata: ContentMetadata) -> Option<ContentClassification> {
    let caps = RE_MOVIE.captures(clean)?;
    metadata.movie_name = Some(squash(&RE_SEPARATORS.replace_all(&caps[1], " ")));
    metadata.year = Some(caps[2].to_string());
    Some(ContentClassification {
        content_type: ContentType::Movie,
        metadata,
    })
}

fn try_anime(clean: &str, mut metadata: ContentMetadata) -> Option<ContentClassification> {
    let bracketed = clean.contains('[') && clean.contains(']');
    if !bracketed && !RE_ANIME_MARKER.is_match(clean) {
        return None;
    }

    match RE_ANIME_EPISODE.captures(clean) {
        Some(caps) => {
            let start = caps.get(0).map_or(0, |m| m.start());
            let before = &clean[..start];
            metadata.anime_name = Some(squash(&RE_TAGS_AND_SEPARATORS.replace_all(before, " ")));
            metadata.episode = caps[1].parse().ok();
        }
        None => {
            metadata.anime_name = Some(squash(&RE_TAGS_AND_SEPARATORS.replace_all(clean, " ")));
        }
    }

    Some(ContentClassification {
        content_type: ContentType::Anime,
        metadata,
    })
}

fn generic(clean: &str, mut metadata: ContentMetadata) -> ContentClassification {
    metadata.title = Some(squash(&RE_GENERIC_NOISE.replace_all(clean, " ")));
    ContentClassification {
        content_type: ContentType::Video,
        metadata,
    }
}

/// Trim and collapse runs of whitespace.
fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
