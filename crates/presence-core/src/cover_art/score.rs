//! Candidate scoring for catalogue search results.

use std::sync::LazyLock;

use presence_api::musicbrainz::{Recording, Release};
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::query::SearchFields;

/// Candidates below this score are never probed for artwork.
pub const MIN_PROBE_SCORE: u32 = 30;

const ARTIST_MATCH: i64 = 100;
const ARTIST_PARTIAL: i64 = 70;
const ALBUM_MATCH: i64 = 100;
const ALBUM_PARTIAL: i64 = 70;
const TITLE_MATCH: i64 = 80;
const TITLE_PARTIAL: i64 = 50;
const YEAR_MATCH: i64 = 40;
const OFFICIAL: i64 = 30;
const COMPILATION: i64 = -15;
const LIVE: i64 = -25;
const REMIX: i64 = -20;
/// Secondary types known only by id.
const UNNAMED_SECONDARY: i64 = -20;

static RE_NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());

fn fold(s: &str) -> String {
    let lowered = s.nfkc().collect::<String>().to_lowercase();
    RE_NON_WORD.replace_all(&lowered, "").into_owned()
}

/// Loose equality: equal after NFKC, lowercasing and punctuation removal, or
/// one containing the other when both are longer than five characters.
pub fn fuzzy_match(a: &str, b: &str) -> bool {
    let (a, b) = (fold(a), fold(b));
    if a == b {
        return true;
    }
    a.chars().count() > 5 && b.chars().count() > 5 && (a.contains(&b) || b.contains(&a))
}

/// Plain case-insensitive containment in either direction.
fn overlaps(a: &str, b: &str) -> bool {
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    a.contains(&b) || b.contains(&a)
}

/// `full` when any candidate fuzzy-matches `wanted`, `partial` when one overlaps it.
fn match_bonus<'c>(
    wanted: &str,
    candidates: impl IntoIterator<Item = &'c str>,
    full: i64,
    partial: i64,
) -> i64 {
    let candidates: Vec<&str> = candidates.into_iter().filter(|c| !c.is_empty()).collect();
    if candidates.iter().any(|c| fuzzy_match(wanted, c)) {
        full
    } else if candidates.iter().any(|c| overlaps(wanted, c)) {
        partial
    } else {
        0
    }
}

/// Score `release` (optionally reached through `recording`) against the media fields.
pub fn score_release(recording: Option<&Recording>, release: &Release, fields: &SearchFields<'_>) -> u32 {
    let base = recording
        .and_then(|r| r.score)
        .or(release.score)
        .unwrap_or(0)
        .min(100);
    let mut score = i64::from(base);

    if let Some(artist) = fields.artist {
        score += match_bonus(artist, release.artist_names(), ARTIST_MATCH, ARTIST_PARTIAL);
    }

    if let (Some(album), Some(release_title)) = (fields.album, release.title.as_deref()) {
        score += match_bonus(album, [release_title], ALBUM_MATCH, ALBUM_PARTIAL);
    }

    if let (Some(title), Some(recording_title)) =
        (fields.title, recording.and_then(|r| r.title.as_deref()))
    {
        score += match_bonus(title, [recording_title], TITLE_MATCH, TITLE_PARTIAL);
    }

    if let (Some(year), Some(date)) = (fields.year(), release.date.as_deref()) {
        if date.starts_with(year) {
            score += YEAR_MATCH;
        }
    }

    if release.status.as_deref() == Some("Official") {
        score += OFFICIAL;
    }

    if let Some(group) = &release.release_group {
        if group.secondary_types.is_empty() {
            if !group.secondary_type_ids.is_empty() {
                score += UNNAMED_SECONDARY;
            }
        } else {
            for kind in &group.secondary_types {
                score += match kind.as_str() {
                    "Compilation" => COMPILATION,
                    "Live" => LIVE,
                    "Remix" => REMIX,
                    _ => 0,
                };
            }
        }
    }

    u32::try_from(score.max(0)).unwrap_or(u32::MAX)
}

/// A release that may carry the wanted artwork.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub release_id: String,
    pub release_title: String,
    pub artist: String,
    pub score: u32,
}

impl Candidate {
    fn new(release: &Release, artist: &str, score: u32) -> Self {
        Self {
            release_id: release.id.clone(),
            release_title: release.title.clone().unwrap_or_default(),
            artist: artist.to_string(),
            score,
        }
    }
}

fn sorted(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

/// Score release search results, best first.
pub fn rank_releases(releases: &[Release], fields: &SearchFields<'_>) -> Vec<Candidate> {
    sorted(
        releases
            .iter()
            .map(|release| {
                Candidate::new(release, release.primary_artist(), score_release(None, release, fields))
            })
            .collect(),
    )
}

/// Score every (recording, release) pair of recording search results, best first.
pub fn rank_recordings(recordings: &[Recording], fields: &SearchFields<'_>) -> Vec<Candidate> {
    sorted(
        recordings
            .iter()
            .flat_map(|recording| {
                let artist = recording.artist_credit.first().map_or("", |c| c.name.as_str());
                recording.releases.iter().map(move |release| {
                    Candidate::new(release, artist, score_release(Some(recording), release, fields))
                })
            })
            .collect(),
    )
}
