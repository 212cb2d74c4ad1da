//! Cover art resolution.
//!
//! Lookup order for a snapshot:
//!
//! 1. an `http(s)` artwork URL reported by the player,
//! 2. the TTL cache (negative results included),
//! 3. MusicBrainz: releases, then recordings, then a looser artist-only
//!    release search; the best-scoring releases are probed on the Cover Art
//!    Archive until one has a front cover,
//! 4. a web image search for the classified title.
//!
//! Whatever step 3/4 produce, including nothing, is cached.

pub mod cache;
pub mod query;
pub mod score;

use std::time::Duration;

use presence_api::{ImageSearch, MetadataSearch};
use presence_detect::{MediaSnapshot, MediaType};
use presence_parse::ContentClassification;

pub use cache::{cache_key, CoverArtCache};
pub use query::{build_fallback_query, build_query, SearchFields};
pub use score::{
    fuzzy_match, rank_recordings, rank_releases, score_release, Candidate, MIN_PROBE_SCORE,
};

/// Resolves an artwork URL for the media being played.
pub struct CoverArtResolver<M, I> {
    metadata: M,
    images: Option<I>,
    cache: CoverArtCache,
}

impl<M: MetadataSearch, I: ImageSearch> CoverArtResolver<M, I> {
    /// `images = None` disables the image search fallback.
    pub fn new(metadata: M, images: Option<I>, ttl: Duration) -> Self {
        Self {
            metadata,
            images,
            cache: CoverArtCache::new(ttl),
        }
    }

    pub fn cache(&self) -> &CoverArtCache {
        &self.cache
    }

    /// Artwork URL for `snapshot`, or `None` when nothing suitable exists.
    ///
    /// Upstream failures are logged and treated as "not found"; this never
    /// fails.
    #[tracing::instrument(skip_all, fields(title = %snapshot.media.title))]
    pub async fn resolve(
        &mut self,
        snapshot: &MediaSnapshot,
        classification: Option<&ContentClassification>,
    ) -> Option<String> {
        if let Some(url) = snapshot.media.artwork_url.as_deref().filter(|u| is_http_url(u)) {
            return Some(url.to_string());
        }

        let key = cache_key(&snapshot.media);
        if let Some(hit) = key.as_deref().and_then(|k| self.cache.get(k)) {
            tracing::trace!(url = ?hit, "Cover art cache hit");
            return hit;
        }

        self.cache.purge_expired();
        let url = self.lookup(snapshot, classification).await;
        tracing::debug!(url = ?url, "Resolved cover art");

        if let Some(key) = key {
            self.cache.insert(key, url.clone());
        }
        url
    }

    async fn lookup(
        &self,
        snapshot: &MediaSnapshot,
        classification: Option<&ContentClassification>,
    ) -> Option<String> {
        let fields = SearchFields::from_media(&snapshot.media);

        // A bare video file name is not a meaningful recording query.
        let searchable = snapshot.media_type == MediaType::Audio
            || fields.artist.is_some()
            || fields.album.is_some();
        if searchable {
            if let Some(url) = self.search_catalogue(&fields).await {
                return Some(url);
            }
        }

        let images = self.images.as_ref()?;
        if !snapshot.media.has_title() {
            return None;
        }
        let phrase = match classification {
            Some(c) => c.search_phrase(),
            None => presence_parse::classify(&snapshot.media.title).search_phrase(),
        };
        match images.find_image(&phrase).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, %phrase, "Image search failed");
                None
            }
        }
    }

    async fn search_catalogue(&self, fields: &SearchFields<'_>) -> Option<String> {
        let Some(query) = build_query(fields) else {
            tracing::debug!("Insufficient metadata for a catalogue search");
            return None;
        };

        if fields.album.is_some() && (fields.artist.is_some() || fields.title.is_some()) {
            if let Some(url) = self.search_releases(&query, fields).await {
                return Some(url);
            }
        }

        if fields.title.is_some() && fields.artist.is_some() {
            match self.metadata.search_recordings(&query).await {
                Ok(recordings) => {
                    if let Some(url) = self.probe(rank_recordings(&recordings, fields)).await {
                        return Some(url);
                    }
                }
                Err(e) => tracing::warn!(error = %e, %query, "Recording search failed"),
            }
        }

        if let Some(fallback) = build_fallback_query(fields).filter(|f| *f != query) {
            tracing::debug!(query = %fallback, "Trying fallback search");
            return self.search_releases(&fallback, fields).await;
        }
        None
    }

    async fn search_releases(&self, query: &str, fields: &SearchFields<'_>) -> Option<String> {
        match self.metadata.search_releases(query).await {
            Ok(releases) => self.probe(rank_releases(&releases, fields)).await,
            Err(e) => {
                tracing::warn!(error = %e, query, "Release search failed");
                None
            }
        }
    }

    /// First candidate, best first, whose front cover exists.
    async fn probe(&self, candidates: Vec<Candidate>) -> Option<String> {
        for candidate in candidates.iter().filter(|c| c.score >= MIN_PROBE_SCORE) {
            tracing::debug!(
                release = %candidate.release_title,
                artist = %candidate.artist,
                score = candidate.score,
                "Trying release"
            );
            match self.metadata.front_cover(&candidate.release_id).await {
                Ok(Some(url)) => return Some(url),
                Ok(None) => {}
                Err(e) => tracing::debug!(error = %e, "Cover probe failed"),
            }
        }
        None
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;
    use presence_api::musicbrainz::{Artist, ArtistCredit, Recording, Release};
    use presence_detect::{MediaInfo, Playback, PlaybackStatus};

    /// Call log shared between a fake and the test body.
    type Calls = Arc<Mutex<Vec<String>>>;

    #[derive(Default)]
    struct FakeCatalogue {
        releases: HashMap<String, Vec<Release>>,
        recordings: Vec<Recording>,
        covers: Vec<String>,
        calls: Calls,
    }

    impl MetadataSearch for FakeCatalogue {
        type Error = io::Error;

        async fn search_releases(&self, query: &str) -> Result<Vec<Release>, io::Error> {
            self.calls.lock().unwrap().push(format!("release {query}"));
            Ok(self.releases.get(query).cloned().unwrap_or_default())
        }

        async fn search_recordings(&self, query: &str) -> Result<Vec<Recording>, io::Error> {
            self.calls.lock().unwrap().push(format!("recording {query}"));
            Ok(self.recordings.clone())
        }

        async fn front_cover(&self, release_id: &str) -> Result<Option<String>, io::Error> {
            self.calls.lock().unwrap().push(format!("head {release_id}"));
            Ok(self
                .covers
                .iter()
                .any(|c| c == release_id)
                .then(|| format!("https://covers.test/release/{release_id}/front-500")))
        }
    }

    #[derive(Default)]
    struct FakeImages {
        calls: Calls,
    }

    impl ImageSearch for FakeImages {
        type Error = io::Error;

        async fn find_image(&self, phrase: &str) -> Result<Option<String>, io::Error> {
            self.calls.lock().unwrap().push(phrase.to_string());
            Ok(Some(format!("https://images.test/{}", phrase.replace(' ', "+"))))
        }
    }

    fn release(id: &str, title: &str, artist: &str) -> Release {
        Release {
            id: id.into(),
            title: Some(title.into()),
            score: Some(100),
            status: Some("Official".into()),
            artist_credit: vec![ArtistCredit {
                name: artist.into(),
                artist: Some(Artist {
                    name: artist.into(),
                    aliases: vec![],
                }),
            }],
            ..Default::default()
        }
    }

    fn snapshot(media: MediaInfo, media_type: MediaType) -> MediaSnapshot {
        MediaSnapshot {
            active: true,
            status: PlaybackStatus::Playing,
            timestamp: 1000,
            media,
            playback: Playback::new(30, 300, None),
            media_type,
            video_info: None,
        }
    }

    fn money() -> MediaSnapshot {
        snapshot(
            MediaInfo {
                title: "Money".into(),
                artist: Some("Pink Floyd".into()),
                album: Some("The Dark Side of the Moon".into()),
                ..Default::default()
            },
            MediaType::Audio,
        )
    }

    const MONEY_QUERY: &str = r#"Money AND artist:Pink Floyd AND release:"The Dark Side of the Moon""#;

    fn resolver(
        catalogue: FakeCatalogue,
        images: Option<FakeImages>,
    ) -> CoverArtResolver<FakeCatalogue, FakeImages> {
        CoverArtResolver::new(catalogue, images, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_player_artwork_url_wins() {
        let calls = Calls::default();
        let mut resolver = resolver(
            FakeCatalogue {
                calls: calls.clone(),
                ..Default::default()
            },
            None,
        );
        let mut snap = money();
        snap.media.artwork_url = Some("https://example.com/art.jpg".into());

        assert_eq!(
            resolver.resolve(&snap, None).await.as_deref(),
            Some("https://example.com/art.jpg")
        );
        assert!(calls.lock().unwrap().is_empty());

        // Local artwork (file://) is not usable remotely.
        snap.media.artwork_url = Some("file:///tmp/art.jpg".into());
        resolver.resolve(&snap, None).await;
        assert!(!calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_release_search_and_cache_hit() {
        let calls = Calls::default();
        let catalogue = FakeCatalogue {
            releases: HashMap::from([(
                MONEY_QUERY.to_string(),
                vec![
                    release("live", "Pulse", "Pink Floyd"),
                    release("dsotm", "The Dark Side of the Moon", "Pink Floyd"),
                ],
            )]),
            covers: vec!["dsotm".into(), "live".into()],
            calls: calls.clone(),
            ..Default::default()
        };
        let mut resolver = resolver(catalogue, None);

        let url = resolver.resolve(&money(), None).await;
        assert_eq!(
            url.as_deref(),
            Some("https://covers.test/release/dsotm/front-500")
        );
        assert_eq!(
            *calls.lock().unwrap(),
            [format!("release {MONEY_QUERY}"), "head dsotm".to_string()]
        );

        calls.lock().unwrap().clear();
        assert_eq!(resolver.resolve(&money(), None).await, url);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_falls_through_to_recordings() {
        let calls = Calls::default();
        let catalogue = FakeCatalogue {
            recordings: vec![Recording {
                id: "t1".into(),
                title: Some("Money".into()),
                score: Some(100),
                artist_credit: vec![],
                releases: vec![release("dsotm", "The Dark Side of the Moon", "Pink Floyd")],
            }],
            covers: vec!["dsotm".into()],
            calls: calls.clone(),
            ..Default::default()
        };
        let mut resolver = resolver(catalogue, None);

        assert!(resolver.resolve(&money(), None).await.is_some());
        assert_eq!(
            *calls.lock().unwrap(),
            [
                format!("release {MONEY_QUERY}"),
                format!("recording {MONEY_QUERY}"),
                "head dsotm".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_low_scores_are_not_probed() {
        let calls = Calls::default();
        let mut weak = release("weak", "Something Else", "Someone Else");
        weak.score = Some(0);
        weak.status = None;
        let catalogue = FakeCatalogue {
            releases: HashMap::from([(MONEY_QUERY.to_string(), vec![weak])]),
            covers: vec!["weak".into()],
            calls: calls.clone(),
            ..Default::default()
        };
        let mut resolver = resolver(catalogue, None);

        assert_eq!(resolver.resolve(&money(), None).await, None);
        assert!(!calls.lock().unwrap().iter().any(|c| c.starts_with("head")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_result_cached_until_ttl() {
        let calls = Calls::default();
        let mut resolver = resolver(
            FakeCatalogue {
                calls: calls.clone(),
                ..Default::default()
            },
            None,
        );

        assert_eq!(resolver.resolve(&money(), None).await, None);
        let first = calls.lock().unwrap().len();
        assert!(first > 0);

        tokio::time::advance(Duration::from_secs(1800)).await;
        assert_eq!(resolver.resolve(&money(), None).await, None);
        assert_eq!(calls.lock().unwrap().len(), first);

        tokio::time::advance(Duration::from_secs(1801)).await;
        resolver.resolve(&money(), None).await;
        assert_eq!(calls.lock().unwrap().len(), first * 2);
    }

    #[tokio::test]
    async fn test_video_uses_image_search() {
        let catalogue_calls = Calls::default();
        let image_calls = Calls::default();
        let mut resolver = resolver(
            FakeCatalogue {
                calls: catalogue_calls.clone(),
                ..Default::default()
            },
            Some(FakeImages {
                calls: image_calls.clone(),
            }),
        );
        let snap = snapshot(
            MediaInfo {
                title: "Inception.2010.1080p.BluRay.mkv".into(),
                ..Default::default()
            },
            MediaType::Video,
        );
        let classification = presence_parse::classify(&snap.media.title);

        let url = resolver.resolve(&snap, Some(&classification)).await;
        assert_eq!(
            url.as_deref(),
            Some("https://images.test/Inception+2010+movie+poster")
        );
        assert!(catalogue_calls.lock().unwrap().is_empty());
        assert_eq!(*image_calls.lock().unwrap(), ["Inception 2010 movie poster"]);
    }

    #[tokio::test]
    async fn test_audio_miss_falls_back_to_image_search() {
        let image_calls = Calls::default();
        let mut resolver = resolver(
            FakeCatalogue::default(),
            Some(FakeImages {
                calls: image_calls.clone(),
            }),
        );

        assert!(resolver.resolve(&money(), None).await.is_some());
        assert_eq!(*image_calls.lock().unwrap(), ["Money cover"]);
    }
}
