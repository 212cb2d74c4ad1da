use std::collections::HashMap;
use std::time::Duration;

use presence_detect::MediaInfo;
use tokio::time::Instant;

/// Cache key for a media item: MD5 of the present `artist`, `album` and
/// `title` fields joined with `|`. `None` when all three are empty.
pub fn cache_key(media: &MediaInfo) -> Option<String> {
    let parts: Vec<String> = [
        ("artist", media.artist.as_deref()),
        ("album", media.album.as_deref()),
        ("title", Some(media.title.as_str())),
    ]
    .into_iter()
    .filter_map(|(field, value)| {
        value
            .filter(|v| !v.is_empty())
            .map(|v| format!("{field}:{v}"))
    })
    .collect();

    if parts.is_empty() {
        return None;
    }
    Some(format!("{:x}", md5::compute(parts.join("|"))))
}

#[derive(Debug, Clone)]
struct CacheEntry {
    url: Option<String>,
    stored_at: Instant,
}

/// Resolved artwork URLs by media key, including negative results.
///
/// Uses tokio's clock so expiry follows a paused test clock.
#[derive(Debug)]
pub struct CoverArtCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl CoverArtCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// `Some(result)` for a live entry (the result itself may be `None`),
    /// `None` on a miss or an expired entry.
    pub fn get(&self, key: &str) -> Option<Option<String>> {
        self.entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.url.clone())
    }

    pub fn insert(&mut self, key: String, url: Option<String>) {
        self.entries.insert(
            key,
            CacheEntry {
                url,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop expired entries.
    pub fn purge_expired(&mut self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
