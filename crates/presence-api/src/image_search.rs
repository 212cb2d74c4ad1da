//! Image search fallback for media the music catalogue does not know.
//!
//! Fetches a general image-search results page and picks the first
//! plausible thumbnail. This is best effort: the page layout is not an API
//! and may change at any time.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::traits::ImageSearch;

const SEARCH_BASE: &str = "https://www.google.com/";
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const TIMEOUT: Duration = Duration::from_secs(5);

/// Thumbnail host used by the results page.
const THUMBNAIL_HOST: &str = "gstatic.com";

static RE_IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).unwrap());

static RE_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>(.*?)</script>").unwrap());

static RE_SCRIPT_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+?\.(?:jpg|jpeg|png)").unwrap());

/// Marker of the inline script that carries full-size result URLs.
const DATA_CALLBACK: &str = "AF_initDataCallback";

#[derive(Debug, Error)]
pub enum ImageSearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search returned status {0}")]
    Status(u16),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Scrapes the public image-search results page.
#[derive(Debug, Clone)]
pub struct GoogleImageSearch {
    http: Client,
    base: Url,
}

impl GoogleImageSearch {
    pub fn new() -> Result<Self, ImageSearchError> {
        Self::with_base_url(SEARCH_BASE)
    }

    pub fn with_base_url(base: &str) -> Result<Self, ImageSearchError> {
        let http = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base: Url::parse(base)?,
        })
    }

    pub async fn find_image(&self, phrase: &str) -> Result<Option<String>, ImageSearchError> {
        let url = self.base.join("search")?;
        tracing::debug!(phrase, "Searching images");

        let resp = self
            .http
            .get(url)
            .query(&[("q", phrase), ("tbm", "isch")])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ImageSearchError::Status(resp.status().as_u16()));
        }

        let html = resp.text().await?;
        Ok(extract_image_url(&html))
    }
}

impl ImageSearch for GoogleImageSearch {
    type Error = ImageSearchError;

    async fn find_image(&self, phrase: &str) -> Result<Option<String>, Self::Error> {
        GoogleImageSearch::find_image(self, phrase).await
    }
}

/// Pick an image URL from a results page.
///
/// Prefers the first absolute, non-GIF `<img src>` served from the thumbnail
/// host, then the first `.jpg`/`.jpeg`/`.png` URL inside the results data
/// script that is not an icon, emoji or favicon.
pub fn extract_image_url(html: &str) -> Option<String> {
    let thumbnail = RE_IMG_SRC
        .captures_iter(html)
        .map(|caps| caps[1].to_string())
        .find(|src| src.starts_with("http") && !src.ends_with(".gif") && src.contains(THUMBNAIL_HOST));
    if thumbnail.is_some() {
        return thumbnail;
    }

    RE_SCRIPT
        .captures_iter(html)
        .map(|caps| caps.get(1).map_or("", |m| m.as_str()))
        .filter(|body| body.contains(DATA_CALLBACK))
        .flat_map(|body| RE_SCRIPT_IMAGE.find_iter(body))
        .map(|m| m.as_str())
        .find(|url| {
            let lower = url.to_lowercase();
            !["icon", "emoji", "favicon"].iter().any(|bad| lower.contains(bad))
        })
        .map(str::to_string)
}
