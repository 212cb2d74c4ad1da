use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use super::error::MusicBrainzError;
use super::types::{Recording, RecordingSearchResponse, Release, ReleaseSearchResponse};
use crate::traits::MetadataSearch;

const API_BASE: &str = "https://musicbrainz.org/ws/2/";
const COVER_ART_BASE: &str = "https://coverartarchive.org/";

/// MusicBrainz asks every client to identify itself.
const USER_AGENT: &str = concat!(
    "vlc-presence/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/vlc-presence/vlc-presence)"
);

const TIMEOUT: Duration = Duration::from_secs(3);
const SEARCH_LIMIT: &str = "10";

/// MusicBrainz `ws/2` search client plus Cover Art Archive probing.
#[derive(Debug, Clone)]
pub struct MusicBrainzClient {
    http: Client,
    api_base: Url,
    cover_base: Url,
}

impl MusicBrainzClient {
    pub fn new() -> Result<Self, MusicBrainzError> {
        Self::with_base_urls(API_BASE, COVER_ART_BASE)
    }

    /// Point the client at other hosts (mirrors, or a local mock server).
    pub fn with_base_urls(api_base: &str, cover_base: &str) -> Result<Self, MusicBrainzError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_base: with_trailing_slash(api_base)?,
            cover_base: with_trailing_slash(cover_base)?,
        })
    }

    /// The 500px front cover URL for a release. Existence is not checked.
    pub fn cover_url(&self, release_id: &str) -> Result<Url, MusicBrainzError> {
        Ok(self
            .cover_base
            .join(&format!("release/{release_id}/front-500"))?)
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, MusicBrainzError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(status, "MusicBrainz API error");
            Err(MusicBrainzError::Api {
                status,
                message: body,
            })
        }
    }

    async fn search<T: serde::de::DeserializeOwned>(
        &self,
        entity: &str,
        query: &str,
    ) -> Result<T, MusicBrainzError> {
        let url = self.api_base.join(entity)?;
        tracing::debug!(entity, query, "Searching MusicBrainz");

        let resp = self
            .http
            .get(url)
            .query(&[("query", query), ("fmt", "json"), ("limit", SEARCH_LIMIT)])
            .send()
            .await?;

        let resp = Self::check_response(resp).await?;
        resp.json()
            .await
            .map_err(|e| MusicBrainzError::Parse(e.to_string()))
    }

    pub async fn search_releases(&self, query: &str) -> Result<Vec<Release>, MusicBrainzError> {
        let page: ReleaseSearchResponse = self.search("release", query).await?;
        Ok(page.releases)
    }

    pub async fn search_recordings(&self, query: &str) -> Result<Vec<Recording>, MusicBrainzError> {
        let page: RecordingSearchResponse = self.search("recording", query).await?;
        Ok(page.recordings)
    }

    /// `HEAD` the release's front cover; `Some(url)` on 200.
    ///
    /// The archive answers with a redirect to the image host, which is
    /// followed, so a 200 means the image is really there.
    pub async fn front_cover(&self, release_id: &str) -> Result<Option<String>, MusicBrainzError> {
        let url = self.cover_url(release_id)?;
        let resp = self.http.head(url.clone()).send().await?;

        if resp.status() == StatusCode::OK {
            tracing::debug!(%url, "Found cover art");
            Ok(Some(url.into()))
        } else {
            tracing::debug!(%url, status = resp.status().as_u16(), "No cover art");
            Ok(None)
        }
    }
}

impl MetadataSearch for MusicBrainzClient {
    type Error = MusicBrainzError;

    async fn search_releases(&self, query: &str) -> Result<Vec<Release>, Self::Error> {
        MusicBrainzClient::search_releases(self, query).await
    }

    async fn search_recordings(&self, query: &str) -> Result<Vec<Recording>, Self::Error> {
        MusicBrainzClient::search_recordings(self, query).await
    }

    async fn front_cover(&self, release_id: &str) -> Result<Option<String>, Self::Error> {
        MusicBrainzClient::front_cover(self, release_id).await
    }
}

fn with_trailing_slash(base: &str) -> Result<Url, url::ParseError> {
    if base.ends_with('/') {
        Url::parse(base)
    } else {
        Url::parse(&format!("{base}/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> MusicBrainzClient {
        MusicBrainzClient::with_base_urls(&format!("{}/ws/2", server.uri()), &server.uri()).unwrap()
    }

    #[test]
    fn test_cover_url() {
        let client = MusicBrainzClient::new().unwrap();
        assert_eq!(
            client.cover_url("abc").unwrap().as_str(),
            "https://coverartarchive.org/release/abc/front-500"
        );
    }

    #[tokio::test]
    async fn test_search_releases_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/2/release"))
            .and(query_param("query", r#"release:"Animals""#))
            .and(query_param("fmt", "json"))
            .and(query_param("limit", "10"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"releases":[{"id":"r1","title":"Animals","score":100}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let releases = client(&server)
            .await
            .search_releases(r#"release:"Animals""#)
            .await
            .unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].id, "r1");
    }

    #[tokio::test]
    async fn test_search_recordings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/2/recording"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"recordings":[{"id":"t1","title":"Money","score":95,
                    "releases":[{"id":"r1","title":"The Dark Side of the Moon"}]}]}"#,
            ))
            .mount(&server)
            .await;

        let recordings = client(&server).await.search_recordings("Money").await.unwrap();
        assert_eq!(recordings[0].releases[0].id, "r1");
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = client(&server).await.search_releases("x").await.unwrap_err();
        assert!(matches!(err, MusicBrainzError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_front_cover_probe() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/release/has/front-500"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/release/missing/front-500"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let found = client.front_cover("has").await.unwrap();
        assert_eq!(found, Some(format!("{}/release/has/front-500", server.uri())));
        assert_eq!(client.front_cover("missing").await.unwrap(), None);
    }
}
