// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use bytes::Bytes;

use crate::error::FeedError;
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};

use super::parse::{Episode, parse_feed};

/// Fetch raw feed bytes from a URL (without parsing)
pub async fn fetch_feed_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes, FeedError> {
    let bytes = client
        .get_bytes(url)
        .await
        .map_err(|e| FeedError::FetchFailed {
            url: url.to_string(),
            source: e,
        })?;
    Ok(bytes)
}

/// Read raw feed bytes from a local file (without parsing)
pub fn read_feed_file(path: &Path) -> Result<Vec<u8>, FeedError> {
    std::fs::read(path).map_err(|e| FeedError::FileReadFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load a feed from a URL or local file and parse it into episodes
///
/// Failing to obtain the document is an error. A document that cannot be
/// parsed is not: it yields an empty episode list, see [`parse_feed`].
pub async fn load_episodes<C: HttpClient>(
    client: &C,
    source: &str,
    reporter: &SharedProgressReporter,
) -> Result<Vec<Episode>, FeedError> {
    let bytes = if is_url(source) {
        reporter.report(ProgressEvent::FetchingFeed {
            url: source.to_string(),
        });
        fetch_feed_bytes(client, source).await?.to_vec()
    } else {
        read_feed_file(Path::new(source))?
    };

    let episodes = parse_feed(&bytes);

    reporter.report(ProgressEvent::FeedParsed {
        podcast_title: episodes
            .first()
            .map(|e| e.podcast_title().to_string())
            .unwrap_or_default(),
        total_episodes: episodes.len(),
    });

    Ok(episodes)
}

/// Determine if a string is a URL or a file path
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::progress::NoopReporter;
    use async_trait::async_trait;
    use tempfile::tempdir;

    const FEED: &str = r#"<rss xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"><channel>
<title>Show</title><itunes:author>Host</itunes:author>
<image><url>https://example.com/art.png</url><title>Show art</title></image>
<item><title>Second</title><enclosure url="https://example.com/2.mp3"/></item>
<item><title>First</title><enclosure url="https://example.com/1.mp3"/></item>
</channel></rss>"#;

    struct FeedServer;

    #[async_trait]
    impl HttpClient for FeedServer {
        async fn get_bytes(&self, _url: &str) -> Result<Bytes, reqwest::Error> {
            Ok(Bytes::from_static(FEED.as_bytes()))
        }

        async fn get_stream(&self, _url: &str) -> Result<HttpResponse, reqwest::Error> {
            unreachable!("feeds are fetched in one piece")
        }
    }

    #[test]
    fn is_url_detects_http() {
        assert!(is_url("http://example.com/feed.xml"));
        assert!(is_url("https://example.com/feed.xml"));
    }

    #[test]
    fn is_url_rejects_file_paths() {
        assert!(!is_url("/path/to/feed.xml"));
        assert!(!is_url("./feed.xml"));
        assert!(!is_url("feed.xml"));
    }

    #[tokio::test]
    async fn load_episodes_fetches_urls() {
        let episodes = load_episodes(
            &FeedServer,
            "https://example.com/feed.xml",
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        let titles: Vec<_> = episodes.iter().map(|e| e.title()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn load_episodes_reads_local_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feed.xml");
        std::fs::write(&path, FEED).unwrap();

        let episodes = load_episodes(
            &FeedServer,
            path.to_str().unwrap(),
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].podcast_title(), "Show");
    }

    #[tokio::test]
    async fn load_episodes_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.xml");

        let result = load_episodes(
            &FeedServer,
            path.to_str().unwrap(),
            &NoopReporter::shared(),
        )
        .await;

        assert!(matches!(result, Err(FeedError::FileReadFailed { .. })));
    }

    #[tokio::test]
    async fn load_episodes_turns_broken_documents_into_empty_catalog() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.xml");
        std::fs::write(&path, "<rss><channel>").unwrap();

        let episodes = load_episodes(
            &FeedServer,
            path.to_str().unwrap(),
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert!(episodes.is_empty());
    }
}
