// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use roxmltree::{Document, Node, ParsingOptions};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::FeedError;

/// Leading `<title>` elements that belong to the channel (podcast title and
/// image title) rather than to an episode
const FEED_LEVEL_TITLES: usize = 2;

/// A single podcast episode as listed in a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Episode {
    audio_url: String,
    artwork_url: String,
    title: String,
    podcast_title: String,
    author: String,
    number: u32,
}

impl Episode {
    pub fn new(
        audio_url: impl Into<String>,
        artwork_url: impl Into<String>,
        title: impl Into<String>,
        podcast_title: impl Into<String>,
        author: impl Into<String>,
        number: u32,
    ) -> Self {
        Self {
            audio_url: audio_url.into(),
            artwork_url: artwork_url.into(),
            title: title.into(),
            podcast_title: podcast_title.into(),
            author: author.into(),
            number,
        }
    }

    /// URL of the audio file, exactly as written in the enclosure
    pub fn audio_url(&self) -> &str {
        &self.audio_url
    }

    /// Channel artwork URL, shared by every episode of the feed
    pub fn artwork_url(&self) -> &str {
        &self.artwork_url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn podcast_title(&self) -> &str {
        &self.podcast_title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// 1-based position of the episode, oldest first
    pub fn number(&self) -> u32 {
        self.number
    }
}

/// Channel-level values attached to every episode of one parse
#[derive(Debug)]
struct FeedMetadata {
    podcast_title: String,
    artwork_url: String,
    author: String,
}

/// An element name as written in the document, prefix included
struct ElementName {
    prefix: Option<&'static str>,
    local: &'static str,
    qualified: &'static str,
}

const TITLE: ElementName = ElementName {
    prefix: None,
    local: "title",
    qualified: "title",
};

const ARTWORK_URL: ElementName = ElementName {
    prefix: None,
    local: "url",
    qualified: "url",
};

const AUTHOR: ElementName = ElementName {
    prefix: Some("itunes"),
    local: "author",
    qualified: "itunes:author",
};

const ENCLOSURE: ElementName = ElementName {
    prefix: None,
    local: "enclosure",
    qualified: "enclosure",
};

impl ElementName {
    fn matches(&self, node: Node<'_, '_>) -> bool {
        if !node.is_element() || node.tag_name().name() != self.local {
            return false;
        }

        let prefix = node
            .tag_name()
            .namespace()
            .and_then(|uri| node.lookup_prefix(uri))
            .filter(|prefix| !prefix.is_empty());

        prefix == self.prefix
    }

    /// All matching elements in document order
    fn find_all<'a, 'input>(&self, document: &'a Document<'input>) -> Vec<Node<'a, 'input>> {
        document
            .descendants()
            .filter(|node| self.matches(*node))
            .collect()
    }

    fn find_first<'a, 'input>(
        &self,
        document: &'a Document<'input>,
    ) -> Result<Node<'a, 'input>, FeedError> {
        document
            .descendants()
            .find(|node| self.matches(*node))
            .ok_or(FeedError::MissingElement {
                element: self.qualified,
            })
    }
}

/// Concatenated text and CDATA of an element and all its descendants
fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Parse a feed document into its episodes, oldest first.
///
/// A document that cannot be parsed yields an empty list. The cause is logged
/// at `warn` level; use [`try_parse_feed`] to receive it as a value instead.
pub fn parse_feed(xml_bytes: &[u8]) -> Vec<Episode> {
    try_parse_feed(xml_bytes).unwrap_or_else(|e| {
        warn!(error = %e, "Feed could not be parsed, no episodes available");
        Vec::new()
    })
}

/// Parse a feed document into its episodes, oldest first, reporting why a
/// malformed document was rejected.
///
/// Episode titles are listed newest first in the document. They are walked in
/// reverse together with a cursor over the enclosures that starts at the last
/// one, so the oldest episode is numbered 1. The cursor never moves below the
/// first enclosure: when a feed has fewer enclosures than episode titles, the
/// first enclosure is reused for the remaining episodes.
pub fn try_parse_feed(xml_bytes: &[u8]) -> Result<Vec<Episode>, FeedError> {
    let text = std::str::from_utf8(xml_bytes)?;
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(text, options)?;

    let titles = TITLE.find_all(&document);
    let episode_titles = match titles.get(FEED_LEVEL_TITLES..) {
        Some(rest) if !rest.is_empty() => rest,
        _ => return Ok(Vec::new()),
    };

    let metadata = read_metadata(&document, &titles)?;

    let enclosures = ENCLOSURE.find_all(&document);
    if enclosures.is_empty() {
        return Err(FeedError::MissingElement {
            element: ENCLOSURE.qualified,
        });
    }
    if enclosures.len() < episode_titles.len() {
        debug!(
            enclosures = enclosures.len(),
            episodes = episode_titles.len(),
            "Fewer enclosures than episodes, reusing the first enclosure for the oldest episodes"
        );
    }

    let mut cursor = enclosures.len() - 1;
    let mut episodes = Vec::with_capacity(episode_titles.len());

    for (index, title_node) in episode_titles.iter().rev().enumerate() {
        let title = text_content(*title_node);
        let audio_url = enclosures[cursor]
            .attribute("url")
            .ok_or_else(|| FeedError::MissingEnclosureUrl {
                title: title.clone(),
            })?;

        cursor = cursor.saturating_sub(1);

        episodes.push(Episode {
            audio_url: audio_url.to_string(),
            artwork_url: metadata.artwork_url.clone(),
            title,
            podcast_title: metadata.podcast_title.clone(),
            author: metadata.author.clone(),
            number: episode_number(index, episode_titles.len())?,
        });
    }

    Ok(episodes)
}

/// 1-based number of the episode at `index`, counted from the oldest
fn episode_number(index: usize, count: usize) -> Result<u32, FeedError> {
    index
        .checked_add(1)
        .and_then(|number| u32::try_from(number).ok())
        .ok_or(FeedError::TooManyEpisodes { count })
}

fn read_metadata(
    document: &Document<'_>,
    titles: &[Node<'_, '_>],
) -> Result<FeedMetadata, FeedError> {
    let podcast_title = titles
        .first()
        .map(|node| text_content(*node))
        .ok_or(FeedError::MissingElement {
            element: TITLE.qualified,
        })?;

    Ok(FeedMetadata {
        podcast_title,
        artwork_url: text_content(ARTWORK_URL.find_first(document)?),
        author: text_content(AUTHOR.find_first(document)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZAPATISTAS_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Zapatistas</title>
    <itunes:author>Radio Insurgente</itunes:author>
    <image>
      <url>https://example.com/cover.jpg</url>
      <title>Zapatistas cover</title>
    </image>
    <item>
      <title>C</title>
      <itunes:title>Third episode</itunes:title>
      <enclosure url="c.mp3" type="audio/mpeg"/>
    </item>
    <item>
      <title>B</title>
      <enclosure url="b.mp3" type="audio/mpeg"/>
    </item>
    <item>
      <title>A</title>
      <enclosure url="a.mp3" type="audio/mpeg"/>
    </item>
  </channel>
</rss>"#;

    fn feed_with_items(items: &[(&str, Option<&str>)]) -> String {
        let mut xml = String::from(
            r#"<rss xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"><channel>
<title>Show</title><itunes:author>Host</itunes:author>
<image><url>https://example.com/art.png</url><title>Show art</title></image>"#,
        );
        for (title, url) in items {
            xml.push_str("<item><title>");
            xml.push_str(title);
            xml.push_str("</title>");
            if let Some(url) = url {
                xml.push_str(&format!(r#"<enclosure url="{url}"/>"#));
            }
            xml.push_str("</item>");
        }
        xml.push_str("</channel></rss>");
        xml
    }

    #[test]
    fn parse_feed_numbers_oldest_episode_first() {
        let episodes = parse_feed(ZAPATISTAS_FEED.as_bytes());

        let summary: Vec<_> = episodes
            .iter()
            .map(|e| (e.number(), e.title(), e.audio_url()))
            .collect();
        assert_eq!(
            summary,
            vec![(1, "A", "a.mp3"), (2, "B", "b.mp3"), (3, "C", "c.mp3")]
        );
    }

    #[test]
    fn parse_feed_attaches_channel_metadata_to_every_episode() {
        let episodes = parse_feed(ZAPATISTAS_FEED.as_bytes());

        assert_eq!(episodes.len(), 3);
        for episode in &episodes {
            assert_eq!(episode.podcast_title(), "Zapatistas");
            assert_eq!(episode.author(), "Radio Insurgente");
            assert_eq!(episode.artwork_url(), "https://example.com/cover.jpg");
        }
    }

    #[test]
    fn parse_feed_is_deterministic() {
        let first = parse_feed(ZAPATISTAS_FEED.as_bytes());
        let second = parse_feed(ZAPATISTAS_FEED.as_bytes());
        assert_eq!(first, second);
    }

    #[test]
    fn parse_feed_numbers_are_contiguous() {
        let items: Vec<(String, String)> = (0..12)
            .map(|i| {
                (
                    format!("Episode {}", 12 - i),
                    format!("https://example.com/{}.mp3", 12 - i),
                )
            })
            .collect();
        let borrowed: Vec<(&str, Option<&str>)> = items
            .iter()
            .map(|(t, u)| (t.as_str(), Some(u.as_str())))
            .collect();

        let episodes = parse_feed(feed_with_items(&borrowed).as_bytes());

        assert_eq!(episodes.len(), 12);
        for (i, episode) in episodes.iter().enumerate() {
            let n = i as u32 + 1;
            assert_eq!(episode.number(), n);
            assert_eq!(episode.title(), format!("Episode {n}"));
            assert_eq!(episode.audio_url(), format!("https://example.com/{n}.mp3"));
        }
    }

    #[test]
    fn parse_feed_reuses_first_enclosure_when_enclosures_run_out() {
        // The newest episode has no enclosure, so the cursor reaches the
        // first enclosure one step early and stays there.
        let xml = feed_with_items(&[
            ("New", None),
            ("Mid", Some("mid.mp3")),
            ("Old", Some("old.mp3")),
        ]);

        let episodes = parse_feed(xml.as_bytes());

        let urls: Vec<_> = episodes
            .iter()
            .map(|e| (e.title(), e.audio_url()))
            .collect();
        assert_eq!(
            urls,
            vec![("Old", "old.mp3"), ("Mid", "mid.mp3"), ("New", "mid.mp3")]
        );
    }

    #[test]
    fn parse_feed_keeps_cdata_titles_verbatim() {
        let xml = feed_with_items(&[("<![CDATA[Q&A: part 1/2]]>", Some("qa.mp3"))]);

        let episodes = parse_feed(xml.as_bytes());

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].title(), "Q&A: part 1/2");
    }

    #[test]
    fn parse_feed_without_episode_titles_is_empty() {
        let xml = feed_with_items(&[]);
        assert_eq!(try_parse_feed(xml.as_bytes()).unwrap(), Vec::new());
    }

    #[test]
    fn parse_feed_returns_empty_for_malformed_xml() {
        let episodes = parse_feed(b"<rss><channel><title>Broken</channel>");
        assert!(episodes.is_empty());
    }

    #[test]
    fn try_parse_feed_reports_malformed_xml() {
        let result = try_parse_feed(b"<rss><channel><title>Broken</channel>");
        assert!(matches!(result, Err(FeedError::ParseFailed(_))));
    }

    #[test]
    fn try_parse_feed_reports_invalid_utf8() {
        let result = try_parse_feed(&[0x3c, 0x72, 0xff, 0xfe]);
        assert!(matches!(result, Err(FeedError::InvalidEncoding(_))));
    }

    #[test]
    fn try_parse_feed_requires_author() {
        let xml = feed_with_items(&[("Only", Some("only.mp3"))])
            .replace("<itunes:author>Host</itunes:author>", "");

        match try_parse_feed(xml.as_bytes()) {
            Err(FeedError::MissingElement { element }) => assert_eq!(element, "itunes:author"),
            other => panic!("Expected MissingElement, got {other:?}"),
        }
        assert!(parse_feed(xml.as_bytes()).is_empty());
    }

    #[test]
    fn try_parse_feed_requires_an_enclosure() {
        let xml = feed_with_items(&[("Only", None)]);

        match try_parse_feed(xml.as_bytes()) {
            Err(FeedError::MissingElement { element }) => assert_eq!(element, "enclosure"),
            other => panic!("Expected MissingElement, got {other:?}"),
        }
    }

    #[test]
    fn try_parse_feed_reports_enclosure_without_url() {
        let xml = feed_with_items(&[("Only", None)])
            .replace("</title></item>", r#"</title><enclosure type="audio/mpeg"/></item>"#);

        match try_parse_feed(xml.as_bytes()) {
            Err(FeedError::MissingEnclosureUrl { title }) => assert_eq!(title, "Only"),
            other => panic!("Expected MissingEnclosureUrl, got {other:?}"),
        }
    }

    #[test]
    fn undeclared_namespace_prefix_rejects_the_feed() {
        let xml = feed_with_items(&[("Only", Some("only.mp3"))])
            .replace(r#" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd""#, "");

        assert!(matches!(
            try_parse_feed(xml.as_bytes()),
            Err(FeedError::ParseFailed(_))
        ));
        assert!(parse_feed(xml.as_bytes()).is_empty());
    }

    #[test]
    fn episode_number_is_one_based() {
        assert_eq!(episode_number(0, 3).unwrap(), 1);
        assert_eq!(episode_number(2, 3).unwrap(), 3);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn episode_number_rejects_values_beyond_u32() {
        let last = u32::MAX as usize - 1;
        assert_eq!(episode_number(last, usize::MAX).unwrap(), u32::MAX);

        match episode_number(last + 1, usize::MAX) {
            Err(FeedError::TooManyEpisodes { count }) => assert_eq!(count, usize::MAX),
            other => panic!("Expected TooManyEpisodes, got {other:?}"),
        }
    }

    #[test]
    fn parse_feed_accepts_doctype() {
        let xml = format!(
            "<?xml version=\"1.0\"?>\n<!DOCTYPE rss>\n{}",
            feed_with_items(&[("Only", Some("only.mp3"))])
        );

        assert_eq!(parse_feed(xml.as_bytes()).len(), 1);
    }
}
