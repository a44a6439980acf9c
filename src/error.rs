use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or parsing podcast feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read feed file {path}: {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Feed document is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    #[error("Failed to parse feed XML: {0}")]
    ParseFailed(#[from] roxmltree::Error),

    #[error("Feed has no <{element}> element")]
    MissingElement { element: &'static str },

    #[error("Enclosure for episode '{title}' has no url attribute")]
    MissingEnclosureUrl { title: String },

    #[error("Feed lists {count} episodes, more than can be numbered")]
    TooManyEpisodes { count: usize },
}

/// Errors that can occur during episode downloads
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Invalid audio URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} into place at {to}: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download of {url} was cancelled")]
    Cancelled { url: String },

    #[error("No destination directory configured")]
    NoDestination,
}

impl DownloadError {
    /// Whether the failure happened on the network side of the transfer
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            DownloadError::InvalidUrl { .. }
                | DownloadError::HttpFailed { .. }
                | DownloadError::HttpStatus { .. }
                | DownloadError::StreamFailed { .. }
        )
    }
}

/// Errors reported by a media backend
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Media file not found: {0}")]
    MediaNotFound(PathBuf),

    #[error("Failed to open media {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode media {path}: {reason}")]
    DecodeFailed { path: PathBuf, reason: String },

    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),
}
