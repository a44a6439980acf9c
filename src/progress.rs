use std::path::PathBuf;
use std::sync::Arc;

/// Events emitted while loading feeds and downloading episodes
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Feed is being fetched from URL
    FetchingFeed { url: String },

    /// Feed document has been parsed (an unusable document reports zero episodes)
    FeedParsed {
        podcast_title: String,
        total_episodes: usize,
    },

    /// The episode is already on disk, no download needed
    CacheHit {
        episode_title: String,
        path: PathBuf,
    },

    /// A download is starting
    DownloadStarting {
        episode_title: String,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Download progress update
    DownloadProgress {
        episode_title: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// Download is being moved into place (renamed from .partial)
    Finalizing { episode_title: String },

    /// A download completed successfully
    DownloadCompleted {
        episode_title: String,
        path: PathBuf,
        bytes_downloaded: u64,
    },

    /// A download failed
    DownloadFailed {
        episode_title: String,
        error: String,
    },
}

/// Trait for reporting progress events.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Reporter that keeps every event, for asserting on what was reported
    #[derive(Default)]
    pub(crate) struct RecordingReporter {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl RecordingReporter {
        pub(crate) fn events(&self) -> Vec<ProgressEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ProgressReporter for RecordingReporter {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn noop_reporter_handles_all_events() {
        let reporter = NoopReporter;

        reporter.report(ProgressEvent::FetchingFeed {
            url: "https://example.com/feed.xml".to_string(),
        });

        reporter.report(ProgressEvent::FeedParsed {
            podcast_title: "Test Podcast".to_string(),
            total_episodes: 10,
        });

        reporter.report(ProgressEvent::CacheHit {
            episode_title: "Episode 1".to_string(),
            path: PathBuf::from("/tmp/Episode 1"),
        });

        reporter.report(ProgressEvent::DownloadStarting {
            episode_title: "Episode 2".to_string(),
            content_length: Some(1024),
        });

        reporter.report(ProgressEvent::DownloadProgress {
            episode_title: "Episode 2".to_string(),
            bytes_downloaded: 512,
            total_bytes: Some(1024),
        });

        reporter.report(ProgressEvent::Finalizing {
            episode_title: "Episode 2".to_string(),
        });

        reporter.report(ProgressEvent::DownloadCompleted {
            episode_title: "Episode 2".to_string(),
            path: PathBuf::from("/tmp/Episode 2"),
            bytes_downloaded: 1024,
        });

        reporter.report(ProgressEvent::DownloadFailed {
            episode_title: "Episode 3".to_string(),
            error: "Connection timeout".to_string(),
        });
    }

    #[test]
    fn recording_reporter_keeps_events_in_order() {
        let reporter = RecordingReporter::default();

        reporter.report(ProgressEvent::FetchingFeed {
            url: "https://example.com/feed.xml".to_string(),
        });
        reporter.report(ProgressEvent::FeedParsed {
            podcast_title: "Show".to_string(),
            total_episodes: 0,
        });

        let events = reporter.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProgressEvent::FetchingFeed { .. }));
        assert!(matches!(
            events[1],
            ProgressEvent::FeedParsed {
                total_episodes: 0,
                ..
            }
        ));
    }
}
