pub mod episode;
pub mod error;
pub mod feed;
pub mod http;
pub mod playback;
pub mod progress;

// Re-export main types for convenience
pub use episode::{
    DownloadManager, FetchOptions, WriteMode, default_browse_root, episode_path, partial_path,
};
pub use error::{DownloadError, FeedError, PlaybackError};
pub use feed::{
    Episode, fetch_feed_bytes, is_url, load_episodes, parse_feed, read_feed_file, try_parse_feed,
};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use playback::{
    ClockBackend, ClockHandle, MediaBackend, MediaHandle, PlaybackController, PlaybackRate,
    PlaybackStatus, SEEK_STEP,
};
#[cfg(feature = "rodio")]
pub use playback::{RodioBackend, RodioHandle};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
