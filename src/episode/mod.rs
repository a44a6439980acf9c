mod download;
mod path;

pub use download::{DownloadManager, FetchOptions, WriteMode};
pub use path::{default_browse_root, episode_path, partial_path};
