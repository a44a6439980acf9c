// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Component, Path, PathBuf};

use crate::feed::Episode;

/// Suffix for downloads that have not been moved into place yet
const PARTIAL_SUFFIX: &str = ".partial";

#[cfg(windows)]
const BROWSE_ROOT: &str = "\\";
#[cfg(not(windows))]
const BROWSE_ROOT: &str = "/";

/// Local path an episode is downloaded to: the destination directory joined
/// with the episode title, using the platform's separator.
///
/// The title is used verbatim. Characters that are unsafe in file names are
/// not escaped and no extension is added, so a title containing a separator
/// lands in a subdirectory, and an absolute title replaces the destination.
pub fn episode_path(destination: &Path, episode: &Episode) -> PathBuf {
    destination.join(episode.title())
}

/// Path written while a download is in progress: the episode title with a
/// `.partial` suffix, inside `destination`
pub fn partial_path(destination: &Path, episode: &Episode) -> PathBuf {
    destination.join(format!("{}{PARTIAL_SUFFIX}", episode.title()))
}

/// Identity of a download target that does not depend on how `destination`
/// is spelled, e.g. `downloads` and `downloads/sub/..`
pub(crate) async fn target_key(destination: &Path, episode: &Episode) -> PathBuf {
    let directory = match tokio::fs::canonicalize(destination).await {
        Ok(directory) => directory,
        Err(_) => std::path::absolute(destination).unwrap_or_else(|_| destination.to_path_buf()),
    };
    normalize(&directory.join(episode.title()))
}

/// Resolve `.` and `..` components without touching the file system
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Root directory offered as the starting point for browsing. Not validated.
pub fn default_browse_root() -> PathBuf {
    PathBuf::from(BROWSE_ROOT)
}
