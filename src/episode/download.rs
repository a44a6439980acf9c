use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::error::DownloadError;
use crate::feed::Episode;
use crate::http::{HttpClient, HttpResponse};
use crate::progress::{ProgressEvent, SharedProgressReporter};

use super::path::{episode_path, partial_path, target_key};

/// How downloaded bytes reach the target path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Stream into `<target>.partial` and rename it onto the target once the
    /// body has been written completely
    #[default]
    Atomic,
    /// Stream straight into the target.
    ///
    /// An interrupted download leaves a truncated file at the target path.
    /// Because the cache is presence-based, a retry returns that file as if
    /// it were complete. Only use this where other tools expect the file to
    /// appear under its final name from the first byte.
    InPlace,
}

/// Options for episode downloads
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub write_mode: WriteMode,
    /// Directory used by [`DownloadManager::fetch_to_default`]
    pub default_dir: Option<PathBuf>,
}

/// One async lock per target currently being fetched, keyed by
/// [`target_key`]
type TargetLocks = Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>;

/// Resolves episodes to local files, downloading them only when absent
///
/// The cache is presence-based: if a file exists at the episode's target path
/// it is returned without any network access and without checking its content.
/// Concurrent fetches of the same target are serialized, so the file is
/// downloaded at most once.
#[derive(Clone)]
pub struct DownloadManager<C> {
    client: C,
    options: FetchOptions,
    reporter: SharedProgressReporter,
    in_flight: TargetLocks,
}

impl<C: HttpClient + Clone + 'static> DownloadManager<C> {
    pub fn new(client: C, reporter: SharedProgressReporter) -> Self {
        Self {
            client,
            options: FetchOptions::default(),
            reporter,
            in_flight: Arc::default(),
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_default_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.default_dir = Some(dir.into());
        self
    }

    /// Change the directory used by [`fetch_to_default`](Self::fetch_to_default)
    pub fn set_default_dir(&mut self, dir: impl Into<PathBuf>) {
        self.options.default_dir = Some(dir.into());
    }

    pub fn default_dir(&self) -> Option<&Path> {
        self.options.default_dir.as_deref()
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Return the local path of an episode in `destination`, downloading it first if needed
    pub async fn fetch(
        &self,
        episode: &Episode,
        destination: &Path,
    ) -> Result<PathBuf, DownloadError> {
        self.fetch_with_cancel(episode, destination, &CancellationToken::new())
            .await
    }

    /// Like [`fetch`](Self::fetch), into the configured default directory
    pub async fn fetch_to_default(&self, episode: &Episode) -> Result<PathBuf, DownloadError> {
        let destination = self
            .options
            .default_dir
            .clone()
            .ok_or(DownloadError::NoDestination)?;
        self.fetch(episode, &destination).await
    }

    /// Run [`fetch`](Self::fetch) on a background task
    pub fn spawn_fetch(
        &self,
        episode: Episode,
        destination: PathBuf,
    ) -> JoinHandle<Result<PathBuf, DownloadError>> {
        let manager = self.clone();
        tokio::spawn(async move { manager.fetch(&episode, &destination).await })
    }

    /// Like [`fetch`](Self::fetch), aborting with [`DownloadError::Cancelled`]
    /// once `cancel` fires
    pub async fn fetch_with_cancel(
        &self,
        episode: &Episode,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        let target = episode_path(destination, episode);
        let key = target_key(destination, episode).await;

        let lock = self.target_lock(&key);
        let result = {
            let _guard = lock.lock().await;
            self.fetch_locked(episode, destination, &target, cancel).await
        };
        drop(lock);
        self.release_target(&key);

        result
    }

    async fn fetch_locked(
        &self,
        episode: &Episode,
        destination: &Path,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        if is_present(target).await {
            debug!(path = %target.display(), "Episode already downloaded");
            self.reporter.report(ProgressEvent::CacheHit {
                episode_title: episode.title().to_string(),
                path: target.to_path_buf(),
            });
            return Ok(target.to_path_buf());
        }

        match self.download(episode, destination, target, cancel).await {
            Ok(bytes_downloaded) => {
                self.reporter.report(ProgressEvent::DownloadCompleted {
                    episode_title: episode.title().to_string(),
                    path: target.to_path_buf(),
                    bytes_downloaded,
                });
                Ok(target.to_path_buf())
            }
            Err(e) => {
                self.reporter.report(ProgressEvent::DownloadFailed {
                    episode_title: episode.title().to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Stream the episode audio to disk, returning the number of bytes written
    async fn download(
        &self,
        episode: &Episode,
        destination: &Path,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, DownloadError> {
        let url = episode.audio_url();
        Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
            url: url.to_string(),
            source: e,
        })?;

        let cancelled = || DownloadError::Cancelled {
            url: url.to_string(),
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            response = self.client.get_stream(url) => {
                response.map_err(|e| DownloadError::HttpFailed {
                    url: url.to_string(),
                    source: e,
                })?
            }
        };

        if response.is_error() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        self.reporter.report(ProgressEvent::DownloadStarting {
            episode_title: episode.title().to_string(),
            content_length: response.content_length,
        });

        let write_path = match self.options.write_mode {
            WriteMode::Atomic => partial_path(destination, episode),
            WriteMode::InPlace => target.to_path_buf(),
        };

        let result = self
            .write_body(episode, response, &write_path, cancel)
            .await;

        if self.options.write_mode == WriteMode::InPlace {
            return result;
        }

        let bytes_downloaded = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                // Best effort; a leftover .partial is never mistaken for the episode
                let _ = tokio::fs::remove_file(&write_path).await;
                return Err(e);
            }
        };

        self.reporter.report(ProgressEvent::Finalizing {
            episode_title: episode.title().to_string(),
        });

        if let Err(e) = tokio::fs::rename(&write_path, target).await {
            let _ = tokio::fs::remove_file(&write_path).await;
            return Err(DownloadError::RenameFailed {
                from: write_path,
                to: target.to_path_buf(),
                source: e,
            });
        }

        Ok(bytes_downloaded)
    }

    async fn write_body(
        &self,
        episode: &Episode,
        response: HttpResponse,
        write_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, DownloadError> {
        let url = episode.audio_url();

        let mut file =
            File::create(write_path)
                .await
                .map_err(|e| DownloadError::FileCreateFailed {
                    path: write_path.to_path_buf(),
                    source: e,
                })?;

        let mut bytes_downloaded: u64 = 0;
        let mut stream = response.body;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(DownloadError::Cancelled {
                        url: url.to_string(),
                    });
                }
                next = stream.next() => next,
            };

            let Some(chunk_result) = next else {
                break;
            };

            let chunk = chunk_result.map_err(|e| DownloadError::StreamFailed {
                url: url.to_string(),
                source: e,
            })?;

            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::FileWriteFailed {
                    path: write_path.to_path_buf(),
                    source: e,
                })?;

            bytes_downloaded += chunk.len() as u64;

            self.reporter.report(ProgressEvent::DownloadProgress {
                episode_title: episode.title().to_string(),
                bytes_downloaded,
                total_bytes: response.content_length,
            });
        }

        // Ensure all data is flushed to disk
        file.flush()
            .await
            .map_err(|e| DownloadError::FileWriteFailed {
                path: write_path.to_path_buf(),
                source: e,
            })?;

        Ok(bytes_downloaded)
    }

    fn target_lock(&self, target: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight
            .entry(target.to_path_buf())
            .or_default()
            .clone()
    }

    /// Forget the lock for `target` once no other fetch holds or awaits it
    fn release_target(&self, target: &Path) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(lock) = in_flight.get(target)
            && Arc::strong_count(lock) == 1
        {
            in_flight.remove(target);
        }
    }
}

async fn is_present(target: &Path) -> bool {
    tokio::fs::metadata(target)
        .await
        .is_ok_and(|metadata| metadata.is_file())
}
