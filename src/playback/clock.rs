use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::PlaybackError;

use super::engine::{MediaBackend, MediaHandle};

/// Volume of newly opened media
const INITIAL_VOLUME: f64 = 1.0;

/// Headless backend: keeps transport state against a monotonic clock without
/// producing any audio.
#[derive(Debug, Clone, Default)]
pub struct ClockBackend {
    duration: Option<Duration>,
}

impl ClockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat every opened file as lasting `duration`, so seeks and playback
    /// stop at its end
    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
        }
    }
}

impl MediaBackend for ClockBackend {
    type Handle = ClockHandle;

    fn open(&mut self, path: &Path) -> Result<ClockHandle, PlaybackError> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PlaybackError::MediaNotFound(path.to_path_buf()),
            _ => PlaybackError::OpenFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        if !metadata.is_file() {
            return Err(PlaybackError::MediaNotFound(path.to_path_buf()));
        }

        Ok(ClockHandle::new(self.duration))
    }
}

/// Media position tracked as an offset plus the time played since the last
/// transport change
#[derive(Debug, Clone)]
pub struct ClockHandle {
    offset: Duration,
    playing_since: Option<Instant>,
    duration: Option<Duration>,
    volume: f64,
    rate: f64,
}

impl ClockHandle {
    fn new(duration: Option<Duration>) -> Self {
        Self {
            offset: Duration::ZERO,
            playing_since: None,
            duration,
            volume: INITIAL_VOLUME,
            rate: 1.0,
        }
    }

    fn clamp(&self, position: Duration) -> Duration {
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    /// Fold the time played so far into `offset`
    fn settle(&mut self) {
        if self.playing_since.is_some() {
            self.offset = self.position();
            self.playing_since = Some(Instant::now());
        }
    }
}

impl MediaHandle for ClockHandle {
    fn play(&mut self) {
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.offset = self.position();
        self.playing_since = None;
    }

    fn seek(&mut self, position: Duration) {
        self.offset = self.clamp(position);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn position(&self) -> Duration {
        let played = self
            .playing_since
            .map_or(Duration::ZERO, |since| since.elapsed().mul_f64(self.rate));
        self.clamp(self.offset + played)
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    /// Negative and non-finite rates are ignored
    fn set_rate(&mut self, rate: f64) {
        if !rate.is_finite() || rate < 0.0 {
            return;
        }
        self.settle();
        self.rate = rate;
    }

    fn rate(&self) -> f64 {
        self.rate
    }
}
