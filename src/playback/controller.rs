// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::PlaybackError;

use super::engine::{MediaBackend, MediaHandle};

/// Distance covered by one seek forward or back
pub const SEEK_STEP: Duration = Duration::from_secs(10);

/// Volume moves in tenths
const VOLUME_STEPS: f64 = 10.0;

/// Observable state of the playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// Nothing has been loaded yet
    Unloaded,
    Paused,
    Playing,
}

impl PlaybackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Unloaded => "none loaded",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Playing => "playing",
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The playback speeds offered, in cycling order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackRate {
    #[default]
    Normal,
    OneAndQuarter,
    OneAndHalf,
    Double,
}

impl PlaybackRate {
    pub fn as_f64(self) -> f64 {
        match self {
            PlaybackRate::Normal => 1.0,
            PlaybackRate::OneAndQuarter => 1.25,
            PlaybackRate::OneAndHalf => 1.5,
            PlaybackRate::Double => 2.0,
        }
    }

    /// The rate matching `rate` exactly, if it is one of the offered speeds
    pub fn from_f64(rate: f64) -> Option<Self> {
        [
            PlaybackRate::Normal,
            PlaybackRate::OneAndQuarter,
            PlaybackRate::OneAndHalf,
            PlaybackRate::Double,
        ]
        .into_iter()
        .find(|candidate| candidate.as_f64() == rate)
    }

    pub fn next(self) -> Self {
        match self {
            PlaybackRate::Normal => PlaybackRate::OneAndQuarter,
            PlaybackRate::OneAndQuarter => PlaybackRate::OneAndHalf,
            PlaybackRate::OneAndHalf => PlaybackRate::Double,
            PlaybackRate::Double => PlaybackRate::Normal,
        }
    }
}

impl fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_f64())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Paused,
    Playing,
}

enum Session<H> {
    Unloaded,
    Loaded { media: H, transport: Transport },
}

/// Owns the single playback session and drives it through its backend.
///
/// Transport, volume and rate operations on an unloaded session do nothing.
/// Queries on an unloaded session report status "none loaded", volume 0.0
/// and rate "1.0".
pub struct PlaybackController<B: MediaBackend> {
    backend: B,
    session: Session<B::Handle>,
}

impl<B: MediaBackend> PlaybackController<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            session: Session::Unloaded,
        }
    }

    /// Create a controller with `path` already loaded and paused
    pub fn with_media(backend: B, path: &Path) -> Result<Self, PlaybackError> {
        let mut controller = Self::new(backend);
        controller.load(path)?;
        Ok(controller)
    }

    /// Replace the current media with the file at `path`.
    ///
    /// The new session starts paused at normal speed; volume is left as the
    /// backend reports it. If the file cannot be opened the current session
    /// is kept.
    pub fn load(&mut self, path: &Path) -> Result<(), PlaybackError> {
        let mut media = self.backend.open(path)?;
        media.set_rate(PlaybackRate::Normal.as_f64());

        self.session = Session::Loaded {
            media,
            transport: Transport::Paused,
        };
        debug!(path = %path.display(), "Loaded media");
        Ok(())
    }

    pub fn play(&mut self) {
        match &mut self.session {
            Session::Unloaded => trace!("play ignored, nothing loaded"),
            Session::Loaded { media, transport } => {
                media.play();
                *transport = Transport::Playing;
            }
        }
    }

    pub fn pause(&mut self) {
        match &mut self.session {
            Session::Unloaded => trace!("pause ignored, nothing loaded"),
            Session::Loaded { media, transport } => {
                media.pause();
                *transport = Transport::Paused;
            }
        }
    }

    /// Skip ahead by [`SEEK_STEP`]; the backend clamps at the end of the media
    pub fn seek_forward(&mut self) {
        if let Some(media) = self.media_mut() {
            let target = media.position() + SEEK_STEP;
            media.seek(target);
        }
    }

    /// Skip back by [`SEEK_STEP`], stopping at the start of the media
    pub fn seek_back(&mut self) {
        if let Some(media) = self.media_mut() {
            let target = media.position().saturating_sub(SEEK_STEP);
            media.seek(target);
        }
    }

    pub fn volume_up(&mut self) {
        self.step_volume(1);
    }

    pub fn volume_down(&mut self) {
        self.step_volume(-1);
    }

    /// Move volume by one tenth; a step that would leave [0.0, 1.0] is ignored
    fn step_volume(&mut self, steps: i32) {
        let Some(media) = self.media_mut() else {
            trace!("volume change ignored, nothing loaded");
            return;
        };

        let tenths = (media.volume() * VOLUME_STEPS).round() as i32 + steps;
        if !(0..=VOLUME_STEPS as i32).contains(&tenths) {
            trace!(tenths, "volume change out of range, ignored");
            return;
        }

        media.set_volume(f64::from(tenths) / VOLUME_STEPS);
    }

    /// Advance the speed 1.0 → 1.25 → 1.5 → 2.0 → 1.0
    pub fn cycle_rate(&mut self) {
        let Some(media) = self.media_mut() else {
            trace!("rate change ignored, nothing loaded");
            return;
        };

        match PlaybackRate::from_f64(media.rate()) {
            Some(rate) => media.set_rate(rate.next().as_f64()),
            None => trace!(rate = media.rate(), "unrecognised rate, not cycling"),
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        match &self.session {
            Session::Unloaded => PlaybackStatus::Unloaded,
            Session::Loaded {
                transport: Transport::Paused,
                ..
            } => PlaybackStatus::Paused,
            Session::Loaded {
                transport: Transport::Playing,
                ..
            } => PlaybackStatus::Playing,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.session, Session::Loaded { .. })
    }

    /// Current volume, 0.0 when nothing is loaded
    pub fn volume(&self) -> f64 {
        self.media().map_or(0.0, |media| media.volume())
    }

    /// Current speed multiplier, 1.0 when nothing is loaded
    pub fn rate(&self) -> f64 {
        self.media()
            .map_or(PlaybackRate::Normal.as_f64(), |media| media.rate())
    }

    /// Current speed as text, e.g. `1.25`
    pub fn rate_label(&self) -> String {
        format!("{:?}", self.rate())
    }

    /// Current position, zero when nothing is loaded
    pub fn position(&self) -> Duration {
        self.media().map_or(Duration::ZERO, |media| media.position())
    }

    fn media(&self) -> Option<&B::Handle> {
        match &self.session {
            Session::Unloaded => None,
            Session::Loaded { media, .. } => Some(media),
        }
    }

    fn media_mut(&mut self) -> Option<&mut B::Handle> {
        match &mut self.session {
            Session::Unloaded => None,
            Session::Loaded { media, .. } => Some(media),
        }
    }
}
