// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;
use std::time::Duration;

use crate::error::PlaybackError;

/// Opens local media files for playback
pub trait MediaBackend {
    type Handle: MediaHandle;

    /// Open the file at `path`. The returned media is paused at the start.
    fn open(&mut self, path: &Path) -> Result<Self::Handle, PlaybackError>;
}

/// Transport, volume and rate control over one opened media file.
///
/// Implementations clamp seeks to the media's bounds where they know them.
/// Dropping the handle releases the media and stops any output.
pub trait MediaHandle {
    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, position: Duration);

    fn position(&self) -> Duration;

    /// Volume in `[0.0, 1.0]`
    fn set_volume(&mut self, volume: f64);

    fn volume(&self) -> f64;

    /// Speed multiplier relative to normal speed
    fn set_rate(&mut self, rate: f64);

    fn rate(&self) -> f64;
}
