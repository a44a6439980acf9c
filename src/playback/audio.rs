// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::warn;

use crate::error::PlaybackError;

use super::engine::{MediaBackend, MediaHandle};

/// Backend playing through the default audio output device
pub struct RodioBackend {
    // Output stops when the stream is dropped
    _stream: OutputStream,
    output: OutputStreamHandle,
}

impl RodioBackend {
    pub fn new() -> Result<Self, PlaybackError> {
        let (stream, output) = OutputStream::try_default()
            .map_err(|e| PlaybackError::OutputUnavailable(e.to_string()))?;
        Ok(Self {
            _stream: stream,
            output,
        })
    }
}

impl MediaBackend for RodioBackend {
    type Handle = RodioHandle;

    fn open(&mut self, path: &Path) -> Result<RodioHandle, PlaybackError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PlaybackError::MediaNotFound(path.to_path_buf()),
            _ => PlaybackError::OpenFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let decoder =
            Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::DecodeFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let duration = decoder.total_duration();

        let sink = Sink::try_new(&self.output)
            .map_err(|e| PlaybackError::OutputUnavailable(e.to_string()))?;
        sink.pause();
        sink.append(decoder);

        Ok(RodioHandle { sink, duration })
    }
}

/// One decoded file queued on its own sink; dropping it stops the sound
pub struct RodioHandle {
    sink: Sink,
    duration: Option<Duration>,
}

impl MediaHandle for RodioHandle {
    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn seek(&mut self, position: Duration) {
        let position = match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
        if let Err(e) = self.sink.try_seek(position) {
            warn!(error = %e, "Seek not supported for this media");
        }
    }

    fn position(&self) -> Duration {
        self.sink.get_pos()
    }

    fn set_volume(&mut self, volume: f64) {
        self.sink.set_volume(volume as f32);
    }

    fn volume(&self) -> f64 {
        f64::from(self.sink.volume())
    }

    fn set_rate(&mut self, rate: f64) {
        if !rate.is_finite() || rate <= 0.0 {
            return;
        }
        self.sink.set_speed(rate as f32);
    }

    fn rate(&self) -> f64 {
        f64::from(self.sink.speed())
    }
}
