mod clock;
mod controller;
mod engine;

#[cfg(feature = "rodio")]
mod audio;

pub use clock::{ClockBackend, ClockHandle};
pub use controller::{PlaybackController, PlaybackRate, PlaybackStatus, SEEK_STEP};
pub use engine::{MediaBackend, MediaHandle};

#[cfg(feature = "rodio")]
pub use audio::{RodioBackend, RodioHandle};
