//! Audio/video timing for the MAME 2003 core.
//!
//! The machine core produces audio at `sample_rate / frames_per_second`
//! samples per frame, which is almost never an integer. The frontend wants one
//! batch per `retro_run`. [`AudioPacer`] turns the fractional rate into an
//! integral per-frame count and carries the remainder forward so that the long
//! run average matches the true rate.
//!
//! - Output is always interleaved stereo i16; mono machines are duplicated to
//!   both channels.
//! - The sample rate reported to the frontend is the *effective* rate (see
//!   [`effective_sample_rate`]), not the configured one.
//!
//! Notes / limitations (current):
//! - Video geometry is owned by the video layer; [`AvInfo`] only carries timing.

mod audio;


pub use audio::AudioPacer;

/// Rate used when the configured rate is implausibly high for the frame rate.
pub const FALLBACK_SAMPLE_RATE: u32 = 22050;

/// Upper bound (exclusive) on the one-shot drift correction added to a frame.
pub const MAX_DRIFT_CORRECTION: usize = 16;

/// The rate the core actually runs its sound system at.
///
/// A configured rate above `frames_per_second * 1000` means the frame rate is
/// nonsensically low for it; such sessions run at [`FALLBACK_SAMPLE_RATE`].
pub fn effective_sample_rate(frames_per_second: f64, configured: u32) -> u32 {
    if frames_per_second * 1000.0 < f64::from(configured) {
        FALLBACK_SAMPLE_RATE
    } else {
        configured
    }
}

/// Timing half of `retro_system_av_info`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AvInfo {
    pub frames_per_second: f64,
    /// Effective output rate in Hz.
    pub sample_rate: u32,
}

impl AvInfo {
    /// Timing for a machine running at `frames_per_second` with `configured_rate` requested.
    pub fn new(frames_per_second: f64, configured_rate: u32) -> Self {
        Self {
            frames_per_second,
            sample_rate: effective_sample_rate(frames_per_second, configured_rate),
        }
    }
}

/// Result of handing one frame of audio to the pacer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Delivery {
    /// Sample frames (per channel) passed to the sink.
    pub emitted: usize,
    /// Sample frames the machine should produce for the next frame.
    pub next_samples_per_frame: usize,
}
