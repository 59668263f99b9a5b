//! The frontend seam.
//!
//! The core never talks to libretro callbacks directly; it goes through these
//! traits so that the frame driver, the input mirror and the audio pacer can be
//! driven by a real frontend ([`LibretroFrontend`]) or by a test double.
//!
//! The split follows what each component needs:
//! - [`InputSource`]: per-frame input queries (input mirror).
//! - [`AudioSink`]: one interleaved stereo batch per frame (audio pacer).
//! - [`OptionSource`]: named configuration values (options parsing).
//! - [`LedSink`]: cabinet lamps the machine drives.
//! - [`Frontend`]: everything else the frame driver uses.

mod libretro;

pub use libretro::LibretroFrontend;

use crate::abi::InputDescriptor;
use crate::av::AvInfo;
use crate::config::OptionDefinition;
use crate::logging::LogSink;
use std::path::PathBuf;

/// Per-frame input queries, keyed exactly like `retro_input_state_t`.
///
/// Digital controls report 0/1; analog axes and pointer coordinates use the
/// full signed 16-bit range.
pub trait InputSource {
    fn input_state(&mut self, port: u32, device: u32, index: u32, id: u32) -> i16;
}

/// Consumer of interleaved signed 16-bit stereo samples.
pub trait AudioSink {
    /// `interleaved.len() / 2` sample frames, left channel first.
    fn upload_audio(&mut self, interleaved: &[i16]);
}

/// Cabinet LED outputs (`retro_set_led_state_t`).
pub trait LedSink {
    fn set_led_state(&self, led: i32, state: i32);
}

/// Named configuration values (`retro_variable` lookups).
pub trait OptionSource {
    /// Current value of `key`, or `None` when the frontend does not know it.
    fn variable(&mut self, key: &str) -> Option<String>;
}

/// The full surface the frame driver needs from its host.
pub trait Frontend: InputSource + AudioSink + OptionSource {
    /// Latch input for the coming frame (`retro_input_poll_t`).
    fn poll_input(&mut self);

    /// Whether any option changed since the last call.
    fn options_updated(&mut self) -> bool;

    /// The frontend's system directory, if it has one configured.
    fn system_directory(&mut self) -> Option<PathBuf>;

    /// The frontend's save directory, if it has one configured.
    fn save_directory(&mut self) -> Option<PathBuf>;

    /// Publish the option keys, labels and allowed values.
    fn register_options(&mut self, _definitions: &[OptionDefinition]) {}

    /// Publish the controls shown in the frontend's remapping UI.
    fn set_input_descriptors(&mut self, _descriptors: &[InputDescriptor]) {}

    /// Timing changed after a sample-rate option change.
    fn av_info_changed(&mut self, _info: &AvInfo) {}

    /// Where core log output should go, if the frontend has a log interface.
    fn log_sink(&mut self) -> Option<Box<dyn LogSink>> {
        None
    }

    /// The frontend's LED interface, fetched again with every option load.
    fn led_interface(&mut self) -> Option<Box<dyn LedSink>> {
        None
    }

    /// Tell the frontend how demanding the core is.
    fn set_performance_level(&mut self, _level: u32) {}
}
