//! The machine-core seam.
//!
//! The emulated hardware (drivers, CPUs, sound chips, video) is an external
//! collaborator. These traits are everything the adaptation layer needs from
//! it; errors the machine reports are opaque [`anyhow::Error`] values.

use crate::config::CoreOptions;
use crate::frontend::LedSink;
use crate::input::InputTable;
use crate::storage::PathResolver;

/// Vector-game rendering options. Fixed for every session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VectorOptions {
    pub resolution_multiplier: u32,
    pub antialias: bool,
    pub beam: u32,
    pub translucency: bool,
    pub intensity: f32,
    pub flicker: u32,
}

impl Default for VectorOptions {
    fn default() -> Self {
        Self {
            resolution_multiplier: 2,
            antialias: true,
            beam: 2,
            translucency: true,
            intensity: 1.5,
            flicker: (2.55 * 1.5) as u32,
        }
    }
}

/// Everything the machine needs to start a driver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BootOptions {
    pub skip_disclaimer: bool,
    pub skip_warnings: bool,
    pub use_samples: bool,
    pub cheats: bool,
    /// Requested output rate; 0 runs the machine without sound. The audio
    /// pacer may still fall back to a lower rate for slow drivers.
    pub sample_rate: u32,
    pub dcs_speedhack: bool,
    pub dial_share_xy: bool,
    pub frameskip: u8,
    pub tate_mode: bool,
    pub vector: VectorOptions,
}

impl BootOptions {
    pub fn new(options: &CoreOptions, sample_rate: u32) -> Self {
        Self {
            skip_disclaimer: options.skip_disclaimer,
            skip_warnings: options.skip_warnings,
            use_samples: options.samples,
            cheats: options.cheats,
            sample_rate,
            dcs_speedhack: options.dcs_speedhack,
            dial_share_xy: options.dial_share_xy,
            frameskip: options.frameskip,
            tate_mode: options.tate_mode,
            vector: VectorOptions::default(),
        }
    }
}

/// State-save surface of the machine.
///
/// Segment tag 0 is the machine's global state; tag `cpu + 1` is the state
/// registered by CPU `cpu` and is only valid while that CPU's context is
/// active.
pub trait SnapshotTarget {
    fn cpu_count(&self) -> usize;

    /// Exact size in bytes of segment `tag` in the current machine.
    fn segment_size(&self, tag: u32) -> usize;

    /// Make CPU `cpu` the active context.
    fn push_context(&mut self, cpu: usize);

    /// Restore the context active before the matching `push_context`.
    fn pop_context(&mut self);

    /// Re-resolve memory banking for the active CPU so registered pointers are current.
    fn reset_banking(&mut self);

    /// Append segment `tag` to `out`. Must append exactly `segment_size(tag)` bytes.
    fn save_segment(&mut self, tag: u32, out: &mut Vec<u8>) -> anyhow::Result<()>;

    /// Restore segment `tag` from `data`, which is `segment_size(tag)` bytes long.
    fn load_segment(&mut self, tag: u32, data: &[u8]) -> anyhow::Result<()>;
}

/// The emulated machine driven one frame at a time.
pub trait MachineCore: SnapshotTarget {
    /// Index of the driver named `romset`, if the machine knows it.
    fn find_driver(&self, romset: &str) -> Option<usize>;

    /// Start driver `driver`. All file access goes through `paths`.
    fn boot(&mut self, driver: usize, options: &BootOptions, paths: &PathResolver) -> anyhow::Result<()>;

    fn frames_per_second(&self) -> f64;

    fn stereo(&self) -> bool;

    /// Run one frame reading `input`, producing `audio_samples` samples per channel.
    ///
    /// Returns the frame's audio (interleaved when stereo), or `None` when the
    /// machine produced no sound this frame.
    fn run_frame(&mut self, input: &InputTable, audio_samples: usize) -> Option<&[i16]>;

    fn reset(&mut self);

    /// Stop the running driver, flushing nvram and config through `paths`.
    fn shutdown(&mut self, paths: &PathResolver);

    /// Options changed while running.
    fn options_changed(&mut self, _options: &CoreOptions) {}

    /// Where cabinet LED changes go; `None` when the frontend has no LED interface.
    fn attach_leds(&mut self, _leds: Option<Box<dyn LedSink>>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_options_are_fixed() {
        let vector = VectorOptions::default();
        assert_eq!(vector.flicker, 3);
        assert_eq!(vector.resolution_multiplier, 2);
        assert_eq!(vector.intensity, 1.5);
    }

    #[test]
    fn boot_options_follow_core_options() {
        let options = CoreOptions {
            samples: false,
            cheats: true,
            frameskip: 2,
            ..CoreOptions::default()
        };
        let boot = BootOptions::new(&options, 22050);
        assert!(!boot.use_samples);
        assert!(boot.cheats);
        assert_eq!(boot.frameskip, 2);
        assert_eq!(boot.sample_rate, 22050);
        assert!(boot.skip_disclaimer);
    }
}
