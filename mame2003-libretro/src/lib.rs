//! mame2003-libretro: the adaptation layer between a libretro frontend and the
//! MAME 0.78 machine core.
//!
//! The frontend drives the core one fixed frame at a time. Each frame
//! [`Mame2003Core::run_frame`]:
//! - polls input and mirrors it into the machine's raw line tables ([`input`]),
//! - re-applies options if the frontend reports a change ([`config`]),
//! - advances the machine one frame ([`machine`]),
//! - paces the produced audio into one stereo batch for the frontend ([`av`]).
//!
//! Save states go through the snapshot sequencer in [`state`]; every file the
//! machine touches is routed by the path resolver in [`storage`].
//!
//! The machine itself sits behind [`machine::MachineCore`] and the frontend
//! behind [`frontend::Frontend`]; [`frontend::LibretroFrontend`] implements the
//! latter on top of the raw libretro callbacks.

pub mod abi;
pub mod av;
pub mod config;
pub mod frontend;
pub mod input;
pub mod loader;
pub mod logging;
pub mod machine;
pub mod state;
pub mod storage;

use crate::av::{AudioPacer, AvInfo, Delivery};
use crate::config::{CoreOptions, OPTION_DEFINITIONS};
use crate::frontend::Frontend;
use crate::input::{InputMirror, InputTable};
use crate::loader::LoadError;
use crate::machine::{BootOptions, MachineCore};
use crate::state::SnapshotError;
use crate::storage::PathResolver;
use log::{LevelFilter, error, info};
use std::path::Path;

/// One core instance: the session state around a machine.
pub struct Mame2003Core<M: MachineCore> {
    machine: M,
    options: CoreOptions,
    input: InputMirror,
    audio: AudioPacer,
    /// Present while a game is loaded.
    paths: Option<PathResolver>,
    romset: Option<String>,
}

impl<M: MachineCore> Mame2003Core<M> {
    pub fn new(machine: M) -> Self {
        let options = CoreOptions::default();
        Self {
            machine,
            options,
            input: InputMirror::new(&options),
            audio: AudioPacer::new(),
            paths: None,
            romset: None,
        }
    }

    /// `retro_init`: hook up logging, publish the options and read their values.
    pub fn init(&mut self, frontend: &mut impl Frontend) {
        if let Some(sink) = frontend.log_sink() {
            logging::install(sink, LevelFilter::Debug);
        }
        frontend.set_performance_level(abi::PERFORMANCE_LEVEL);
        frontend.register_options(OPTION_DEFINITIONS);
        self.reload_options(frontend);
    }

    /// `retro_deinit`.
    pub fn deinit(&mut self) {
        self.unload_game();
        logging::uninstall();
    }

    /// Make `options` current and re-derive everything that depends on them.
    pub fn apply_options(&mut self, options: CoreOptions, frontend: &mut impl Frontend) {
        let rate_changed = options.sample_rate != self.options.sample_rate;
        self.options = options;
        self.input.apply_options(&options);

        if !self.is_loaded() {
            return;
        }
        self.machine.options_changed(&options);
        if rate_changed {
            self.start_audio();
            if let Some(info) = self.av_info() {
                info!("sample rate now {} Hz", info.sample_rate);
                frontend.av_info_changed(&info);
            }
        }
    }

    /// `retro_load_game`: find the driver for `content` and boot it.
    pub fn load_game(&mut self, content: Option<&Path>, frontend: &mut impl Frontend) -> Result<(), LoadError> {
        self.unload_game();

        let content = content.ok_or(LoadError::NoContent)?;
        let romset =
            loader::romset_name(content).ok_or_else(|| LoadError::BadContentName(content.to_path_buf()))?;
        let Some(driver) = self.machine.find_driver(&romset) else {
            error!("Game not found: {romset}");
            return Err(LoadError::UnknownRomset(romset));
        };

        let roots = loader::resolve_roots(content, frontend.system_directory(), frontend.save_directory());
        let paths = PathResolver::new(roots)?;
        paths.init()?;

        frontend.set_input_descriptors(&abi::input_descriptors());

        let boot = BootOptions::new(&self.options, self.options.sample_rate);
        if let Err(reason) = self.machine.boot(driver, &boot, &paths) {
            error!("failed to start {romset}: {reason:#}");
            return Err(LoadError::Boot { romset, reason });
        }

        self.paths = Some(paths);
        let samples = self.start_audio();
        info!(
            "loaded {romset} (driver {driver}), {:.6} fps, {samples} samples per frame",
            self.machine.frames_per_second()
        );
        self.romset = Some(romset);
        Ok(())
    }

    /// `retro_unload_game`.
    pub fn unload_game(&mut self) {
        let Some(paths) = self.paths.take() else {
            return;
        };
        self.machine.shutdown(&paths);
        self.audio.stop();
        if let Some(romset) = self.romset.take() {
            info!("unloaded {romset}");
        }
    }

    /// `retro_reset`.
    pub fn reset(&mut self) {
        if self.is_loaded() {
            self.machine.reset();
        }
    }

    /// `retro_run`: one frame.
    ///
    /// Returns what the audio pacer handed to the frontend; nothing happens
    /// while no game is loaded.
    pub fn run_frame(&mut self, frontend: &mut impl Frontend) -> Delivery {
        if !self.is_loaded() {
            return Delivery::default();
        }

        frontend.poll_input();
        if frontend.options_updated() {
            self.reload_options(frontend);
        }
        self.input.poll_frame(frontend);

        let samples = self.audio.samples_per_frame();
        let audio = self.machine.run_frame(self.input.table(), samples);
        self.audio.deliver(audio, frontend)
    }

    /// Timing for `retro_get_system_av_info`.
    pub fn av_info(&self) -> Option<AvInfo> {
        self.is_loaded()
            .then(|| AvInfo::new(self.machine.frames_per_second(), self.options.sample_rate))
    }

    /// `retro_serialize_size`: 0 while nothing is loaded.
    pub fn serialize_size(&self) -> usize {
        if self.is_loaded() {
            state::snapshot_size(&self.machine)
        } else {
            0
        }
    }

    /// `retro_serialize`.
    pub fn serialize(&mut self, out: &mut [u8]) -> Result<usize, SnapshotError> {
        if !self.is_loaded() {
            return Err(SnapshotError::Empty);
        }
        state::serialize_into(&mut self.machine, out)
    }

    /// `retro_unserialize`.
    pub fn unserialize(&mut self, data: &[u8]) -> Result<(), SnapshotError> {
        if !self.is_loaded() {
            return Err(SnapshotError::Empty);
        }
        state::deserialize(&mut self.machine, data)
    }

    /// Read every option and the LED interface from the frontend, then apply them.
    fn reload_options(&mut self, frontend: &mut impl Frontend) {
        let options = CoreOptions::load(frontend);
        self.machine.attach_leds(frontend.led_interface());
        self.apply_options(options, frontend);
    }

    fn start_audio(&mut self) -> usize {
        self.audio.start(
            self.machine.frames_per_second(),
            self.options.sample_rate,
            self.machine.stereo(),
        )
    }

    pub fn is_loaded(&self) -> bool {
        self.paths.is_some()
    }

    pub fn romset(&self) -> Option<&str> {
        self.romset.as_deref()
    }

    pub fn options(&self) -> &CoreOptions {
        &self.options
    }

    pub fn input_table(&self) -> &InputTable {
        self.input.table()
    }

    pub fn audio(&self) -> &AudioPacer {
        &self.audio
    }

    /// Path resolver of the loaded game.
    pub fn paths(&self) -> Option<&PathResolver> {
        self.paths.as_ref()
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }
}
