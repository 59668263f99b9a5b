//! Drives the full core with a scripted machine and a recording frontend.

use mame2003_libretro::Mame2003Core;
use mame2003_libretro::abi::{InputDescriptor, JoypadButton, PERFORMANCE_LEVEL, device, input_descriptors};
use mame2003_libretro::av::{AvInfo, FALLBACK_SAMPLE_RATE};
use mame2003_libretro::config::{self, OptionDefinition};
use mame2003_libretro::frontend::{AudioSink, Frontend, InputSource, LedSink, OptionSource};
use mame2003_libretro::input::InputTable;
use mame2003_libretro::loader::LoadError;
use mame2003_libretro::machine::{BootOptions, MachineCore, SnapshotTarget};
use mame2003_libretro::state::SnapshotError;
use mame2003_libretro::storage::{FileCategory, OpenMode, PathResolver};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use tempfile::TempDir;

const DRIVERS: &[&str] = &["dkong", "sf2"];

struct ScriptedMachine {
    fps: f64,
    stereo: bool,
    frame: u32,
    ram: Vec<u8>,
    cpus: Vec<Vec<u8>>,
    context: Vec<usize>,
    audio: Vec<i16>,
    booted: Option<(usize, BootOptions)>,
    start_pressed: bool,
    option_changes: usize,
    resets: usize,
    leds: Option<Box<dyn LedSink>>,
    led_fetches: usize,
}

impl ScriptedMachine {
    fn new(fps: f64, stereo: bool) -> Self {
        Self {
            fps,
            stereo,
            frame: 0,
            ram: vec![0; 16],
            cpus: vec![vec![0; 8], vec![0; 8]],
            context: Vec::new(),
            audio: Vec::new(),
            booted: None,
            start_pressed: false,
            option_changes: 0,
            resets: 0,
            leds: None,
            led_fetches: 0,
        }
    }

    fn state(&self) -> (Vec<u8>, Vec<Vec<u8>>) {
        (self.ram.clone(), self.cpus.clone())
    }
}

impl SnapshotTarget for ScriptedMachine {
    fn cpu_count(&self) -> usize {
        self.cpus.len()
    }

    fn segment_size(&self, tag: u32) -> usize {
        match tag {
            0 => self.ram.len(),
            cpu => self.cpus[cpu as usize - 1].len(),
        }
    }

    fn push_context(&mut self, cpu: usize) {
        self.context.push(cpu);
    }

    fn pop_context(&mut self) {
        self.context.pop();
    }

    fn reset_banking(&mut self) {}

    fn save_segment(&mut self, tag: u32, out: &mut Vec<u8>) -> anyhow::Result<()> {
        match tag {
            0 => out.extend_from_slice(&self.ram),
            cpu => {
                anyhow::ensure!(self.context.last() == Some(&(cpu as usize - 1)), "wrong context");
                out.extend_from_slice(&self.cpus[cpu as usize - 1]);
            }
        }
        Ok(())
    }

    fn load_segment(&mut self, tag: u32, data: &[u8]) -> anyhow::Result<()> {
        match tag {
            0 => self.ram.copy_from_slice(data),
            cpu => {
                anyhow::ensure!(self.context.last() == Some(&(cpu as usize - 1)), "wrong context");
                self.cpus[cpu as usize - 1].copy_from_slice(data);
            }
        }
        Ok(())
    }
}

impl MachineCore for ScriptedMachine {
    fn find_driver(&self, romset: &str) -> Option<usize> {
        DRIVERS.iter().position(|&d| d == romset)
    }

    fn boot(&mut self, driver: usize, options: &BootOptions, _paths: &PathResolver) -> anyhow::Result<()> {
        self.booted = Some((driver, *options));
        Ok(())
    }

    fn frames_per_second(&self) -> f64 {
        self.fps
    }

    fn stereo(&self) -> bool {
        self.stereo
    }

    fn run_frame(&mut self, input: &InputTable, audio_samples: usize) -> Option<&[i16]> {
        self.frame += 1;
        self.ram[..4].copy_from_slice(&self.frame.to_le_bytes());
        for (i, cpu) in self.cpus.iter_mut().enumerate() {
            cpu[0] = (self.frame as u8).wrapping_add(i as u8);
        }
        self.start_pressed = input.button(0, JoypadButton::Start);

        let channels = if self.stereo { 2 } else { 1 };
        self.audio.clear();
        self.audio.resize(audio_samples * channels, self.frame as i16);
        Some(&self.audio)
    }

    fn reset(&mut self) {
        self.resets += 1;
    }

    fn shutdown(&mut self, paths: &PathResolver) {
        let (driver, _) = self.booted.take().unwrap();
        let mut nvram = paths
            .open(FileCategory::Nvram, &format!("{}.nv", DRIVERS[driver]), OpenMode::Write)
            .unwrap();
        nvram.write_all(&self.ram).unwrap();
    }

    fn options_changed(&mut self, _options: &config::CoreOptions) {
        self.option_changes += 1;
    }

    fn attach_leds(&mut self, leds: Option<Box<dyn LedSink>>) {
        self.leds = leds;
        self.led_fetches += 1;
    }
}

/// Lamp states shared between the frontend and the LED sink it hands out.
#[derive(Clone, Default)]
struct Lamps(Rc<RefCell<Vec<(i32, i32)>>>);

impl LedSink for Lamps {
    fn set_led_state(&self, led: i32, state: i32) {
        self.0.borrow_mut().push((led, state));
    }
}

#[derive(Default)]
struct RecordingFrontend {
    inputs: HashMap<(u32, u32, u32, u32), i16>,
    variables: HashMap<&'static str, &'static str>,
    updated: bool,
    system: Option<PathBuf>,
    save: Option<PathBuf>,
    batches: Vec<usize>,
    registered: Vec<&'static str>,
    descriptors: usize,
    av_changes: Vec<AvInfo>,
    polls: usize,
    performance_level: Option<u32>,
    lamps: Option<Lamps>,
}

impl InputSource for RecordingFrontend {
    fn input_state(&mut self, port: u32, class: u32, index: u32, id: u32) -> i16 {
        self.inputs.get(&(port, class, index, id)).copied().unwrap_or(0)
    }
}

impl AudioSink for RecordingFrontend {
    fn upload_audio(&mut self, interleaved: &[i16]) {
        assert_eq!(interleaved.len() % 2, 0);
        self.batches.push(interleaved.len() / 2);
    }
}

impl OptionSource for RecordingFrontend {
    fn variable(&mut self, key: &str) -> Option<String> {
        self.variables.get(key).map(|v| v.to_string())
    }
}

impl Frontend for RecordingFrontend {
    fn poll_input(&mut self) {
        self.polls += 1;
    }

    fn options_updated(&mut self) -> bool {
        std::mem::take(&mut self.updated)
    }

    fn system_directory(&mut self) -> Option<PathBuf> {
        self.system.clone()
    }

    fn save_directory(&mut self) -> Option<PathBuf> {
        self.save.clone()
    }

    fn register_options(&mut self, definitions: &[OptionDefinition]) {
        self.registered = definitions.iter().map(|d| d.key).collect();
    }

    fn set_input_descriptors(&mut self, descriptors: &[InputDescriptor]) {
        self.descriptors = descriptors.len();
    }

    fn av_info_changed(&mut self, info: &AvInfo) {
        self.av_changes.push(*info);
    }

    fn led_interface(&mut self) -> Option<Box<dyn LedSink>> {
        self.lamps.clone().map(|lamps| Box::new(lamps) as Box<dyn LedSink>)
    }

    fn set_performance_level(&mut self, level: u32) {
        self.performance_level = Some(level);
    }
}

struct Session {
    dir: TempDir,
    core: Mame2003Core<ScriptedMachine>,
    frontend: RecordingFrontend,
}

impl Session {
    fn new(machine: ScriptedMachine) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let frontend = RecordingFrontend {
            system: Some(dir.path().join("system")),
            save: Some(dir.path().join("saves")),
            ..RecordingFrontend::default()
        };
        let mut session = Self {
            dir,
            core: Mame2003Core::new(machine),
            frontend,
        };
        session.core.init(&mut session.frontend);
        session
    }

    fn content(&self, name: &str) -> PathBuf {
        self.dir.path().join("roms").join(name)
    }

    fn load(&mut self, name: &str) -> Result<(), LoadError> {
        let content = self.content(name);
        self.core.load_game(Some(content.as_path()), &mut self.frontend)
    }

    fn run(&mut self, frames: usize) -> usize {
        (0..frames)
            .map(|_| self.core.run_frame(&mut self.frontend).emitted)
            .sum()
    }

    fn path(&self, parts: &[&str]) -> PathBuf {
        parts.iter().fold(self.dir.path().to_path_buf(), |p, part| p.join(part))
    }
}

#[test]
fn init_publishes_every_option() {
    let session = Session::new(ScriptedMachine::new(60.0, true));
    assert_eq!(session.frontend.registered.len(), config::OPTION_DEFINITIONS.len());
    assert!(session.frontend.registered.contains(&config::SAMPLE_RATE));
    assert!(!session.core.is_loaded());
}

#[test]
fn init_requests_the_dcs_performance_level() {
    let session = Session::new(ScriptedMachine::new(60.0, true));
    assert_eq!(session.frontend.performance_level, Some(PERFORMANCE_LEVEL));
    assert_eq!(PERFORMANCE_LEVEL, 10);
}

#[test]
fn led_interface_follows_every_option_load() {
    let mut session = Session::new(ScriptedMachine::new(60.0, true));
    assert_eq!(session.core.machine().led_fetches, 1);
    assert!(session.core.machine().leds.is_none(), "frontend without LEDs");

    let lamps = Lamps::default();
    session.frontend.lamps = Some(lamps.clone());
    session.load("dkong.zip").unwrap();
    session.frontend.updated = true;
    session.run(1);
    assert_eq!(session.core.machine().led_fetches, 2);

    let leds = session.core.machine().leds.as_ref().unwrap();
    leds.set_led_state(0, 1);
    leds.set_led_state(1, 1);
    assert_eq!(*lamps.0.borrow(), [(0, 1), (1, 1)]);
}

#[test]
fn nothing_runs_before_a_game_is_loaded() {
    let mut session = Session::new(ScriptedMachine::new(60.0, true));
    assert_eq!(session.run(3), 0);
    assert_eq!(session.frontend.polls, 0);
    assert_eq!(session.core.serialize_size(), 0);
    assert!(matches!(session.core.serialize(&mut [0u8; 64]), Err(SnapshotError::Empty)));
}

#[test]
fn unknown_romset_fails_to_load() {
    let mut session = Session::new(ScriptedMachine::new(60.0, true));
    let err = session.load("pacman.zip").unwrap_err();
    assert!(matches!(err, LoadError::UnknownRomset(ref name) if name == "pacman"));
    assert!(!session.core.is_loaded());

    let err = session.core.load_game(None, &mut session.frontend).unwrap_err();
    assert!(matches!(err, LoadError::NoContent));
}

#[test]
fn load_boots_the_driver_and_prepares_storage() {
    let mut session = Session::new(ScriptedMachine::new(60.0, true));
    session.load("sf2.zip").unwrap();

    assert_eq!(session.core.romset(), Some("sf2"));
    let (driver, boot) = session.core.machine().booted.unwrap();
    assert_eq!(driver, 1);
    assert_eq!(boot.sample_rate, 48000);
    assert!(boot.skip_disclaimer);
    assert_eq!(boot.vector.flicker, 3);

    assert!(session.path(&["saves", "mame2003"]).is_dir());
    assert!(session.path(&["system", "mame2003"]).is_dir());
    assert_eq!(session.frontend.descriptors, input_descriptors().len());
    assert_eq!(session.core.av_info(), Some(AvInfo::new(60.0, 48000)));

    let paths = session.core.paths().unwrap();
    assert_eq!(
        paths.resolve(FileCategory::Rom, "sf2.zip").unwrap(),
        session.content("sf2.zip")
    );
}

#[test]
fn roots_fall_back_to_the_content_folder() {
    let mut session = Session::new(ScriptedMachine::new(60.0, true));
    session.frontend.system = None;
    session.frontend.save = None;
    session.load("dkong.zip").unwrap();
    assert!(session.path(&["roms", "mame2003"]).is_dir());
}

#[test]
fn audio_keeps_pace_over_many_frames() {
    let fps = 57.444853;
    let mut session = Session::new(ScriptedMachine::new(fps, false));
    session.load("sf2.zip").unwrap();

    let frames = 1200;
    let total = session.run(frames);
    let expected = frames as f64 * 48000.0 / fps;
    assert!((total as f64 - expected).abs() < 2.0, "{total} vs {expected}");
    assert_eq!(session.frontend.batches.len(), frames);
    assert_eq!(session.frontend.polls, frames);
}

#[test]
fn slow_drivers_fall_back_to_the_low_rate() {
    let mut session = Session::new(ScriptedMachine::new(30.0, true));
    session.load("sf2.zip").unwrap();
    assert_eq!(session.core.av_info().unwrap().sample_rate, FALLBACK_SAMPLE_RATE);
    assert_eq!(session.run(1), 735);
}

#[test]
fn input_reaches_the_machine() {
    let mut session = Session::new(ScriptedMachine::new(60.0, true));
    session.load("sf2.zip").unwrap();

    session
        .frontend
        .inputs
        .insert((0, device::JOYPAD, 0, JoypadButton::Start.id()), 1);
    session.run(1);
    assert!(session.core.machine().start_pressed);
    assert!(session.core.input_table().button(0, JoypadButton::Start));

    session.frontend.inputs.clear();
    session.run(1);
    assert!(!session.core.machine().start_pressed);
}

#[test]
fn option_changes_apply_before_the_next_frame() {
    let mut session = Session::new(ScriptedMachine::new(60.0, true));
    session.load("sf2.zip").unwrap();
    assert_eq!(session.run(1), 800);

    session.frontend.variables.insert(config::SAMPLE_RATE, "22050");
    session.frontend.variables.insert(config::RSTICK_TO_BUTTONS, "disabled");
    session.frontend.updated = true;
    assert_eq!(session.run(1), 367, "the frame that sees the change already uses it");
    assert_eq!(session.run(1), 367);

    assert_eq!(session.frontend.av_changes, [AvInfo::new(60.0, 22050)]);
    assert_eq!(session.core.options().sample_rate, 22050);
    assert!(!session.core.options().rstick_to_buttons);
    assert_eq!(session.core.machine().option_changes, 1);
}

#[test]
fn snapshot_round_trip_restores_every_segment() {
    let mut session = Session::new(ScriptedMachine::new(60.0, true));
    session.load("sf2.zip").unwrap();
    session.run(5);

    let size = session.core.serialize_size();
    let mut snapshot = vec![0u8; size];
    assert_eq!(session.core.serialize(&mut snapshot).unwrap(), size);
    let saved = session.core.machine().state();

    session.run(7);
    assert_ne!(session.core.machine().state(), saved);

    session.core.unserialize(&snapshot).unwrap();
    assert_eq!(session.core.machine().state(), saved);
    assert!(session.core.machine().context.is_empty());
}

#[test]
fn truncated_snapshot_leaves_the_machine_alone() {
    let mut session = Session::new(ScriptedMachine::new(60.0, true));
    session.load("sf2.zip").unwrap();
    session.run(2);

    let mut snapshot = vec![0u8; session.core.serialize_size()];
    session.core.serialize(&mut snapshot).unwrap();
    session.run(3);
    let before = session.core.machine().state();

    // Header, then the global segment's tag, length and 16 bytes.
    let cut = 16 + 8 + 16;
    let err = session.core.unserialize(&snapshot[..cut]).unwrap_err();
    assert!(matches!(err, SnapshotError::Truncated { tag: 1 }), "{err}");
    assert_eq!(session.core.machine().state(), before);
}

#[test]
fn reset_and_unload() {
    let mut session = Session::new(ScriptedMachine::new(60.0, true));
    session.load("sf2.zip").unwrap();
    session.run(1);
    session.core.reset();
    assert_eq!(session.core.machine().resets, 1);

    session.core.unload_game();
    assert!(!session.core.is_loaded());
    assert!(!session.core.audio().is_running());
    assert!(session.path(&["saves", "mame2003", "nvram", "sf2.nv"]).is_file());

    session.core.reset();
    assert_eq!(session.core.machine().resets, 1);
    assert_eq!(session.run(1), 0);
}

#[test]
fn deinit_unloads_the_game() {
    let mut session = Session::new(ScriptedMachine::new(60.0, true));
    session.load("sf2.zip").unwrap();
    session.core.deinit();
    assert!(!session.core.is_loaded());
    assert!(session.path(&["saves", "mame2003", "nvram", "sf2.nv"]).is_file());
}
