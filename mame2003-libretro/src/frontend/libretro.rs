//! [`Frontend`] implementation backed by raw libretro callbacks.
//!
//! The exported `retro_*` entry points hand us the callbacks registered by the
//! frontend; this type owns them and converts between Rust types and the C
//! structures `libretro.h` expects.

use super::{AudioSink, Frontend, InputSource, LedSink, OptionSource};
use crate::abi::InputDescriptor;
use crate::av::AvInfo;
use crate::config::OptionDefinition;
use crate::logging::LogSink;
use libretro_sys::{
    AudioSampleBatchFn, EnvironmentFn, GameGeometry, InputPollFn, InputStateFn, LogLevel, LogPrintfFn, SystemAvInfo,
    SystemTiming,
};
use log::{Level, warn};
use std::ffi::{CStr, CString, c_char, c_int, c_uint, c_void};
use std::path::PathBuf;
use std::ptr;

/// `RETRO_ENVIRONMENT_GET_LED_INTERFACE`, newer than `libretro-sys`.
const ENVIRONMENT_GET_LED_INTERFACE: c_uint = 46 | libretro_sys::ENVIRONMENT_EXPERIMENTAL;

/// `retro_set_led_state_t`.
type SetLedStateFn = unsafe extern "C" fn(led: c_int, state: c_int);

/// `struct retro_log_callback`, with the function pointer allowed to be null.
#[repr(C)]
struct RawLogCallback {
    log: Option<LogPrintfFn>,
}

/// `struct retro_led_interface`.
#[repr(C)]
struct RawLedInterface {
    set_led_state: Option<SetLedStateFn>,
}

pub struct LibretroFrontend {
    environment: EnvironmentFn,
    input_poll: InputPollFn,
    input_state: InputStateFn,
    audio_batch: AudioSampleBatchFn,

    /// Backing storage for strings handed to `SET_VARIABLES`.
    option_strings: Vec<CString>,
    /// Backing storage for strings handed to `SET_INPUT_DESCRIPTORS`.
    descriptor_strings: Vec<CString>,

    /// Video geometry of the running game, owned by the video layer. Needed to
    /// publish a full `retro_system_av_info` when timing changes.
    geometry: Option<GameGeometry>,
}

impl LibretroFrontend {
    /// Wrap the callbacks registered through `retro_set_*`.
    ///
    /// # Safety
    /// The callbacks must be the ones supplied by the frontend and must stay
    /// callable for as long as the returned value is used.
    pub unsafe fn new(
        environment: EnvironmentFn,
        input_poll: InputPollFn,
        input_state: InputStateFn,
        audio_batch: AudioSampleBatchFn,
    ) -> Self {
        Self {
            environment,
            input_poll,
            input_state,
            audio_batch,
            option_strings: Vec::new(),
            descriptor_strings: Vec::new(),
            geometry: None,
        }
    }

    /// Record the running game's geometry; later timing changes are published with it.
    pub fn set_geometry(&mut self, geometry: GameGeometry) {
        self.geometry = Some(geometry);
    }

    fn environment(&mut self, cmd: u32, data: *mut c_void) -> bool {
        // SAFETY: `environment` is a frontend callback (see `new`); `data` points to the
        // structure documented for `cmd` and outlives the call.
        unsafe { (self.environment)(cmd, data) }
    }

    fn directory(&mut self, cmd: u32) -> Option<PathBuf> {
        let mut dir: *const c_char = ptr::null();
        if !self.environment(cmd, &mut dir as *mut *const c_char as *mut c_void) || dir.is_null() {
            return None;
        }
        // SAFETY: the frontend returned a NUL-terminated string it keeps alive.
        let dir = unsafe { CStr::from_ptr(dir) }.to_string_lossy();
        if dir.is_empty() {
            None
        } else {
            Some(PathBuf::from(dir.into_owned()))
        }
    }
}

impl InputSource for LibretroFrontend {
    fn input_state(&mut self, port: u32, device: u32, index: u32, id: u32) -> i16 {
        // SAFETY: frontend callback (see `new`).
        unsafe { (self.input_state)(port, device, index, id) }
    }
}

impl AudioSink for LibretroFrontend {
    fn upload_audio(&mut self, interleaved: &[i16]) {
        let frames = interleaved.len() / 2;
        if frames == 0 {
            return;
        }
        // SAFETY: frontend callback (see `new`); the pointer is valid for `frames * 2` samples.
        unsafe {
            (self.audio_batch)(interleaved.as_ptr(), frames);
        }
    }
}

impl OptionSource for LibretroFrontend {
    fn variable(&mut self, key: &str) -> Option<String> {
        let key = CString::new(key).ok()?;
        let mut variable = libretro_sys::Variable {
            key: key.as_ptr(),
            value: ptr::null(),
        };
        let found = self.environment(
            libretro_sys::ENVIRONMENT_GET_VARIABLE,
            &mut variable as *mut libretro_sys::Variable as *mut c_void,
        );
        if !found || variable.value.is_null() {
            return None;
        }
        // SAFETY: the frontend filled in a NUL-terminated value string.
        Some(unsafe { CStr::from_ptr(variable.value) }.to_string_lossy().into_owned())
    }
}

impl Frontend for LibretroFrontend {
    fn poll_input(&mut self) {
        // SAFETY: frontend callback (see `new`).
        unsafe { (self.input_poll)() }
    }

    fn options_updated(&mut self) -> bool {
        let mut updated = false;
        self.environment(
            libretro_sys::ENVIRONMENT_GET_VARIABLE_UPDATE,
            &mut updated as *mut bool as *mut c_void,
        ) && updated
    }

    fn system_directory(&mut self) -> Option<PathBuf> {
        self.directory(libretro_sys::ENVIRONMENT_GET_SYSTEM_DIRECTORY)
    }

    fn save_directory(&mut self) -> Option<PathBuf> {
        self.directory(libretro_sys::ENVIRONMENT_GET_SAVE_DIRECTORY)
    }

    fn register_options(&mut self, definitions: &[OptionDefinition]) {
        let mut strings = Vec::with_capacity(definitions.len() * 2);
        for definition in definitions {
            match (CString::new(definition.key), CString::new(definition.descriptor())) {
                (Ok(key), Ok(value)) => {
                    strings.push(key);
                    strings.push(value);
                }
                _ => warn!("option {} contains a NUL byte, not registered", definition.key),
            }
        }

        let mut variables: Vec<libretro_sys::Variable> = strings
            .chunks_exact(2)
            .map(|pair| libretro_sys::Variable {
                key: pair[0].as_ptr(),
                value: pair[1].as_ptr(),
            })
            .collect();
        variables.push(libretro_sys::Variable {
            key: ptr::null(),
            value: ptr::null(),
        });

        self.environment(
            libretro_sys::ENVIRONMENT_SET_VARIABLES,
            variables.as_mut_ptr() as *mut c_void,
        );
        self.option_strings = strings;
    }

    fn set_input_descriptors(&mut self, descriptors: &[InputDescriptor]) {
        let strings: Vec<CString> = descriptors
            .iter()
            .map(|d| CString::new(d.description).unwrap_or_default())
            .collect();

        let mut raw: Vec<libretro_sys::InputDescriptor> = descriptors
            .iter()
            .zip(&strings)
            .map(|(d, description)| libretro_sys::InputDescriptor {
                port: d.port,
                device: d.device,
                index: d.index,
                id: d.id,
                description: description.as_ptr(),
            })
            .collect();
        raw.push(libretro_sys::InputDescriptor {
            port: 0,
            device: 0,
            index: 0,
            id: 0,
            description: ptr::null(),
        });

        self.environment(
            libretro_sys::ENVIRONMENT_SET_INPUT_DESCRIPTORS,
            raw.as_mut_ptr() as *mut c_void,
        );
        self.descriptor_strings = strings;
    }

    fn av_info_changed(&mut self, info: &AvInfo) {
        let Some(geometry) = self.geometry.clone() else {
            warn!("no video geometry yet, {} Hz takes effect on the next load", info.sample_rate);
            return;
        };
        let mut av_info = SystemAvInfo {
            geometry,
            timing: SystemTiming {
                fps: info.frames_per_second,
                sample_rate: f64::from(info.sample_rate),
            },
        };
        if !self.environment(
            libretro_sys::ENVIRONMENT_SET_SYSTEM_AV_INFO,
            &mut av_info as *mut SystemAvInfo as *mut c_void,
        ) {
            warn!("frontend rejected the new timing ({} Hz)", info.sample_rate);
        }
    }

    fn set_performance_level(&mut self, level: u32) {
        let mut level: c_uint = level;
        self.environment(
            libretro_sys::ENVIRONMENT_SET_PERFORMANCE_LEVEL,
            &mut level as *mut c_uint as *mut c_void,
        );
    }

    fn led_interface(&mut self) -> Option<Box<dyn LedSink>> {
        let mut interface = RawLedInterface { set_led_state: None };
        if !self.environment(
            ENVIRONMENT_GET_LED_INTERFACE,
            &mut interface as *mut RawLedInterface as *mut c_void,
        ) {
            return None;
        }
        interface
            .set_led_state
            .map(|set_led_state| Box::new(RetroLedSink { set_led_state }) as Box<dyn LedSink>)
    }

    fn log_sink(&mut self) -> Option<Box<dyn LogSink>> {
        let mut callback = RawLogCallback { log: None };
        if !self.environment(
            libretro_sys::ENVIRONMENT_GET_LOG_INTERFACE,
            &mut callback as *mut RawLogCallback as *mut c_void,
        ) {
            return None;
        }
        callback
            .log
            .map(|log| Box::new(RetroLogSink { log }) as Box<dyn LogSink>)
    }
}

/// Writes log lines through `retro_log_printf_t`.
struct RetroLogSink {
    log: LogPrintfFn,
}

/// Forwards lamp changes to `retro_set_led_state_t`.
struct RetroLedSink {
    set_led_state: SetLedStateFn,
}

impl LedSink for RetroLedSink {
    fn set_led_state(&self, led: i32, state: i32) {
        // SAFETY: frontend LED callback.
        unsafe { (self.set_led_state)(led, state) }
    }
}

/// `message` as a printf format string that prints it verbatim, newline terminated.
fn printf_literal(message: &str) -> Option<CString> {
    let mut format = message.replace('%', "%%");
    format.push('\n');
    CString::new(format).ok()
}

impl LogSink for RetroLogSink {
    fn write(&self, level: Level, message: &str) {
        let Some(format) = printf_literal(message) else {
            return;
        };
        let level = match level {
            Level::Error => LogLevel::Error,
            Level::Warn => LogLevel::Warn,
            Level::Info => LogLevel::Info,
            Level::Debug | Level::Trace => LogLevel::Debug,
        };
        // SAFETY: frontend log callback; every `%` is escaped, so the format consumes no arguments.
        unsafe { (self.log)(level, format.as_ptr()) }
    }
}
