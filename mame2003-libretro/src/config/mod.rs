//! Core options.
//!
//! Option values live in an explicit [`CoreOptions`] value owned by the core
//! instance. It is built from the frontend's variable store with
//! [`CoreOptions::load`] on init and whenever the frontend reports a change;
//! the frame driver then applies it, which re-derives everything that depends
//! on it (input remap policy, audio rate).
//!
//! Every option is declared once in [`OPTION_DEFINITIONS`]. The first listed
//! value is the default, used whenever the frontend has no value or an
//! unrecognized one.

use crate::frontend::OptionSource;
use log::warn;
use std::str::FromStr;
use thiserror::Error;

pub const FRAMESKIP: &str = "mame2003-frameskip";
pub const DCS_SPEEDHACK: &str = "mame2003-dcs-speedhack";
pub const SKIP_DISCLAIMER: &str = "mame2003-skip_disclaimer";
pub const SKIP_WARNINGS: &str = "mame2003-skip_warnings";
pub const SAMPLES: &str = "mame2003-samples";
pub const SAMPLE_RATE: &str = "mame2003-sample_rate";
pub const CHEATS: &str = "mame2003-cheats";
pub const DIAL_SHARE_XY: &str = "mame2003-dialsharexy";
pub const MOUSE_DEVICE: &str = "mame2003-mouse_device";
pub const RSTICK_TO_BUTTONS: &str = "mame2003-rstick_to_btns";
pub const TATE_MODE: &str = "mame2003-option_tate_mode";

const ENABLED: &str = "enabled";
const DISABLED: &str = "disabled";

/// One frontend-visible option.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OptionDefinition {
    pub key: &'static str,
    pub label: &'static str,
    /// Allowed values; the first one is the default.
    pub values: &'static [&'static str],
}

impl OptionDefinition {
    pub fn default_value(&self) -> &'static str {
        self.values[0]
    }

    /// The `"Label; a|b|c"` string libretro expects in `retro_variable::value`.
    pub fn descriptor(&self) -> String {
        format!("{}; {}", self.label, self.values.join("|"))
    }
}

// Touch devices get the pointer by default.
#[cfg(target_os = "ios")]
const MOUSE_DEVICE_VALUES: &[&str] = &["pointer", "mouse", DISABLED];
#[cfg(not(target_os = "ios"))]
const MOUSE_DEVICE_VALUES: &[&str] = &["mouse", "pointer", DISABLED];

pub const OPTION_DEFINITIONS: &[OptionDefinition] = &[
    OptionDefinition {
        key: FRAMESKIP,
        label: "Frameskip",
        values: &["0", "1", "2", "3", "4", "5"],
    },
    OptionDefinition {
        key: DCS_SPEEDHACK,
        label: "MK2/MK3 DCS Speedhack",
        values: &[ENABLED, DISABLED],
    },
    OptionDefinition {
        key: SKIP_DISCLAIMER,
        label: "Skip Disclaimer",
        values: &[ENABLED, DISABLED],
    },
    OptionDefinition {
        key: SKIP_WARNINGS,
        label: "Skip Warnings",
        values: &[DISABLED, ENABLED],
    },
    OptionDefinition {
        key: SAMPLES,
        label: "Samples",
        values: &[ENABLED, DISABLED],
    },
    OptionDefinition {
        key: SAMPLE_RATE,
        label: "Sample Rate (KHz)",
        values: &["48000", "8000", "11025", "22050", "44100"],
    },
    OptionDefinition {
        key: CHEATS,
        label: "Cheats",
        values: &[DISABLED, ENABLED],
    },
    OptionDefinition {
        key: DIAL_SHARE_XY,
        label: "Share 2 player dial controls across one X/Y device",
        values: &[DISABLED, ENABLED],
    },
    OptionDefinition {
        key: MOUSE_DEVICE,
        label: "Mouse Device",
        values: MOUSE_DEVICE_VALUES,
    },
    OptionDefinition {
        key: RSTICK_TO_BUTTONS,
        label: "Right Stick to Buttons",
        values: &[ENABLED, DISABLED],
    },
    OptionDefinition {
        key: TATE_MODE,
        label: "TATE Mode",
        values: &[DISABLED, ENABLED],
    },
];

/// Look up the definition for `key`.
pub fn definition(key: &str) -> Option<&'static OptionDefinition> {
    OPTION_DEFINITIONS.iter().find(|d| d.key == key)
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum OptionError {
    #[error("unknown option key {0}")]
    UnknownKey(String),
    #[error("value {value:?} is not allowed for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Which frontend device feeds the machine's mouse/trackball lines.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MouseDevice {
    /// Native relative mouse deltas and buttons.
    Mouse,
    /// Absolute pointer (touch) converted to relative deltas.
    Pointer,
    /// No mouse input at all.
    #[default]
    Disabled,
}

impl FromStr for MouseDevice {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mouse" => Ok(MouseDevice::Mouse),
            "pointer" => Ok(MouseDevice::Pointer),
            DISABLED => Ok(MouseDevice::Disabled),
            _ => Err(()),
        }
    }
}

/// Every option value, already parsed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoreOptions {
    pub frameskip: u8,
    pub dcs_speedhack: bool,
    pub skip_disclaimer: bool,
    pub skip_warnings: bool,
    pub samples: bool,
    /// Requested output rate in Hz (before the low-frame-rate fallback).
    pub sample_rate: u32,
    pub cheats: bool,
    pub dial_share_xy: bool,
    pub mouse_device: MouseDevice,
    pub rstick_to_buttons: bool,
    pub tate_mode: bool,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self {
            frameskip: 0,
            dcs_speedhack: true,
            skip_disclaimer: true,
            skip_warnings: false,
            samples: true,
            sample_rate: 48000,
            cheats: false,
            dial_share_xy: false,
            mouse_device: if cfg!(target_os = "ios") {
                MouseDevice::Pointer
            } else {
                MouseDevice::Mouse
            },
            rstick_to_buttons: true,
            tate_mode: false,
        }
    }
}

impl CoreOptions {
    /// Read every option from `source`, falling back to defaults.
    pub fn load(source: &mut impl OptionSource) -> Self {
        Self {
            frameskip: read(source, FRAMESKIP),
            dcs_speedhack: read_toggle(source, DCS_SPEEDHACK),
            skip_disclaimer: read_toggle(source, SKIP_DISCLAIMER),
            skip_warnings: read_toggle(source, SKIP_WARNINGS),
            samples: read_toggle(source, SAMPLES),
            sample_rate: read(source, SAMPLE_RATE),
            cheats: read_toggle(source, CHEATS),
            dial_share_xy: read_toggle(source, DIAL_SHARE_XY),
            mouse_device: read(source, MOUSE_DEVICE),
            rstick_to_buttons: read_toggle(source, RSTICK_TO_BUTTONS),
            tate_mode: read_toggle(source, TATE_MODE),
        }
    }
}

/// Check `value` against the declared values of `key`.
pub fn validate(key: &str, value: &str) -> Result<&'static str, OptionError> {
    let definition = definition(key).ok_or_else(|| OptionError::UnknownKey(key.to_owned()))?;
    definition
        .values
        .iter()
        .copied()
        .find(|v| *v == value)
        .ok_or_else(|| OptionError::InvalidValue {
            key: definition.key,
            value: value.to_owned(),
        })
}

/// The frontend's value for `key` if it is one of the declared values, else the default.
fn value_or_default(source: &mut impl OptionSource, key: &'static str) -> &'static str {
    let Some(definition) = definition(key) else {
        return "";
    };
    match source.variable(key) {
        Some(value) => validate(key, &value).unwrap_or_else(|err| {
            warn!("{err}, using {}", definition.default_value());
            definition.default_value()
        }),
        None => definition.default_value(),
    }
}

fn read<T: FromStr + Default>(source: &mut impl OptionSource, key: &'static str) -> T {
    // Declared values always parse; the Default arm only guards the table itself.
    value_or_default(source, key).parse().unwrap_or_default()
}

fn read_toggle(source: &mut impl OptionSource, key: &'static str) -> bool {
    value_or_default(source, key) == ENABLED
}
