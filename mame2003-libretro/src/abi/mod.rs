//! libretro-facing constants for the MAME 2003 core.
//!
//! This module pins down the parts of the frontend contract that never change
//! at runtime:
//! - the core info reported to the frontend,
//! - the device classes and control ids we query every frame,
//! - the layout of the machine core's raw input lines,
//! - the input descriptors shown in the frontend's remapping UI.
//!
//! Device and control ids are taken straight from `libretro-sys` so that they
//! always agree with `libretro.h`.

/// Static information reported through `retro_get_system_info`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CoreInfo {
    pub library_name: &'static str,
    pub library_version: &'static str,
    /// `|`-separated list of extensions the frontend may hand us.
    pub valid_extensions: &'static str,
    /// Romsets are zip archives looked up by path, never loaded into memory by the frontend.
    pub need_fullpath: bool,
    /// The frontend must not extract the zip for us.
    pub block_extract: bool,
}

pub const CORE_INFO: CoreInfo = CoreInfo {
    library_name: "MAME 2003",
    library_version: "0.78",
    valid_extensions: "zip",
    need_fullpath: true,
    block_extract: true,
};

/// Device classes queried through the frontend's input surface.
pub mod device {
    pub use libretro_sys::{
        DEVICE_ANALOG as ANALOG, DEVICE_JOYPAD as JOYPAD, DEVICE_KEYBOARD as KEYBOARD,
        DEVICE_MOUSE as MOUSE, DEVICE_POINTER as POINTER,
    };

    /// Analog stick selectors (device index for [`ANALOG`]).
    pub use libretro_sys::{
        DEVICE_INDEX_ANALOG_LEFT as ANALOG_LEFT, DEVICE_INDEX_ANALOG_RIGHT as ANALOG_RIGHT,
    };

    /// Axis ids for [`ANALOG`].
    pub use libretro_sys::{DEVICE_ID_ANALOG_X as ANALOG_X, DEVICE_ID_ANALOG_Y as ANALOG_Y};

    /// Control ids for [`MOUSE`].
    pub use libretro_sys::{
        DEVICE_ID_MOUSE_LEFT as MOUSE_LEFT, DEVICE_ID_MOUSE_RIGHT as MOUSE_RIGHT,
        DEVICE_ID_MOUSE_X as MOUSE_X, DEVICE_ID_MOUSE_Y as MOUSE_Y,
    };

    /// Control ids for [`POINTER`].
    pub use libretro_sys::{
        DEVICE_ID_POINTER_PRESSED as POINTER_PRESSED, DEVICE_ID_POINTER_X as POINTER_X,
        DEVICE_ID_POINTER_Y as POINTER_Y,
    };
}

/// Performance level requested from the frontend. The Midway DCS drivers need at least 9.
pub const PERFORMANCE_LEVEL: u32 = 10;

/// Number of player slots mirrored every frame.
pub const MAX_PLAYERS: usize = 4;

/// Raw joystick lines owned by one player: 16 joypad buttons plus two mouse buttons.
pub const LINES_PER_PLAYER: usize = 18;

/// Size of the machine core's joystick/coin/admin line table.
pub const JOYSTICK_LINES: usize = MAX_PLAYERS * LINES_PER_PLAYER;

/// Size of the machine core's keyboard line table (indexed by libretro key code).
pub const KEYBOARD_LINES: usize = 512;

/// Per-player line that carries the primary mouse/pointer button.
pub const MOUSE_BUTTON_1_LINE: usize = 16;

/// Per-player line that carries the secondary mouse button.
pub const MOUSE_BUTTON_2_LINE: usize = 17;

/// Analog axes mirrored per player, in table order.
pub const ANALOG_AXES: usize = 4;

/// Joypad button ids, aligned with libretro's `RETRO_DEVICE_ID_JOYPAD_*`.
///
/// The discriminant doubles as the per-player line offset in the raw joystick table.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum JoypadButton {
    B = libretro_sys::DEVICE_ID_JOYPAD_B,
    Y = libretro_sys::DEVICE_ID_JOYPAD_Y,
    Select = libretro_sys::DEVICE_ID_JOYPAD_SELECT,
    Start = libretro_sys::DEVICE_ID_JOYPAD_START,
    Up = libretro_sys::DEVICE_ID_JOYPAD_UP,
    Down = libretro_sys::DEVICE_ID_JOYPAD_DOWN,
    Left = libretro_sys::DEVICE_ID_JOYPAD_LEFT,
    Right = libretro_sys::DEVICE_ID_JOYPAD_RIGHT,
    A = libretro_sys::DEVICE_ID_JOYPAD_A,
    X = libretro_sys::DEVICE_ID_JOYPAD_X,
    L = libretro_sys::DEVICE_ID_JOYPAD_L,
    R = libretro_sys::DEVICE_ID_JOYPAD_R,
    L2 = libretro_sys::DEVICE_ID_JOYPAD_L2,
    R2 = libretro_sys::DEVICE_ID_JOYPAD_R2,
    L3 = libretro_sys::DEVICE_ID_JOYPAD_L3,
    R3 = libretro_sys::DEVICE_ID_JOYPAD_R3,
}

impl JoypadButton {
    /// Every button, in libretro id order.
    pub const ALL: [JoypadButton; 16] = [
        JoypadButton::B,
        JoypadButton::Y,
        JoypadButton::Select,
        JoypadButton::Start,
        JoypadButton::Up,
        JoypadButton::Down,
        JoypadButton::Left,
        JoypadButton::Right,
        JoypadButton::A,
        JoypadButton::X,
        JoypadButton::L,
        JoypadButton::R,
        JoypadButton::L2,
        JoypadButton::R2,
        JoypadButton::L3,
        JoypadButton::R3,
    ];

    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Line index of this button for `player` in the raw joystick table.
    pub const fn line(self, player: usize) -> usize {
        player * LINES_PER_PLAYER + self as usize
    }
}

/// One entry of the frontend's input descriptor list.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InputDescriptor {
    pub port: u32,
    pub device: u32,
    pub index: u32,
    pub id: u32,
    pub description: &'static str,
}

/// Labels shown by the frontend for each described joypad control.
const DESCRIBED_BUTTONS: [(JoypadButton, &str); 16] = [
    (JoypadButton::Left, "Joystick Left"),
    (JoypadButton::Right, "Joystick Right"),
    (JoypadButton::Up, "Joystick Up"),
    (JoypadButton::Down, "Joystick Down"),
    (JoypadButton::B, "Button 1"),
    (JoypadButton::A, "Button 2"),
    (JoypadButton::Y, "Button 3"),
    (JoypadButton::X, "Button 4"),
    (JoypadButton::L, "Button 5"),
    (JoypadButton::R, "Button 6"),
    (JoypadButton::L2, "Button 7"),
    (JoypadButton::R2, "Button 8"),
    (JoypadButton::L3, "Button 9"),
    (JoypadButton::R3, "Button 10"),
    (JoypadButton::Select, "Insert Coin"),
    (JoypadButton::Start, "Start"),
];

/// Descriptors for every player slot, player-major.
pub fn input_descriptors() -> Vec<InputDescriptor> {
    (0..MAX_PLAYERS as u32)
        .flat_map(|port| {
            DESCRIBED_BUTTONS
                .iter()
                .map(move |&(button, description)| InputDescriptor {
                    port,
                    device: device::JOYPAD,
                    index: 0,
                    id: button.id(),
                    description,
                })
        })
        .collect()
}
