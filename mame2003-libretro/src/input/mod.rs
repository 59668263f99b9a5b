//! Input state mirror.
//!
//! Once per frame, [`InputMirror::poll_frame`] reads the frontend's abstract
//! devices (keyboard, joypad, analog sticks, mouse or pointer) and writes the
//! machine core's raw line tables in [`InputTable`].
//!
//! Ownership contract: the mirror is the only writer of the table and writes
//! it in a single phase at the start of the frame. The machine core only reads
//! it, through the shared borrow it gets for the duration of its frame step.
//!
//! The remap policy (right stick as buttons, mouse device) is fixed between
//! [`InputMirror::apply_options`] calls; polling never looks at options.

mod keyboard;

pub use keyboard::{KEYBOARD_KEYS, KeyboardKey};

use crate::abi::{
    ANALOG_AXES, JOYSTICK_LINES, JoypadButton, KEYBOARD_LINES, LINES_PER_PLAYER, MAX_PLAYERS,
    MOUSE_BUTTON_1_LINE, MOUSE_BUTTON_2_LINE, device,
};
use crate::config::{CoreOptions, MouseDevice};
use crate::frontend::InputSource;

/// Right-stick deflection (about half travel) that counts as a button press.
pub const RSTICK_THRESHOLD: i16 = 0x4000;

/// Analog axis slots per player, in table order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnalogAxis {
    LeftX = 0,
    LeftY = 1,
    RightX = 2,
    RightY = 3,
}

/// The machine core's raw input tables.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InputTable {
    /// Indexed by libretro key code.
    pub keyboard: [i16; KEYBOARD_LINES],
    /// 18 lines per player: joypad ids 0..16, then two mouse buttons.
    pub joystick: [i16; JOYSTICK_LINES],
    pub analog: [[i16; ANALOG_AXES]; MAX_PLAYERS],
    /// Relative mouse motion per player for this frame.
    pub mouse_x: [i16; MAX_PLAYERS],
    pub mouse_y: [i16; MAX_PLAYERS],
}

impl Default for InputTable {
    fn default() -> Self {
        Self {
            keyboard: [0; KEYBOARD_LINES],
            joystick: [0; JOYSTICK_LINES],
            analog: [[0; ANALOG_AXES]; MAX_PLAYERS],
            mouse_x: [0; MAX_PLAYERS],
            mouse_y: [0; MAX_PLAYERS],
        }
    }
}

impl InputTable {
    pub fn key(&self, code: u32) -> bool {
        self.keyboard.get(code as usize).is_some_and(|&v| v != 0)
    }

    pub fn button(&self, player: usize, button: JoypadButton) -> bool {
        self.joystick[button.line(player)] != 0
    }

    /// Primary and secondary mouse button lines for `player`.
    pub fn mouse_buttons(&self, player: usize) -> (bool, bool) {
        let base = player * LINES_PER_PLAYER;
        (
            self.joystick[base + MOUSE_BUTTON_1_LINE] != 0,
            self.joystick[base + MOUSE_BUTTON_2_LINE] != 0,
        )
    }

    pub fn axis(&self, player: usize, axis: AnalogAxis) -> i16 {
        self.analog[player][axis as usize]
    }

    pub fn mouse_delta(&self, player: usize) -> (i16, i16) {
        (self.mouse_x[player], self.mouse_y[player])
    }
}

/// How frontend devices are folded onto the raw lines. Derived from options.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RemapPolicy {
    pub rstick_to_buttons: bool,
    pub mouse_device: MouseDevice,
}

impl RemapPolicy {
    pub fn from_options(options: &CoreOptions) -> Self {
        Self {
            rstick_to_buttons: options.rstick_to_buttons,
            mouse_device: options.mouse_device,
        }
    }
}

impl Default for RemapPolicy {
    fn default() -> Self {
        Self::from_options(&CoreOptions::default())
    }
}

/// Last absolute pointer position, used to turn touches into relative motion.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PointerTracker {
    pub x: i16,
    pub y: i16,
}

impl PointerTracker {
    /// Relative motion for a new absolute reading `(x, y)`.
    pub fn track(&mut self, x: i16, y: i16) -> (i16, i16) {
        (pointer_delta(x, &mut self.x), pointer_delta(y, &mut self.y))
    }

    pub fn release(&mut self) {
        *self = Self::default();
    }
}

/// Delta of `coord` against `*prev`, updating `*prev`.
///
/// A zero on either side yields no motion; the frontend reports zero before
/// first contact and after release.
pub fn pointer_delta(coord: i16, prev: &mut i16) -> i16 {
    if *prev == 0 || coord == 0 {
        *prev = coord;
        return 0;
    }
    let delta = coord.wrapping_sub(*prev);
    *prev = coord;
    delta
}

/// Writes the frontend's input into the machine core's tables.
#[derive(Debug, Default)]
pub struct InputMirror {
    table: InputTable,
    policy: RemapPolicy,
    pointers: [PointerTracker; MAX_PLAYERS],
}

impl InputMirror {
    pub fn new(options: &CoreOptions) -> Self {
        Self {
            policy: RemapPolicy::from_options(options),
            ..Self::default()
        }
    }

    /// Re-derive the remap policy. Takes effect at the next poll.
    pub fn apply_options(&mut self, options: &CoreOptions) {
        let policy = RemapPolicy::from_options(options);
        if policy.mouse_device != self.policy.mouse_device {
            self.pointers = Default::default();
        }
        self.policy = policy;
    }

    pub fn policy(&self) -> RemapPolicy {
        self.policy
    }

    pub fn table(&self) -> &InputTable {
        &self.table
    }

    /// Overwrite the whole table from the current frontend state.
    pub fn poll_frame(&mut self, source: &mut impl InputSource) {
        for key in KEYBOARD_KEYS {
            self.table.keyboard[key.code as usize] =
                source.input_state(0, device::KEYBOARD, 0, key.code);
        }
        for player in 0..MAX_PLAYERS {
            self.poll_analog(source, player);
            self.poll_joypad(source, player);
            self.poll_mouse(source, player);
        }
    }

    fn poll_analog(&mut self, source: &mut impl InputSource, player: usize) {
        const AXES: [(u32, u32); ANALOG_AXES] = [
            (device::ANALOG_LEFT, device::ANALOG_X),
            (device::ANALOG_LEFT, device::ANALOG_Y),
            (device::ANALOG_RIGHT, device::ANALOG_X),
            (device::ANALOG_RIGHT, device::ANALOG_Y),
        ];
        let port = player as u32;
        for (slot, (stick, axis)) in AXES.into_iter().enumerate() {
            self.table.analog[player][slot] = source.input_state(port, device::ANALOG, stick, axis);
        }
    }

    fn poll_joypad(&mut self, source: &mut impl InputSource, player: usize) {
        let port = player as u32;
        let right_x = self.table.axis(player, AnalogAxis::RightX);
        let right_y = self.table.axis(player, AnalogAxis::RightY);

        for button in JoypadButton::ALL {
            let forced = self.policy.rstick_to_buttons
                && match button {
                    JoypadButton::B => right_y > RSTICK_THRESHOLD,
                    JoypadButton::Y => right_x < -RSTICK_THRESHOLD,
                    JoypadButton::A => right_x > RSTICK_THRESHOLD,
                    JoypadButton::X => right_y < -RSTICK_THRESHOLD,
                    _ => false,
                };
            self.table.joystick[button.line(player)] = if forced {
                1
            } else {
                source.input_state(port, device::JOYPAD, 0, button.id())
            };
        }
    }

    fn poll_mouse(&mut self, source: &mut impl InputSource, player: usize) {
        let port = player as u32;
        let base = player * LINES_PER_PLAYER;

        let (button_1, button_2, dx, dy) = match self.policy.mouse_device {
            MouseDevice::Mouse => (
                source.input_state(port, device::MOUSE, 0, device::MOUSE_LEFT),
                source.input_state(port, device::MOUSE, 0, device::MOUSE_RIGHT),
                source.input_state(port, device::MOUSE, 0, device::MOUSE_X),
                source.input_state(port, device::MOUSE, 0, device::MOUSE_Y),
            ),
            MouseDevice::Pointer => {
                let pressed = source.input_state(port, device::POINTER, 0, device::POINTER_PRESSED) != 0;
                let tracker = &mut self.pointers[player];
                let (dx, dy) = if pressed {
                    let x = source.input_state(port, device::POINTER, 0, device::POINTER_X);
                    let y = source.input_state(port, device::POINTER, 0, device::POINTER_Y);
                    tracker.track(x, y)
                } else {
                    tracker.release();
                    (0, 0)
                };
                (i16::from(pressed), 0, dx, dy)
            }
            MouseDevice::Disabled => (0, 0, 0, 0),
        };

        self.table.joystick[base + MOUSE_BUTTON_1_LINE] = button_1;
        self.table.joystick[base + MOUSE_BUTTON_2_LINE] = button_2;
        self.table.mouse_x[player] = dx;
        self.table.mouse_y[player] = dy;
    }
}
