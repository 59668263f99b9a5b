//! Keyboard lines mirrored every frame.
//!
//! The machine core indexes its keyboard table by libretro key code
//! (`RETROK_*`), so the code is both what we query and where we store it.

/// One mirrored key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeyboardKey {
    pub name: &'static str,
    pub code: u32,
}

const fn key(name: &'static str, code: u32) -> KeyboardKey {
    KeyboardKey { name, code }
}

pub const KEYBOARD_KEYS: &[KeyboardKey] = &[
    key("A", 97),
    key("B", 98),
    key("C", 99),
    key("D", 100),
    key("E", 101),
    key("F", 102),
    key("G", 103),
    key("H", 104),
    key("I", 105),
    key("J", 106),
    key("K", 107),
    key("L", 108),
    key("M", 109),
    key("N", 110),
    key("O", 111),
    key("P", 112),
    key("Q", 113),
    key("R", 114),
    key("S", 115),
    key("T", 116),
    key("U", 117),
    key("V", 118),
    key("W", 119),
    key("X", 120),
    key("Y", 121),
    key("Z", 122),
    key("0", 48),
    key("1", 49),
    key("2", 50),
    key("3", 51),
    key("4", 52),
    key("5", 53),
    key("6", 54),
    key("7", 55),
    key("8", 56),
    key("9", 57),
    key("0 PAD", 256),
    key("1 PAD", 257),
    key("2 PAD", 258),
    key("3 PAD", 259),
    key("4 PAD", 260),
    key("5 PAD", 261),
    key("6 PAD", 262),
    key("7 PAD", 263),
    key("8 PAD", 264),
    key("9 PAD", 265),
    key(". PAD", 266),
    key("/ PAD", 267),
    key("* PAD", 268),
    key("- PAD", 269),
    key("+ PAD", 270),
    key("ENTER PAD", 271),
    key("F1", 282),
    key("F2", 283),
    key("F3", 284),
    key("F4", 285),
    key("F5", 286),
    key("F6", 287),
    key("F7", 288),
    key("F8", 289),
    key("F9", 290),
    key("F10", 291),
    key("F11", 292),
    key("F12", 293),
    key("ESC", 27),
    key("~", 96),
    key("-", 45),
    key("=", 61),
    key("BKSPACE", 8),
    key("TAB", 9),
    key("[", 91),
    key("]", 93),
    key("ENTER", 13),
    key(";", 59),
    key("'", 39),
    key("\\", 92),
    key(",", 44),
    key(".", 46),
    key("/", 47),
    key("SPACE", 32),
    key("INS", 277),
    key("DEL", 127),
    key("HOME", 278),
    key("END", 279),
    key("PGUP", 280),
    key("PGDN", 281),
    key("LEFT", 276),
    key("RIGHT", 275),
    key("UP", 273),
    key("DOWN", 274),
    key("PRTSCR", 316),
    key("PAUSE", 19),
    key("LSHIFT", 304),
    key("RSHIFT", 303),
    key("LCTRL", 306),
    key("RCTRL", 305),
    key("LALT", 308),
    key("RALT", 307),
    key("CAPSLOCK", 301),
    key("NUMLOCK", 300),
    key("SCRLOCK", 302),
    key("MENU", 319),
];
