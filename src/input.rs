//! Keyboard input encoding: logical keys and modifier state mapped to
//! the byte sequences a VT-series terminal transmits.
//!
//! The tables are consulted in order of specificity: compatibility
//! level first (VT52 has its own sequences), then the cursor-key and
//! keypad application modes, then the base table.  Modifier encoding
//! follows the xterm `CSI 1;M` convention.

/// Logical keys the host can feed to the terminal.  Printable text goes
/// through `Vterm::send_char` instead.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum VtKey {
    Return,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    F13,
    F14,
    F15,
    F16,
    F17,
    F18,
    F19,
    F20,
    KpF1,
    KpF2,
    KpF3,
    KpF4,
    KpUp,
    KpDown,
    KpLeft,
    KpRight,
    KpHome,
    KpEnd,
    KpPageUp,
    KpPageDown,
    KpInsert,
    KpDelete,
    KpBegin,
    KpPlus,
    KpMinus,
    KpStar,
    KpSlash,
    KpComma,
    KpDot,
    KpEqual,
    KpEnter,
    Kp0,
    Kp1,
    Kp2,
    Kp3,
    Kp4,
    Kp5,
    Kp6,
    Kp7,
    Kp8,
    Kp9,
}

bitflags! {
    #[derive(Default)]
    pub struct VtModifier: u8 {
        const SHIFT = 1;
        const ALT = 2;
        const CONTROL = 4;
    }
}

impl VtModifier {
    /// The xterm modifier parameter: 1 plus the modifier bits.
    pub fn param(self) -> u8 {
        1 + self.bits()
    }
}

/// The keyboard-relevant mode flags, extracted from the terminal state
/// so the encoder stays a pure function.
#[derive(Debug, Clone, Copy)]
pub struct KeyboardState {
    pub vt52_mode: bool,
    pub app_cursor_keys: bool,
    pub app_keypad: bool,
    pub bksp_sends_del: bool,
    pub alt_sends_escape: bool,
    pub modify_other_keys: u8,
}

struct InputSpec {
    key: VtKey,
    input: &'static str,
}

macro_rules! specs {
    ($($key:ident => $input:expr),* $(,)?) => {
        &[ $( InputSpec { key: VtKey::$key, input: $input } ),* ]
    };
}

/// Application cursor key mode (DECCKM set).
static SPECS_APP_CURSOR: &[InputSpec] = specs! {
    Up => "\x1bOA",
    Down => "\x1bOB",
    Right => "\x1bOC",
    Left => "\x1bOD",
    Home => "\x1bOH",
    End => "\x1bOF",
    KpUp => "\x1bOA",
    KpDown => "\x1bOB",
    KpRight => "\x1bOC",
    KpLeft => "\x1bOD",
    KpHome => "\x1bOH",
    KpEnd => "\x1bOF",
};

/// Application keypad mode (DECKPAM).
static SPECS_APP_KEYPAD: &[InputSpec] = specs! {
    Kp0 => "\x1bOp",
    Kp1 => "\x1bOq",
    Kp2 => "\x1bOr",
    Kp3 => "\x1bOs",
    Kp4 => "\x1bOt",
    Kp5 => "\x1bOu",
    Kp6 => "\x1bOv",
    Kp7 => "\x1bOw",
    Kp8 => "\x1bOx",
    Kp9 => "\x1bOy",
    KpDot => "\x1bOn",
    KpComma => "\x1bOl",
    KpPlus => "\x1bOk",
    KpMinus => "\x1bOm",
    KpStar => "\x1bOj",
    KpSlash => "\x1bOo",
    KpEqual => "\x1bOX",
    KpEnter => "\x1bOM",
};

/// VT52 compatibility sequences.
static SPECS_VT52: &[InputSpec] = specs! {
    Up => "\x1bA",
    Down => "\x1bB",
    Right => "\x1bC",
    Left => "\x1bD",
    KpUp => "\x1bA",
    KpDown => "\x1bB",
    KpRight => "\x1bC",
    KpLeft => "\x1bD",
    F1 => "\x1bP",
    F2 => "\x1bQ",
    F3 => "\x1bR",
    F4 => "\x1bS",
    KpF1 => "\x1bP",
    KpF2 => "\x1bQ",
    KpF3 => "\x1bR",
    KpF4 => "\x1bS",
};

/// VT52 with the application keypad engaged.
static SPECS_VT52_APP_KEYPAD: &[InputSpec] = specs! {
    Kp0 => "\x1b?p",
    Kp1 => "\x1b?q",
    Kp2 => "\x1b?r",
    Kp3 => "\x1b?s",
    Kp4 => "\x1b?t",
    Kp5 => "\x1b?u",
    Kp6 => "\x1b?v",
    Kp7 => "\x1b?w",
    Kp8 => "\x1b?x",
    Kp9 => "\x1b?y",
    KpDot => "\x1b?n",
    KpEnter => "\x1b?M",
};

/// The ANSI base table.
static SPECS_ANSI: &[InputSpec] = specs! {
    Return => "\r",
    Tab => "\t",
    Up => "\x1b[A",
    Down => "\x1b[B",
    Right => "\x1b[C",
    Left => "\x1b[D",
    Home => "\x1b[H",
    End => "\x1b[F",
    Insert => "\x1b[2~",
    Delete => "\x1b[3~",
    PageUp => "\x1b[5~",
    PageDown => "\x1b[6~",
    F1 => "\x1bOP",
    F2 => "\x1bOQ",
    F3 => "\x1bOR",
    F4 => "\x1bOS",
    F5 => "\x1b[15~",
    F6 => "\x1b[17~",
    F7 => "\x1b[18~",
    F8 => "\x1b[19~",
    F9 => "\x1b[20~",
    F10 => "\x1b[21~",
    F11 => "\x1b[23~",
    F12 => "\x1b[24~",
    F13 => "\x1b[25~",
    F14 => "\x1b[26~",
    F15 => "\x1b[28~",
    F16 => "\x1b[29~",
    F17 => "\x1b[31~",
    F18 => "\x1b[32~",
    F19 => "\x1b[33~",
    F20 => "\x1b[34~",
    KpF1 => "\x1bOP",
    KpF2 => "\x1bOQ",
    KpF3 => "\x1bOR",
    KpF4 => "\x1bOS",
    KpUp => "\x1b[A",
    KpDown => "\x1b[B",
    KpRight => "\x1b[C",
    KpLeft => "\x1b[D",
    KpHome => "\x1b[H",
    KpEnd => "\x1b[F",
    KpPageUp => "\x1b[5~",
    KpPageDown => "\x1b[6~",
    KpInsert => "\x1b[2~",
    KpDelete => "\x1b[3~",
    KpBegin => "\x1b[E",
    KpPlus => "+",
    KpMinus => "-",
    KpStar => "*",
    KpSlash => "/",
    KpComma => ",",
    KpDot => ".",
    KpEqual => "=",
    KpEnter => "\r",
    Kp0 => "0",
    Kp1 => "1",
    Kp2 => "2",
    Kp3 => "3",
    Kp4 => "4",
    Kp5 => "5",
    Kp6 => "6",
    Kp7 => "7",
    Kp8 => "8",
    Kp9 => "9",
};

fn find(specs: &[InputSpec], key: VtKey) -> Option<&'static str> {
    specs.iter().find(|s| s.key == key).map(|s| s.input)
}

fn lookup(key: VtKey, st: &KeyboardState) -> Option<&'static str> {
    if st.vt52_mode {
        if st.app_keypad {
            if let Some(s) = find(SPECS_VT52_APP_KEYPAD, key) {
                return Some(s);
            }
        }
        if let Some(s) = find(SPECS_VT52, key) {
            return Some(s);
        }
    } else {
        if st.app_cursor_keys {
            if let Some(s) = find(SPECS_APP_CURSOR, key) {
                return Some(s);
            }
        }
        if st.app_keypad {
            if let Some(s) = find(SPECS_APP_KEYPAD, key) {
                return Some(s);
            }
        }
    }
    find(SPECS_ANSI, key)
}

/// Rewrite an unmodified sequence to carry the xterm modifier
/// parameter: `CSI n ~` forms gain `;M` before the tilde, `CSI F` and
/// `SS3 F` single-final forms become `CSI 1;M F`.
fn apply_modifiers(seq: &str, mods: VtModifier, out: &mut Vec<u8>) {
    let bytes = seq.as_bytes();
    if let Some(stripped) = seq.strip_suffix('~') {
        out.extend_from_slice(stripped.as_bytes());
        out.extend_from_slice(format!(";{}~", mods.param()).as_bytes());
    } else if bytes.len() == 3 && bytes[0] == 0x1b && (bytes[1] == b'[' || bytes[1] == b'O') {
        out.extend_from_slice(format!("\x1b[1;{}{}", mods.param(), bytes[2] as char).as_bytes());
    } else {
        out.extend_from_slice(bytes);
    }
}

/// Encode a key press.  Returns false when the key produces no output
/// under the current state.
pub fn encode_key(key: VtKey, mods: VtModifier, st: &KeyboardState, out: &mut Vec<u8>) -> bool {
    // Keys with dedicated single-byte traditions first.
    match key {
        VtKey::Backspace => {
            let base: u8 = if st.bksp_sends_del { 0x7f } else { 0x08 };
            if mods.contains(VtModifier::ALT) && st.alt_sends_escape {
                out.push(0x1b);
            }
            // Ctrl swaps the DEL/BS preference, per xterm
            if mods.contains(VtModifier::CONTROL) {
                out.push(if base == 0x7f { 0x08 } else { 0x7f });
            } else {
                out.push(base);
            }
            return true;
        }
        VtKey::Tab if mods.contains(VtModifier::SHIFT) => {
            out.extend_from_slice(b"\x1b[Z");
            return true;
        }
        _ => {}
    }

    let seq = match lookup(key, st) {
        Some(s) => s,
        None => return false,
    };

    if mods.is_empty() {
        out.extend_from_slice(seq.as_bytes());
        return true;
    }

    if seq.len() == 1 && !seq.as_bytes()[0].is_ascii_control() {
        // keypad character keys behave like ordinary printables
        return encode_char(seq.chars().next().unwrap(), mods, st, out);
    }

    if seq.len() == 1 {
        // Return / Tab with modifiers
        let code = seq.as_bytes()[0];
        if st.modify_other_keys >= 2 {
            out.extend_from_slice(format!("\x1b[27;{};{}~", mods.param(), code).as_bytes());
        } else {
            if mods.contains(VtModifier::ALT) && st.alt_sends_escape {
                out.push(0x1b);
            }
            out.push(code);
        }
        return true;
    }

    apply_modifiers(seq, mods, out);
    true
}

/// Encode a printable character with its modifiers: Control masks to a
/// C0 byte, Alt prefixes ESC, and `modifyOtherKeys` level 2 switches to
/// the disambiguating `CSI 27;M;C~` form.
pub fn encode_char(ch: char, mods: VtModifier, st: &KeyboardState, out: &mut Vec<u8>) -> bool {
    let effective = mods & (VtModifier::CONTROL | VtModifier::ALT);

    if st.modify_other_keys >= 2 && !effective.is_empty() {
        out.extend_from_slice(format!("\x1b[27;{};{}~", mods.param(), ch as u32).as_bytes());
        return true;
    }

    if mods.contains(VtModifier::ALT) && st.alt_sends_escape {
        out.push(0x1b);
    }

    if mods.contains(VtModifier::CONTROL) {
        let b = ch as u32;
        let ctrl = match ch {
            ' ' | '@' | '2' => Some(0x00),
            'a'..='z' => Some((b - 'a' as u32 + 1) as u8),
            'A'..='Z' => Some((b - 'A' as u32 + 1) as u8),
            '[' | '3' => Some(0x1b),
            '\\' | '4' => Some(0x1c),
            ']' | '5' => Some(0x1d),
            '^' | '6' => Some(0x1e),
            '_' | '7' | '/' => Some(0x1f),
            '8' | '?' => Some(0x7f),
            _ => None,
        };
        match ctrl {
            Some(c) => out.push(c),
            None => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
        return true;
    }

    let mut buf = [0u8; 4];
    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    true
}
