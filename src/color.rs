//! Colors for cells and the 256-entry palette.

#[cfg(feature = "use_serde")]
use serde::{Deserialize, Serialize};

/// These correspond to the classic ANSI color indices and are
/// used for convenience/readability here in the code
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
#[repr(u8)]
pub enum AnsiColor {
    Black = 0,
    Maroon,
    Green,
    Olive,
    Navy,
    Purple,
    Teal,
    Silver,
    Grey,
    Red,
    Lime,
    Yellow,
    Blue,
    Fuschia,
    Aqua,
    White,
}

#[cfg_attr(feature = "use_serde", derive(Deserialize, Serialize))]
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
#[repr(C)]
pub struct RgbColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RgbColor {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Format in the X resource style expected by OSC color query
    /// responses.  Components are doubled up to express 16 bits per
    /// channel for compatibility with clients that parse the long form.
    pub fn to_x11_string(self) -> String {
        format!(
            "rgb:{:02x}{:02x}/{:02x}{:02x}/{:02x}{:02x}",
            self.red, self.red, self.green, self.green, self.blue, self.blue
        )
    }

    /// Parse either `rgb:RR/GG/BB` (with 1-4 hex digits per channel) or
    /// the `#RRGGBB` shorthand, as sent by OSC 4 / 10 / 11 setters.
    pub fn parse_x11(s: &str) -> Option<Self> {
        fn channel(v: &str) -> Option<u8> {
            // Scale an arbitrary-width hex field down to 8 bits.
            let bits = v.len() * 4;
            if bits == 0 || bits > 16 {
                return None;
            }
            let raw = u16::from_str_radix(v, 16).ok()?;
            Some(if bits >= 8 {
                (raw >> (bits - 8)) as u8
            } else {
                // a lone nibble is replicated, per X11 color scaling
                let n = raw as u8;
                (n << 4) | n
            })
        }

        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() == 6 {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                return Some(Self::new(r, g, b));
            }
            return None;
        }

        let spec = s.strip_prefix("rgb:")?;
        let mut it = spec.split('/');
        let r = channel(it.next()?)?;
        let g = channel(it.next()?)?;
        let b = channel(it.next()?)?;
        if it.next().is_some() {
            return None;
        }
        Some(Self::new(r, g, b))
    }
}

/// The xterm ANSI color set
const ANSI: [RgbColor; 16] = [
    RgbColor::new(0x00, 0x00, 0x00), // Black
    RgbColor::new(0xcd, 0x00, 0x00), // Maroon
    RgbColor::new(0x00, 0xcd, 0x00), // Green
    RgbColor::new(0xcd, 0xcd, 0x00), // Olive
    RgbColor::new(0x00, 0x00, 0xee), // Navy
    RgbColor::new(0xcd, 0x00, 0xcd), // Purple
    RgbColor::new(0x00, 0xcd, 0xcd), // Teal
    RgbColor::new(0xe5, 0xe5, 0xe5), // Silver
    RgbColor::new(0x7f, 0x7f, 0x7f), // Grey
    RgbColor::new(0xff, 0x00, 0x00), // Red
    RgbColor::new(0x00, 0xff, 0x00), // Lime
    RgbColor::new(0xff, 0xff, 0x00), // Yellow
    RgbColor::new(0x5c, 0x5c, 0xff), // Blue
    RgbColor::new(0xff, 0x00, 0xff), // Fuschia
    RgbColor::new(0x00, 0xff, 0xff), // Aqua
    RgbColor::new(0xff, 0xff, 0xff), // White
];

/// Construct the power-on 256-color palette: the 16 ANSI colors, the
/// 6x6x6 color cube, and the 24-step grey ramp.
pub fn default_palette() -> [RgbColor; 256] {
    let mut colors = [RgbColor::default(); 256];

    colors[0..16].copy_from_slice(&ANSI);

    // 216 color cube
    const RAMP6: [u8; 6] = [0x00, 0x5f, 0x87, 0xaf, 0xd7, 0xff];
    for idx in 0..216 {
        let red = RAMP6[idx / 36];
        let green = RAMP6[idx / 6 % 6];
        let blue = RAMP6[idx % 6];
        colors[16 + idx] = RgbColor { red, green, blue };
    }

    // 24 grey scales
    for idx in 0..24 {
        let grey = 0x08 + 10 * idx as u8;
        colors[232 + idx] = RgbColor {
            red: grey,
            green: grey,
            blue: grey,
        };
    }

    colors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_landmarks() {
        let pal = default_palette();
        assert_eq!(pal[1], RgbColor::new(0xcd, 0, 0));
        assert_eq!(pal[15], RgbColor::new(0xff, 0xff, 0xff));
        // 16 + 36r + 6g + b
        assert_eq!(pal[16], RgbColor::new(0, 0, 0));
        assert_eq!(pal[231], RgbColor::new(0xff, 0xff, 0xff));
        assert_eq!(pal[196], RgbColor::new(0xff, 0, 0));
        assert_eq!(pal[232], RgbColor::new(8, 8, 8));
        assert_eq!(pal[255], RgbColor::new(0xee, 0xee, 0xee));
    }

    #[test]
    fn x11_round_trip() {
        let c = RgbColor::new(0x12, 0xff, 0x00);
        assert_eq!(c.to_x11_string(), "rgb:1212/ffff/0000");
        assert_eq!(RgbColor::parse_x11(&c.to_x11_string()), Some(c));
        assert_eq!(RgbColor::parse_x11("#40a060"), Some(RgbColor::new(0x40, 0xa0, 0x60)));
        assert_eq!(RgbColor::parse_x11("rgb:f/0/8"), Some(RgbColor::new(0xff, 0x00, 0x88)));
        assert_eq!(RgbColor::parse_x11("bogus"), None);
    }
}
