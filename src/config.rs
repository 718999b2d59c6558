//! Construction-time configuration for the terminal core.
//!
//! Runtime-mutable state (palette, mode flags, dynamic default colors)
//! lives in [`crate::vterm::Vterm`]; this value is immutable once the
//! terminal is built.

use crate::color::RgbColor;

#[derive(Debug, Clone)]
pub struct Config {
    /// Rows of scrollback retained on the primary screen.
    pub save_lines: usize,
    /// Glyph cell size in pixels, used to translate mouse pixel
    /// coordinates to cell coordinates.
    pub glyph_px: u16,
    pub glyph_py: u16,
    /// Window border in pixels, likewise for mouse translation.
    pub border_px: u16,
    /// Default foreground and background.
    pub fg: RgbColor,
    pub bg: RgbColor,
    pub cursor_color: RgbColor,
    /// Render bold text in the bright palette variant when the pen holds
    /// one of the first eight palette colors.
    pub bold_as_bright: bool,
    /// Power-on value of the alternate-scroll mode (wheel events on the
    /// alternate screen turn into arrow keys).
    pub alt_scroll: bool,
    /// Response to ENQ; empty suppresses the answer.
    pub answerback: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            save_lines: 500,
            glyph_px: 9,
            glyph_py: 18,
            border_px: 2,
            fg: RgbColor::new(0xbb, 0xbb, 0xbb),
            bg: RgbColor::new(0x00, 0x00, 0x00),
            cursor_color: RgbColor::new(0xbb, 0xbb, 0xbb),
            bold_as_bright: true,
            alt_scroll: false,
            answerback: String::new(),
        }
    }
}
