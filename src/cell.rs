//! The cell: one addressable character slot of the grid.

use crate::color::RgbColor;
#[cfg(feature = "use_serde")]
use serde::{Deserialize, Serialize};

bitflags! {
    /// Styling attributes, set from SGR.
    #[derive(Default)]
    pub struct CellAttrs: u8 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const INVERSE = 1 << 3;
    }
}

bitflags! {
    /// Structural flags maintained by the frame engine.
    #[derive(Default)]
    pub struct CellFlags: u8 {
        /// Left half of a double-width glyph.
        const DWIDTH = 1 << 0;
        /// Right half of a double-width glyph; carries no code point of
        /// its own.
        const DWIDTH_CONT = 1 << 1;
        /// The line continues into the next row (soft wrap).
        const WRAP = 1 << 2;
        /// Renderer-private invalidation mark, set during delta copies.
        const DIRTY = 1 << 3;
    }
}

/// One character slot: a BMP code point, style bits and two concrete
/// colors.  The record is what the renderer's shader storage consumes,
/// so the layout is fixed at 12 bytes per cell.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct Cell {
    /// Unicode code point, restricted to the Basic Multilingual Plane.
    pub code: u16,
    pub attrs: CellAttrs,
    pub flags: CellFlags,
    pub fg: RgbColor,
    pub bg: RgbColor,
    _pad: [u8; 2],
}

const _: () = assert!(std::mem::size_of::<Cell>() == 12);

impl Default for Cell {
    fn default() -> Cell {
        Cell {
            code: ' ' as u16,
            attrs: CellAttrs::default(),
            flags: CellFlags::default(),
            fg: RgbColor::default(),
            bg: RgbColor::default(),
            _pad: [0; 2],
        }
    }
}

impl Cell {
    /// A blank cell carrying the given pen's colors and attributes, as
    /// used by erase and scroll fills.
    pub fn blank_with(pen: &Cell) -> Cell {
        Cell {
            code: ' ' as u16,
            attrs: pen.attrs,
            flags: CellFlags::default(),
            fg: pen.fg,
            bg: pen.bg,
            _pad: [0; 2],
        }
    }

    pub fn with_code(pen: &Cell, code: u16) -> Cell {
        Cell { code, ..Cell::blank_with(pen) }
    }

    #[inline]
    pub fn is_blank(&self) -> bool {
        self.code == ' ' as u16
    }
}

/// Structural equality; the renderer-private dirty mark does not
/// participate, so delta copies converge.
impl PartialEq for Cell {
    fn eq(&self, other: &Cell) -> bool {
        self.code == other.code
            && self.attrs == other.attrs
            && (self.flags - CellFlags::DIRTY) == (other.flags - CellFlags::DIRTY)
            && self.fg == other.fg
            && self.bg == other.bg
    }
}

impl Eq for Cell {}

#[cfg_attr(feature = "use_serde", derive(Deserialize, Serialize))]
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum CursorStyle {
    #[default]
    Block,
    Underline,
    Bar,
}

/// Cursor position and display style, carried on each frame snapshot so
/// the renderer can draw it without consulting the terminal state.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Cursor {
    pub pos_x: usize,
    pub pos_y: usize,
    pub style: CursorStyle,
    pub visible: bool,
    pub color: RgbColor,
}
