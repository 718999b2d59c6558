//! Terminal emulator core: a VT/xterm escape sequence interpreter, a
//! ring-buffered cell grid with scrollback, and a double-buffered
//! handoff to a renderer worker.
//!
//! The crate models the terminal only; it owns no PTY, window, or GPU
//! resources.  An embedding wires it up like this:
//!
//! ```no_run
//! use vtgrid::{Config, Renderer, RenderSurface, TermHost, Vterm};
//! # struct Surface;
//! # impl RenderSurface for Surface {
//! #     fn resize(&mut self, _: usize, _: usize) {}
//! #     fn cells(&mut self) -> &mut [vtgrid::Cell] { &mut [] }
//! #     fn present(&mut self, _: &vtgrid::Frame) {}
//! # }
//! # struct Host(Vec<u8>);
//! # impl TermHost for Host {
//! #     fn writer(&mut self) -> &mut dyn std::io::Write { &mut self.0 }
//! # }
//! # fn read_pty_batch() -> Option<Vec<u8>> { None }
//! let mut host = Host(Vec::new());
//! let mut term = Vterm::new(80, 24, Config::default());
//! let renderer = Renderer::new(Box::new(Surface));
//!
//! // the PTY read loop: interpret each batch, then publish a snapshot
//! while let Some(bytes) = read_pty_batch() {
//!     term.advance_bytes(&bytes, &mut host);
//!     renderer.update(term.take_frame());
//! }
//! ```
//!
//! Bytes written to `TermHost::writer` are the terminal's responses
//! (device reports, encoded keys, mouse tracking) and belong on the PTY
//! master.

#[macro_use]
extern crate bitflags;

pub mod cell;
pub mod charset;
pub mod color;
pub mod config;
pub mod frame;
pub mod input;
pub mod renderer;
pub mod selection;
pub mod utf8;
pub mod vterm;

#[cfg(test)]
mod test;

pub use cell::{Cell, CellAttrs, CellFlags, Cursor, CursorStyle};
pub use color::{AnsiColor, RgbColor};
pub use config::Config;
pub use frame::Frame;
pub use input::{VtKey, VtModifier};
pub use renderer::{RenderSurface, Renderer};
pub use selection::{Point, Rect, SelectSnapTo};
pub use vterm::{MouseButton, MouseEvent, MouseEventKind, Vterm};

/// What the terminal core asks of its embedding: a channel back to the
/// PTY, plus the window-level services the protocol can address.  Only
/// `writer` is mandatory; everything else has a reasonable default.
pub trait TermHost {
    /// The PTY master; response sequences and encoded input land here.
    fn writer(&mut self) -> &mut dyn std::io::Write;

    /// The application retitled the window (OSC 0/2).
    fn set_title(&mut self, _title: &str) {}

    /// An audible or visual bell.
    fn bell(&mut self) {}

    /// Clipboard write requested via OSC 52; `None` clears it.  The
    /// payload is base64 as transmitted by the application.
    fn set_clipboard(&mut self, _clip: Option<String>) {}

    /// Clipboard read requested via OSC 52, base64-encoded.
    fn get_clipboard(&mut self) -> anyhow::Result<String> {
        anyhow::bail!("clipboard not available")
    }

    /// The column mode switched between 80 and 132 columns; the host
    /// should resize the window and then call [`Vterm::resize`].
    fn resize_request(&mut self, _cols: usize, _rows: usize) {}

    /// An OSC command the core does not handle itself.
    fn osc_event(&mut self, cmd: u32, arg: &str) {
        log::debug!("unhandled OSC {} {:?}", cmd, arg);
    }
}
