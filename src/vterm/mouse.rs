//! Mouse reporting: tracking modes and the four wire encodings.

use super::{MouseTrackingEnc, MouseTrackingMode, Vterm};
use crate::input::VtModifier;
use crate::utf8;
use crate::TermHost;
use anyhow::Result;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
    None,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MouseEventKind {
    Press,
    Release,
    Move,
}

/// A mouse event in 0-based cell coordinates.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub x: usize,
    pub y: usize,
    pub button: MouseButton,
    pub modifiers: VtModifier,
}

impl Vterm {
    fn mouse_button_code(&self, event: &MouseEvent) -> u32 {
        let button = match event.button {
            MouseButton::None => self.cur_mouse_button,
            b => b,
        };
        let mut code = match button {
            MouseButton::None => 3,
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
            MouseButton::WheelUp => 64,
            MouseButton::WheelDown => 65,
        };
        // X10 compatibility reporting predates modifiers
        if self.mouse_trk.mode != MouseTrackingMode::X10Compat {
            if event.modifiers.contains(VtModifier::SHIFT) {
                code += 4;
            }
            if event.modifiers.contains(VtModifier::ALT) {
                code += 8;
            }
            if event.modifiers.contains(VtModifier::CONTROL) {
                code += 16;
            }
        }
        code
    }

    fn send_mouse_report(
        &mut self,
        code: u32,
        x: usize,
        y: usize,
        release: bool,
        host: &mut dyn TermHost,
    ) {
        let cx = x + 1;
        let cy = y + 1;
        let out: Vec<u8> = match self.mouse_trk.enc {
            MouseTrackingEnc::Sgr => {
                let fin = if release { 'm' } else { 'M' };
                format!("\x1b[<{};{};{}{}", code, cx, cy, fin).into_bytes()
            }
            MouseTrackingEnc::Urxvt => {
                let code = if release { 3 } else { code };
                format!("\x1b[{};{};{}M", code + 32, cx, cy).into_bytes()
            }
            MouseTrackingEnc::Utf8 => {
                // coordinates travel as UTF-8 encoded code points,
                // lifting the single-byte limit to 2015
                let code = if release { 3 } else { code };
                let mut out = format!("\x1b[M{}", char::from((code + 32) as u8)).into_bytes();
                for coord in [cx, cy] {
                    let cp = (coord + 32).min(2015) as u32;
                    utf8::push_unicode(cp, &mut |b| out.push(b));
                }
                out
            }
            MouseTrackingEnc::Default => {
                // everything offset by 32 into single bytes; larger
                // coordinates cannot be represented and clamp
                let code = if release { 3 } else { code };
                vec![
                    0x1b,
                    b'[',
                    b'M',
                    (code + 32) as u8,
                    (cx + 32).min(255) as u8,
                    (cy + 32).min(255) as u8,
                ]
            }
        };
        self.write_pty(host, &out);
    }

    /// Feed a mouse event through the tracking filter.  Events the
    /// active mode does not report are consumed silently (the host
    /// drives selection from those instead); wheel events double as
    /// scrollback paging and alternate-screen arrow keys.
    pub fn mouse_event(&mut self, mut event: MouseEvent, host: &mut dyn TermHost) -> Result<()> {
        event.x = event.x.min(self.n_cols - 1);
        event.y = event.y.min(self.n_rows - 1);

        let tracking = self.mouse_trk.mode != MouseTrackingMode::Disabled;
        let is_wheel = matches!(event.button, MouseButton::WheelUp | MouseButton::WheelDown);

        if !tracking {
            if event.kind == MouseEventKind::Press && is_wheel {
                self.wheel_untracked(event.button, host)?;
            }
            return Ok(());
        }

        match event.kind {
            MouseEventKind::Press => {
                if !is_wheel {
                    self.cur_mouse_button = event.button;
                }
                let code = self.mouse_button_code(&event);
                self.send_mouse_report(code, event.x, event.y, false, host);
            }
            MouseEventKind::Release => {
                if self.mouse_trk.mode == MouseTrackingMode::X10Compat {
                    return Ok(());
                }
                let code = self.mouse_button_code(&event);
                self.cur_mouse_button = MouseButton::None;
                self.send_mouse_report(code, event.x, event.y, true, host);
            }
            MouseEventKind::Move => {
                let report = match self.mouse_trk.mode {
                    MouseTrackingMode::Vt200AnyEvent => true,
                    MouseTrackingMode::Vt200ButtonEvent => {
                        self.cur_mouse_button != MouseButton::None
                    }
                    _ => false,
                };
                if report {
                    let code = self.mouse_button_code(&event) + 32;
                    self.send_mouse_report(code, event.x, event.y, false, host);
                }
            }
        }
        Ok(())
    }

    /// Wheel handling when no tracking mode is active: page the
    /// scrollback view, or turn into arrow keys on the alternate
    /// screen when alternate-scroll mode is on.
    fn wheel_untracked(&mut self, button: MouseButton, host: &mut dyn TermHost) -> Result<()> {
        if self.alt_screen_buffer_mode {
            if self.alt_scroll_mode {
                let key = match button {
                    MouseButton::WheelUp => crate::input::VtKey::Up,
                    _ => crate::input::VtKey::Down,
                };
                for _ in 0..3 {
                    self.key_down(key, VtModifier::empty(), host)?;
                }
            }
        } else {
            match button {
                MouseButton::WheelUp => self.mouse_wheel_up(),
                _ => self.mouse_wheel_down(),
            }
        }
        Ok(())
    }
}
