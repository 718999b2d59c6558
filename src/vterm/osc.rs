//! Operating system command and device control string handling.
//!
//! OSC payloads have been collected into `arg_buf` by the state
//! machine; palette and dynamic-color commands are applied internally,
//! titles and clipboard traffic cross the host boundary.  The only DCS
//! the terminal interprets is DECRQSS.

use super::Vterm;
use crate::color::RgbColor;
use crate::TermHost;

impl Vterm {
    pub(super) fn handle_osc(&mut self, host: &mut dyn TermHost) {
        let buf = std::mem::take(&mut self.arg_buf);
        let arg = String::from_utf8_lossy(&buf).into_owned();

        let (cmd, rest) = match arg.split_once(';') {
            Some((num, rest)) => (num, rest),
            None => (arg.as_str(), ""),
        };
        let cmd: u32 = match cmd.parse() {
            Ok(n) => n,
            Err(_) => {
                log::debug!("malformed OSC {:?}", arg);
                return;
            }
        };

        match cmd {
            0 | 1 | 2 => host.set_title(rest),
            4 => self.osc_palette(rest, host),
            10 => self.osc_dynamic_color(10, rest, host),
            11 => self.osc_dynamic_color(11, rest, host),
            52 => self.osc_clipboard(rest, host),
            104 => self.osc_palette_reset(rest),
            110 => {
                self.rgb_fg = self.config.fg;
                self.cf().expose();
            }
            111 => {
                self.rgb_bg = self.config.bg;
                self.cf().expose();
            }
            _ => host.osc_event(cmd, rest),
        }
    }

    /// OSC 4: `index;spec` pairs.  A spec of `?` answers with the
    /// current palette entry in the X resource form.
    fn osc_palette(&mut self, arg: &str, host: &mut dyn TermHost) {
        let mut fields = arg.split(';');
        while let (Some(ix), Some(spec)) = (fields.next(), fields.next()) {
            let ix: usize = match ix.parse::<usize>() {
                Ok(n) if n < 256 => n,
                _ => {
                    log::debug!("palette index out of range in OSC 4: {:?}", arg);
                    return;
                }
            };
            if spec == "?" {
                let report = format!("\x1b]4;{};{}\x07", ix, self.palette[ix].to_x11_string());
                self.write_pty(host, report.as_bytes());
            } else if let Some(color) = RgbColor::parse_x11(spec) {
                self.palette[ix] = color;
            } else {
                log::debug!("unparsable color spec in OSC 4: {:?}", spec);
            }
        }
    }

    /// OSC 104: reset listed palette entries, or all of them.
    fn osc_palette_reset(&mut self, arg: &str) {
        let defaults = crate::color::default_palette();
        if arg.is_empty() {
            self.palette = defaults;
            return;
        }
        for field in arg.split(';') {
            if let Ok(ix) = field.parse::<usize>() {
                if ix < 256 {
                    self.palette[ix] = defaults[ix];
                }
            }
        }
    }

    /// OSC 10 / 11: set or query the default foreground / background.
    fn osc_dynamic_color(&mut self, cmd: u32, arg: &str, host: &mut dyn TermHost) {
        if arg == "?" {
            let color = if cmd == 10 { self.rgb_fg } else { self.rgb_bg };
            let report = format!("\x1b]{};{}\x07", cmd, color.to_x11_string());
            self.write_pty(host, report.as_bytes());
            return;
        }
        match RgbColor::parse_x11(arg) {
            Some(color) => {
                if cmd == 10 {
                    self.rgb_fg = color;
                } else {
                    self.rgb_bg = color;
                }
                self.cf().expose();
            }
            None => log::debug!("unparsable color spec in OSC {}: {:?}", cmd, arg),
        }
    }

    /// OSC 52: clipboard traffic.  Payloads are base64 and pass through
    /// to the host untouched; a `?` payload asks for the clipboard
    /// back.
    fn osc_clipboard(&mut self, arg: &str, host: &mut dyn TermHost) {
        let (selection, payload) = match arg.split_once(';') {
            Some((sel, data)) => (sel, data),
            None => ("", arg),
        };
        if payload == "?" {
            match host.get_clipboard() {
                Ok(content) => {
                    let report = format!("\x1b]52;{};{}\x07", selection, content);
                    self.write_pty(host, report.as_bytes());
                }
                Err(err) => log::debug!("clipboard read failed: {}", err),
            }
        } else if payload.is_empty() {
            host.set_clipboard(None);
        } else {
            host.set_clipboard(Some(payload.to_string()));
        }
    }

    /// DECRQSS: `DCS $ q <setting> ST` requests the current value of a
    /// control function; anything else that arrived as a DCS is
    /// discarded.
    pub(super) fn handle_dcs(&mut self, host: &mut dyn TermHost) {
        let buf = std::mem::take(&mut self.arg_buf);
        let payload = match buf.strip_prefix(b"$q") {
            Some(p) => p,
            None => {
                log::debug!("discarding unhandled DCS ({} bytes)", buf.len());
                return;
            }
        };

        let reply = match payload {
            b"m" => Some(format!("{}m", self.current_sgr_string())),
            b"r" => Some(format!("{}r", self.current_margins_string())),
            b"s" => Some(format!("{}s", self.current_lr_margins_string())),
            b"\"p" => Some(format!("{}\"p", self.current_conformance_string())),
            b" q" => Some(format!("{} q", self.current_cursor_style_string())),
            _ => None,
        };

        let report = match reply {
            Some(setting) => format!("\x1bP1$r{}\x1b\\", setting),
            None => "\x1bP0$r\x1b\\".to_string(),
        };
        self.write_pty(host, report.as_bytes());
    }
}
