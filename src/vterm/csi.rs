//! Control sequence (CSI) parameter collection and dispatch.

use super::{
    ColMode, CompatLevel, CursorKeyMode, InputState, MouseTrackingEnc, MouseTrackingMode,
    OriginMode, Vterm, MAX_CSI_PARAMS,
};
use crate::cell::{CellAttrs, CursorStyle};
use crate::color::RgbColor;
use crate::TermHost;

impl Vterm {
    pub(super) fn input_csi(&mut self, b: u8, host: &mut dyn TermHost) {
        match b {
            b'0'..=b'9' => {
                let cur = self.cur_param.get_or_insert(0);
                *cur = cur.saturating_mul(10).saturating_add(u32::from(b - b'0'));
            }
            b';' | b':' => self.param_separator(),
            b'?' if self.at_csi_start() => self.input_state = InputState::CsiPriv,
            b'>' if self.at_csi_start() => self.input_state = InputState::CsiGt,
            b'"' if self.input_state == InputState::Csi => {
                self.input_state = InputState::CsiDblQuote
            }
            b'!' if self.input_state == InputState::Csi => self.input_state = InputState::CsiBang,
            b'\'' if self.input_state == InputState::Csi => self.input_state = InputState::CsiQuote,
            b' ' if self.input_state == InputState::Csi => self.input_state = InputState::CsiSpc,
            0x40..=0x7e => {
                self.finalize_params();
                let state = self.input_state;
                self.input_state = InputState::Normal;
                match state {
                    InputState::Csi => self.dispatch_csi(b, host),
                    InputState::CsiPriv => self.dispatch_csi_priv(b, host),
                    InputState::CsiQuote => self.dispatch_csi_quote(b),
                    InputState::CsiDblQuote => self.dispatch_csi_dblquote(b),
                    InputState::CsiBang => self.dispatch_csi_bang(b),
                    InputState::CsiSpc => self.dispatch_csi_spc(b),
                    InputState::CsiGt => self.dispatch_csi_gt(b, host),
                    _ => unreachable!(),
                }
            }
            0x1b => self.set_state(InputState::Escape),
            0x18 | 0x1a => self.set_state(InputState::Normal),
            0x00..=0x1f => self.execute_c0(b, host),
            0x7f => {}
            _ => {
                // unsupported intermediate; swallow the rest of the
                // sequence without side effects
                self.set_state(InputState::IgnoreSequence);
            }
        }
    }

    fn at_csi_start(&self) -> bool {
        self.input_state == InputState::Csi && self.params.is_empty() && self.cur_param.is_none()
    }

    fn param_separator(&mut self) {
        if self.params.len() < MAX_CSI_PARAMS {
            self.params.push(self.cur_param.take().unwrap_or(0));
        } else {
            self.params_overflow = true;
            self.cur_param = None;
        }
    }

    fn finalize_params(&mut self) {
        if self.cur_param.is_some() || !self.params.is_empty() {
            self.param_separator();
        }
        if self.params_overflow {
            log::debug!("control sequence parameter list truncated");
        }
    }

    /// The `ix`-th parameter, or `default` when absent or zero.
    fn arg_or(&self, ix: usize, default: usize) -> usize {
        match self.params.get(ix) {
            Some(&v) if v != 0 => v as usize,
            _ => default,
        }
    }

    /// The `ix`-th parameter taken literally, zero included.
    fn arg_raw(&self, ix: usize, default: usize) -> usize {
        self.params.get(ix).map(|&v| v as usize).unwrap_or(default)
    }

    fn dispatch_csi(&mut self, fin: u8, host: &mut dyn TermHost) {
        match fin {
            b'A' => self.cursor_up(self.arg_or(0, 1)),
            b'B' => self.cursor_down(self.arg_or(0, 1)),
            b'C' => self.cursor_forward(self.arg_or(0, 1)),
            b'D' => self.cursor_backward(self.arg_or(0, 1)),
            b'E' => {
                self.cursor_down(self.arg_or(0, 1));
                self.pos_x = self.left_limit();
            }
            b'F' => {
                self.cursor_up(self.arg_or(0, 1));
                self.pos_x = self.left_limit();
            }
            b'G' | b'`' => {
                // CHA / HPA: column absolute
                let col = self.arg_or(0, 1) - 1;
                let x = match self.origin_mode {
                    OriginMode::Absolute => col.min(self.n_cols - 1),
                    OriginMode::ScrollingRegion => {
                        (col + self.left_limit()).min(self.right_limit() - 1)
                    }
                };
                self.pos_x = x;
                self.last_col = false;
            }
            b'a' => self.cursor_forward(self.arg_or(0, 1)), // HPR
            b'd' => {
                // VPA: row absolute
                let row = self.arg_or(0, 1) - 1;
                let y = match self.origin_mode {
                    OriginMode::Absolute => row.min(self.n_rows - 1),
                    OriginMode::ScrollingRegion => {
                        (row + self.margin_top).min(self.margin_bottom - 1)
                    }
                };
                self.pos_y = y;
                self.last_col = false;
            }
            b'e' => self.cursor_down(self.arg_or(0, 1)), // VPR
            b'H' | b'f' => {
                let row = self.arg_or(0, 1) - 1;
                let col = self.arg_or(1, 1) - 1;
                self.set_cursor_origin(col, row);
            }
            b'I' => {
                for _ in 0..self.arg_or(0, 1) {
                    self.jump_to_next_tab_stop();
                }
            }
            b'Z' => {
                for _ in 0..self.arg_or(0, 1) {
                    self.jump_to_prev_tab_stop();
                }
            }
            b'J' => self.erase_in_display(self.arg_raw(0, 0)),
            b'K' => self.erase_in_row_cmd(self.arg_raw(0, 0)),
            b'L' => self.insert_rows(self.arg_or(0, 1)),
            b'M' => self.delete_rows(self.arg_or(0, 1)),
            b'@' => self.insert_chars(self.arg_or(0, 1)),
            b'P' => self.delete_chars(self.arg_or(0, 1)),
            b'X' => {
                let count = self.arg_or(0, 1);
                let (x, y) = (self.pos_x, self.pos_y);
                let pen = self.pen;
                self.cf().erase_in_row(y, x, count, &pen);
            }
            b'S' => self.scroll_region_up(self.arg_or(0, 1)),
            b'T' => self.scroll_region_down(self.arg_or(0, 1)),
            b'b' => self.repeat_graphic(self.arg_or(0, 1)),
            b'c' => self.report_primary_da(host),
            b'g' => match self.arg_raw(0, 0) {
                0 => self.clear_tab_stop(),
                3 => self.clear_all_tab_stops(),
                n => log::debug!("unhandled TBC mode {}", n),
            },
            b'h' => self.ansi_modes(true),
            b'l' => self.ansi_modes(false),
            b'm' => self.select_graphic_rendition(),
            b'n' => self.device_status_report(false, host),
            b'r' => self.set_top_bottom_margins(),
            b's' => {
                if self.horiz_margin_mode {
                    self.set_left_right_margins();
                } else {
                    self.save_cursor_sco();
                }
            }
            b'u' => self.restore_cursor_sco(),
            b't' => self.window_ops(host),
            _ => log::debug!("unhandled CSI final {:#04x} ({})", fin, fin as char),
        }
    }

    fn dispatch_csi_priv(&mut self, fin: u8, host: &mut dyn TermHost) {
        match fin {
            b'h' => self.dec_private_modes(true, host),
            b'l' => self.dec_private_modes(false, host),
            b'n' => self.device_status_report(true, host),
            // DECSED / DECSEL: selective erase falls back to plain erase
            b'J' => self.erase_in_display(self.arg_raw(0, 0)),
            b'K' => self.erase_in_row_cmd(self.arg_raw(0, 0)),
            _ => log::debug!("unhandled private CSI final {:#04x}", fin),
        }
    }

    fn dispatch_csi_quote(&mut self, fin: u8) {
        match fin {
            b'}' => self.insert_cols(self.arg_or(0, 1)),
            b'~' => self.delete_cols(self.arg_or(0, 1)),
            _ => log::debug!("unhandled CSI ' final {:#04x}", fin),
        }
    }

    fn dispatch_csi_dblquote(&mut self, fin: u8) {
        match fin {
            b'p' => {
                // DECSCL: conformance level; the 8-bit control
                // parameter is accepted and ignored
                match self.arg_raw(0, 65) {
                    61 => self.compat_level = CompatLevel::Vt100,
                    62..=65 => self.compat_level = CompatLevel::Vt400,
                    n => log::debug!("unhandled conformance level {}", n),
                }
            }
            b'q' => {} // DECSCA: selective erase attribute, not supported
            _ => log::debug!("unhandled CSI \" final {:#04x}", fin),
        }
    }

    fn dispatch_csi_bang(&mut self, fin: u8) {
        match fin {
            b'p' => self.reset_terminal(false), // DECSTR
            _ => log::debug!("unhandled CSI ! final {:#04x}", fin),
        }
    }

    fn dispatch_csi_spc(&mut self, fin: u8) {
        match fin {
            b'q' => {
                // DECSCUSR; blinking and steady variants fold together
                let style = match self.arg_raw(0, 0) {
                    0 | 1 | 2 => CursorStyle::Block,
                    3 | 4 => CursorStyle::Underline,
                    5 | 6 => CursorStyle::Bar,
                    n => {
                        log::debug!("unhandled cursor style {}", n);
                        return;
                    }
                };
                self.cf().set_cursor_style(style);
            }
            b'@' => self.shift_region_left(self.arg_or(0, 1)),
            b'A' => self.shift_region_right(self.arg_or(0, 1)),
            _ => log::debug!("unhandled CSI SP final {:#04x}", fin),
        }
    }

    fn dispatch_csi_gt(&mut self, fin: u8, host: &mut dyn TermHost) {
        match fin {
            b'c' => self.write_pty(host, b"\x1b[>41;0;0c"),
            b'm' => {
                // XTMODKEYS; only the modifyOtherKeys resource matters
                if self.arg_raw(0, 0) == 4 {
                    self.modify_other_keys = self.arg_raw(1, 0).min(2) as u8;
                }
            }
            _ => log::debug!("unhandled CSI > final {:#04x}", fin),
        }
    }

    // --- cursor motion ------------------------------------------------

    fn cursor_up(&mut self, n: usize) {
        let stop = if self.pos_y >= self.margin_top {
            self.margin_top
        } else {
            0
        };
        self.pos_y = self.pos_y.saturating_sub(n).max(stop);
        self.last_col = false;
    }

    fn cursor_down(&mut self, n: usize) {
        let stop = if self.pos_y < self.margin_bottom {
            self.margin_bottom - 1
        } else {
            self.n_rows - 1
        };
        self.pos_y = (self.pos_y + n).min(stop);
        self.last_col = false;
    }

    fn cursor_forward(&mut self, n: usize) {
        self.pos_x = (self.pos_x + n).min(self.right_limit() - 1);
        self.last_col = false;
    }

    fn cursor_backward(&mut self, n: usize) {
        self.pos_x = self.pos_x.saturating_sub(n).max(self.left_limit());
        self.last_col = false;
    }

    // --- erase --------------------------------------------------------

    fn erase_in_display(&mut self, mode: usize) {
        let pen = self.pen;
        let (x, y) = (self.pos_x, self.pos_y);
        let cols = self.n_cols;
        match mode {
            0 => {
                self.cf().erase_in_row(y, x, cols - x, &pen);
                for row in y + 1..self.n_rows {
                    self.cf().erase_row(row, &pen);
                }
            }
            1 => {
                for row in 0..y {
                    self.cf().erase_row(row, &pen);
                }
                self.cf().erase_in_row(y, 0, x + 1, &pen);
            }
            2 => {
                for row in 0..self.n_rows {
                    self.cf().erase_row(row, &pen);
                }
            }
            3 => self.cf().drop_scrollback_history(),
            n => log::debug!("unhandled erase-in-display mode {}", n),
        }
    }

    fn erase_in_row_cmd(&mut self, mode: usize) {
        let pen = self.pen;
        let (x, y) = (self.pos_x, self.pos_y);
        let cols = self.n_cols;
        match mode {
            0 => self.cf().erase_in_row(y, x, cols - x, &pen),
            1 => self.cf().erase_in_row(y, 0, x + 1, &pen),
            2 => self.cf().erase_row(y, &pen),
            n => log::debug!("unhandled erase-in-line mode {}", n),
        }
    }

    // --- margins ------------------------------------------------------

    fn set_top_bottom_margins(&mut self) {
        let top = self.arg_or(0, 1);
        let bottom = self.arg_or(1, self.n_rows).min(self.n_rows);
        if top >= bottom {
            return;
        }
        self.margin_top = top - 1;
        self.margin_bottom = bottom;
        if self.has_custom_margins() {
            let (t, b) = (self.margin_top, self.margin_bottom);
            self.cf().set_margins(t, b);
        } else {
            self.cf().reset_margins();
        }
        self.set_cursor_origin(0, 0);
    }

    fn set_left_right_margins(&mut self) {
        let left = self.arg_or(0, 1);
        let right = self.arg_or(1, self.n_cols).min(self.n_cols);
        if left >= right {
            return;
        }
        self.h_margin = left - 1;
        self.n_cols_eff = right;
        self.set_cursor_origin(0, 0);
    }

    // --- modes --------------------------------------------------------

    fn ansi_modes(&mut self, on: bool) {
        for ix in 0..self.params.len() {
            match self.params[ix] {
                2 => self.keyboard_locked = on,  // KAM
                4 => self.insert_mode = on,      // IRM
                12 => self.local_echo = !on,     // SRM
                20 => self.auto_newline_mode = on, // LNM
                n => log::debug!("unhandled ANSI mode {} {}", n, if on { "h" } else { "l" }),
            }
        }
    }

    fn dec_private_modes(&mut self, on: bool, host: &mut dyn TermHost) {
        for ix in 0..self.params.len() {
            self.dec_private_mode(self.params[ix], on, host);
        }
    }

    fn dec_private_mode(&mut self, mode: u32, on: bool, host: &mut dyn TermHost) {
        match mode {
            1 => {
                self.cursor_key_mode = if on {
                    CursorKeyMode::Application
                } else {
                    CursorKeyMode::Ansi
                }
            }
            2 => {
                // DECANM: resetting drops to VT52 compatibility
                self.compat_level = if on { CompatLevel::Vt400 } else { CompatLevel::Vt52 };
            }
            3 => {
                // DECCOLM: the host performs the actual resize; the
                // mode change wipes the screen per the standard
                let target = if on { ColMode::C132 } else { ColMode::C80 };
                if self.col_mode != target {
                    self.col_mode = target;
                    host.resize_request(if on { 132 } else { 80 }, self.n_rows);
                }
                self.erase_in_display(2);
                self.reset_margins_full();
                self.set_cursor_clamped(0, 0);
            }
            4 => {}  // DECSCLM smooth scrolling
            5 => self.set_reverse_video(on), // DECSCNM
            6 => {
                self.origin_mode = if on {
                    OriginMode::ScrollingRegion
                } else {
                    OriginMode::Absolute
                };
                self.set_cursor_origin(0, 0);
            }
            7 => {
                self.auto_wrap_mode = on;
                self.last_col = false;
            }
            8 => {}  // DECARM autorepeat
            9 => {
                self.mouse_trk.mode = if on {
                    MouseTrackingMode::X10Compat
                } else {
                    MouseTrackingMode::Disabled
                };
            }
            12 => {} // cursor blink
            25 => {
                self.show_cursor_mode = on;
                self.cf().set_cursor_visible(on);
            }
            40 => {} // allow 80 <-> 132 switching
            45 => {} // reverse wraparound: accepted, backspace still stops at the margin
            47 => self.switch_screen_buffer(on, false),
            69 => {
                self.horiz_margin_mode = on;
                self.h_margin = 0;
                self.n_cols_eff = self.n_cols;
            }
            1000 => {
                self.mouse_trk.mode = if on {
                    MouseTrackingMode::Vt200
                } else {
                    MouseTrackingMode::Disabled
                };
            }
            1002 => {
                self.mouse_trk.mode = if on {
                    MouseTrackingMode::Vt200ButtonEvent
                } else {
                    MouseTrackingMode::Disabled
                };
            }
            1003 => {
                self.mouse_trk.mode = if on {
                    MouseTrackingMode::Vt200AnyEvent
                } else {
                    MouseTrackingMode::Disabled
                };
            }
            1004 => self.mouse_trk.focus_event_mode = on,
            1005 => {
                self.mouse_trk.enc = if on {
                    MouseTrackingEnc::Utf8
                } else {
                    MouseTrackingEnc::Default
                };
            }
            1006 => {
                self.mouse_trk.enc = if on {
                    MouseTrackingEnc::Sgr
                } else {
                    MouseTrackingEnc::Default
                };
            }
            1015 => {
                self.mouse_trk.enc = if on {
                    MouseTrackingEnc::Urxvt
                } else {
                    MouseTrackingEnc::Default
                };
            }
            1007 => self.alt_scroll_mode = on,
            1036 => self.alt_sends_escape = on,
            1047 => {
                if !on && self.alt_screen_buffer_mode {
                    let pen = self.pen;
                    self.frame_alt.clear_all(&pen);
                }
                self.switch_screen_buffer(on, false);
            }
            1048 => {
                if on {
                    self.save_cursor_dec();
                } else {
                    self.restore_cursor_dec();
                }
            }
            1049 => {
                if on {
                    self.save_cursor_dec();
                    self.switch_screen_buffer(true, true);
                    self.set_cursor_clamped(0, 0);
                } else {
                    self.switch_screen_buffer(false, false);
                    self.restore_cursor_dec();
                }
            }
            2004 => self.bracketed_paste_mode = on,
            n => log::debug!(
                "unhandled DEC private mode {} {}",
                n,
                if on { "h" } else { "l" }
            ),
        }
    }

    // --- SGR ----------------------------------------------------------

    fn select_graphic_rendition(&mut self) {
        if self.params.is_empty() {
            self.reset_attrs();
            return;
        }
        let params = std::mem::take(&mut self.params);
        let mut i = 0;
        while i < params.len() {
            match params[i] {
                0 => self.reset_attrs(),
                1 => {
                    self.pen.attrs |= CellAttrs::BOLD;
                    self.set_fg_from_pal_ix();
                }
                3 => self.pen.attrs |= CellAttrs::ITALIC,
                4 => self.pen.attrs |= CellAttrs::UNDERLINE,
                7 => self.pen.attrs |= CellAttrs::INVERSE,
                22 => {
                    self.pen.attrs -= CellAttrs::BOLD;
                    self.set_fg_from_pal_ix();
                }
                23 => self.pen.attrs -= CellAttrs::ITALIC,
                24 => self.pen.attrs -= CellAttrs::UNDERLINE,
                27 => self.pen.attrs -= CellAttrs::INVERSE,
                p @ 30..=37 => {
                    self.fg_pal_ix = (p - 30) as i32;
                    self.set_fg_from_pal_ix();
                }
                38 => {
                    if let Some((color, ix, used)) = self.extended_color(&params[i..]) {
                        self.pen.fg = color;
                        self.fg_pal_ix = ix;
                        i += used;
                    } else {
                        break;
                    }
                }
                39 => {
                    self.fg_pal_ix = -1;
                    self.pen.fg = self.rgb_fg;
                }
                p @ 40..=47 => {
                    self.bg_pal_ix = (p - 40) as i32;
                    self.set_bg_from_pal_ix();
                }
                48 => {
                    if let Some((color, ix, used)) = self.extended_color(&params[i..]) {
                        self.pen.bg = color;
                        self.bg_pal_ix = ix;
                        i += used;
                    } else {
                        break;
                    }
                }
                49 => {
                    self.bg_pal_ix = -1;
                    self.pen.bg = self.rgb_bg;
                }
                p @ 90..=97 => {
                    self.fg_pal_ix = (p - 90 + 8) as i32;
                    self.set_fg_from_pal_ix();
                }
                p @ 100..=107 => {
                    self.bg_pal_ix = (p - 100 + 8) as i32;
                    self.set_bg_from_pal_ix();
                }
                n => log::debug!("unhandled SGR attribute {}", n),
            }
            i += 1;
        }
        self.params = params;
        self.params.clear();
    }

    /// Decode the `38;5;n` / `38;2;r;g;b` extended color forms.
    /// Returns the resolved color, the palette index (or -1 for direct
    /// colors) and how many extra parameters were consumed.
    fn extended_color(&self, params: &[u32]) -> Option<(RgbColor, i32, usize)> {
        match *params.get(1)? {
            5 => {
                let ix = (*params.get(2)?).min(255) as usize;
                Some((self.palette[ix], ix as i32, 2))
            }
            2 => {
                let r = (*params.get(2)?).min(255) as u8;
                let g = (*params.get(3)?).min(255) as u8;
                let b = (*params.get(4)?).min(255) as u8;
                Some((RgbColor::new(r, g, b), -1, 4))
            }
            _ => None,
        }
    }

    // --- reports ------------------------------------------------------

    fn device_status_report(&mut self, private: bool, host: &mut dyn TermHost) {
        match self.arg_raw(0, 0) {
            5 => self.write_pty(host, b"\x1b[0n"),
            6 => {
                let row = self.cursor_row_origin() + 1;
                let col = self.cursor_col_origin() + 1;
                let report = if private {
                    format!("\x1b[?{};{}R", row, col)
                } else {
                    format!("\x1b[{};{}R", row, col)
                };
                self.write_pty(host, report.as_bytes());
            }
            n => log::debug!("unhandled DSR {}", n),
        }
    }

    fn window_ops(&mut self, host: &mut dyn TermHost) {
        match self.arg_raw(0, 0) {
            14 => {
                let h = self.n_rows * usize::from(self.config.glyph_py);
                let w = self.n_cols * usize::from(self.config.glyph_px);
                let report = format!("\x1b[4;{};{}t", h, w);
                self.write_pty(host, report.as_bytes());
            }
            18 => {
                let report = format!("\x1b[8;{};{}t", self.n_rows, self.n_cols);
                self.write_pty(host, report.as_bytes());
            }
            19 => {
                let report = format!("\x1b[9;{};{}t", self.n_rows, self.n_cols);
                self.write_pty(host, report.as_bytes());
            }
            n => log::debug!("unhandled window op {}", n),
        }
    }

    // --- DECRQSS current-settings strings -----------------------------

    pub(super) fn current_sgr_string(&self) -> String {
        let mut s = String::from("0");
        if self.pen.attrs.contains(CellAttrs::BOLD) {
            s.push_str(";1");
        }
        if self.pen.attrs.contains(CellAttrs::ITALIC) {
            s.push_str(";3");
        }
        if self.pen.attrs.contains(CellAttrs::UNDERLINE) {
            s.push_str(";4");
        }
        if self.pen.attrs.contains(CellAttrs::INVERSE) {
            s.push_str(";7");
        }
        if self.fg_pal_ix >= 0 {
            match self.fg_pal_ix {
                0..=7 => s.push_str(&format!(";{}", 30 + self.fg_pal_ix)),
                8..=15 => s.push_str(&format!(";{}", 90 + self.fg_pal_ix - 8)),
                ix => s.push_str(&format!(";38;5;{}", ix)),
            }
        } else if self.pen.fg != self.rgb_fg {
            let fg = self.pen.fg;
            s.push_str(&format!(";38;2;{};{};{}", fg.red, fg.green, fg.blue));
        }
        if self.bg_pal_ix >= 0 {
            match self.bg_pal_ix {
                0..=7 => s.push_str(&format!(";{}", 40 + self.bg_pal_ix)),
                8..=15 => s.push_str(&format!(";{}", 100 + self.bg_pal_ix - 8)),
                ix => s.push_str(&format!(";48;5;{}", ix)),
            }
        } else if self.pen.bg != self.rgb_bg {
            let bg = self.pen.bg;
            s.push_str(&format!(";48;2;{};{};{}", bg.red, bg.green, bg.blue));
        }
        s
    }

    pub(super) fn current_margins_string(&self) -> String {
        format!("{};{}", self.margin_top + 1, self.margin_bottom)
    }

    pub(super) fn current_lr_margins_string(&self) -> String {
        format!("{};{}", self.h_margin + 1, self.n_cols_eff)
    }

    pub(super) fn current_conformance_string(&self) -> String {
        match self.compat_level {
            CompatLevel::Vt100 => "61;1".into(),
            _ => "64;1".into(),
        }
    }

    pub(super) fn current_cursor_style_string(&self) -> String {
        let style = match self.cf_ref().cursor().style {
            CursorStyle::Block => 2,
            CursorStyle::Underline => 4,
            CursorStyle::Bar => 6,
        };
        format!("{}", style)
    }
}
