//! The terminal: a byte-driven input state machine and the command
//! executor it feeds.  Owns the primary and alternate frames and every
//! piece of mode state; the host pushes PTY output through
//! [`Vterm::advance_bytes`] and receives response sequences through its
//! writer.

mod csi;
mod mouse;
mod osc;

pub use mouse::{MouseButton, MouseEvent, MouseEventKind};

use crate::cell::{Cell, CellAttrs, CellFlags};
use crate::charset::{self, Charset, CharsetState};
use crate::color::{default_palette, RgbColor};
use crate::config::Config;
use crate::frame::Frame;
use crate::input::{self, KeyboardState, VtKey, VtModifier};
use crate::selection::{Point, Rect, SelectSnapTo};
use crate::utf8::{Decoded, Utf8Decoder, REPLACEMENT};
use crate::TermHost;
use anyhow::Result;
use unicode_width::UnicodeWidthChar;

/// Parameter slots for a control sequence.
const MAX_CSI_PARAMS: usize = 16;
/// Bytes of OSC / DCS payload retained before the rest is discarded.
const MAX_STRING_ARG: usize = 4096;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum InputState {
    Normal,
    IgnoreSequence,
    Escape,
    EscapeVt52,
    EscSpc,
    EscHash,
    EscPct,
    SelectCharset,
    Csi,
    CsiPriv,
    CsiQuote,
    CsiDblQuote,
    CsiBang,
    CsiSpc,
    CsiGt,
    Dcs,
    DcsEsc,
    Osc,
    OscEsc,
    Vt52CupRow,
    Vt52CupCol,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CompatLevel {
    Vt52,
    Vt100,
    Vt400,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CursorKeyMode {
    Ansi,
    Application,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum KeypadMode {
    Normal,
    Application,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OriginMode {
    Absolute,
    ScrollingRegion,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ColMode {
    C80,
    C132,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum MouseTrackingMode {
    #[default]
    Disabled,
    X10Compat,
    Vt200,
    Vt200ButtonEvent,
    Vt200AnyEvent,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum MouseTrackingEnc {
    #[default]
    Default,
    Utf8,
    Sgr,
    Urxvt,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MouseTrackingState {
    pub mode: MouseTrackingMode,
    pub enc: MouseTrackingEnc,
    pub focus_event_mode: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct SavedCursorSco {
    is_set: bool,
    pos_x: usize,
    pos_y: usize,
    last_col: bool,
}

#[derive(Debug, Clone, Copy)]
struct SavedCursorDec {
    sco: SavedCursorSco,
    pen: Cell,
    fg_pal_ix: i32,
    bg_pal_ix: i32,
    origin_mode: OriginMode,
    charset_state: CharsetState,
}

impl Default for SavedCursorDec {
    fn default() -> SavedCursorDec {
        SavedCursorDec {
            sco: SavedCursorSco::default(),
            pen: Cell::default(),
            fg_pal_ix: -1,
            bg_pal_ix: -1,
            origin_mode: OriginMode::Absolute,
            charset_state: CharsetState::default(),
        }
    }
}

pub struct Vterm {
    config: Config,

    n_cols: usize,
    n_rows: usize,

    frame_pri: Frame,
    frame_alt: Frame,

    pos_x: usize,
    pos_y: usize,
    margin_top: usize,
    margin_bottom: usize,
    last_col: bool,

    /// Prototype cell carrying the current SGR attributes and resolved
    /// colors.
    pen: Cell,
    palette: [RgbColor; 256],
    /// Runtime default colors, adjustable via the dynamic-color OSC.
    rgb_fg: RgbColor,
    rgb_bg: RgbColor,
    /// Palette indices behind the pen colors, or -1 for direct colors;
    /// tracked so bold can brighten and defaults can repaint.
    fg_pal_ix: i32,
    bg_pal_ix: i32,
    reverse_video: bool,
    has_focus: bool,

    input_state: InputState,
    params: Vec<u32>,
    cur_param: Option<u32>,
    params_overflow: bool,
    arg_buf: Vec<u8>,
    utf8dec: Utf8Decoder,
    scs_dst: u8,
    scs_mod: Option<u8>,
    charset_state: CharsetState,
    last_graphic: Option<(u16, usize)>,

    // Terminal modes.  resetTerminal() must stay in sync with these.
    show_cursor_mode: bool,
    alt_screen_buffer_mode: bool,
    auto_wrap_mode: bool,
    auto_newline_mode: bool,
    keyboard_locked: bool,
    insert_mode: bool,
    bksp_sends_del: bool,
    local_echo: bool,
    bracketed_paste_mode: bool,
    alt_scroll_mode: bool,
    alt_sends_escape: bool,
    modify_other_keys: u8,

    horiz_margin_mode: bool,
    n_cols_eff: usize,
    h_margin: usize,

    tab_stops: Vec<bool>,

    compat_level: CompatLevel,
    cursor_key_mode: CursorKeyMode,
    keypad_mode: KeypadMode,
    origin_mode: OriginMode,
    col_mode: ColMode,

    saved_cursor_sco: SavedCursorSco,
    saved_cursor_dec_pri: SavedCursorDec,
    saved_cursor_dec_alt: SavedCursorDec,

    mouse_trk: MouseTrackingState,
    cur_mouse_button: MouseButton,

    select_anchor: Point,
    select_rectangular: bool,
}

impl Vterm {
    pub fn new(n_cols: usize, n_rows: usize, config: Config) -> Vterm {
        let n_cols = n_cols.max(1);
        let n_rows = n_rows.max(1);
        let mut frame_pri = Frame::new(n_cols, n_rows, config.save_lines);
        let mut frame_alt = Frame::new(n_cols, n_rows, 0);
        for frame in [&mut frame_pri, &mut frame_alt] {
            frame.set_cursor_visible(true);
            frame.set_cursor_color(config.cursor_color);
        }

        let mut pen = Cell::default();
        pen.fg = config.fg;
        pen.bg = config.bg;

        let mut vt = Vterm {
            n_cols,
            n_rows,
            frame_pri,
            frame_alt,
            pos_x: 0,
            pos_y: 0,
            margin_top: 0,
            margin_bottom: n_rows,
            last_col: false,
            pen,
            palette: default_palette(),
            rgb_fg: config.fg,
            rgb_bg: config.bg,
            fg_pal_ix: -1,
            bg_pal_ix: -1,
            reverse_video: false,
            has_focus: false,
            input_state: InputState::Normal,
            params: Vec::with_capacity(MAX_CSI_PARAMS),
            cur_param: None,
            params_overflow: false,
            arg_buf: Vec::new(),
            utf8dec: Utf8Decoder::new(),
            scs_dst: 0,
            scs_mod: None,
            charset_state: CharsetState::default(),
            last_graphic: None,
            show_cursor_mode: true,
            alt_screen_buffer_mode: false,
            auto_wrap_mode: true,
            auto_newline_mode: false,
            keyboard_locked: false,
            insert_mode: false,
            bksp_sends_del: true,
            local_echo: false,
            bracketed_paste_mode: false,
            alt_scroll_mode: config.alt_scroll,
            alt_sends_escape: true,
            modify_other_keys: 1,
            horiz_margin_mode: false,
            n_cols_eff: n_cols,
            h_margin: 0,
            tab_stops: Vec::new(),
            compat_level: CompatLevel::Vt400,
            cursor_key_mode: CursorKeyMode::Ansi,
            keypad_mode: KeypadMode::Normal,
            origin_mode: OriginMode::Absolute,
            col_mode: ColMode::C80,
            saved_cursor_sco: SavedCursorSco::default(),
            saved_cursor_dec_pri: SavedCursorDec::default(),
            saved_cursor_dec_alt: SavedCursorDec::default(),
            mouse_trk: MouseTrackingState::default(),
            cur_mouse_button: MouseButton::None,
            select_anchor: Point::default(),
            select_rectangular: false,
            config,
        };
        vt.reset_tab_stops();
        vt.sync_cursor();
        vt
    }

    // --- frame plumbing ----------------------------------------------

    /// The frame currently addressed by the protocol.
    fn cf(&mut self) -> &mut Frame {
        if self.alt_screen_buffer_mode {
            &mut self.frame_alt
        } else {
            &mut self.frame_pri
        }
    }

    fn cf_ref(&self) -> &Frame {
        if self.alt_screen_buffer_mode {
            &self.frame_alt
        } else {
            &self.frame_pri
        }
    }

    /// The frame a renderer should present right now.
    pub fn frame(&self) -> &Frame {
        self.cf_ref()
    }

    /// Snapshot the current frame for publication: cursor state is
    /// synced in and the producer-side damage window is handed over.
    pub fn take_frame(&mut self) -> Frame {
        self.sync_cursor();
        let snap = self.cf_ref().clone();
        self.cf().reset_damage();
        snap
    }

    pub fn size(&self) -> (usize, usize) {
        (self.n_cols, self.n_rows)
    }

    pub fn cursor_pos(&self) -> (usize, usize) {
        (self.pos_x, self.pos_y)
    }

    pub fn on_alt_screen(&self) -> bool {
        self.alt_screen_buffer_mode
    }

    pub fn mouse_tracking_state(&self) -> &MouseTrackingState {
        &self.mouse_trk
    }

    pub fn bracketed_paste_mode(&self) -> bool {
        self.bracketed_paste_mode
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn col_mode(&self) -> ColMode {
        self.col_mode
    }

    fn sync_cursor(&mut self) {
        let (x, y, visible) = (self.pos_x, self.pos_y, self.show_cursor_mode);
        let f = self.cf();
        f.set_cursor_pos(y, x);
        f.set_cursor_visible(visible);
    }

    /// Adopt a new geometry.  Content is preserved as far as it fits;
    /// margins and the scrollback view reset, and the host is expected
    /// to announce the change on the PTY.
    pub fn resize(&mut self, n_cols: usize, n_rows: usize) {
        let n_cols = n_cols.max(1);
        let n_rows = n_rows.max(1);
        if n_cols == self.n_cols && n_rows == self.n_rows {
            return;
        }
        self.frame_pri.resize(n_cols, n_rows);
        self.frame_alt.resize(n_cols, n_rows);
        self.n_cols = n_cols;
        self.n_rows = n_rows;
        self.margin_top = 0;
        self.margin_bottom = n_rows;
        self.horiz_margin_mode = false;
        self.h_margin = 0;
        self.n_cols_eff = n_cols;
        self.pos_x = self.pos_x.min(n_cols - 1);
        self.pos_y = self.pos_y.min(n_rows - 1);
        self.last_col = false;
        self.reset_tab_stops();
        self.sync_cursor();
    }

    // --- byte pump ----------------------------------------------------

    /// Feed a batch of PTY output bytes through the interpreter.
    /// Responses the stream provokes are written to the host.
    pub fn advance_bytes<B: AsRef<[u8]>>(&mut self, bytes: B, host: &mut dyn TermHost) {
        for &b in bytes.as_ref() {
            self.process_byte(b, host);
        }
        self.sync_cursor();
    }

    fn process_byte(&mut self, b: u8, host: &mut dyn TermHost) {
        match self.input_state {
            InputState::Normal => self.input_normal(b, host),
            InputState::Escape => self.input_escape(b, host),
            InputState::EscapeVt52 => self.input_escape_vt52(b, host),
            InputState::EscSpc => {
                // S7C1T / S8C1T control transmission choices are
                // accepted and ignored
                self.set_state(InputState::Normal);
            }
            InputState::EscHash => self.input_esc_hash(b),
            InputState::EscPct => self.input_esc_pct(b),
            InputState::SelectCharset => self.input_select_charset(b),
            InputState::Csi
            | InputState::CsiPriv
            | InputState::CsiQuote
            | InputState::CsiDblQuote
            | InputState::CsiBang
            | InputState::CsiSpc
            | InputState::CsiGt => self.input_csi(b, host),
            InputState::Dcs => match b {
                0x1b => self.set_state(InputState::DcsEsc),
                0x18 | 0x1a => self.set_state(InputState::Normal),
                _ => self.push_string_arg(b),
            },
            InputState::DcsEsc => match b {
                b'\\' => {
                    self.handle_dcs(host);
                    self.set_state(InputState::Normal);
                }
                _ => {
                    self.push_string_arg(0x1b);
                    self.push_string_arg(b);
                    self.set_state(InputState::Dcs);
                }
            },
            InputState::Osc => match b {
                0x07 => {
                    self.handle_osc(host);
                    self.set_state(InputState::Normal);
                }
                0x1b => self.set_state(InputState::OscEsc),
                0x18 | 0x1a => self.set_state(InputState::Normal),
                b if b < 0x20 => {}
                _ => self.push_string_arg(b),
            },
            InputState::OscEsc => match b {
                b'\\' => {
                    self.handle_osc(host);
                    self.set_state(InputState::Normal);
                }
                _ => {
                    // not a string terminator after all; abandon the
                    // OSC and re-enter escape processing
                    self.set_state(InputState::Escape);
                    self.process_byte(b, host);
                }
            },
            InputState::IgnoreSequence => match b {
                0x18 | 0x1a | 0x07 => self.set_state(InputState::Normal),
                0x1b => self.set_state(InputState::Escape),
                0x40..=0x7e => self.set_state(InputState::Normal),
                _ => {}
            },
            InputState::Vt52CupRow => {
                self.params.clear();
                self.params.push((b.saturating_sub(0x20)) as u32);
                self.set_state(InputState::Vt52CupCol);
            }
            InputState::Vt52CupCol => {
                let row = self.params.first().copied().unwrap_or(0) as usize;
                let col = b.saturating_sub(0x20) as usize;
                self.set_cursor_clamped(col, row);
                self.set_state(InputState::Normal);
            }
        }
    }

    fn set_state(&mut self, state: InputState) {
        if matches!(
            state,
            InputState::Csi | InputState::Dcs | InputState::Osc | InputState::SelectCharset
        ) {
            self.params.clear();
            self.cur_param = None;
            self.params_overflow = false;
            self.arg_buf.clear();
            self.scs_mod = None;
        }
        self.input_state = state;
    }

    fn push_string_arg(&mut self, b: u8) {
        if self.arg_buf.len() < MAX_STRING_ARG {
            self.arg_buf.push(b);
        }
    }

    // --- Normal state -------------------------------------------------

    fn input_normal(&mut self, b: u8, host: &mut dyn TermHost) {
        match b {
            0x00..=0x1f => self.execute_c0(b, host),
            0x7f => {} // DEL is ignored on input
            0x80..=0x9f if !self.utf8dec.pending() => self.execute_c1(b, host),
            _ => self.input_graphic_char(b),
        }
    }

    fn execute_c0(&mut self, b: u8, host: &mut dyn TermHost) {
        match b {
            0x05 => {
                // ENQ
                let answer = self.config.answerback.clone();
                if !answer.is_empty() {
                    self.write_pty(host, answer.as_bytes());
                }
            }
            0x07 => host.bell(),
            0x08 => {
                // BS stops at the left margin
                let left = self.left_limit();
                if self.pos_x > left {
                    self.pos_x -= 1;
                }
                self.last_col = false;
            }
            0x09 => self.jump_to_next_tab_stop(),
            0x0a | 0x0b | 0x0c => {
                self.line_feed();
                if self.auto_newline_mode {
                    self.pos_x = self.left_limit();
                }
            }
            0x0d => {
                self.pos_x = self.left_limit();
                self.last_col = false;
            }
            0x0e => self.charset_state.gl = 1, // SO
            0x0f => self.charset_state.gl = 0, // SI
            0x1b => {
                self.utf8dec.reset();
                self.set_state(if self.compat_level == CompatLevel::Vt52 {
                    InputState::EscapeVt52
                } else {
                    InputState::Escape
                });
            }
            0x18 | 0x1a => {} // CAN / SUB have nothing to abort here
            _ => log::debug!("ignored C0 control {:#04x}", b),
        }
    }

    fn execute_c1(&mut self, b: u8, _host: &mut dyn TermHost) {
        match b {
            0x84 => self.index(),                       // IND
            0x85 => self.next_line(),                   // NEL
            0x88 => self.set_tab_stop(),                // HTS
            0x8d => self.reverse_index(),               // RI
            0x8e => self.charset_state.ss = 2,          // SS2
            0x8f => self.charset_state.ss = 3,          // SS3
            0x90 => self.set_state(InputState::Dcs),    // DCS
            0x9b => self.set_state(InputState::Csi),    // CSI
            0x9d => self.set_state(InputState::Osc),    // OSC
            0x9c => {}                                  // ST
            _ => log::debug!("ignored C1 control {:#04x}", b),
        }
    }

    // --- printing -----------------------------------------------------

    fn input_graphic_char(&mut self, ch: u8) {
        if ch >= 0xa0 {
            match charset::map_gr(self.charset_state.gr_set(), ch) {
                Some(code) => self.place_mapped(code),
                None => self.decode_utf8(ch),
            }
        } else if ch >= 0x20 {
            let cs = self.charset_state.gl_set();
            self.charset_state.ss = 0;
            match charset::map_gl(cs, ch) {
                Some(code) => self.place_mapped(code),
                None => self.decode_utf8(ch),
            }
        } else {
            // 0x80..0x9f while a UTF-8 sequence is pending
            self.decode_utf8(ch);
        }
    }

    fn decode_utf8(&mut self, ch: u8) {
        match self.utf8dec.push(ch) {
            Decoded::None => {}
            Decoded::One(cp) => self.place_code_point(cp),
            Decoded::Two(a, b) => {
                self.place_code_point(a);
                self.place_code_point(b);
            }
        }
    }

    fn place_code_point(&mut self, cp: u32) {
        let ch = char::from_u32(cp).unwrap_or('\u{fffd}');
        let width = ch.width().unwrap_or(1).max(1).min(2);
        // cells store BMP code points only
        let code = if cp > 0xffff { REPLACEMENT as u16 } else { cp as u16 };
        self.place_graphic(code, width);
    }

    fn place_mapped(&mut self, code: u16) {
        self.place_graphic(code, 1);
    }

    fn left_limit(&self) -> usize {
        if self.horiz_margin_mode {
            self.h_margin
        } else {
            0
        }
    }

    fn right_limit(&self) -> usize {
        if self.horiz_margin_mode {
            self.n_cols_eff
        } else {
            self.n_cols
        }
    }

    fn place_graphic(&mut self, code: u16, width: usize) {
        let limit = self.right_limit();

        if self.last_col {
            if self.auto_wrap_mode {
                // mark the just-completed row as soft wrapped, then
                // continue on the next line
                let (y, x) = (self.pos_y, limit - 1);
                self.cf().cell_mut(y, x).flags |= CellFlags::WRAP;
                self.line_feed();
                self.pos_x = self.left_limit();
            }
            self.last_col = false;
        }

        if self.insert_mode {
            self.insert_chars(width);
        }

        let pen = self.pen;
        let (x, y) = (self.pos_x, self.pos_y);
        let paired = width == 2 && x + 1 < limit;

        let mut cell = Cell::with_code(&pen, code);
        if paired {
            cell.flags |= CellFlags::DWIDTH;
        }
        self.cf().set_cell(y, x, cell);

        if paired {
            let mut cont = Cell::blank_with(&pen);
            cont.flags |= CellFlags::DWIDTH_CONT;
            self.cf().set_cell(y, x + 1, cont);
        }

        self.last_graphic = Some((code, width));

        let adv = x + if paired { 2 } else { 1 };
        if adv < limit {
            self.pos_x = adv;
        } else {
            self.pos_x = limit - 1;
            self.last_col = true;
        }
    }

    /// Repeat the preceding graphic character, for REP.
    fn repeat_graphic(&mut self, count: usize) {
        if let Some((code, width)) = self.last_graphic {
            for _ in 0..count.min(self.n_cols * self.n_rows) {
                self.place_graphic(code, width);
            }
        }
    }

    // --- cursor movement ----------------------------------------------

    fn set_cursor_clamped(&mut self, x: usize, y: usize) {
        self.pos_x = x.min(self.n_cols - 1);
        self.pos_y = y.min(self.n_rows - 1);
        self.last_col = false;
    }

    /// Position the cursor from protocol coordinates, honoring origin
    /// mode: relative addressing confines the cursor to the scrolling
    /// region (and the horizontal margins).
    fn set_cursor_origin(&mut self, x: usize, y: usize) {
        match self.origin_mode {
            OriginMode::Absolute => self.set_cursor_clamped(x, y),
            OriginMode::ScrollingRegion => {
                let x = (x + self.left_limit()).min(self.right_limit() - 1);
                let y = (y + self.margin_top).min(self.margin_bottom - 1);
                self.set_cursor_clamped(x, y);
            }
        }
    }

    fn cursor_row_origin(&self) -> usize {
        match self.origin_mode {
            OriginMode::Absolute => self.pos_y,
            OriginMode::ScrollingRegion => self.pos_y.saturating_sub(self.margin_top),
        }
    }

    fn cursor_col_origin(&self) -> usize {
        match self.origin_mode {
            OriginMode::Absolute => self.pos_x,
            OriginMode::ScrollingRegion => self.pos_x.saturating_sub(self.left_limit()),
        }
    }

    fn is_cursor_inside_margins(&self) -> bool {
        self.pos_y >= self.margin_top
            && self.pos_y < self.margin_bottom
            && self.pos_x >= self.left_limit()
            && self.pos_x < self.right_limit()
    }

    fn line_feed(&mut self) {
        self.last_col = false;
        if self.pos_y + 1 == self.margin_bottom {
            self.scroll_region_up(1);
        } else if self.pos_y + 1 < self.n_rows {
            self.pos_y += 1;
        }
    }

    fn index(&mut self) {
        self.line_feed();
    }

    fn next_line(&mut self) {
        self.line_feed();
        self.pos_x = self.left_limit();
    }

    fn reverse_index(&mut self) {
        self.last_col = false;
        if self.pos_y == self.margin_top {
            self.scroll_region_down(1);
        } else if self.pos_y > 0 {
            self.pos_y -= 1;
        }
    }

    /// DECBI: cursor left, shifting the region right at the margin.
    fn back_index(&mut self) {
        if self.pos_x == self.left_limit() {
            self.shift_region_right(1);
        } else {
            self.pos_x -= 1;
        }
        self.last_col = false;
    }

    /// DECFI: cursor right, shifting the region left at the margin.
    fn forward_index(&mut self) {
        if self.pos_x + 1 >= self.right_limit() {
            self.shift_region_left(1);
        } else {
            self.pos_x += 1;
        }
        self.last_col = false;
    }

    // --- scrolling ----------------------------------------------------

    fn has_custom_margins(&self) -> bool {
        self.margin_top != 0 || self.margin_bottom != self.n_rows
    }

    fn scroll_region_up(&mut self, count: usize) {
        let pen = self.pen;
        if self.horiz_margin_mode {
            let (left, width) = (self.h_margin, self.n_cols_eff - self.h_margin);
            let count = count.min(self.margin_bottom - self.margin_top);
            for y in self.margin_top..self.margin_bottom - count {
                self.cf().copy_row(y, y + count, left, width);
            }
            for y in self.margin_bottom - count..self.margin_bottom {
                self.cf().erase_in_row(y, left, width, &pen);
            }
        } else {
            self.cf().scroll_up(count, &pen);
        }
    }

    fn scroll_region_down(&mut self, count: usize) {
        let pen = self.pen;
        if self.horiz_margin_mode {
            let (left, width) = (self.h_margin, self.n_cols_eff - self.h_margin);
            let count = count.min(self.margin_bottom - self.margin_top);
            for y in (self.margin_top + count..self.margin_bottom).rev() {
                self.cf().copy_row(y, y - count, left, width);
            }
            for y in self.margin_top..self.margin_top + count {
                self.cf().erase_in_row(y, left, width, &pen);
            }
        } else {
            self.cf().scroll_down(count, &pen);
        }
    }

    /// Shift the cells of the scrolling region horizontally left,
    /// for ECMA-48 SL and DECFI.
    fn shift_region_left(&mut self, count: usize) {
        let pen = self.pen;
        let (left, right) = (self.left_limit(), self.right_limit());
        let count = count.min(right - left);
        for y in self.margin_top..self.margin_bottom {
            self.cf().move_in_row(y, left, left + count, right - left - count);
            self.cf().erase_in_row(y, right - count, count, &pen);
        }
    }

    fn shift_region_right(&mut self, count: usize) {
        let pen = self.pen;
        let (left, right) = (self.left_limit(), self.right_limit());
        let count = count.min(right - left);
        for y in self.margin_top..self.margin_bottom {
            self.cf().move_in_row(y, left + count, left, right - left - count);
            self.cf().erase_in_row(y, left, count, &pen);
        }
    }

    // --- editing helpers ----------------------------------------------

    fn insert_chars(&mut self, count: usize) {
        let (x, y) = (self.pos_x, self.pos_y);
        let right = self.right_limit();
        let count = count.min(right - x);
        let pen = self.pen;
        self.cf().move_in_row(y, x + count, x, right - x - count);
        self.cf().erase_in_row(y, x, count, &pen);
    }

    fn delete_chars(&mut self, count: usize) {
        let (x, y) = (self.pos_x, self.pos_y);
        let right = self.right_limit();
        let count = count.min(right - x);
        let pen = self.pen;
        self.cf().move_in_row(y, x, x + count, right - x - count);
        self.cf().erase_in_row(y, right - count, count, &pen);
    }

    /// The column band editing operations act on: the horizontal
    /// margins when active, the full width otherwise.
    fn edit_band(&self) -> (usize, usize) {
        if self.horiz_margin_mode {
            (self.h_margin, self.n_cols_eff - self.h_margin)
        } else {
            (0, self.n_cols)
        }
    }

    /// IL: open rows at the cursor, pushing the rest of the scrolling
    /// region down.  The sub-region never takes the ring fast path;
    /// rows move physically.
    fn insert_rows(&mut self, count: usize) {
        if !self.is_cursor_inside_margins() {
            return;
        }
        let pen = self.pen;
        let (top, bottom) = (self.pos_y, self.margin_bottom);
        let count = count.min(bottom - top);
        let (left, width) = self.edit_band();
        for y in (top + count..bottom).rev() {
            self.cf().copy_row(y, y - count, left, width);
        }
        for y in top..top + count {
            self.cf().erase_in_row(y, left, width, &pen);
        }
        self.pos_x = self.left_limit();
        self.last_col = false;
    }

    /// DL: close rows at the cursor, pulling the rest of the scrolling
    /// region up.
    fn delete_rows(&mut self, count: usize) {
        if !self.is_cursor_inside_margins() {
            return;
        }
        let pen = self.pen;
        let (top, bottom) = (self.pos_y, self.margin_bottom);
        let count = count.min(bottom - top);
        let (left, width) = self.edit_band();
        for y in top..bottom - count {
            self.cf().copy_row(y, y + count, left, width);
        }
        for y in bottom - count..bottom {
            self.cf().erase_in_row(y, left, width, &pen);
        }
        self.pos_x = self.left_limit();
        self.last_col = false;
    }

    fn insert_cols(&mut self, count: usize) {
        if !self.is_cursor_inside_margins() {
            return;
        }
        let x = self.pos_x;
        let right = self.right_limit();
        let count = count.min(right - x);
        let pen = self.pen;
        for y in self.margin_top..self.margin_bottom {
            self.cf().move_in_row(y, x + count, x, right - x - count);
            self.cf().erase_in_row(y, x, count, &pen);
        }
    }

    fn delete_cols(&mut self, count: usize) {
        if !self.is_cursor_inside_margins() {
            return;
        }
        let x = self.pos_x;
        let right = self.right_limit();
        let count = count.min(right - x);
        let pen = self.pen;
        for y in self.margin_top..self.margin_bottom {
            self.cf().move_in_row(y, x, x + count, right - x - count);
            self.cf().erase_in_row(y, right - count, count, &pen);
        }
    }

    // --- tab stops ----------------------------------------------------

    fn reset_tab_stops(&mut self) {
        self.tab_stops = (0..self.n_cols).map(|x| x % 8 == 0).collect();
    }

    fn set_tab_stop(&mut self) {
        let x = self.pos_x;
        if let Some(stop) = self.tab_stops.get_mut(x) {
            *stop = true;
        }
    }

    fn clear_tab_stop(&mut self) {
        let x = self.pos_x;
        if let Some(stop) = self.tab_stops.get_mut(x) {
            *stop = false;
        }
    }

    fn clear_all_tab_stops(&mut self) {
        self.tab_stops.iter_mut().for_each(|s| *s = false);
    }

    fn jump_to_next_tab_stop(&mut self) {
        let limit = self.right_limit();
        let next = (self.pos_x + 1..limit).find(|&x| self.tab_stops[x]);
        self.pos_x = next.unwrap_or(limit - 1);
        self.last_col = false;
    }

    fn jump_to_prev_tab_stop(&mut self) {
        let left = self.left_limit();
        let prev = (left..self.pos_x).rev().find(|&x| self.tab_stops[x]);
        self.pos_x = prev.unwrap_or(left);
        self.last_col = false;
    }

    // --- escape dispatch ----------------------------------------------

    fn input_escape(&mut self, b: u8, host: &mut dyn TermHost) {
        self.set_state(InputState::Normal);
        match b {
            b'[' => self.set_state(InputState::Csi),
            b']' => self.set_state(InputState::Osc),
            b'P' => self.set_state(InputState::Dcs),
            b'X' | b'^' | b'_' => self.set_state(InputState::IgnoreSequence), // SOS/PM/APC
            b'(' | b')' | b'*' | b'+' | b'-' | b'.' | b'/' => {
                self.scs_dst = b;
                self.set_state(InputState::SelectCharset);
            }
            b' ' => self.set_state(InputState::EscSpc),
            b'#' => self.set_state(InputState::EscHash),
            b'%' => self.set_state(InputState::EscPct),
            b'7' => self.save_cursor_dec(),
            b'8' => self.restore_cursor_dec(),
            b'D' => self.index(),
            b'E' => self.next_line(),
            b'H' => self.set_tab_stop(),
            b'M' => self.reverse_index(),
            b'6' => self.back_index(),
            b'9' => self.forward_index(),
            b'=' => self.keypad_mode = KeypadMode::Application,
            b'>' => self.keypad_mode = KeypadMode::Normal,
            b'N' => self.charset_state.ss = 2,
            b'O' => self.charset_state.ss = 3,
            b'n' => self.charset_state.gl = 2,
            b'o' => self.charset_state.gl = 3,
            b'|' => self.charset_state.gr = 3,
            b'}' => self.charset_state.gr = 2,
            b'~' => self.charset_state.gr = 1,
            b'c' => self.reset_terminal(true),
            b'Z' => self.report_primary_da(host),
            b'\\' => {} // stray string terminator
            _ => {
                log::debug!("unhandled escape final {:#04x} ({})", b, b as char);
            }
        }
    }

    fn input_escape_vt52(&mut self, b: u8, host: &mut dyn TermHost) {
        self.set_state(InputState::Normal);
        match b {
            b'A' => self.pos_y = self.pos_y.saturating_sub(1),
            b'B' => self.pos_y = (self.pos_y + 1).min(self.n_rows - 1),
            b'C' => self.pos_x = (self.pos_x + 1).min(self.n_cols - 1),
            b'D' => self.pos_x = self.pos_x.saturating_sub(1),
            b'F' => self.charset_state.g[0] = Charset::DecSpec,
            b'G' => self.charset_state.g[0] = Charset::Utf8,
            b'H' => self.set_cursor_clamped(0, 0),
            b'I' => self.reverse_index(),
            b'J' => {
                let pen = self.pen;
                let (x, y) = (self.pos_x, self.pos_y);
                let cols = self.n_cols;
                self.cf().erase_in_row(y, x, cols - x, &pen);
                for row in y + 1..self.n_rows {
                    self.cf().erase_row(row, &pen);
                }
            }
            b'K' => {
                let pen = self.pen;
                let (x, y) = (self.pos_x, self.pos_y);
                let cols = self.n_cols;
                self.cf().erase_in_row(y, x, cols - x, &pen);
            }
            b'Y' => self.set_state(InputState::Vt52CupRow),
            b'Z' => self.write_pty(host, b"\x1b/Z"),
            b'=' => self.keypad_mode = KeypadMode::Application,
            b'>' => self.keypad_mode = KeypadMode::Normal,
            b'<' => self.compat_level = CompatLevel::Vt400,
            _ => log::debug!("unhandled VT52 escape {:#04x}", b),
        }
    }

    fn input_esc_hash(&mut self, b: u8) {
        self.set_state(InputState::Normal);
        match b {
            b'8' => {
                // alignment pattern: fill the screen with E and reset
                // margins and cursor
                let pen = self.pen;
                self.cf().fill_visible(b'E' as u16, &pen);
                self.reset_margins_full();
                self.set_cursor_clamped(0, 0);
            }
            b'3'..=b'6' => {
                // double width/height lines are not supported
            }
            _ => log::debug!("unhandled ESC # {:#04x}", b),
        }
    }

    fn input_esc_pct(&mut self, b: u8) {
        self.set_state(InputState::Normal);
        match b {
            b'G' | b'@' => {
                // select / deselect UTF-8: both return the charset
                // model to its native default
                self.charset_state = CharsetState::default();
            }
            _ => log::debug!("unhandled ESC % {:#04x}", b),
        }
    }

    fn input_select_charset(&mut self, b: u8) {
        if (0x20..=0x2f).contains(&b) {
            self.scs_mod = Some(b);
            return;
        }
        self.set_state(InputState::Normal);
        let g96 = matches!(self.scs_dst, b'-' | b'.' | b'/');
        let slot = match self.scs_dst {
            b'(' => 0,
            b')' | b'-' => 1,
            b'*' | b'.' => 2,
            b'+' | b'/' => 3,
            _ => return,
        };
        match charset::designate(self.scs_mod, b, g96) {
            Some(cs) => self.charset_state.g[slot] = cs,
            None => log::debug!(
                "unhandled charset designation {} {:?} {}",
                self.scs_dst as char,
                self.scs_mod.map(|m| m as char),
                b as char
            ),
        }
    }

    // --- cursor save/restore ------------------------------------------

    fn save_cursor_sco(&mut self) {
        self.saved_cursor_sco = SavedCursorSco {
            is_set: true,
            pos_x: self.pos_x,
            pos_y: self.pos_y,
            last_col: self.last_col,
        };
    }

    fn restore_cursor_sco(&mut self) {
        if self.saved_cursor_sco.is_set {
            let s = self.saved_cursor_sco;
            self.set_cursor_clamped(s.pos_x, s.pos_y);
            self.last_col = s.last_col;
        }
    }

    fn saved_dec_slot(&mut self) -> &mut SavedCursorDec {
        if self.alt_screen_buffer_mode {
            &mut self.saved_cursor_dec_alt
        } else {
            &mut self.saved_cursor_dec_pri
        }
    }

    fn save_cursor_dec(&mut self) {
        let snapshot = SavedCursorDec {
            sco: SavedCursorSco {
                is_set: true,
                pos_x: self.pos_x,
                pos_y: self.pos_y,
                last_col: self.last_col,
            },
            pen: self.pen,
            fg_pal_ix: self.fg_pal_ix,
            bg_pal_ix: self.bg_pal_ix,
            origin_mode: self.origin_mode,
            charset_state: self.charset_state,
        };
        *self.saved_dec_slot() = snapshot;
    }

    fn restore_cursor_dec(&mut self) {
        let saved = *self.saved_dec_slot();
        if !saved.sco.is_set {
            self.set_cursor_clamped(0, 0);
            return;
        }
        self.set_cursor_clamped(saved.sco.pos_x, saved.sco.pos_y);
        self.last_col = saved.sco.last_col;
        self.pen = saved.pen;
        self.fg_pal_ix = saved.fg_pal_ix;
        self.bg_pal_ix = saved.bg_pal_ix;
        self.origin_mode = saved.origin_mode;
        self.charset_state = saved.charset_state;
    }

    // --- resets -------------------------------------------------------

    fn reset_attrs(&mut self) {
        self.pen = Cell::default();
        self.pen.fg = self.rgb_fg;
        self.pen.bg = self.rgb_bg;
        self.fg_pal_ix = -1;
        self.bg_pal_ix = -1;
    }

    fn reset_margins_full(&mut self) {
        self.margin_top = 0;
        self.margin_bottom = self.n_rows;
        self.horiz_margin_mode = false;
        self.h_margin = 0;
        self.n_cols_eff = self.n_cols;
        self.cf().reset_margins();
    }

    /// Shared body of RIS and the soft reset: RIS additionally clears
    /// both frames and homes the cursor.
    pub(crate) fn reset_terminal(&mut self, hard: bool) {
        self.show_cursor_mode = true;
        self.auto_wrap_mode = true;
        self.auto_newline_mode = false;
        self.keyboard_locked = false;
        self.insert_mode = false;
        self.bksp_sends_del = true;
        self.local_echo = false;
        self.bracketed_paste_mode = false;
        self.alt_scroll_mode = self.config.alt_scroll;
        self.alt_sends_escape = true;
        self.modify_other_keys = 1;
        self.compat_level = CompatLevel::Vt400;
        self.cursor_key_mode = CursorKeyMode::Ansi;
        self.keypad_mode = KeypadMode::Normal;
        self.origin_mode = OriginMode::Absolute;
        self.col_mode = ColMode::C80;
        self.charset_state = CharsetState::default();
        self.mouse_trk = MouseTrackingState::default();
        self.reverse_video = false;
        self.rgb_fg = self.config.fg;
        self.rgb_bg = self.config.bg;
        self.palette = default_palette();
        self.reset_attrs();
        self.reset_tab_stops();
        self.saved_cursor_sco = SavedCursorSco::default();
        self.saved_cursor_dec_pri = SavedCursorDec::default();
        self.saved_cursor_dec_alt = SavedCursorDec::default();
        self.last_col = false;
        self.utf8dec.reset();
        self.set_state(InputState::Normal);

        if hard {
            self.alt_screen_buffer_mode = false;
            let pen = self.pen;
            self.frame_pri.clear_all(&pen);
            self.frame_alt.clear_all(&pen);
            self.set_cursor_clamped(0, 0);
        }
        self.reset_margins_full();
        self.cf().expose();
        self.sync_cursor();
    }

    // --- screen buffer switching --------------------------------------

    fn switch_screen_buffer(&mut self, alt: bool, clear_alt: bool) {
        if alt == self.alt_screen_buffer_mode {
            return;
        }
        self.alt_screen_buffer_mode = alt;
        if alt && clear_alt {
            let pen = self.pen;
            self.frame_alt.clear_all(&pen);
        }
        // margins do not cross the screen switch
        self.margin_top = 0;
        self.margin_bottom = self.n_rows;
        self.cf().reset_margins();
        self.cf().expose();
        self.sync_cursor();
    }

    // --- colors -------------------------------------------------------

    /// Re-resolve the pen foreground from its palette index, applying
    /// the bold-brightens rule.
    fn set_fg_from_pal_ix(&mut self) {
        if self.fg_pal_ix < 0 {
            return;
        }
        let mut ix = self.fg_pal_ix as usize;
        if self.config.bold_as_bright && self.pen.attrs.contains(CellAttrs::BOLD) && ix < 8 {
            ix += 8;
        }
        self.pen.fg = self.palette[ix];
    }

    fn set_bg_from_pal_ix(&mut self) {
        if self.bg_pal_ix < 0 {
            return;
        }
        self.pen.bg = self.palette[self.bg_pal_ix as usize];
    }

    /// DECSCNM repaints by exchanging the runtime default colors and
    /// rewriting every cell that used them.
    fn set_reverse_video(&mut self, on: bool) {
        if on == self.reverse_video {
            return;
        }
        self.reverse_video = on;
        std::mem::swap(&mut self.rgb_fg, &mut self.rgb_bg);
        let (old_fg, old_bg) = (self.rgb_bg, self.rgb_fg);
        let (new_fg, new_bg) = (self.rgb_fg, self.rgb_bg);
        if self.fg_pal_ix < 0 && self.pen.fg == old_fg {
            self.pen.fg = new_fg;
        }
        if self.bg_pal_ix < 0 && self.pen.bg == old_bg {
            self.pen.bg = new_bg;
        }
        self.cf().expose();
    }

    // --- PTY output side ----------------------------------------------

    fn write_pty(&mut self, host: &mut dyn TermHost, bytes: &[u8]) {
        if let Err(err) = host.writer().write_all(bytes) {
            log::warn!("write to pty failed: {}", err);
        }
    }

    fn keyboard_state(&self) -> KeyboardState {
        KeyboardState {
            vt52_mode: self.compat_level == CompatLevel::Vt52,
            app_cursor_keys: self.cursor_key_mode == CursorKeyMode::Application,
            app_keypad: self.keypad_mode == KeypadMode::Application,
            bksp_sends_del: self.bksp_sends_del,
            alt_sends_escape: self.alt_sends_escape,
            modify_other_keys: self.modify_other_keys,
        }
    }

    /// Encode and transmit a key press.  Any scrolled-back view snaps
    /// to the live screen first.
    pub fn key_down(
        &mut self,
        key: VtKey,
        mods: VtModifier,
        host: &mut dyn TermHost,
    ) -> Result<()> {
        if self.keyboard_locked {
            return Ok(());
        }
        self.cf().page_to_bottom();
        let st = self.keyboard_state();
        let mut out = Vec::new();
        if input::encode_key(key, mods, &st, &mut out) {
            host.writer().write_all(&out)?;
            if self.local_echo {
                self.echo_local(&out, host);
            }
        }
        Ok(())
    }

    /// Encode and transmit a printable character from the keyboard.
    pub fn send_char(&mut self, ch: char, mods: VtModifier, host: &mut dyn TermHost) -> Result<()> {
        if self.keyboard_locked {
            return Ok(());
        }
        self.cf().page_to_bottom();
        let st = self.keyboard_state();
        let mut out = Vec::new();
        if input::encode_char(ch, mods, &st, &mut out) {
            host.writer().write_all(&out)?;
            if self.local_echo {
                self.echo_local(&out, host);
            }
        }
        Ok(())
    }

    /// Transmit pasted text, framed when bracketed paste is active.
    /// Line feeds travel as carriage returns, the way terminals expect
    /// pasted newlines.
    pub fn paste(&mut self, text: &str, host: &mut dyn TermHost) -> Result<()> {
        if self.keyboard_locked {
            return Ok(());
        }
        self.cf().page_to_bottom();
        if self.bracketed_paste_mode {
            host.writer().write_all(b"\x1b[200~")?;
        }
        let translated: Vec<u8> = text
            .bytes()
            .map(|b| if b == b'\n' { b'\r' } else { b })
            .collect();
        host.writer().write_all(&translated)?;
        if self.bracketed_paste_mode {
            host.writer().write_all(b"\x1b[201~")?;
        }
        Ok(())
    }

    /// Echo locally transmitted bytes back through the interpreter,
    /// rendering controls in caret notation.
    fn echo_local(&mut self, bytes: &[u8], host: &mut dyn TermHost) {
        let mut shown = Vec::with_capacity(bytes.len());
        for &b in bytes {
            match b {
                0x0a | 0x0d => shown.push(b),
                0x00..=0x1f => {
                    shown.push(b'^');
                    shown.push(b + 0x40);
                }
                0x7f => {
                    shown.push(b'^');
                    shown.push(b'?');
                }
                _ => shown.push(b),
            }
        }
        self.advance_bytes(&shown, host);
    }

    /// Report a focus change; mode 1004 forwards it to the application.
    pub fn set_has_focus(&mut self, focus: bool, host: &mut dyn TermHost) {
        self.has_focus = focus;
        if self.mouse_trk.focus_event_mode {
            let seq: &[u8] = if focus { b"\x1b[I" } else { b"\x1b[O" };
            self.write_pty(host, seq);
        }
    }

    // --- scrollback view ----------------------------------------------

    pub fn page_up(&mut self) {
        let rows = self.n_rows.saturating_sub(1).max(1);
        self.cf().page_up(rows);
    }

    pub fn page_down(&mut self) {
        let rows = self.n_rows.saturating_sub(1).max(1);
        self.cf().page_down(rows);
    }

    pub fn mouse_wheel_up(&mut self) {
        self.cf().page_up(3);
    }

    pub fn mouse_wheel_down(&mut self) {
        self.cf().page_down(3);
    }

    // --- selection boundary -------------------------------------------

    fn pixel_to_cell(&self, px: i32, py: i32) -> Point {
        let gx = i32::from(self.config.glyph_px.max(1));
        let gy = i32::from(self.config.glyph_py.max(1));
        let border = i32::from(self.config.border_px);
        let x = ((px - border).max(0) / gx).min(self.n_cols as i32 - 1);
        let y = ((py - border).max(0) / gy).min(self.n_rows as i32 - 1);
        Point::new(x as isize, y as isize)
    }

    /// Begin a selection drag at a pixel position.  `cycle_snap` is set
    /// by the host on repeated clicks within its double-click window
    /// and advances the snap granularity instead of moving the anchor.
    pub fn select_start(&mut self, px: i32, py: i32, cycle_snap: bool) {
        let p = self.pixel_to_cell(px, py);
        if cycle_snap {
            self.cf().cycle_select_snap();
            self.cf().expose();
            return;
        }
        self.cf().set_select_snap(SelectSnapTo::Char);
        self.select_anchor = p;
        let rectangular = self.select_rectangular;
        let rect = self.drag_rect(p);
        let f = self.cf();
        *f.selection_mut() = rect;
        f.selection_mut().rectangular = rectangular;
        f.expose();
    }

    /// Extend an existing selection from whichever end is nearer the
    /// given position.
    pub fn select_extend(&mut self, px: i32, py: i32, cycle_snap: bool) {
        let p = self.pixel_to_cell(px, py);
        if cycle_snap {
            self.cf().cycle_select_snap();
        }
        let sel = *self.cf_ref().selection();
        if sel.is_null() {
            self.select_start(px, py, false);
            return;
        }
        // anchor at the far end so the near end follows the pointer
        let mid_y = (sel.tl.y + sel.br.y) / 2;
        self.select_anchor = if (p.y, p.x) <= (mid_y, (sel.tl.x + sel.br.x) / 2) {
            Point::new(sel.br.x - 1, sel.br.y)
        } else {
            sel.tl
        };
        self.select_update_cell(p);
    }

    /// Track a drag in progress.
    pub fn select_update(&mut self, px: i32, py: i32) {
        let p = self.pixel_to_cell(px, py);
        self.select_update_cell(p);
    }

    fn select_update_cell(&mut self, p: Point) {
        let rect = self.drag_rect(p);
        let f = self.cf();
        *f.selection_mut() = rect;
        f.expose();
    }

    fn drag_rect(&self, p: Point) -> Rect {
        let a = self.select_anchor;
        if self.select_rectangular {
            let (x1, x2) = if a.x <= p.x { (a.x, p.x + 1) } else { (p.x, a.x + 1) };
            let (y1, y2) = if a.y <= p.y { (a.y, p.y) } else { (p.y, a.y) };
            Rect {
                tl: Point::new(x1, y1),
                br: Point::new(x2, y2),
                rectangular: true,
            }
        } else if (p.y, p.x) < (a.y, a.x) {
            Rect {
                tl: p,
                br: Point::new(a.x + 1, a.y),
                rectangular: false,
            }
        } else {
            Rect {
                tl: a,
                br: Point::new(p.x + 1, p.y),
                rectangular: false,
            }
        }
    }

    /// Finish the drag and materialize the selected text, if any.
    pub fn select_finish(&mut self) -> Option<String> {
        self.cf_ref().selected_text()
    }

    pub fn select_clear(&mut self) {
        let f = self.cf();
        f.selection_mut().clear();
        f.expose();
    }

    pub fn select_rectangular_mode_toggle(&mut self) {
        self.select_rectangular = !self.select_rectangular;
        let f = self.cf();
        if !f.selection().is_null() {
            let flipped = !f.selection().rectangular;
            f.selection_mut().rectangular = flipped;
            f.selection_mut().normalize();
            f.expose();
        }
    }

    /// Paste previously selected text, a convenience over [`paste`].
    pub fn paste_selection(&mut self, text: &str, host: &mut dyn TermHost) -> Result<()> {
        self.paste(text, host)
    }

    // --- shared response helpers --------------------------------------

    fn report_primary_da(&mut self, host: &mut dyn TermHost) {
        // advertise a VT420-class terminal with common extensions
        self.write_pty(host, b"\x1b[?64;1;2;6;9;15;16;17;18;21;22c");
    }
}
