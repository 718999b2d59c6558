//! The frame: a ring-buffered cell matrix holding the visible screen
//! plus scrollback, with scroll margins, cursor, selection and damage
//! tracking.
//!
//! Storage is a single allocation of `n_cols * (n_rows + save_lines)`
//! cells.  With no custom margins the buffer is addressed as a ring
//! rotated by `scroll_head`, which makes a single-row scroll O(1): the
//! head advances and the recycled row is erased.  Rows above the head
//! (negative logical indices) are the scrollback.  Setting custom
//! margins unwraps the ring into identity layout and scrolls by
//! physically moving rows.

use crate::cell::{Cell, CellFlags, Cursor, CursorStyle};
use crate::selection::{Rect, SelectSnapTo};
use crate::utf8;
use std::sync::Arc;

/// Half-open range of cell indices touched since the last renderer
/// snapshot, in physical buffer coordinates.
#[derive(Debug, Clone, Copy, Default)]
struct Damage {
    start: usize,
    end: usize,
    total: usize,
}

impl Damage {
    fn reset(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    fn expose(&mut self) {
        self.start = 0;
        self.end = self.total;
    }

    fn add(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        if self.start == self.end {
            self.start = start;
            self.end = end;
        } else {
            self.start = self.start.min(start);
            self.end = self.end.max(end);
        }
    }

    fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    /// Update counter, assigned by the renderer handoff on publish.
    pub seq_no: u64,

    pub n_cols: usize,
    pub n_rows: usize,
    pub save_lines: usize,

    /// Buffer row holding the logical top of the scrolling area.
    scroll_head: usize,
    /// Ring region bounds.  Without custom margins these span the whole
    /// buffer; with margins they are the margin rows in visible
    /// coordinates and the storage is kept unwrapped.
    margin_top: usize,
    margin_bottom: usize,
    margins: bool,

    /// Scrollback rows currently holding real content.
    history_rows: usize,
    /// How many rows above the top visible row the view starts.
    view_offset: usize,

    cells: Arc<Vec<Cell>>,
    cursor: Cursor,
    selection: Rect,
    snap_to: SelectSnapTo,
    damage: Damage,
}

impl Frame {
    pub fn new(n_cols: usize, n_rows: usize, save_lines: usize) -> Frame {
        let n_cols = n_cols.max(1);
        let n_rows = n_rows.max(1);
        let total_cells = n_cols * (n_rows + save_lines);
        let mut frame = Frame {
            seq_no: 0,
            n_cols,
            n_rows,
            save_lines,
            scroll_head: 0,
            margin_top: 0,
            margin_bottom: n_rows + save_lines,
            margins: false,
            history_rows: 0,
            view_offset: 0,
            cells: Arc::new(vec![Cell::default(); total_cells]),
            cursor: Cursor::default(),
            selection: Rect::default(),
            snap_to: SelectSnapTo::default(),
            damage: Damage { start: 0, end: 0, total: total_cells },
        };
        frame.damage.expose();
        frame.report_high_mem_usage();
        frame
    }

    fn report_high_mem_usage(&self) {
        let alloc_kb = self.damage.total * std::mem::size_of::<Cell>() / 1024;
        if alloc_kb > 8192 {
            log::info!(
                "allocated {} KiB for cell storage; consider decreasing \
                 save_lines (current value: {}) to reduce memory usage",
                alloc_kb,
                self.save_lines
            );
        }
    }

    #[inline]
    fn total_rows(&self) -> usize {
        self.n_rows + self.save_lines
    }

    /// Translate a logical row to a buffer row.  Logical row 0 is the
    /// top visible row; negative values address scrollback.
    fn phys_row(&self, p_y: isize) -> usize {
        let total = self.total_rows() as isize;
        if self.margins {
            // storage stays unwrapped while custom margins are active;
            // scrollback hangs off the tail of the buffer
            let r = if p_y < 0 { total + p_y } else { p_y };
            debug_assert!((0..total).contains(&r));
            r as usize
        } else {
            let mut r = self.scroll_head as isize + p_y;
            if r < 0 {
                r += total;
            }
            if r >= total {
                r -= total;
            }
            debug_assert!((0..total).contains(&r));
            r as usize
        }
    }

    #[inline]
    fn idx(&self, p_y: usize, p_x: usize) -> usize {
        self.phys_row(p_y as isize) * self.n_cols + p_x
    }

    #[inline]
    fn cells_mut(&mut self) -> &mut [Cell] {
        Arc::make_mut(&mut self.cells).as_mut_slice()
    }

    pub fn get_cell(&self, p_y: usize, p_x: usize) -> &Cell {
        &self.cells[self.idx(p_y, p_x)]
    }

    /// Mutable access to one cell; the position is added to the damage
    /// window.
    pub fn cell_mut(&mut self, p_y: usize, p_x: usize) -> &mut Cell {
        let ix = self.idx(p_y, p_x);
        self.damage.add(ix, ix + 1);
        &mut self.cells_mut()[ix]
    }

    pub fn set_cell(&mut self, p_y: usize, p_x: usize, cell: Cell) {
        *self.cell_mut(p_y, p_x) = cell;
    }

    // --- erase / copy / move primitives -----------------------------

    fn erase_range(&mut self, start: usize, end: usize, fill: &Cell) {
        let blank = Cell::blank_with(fill);
        self.damage.add(start, end);
        for c in &mut self.cells_mut()[start..end] {
            *c = blank;
        }
    }

    /// Erase `count` cells of row `p_y` starting at `start_x`, filling
    /// with the pen's colors.
    pub fn erase_in_row(&mut self, p_y: usize, start_x: usize, count: usize, fill: &Cell) {
        let start_x = start_x.min(self.n_cols);
        let count = count.min(self.n_cols - start_x);
        let base = self.idx(p_y, start_x);
        self.erase_range(base, base + count, fill);
    }

    pub fn erase_row(&mut self, p_y: usize, fill: &Cell) {
        self.erase_in_row(p_y, 0, self.n_cols, fill);
    }

    /// Copy `count` cells at column `start_x` from row `src_y` to the
    /// same columns of row `dst_y`.
    pub fn copy_row(&mut self, dst_y: usize, src_y: usize, start_x: usize, count: usize) {
        if dst_y == src_y || count == 0 {
            return;
        }
        let start_x = start_x.min(self.n_cols);
        let count = count.min(self.n_cols - start_x);
        let src = self.idx(src_y, start_x);
        let dst = self.idx(dst_y, start_x);
        self.damage.add(dst, dst + count);
        let cells = self.cells_mut();
        if src.abs_diff(dst) >= count {
            let (a, b) = if src < dst {
                let (lo, hi) = cells.split_at_mut(dst);
                (&lo[src..src + count], &mut hi[..count])
            } else {
                let (lo, hi) = cells.split_at_mut(src);
                (&hi[..count], &mut lo[dst..dst + count])
            };
            b.copy_from_slice(a);
        } else {
            cells.copy_within(src..src + count, dst);
        }
    }

    /// Move cells within a row; source and destination may overlap.
    pub fn move_in_row(&mut self, p_y: usize, dst_x: usize, src_x: usize, count: usize) {
        if count == 0 || dst_x == src_x {
            return;
        }
        let limit = self.n_cols;
        let count = count.min(limit.saturating_sub(src_x.max(dst_x)));
        if count == 0 {
            return;
        }
        let row = self.idx(p_y, 0);
        self.damage.add(row + dst_x, row + dst_x + count);
        self.cells_mut()
            .copy_within(row + src_x..row + src_x + count, row + dst_x);
    }

    /// Fill the entire visible area with the given code point, as the
    /// alignment pattern generator does.
    pub fn fill_visible(&mut self, code: u16, pen: &Cell) {
        for y in 0..self.n_rows {
            let base = self.idx(y, 0);
            self.damage.add(base, base + self.n_cols);
            let n_cols = self.n_cols;
            let cell = Cell::with_code(pen, code);
            for c in &mut self.cells_mut()[base..base + n_cols] {
                *c = cell;
            }
        }
    }

    /// Erase every cell in the buffer, scrollback included.
    pub fn clear_all(&mut self, fill: &Cell) {
        let total = self.damage.total;
        self.erase_range(0, total, fill);
        self.history_rows = 0;
        self.view_offset = 0;
        self.expose();
    }

    // --- margins & scrolling ----------------------------------------

    pub fn margins_set(&self) -> bool {
        self.margins
    }

    /// Rebuild the buffer in identity layout: visible rows first, then
    /// scrollback at the tail.  No-op when already unwrapped.
    fn unwrap_storage(&mut self) {
        // with margins active the storage is already in identity layout
        if self.margins || self.scroll_head == 0 {
            return;
        }
        let total_cells = self.n_cols * self.total_rows();
        let mut fresh = vec![Cell::default(); total_cells];
        for y in 0..self.n_rows {
            let src = self.phys_row(y as isize) * self.n_cols;
            let dst = y * self.n_cols;
            fresh[dst..dst + self.n_cols].copy_from_slice(&self.cells[src..src + self.n_cols]);
        }
        for k in 1..=self.history_rows {
            let src = self.phys_row(-(k as isize)) * self.n_cols;
            let dst = (self.total_rows() - k) * self.n_cols;
            fresh[dst..dst + self.n_cols].copy_from_slice(&self.cells[src..src + self.n_cols]);
        }
        self.cells = Arc::new(fresh);
        self.scroll_head = 0;
    }

    /// Install custom top/bottom margins (visible row coordinates,
    /// `top < bottom <= n_rows`).
    pub fn set_margins(&mut self, top: usize, bottom: usize) {
        debug_assert!(top < bottom && bottom <= self.n_rows);
        self.unwrap_storage();
        self.margins = true;
        self.margin_top = top;
        self.margin_bottom = bottom;
        self.scroll_head = top;
        self.expose();
    }

    pub fn reset_margins(&mut self) {
        self.unwrap_storage();
        self.margins = false;
        self.margin_top = 0;
        self.margin_bottom = self.total_rows();
        self.scroll_head = 0;
        self.expose();
    }

    /// Scroll the region up by `count` rows.  On the full-screen fast
    /// path this rotates the ring head and, when scrollback is
    /// configured, feeds the recycled rows into history.
    pub fn scroll_up(&mut self, count: usize, fill: &Cell) {
        if count == 0 {
            return;
        }
        if !self.margins {
            let count = count.min(self.n_rows);
            self.scroll_head = (self.scroll_head + count) % self.total_rows();
            self.history_rows = (self.history_rows + count).min(self.save_lines);
            for y in self.n_rows - count..self.n_rows {
                self.erase_row(y, fill);
            }
            if !self.selection.is_null() {
                self.vscroll_selection(-(count as isize));
            }
            self.expose();
        } else {
            let count = count.min(self.margin_bottom - self.margin_top);
            for y in self.margin_top..self.margin_bottom - count {
                self.copy_row(y, y + count, 0, self.n_cols);
            }
            for y in self.margin_bottom - count..self.margin_bottom {
                self.erase_row(y, fill);
            }
        }
    }

    /// Scroll the region down by `count` rows; never produces
    /// scrollback, and on the ring path consumes the newest history
    /// rows (they rotate back into view and are erased).
    pub fn scroll_down(&mut self, count: usize, fill: &Cell) {
        if count == 0 {
            return;
        }
        if !self.margins {
            let count = count.min(self.n_rows);
            let total = self.total_rows();
            self.scroll_head = (self.scroll_head + total - count) % total;
            self.history_rows = self.history_rows.saturating_sub(count);
            for y in 0..count {
                self.erase_row(y, fill);
            }
            if !self.selection.is_null() {
                self.vscroll_selection(count as isize);
            }
            self.expose();
        } else {
            let count = count.min(self.margin_bottom - self.margin_top);
            for y in (self.margin_top + count..self.margin_bottom).rev() {
                self.copy_row(y, y - count, 0, self.n_cols);
            }
            for y in self.margin_top..self.margin_top + count {
                self.erase_row(y, fill);
            }
        }
    }

    // --- scrollback view --------------------------------------------

    pub fn history_rows(&self) -> usize {
        self.history_rows
    }

    pub fn view_offset(&self) -> usize {
        self.view_offset
    }

    pub fn drop_scrollback_history(&mut self) {
        self.view_offset = 0;
        self.history_rows = 0;
        self.expose();
    }

    pub fn page_up(&mut self, count: usize) {
        let prev = self.view_offset;
        self.view_offset = (self.view_offset + count).min(self.history_rows);
        if self.view_offset != prev {
            self.vscroll_selection(self.view_offset as isize - prev as isize);
            self.expose();
        }
    }

    pub fn page_down(&mut self, count: usize) {
        let prev = self.view_offset;
        self.view_offset = self.view_offset.saturating_sub(count);
        if self.view_offset != prev {
            self.vscroll_selection(self.view_offset as isize - prev as isize);
            self.expose();
        }
    }

    pub fn page_to_bottom(&mut self) {
        if self.view_offset != 0 {
            let prev = self.view_offset;
            self.view_offset = 0;
            self.vscroll_selection(-(prev as isize));
            self.expose();
        }
    }

    // --- damage & render copies -------------------------------------

    pub fn expose(&mut self) {
        self.damage.expose();
    }

    pub fn reset_damage(&mut self) {
        self.damage.reset();
    }

    pub fn has_damage(&self) -> bool {
        !self.damage.is_empty()
    }

    /// Merge another frame's unconsumed damage window into ours; used
    /// by the renderer handoff when snapshots are coalesced.
    pub(crate) fn widen_damage(&mut self, other: &Frame) {
        if other.damage.total == self.damage.total {
            self.damage.add(other.damage.start, other.damage.end);
        } else {
            self.damage.expose();
        }
    }

    fn damage_delta_copy(&self, dst: &mut [Cell], start: usize, count: usize) {
        let mut end = start + count;
        if self.damage.end <= start || end <= self.damage.start {
            return; // no intersection
        }
        let mut off = 0;
        let mut start = start;
        if start < self.damage.start {
            off = self.damage.start - start;
            start = self.damage.start;
        }
        if self.damage.end < end {
            end = self.damage.end;
        }
        let src = &self.cells[start..end];
        let dst = &mut dst[off..off + src.len()];
        for (d, s) in dst.iter_mut().zip(src.iter()) {
            if d != s {
                *d = *s;
                d.flags |= CellFlags::DIRTY;
            }
        }
    }

    /// Compare the view against `dst` within the damage window, writing
    /// changed cells with the dirty mark set.  `dst` holds the visible
    /// area in row-major order.
    pub fn delta_copy_cells(&self, dst: &mut [Cell]) {
        debug_assert!(dst.len() >= self.n_cols * self.n_rows);
        let view = self.view_offset as isize;
        for (i, p_y) in (-view..self.n_rows as isize - view).enumerate() {
            let row = self.phys_row(p_y) * self.n_cols;
            self.damage_delta_copy(&mut dst[i * self.n_cols..(i + 1) * self.n_cols], row, self.n_cols);
        }
    }

    /// Unconditional blit of the visible area.
    pub fn full_copy_cells(&self, dst: &mut [Cell]) {
        debug_assert!(dst.len() >= self.n_cols * self.n_rows);
        let view = self.view_offset as isize;
        for (i, p_y) in (-view..self.n_rows as isize - view).enumerate() {
            let row = self.phys_row(p_y) * self.n_cols;
            dst[i * self.n_cols..(i + 1) * self.n_cols]
                .copy_from_slice(&self.cells[row..row + self.n_cols]);
        }
    }

    // --- cursor ------------------------------------------------------

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn set_cursor_pos(&mut self, p_y: usize, p_x: usize) {
        self.cursor.pos_y = p_y.min(self.n_rows.saturating_sub(1));
        self.cursor.pos_x = p_x.min(self.n_cols.saturating_sub(1));
    }

    pub fn set_cursor_style(&mut self, style: CursorStyle) {
        self.cursor.style = style;
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor.visible = visible;
    }

    pub fn set_cursor_color(&mut self, color: crate::color::RgbColor) {
        self.cursor.color = color;
    }

    // --- geometry ----------------------------------------------------

    /// Adopt a new geometry, preserving as much of the visible content
    /// and scrollback as fits.
    pub fn resize(&mut self, n_cols: usize, n_rows: usize) {
        let n_cols = n_cols.max(1);
        let n_rows = n_rows.max(1);
        if n_cols == self.n_cols && n_rows == self.n_rows {
            return;
        }
        let total = n_rows + self.save_lines;
        let mut fresh = vec![Cell::default(); n_cols * total];

        let row_len = self.n_cols.min(n_cols);
        let copy_rows = self.n_rows.min(n_rows);
        for y in 0..copy_rows {
            let src = self.phys_row(y as isize) * self.n_cols;
            let dst = y * n_cols;
            fresh[dst..dst + row_len].copy_from_slice(&self.cells[src..src + row_len]);
        }
        self.history_rows = self.history_rows.min(self.save_lines);
        for k in 1..=self.history_rows {
            let src = self.phys_row(-(k as isize)) * self.n_cols;
            let dst = (total - k) * n_cols;
            fresh[dst..dst + row_len].copy_from_slice(&self.cells[src..src + row_len]);
        }

        self.cells = Arc::new(fresh);
        self.n_cols = n_cols;
        self.n_rows = n_rows;
        self.scroll_head = 0;
        self.margins = false;
        self.margin_top = 0;
        self.margin_bottom = total;
        self.view_offset = 0;
        self.selection.clear();
        self.damage.total = n_cols * total;
        self.damage.expose();
        self.set_cursor_pos(self.cursor.pos_y, self.cursor.pos_x);
        self.report_high_mem_usage();
    }

    // --- selection ----------------------------------------------------

    pub fn selection(&self) -> &Rect {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Rect {
        &mut self.selection
    }

    pub fn set_select_snap(&mut self, snap: SelectSnapTo) {
        self.snap_to = snap;
    }

    pub fn cycle_select_snap(&mut self) {
        self.snap_to = self.snap_to.cycle();
    }

    pub fn select_snap(&self) -> SelectSnapTo {
        self.snap_to
    }

    /// Shift an active selection vertically as the view scrolls so it
    /// stays glued to its text; selections pushed entirely out of the
    /// view are dropped.
    fn vscroll_selection(&mut self, delta: isize) {
        if self.selection.is_null() {
            return;
        }
        self.selection.shift_rows(delta);
        if self.selection.br.y < 0 || self.selection.tl.y >= self.n_rows as isize {
            self.selection.clear();
        }
    }

    fn view_cell(&self, view_y: isize, x: usize) -> &Cell {
        let p_y = view_y - self.view_offset as isize;
        &self.cells[self.phys_row(p_y) * self.n_cols + x]
    }

    /// The selection rect expanded per the current snap setting.
    /// Rectangular selections bypass snapping.
    pub fn snapped_selection(&self) -> Rect {
        let mut ret = self.selection;
        if ret.is_null() || ret.rectangular {
            return ret;
        }

        match self.snap_to {
            SelectSnapTo::Char => {}
            SelectSnapTo::Word => {
                let is_space = |y: isize, x: usize| self.view_cell(y, x).is_blank();

                while ret.tl.x < self.n_cols as isize && is_space(ret.tl.y, ret.tl.x as usize) {
                    ret.tl.x += 1;
                }
                while ret.tl.x > 0 && !is_space(ret.tl.y, ret.tl.x as usize - 1) {
                    ret.tl.x -= 1;
                }

                while ret.br.x > 0
                    && (ret.br.x >= self.n_cols as isize || is_space(ret.br.y, ret.br.x as usize))
                {
                    ret.br.x -= 1;
                }
                while ret.br.x < self.n_cols as isize && !is_space(ret.br.y, ret.br.x as usize) {
                    ret.br.x += 1;
                }
            }
            SelectSnapTo::Line => {
                ret.tl.x = 0;
                ret.br.x = self.n_cols as isize;
            }
        }

        ret
    }

    /// Materialize the snapped selection as UTF-8 text.  Rows join with
    /// a newline, except that soft-wrapped rows join without one;
    /// trailing spaces on hard-ended rows are trimmed, and continuation
    /// halves of wide glyphs are skipped.
    pub fn selected_text(&self) -> Option<String> {
        let sel = self.snapped_selection();
        if sel.is_null() || sel.is_empty() {
            return None;
        }

        let mut lines: Vec<Vec<u16>> = Vec::new();
        let mut wrap = false;

        let mut add_span = |lines: &mut Vec<Vec<u16>>, y: isize, x1: isize, x2: isize| {
            let mut line = Vec::new();
            let wrap_back = wrap;
            wrap = false;
            let x1 = x1.max(0) as usize;
            let x2 = (x2.max(0) as usize).min(self.n_cols);
            for x in x1..x2 {
                let cell = self.view_cell(y, x);
                if !cell.flags.contains(CellFlags::DWIDTH_CONT) {
                    line.push(cell.code);
                }
                if cell.flags.contains(CellFlags::WRAP) {
                    wrap = true;
                    break;
                }
            }
            while !wrap && line.last() == Some(&(b' ' as u16)) {
                line.pop();
            }
            if wrap_back {
                if let Some(last) = lines.last_mut() {
                    last.extend_from_slice(&line);
                    return;
                }
            }
            lines.push(line);
        };

        if sel.tl.y == sel.br.y {
            add_span(&mut lines, sel.tl.y, sel.tl.x, sel.br.x);
        } else if sel.rectangular {
            for y in sel.tl.y..=sel.br.y {
                add_span(&mut lines, y, sel.tl.x, sel.br.x);
            }
        } else {
            add_span(&mut lines, sel.tl.y, sel.tl.x, self.n_cols as isize);
            for y in sel.tl.y + 1..sel.br.y {
                add_span(&mut lines, y, 0, self.n_cols as isize);
            }
            add_span(&mut lines, sel.br.y, 0, sel.br.x);
        }

        let mut out: Vec<u8> = Vec::new();
        for line in &lines {
            for &cp in line {
                utf8::push_unicode(u32::from(cp), &mut |b| out.push(b));
            }
            out.push(b'\n');
        }
        while out.last() == Some(&b'\n') {
            out.pop();
        }

        Some(String::from_utf8_lossy(&out).into_owned())
    }

    // --- inspection ---------------------------------------------------

    /// The text of one view row, continuation cells skipped; intended
    /// for diagnostics and tests.
    pub fn row_text(&self, view_y: usize) -> String {
        let mut s = String::new();
        for x in 0..self.n_cols {
            let cell = self.view_cell(view_y as isize, x);
            if cell.flags.contains(CellFlags::DWIDTH_CONT) {
                continue;
            }
            match cell.code {
                0 => s.push(' '), // missing-glyph marker renders blank
                c => s.push(char::from_u32(u32::from(c)).unwrap_or('\u{fffd}')),
            }
        }
        s
    }
}
