//! CSI sequence behavior: cursor addressing, erase and edit commands,
//! margins, modes, SGR, and device reports.

use super::{assert_cursor_pos, new_term, rows};
use crate::cell::{CellAttrs, CursorStyle};
use crate::color::{default_palette, RgbColor};
use crate::Config;

#[test]
fn cursor_addressing_clamps() {
    let (mut term, mut host) = new_term(10, 5);
    term.advance_bytes("\x1b[3;4H", &mut host);
    assert_cursor_pos!(term, 3, 2);
    term.advance_bytes("\x1b[99;99H", &mut host);
    assert_cursor_pos!(term, 9, 4);
    term.advance_bytes("\x1b[H", &mut host);
    assert_cursor_pos!(term, 0, 0);
}

#[test]
fn relative_cursor_motion() {
    let (mut term, mut host) = new_term(10, 5);
    term.advance_bytes("\x1b[3;5H\x1b[2A", &mut host);
    assert_cursor_pos!(term, 4, 0);
    term.advance_bytes("\x1b[3B\x1b[2C\x1b[4D", &mut host);
    assert_cursor_pos!(term, 2, 3);
    // CNL / CPL move to column 0
    term.advance_bytes("\x1b[E", &mut host);
    assert_cursor_pos!(term, 0, 4);
    term.advance_bytes("\x1b[5G\x1b[2F", &mut host);
    assert_cursor_pos!(term, 0, 2);
}

#[test]
fn erase_in_line_variants() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("0123456789\x1b[1;5H\x1b[K", &mut host);
    assert_eq!(rows(&term)[0], "0123      ");
    term.advance_bytes("\x1b[1;10H0123456789\x1b[2;5H\x1b[1K", &mut host);
    assert_eq!(rows(&term)[1], "     6789 ");
    term.advance_bytes("\x1b[2K", &mut host);
    assert_eq!(rows(&term)[1], "          ");
}

#[test]
fn erase_in_display_variants() {
    let (mut term, mut host) = new_term(4, 3);
    let fill = "aaaa\r\nbbbb\r\ncccc";
    let (mut t2, mut h2) = new_term(4, 3);

    let mut term_with = |bytes: &str| {
        term.advance_bytes("\x1b[2J\x1b[H", &mut host);
        term.advance_bytes(fill, &mut host);
        term.advance_bytes(bytes, &mut host);
        rows(&term)
    };

    assert_eq!(term_with("\x1b[2;2H\x1b[J"), ["aaaa", "b   ", "    "]);
    assert_eq!(term_with("\x1b[2;2H\x1b[1J"), ["    ", "  bb", "cccc"]);
    assert_eq!(term_with("\x1b[2J"), ["    ", "    ", "    "]);

    // scrollback erase leaves the screen alone
    t2.advance_bytes(fill, &mut h2);
    t2.advance_bytes("\x1b[3J", &mut h2);
    assert_eq!(rows(&t2), ["aaaa", "bbbb", "cccc"]);
}

#[test]
fn insert_delete_chars() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("0123456789\x1b[1;3H\x1b[2@", &mut host);
    assert_eq!(rows(&term)[0], "01  234567");
    term.advance_bytes("\x1b[4P", &mut host);
    assert_eq!(rows(&term)[0], "014567    ");
    term.advance_bytes("\x1b[2X", &mut host);
    assert_eq!(rows(&term)[0], "01  67    ");
}

#[test]
fn insert_delete_rows_respect_margins() {
    let (mut term, mut host) = new_term(4, 5);
    term.advance_bytes("r0\r\nr1\r\nr2\r\nr3\r\nr4", &mut host);
    // margins rows 2..4 (1-based), cursor to margin top
    term.advance_bytes("\x1b[2;4r\x1b[2;1H\x1b[L", &mut host);
    assert_eq!(rows(&term), ["r0  ", "    ", "r1  ", "r2  ", "r4  "]);
    term.advance_bytes("\x1b[M", &mut host);
    assert_eq!(rows(&term), ["r0  ", "r1  ", "r2  ", "    ", "r4  "]);
}

#[test]
fn scroll_up_down_within_margins() {
    let (mut term, mut host) = new_term(4, 5);
    term.advance_bytes("r0\r\nr1\r\nr2\r\nr3\r\nr4", &mut host);
    term.advance_bytes("\x1b[2;4r\x1b[S", &mut host);
    assert_eq!(rows(&term), ["r0  ", "r2  ", "r3  ", "    ", "r4  "]);
    term.advance_bytes("\x1b[2T", &mut host);
    assert_eq!(rows(&term), ["r0  ", "    ", "    ", "r2  ", "r4  "]);
}

#[test]
fn newline_scrolls_only_inside_margins() {
    let (mut term, mut host) = new_term(4, 4);
    term.advance_bytes("r0\r\nr1\r\nr2\r\nr3", &mut host);
    term.advance_bytes("\x1b[2;3r\x1b[3;1H\n", &mut host);
    // the LF at the margin bottom scrolls rows 2..3 and leaves the rest
    assert_eq!(rows(&term), ["r0  ", "r2  ", "    ", "r3  "]);
    assert_cursor_pos!(term, 0, 2);
}

#[test]
fn reverse_index_scrolls_down_at_top_margin() {
    let (mut term, mut host) = new_term(4, 4);
    term.advance_bytes("r0\r\nr1\r\nr2\r\nr3", &mut host);
    term.advance_bytes("\x1b[2;3r\x1b[2;1H\x1bM", &mut host);
    assert_eq!(rows(&term), ["r0  ", "    ", "r1  ", "r3  "]);
}

#[test]
fn origin_mode_addresses_the_scroll_region() {
    let (mut term, mut host) = new_term(10, 6);
    term.advance_bytes("\x1b[2;4r\x1b[?6h\x1b[1;1H", &mut host);
    assert_cursor_pos!(term, 0, 1);
    term.advance_bytes("X", &mut host);
    assert_eq!(rows(&term)[1], "X         ");
    // addressing past the region clamps to its bottom
    term.advance_bytes("\x1b[99;1H", &mut host);
    assert_cursor_pos!(term, 0, 3);
    // cursor position reports are region-relative too
    term.advance_bytes("\x1b[6n", &mut host);
    assert_eq!(host.take_out(), b"\x1b[3;1R");
}

#[test]
fn sgr_reset_and_palette() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("\x1b[31mA\x1b[0mB", &mut host);
    let pal = default_palette();
    let frame = term.frame();
    assert_eq!(frame.get_cell(0, 0).fg, pal[1]);
    assert_eq!(frame.get_cell(0, 1).fg, Config::default().fg);
}

#[test]
fn sgr_attributes_toggle() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("\x1b[1;3;4;7mA\x1b[22;23mB", &mut host);
    let frame = term.frame();
    let a = frame.get_cell(0, 0).attrs;
    assert!(a.contains(CellAttrs::BOLD | CellAttrs::ITALIC | CellAttrs::UNDERLINE | CellAttrs::INVERSE));
    let b = frame.get_cell(0, 1).attrs;
    assert!(!b.contains(CellAttrs::BOLD));
    assert!(!b.contains(CellAttrs::ITALIC));
    assert!(b.contains(CellAttrs::UNDERLINE | CellAttrs::INVERSE));
}

#[test]
fn sgr_256_and_truecolor() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("\x1b[38;5;196mA\x1b[48;2;1;2;3mB", &mut host);
    let pal = default_palette();
    let frame = term.frame();
    assert_eq!(frame.get_cell(0, 0).fg, pal[196]);
    assert_eq!(frame.get_cell(0, 1).bg, RgbColor::new(1, 2, 3));
}

#[test]
fn bold_brightens_low_palette_colors() {
    let (mut term, mut host) = new_term(10, 3);
    let pal = default_palette();
    term.advance_bytes("\x1b[31;1mA", &mut host);
    assert_eq!(term.frame().get_cell(0, 0).fg, pal[9]);
    // turning bold off drops back to the dim variant
    term.advance_bytes("\x1b[22mB", &mut host);
    assert_eq!(term.frame().get_cell(0, 1).fg, pal[1]);
}

#[test]
fn alt_screen_round_trip() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("primary", &mut host);
    term.advance_bytes("\x1b[?1049h", &mut host);
    assert!(term.on_alt_screen());
    assert_eq!(rows(&term)[0], "          ");
    term.advance_bytes("X", &mut host);
    assert_eq!(rows(&term)[0], "X         ");
    assert_cursor_pos!(term, 1, 0);
    term.advance_bytes("\x1b[?1049l", &mut host);
    assert!(!term.on_alt_screen());
    assert_eq!(rows(&term)[0], "primary   ");
    assert_cursor_pos!(term, 7, 0);
    // the alternate frame is cleared again on the next entry
    term.advance_bytes("\x1b[?1049h", &mut host);
    assert_eq!(rows(&term)[0], "          ");
}

#[test]
fn repeat_last_graphic() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("ab\x1b[3b", &mut host);
    assert_eq!(rows(&term)[0], "abbbb     ");
}

#[test]
fn device_attribute_reports() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("\x1b[c", &mut host);
    assert_eq!(host.take_out(), b"\x1b[?64;1;2;6;9;15;16;17;18;21;22c");
    term.advance_bytes("\x1b[>c", &mut host);
    assert_eq!(host.take_out(), b"\x1b[>41;0;0c");
    term.advance_bytes("\x1b[5n", &mut host);
    assert_eq!(host.take_out(), b"\x1b[0n");
    term.advance_bytes("\x1b[2;5H\x1b[6n", &mut host);
    assert_eq!(host.take_out(), b"\x1b[2;5R");
}

#[test]
fn window_size_reports() {
    let (mut term, mut host) = new_term(80, 24);
    term.advance_bytes("\x1b[18t", &mut host);
    assert_eq!(host.take_out(), b"\x1b[8;24;80t");
    let cfg = Config::default();
    term.advance_bytes("\x1b[14t", &mut host);
    let expect = format!(
        "\x1b[4;{};{}t",
        24 * cfg.glyph_py as usize,
        80 * cfg.glyph_px as usize
    );
    assert_eq!(host.take_out(), expect.as_bytes());
}

#[test]
fn decrqss_reports_current_settings() {
    let (mut term, mut host) = new_term(10, 5);
    term.advance_bytes("\x1b[2;4r", &mut host);
    term.advance_bytes("\x1bP$qr\x1b\\", &mut host);
    assert_eq!(host.take_out(), b"\x1bP1$r2;4r\x1b\\");
    term.advance_bytes("\x1b[1;4m\x1bP$qm\x1b\\", &mut host);
    assert_eq!(host.take_out(), b"\x1bP1$r0;1;4m\x1b\\");
    // an unsupported request is answered as invalid
    term.advance_bytes("\x1bP$qz\x1b\\", &mut host);
    assert_eq!(host.take_out(), b"\x1bP0$r\x1b\\");
}

#[test]
fn cursor_style_sequences() {
    let (mut term, mut host) = new_term(10, 3);
    assert_eq!(term.frame().cursor().style, CursorStyle::Block);
    term.advance_bytes("\x1b[4 q", &mut host);
    assert_eq!(term.frame().cursor().style, CursorStyle::Underline);
    term.advance_bytes("\x1b[6 q", &mut host);
    assert_eq!(term.frame().cursor().style, CursorStyle::Bar);
    term.advance_bytes("\x1bP$q q\x1b\\", &mut host);
    assert_eq!(host.take_out(), b"\x1bP1$r6 q\x1b\\");
}

#[test]
fn soft_reset_keeps_cells() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("keep\x1b[2;3r\x1b[?6h\x1b[!p", &mut host);
    assert_eq!(rows(&term)[0], "keep      ");
    // margins and origin mode are back to power-on defaults
    term.advance_bytes("\x1b[3;1Hz", &mut host);
    assert_eq!(rows(&term)[2], "z         ");
}

#[test]
fn alignment_pattern_fills_screen() {
    let (mut term, mut host) = new_term(4, 2);
    term.advance_bytes("\x1b#8", &mut host);
    assert_eq!(rows(&term), ["EEEE", "EEEE"]);
    super::assert_cursor_pos!(term, 0, 0);
}

#[test]
fn column_mode_requests_resize() {
    let (mut term, mut host) = new_term(80, 24);
    term.advance_bytes("abc\x1b[?3h", &mut host);
    assert_eq!(host.resize_req, Some((132, 24)));
    // the screen is wiped and the cursor homed, per DECCOLM
    assert_eq!(rows(&term)[0], " ".repeat(80));
    assert_cursor_pos!(term, 0, 0);
}

#[test]
fn vt52_mode_basics() {
    let (mut term, mut host) = new_term(10, 5);
    // drop to VT52, draw, move with VT52 escapes
    term.advance_bytes("\x1b[?2l", &mut host);
    term.advance_bytes("ab\x1bY#%x", &mut host); // CUP row 3 col 5
    assert_cursor_pos!(term, 6, 3);
    assert_eq!(rows(&term)[3], "     x    ");
    term.advance_bytes("\x1bZ", &mut host);
    assert_eq!(host.take_out(), b"\x1b/Z");
    // return to ANSI operation
    term.advance_bytes("\x1b<\x1b[1;1HZ", &mut host);
    assert_eq!(rows(&term)[0], "Zb        ");
}

#[test]
fn horizontal_margins_constrain_editing() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("0123456789", &mut host);
    // DECLRMM on, margins columns 3..8 (1-based)
    term.advance_bytes("\x1b[?69h\x1b[3;8s", &mut host);
    super::assert_cursor_pos!(term, 0, 0);
    // CR honors the left margin
    term.advance_bytes("\x1b[1;5H\rX", &mut host);
    assert_eq!(rows(&term)[0], "01X3456789");
    // shift the margin band left by one column
    term.advance_bytes("\x1b[ @", &mut host);
    assert_eq!(rows(&term)[0], "0134567 89");
}
