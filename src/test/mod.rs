//! Scenario tests for the terminal model and escape sequence
//! processing routines.

use crate::cell::CellFlags;
use crate::{Config, TermHost, Vterm};

mod charsets;
mod csi;
mod mouse;
mod scrollback;

/// A host that records everything the terminal asks of it.
#[derive(Default)]
pub struct TestHost {
    pub out: Vec<u8>,
    pub title: String,
    pub bells: usize,
    pub clip: Option<String>,
    pub resize_req: Option<(usize, usize)>,
    pub oscs: Vec<(u32, String)>,
}

impl TestHost {
    pub fn new() -> TestHost {
        TestHost::default()
    }

    /// Drain and return the response bytes written so far.
    pub fn take_out(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out)
    }
}

impl TermHost for TestHost {
    fn writer(&mut self) -> &mut dyn std::io::Write {
        &mut self.out
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.into();
    }

    fn bell(&mut self) {
        self.bells += 1;
    }

    fn set_clipboard(&mut self, clip: Option<String>) {
        self.clip = clip;
    }

    fn get_clipboard(&mut self) -> anyhow::Result<String> {
        self.clip
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no clipboard"))
    }

    fn resize_request(&mut self, cols: usize, rows: usize) {
        self.resize_req = Some((cols, rows));
    }

    fn osc_event(&mut self, cmd: u32, arg: &str) {
        self.oscs.push((cmd, arg.to_string()));
    }
}

pub fn new_term(cols: usize, rows: usize) -> (Vterm, TestHost) {
    let _ = env_logger::builder().is_test(true).try_init();
    (Vterm::new(cols, rows, Config::default()), TestHost::new())
}

/// The visible rows as text, trailing blanks included.
pub fn rows(term: &Vterm) -> Vec<String> {
    let frame = term.frame();
    (0..frame.n_rows).map(|y| frame.row_text(y)).collect()
}

macro_rules! assert_cursor_pos {
    ($term:expr, $x:expr, $y:expr) => {{
        let (x, y) = $term.cursor_pos();
        assert_eq!(
            (x, y),
            ($x, $y),
            "actual cursor (left) didn't match expected cursor (right)"
        );
    }};
}
pub(crate) use assert_cursor_pos;

#[test]
fn basic_echo() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("hello\r\n", &mut host);
    assert_eq!(rows(&term), ["hello     ", "          ", "          "]);
    assert_cursor_pos!(term, 0, 1);
}

#[test]
fn line_wrap_with_autowrap() {
    let (mut term, mut host) = new_term(5, 3);
    term.advance_bytes("abcdef", &mut host);
    assert_eq!(rows(&term), ["abcde", "f    ", "     "]);
    assert!(term.frame().get_cell(0, 4).flags.contains(CellFlags::WRAP));
    assert_cursor_pos!(term, 1, 1);
}

#[test]
fn autowrap_off_overwrites_last_column() {
    let (mut term, mut host) = new_term(5, 3);
    term.advance_bytes("\x1b[?7labcdef", &mut host);
    assert_eq!(rows(&term), ["abcdf", "     ", "     "]);
    assert!(!term.frame().get_cell(0, 4).flags.contains(CellFlags::WRAP));
    assert_cursor_pos!(term, 4, 0);
}

#[test]
fn carriage_return_and_backspace() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("abc\rX", &mut host);
    assert_eq!(rows(&term)[0], "Xbc       ");
    term.advance_bytes("\x08\x08Y", &mut host);
    // BS stops at column 0
    assert_eq!(rows(&term)[0], "Ybc       ");
}

#[test]
fn horizontal_tab_stops() {
    let (mut term, mut host) = new_term(20, 3);
    term.advance_bytes("\tx", &mut host);
    assert_cursor_pos!(term, 9, 0);
    // HTS at the current column, then return and tab to it
    term.advance_bytes("\x1b[5G\x1bH\r\ty", &mut host);
    assert_cursor_pos!(term, 5, 0);
    // clearing all stops tabs to the right edge
    term.advance_bytes("\x1b[3g\r\t", &mut host);
    assert_cursor_pos!(term, 19, 0);
}

#[test]
fn bell_reaches_host() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("a\x07b\x07", &mut host);
    assert_eq!(host.bells, 2);
    assert_eq!(rows(&term)[0], "ab        ");
}

#[test]
fn title_osc() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("\x1b]0;hello title\x07", &mut host);
    assert_eq!(host.title, "hello title");
    term.advance_bytes("\x1b]2;another\x1b\\", &mut host);
    assert_eq!(host.title, "another");
}

#[test]
fn utf8_text_lands_in_cells() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("héllo €1".as_bytes(), &mut host);
    assert_eq!(rows(&term)[0], "héllo €1  ");
}

#[test]
fn malformed_utf8_is_replaced() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes(&[b'a', 0xc0, 0xaf, b'b'], &mut host);
    assert_eq!(rows(&term)[0], "a\u{fffd}b       ");
}

#[test]
fn non_bmp_replaced_but_double_width_preserved() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("🙂".as_bytes(), &mut host);
    let frame = term.frame();
    assert_eq!(frame.get_cell(0, 0).code, 0xfffd);
    assert!(frame.get_cell(0, 0).flags.contains(CellFlags::DWIDTH));
    assert!(frame.get_cell(0, 1).flags.contains(CellFlags::DWIDTH_CONT));
    assert_cursor_pos!(term, 2, 0);
}

#[test]
fn double_width_at_last_column_is_suppressed() {
    let (mut term, mut host) = new_term(4, 2);
    term.advance_bytes("abc語".as_bytes(), &mut host);
    let frame = term.frame();
    // no continuation cell fits, so the wide flag is not set
    assert!(!frame.get_cell(0, 3).flags.contains(CellFlags::DWIDTH));
    assert_eq!(frame.get_cell(0, 3).code, 0x8a9e);
}

#[test]
fn unknown_sequences_are_swallowed() {
    let (mut term, mut host) = new_term(10, 3);
    // an unsupported intermediate leads to IgnoreSequence; the final
    // byte ends it and printing resumes
    term.advance_bytes("a\x1b[12$wb", &mut host);
    assert_eq!(rows(&term)[0], "ab        ");
    assert!(host.take_out().is_empty());
}

#[test]
fn unknown_osc_forwards_to_host() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("\x1b]777;notify;hi\x07", &mut host);
    assert_eq!(host.oscs, [(777, "notify;hi".to_string())]);
}

#[test]
fn clipboard_osc52_round_trip() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("\x1b]52;c;aGVsbG8=\x07", &mut host);
    assert_eq!(host.clip.as_deref(), Some("aGVsbG8="));
    term.advance_bytes("\x1b]52;c;?\x07", &mut host);
    assert_eq!(host.take_out(), b"\x1b]52;c;aGVsbG8=\x07");
}

#[test]
fn palette_set_query_reset() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("\x1b]4;17;rgb:12/34/56\x07", &mut host);
    term.advance_bytes("\x1b[38;5;17mA", &mut host);
    assert_eq!(
        term.frame().get_cell(0, 0).fg,
        crate::RgbColor::new(0x12, 0x34, 0x56)
    );
    term.advance_bytes("\x1b]4;17;?\x07", &mut host);
    assert_eq!(host.take_out(), b"\x1b]4;17;rgb:1212/3434/5656\x07");
    term.advance_bytes("\x1b]104\x07\x1b]4;17;?\x07", &mut host);
    let pal = crate::color::default_palette();
    let expect = format!("\x1b]4;17;{}\x07", pal[17].to_x11_string());
    assert_eq!(host.take_out(), expect.as_bytes());
}

#[test]
fn dynamic_default_colors() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("\x1b]10;?\x07", &mut host);
    assert_eq!(host.take_out(), b"\x1b]10;rgb:bbbb/bbbb/bbbb\x07");
    term.advance_bytes("\x1b]11;#102030\x07\x1b]11;?\x07", &mut host);
    assert_eq!(host.take_out(), b"\x1b]11;rgb:1010/2020/3030\x07");
    term.advance_bytes("\x1b]111\x07\x1b]11;?\x07", &mut host);
    assert_eq!(host.take_out(), b"\x1b]11;rgb:0000/0000/0000\x07");
}

#[test]
fn insert_mode_shifts_row() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("abc\r\x1b[4hX\x1b[4l", &mut host);
    assert_eq!(rows(&term)[0], "Xabc      ");
}

#[test]
fn local_echo_renders_caret_notation() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("\x1b[12l", &mut host); // SRM reset: echo on
    term.send_char('h', crate::VtModifier::empty(), &mut host).unwrap();
    term.send_char('c', crate::VtModifier::CONTROL, &mut host).unwrap();
    assert_eq!(host.take_out(), b"h\x03");
    assert_eq!(rows(&term)[0], "h^C       ");
}

#[test]
fn resize_preserves_content() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("one\r\ntwo", &mut host);
    term.resize(8, 4);
    assert_eq!(rows(&term), ["one     ", "two     ", "        ", "        "]);
    assert_cursor_pos!(term, 3, 1);
}

#[test]
fn hard_reset_clears_everything() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("x\x1b[31m\x1b[2;3r\x1b[?6h", &mut host);
    term.advance_bytes("\x1bc", &mut host);
    assert_eq!(rows(&term), ["          ", "          ", "          "]);
    assert_cursor_pos!(term, 0, 0);
    // margins gone: a CUP to the last row must land there
    term.advance_bytes("\x1b[3;1Hz", &mut host);
    assert_eq!(rows(&term)[2], "z         ");
}
