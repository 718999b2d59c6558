//! Scrollback accumulation and the paged view.

use super::{new_term, rows};
use crate::{Config, Vterm};

fn term_with_scrollback(cols: usize, rows: usize, save_lines: usize) -> (Vterm, super::TestHost) {
    let config = Config {
        save_lines,
        ..Config::default()
    };
    (Vterm::new(cols, rows, config), super::TestHost::new())
}

#[test]
fn history_grows_with_each_scroll() {
    let (mut term, mut host) = term_with_scrollback(8, 3, 10);
    term.advance_bytes("0\r\n1\r\n2\r\n3\r\n4", &mut host);
    assert_eq!(rows(&term), ["2       ", "3       ", "4       "]);
    assert_eq!(term.frame().history_rows(), 2);
}

#[test]
fn history_caps_at_save_lines() {
    let (mut term, mut host) = term_with_scrollback(8, 2, 3);
    for i in 0..10 {
        term.advance_bytes(format!("{}\r\n", i), &mut host);
    }
    assert_eq!(term.frame().history_rows(), 3);
}

#[test]
fn paging_reveals_history() {
    let (mut term, mut host) = term_with_scrollback(8, 3, 10);
    term.advance_bytes("0\r\n1\r\n2\r\n3\r\n4", &mut host);

    term.page_up();
    assert_eq!(term.frame().view_offset(), 2);
    assert_eq!(rows(&term), ["0       ", "1       ", "2       "]);

    term.page_down();
    assert_eq!(term.frame().view_offset(), 0);
    assert_eq!(rows(&term), ["2       ", "3       ", "4       "]);
}

#[test]
fn wheel_scrolls_by_threes() {
    let (mut term, mut host) = term_with_scrollback(8, 2, 10);
    for i in 0..8 {
        term.advance_bytes(format!("{}\r\n", i), &mut host);
    }
    term.mouse_wheel_up();
    assert_eq!(term.frame().view_offset(), 3);
    term.mouse_wheel_up();
    // clamped at the number of history rows
    assert_eq!(term.frame().view_offset(), 6);
    term.mouse_wheel_down();
    assert_eq!(term.frame().view_offset(), 3);
}

#[test]
fn key_input_snaps_view_to_bottom() {
    let (mut term, mut host) = term_with_scrollback(8, 2, 10);
    for i in 0..6 {
        term.advance_bytes(format!("{}\r\n", i), &mut host);
    }
    term.page_up();
    assert!(term.frame().view_offset() > 0);
    term.key_down(crate::VtKey::Return, crate::VtModifier::empty(), &mut host)
        .unwrap();
    assert_eq!(term.frame().view_offset(), 0);
}

#[test]
fn alternate_screen_has_no_scrollback() {
    let (mut term, mut host) = term_with_scrollback(8, 2, 10);
    term.advance_bytes("\x1b[?1049h", &mut host);
    for i in 0..6 {
        term.advance_bytes(format!("{}\r\n", i), &mut host);
    }
    assert_eq!(term.frame().history_rows(), 0);
    term.advance_bytes("\x1b[?1049l", &mut host);
}

#[test]
fn margined_scroll_feeds_no_history() {
    let (mut term, mut host) = term_with_scrollback(8, 4, 10);
    term.advance_bytes("\x1b[1;2r", &mut host);
    for i in 0..6 {
        term.advance_bytes(format!("{}\r\n", i), &mut host);
    }
    assert_eq!(term.frame().history_rows(), 0);
}

#[test]
fn erase_saved_lines_drops_history() {
    let (mut term, mut host) = term_with_scrollback(8, 2, 10);
    for i in 0..6 {
        term.advance_bytes(format!("{}\r\n", i), &mut host);
    }
    assert!(term.frame().history_rows() > 0);
    term.advance_bytes("\x1b[3J", &mut host);
    assert_eq!(term.frame().history_rows(), 0);
    assert_eq!(term.frame().view_offset(), 0);
}
