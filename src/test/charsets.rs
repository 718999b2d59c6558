//! Character set designation, shifts, and translation in the stream.

use super::{new_term, rows};
use k9::assert_equal;

#[test]
fn dec_line_drawing_via_g0() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("\x1b(0lqk\x1b(B", &mut host);
    assert_equal!(rows(&term)[0], "┌─┐       ");
    term.advance_bytes("x", &mut host);
    assert_equal!(rows(&term)[0], "┌─┐x      ");
}

#[test]
fn shift_out_invokes_g1() {
    let (mut term, mut host) = new_term(10, 3);
    // designate line drawing into G1 and toggle with SO / SI
    term.advance_bytes("\x1b)0a\x0eq\x0fa", &mut host);
    assert_eq!(rows(&term)[0], "a─a       ");
}

#[test]
fn single_shift_applies_to_one_character() {
    let (mut term, mut host) = new_term(10, 3);
    // G2 holds line drawing; SS2 borrows it for a single character
    term.advance_bytes("\x1b*0a\x1bNqq", &mut host);
    assert_eq!(rows(&term)[0], "a─q       ");
}

#[test]
fn uk_charset_remaps_hash() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("\x1b(A#a\x1b(B#", &mut host);
    assert_eq!(rows(&term)[0], "£a#       ");
}

#[test]
fn charset_state_survives_dec_cursor_save() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("a\x1b7\x1b(0\x1b8q", &mut host);
    // DECRC rewinds both the cursor and the charset designations
    assert_eq!(rows(&term)[0], "aq        ");
}

#[test]
fn vt52_graphics_mode() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("\x1b[?2l\x1bFq\x1bGq", &mut host);
    assert_eq!(rows(&term)[0], "─q        ");
}

#[test]
fn reset_restores_default_charsets() {
    let (mut term, mut host) = new_term(10, 3);
    term.advance_bytes("\x1b(0q", &mut host);
    assert_eq!(rows(&term)[0], "─         ");
    term.advance_bytes("\x1bcq", &mut host);
    assert_eq!(rows(&term)[0], "q         ");
}
