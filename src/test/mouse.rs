//! Mouse tracking modes, wire encodings, focus reporting, and the
//! input side: key encoding modes and bracketed paste.

use super::new_term;
use crate::input::{VtKey, VtModifier};
use crate::vterm::{MouseButton, MouseEvent, MouseEventKind};

fn press(x: usize, y: usize, button: MouseButton) -> MouseEvent {
    MouseEvent {
        kind: MouseEventKind::Press,
        x,
        y,
        button,
        modifiers: VtModifier::empty(),
    }
}

fn release(x: usize, y: usize, button: MouseButton) -> MouseEvent {
    MouseEvent {
        kind: MouseEventKind::Release,
        x,
        y,
        button,
        modifiers: VtModifier::empty(),
    }
}

#[test]
fn sgr_encoding_press_release() {
    let (mut term, mut host) = new_term(80, 24);
    term.advance_bytes("\x1b[?1000h\x1b[?1006h", &mut host);
    term.mouse_event(press(9, 4, MouseButton::Left), &mut host).unwrap();
    assert_eq!(host.take_out(), b"\x1b[<0;10;5M");
    term.mouse_event(release(9, 4, MouseButton::Left), &mut host).unwrap();
    assert_eq!(host.take_out(), b"\x1b[<0;10;5m");
}

#[test]
fn default_encoding_offsets_by_32() {
    let (mut term, mut host) = new_term(80, 24);
    term.advance_bytes("\x1b[?1000h", &mut host);
    term.mouse_event(press(0, 0, MouseButton::Left), &mut host).unwrap();
    assert_eq!(host.take_out(), vec![0x1b, b'[', b'M', 32, 33, 33]);
    term.mouse_event(release(0, 0, MouseButton::Left), &mut host).unwrap();
    assert_eq!(host.take_out(), vec![0x1b, b'[', b'M', 35, 33, 33]);
}

#[test]
fn urxvt_encoding() {
    let (mut term, mut host) = new_term(80, 24);
    term.advance_bytes("\x1b[?1000h\x1b[?1015h", &mut host);
    term.mouse_event(press(0, 0, MouseButton::Middle), &mut host).unwrap();
    assert_eq!(host.take_out(), b"\x1b[33;1;1M");
}

#[test]
fn utf8_encoding_expands_large_coordinates() {
    let (mut term, mut host) = new_term(210, 24);
    term.advance_bytes("\x1b[?1000h\x1b[?1005h", &mut host);
    term.mouse_event(press(200, 0, MouseButton::Left), &mut host).unwrap();
    // column 201 + 32 = 233 travels as a two-byte UTF-8 sequence
    let mut expect = vec![0x1b, b'[', b'M', 32];
    expect.extend_from_slice("é".as_bytes()); // U+00E9 = 233
    expect.push(33);
    assert_eq!(host.take_out(), expect);
}

#[test]
fn wheel_buttons_report_64_65() {
    let (mut term, mut host) = new_term(80, 24);
    term.advance_bytes("\x1b[?1000h\x1b[?1006h", &mut host);
    term.mouse_event(press(0, 0, MouseButton::WheelUp), &mut host).unwrap();
    term.mouse_event(press(0, 0, MouseButton::WheelDown), &mut host).unwrap();
    assert_eq!(host.take_out(), b"\x1b[<64;1;1M\x1b[<65;1;1M");
}

#[test]
fn modifiers_add_to_button_code() {
    let (mut term, mut host) = new_term(80, 24);
    term.advance_bytes("\x1b[?1000h\x1b[?1006h", &mut host);
    let mut ev = press(0, 0, MouseButton::Left);
    ev.modifiers = VtModifier::SHIFT | VtModifier::CONTROL;
    term.mouse_event(ev, &mut host).unwrap();
    assert_eq!(host.take_out(), b"\x1b[<20;1;1M");
}

#[test]
fn x10_mode_reports_only_presses() {
    let (mut term, mut host) = new_term(80, 24);
    term.advance_bytes("\x1b[?9h", &mut host);
    let mut ev = press(1, 1, MouseButton::Left);
    ev.modifiers = VtModifier::CONTROL; // X10 reporting has no modifiers
    term.mouse_event(ev, &mut host).unwrap();
    assert_eq!(host.take_out(), vec![0x1b, b'[', b'M', 32, 34, 34]);
    term.mouse_event(release(1, 1, MouseButton::Left), &mut host).unwrap();
    assert!(host.take_out().is_empty());
}

#[test]
fn motion_reported_per_mode() {
    let (mut term, mut host) = new_term(80, 24);
    term.advance_bytes("\x1b[?1002h\x1b[?1006h", &mut host);
    let motion = MouseEvent {
        kind: MouseEventKind::Move,
        x: 3,
        y: 3,
        button: MouseButton::None,
        modifiers: VtModifier::empty(),
    };
    // button-event tracking: no report without a held button
    term.mouse_event(motion, &mut host).unwrap();
    assert!(host.take_out().is_empty());
    term.mouse_event(press(2, 2, MouseButton::Left), &mut host).unwrap();
    host.take_out();
    term.mouse_event(motion, &mut host).unwrap();
    assert_eq!(host.take_out(), b"\x1b[<32;4;4M");
    // any-event tracking reports unpressed motion too
    term.mouse_event(release(3, 3, MouseButton::Left), &mut host).unwrap();
    term.advance_bytes("\x1b[?1003h", &mut host);
    host.take_out();
    term.mouse_event(motion, &mut host).unwrap();
    assert_eq!(host.take_out(), b"\x1b[<35;4;4M");
}

#[test]
fn focus_events() {
    let (mut term, mut host) = new_term(80, 24);
    term.set_has_focus(true, &mut host);
    assert!(host.take_out().is_empty());
    term.advance_bytes("\x1b[?1004h", &mut host);
    term.set_has_focus(true, &mut host);
    assert_eq!(host.take_out(), b"\x1b[I");
    term.set_has_focus(false, &mut host);
    assert_eq!(host.take_out(), b"\x1b[O");
}

#[test]
fn cursor_key_mode_switches_encoding() {
    let (mut term, mut host) = new_term(80, 24);
    term.key_down(VtKey::Up, VtModifier::empty(), &mut host).unwrap();
    assert_eq!(host.take_out(), b"\x1b[A");
    term.advance_bytes("\x1b[?1h", &mut host);
    term.key_down(VtKey::Up, VtModifier::empty(), &mut host).unwrap();
    assert_eq!(host.take_out(), b"\x1bOA");
}

#[test]
fn keypad_application_mode_via_escape() {
    let (mut term, mut host) = new_term(80, 24);
    term.advance_bytes("\x1b=", &mut host);
    term.key_down(VtKey::Kp0, VtModifier::empty(), &mut host).unwrap();
    assert_eq!(host.take_out(), b"\x1bOp");
    term.advance_bytes("\x1b>", &mut host);
    term.key_down(VtKey::Kp0, VtModifier::empty(), &mut host).unwrap();
    assert_eq!(host.take_out(), b"0");
}

#[test]
fn bracketed_paste_frames_content() {
    let (mut term, mut host) = new_term(80, 24);
    term.paste("plain\n", &mut host).unwrap();
    assert_eq!(host.take_out(), b"plain\r");
    term.advance_bytes("\x1b[?2004h", &mut host);
    term.paste("two\nlines", &mut host).unwrap();
    assert_eq!(host.take_out(), b"\x1b[200~two\rlines\x1b[201~");
}

#[test]
fn keyboard_lock_suppresses_input() {
    let (mut term, mut host) = new_term(80, 24);
    term.advance_bytes("\x1b[2h", &mut host);
    term.key_down(VtKey::Return, VtModifier::empty(), &mut host).unwrap();
    term.send_char('x', VtModifier::empty(), &mut host).unwrap();
    assert!(host.take_out().is_empty());
    term.advance_bytes("\x1b[2l", &mut host);
    term.send_char('x', VtModifier::empty(), &mut host).unwrap();
    assert_eq!(host.take_out(), b"x");
}

#[test]
fn modify_other_keys_via_xtmodkeys() {
    let (mut term, mut host) = new_term(80, 24);
    term.advance_bytes("\x1b[>4;2m", &mut host);
    term.send_char('c', VtModifier::CONTROL, &mut host).unwrap();
    assert_eq!(host.take_out(), b"\x1b[27;5;99~");
    term.advance_bytes("\x1b[>4;0m", &mut host);
    term.send_char('c', VtModifier::CONTROL, &mut host).unwrap();
    assert_eq!(host.take_out(), b"\x03");
}
