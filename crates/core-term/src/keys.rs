//! Abstract key codes consumed by the engine.
//!
//! The renderer (or the host loop) is responsible for translating whatever
//! byte stream or event stream the terminal produces into these codes; the
//! engine never sees raw escape sequences. Two pseudo-keys (`ScreenSize`,
//! `TelnetSize`) carry size-change notifications through the same channel so
//! the host loop has a single feed point.

use crossterm::event::{
    KeyCode as CKeyCode, KeyEvent as CKeyEvent, KeyEventKind as CKeyEventKind,
    KeyModifiers as CKeyModifiers,
};

/// One abstract keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable character (the engine treats its UTF-8 bytes as columns).
    Char(char),
    /// Ctrl chord on a letter, stored lowercase (`Ctrl('c')` for Ctrl-C).
    Ctrl(char),
    /// Alt chord on a letter, stored lowercase.
    Alt(char),
    AltBackspace,
    Enter,
    Tab,
    Esc,
    Backspace,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    CtrlLeft,
    CtrlRight,
    /// Terminal reported a new size (local resize / SIGWINCH path).
    ScreenSize,
    /// Telnet NAWS option delivered a new size.
    TelnetSize,
}

impl Key {
    /// True for keys that insert themselves into the edit buffer.
    pub fn printable_char(self) -> Option<char> {
        match self {
            Key::Char(c) if c == ' ' || !c.is_control() => Some(c),
            _ => None,
        }
    }
}

/// Map a crossterm key event into an abstract [`Key`].
///
/// Returns `None` for release events and for key codes the engine has no use
/// for (function keys, media keys, bare modifiers).
pub fn map_key_event(event: &CKeyEvent) -> Option<Key> {
    if matches!(event.kind, CKeyEventKind::Release) {
        return None;
    }
    let ctrl = event.modifiers.contains(CKeyModifiers::CONTROL);
    let alt = event.modifiers.contains(CKeyModifiers::ALT);
    let key = match event.code {
        CKeyCode::Char(c) if ctrl => Key::Ctrl(c.to_ascii_lowercase()),
        CKeyCode::Char(c) if alt => Key::Alt(c.to_ascii_lowercase()),
        CKeyCode::Char(c) => Key::Char(c),
        CKeyCode::Enter => Key::Enter,
        CKeyCode::Tab | CKeyCode::BackTab => Key::Tab,
        CKeyCode::Esc => Key::Esc,
        CKeyCode::Backspace if alt => Key::AltBackspace,
        CKeyCode::Backspace => Key::Backspace,
        CKeyCode::Delete => Key::Delete,
        CKeyCode::Up => Key::Up,
        CKeyCode::Down => Key::Down,
        CKeyCode::Left if ctrl => Key::CtrlLeft,
        CKeyCode::Right if ctrl => Key::CtrlRight,
        CKeyCode::Left => Key::Left,
        CKeyCode::Right => Key::Right,
        CKeyCode::Home => Key::Home,
        CKeyCode::End => Key::End,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState as CKeyEventState;

    fn key_event(code: CKeyCode, modifiers: CKeyModifiers) -> CKeyEvent {
        CKeyEvent {
            code,
            modifiers,
            kind: CKeyEventKind::Press,
            state: CKeyEventState::empty(),
        }
    }

    #[test]
    fn maps_plain_char() {
        let ev = key_event(CKeyCode::Char('a'), CKeyModifiers::NONE);
        assert_eq!(map_key_event(&ev), Some(Key::Char('a')));
    }

    #[test]
    fn maps_ctrl_chord_lowercased() {
        let ev = key_event(CKeyCode::Char('R'), CKeyModifiers::CONTROL);
        assert_eq!(map_key_event(&ev), Some(Key::Ctrl('r')));
    }

    #[test]
    fn maps_alt_word_motion() {
        let ev = key_event(CKeyCode::Char('b'), CKeyModifiers::ALT);
        assert_eq!(map_key_event(&ev), Some(Key::Alt('b')));
    }

    #[test]
    fn ctrl_arrow_is_distinct_from_arrow() {
        let plain = key_event(CKeyCode::Left, CKeyModifiers::NONE);
        let chord = key_event(CKeyCode::Left, CKeyModifiers::CONTROL);
        assert_eq!(map_key_event(&plain), Some(Key::Left));
        assert_eq!(map_key_event(&chord), Some(Key::CtrlLeft));
    }

    #[test]
    fn release_events_are_dropped() {
        let ev = CKeyEvent {
            code: CKeyCode::Char('x'),
            modifiers: CKeyModifiers::NONE,
            kind: CKeyEventKind::Release,
            state: CKeyEventState::empty(),
        };
        assert_eq!(map_key_event(&ev), None);
    }

    #[test]
    fn unsupported_keys_return_none() {
        let ev = key_event(CKeyCode::F(5), CKeyModifiers::NONE);
        assert_eq!(map_key_event(&ev), None);
    }

    #[test]
    fn question_mark_is_printable() {
        assert_eq!(Key::Char('?').printable_char(), Some('?'));
        assert_eq!(Key::Char(' ').printable_char(), Some(' '));
        assert_eq!(Key::Ctrl('c').printable_char(), None);
    }
}
