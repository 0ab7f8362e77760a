//! Keystroke sources
//!
//! A [`KeySource`] is where keystrokes come from: the real terminal in
//! production, a scripted sequence in tests. The listener only ever sees
//! [`KeyStroke`] values, so handler behavior is independent of the backend.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind, KeyCode, ModifierKeyCode};
use wedge_core::KeyStroke;

/// A blocking-with-timeout stream of keystrokes.
pub trait KeySource: Send {
    /// Wait up to `timeout` for the next keystroke. `Ok(None)` means the
    /// timeout elapsed, or an event arrived that does not map to a key.
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<KeyStroke>>;
}

/// Keystrokes read from the terminal via crossterm.
///
/// Only key-press events are reported. The terminal must already be in raw
/// mode; that is the application's responsibility.
#[derive(Debug, Default)]
pub struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<KeyStroke>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                Ok(key_name(&key).map(KeyStroke::new))
            }
            _ => Ok(None),
        }
    }
}

/// Map a crossterm key event to a `KeyboardEvent.key`-style identifier.
///
/// Printable keys map to the character itself, function keys to `"F{n}"`,
/// named keys to their spelled-out names. Standalone modifier presses map to
/// the four canonical modifier names (terminals only deliver those under the
/// kitty keyboard protocol; without it, modifiers simply never appear, which
/// the default key filter would drop anyway). Keys with no sensible
/// identifier yield `None` and are not dispatched.
pub fn key_name(event: &KeyEvent) -> Option<String> {
    let name = match event.code {
        KeyCode::Char(c) => return Some(c.to_string()),
        KeyCode::F(n) => return Some(format!("F{n}")),
        KeyCode::Enter => "Enter",
        KeyCode::Esc => "Escape",
        KeyCode::Backspace => "Backspace",
        KeyCode::Tab => "Tab",
        KeyCode::Delete => "Delete",
        KeyCode::Insert => "Insert",
        KeyCode::Home => "Home",
        KeyCode::End => "End",
        KeyCode::PageUp => "PageUp",
        KeyCode::PageDown => "PageDown",
        KeyCode::Up => "ArrowUp",
        KeyCode::Down => "ArrowDown",
        KeyCode::Left => "ArrowLeft",
        KeyCode::Right => "ArrowRight",
        KeyCode::Modifier(m) => match m {
            ModifierKeyCode::LeftAlt | ModifierKeyCode::RightAlt => "Alt",
            ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => "Control",
            ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift => "Shift",
            ModifierKeyCode::LeftMeta
            | ModifierKeyCode::RightMeta
            | ModifierKeyCode::LeftSuper
            | ModifierKeyCode::RightSuper => "Meta",
            _ => return None,
        },
        _ => return None,
    };
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn name(code: KeyCode) -> Option<String> {
        key_name(&KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_printable_keys_map_to_themselves() {
        assert_eq!(name(KeyCode::Char('a')).as_deref(), Some("a"));
        assert_eq!(name(KeyCode::Char('%')).as_deref(), Some("%"));
        assert_eq!(name(KeyCode::Char('Z')).as_deref(), Some("Z"));
    }

    #[test]
    fn test_function_keys() {
        assert_eq!(name(KeyCode::F(18)).as_deref(), Some("F18"));
        assert_eq!(name(KeyCode::F(19)).as_deref(), Some("F19"));
    }

    #[test]
    fn test_named_keys() {
        assert_eq!(name(KeyCode::Enter).as_deref(), Some("Enter"));
        assert_eq!(name(KeyCode::Esc).as_deref(), Some("Escape"));
        assert_eq!(name(KeyCode::Up).as_deref(), Some("ArrowUp"));
    }

    #[test]
    fn test_modifier_keys_collapse_left_right() {
        assert_eq!(
            name(KeyCode::Modifier(ModifierKeyCode::LeftShift)).as_deref(),
            Some("Shift")
        );
        assert_eq!(
            name(KeyCode::Modifier(ModifierKeyCode::RightControl)).as_deref(),
            Some("Control")
        );
        assert_eq!(
            name(KeyCode::Modifier(ModifierKeyCode::LeftSuper)).as_deref(),
            Some("Meta")
        );
    }

    #[test]
    fn test_unmappable_keys_yield_none() {
        assert_eq!(name(KeyCode::Null), None);
        assert_eq!(name(KeyCode::CapsLock), None);
        assert_eq!(
            name(KeyCode::Modifier(ModifierKeyCode::IsoLevel3Shift)),
            None
        );
    }
}
