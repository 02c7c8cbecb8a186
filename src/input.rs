//! Key bindings: arrows or vim keys move the cursor, Enter clears, Space boosts.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,
    Activate,
    Boost,
    Pause,
    NewGame,
    Quit,
    None,
}

impl Action {
    /// Cursor movement as (d_row, d_col).
    pub fn cursor_delta(self) -> Option<(isize, isize)> {
        match self {
            Self::CursorLeft => Some((0, -1)),
            Self::CursorRight => Some((0, 1)),
            Self::CursorUp => Some((-1, 0)),
            Self::CursorDown => Some((1, 0)),
            _ => None,
        }
    }
}

/// Map key event to game action. Supports both arrows and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('n' | 'N' | 'r' | 'R') => Action::NewGame,
        KeyCode::Left | KeyCode::Char('h') => Action::CursorLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::CursorRight,
        KeyCode::Up | KeyCode::Char('k') => Action::CursorUp,
        KeyCode::Down | KeyCode::Char('j') => Action::CursorDown,
        KeyCode::Enter | KeyCode::Char('x') => Action::Activate,
        KeyCode::Char(' ') => Action::Boost,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_arrows_and_vim_agree() {
        assert_eq!(key_to_action(key(KeyCode::Left)), Action::CursorLeft);
        assert_eq!(key_to_action(key(KeyCode::Char('h'))), Action::CursorLeft);
        assert_eq!(key_to_action(key(KeyCode::Down)), Action::CursorDown);
        assert_eq!(key_to_action(key(KeyCode::Char('j'))), Action::CursorDown);
    }

    #[test]
    fn test_space_is_boost_and_enter_activates() {
        assert_eq!(key_to_action(key(KeyCode::Char(' '))), Action::Boost);
        assert_eq!(key_to_action(key(KeyCode::Enter)), Action::Activate);
    }

    #[test]
    fn test_ctrl_c_quits_other_ctrl_ignored() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_c), Action::Quit);
        let ctrl_h = KeyEvent::new(KeyCode::Char('h'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_h), Action::None);
    }

    #[test]
    fn test_caps_lock_letters_still_work() {
        let shifted = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::SHIFT);
        assert_eq!(key_to_action(key(KeyCode::Char('P'))), Action::Pause);
        assert_eq!(key_to_action(shifted('N')), Action::NewGame);
        assert_eq!(key_to_action(shifted('Q')), Action::Quit);
        assert_eq!(key_to_action(key(KeyCode::Char('R'))), Action::NewGame);
    }

    #[test]
    fn test_cursor_delta() {
        assert_eq!(Action::CursorUp.cursor_delta(), Some((-1, 0)));
        assert_eq!(Action::Activate.cursor_delta(), None);
    }
}
