//! Keybinding definitions for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextView,
    PrevView,
    SwitchView(usize),
    MoveUp,
    MoveDown,
    /// Toggle the selected todo.
    Select,
    NewItem,
    DeleteItem,
    OpenHelp,
    Refresh,
    Confirm,
    Cancel,
}

pub fn map_key(event: KeyEvent) -> Option<Action> {
    let KeyEvent { code, modifiers, .. } = event;

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Some(Action::Quit),
            KeyCode::Char('r') => Some(Action::Refresh),
            _ => None,
        };
    }

    match code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('?') => Some(Action::OpenHelp),
        KeyCode::Char('r') => Some(Action::Refresh),
        KeyCode::Char('n') => Some(Action::NewItem),
        KeyCode::Char('d') => Some(Action::DeleteItem),
        KeyCode::Enter => Some(Action::Confirm),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Tab => Some(Action::NextView),
        KeyCode::BackTab => Some(Action::PrevView),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::MoveUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::MoveDown),
        KeyCode::Char(' ') | KeyCode::Char('x') => Some(Action::Select),
        KeyCode::Char(c @ '1'..='9') => Some(Action::SwitchView(c as usize - '1' as usize)),
        _ => None,
    }
}

/// What a key does while a text field has focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextInput {
    Insert(char),
    Backspace,
    Submit,
    Cancel,
    /// Leave the field and handle the key as an [`Action`].
    Escape(Action),
}

pub fn map_text_key(event: KeyEvent) -> Option<TextInput> {
    let KeyEvent { code, modifiers, .. } = event;

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Some(TextInput::Escape(Action::Quit)),
            KeyCode::Char('r') => Some(TextInput::Escape(Action::Refresh)),
            _ => None,
        };
    }

    match code {
        KeyCode::Char(c) => Some(TextInput::Insert(c)),
        KeyCode::Backspace => Some(TextInput::Backspace),
        KeyCode::Enter => Some(TextInput::Submit),
        KeyCode::Esc => Some(TextInput::Cancel),
        KeyCode::Tab => Some(TextInput::Escape(Action::NextView)),
        KeyCode::BackTab => Some(TextInput::Escape(Action::PrevView)),
        KeyCode::Up => Some(TextInput::Escape(Action::MoveUp)),
        KeyCode::Down => Some(TextInput::Escape(Action::MoveDown)),
        _ => None,
    }
}
