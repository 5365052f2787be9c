//! Terminal-independent key identifiers.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// A single key press as seen by the editor and the navigator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Esc,
    Enter,
    Backspace,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Tab,
    /// Shift+Tab
    BackTab,
    /// Control chord, letter lowercased
    Ctrl(char),
}

impl Key {
    /// Translate a crossterm event, dropping releases and keys we never bind.
    pub fn from_event(event: KeyEvent) -> Option<Self> {
        if event.kind == KeyEventKind::Release {
            return None;
        }

        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        let key = match event.code {
            KeyCode::Char(c) if ctrl => Key::Ctrl(c.to_ascii_lowercase()),
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Esc => Key::Esc,
            KeyCode::Enter => Key::Enter,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::BackTab => Key::BackTab,
            KeyCode::Tab if event.modifiers.contains(KeyModifiers::SHIFT) => Key::BackTab,
            KeyCode::Tab => Key::Tab,
            _ => return None,
        };
        Some(key)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Char(' ') => write!(f, "<Space>"),
            Key::Char(c) => write!(f, "{}", c),
            Key::Esc => write!(f, "<Esc>"),
            Key::Enter => write!(f, "<Enter>"),
            Key::Backspace => write!(f, "<BS>"),
            Key::Left => write!(f, "<Left>"),
            Key::Right => write!(f, "<Right>"),
            Key::Up => write!(f, "<Up>"),
            Key::Down => write!(f, "<Down>"),
            Key::Home => write!(f, "<Home>"),
            Key::End => write!(f, "<End>"),
            Key::Tab => write!(f, "<Tab>"),
            Key::BackTab => write!(f, "<S-Tab>"),
            Key::Ctrl(c) => write!(f, "<C-{}>", c),
        }
    }
}
