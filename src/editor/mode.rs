//! Editor mode, pending multi-key commands and the yank register.

use super::buffer::Position;

/// Editor mode, shown in the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    /// Typing inserts text (initial mode)
    #[default]
    Insert,
    /// Keys are motions, operators or mode switches
    Normal,
    /// Character-wise selection
    VisualChar,
    /// Line-wise selection
    VisualLine,
}

impl EditorMode {
    /// Returns the display string for the mode indicator
    pub fn display(&self) -> &'static str {
        match self {
            EditorMode::Insert => "INSERT",
            EditorMode::Normal => "NORMAL",
            EditorMode::VisualChar => "VISUAL",
            EditorMode::VisualLine => "V-LINE",
        }
    }

    pub fn is_visual(&self) -> bool {
        matches!(self, EditorMode::VisualChar | EditorMode::VisualLine)
    }
}

/// First key of a two-key Normal-mode command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingCommand {
    /// `g`, completed by `g`
    Goto,
    /// `d`, completed by `d`
    Delete,
    /// `y`, completed by `y`
    Yank,
}

impl PendingCommand {
    /// The key that started this command
    pub fn prefix(&self) -> char {
        match self {
            PendingCommand::Goto => 'g',
            PendingCommand::Delete => 'd',
            PendingCommand::Yank => 'y',
        }
    }
}

/// The single unnamed register
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Register {
    #[default]
    Empty,
    /// Character-wise text, may contain newlines
    Chars(String),
    /// Whole lines
    Lines(Vec<String>),
}

impl Register {
    pub fn is_empty(&self) -> bool {
        matches!(self, Register::Empty)
    }
}

/// Current visual selection, normalized so that start comes first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Inclusive character range
    Chars { start: Position, end: Position },
    /// Inclusive line range
    Lines { first: usize, last: usize },
}

impl Selection {
    /// Whether line `line` is (at least partly) selected
    pub fn covers_line(&self, line: usize) -> bool {
        match *self {
            Selection::Chars { start, end } => (start.line..=end.line).contains(&line),
            Selection::Lines { first, last } => (first..=last).contains(&line),
        }
    }
}
