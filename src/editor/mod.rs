//! VIM-style modal line editor used for query input.
//!
//! [`ModalEditor`] consumes one [`Key`] at a time and mutates its buffer,
//! cursor, mode and register. It has no timers: a pending two-key command
//! (`gg`, `dd`, `yy`) is resolved purely by the next key, and a key that does
//! not complete it is handled as a fresh key.
//!
//! # Modes
//!
//! | Mode | Keys |
//! |------|------|
//! | Insert | text, `Enter` splits, `Backspace`, arrows, `Esc` → Normal |
//! | Normal | `h j k l w b 0 $ gg G`, `x dd yy p P`, `i I a A o O v V`, `Enter` commits |
//! | Visual | motions extend the selection, `y d x` operate on it, `Esc` → Normal |
//!
//! Pasted text is inserted literally in any mode. An image paste only marks
//! OCR as pending; keys are ignored until [`ModalEditor::finish_ocr`] is called.

mod buffer;
mod history;
mod key;
mod mode;

pub use buffer::{EditorBuffer, Position};
pub use history::InputHistory;
pub use key::Key;
pub use mode::{EditorMode, PendingCommand, Register, Selection};

use crate::utils::normalize_text;

/// Why a key or paste was not acted on. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// Key has no binding in the current mode
    #[error("{key} is not bound in {mode} mode")]
    Unbound { key: Key, mode: &'static str },

    /// Keys are ignored until OCR completes
    #[error("waiting for OCR to finish")]
    OcrPending,

    /// Only one OCR request may run at a time
    #[error("an image is already being recognized")]
    OcrBusy,

    /// Paste with nothing in the register
    #[error("nothing to paste")]
    EmptyRegister,
}

/// Result of feeding one key to the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// State changed (or a motion ran)
    Handled,
    /// First key of a two-key command, waiting for the second
    Pending(PendingCommand),
    /// Normal-mode `Enter`: the buffer, joined onto one normalized line
    Commit(String),
    /// Nothing happened
    Ignored(InputError),
}

/// Modal editor state
#[derive(Debug, Clone, Default)]
pub struct ModalEditor {
    buffer: EditorBuffer,
    mode: EditorMode,
    pending: Option<PendingCommand>,
    register: Register,
    anchor: Position,
    ocr_pending: bool,
}

impl ModalEditor {
    /// Empty buffer in Insert mode
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &EditorBuffer {
        &self.buffer
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn pending(&self) -> Option<PendingCommand> {
        self.pending
    }

    pub fn register(&self) -> &Register {
        &self.register
    }

    pub fn cursor(&self) -> Position {
        self.buffer.cursor()
    }

    pub fn is_ocr_pending(&self) -> bool {
        self.ocr_pending
    }

    /// Buffer text as it would be committed
    pub fn committed_text(&self) -> String {
        normalize_text(&self.buffer.text())
    }

    /// Clear the buffer and return to Insert mode; the register survives
    pub fn reset(&mut self) {
        self.buffer = EditorBuffer::new();
        self.mode = EditorMode::Insert;
        self.pending = None;
        self.anchor = Position::default();
        self.ocr_pending = false;
    }

    /// Replace the buffer content (history recall), cursor at the end
    pub fn set_text(&mut self, text: &str) {
        self.buffer.replace_text(text);
        self.pending = None;
        if self.mode != EditorMode::Insert {
            self.mode = EditorMode::Normal;
            self.buffer.clamp_to_char();
        }
    }

    /// Current selection in visual modes
    pub fn selection(&self) -> Option<Selection> {
        let cursor = self.buffer.cursor();
        let (start, end) = if self.anchor <= cursor {
            (self.anchor, cursor)
        } else {
            (cursor, self.anchor)
        };
        match self.mode {
            EditorMode::VisualChar => Some(Selection::Chars { start, end }),
            EditorMode::VisualLine => Some(Selection::Lines {
                first: start.line,
                last: end.line,
            }),
            _ => None,
        }
    }

    /// Insert pasted text at the cursor, mode unchanged
    pub fn paste_text(&mut self, text: &str) -> KeyOutcome {
        if self.ocr_pending {
            return KeyOutcome::Ignored(InputError::OcrPending);
        }
        self.pending = None;
        if self.mode.is_visual() {
            self.mode = EditorMode::Normal;
        }
        self.buffer.insert_text(text);
        if self.mode == EditorMode::Normal {
            self.buffer.clamp_to_char();
        }
        KeyOutcome::Handled
    }

    /// Mark an image paste as waiting for OCR
    pub fn begin_ocr(&mut self) -> Result<(), InputError> {
        if self.ocr_pending {
            return Err(InputError::OcrBusy);
        }
        self.ocr_pending = true;
        self.pending = None;
        Ok(())
    }

    /// Deliver the OCR result; `None` when recognition failed.
    ///
    /// Recognized text is normalized and inserted as if typed. Returns
    /// whether anything was inserted.
    pub fn finish_ocr(&mut self, text: Option<&str>) -> bool {
        self.ocr_pending = false;
        let Some(text) = text.map(normalize_text).filter(|t| !t.is_empty()) else {
            return false;
        };
        self.paste_text(&text);
        true
    }

    /// Feed one key
    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        if self.ocr_pending {
            tracing::debug!("Ignoring {} while OCR is pending", key);
            return KeyOutcome::Ignored(InputError::OcrPending);
        }

        let outcome = match self.mode {
            EditorMode::Insert => self.insert_key(key),
            EditorMode::Normal => self.normal_key(key),
            EditorMode::VisualChar | EditorMode::VisualLine => self.visual_key(key),
        };
        tracing::trace!("{} in {} -> {:?}", key, self.mode.display(), outcome);
        outcome
    }

    fn unbound(&self, key: Key) -> KeyOutcome {
        KeyOutcome::Ignored(InputError::Unbound {
            key,
            mode: self.mode.display(),
        })
    }

    fn set_mode(&mut self, mode: EditorMode) {
        tracing::debug!("Editor mode {} -> {}", self.mode.display(), mode.display());
        self.mode = mode;
        if mode != EditorMode::Insert {
            self.buffer.clamp_to_char();
        }
    }

    fn insert_key(&mut self, key: Key) -> KeyOutcome {
        let Position { line, col } = self.buffer.cursor();
        match key {
            Key::Char(c) => self.buffer.insert_char(c),
            Key::Enter => self.buffer.split_line(),
            Key::Backspace => self.buffer.backspace(),
            Key::Esc => self.set_mode(EditorMode::Normal),
            Key::Left => self.buffer.set_cursor(line, col.saturating_sub(1)),
            Key::Right => self.buffer.set_cursor(line, col + 1),
            Key::Up => self.buffer.set_cursor(line.saturating_sub(1), col),
            Key::Down => self.buffer.set_cursor(line + 1, col),
            Key::Home => self.buffer.set_cursor(line, 0),
            Key::End => self.buffer.set_cursor(line, usize::MAX),
            _ => return self.unbound(key),
        }
        KeyOutcome::Handled
    }

    /// Motions shared by Normal and Visual modes; `None` if `key` is not one
    fn motion(&mut self, key: Key) -> Option<KeyOutcome> {
        let cursor = self.buffer.cursor();
        let Position { line, col } = cursor;
        match key {
            Key::Char('h') | Key::Left | Key::Backspace => {
                self.buffer.set_cursor(line, col.saturating_sub(1))
            }
            Key::Char('l') | Key::Right => self.buffer.set_cursor(line, col + 1),
            Key::Char('k') | Key::Up => self.buffer.set_cursor(line.saturating_sub(1), col),
            Key::Char('j') | Key::Down => self.buffer.set_cursor(line + 1, col),
            Key::Char('0') | Key::Home => self.buffer.set_cursor(line, 0),
            Key::Char('$') | Key::End => self.buffer.set_cursor(line, usize::MAX),
            Key::Char('w') => {
                let next = self.buffer.next_word_start(cursor);
                self.buffer.set_cursor(next.line, next.col);
            }
            Key::Char('b') => {
                let prev = self.buffer.prev_word_start(cursor);
                self.buffer.set_cursor(prev.line, prev.col);
            }
            Key::Char('G') => {
                let end = self.buffer.end_position();
                self.buffer.set_cursor(end.line, end.col);
            }
            Key::Char('g') => {
                self.pending = Some(PendingCommand::Goto);
                return Some(KeyOutcome::Pending(PendingCommand::Goto));
            }
            _ => return None,
        }
        self.buffer.clamp_to_char();
        Some(KeyOutcome::Handled)
    }

    /// Complete a pending command. `None` means `key` did not complete it and
    /// must be handled as a fresh key.
    fn resolve_pending(&mut self, pending: PendingCommand, key: Key) -> Option<KeyOutcome> {
        match (pending, key) {
            (PendingCommand::Goto, Key::Char('g')) => {
                self.buffer.set_cursor(0, 0);
                Some(KeyOutcome::Handled)
            }
            (PendingCommand::Delete, Key::Char('d')) if self.mode == EditorMode::Normal => {
                let line = self.buffer.delete_line();
                self.register = Register::Lines(vec![line]);
                Some(KeyOutcome::Handled)
            }
            (PendingCommand::Yank, Key::Char('y')) if self.mode == EditorMode::Normal => {
                let line = self.buffer.line(self.buffer.cursor().line).to_string();
                self.register = Register::Lines(vec![line]);
                Some(KeyOutcome::Handled)
            }
            _ => {
                tracing::debug!("{} cancels pending {}", key, pending.prefix());
                None
            }
        }
    }

    fn normal_key(&mut self, key: Key) -> KeyOutcome {
        if let Some(pending) = self.pending.take() {
            if let Some(outcome) = self.resolve_pending(pending, key) {
                return outcome;
            }
        }

        if let Some(outcome) = self.motion(key) {
            return outcome;
        }

        let Position { line, col } = self.buffer.cursor();
        match key {
            Key::Char('i') => self.set_mode(EditorMode::Insert),
            Key::Char('I') => {
                self.set_mode(EditorMode::Insert);
                self.buffer.set_cursor(line, 0);
            }
            Key::Char('a') => {
                self.set_mode(EditorMode::Insert);
                let len = self.buffer.line_len(line);
                self.buffer.set_cursor(line, (col + 1).min(len));
            }
            Key::Char('A') => {
                self.set_mode(EditorMode::Insert);
                self.buffer.set_cursor(line, usize::MAX);
            }
            Key::Char('o') => {
                self.set_mode(EditorMode::Insert);
                self.buffer.open_line_below();
            }
            Key::Char('O') => {
                self.set_mode(EditorMode::Insert);
                self.buffer.open_line_above();
            }
            Key::Char('v') => {
                self.anchor = self.buffer.cursor();
                self.set_mode(EditorMode::VisualChar);
            }
            Key::Char('V') => {
                self.anchor = self.buffer.cursor();
                self.set_mode(EditorMode::VisualLine);
            }
            Key::Char('d') => {
                self.pending = Some(PendingCommand::Delete);
                return KeyOutcome::Pending(PendingCommand::Delete);
            }
            Key::Char('y') => {
                self.pending = Some(PendingCommand::Yank);
                return KeyOutcome::Pending(PendingCommand::Yank);
            }
            Key::Char('x') => self.delete_char(),
            Key::Char('p') => return self.put(true),
            Key::Char('P') => return self.put(false),
            Key::Enter => return KeyOutcome::Commit(self.committed_text()),
            Key::Esc => {}
            _ => return self.unbound(key),
        }
        KeyOutcome::Handled
    }

    /// Normal-mode `x`; an empty line is left alone
    fn delete_char(&mut self) {
        let cursor = self.buffer.cursor();
        if self.buffer.char_at(cursor).is_none() {
            return;
        }
        self.register = Register::Chars(self.buffer.delete_range(cursor, cursor));
        self.buffer.clamp_to_char();
    }

    fn put(&mut self, after: bool) -> KeyOutcome {
        let line = self.buffer.cursor().line;
        match self.register.clone() {
            Register::Empty => return KeyOutcome::Ignored(InputError::EmptyRegister),
            Register::Lines(lines) if after => self.buffer.insert_lines_below(line, &lines),
            Register::Lines(lines) => self.buffer.insert_lines_above(line, &lines),
            Register::Chars(text) => {
                self.buffer.insert_text(&text);
                self.buffer.clamp_to_char();
            }
        }
        KeyOutcome::Handled
    }

    fn visual_key(&mut self, key: Key) -> KeyOutcome {
        if let Some(pending) = self.pending.take() {
            if let Some(outcome) = self.resolve_pending(pending, key) {
                return outcome;
            }
        }

        if let Some(outcome) = self.motion(key) {
            return outcome;
        }

        match (self.mode, key) {
            (_, Key::Esc) => self.set_mode(EditorMode::Normal),
            (EditorMode::VisualChar, Key::Char('v')) | (EditorMode::VisualLine, Key::Char('V')) => {
                self.set_mode(EditorMode::Normal)
            }
            (EditorMode::VisualChar, Key::Char('V')) => self.set_mode(EditorMode::VisualLine),
            (EditorMode::VisualLine, Key::Char('v')) => self.set_mode(EditorMode::VisualChar),
            (_, Key::Char('y')) => self.operate_on_selection(false),
            (_, Key::Char('d')) | (_, Key::Char('x')) => self.operate_on_selection(true),
            _ => return self.unbound(key),
        }
        KeyOutcome::Handled
    }

    fn operate_on_selection(&mut self, delete: bool) {
        let Some(selection) = self.selection() else {
            return;
        };

        match selection {
            Selection::Chars { start, end } => {
                let text = if delete {
                    self.buffer.delete_range(start, end)
                } else {
                    self.buffer.text_in_range(start, end)
                };
                self.register = Register::Chars(text);
                self.buffer.set_cursor(start.line, start.col);
            }
            Selection::Lines { first, last } => {
                let lines = if delete {
                    self.buffer.delete_lines(first, last)
                } else {
                    self.buffer.lines()[first..=last].to_vec()
                };
                self.register = Register::Lines(lines);
                self.buffer.set_cursor(first, 0);
            }
        }
        self.set_mode(EditorMode::Normal);
    }
}
