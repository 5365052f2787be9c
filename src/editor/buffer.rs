//! Line buffer with a cursor.
//!
//! Columns are character indices, not byte offsets. The buffer always holds
//! at least one (possibly empty) line and the cursor line is always valid.

/// Zero-based cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorBuffer {
    lines: Vec<String>,
    cursor: Position,
}

impl Default for EditorBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn byte_index(line: &str, col: usize) -> usize {
    line.char_indices().nth(col).map(|(i, _)| i).unwrap_or(line.len())
}

fn char_len(line: &str) -> usize {
    line.chars().count()
}

impl EditorBuffer {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor: Position::default(),
        }
    }

    /// Buffer holding `text`, cursor at its end
    pub fn from_text(text: &str) -> Self {
        let mut buffer = Self::new();
        buffer.replace_text(text);
        buffer
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> &str {
        self.lines.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Length of line `index` in characters
    pub fn line_len(&self, index: usize) -> usize {
        char_len(self.line(index))
    }

    pub fn cursor(&self) -> Position {
        self.cursor
    }

    /// Lines joined with `\n`
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// True when every line is empty or whitespace
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    /// Replace the whole content, cursor at the end of the last line
    pub fn replace_text(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        self.lines = text.split('\n').map(str::to_string).collect();
        let last = self.lines.len() - 1;
        self.cursor = Position::new(last, self.line_len(last));
    }

    /// Move the cursor, clamping to the buffer (column may sit past the last char)
    pub fn set_cursor(&mut self, line: usize, col: usize) {
        let line = line.min(self.lines.len() - 1);
        let col = col.min(self.line_len(line));
        self.cursor = Position::new(line, col);
    }

    /// Clamp the column onto the last character, as Normal mode requires
    pub fn clamp_to_char(&mut self) {
        let max = self.line_len(self.cursor.line).saturating_sub(1);
        self.cursor.col = self.cursor.col.min(max);
    }

    pub fn char_at(&self, pos: Position) -> Option<char> {
        self.lines.get(pos.line)?.chars().nth(pos.col)
    }

    /// Insert one character at the cursor; `\n` splits the line
    pub fn insert_char(&mut self, c: char) {
        if c == '\n' {
            self.split_line();
            return;
        }
        let Position { line, col } = self.cursor;
        let idx = byte_index(&self.lines[line], col);
        self.lines[line].insert(idx, c);
        self.cursor.col += 1;
    }

    /// Insert text at the cursor as if typed
    pub fn insert_text(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        for c in text.chars() {
            self.insert_char(c);
        }
    }

    /// Split the current line at the cursor
    pub fn split_line(&mut self) {
        let Position { line, col } = self.cursor;
        let idx = byte_index(&self.lines[line], col);
        let tail = self.lines[line].split_off(idx);
        self.lines.insert(line + 1, tail);
        self.cursor = Position::new(line + 1, 0);
    }

    /// Delete the character before the cursor, joining lines at column 0
    pub fn backspace(&mut self) {
        let Position { line, col } = self.cursor;
        if col > 0 {
            let idx = byte_index(&self.lines[line], col - 1);
            self.lines[line].remove(idx);
            self.cursor.col -= 1;
        } else if line > 0 {
            let current = self.lines.remove(line);
            let prev_len = self.line_len(line - 1);
            self.lines[line - 1].push_str(&current);
            self.cursor = Position::new(line - 1, prev_len);
        }
    }

    /// Remove the cursor line and return it.
    ///
    /// The only line is emptied instead of removed. The cursor stays on the
    /// same line index (clamped), column 0.
    pub fn delete_line(&mut self) -> String {
        let line = self.cursor.line;
        let removed = if self.lines.len() == 1 {
            std::mem::take(&mut self.lines[0])
        } else {
            self.lines.remove(line)
        };
        self.set_cursor(line, 0);
        removed
    }

    /// Remove lines `first..=last`, leaving one empty line if nothing remains
    pub fn delete_lines(&mut self, first: usize, last: usize) -> Vec<String> {
        let last = last.min(self.lines.len() - 1);
        let removed: Vec<String> = self.lines.drain(first..=last).collect();
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.set_cursor(first, 0);
        removed
    }

    /// Insert whole lines below line `after`, cursor on the first inserted line.
    ///
    /// When the buffer is a single empty line it is replaced instead.
    pub fn insert_lines_below(&mut self, after: usize, new_lines: &[String]) {
        if new_lines.is_empty() {
            return;
        }
        if self.lines.len() == 1 && self.lines[0].is_empty() {
            self.lines = new_lines.to_vec();
            self.set_cursor(0, 0);
            return;
        }
        let at = (after + 1).min(self.lines.len());
        for (offset, line) in new_lines.iter().enumerate() {
            self.lines.insert(at + offset, line.clone());
        }
        self.set_cursor(at, 0);
    }

    /// Insert whole lines above line `before`, cursor on the first inserted line
    pub fn insert_lines_above(&mut self, before: usize, new_lines: &[String]) {
        if new_lines.is_empty() {
            return;
        }
        if self.lines.len() == 1 && self.lines[0].is_empty() {
            self.insert_lines_below(0, new_lines);
            return;
        }
        let at = before.min(self.lines.len());
        for (offset, line) in new_lines.iter().enumerate() {
            self.lines.insert(at + offset, line.clone());
        }
        self.set_cursor(at, 0);
    }

    /// Open an empty line below the cursor line and move onto it
    pub fn open_line_below(&mut self) {
        let at = self.cursor.line + 1;
        self.lines.insert(at, String::new());
        self.cursor = Position::new(at, 0);
    }

    /// Open an empty line above the cursor line and move onto it
    pub fn open_line_above(&mut self) {
        let at = self.cursor.line;
        self.lines.insert(at, String::new());
        self.cursor = Position::new(at, 0);
    }

    /// Text between two positions, both inclusive
    pub fn text_in_range(&self, start: Position, end: Position) -> String {
        if start.line == end.line {
            return self
                .line(start.line)
                .chars()
                .skip(start.col)
                .take((end.col + 1).saturating_sub(start.col))
                .collect();
        }

        let mut parts: Vec<String> = Vec::new();
        parts.push(self.line(start.line).chars().skip(start.col).collect());
        for line in (start.line + 1)..end.line {
            parts.push(self.line(line).to_string());
        }
        parts.push(self.line(end.line).chars().take(end.col + 1).collect());
        parts.join("\n")
    }

    /// Remove the inclusive range and return its text; cursor moves to `start`
    pub fn delete_range(&mut self, start: Position, end: Position) -> String {
        let removed = self.text_in_range(start, end);

        let head: String = self.line(start.line).chars().take(start.col).collect();
        let tail: String = self.line(end.line).chars().skip(end.col + 1).collect();
        self.lines.drain(start.line..=end.line.min(self.lines.len() - 1));
        self.lines.insert(start.line, head + &tail);

        self.set_cursor(start.line, start.col);
        removed
    }

    fn is_word_start(&self, pos: Position) -> bool {
        let chars: Vec<char> = self.line(pos.line).chars().collect();
        match chars.get(pos.col) {
            Some(c) if !c.is_whitespace() => pos.col == 0 || chars[pos.col - 1].is_whitespace(),
            _ => false,
        }
    }

    /// Start of the next word after `from`, or the last character of the buffer
    pub fn next_word_start(&self, from: Position) -> Position {
        let mut line = from.line;
        let mut col = from.col + 1;
        while line < self.lines.len() {
            let len = self.line_len(line);
            while col < len {
                let pos = Position::new(line, col);
                if self.is_word_start(pos) {
                    return pos;
                }
                col += 1;
            }
            line += 1;
            col = 0;
        }
        self.end_position()
    }

    /// Start of the previous word before `from`, or the buffer start
    pub fn prev_word_start(&self, from: Position) -> Position {
        let mut line = from.line;
        let mut col = from.col;
        loop {
            while col > 0 {
                col -= 1;
                let pos = Position::new(line, col);
                if self.is_word_start(pos) {
                    return pos;
                }
            }
            if line == 0 {
                return Position::default();
            }
            line -= 1;
            col = self.line_len(line);
        }
    }

    /// Last character of the last line
    pub fn end_position(&self) -> Position {
        let last = self.lines.len() - 1;
        Position::new(last, self.line_len(last).saturating_sub(1))
    }
}
