//! Rendering of a [`ConsoleSession`] into terminal lines.
//!
//! Rendering is pure: it produces ANSI-colored lines plus the cursor cell,
//! and the driver only has to paint them.

use owo_colors::OwoColorize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::{ConsoleSession, Phase, StatusKind, StatusLine};
use crate::editor::{ModalEditor, Position, Selection};
use crate::models::SearchResult;
use crate::navigator::{NavigatorState, ResultNavigator};
use crate::ui::{format_year_venue, source_icon, status_icon, truncate_with_ellipsis, wrap_text, Status};

const EDITOR_PROMPT: &str = "> ";
const LINES_PER_RESULT: usize = 4;

/// One painted screen
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub lines: Vec<String>,
    /// Column and row of the text cursor, when it should be shown
    pub cursor: Option<(u16, u16)>,
}

impl Frame {
    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

/// Lay out the session for a `width` x `height` terminal
pub fn render(session: &ConsoleSession, width: usize, height: usize) -> Frame {
    let width = width.max(20);
    let height = height.max(8);
    let mut frame = Frame::default();

    frame.push(header(session));
    frame.push(String::new());

    // Header above, blank + help + status below.
    let body_height = height.saturating_sub(5);
    match session.phase() {
        Phase::Editing => render_editor(&mut frame, session.editor(), width, body_height),
        Phase::Searching { query, .. } => {
            frame.push(format!(
                "{} Searching for \"{}\"...",
                status_icon(Status::Search),
                truncate_with_ellipsis(query, width.saturating_sub(20)).cyan()
            ));
        }
        Phase::Browsing { query, navigator } => {
            render_navigator(&mut frame, query, navigator, width, body_height)
        }
        Phase::Resolving { identifier, .. } => {
            frame.push(format!("Fetching BibTeX for {}...", identifier.yellow()));
        }
        Phase::Viewing { text, .. } => {
            for line in text.lines().take(body_height) {
                frame.push(truncate_with_ellipsis(line, width));
            }
        }
    }

    while frame.lines.len() < height.saturating_sub(2) {
        frame.push(String::new());
    }
    frame.push(truncate_with_ellipsis(help_line(session), width).dimmed().to_string());
    frame.push(
        session
            .status()
            .map(|status| status_line(status, width))
            .unwrap_or_default(),
    );
    frame
}

fn header(session: &ConsoleSession) -> String {
    let mut mode = match session.phase() {
        Phase::Editing => {
            let editor = session.editor();
            let mut label = format!("-- {} --", editor.mode().display());
            if let Some(pending) = editor.pending() {
                label.push(' ');
                label.push(pending.prefix());
            }
            if editor.is_ocr_pending() {
                label.push_str(" [OCR]");
            }
            label
        }
        other => format!("-- {} --", other.name().to_uppercase()),
    };
    mode = mode.yellow().bold().to_string();

    format!(
        "{}  [{}]  {}",
        "bibhunt".cyan().bold(),
        session.input_kind().label().magenta().bold(),
        mode
    )
}

fn help_line(session: &ConsoleSession) -> &'static str {
    match session.phase() {
        Phase::Editing => {
            "Esc: normal mode · Enter (normal): submit · Shift+Tab: title/DOI · Ctrl+V: paste image · Ctrl+C: quit"
        }
        Phase::Searching { .. } | Phase::Resolving { .. } => "Esc: cancel · Ctrl+C: quit",
        Phase::Browsing { navigator, .. } => match navigator.state() {
            NavigatorState::ViewingAbstract => "Esc/Backspace: back to results",
            _ => "↑↓: select · Space: abstract · Enter: choose · Esc: cancel",
        },
        Phase::Viewing { bibtex: true, .. } => "c: copy to clipboard and continue · any other key: continue",
        Phase::Viewing { .. } => "any key: continue",
    }
}

fn status_line(status: &StatusLine, width: usize) -> String {
    let message = truncate_with_ellipsis(&status.message, width.saturating_sub(3));
    let (icon, message) = match status.kind {
        StatusKind::Info => (status_icon(Status::Info).cyan().to_string(), message),
        StatusKind::Success => (
            status_icon(Status::Success).green().to_string(),
            message.green().to_string(),
        ),
        StatusKind::Warning => (
            status_icon(Status::Warning).yellow().to_string(),
            message.yellow().to_string(),
        ),
        StatusKind::Error => (
            status_icon(Status::Error).red().to_string(),
            message.red().to_string(),
        ),
    };
    format!("{} {}", icon, message)
}

fn render_editor(frame: &mut Frame, editor: &ModalEditor, width: usize, body_height: usize) {
    let buffer = editor.buffer();
    let cursor = buffer.cursor();
    let selection = editor.selection();
    let top = frame.lines.len();

    // Keep the cursor line visible.
    let visible = body_height.max(1);
    let first = (cursor.line + 1).saturating_sub(visible);

    for (index, line) in buffer.lines().iter().enumerate().skip(first).take(visible) {
        let prompt = if index == 0 { EDITOR_PROMPT } else { "  " };
        let text = match selection {
            Some(sel) if sel.covers_line(index) => highlight(line, index, sel),
            _ => line.clone(),
        };
        frame.push(format!("{}{}", prompt.cyan().bold(), text));
    }

    let line = buffer.line(cursor.line);
    let column = EDITOR_PROMPT.len()
        + line
            .chars()
            .take(cursor.col)
            .map(|c| c.width().unwrap_or(1))
            .sum::<usize>();
    let row = top + cursor.line - first;
    frame.cursor = Some((column.min(width - 1) as u16, row as u16));
}

fn highlight(line: &str, index: usize, selection: Selection) -> String {
    match selection {
        Selection::Lines { .. } => {
            if line.is_empty() {
                " ".reversed().to_string()
            } else {
                line.reversed().to_string()
            }
        }
        Selection::Chars { start, end } => line
            .chars()
            .enumerate()
            .map(|(col, c)| {
                let pos = Position::new(index, col);
                if start <= pos && pos <= end {
                    c.reversed().to_string()
                } else {
                    c.to_string()
                }
            })
            .collect(),
    }
}

fn render_navigator(
    frame: &mut Frame,
    query: &str,
    navigator: &ResultNavigator,
    width: usize,
    body_height: usize,
) {
    if navigator.state() == NavigatorState::ViewingAbstract {
        if let Some(current) = navigator.current() {
            render_abstract(frame, current, width, body_height);
        }
        return;
    }

    let results = navigator.results();
    frame.push(format!(
        "Search results for: {}  ({} found)",
        truncate_with_ellipsis(query, width.saturating_sub(30)).cyan().bold(),
        results.len()
    ));
    frame.push(String::new());

    let visible = (body_height.saturating_sub(2) / LINES_PER_RESULT).max(1);
    let selected = navigator.selected_index();
    let first = (selected + 1).saturating_sub(visible);
    let text_width = width.saturating_sub(8);

    for (index, result) in results.iter().enumerate().skip(first).take(visible) {
        let is_selected = index == selected;
        let marker = if is_selected { ">" } else { " " };
        let title = format!(
            "{} [{}] {}",
            marker,
            index + 1,
            truncate_with_ellipsis(result.title(), text_width)
        );
        let authors = format!(
            "     Authors: {}",
            truncate_with_ellipsis(&result.author_summary(3), width.saturating_sub(14))
        );
        let details = format!(
            "     {}",
            truncate_with_ellipsis(
                &format!(
                    "{}  {} {}",
                    format_year_venue(result),
                    source_icon(result.source().id()),
                    result.source().name()
                ),
                width.saturating_sub(5)
            )
        );

        if is_selected {
            frame.push(title.reversed().bold().to_string());
            frame.push(authors.reversed().to_string());
            frame.push(details.reversed().to_string());
        } else {
            frame.push(title.bold().to_string());
            frame.push(authors);
            frame.push(details.dimmed().to_string());
        }
        frame.push(String::new());
    }
}

fn render_abstract(frame: &mut Frame, result: &SearchResult, width: usize, body_height: usize) {
    frame.push(format!(
        "Abstract for: {}",
        truncate_with_ellipsis(result.title(), width.saturating_sub(14)).cyan().bold()
    ));
    frame.push(String::new());

    let text = result.abstract_text().unwrap_or("No abstract available");
    for line in wrap_text(text, width.saturating_sub(2)).into_iter().take(body_height.saturating_sub(2)) {
        frame.push(line);
    }
}

/// Plain-text summary shown for a record that cannot be resolved
pub(crate) fn record_summary(result: &SearchResult) -> String {
    let mut out = format!(
        "{}\nAuthors: {}\n{}\nSource: {}",
        result.title(),
        result.author_summary(3),
        format_year_venue(result),
        result.source().name()
    );
    if let Some(doi) = result.doi() {
        out.push_str(&format!("\nIdentifier: {}", doi));
    }
    out
}

/// Display width of a rendered line with ANSI escapes removed
#[cfg(test)]
fn visible_width(line: &str) -> usize {
    let mut plain = String::new();
    let mut in_escape = false;
    for c in line.chars() {
        match (in_escape, c) {
            (false, '\x1b') => in_escape = true,
            (true, 'm') => in_escape = false,
            (true, _) => {}
            (false, c) => plain.push(c),
        }
    }
    plain.width()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::console::ConsoleEvent;
    use crate::editor::{InputHistory, Key};
    use crate::models::{ResultList, SearchResultBuilder, SourceType};
    use crate::search::{SearchOutcome, SearchReport};

    fn session_with(text: &str) -> ConsoleSession {
        let mut session = ConsoleSession::new(SearchConfig::default(), InputHistory::new(5));
        for c in text.chars() {
            session.handle(ConsoleEvent::Key(Key::Char(c)));
        }
        session
    }

    #[test]
    fn test_editor_frame_fills_height() {
        let session = session_with("deep learning");
        let frame = render(&session, 80, 20);
        assert_eq!(frame.lines.len(), 20);
        assert!(frame.lines[2].ends_with("deep learning"));
        assert_eq!(frame.cursor, Some((2 + 13, 2)));
    }

    #[test]
    fn test_cursor_accounts_for_wide_chars() {
        let session = session_with("日本");
        let frame = render(&session, 80, 20);
        assert_eq!(frame.cursor, Some((2 + 4, 2)));
    }

    #[test]
    fn test_result_list_renders_selection() {
        let mut session = session_with("q");
        session.handle(ConsoleEvent::Key(Key::Esc));
        session.handle(ConsoleEvent::Key(Key::Enter));
        let list: ResultList = (0..3)
            .map(|i| {
                SearchResultBuilder::new(format!("Paper {}", i), SourceType::CrossRef)
                    .author("Ada Lovelace")
                    .build()
            })
            .collect();
        session.handle(ConsoleEvent::SearchFinished {
            generation: 1,
            report: SearchReport {
                outcome: SearchOutcome::Results(list),
                failures: Vec::new(),
            },
        });

        let frame = render(&session, 60, 30);
        assert!(frame.cursor.is_none());
        assert!(frame.lines.iter().any(|l| l.contains("[1] Paper 0")));
        assert!(frame.lines.iter().any(|l| l.contains("[3] Paper 2")));
        assert!(frame.lines.iter().all(|l| visible_width(l) <= 60));
    }

    #[test]
    fn test_record_summary() {
        let result = SearchResultBuilder::new("A Title", SourceType::OpenAlex)
            .author("Jane Doe")
            .year(Some(2021))
            .build();
        let summary = record_summary(&result);
        assert!(summary.starts_with("A Title\nAuthors: Jane Doe"));
        assert!(summary.contains("Year: 2021"));
        assert!(!summary.contains("Identifier"));
    }
}
