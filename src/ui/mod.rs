//! Terminal output helpers: colors, icons, width-aware text and spinners.

use owo_colors::OwoColorize;
use std::io::IsTerminal;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::models::SearchResult;

const ELLIPSIS: &str = "...";

/// Columns available on stdout, 100 when it is not a terminal
pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(100)
}

pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Icon shown next to records from the backend `id`
pub fn source_icon(id: &str) -> &'static str {
    match id {
        "openalex" => "🔗",
        "crossref" => "📚",
        "semanticscholar" => "🧠",
        _ => "📄",
    }
}

/// Kind of a one-line message, decides icon and color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Search,
}

pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Search => "🔍",
    }
}

/// Icon and message, colored by status
pub fn styled_status(status: Status, msg: &str) -> String {
    let icon = status_icon(status);
    match status {
        Status::Success => format!("{} {}", icon.green().bold(), msg),
        Status::Error => format!("{} {}", icon.red().bold(), msg.red()),
        Status::Warning => format!("{} {}", icon.yellow().bold(), msg.yellow()),
        Status::Info => format!("{} {}", icon.cyan().bold(), msg),
        Status::Search => format!("{} {}", icon.yellow(), msg),
    }
}

/// Print a styled status message to stderr.
pub fn print_status(status: Status, msg: &str) {
    eprintln!("{}", styled_status(status, msg));
}

/// Heading printed above the results of `bibhunt search`
pub fn print_search_header(query: &str, count: usize, duration: Duration) {
    println!();
    println!("{} {}", status_icon(Status::Search), query.cyan().bold());
    println!(
        "{}",
        format!(
            "{} record(s) in {:.2}s",
            count.to_string().green().bold(),
            duration.as_secs_f64()
        )
        .dimmed()
    );
    println!();
}

/// "year, venue" line of a record, with placeholders for missing values
pub fn format_year_venue(result: &SearchResult) -> String {
    let year = result
        .year()
        .map(|y| y.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    format!("Year: {}, Venue: {}", year, result.venue().unwrap_or("N/A"))
}

/// Print one record of a result list.
pub fn print_result(index: usize, result: &SearchResult, width: usize) {
    let body_width = width.saturating_sub(6).max(20);
    println!(
        "{} {}",
        format!("[{}]", index + 1).cyan().bold(),
        truncate_with_ellipsis(result.title(), body_width).bold()
    );
    println!(
        "    {}",
        truncate_with_ellipsis(&result.author_summary(3), body_width)
    );
    println!(
        "    {}  {} {}",
        format_year_venue(result).dimmed(),
        source_icon(result.source().id()),
        result.source().name().green()
    );
    if let Some(doi) = result.doi() {
        println!("    DOI: {}", doi.yellow());
    }
    println!();
}

/// Cut `text` to at most `max_width` columns, marking the cut with "..."
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let budget = max_width.saturating_sub(ELLIPSIS.len());

    let mut used = 0;
    let kept: String = text
        .chars()
        .take_while(|c| {
            used += c.width().unwrap_or(1);
            used <= budget
        })
        .collect();
    format!("{}{}", kept, ELLIPSIS)
}

/// Greedy word wrap by display width. Words wider than `width` are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0;

    for word in text.split_whitespace() {
        let word_width = word.width();
        if line_width > 0 && line_width + 1 + word_width <= width {
            line.push(' ');
            line.push_str(word);
            line_width += 1 + word_width;
            continue;
        }
        if line_width > 0 {
            lines.push(std::mem::take(&mut line));
            line_width = 0;
        }
        if word_width <= width {
            line.push_str(word);
            line_width = word_width;
            continue;
        }
        for c in word.chars() {
            let w = c.width().unwrap_or(1);
            if line_width + w > width && line_width > 0 {
                lines.push(std::mem::take(&mut line));
                line_width = 0;
            }
            line.push(c);
            line_width += w;
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Activity indicator on stderr while a request runs
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    /// Start spinning with `message`; an invisible spinner draws nothing
    pub fn start(message: impl Into<String>, visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            bar.set_style(style.tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷ "));
        }
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    /// Remove the spinner
    pub fn clear(self) {
        self.bar.finish_and_clear();
    }
}
