//! Interactive console: title (or DOI) in, BibTeX out.
//!
//! [`ConsoleSession`] is a pure state machine. The terminal driver feeds it
//! [`ConsoleEvent`]s and carries out the [`Effect`]s it returns (searching,
//! OCR, clipboard, resolving), posting the results back as new events. At
//! most one phase owns the keyboard at a time.

mod terminal;
mod view;

pub use terminal::{run_console, ConsoleServices};
pub use view::render;

use crate::clipboard::{ImagePayload, OcrError, PastePayload};
use crate::config::SearchConfig;
use crate::editor::{EditorMode, InputError, InputHistory, Key, KeyOutcome, ModalEditor};
use crate::models::{SearchQuery, SearchResult};
use crate::navigator::{NavEvent, NavigatorState, ResultNavigator};
use crate::resolve::{doi_for_identifier, ResolveError};
use crate::search::{SearchOutcome, SearchReport};
use crate::utils::HistoryEntryKind;

/// What a committed line is interpreted as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
    /// Search the configured sources by title
    #[default]
    Title,
    /// Resolve a DOI or arXiv id directly
    Doi,
}

impl InputKind {
    pub fn label(&self) -> &'static str {
        match self {
            InputKind::Title => "TITLE",
            InputKind::Doi => "DOI",
        }
    }

    fn toggled(self) -> Self {
        match self {
            InputKind::Title => InputKind::Doi,
            InputKind::Doi => InputKind::Title,
        }
    }

    fn history_kind(self) -> HistoryEntryKind {
        match self {
            InputKind::Title => HistoryEntryKind::Title,
            InputKind::Doi => HistoryEntryKind::Doi,
        }
    }
}

/// Severity of the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
}

/// One-line message shown under the current view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub message: String,
}

/// Which component owns the keyboard
#[derive(Debug, Clone)]
pub enum Phase {
    Editing,
    Searching { generation: u64, query: String },
    Browsing { query: String, navigator: ResultNavigator },
    Resolving { generation: u64, identifier: String },
    /// A resolved entry, or a summary for a record without a DOI
    Viewing { text: String, bibtex: bool },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Editing => "editing",
            Phase::Searching { .. } => "searching",
            Phase::Browsing { .. } => "browsing",
            Phase::Resolving { .. } => "resolving",
            Phase::Viewing { .. } => "viewing",
        }
    }
}

/// Input to the session
#[derive(Debug)]
pub enum ConsoleEvent {
    Key(Key),
    /// Clipboard content, from Ctrl+V or a bracketed paste
    Paste(PastePayload),
    /// Ctrl+V found nothing usable on the clipboard
    PasteFailed(String),
    OcrFinished(Result<String, OcrError>),
    SearchFinished { generation: u64, report: SearchReport },
    RecordResolved {
        generation: u64,
        result: Result<String, ResolveError>,
    },
    CopyFinished(Result<(), String>),
}

/// Work requested from the driver
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ReadClipboard,
    RunOcr(ImagePayload),
    RunSearch { generation: u64, query: SearchQuery },
    /// Abort the running search, if any
    CancelSearch,
    Resolve { generation: u64, identifier: String },
    CopyToClipboard(String),
    RecordHistory { kind: HistoryEntryKind, text: String },
    Exit,
}

/// State of one interactive session
#[derive(Debug, Clone)]
pub struct ConsoleSession {
    editor: ModalEditor,
    history: InputHistory,
    input_kind: InputKind,
    phase: Phase,
    status: Option<StatusLine>,
    search: SearchConfig,
    generation: u64,
    resolved: Vec<String>,
    exiting: bool,
}

impl ConsoleSession {
    pub fn new(search: SearchConfig, history: InputHistory) -> Self {
        Self {
            editor: ModalEditor::new(),
            history,
            input_kind: InputKind::default(),
            phase: Phase::Editing,
            status: None,
            search,
            generation: 0,
            resolved: Vec::new(),
            exiting: false,
        }
    }

    pub fn editor(&self) -> &ModalEditor {
        &self.editor
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn input_kind(&self) -> InputKind {
        self.input_kind
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    pub fn history(&self) -> &InputHistory {
        &self.history
    }

    /// BibTeX entries resolved so far, oldest first
    pub fn resolved_entries(&self) -> &[String] {
        &self.resolved
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    /// Apply one event and return the work it requires
    pub fn handle(&mut self, event: ConsoleEvent) -> Vec<Effect> {
        if self.exiting {
            return Vec::new();
        }

        match event {
            ConsoleEvent::Key(key) => self.handle_key(key),
            ConsoleEvent::Paste(payload) => self.handle_paste(payload),
            ConsoleEvent::PasteFailed(reason) => {
                self.set_status(StatusKind::Warning, reason);
                Vec::new()
            }
            ConsoleEvent::OcrFinished(result) => {
                self.handle_ocr(result);
                Vec::new()
            }
            ConsoleEvent::SearchFinished { generation, report } => {
                self.handle_search_finished(generation, report);
                Vec::new()
            }
            ConsoleEvent::RecordResolved { generation, result } => {
                self.handle_resolved(generation, result);
                Vec::new()
            }
            ConsoleEvent::CopyFinished(Ok(())) => {
                self.set_status(StatusKind::Success, "BibTeX copied to clipboard");
                Vec::new()
            }
            ConsoleEvent::CopyFinished(Err(reason)) => {
                self.set_status(StatusKind::Warning, format!("Could not copy to clipboard: {}", reason));
                Vec::new()
            }
        }
    }

    fn set_status(&mut self, kind: StatusKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            StatusKind::Warning | StatusKind::Error => tracing::warn!("{}", message),
            _ => tracing::debug!("{}", message),
        }
        self.status = Some(StatusLine { kind, message });
    }

    fn exit(&mut self) -> Vec<Effect> {
        self.exiting = true;
        let mut effects = Vec::new();
        if matches!(self.phase, Phase::Searching { .. }) {
            effects.push(Effect::CancelSearch);
        }
        effects.push(Effect::Exit);
        effects
    }

    fn return_to_editor(&mut self, text: Option<&str>) {
        self.editor.reset();
        if let Some(text) = text {
            self.editor.set_text(text);
        }
        self.phase = Phase::Editing;
    }

    fn handle_key(&mut self, key: Key) -> Vec<Effect> {
        match self.phase {
            Phase::Editing => self.editing_key(key),
            Phase::Searching { .. } | Phase::Resolving { .. } => self.waiting_key(key),
            Phase::Browsing { .. } => self.browsing_key(key),
            Phase::Viewing { .. } => self.viewing_key(key),
        }
    }

    fn editing_key(&mut self, key: Key) -> Vec<Effect> {
        match key {
            Key::Ctrl('c') | Key::Ctrl('d') => return self.exit(),
            Key::Ctrl('v') => {
                if self.editor.is_ocr_pending() {
                    self.set_status(StatusKind::Warning, InputError::OcrBusy.to_string());
                    return Vec::new();
                }
                return vec![Effect::ReadClipboard];
            }
            Key::BackTab => {
                self.input_kind = self.input_kind.toggled();
                self.set_status(
                    StatusKind::Info,
                    format!("Input mode: {}", self.input_kind.label()),
                );
                return Vec::new();
            }
            _ => {}
        }

        if !self.editor.is_ocr_pending() && self.recall_history(key) {
            return Vec::new();
        }

        match self.editor.handle_key(key) {
            KeyOutcome::Commit(text) => self.commit(text),
            KeyOutcome::Ignored(InputError::Unbound { .. }) => Vec::new(),
            KeyOutcome::Ignored(err) => {
                self.set_status(StatusKind::Warning, err.to_string());
                Vec::new()
            }
            KeyOutcome::Handled | KeyOutcome::Pending(_) => Vec::new(),
        }
    }

    /// History recall: Up/Down at the buffer edges in Insert mode, or
    /// Ctrl+P/Ctrl+N anywhere in the editor.
    fn recall_history(&mut self, key: Key) -> bool {
        let insert = self.editor.mode() == EditorMode::Insert;
        let buffer = self.editor.buffer();
        let on_first = buffer.cursor().line == 0;
        let on_last = buffer.cursor().line + 1 >= buffer.line_count();

        let recalled = match key {
            Key::Up if insert && on_first => self.history.previous(&buffer.text()),
            Key::Ctrl('p') => self.history.previous(&buffer.text()),
            Key::Down if insert && on_last => self.history.next(&buffer.text()),
            Key::Ctrl('n') => self.history.next(&buffer.text()),
            _ => return false,
        };

        match recalled {
            Some(text) => {
                self.editor.set_text(&text);
                true
            }
            None => matches!(key, Key::Ctrl('p') | Key::Ctrl('n')),
        }
    }

    fn commit(&mut self, text: String) -> Vec<Effect> {
        if text.is_empty() {
            self.set_status(StatusKind::Warning, "No input provided");
            return Vec::new();
        }

        self.history.push(text.clone());
        let mut effects = vec![Effect::RecordHistory {
            kind: self.input_kind.history_kind(),
            text: text.clone(),
        }];

        match self.input_kind {
            InputKind::Title => {
                self.generation += 1;
                tracing::info!("Searching for '{}'", text);
                self.editor.reset();
                self.phase = Phase::Searching {
                    generation: self.generation,
                    query: text.clone(),
                };
                self.set_status(StatusKind::Info, format!("Searching for \"{}\"...", text));
                effects.push(Effect::RunSearch {
                    generation: self.generation,
                    query: self.search.query(text),
                });
            }
            InputKind::Doi => match doi_for_identifier(&text) {
                Ok(identifier) => {
                    self.editor.reset();
                    effects.push(self.start_resolve(identifier));
                }
                Err(err) => self.set_status(StatusKind::Error, err.to_string()),
            },
        }
        effects
    }

    fn start_resolve(&mut self, identifier: String) -> Effect {
        self.generation += 1;
        self.set_status(StatusKind::Info, format!("Fetching BibTeX for {}...", identifier));
        self.phase = Phase::Resolving {
            generation: self.generation,
            identifier: identifier.clone(),
        };
        Effect::Resolve {
            generation: self.generation,
            identifier,
        }
    }

    /// Searching or resolving: only Esc (cancel) and exit keys do anything
    fn waiting_key(&mut self, key: Key) -> Vec<Effect> {
        match key {
            Key::Ctrl('c') | Key::Ctrl('d') => self.exit(),
            Key::Esc => {
                let searching = match std::mem::replace(&mut self.phase, Phase::Editing) {
                    Phase::Searching { query, .. } => {
                        self.return_to_editor(Some(&query));
                        true
                    }
                    _ => {
                        self.return_to_editor(None);
                        false
                    }
                };
                // Late completions carry the old generation and are dropped.
                self.generation += 1;
                self.set_status(StatusKind::Info, "Cancelled");
                if searching {
                    vec![Effect::CancelSearch]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }

    fn browsing_key(&mut self, key: Key) -> Vec<Effect> {
        let Some(event) = NavEvent::from_key(key) else {
            return Vec::new();
        };
        let Phase::Browsing { navigator, .. } = &mut self.phase else {
            return Vec::new();
        };

        match navigator.handle(event) {
            NavigatorState::Browsing | NavigatorState::ViewingAbstract => Vec::new(),
            NavigatorState::Cancelled => {
                self.return_to_editor(None);
                self.set_status(StatusKind::Info, "Selection cancelled");
                Vec::new()
            }
            NavigatorState::Selected => {
                let Some(chosen) = navigator.selection().cloned() else {
                    return Vec::new();
                };
                self.select(chosen)
            }
        }
    }

    fn select(&mut self, chosen: SearchResult) -> Vec<Effect> {
        tracing::info!("Selected '{}' from {}", chosen.title(), chosen.source().name());
        match chosen.doi() {
            Some(doi) => match doi_for_identifier(doi) {
                Ok(identifier) => vec![self.start_resolve(identifier)],
                Err(err) => {
                    self.show_summary(&chosen, err.to_string());
                    Vec::new()
                }
            },
            None => {
                self.show_summary(&chosen, "Selected record has no DOI".to_string());
                Vec::new()
            }
        }
    }

    fn show_summary(&mut self, record: &SearchResult, warning: String) {
        self.phase = Phase::Viewing {
            text: view::record_summary(record),
            bibtex: false,
        };
        self.set_status(StatusKind::Warning, warning);
    }

    fn viewing_key(&mut self, key: Key) -> Vec<Effect> {
        if matches!(key, Key::Ctrl('c') | Key::Ctrl('d')) {
            return self.exit();
        }
        let copy = match (&self.phase, key) {
            (Phase::Viewing { text, bibtex: true }, Key::Char('c')) => Some(text.clone()),
            _ => None,
        };

        self.return_to_editor(None);
        match copy {
            Some(entry) => vec![Effect::CopyToClipboard(entry)],
            None => {
                self.status = None;
                Vec::new()
            }
        }
    }

    fn handle_paste(&mut self, payload: PastePayload) -> Vec<Effect> {
        if !matches!(self.phase, Phase::Editing) {
            tracing::debug!("Ignoring paste while {}", self.phase.name());
            return Vec::new();
        }

        match payload {
            PastePayload::Text(text) => {
                if let KeyOutcome::Ignored(err) = self.editor.paste_text(&text) {
                    self.set_status(StatusKind::Warning, err.to_string());
                }
                Vec::new()
            }
            PastePayload::Image(image) => match self.editor.begin_ocr() {
                Ok(()) => {
                    self.set_status(StatusKind::Info, "Recognizing text in pasted image...");
                    vec![Effect::RunOcr(image)]
                }
                Err(err) => {
                    self.set_status(StatusKind::Warning, err.to_string());
                    Vec::new()
                }
            },
        }
    }

    fn handle_ocr(&mut self, result: Result<String, OcrError>) {
        match result {
            Ok(text) => {
                if self.editor.finish_ocr(Some(&text)) {
                    self.set_status(StatusKind::Success, "Recognized text inserted");
                } else {
                    self.set_status(StatusKind::Warning, OcrError::NoText.to_string());
                }
            }
            Err(err) => {
                self.editor.finish_ocr(None);
                self.set_status(StatusKind::Warning, format!("{}; type the title instead", err));
            }
        }
    }

    fn handle_search_finished(&mut self, generation: u64, report: SearchReport) {
        let query = match &self.phase {
            Phase::Searching {
                generation: current,
                query,
            } if *current == generation => query.clone(),
            _ => {
                tracing::debug!("Discarding stale search result (generation {})", generation);
                return;
            }
        };

        let degraded = report
            .failures
            .iter()
            .map(|f| f.source.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        match report.outcome {
            SearchOutcome::Results(results) => {
                let count = results.len();
                self.phase = Phase::Browsing {
                    query,
                    navigator: ResultNavigator::new(results),
                };
                if degraded.is_empty() {
                    self.set_status(StatusKind::Success, format!("Found {} results", count));
                } else {
                    self.set_status(
                        StatusKind::Warning,
                        format!("Found {} results ({} unavailable)", count, degraded),
                    );
                }
            }
            SearchOutcome::NoResults => {
                self.return_to_editor(Some(&query));
                if degraded.is_empty() {
                    self.set_status(StatusKind::Warning, format!("No results for \"{}\"", query));
                } else {
                    self.set_status(
                        StatusKind::Warning,
                        format!("No results for \"{}\" ({} unavailable)", query, degraded),
                    );
                }
            }
        }
    }

    fn handle_resolved(&mut self, generation: u64, result: Result<String, ResolveError>) {
        match &self.phase {
            Phase::Resolving {
                generation: current,
                ..
            } if *current == generation => {}
            _ => {
                tracing::debug!("Discarding stale resolve result (generation {})", generation);
                return;
            }
        }

        match result {
            Ok(entry) => {
                self.resolved.push(entry.clone());
                self.phase = Phase::Viewing {
                    text: entry,
                    bibtex: true,
                };
                self.set_status(
                    StatusKind::Success,
                    "Press 'c' to copy to clipboard, any other key to continue",
                );
            }
            Err(err) => {
                self.return_to_editor(None);
                self.set_status(StatusKind::Error, err.to_string());
            }
        }
    }
}
