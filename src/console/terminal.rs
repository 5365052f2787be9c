//! Terminal driver for [`ConsoleSession`].
//!
//! A blocking reader thread turns crossterm events into session events;
//! effect tasks (search, OCR, resolve) post their results to the same
//! channel. The session itself only ever runs on the driver task.

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, DisableBracketedPaste, EnableBracketedPaste, Event};
use crossterm::style::Print;
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

use super::{render, ConsoleEvent, ConsoleSession, Effect};
use crate::clipboard::{ClipboardClassifier, ClipboardError, OcrEngine, PastePayload};
use crate::editor::Key;
use crate::resolve::BibtexResolver;
use crate::search::SearchAggregator;
use crate::utils::HistoryStore;

/// Collaborators the console hands its effects to
#[derive(Debug)]
pub struct ConsoleServices {
    pub aggregator: SearchAggregator,
    pub resolver: BibtexResolver,
    pub ocr: Arc<dyn OcrEngine>,
    /// `None` when history persistence is disabled
    pub history: Option<HistoryStore>,
}

enum DriverMessage {
    Session(ConsoleEvent),
    Redraw,
    InputClosed(String),
}

/// Raw mode, alternate screen and bracketed paste for the guard's lifetime
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = TerminalGuard;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = execute!(stdout, DisableBracketedPaste, Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

fn spawn_input_reader(tx: UnboundedSender<DriverMessage>, running: Arc<AtomicBool>) {
    thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            let ready = match event::poll(Duration::from_millis(50)) {
                Ok(ready) => ready,
                Err(e) => {
                    let _ = tx.send(DriverMessage::InputClosed(e.to_string()));
                    break;
                }
            };
            if !ready {
                continue;
            }

            let message = match event::read() {
                Ok(Event::Key(key)) => match Key::from_event(key) {
                    Some(key) => DriverMessage::Session(ConsoleEvent::Key(key)),
                    None => continue,
                },
                Ok(Event::Paste(text)) => {
                    DriverMessage::Session(ConsoleEvent::Paste(PastePayload::Text(text)))
                }
                Ok(Event::Resize(_, _)) => DriverMessage::Redraw,
                Ok(_) => continue,
                Err(e) => DriverMessage::InputClosed(e.to_string()),
            };

            let closed = matches!(message, DriverMessage::InputClosed(_));
            if tx.send(message).is_err() || closed {
                break;
            }
        }
    });
}

fn draw(session: &ConsoleSession) -> io::Result<()> {
    let (width, height) = terminal::size()?;
    let frame = render(session, width as usize, height as usize);

    let mut stdout = io::stdout();
    queue!(stdout, Hide, Clear(ClearType::All))?;
    for (row, line) in frame.lines.iter().take(height as usize).enumerate() {
        queue!(stdout, MoveTo(0, row as u16), Print(line))?;
    }
    if let Some((col, row)) = frame.cursor {
        queue!(stdout, MoveTo(col, row), Show)?;
    }
    stdout.flush()
}

struct Driver {
    services: ConsoleServices,
    clipboard: Option<ClipboardClassifier>,
    search_task: Option<JoinHandle<()>>,
    tx: UnboundedSender<DriverMessage>,
}

impl Driver {
    fn clipboard(&mut self) -> Result<&mut ClipboardClassifier, ClipboardError> {
        if self.clipboard.is_none() {
            self.clipboard = Some(ClipboardClassifier::new()?);
        }
        self.clipboard
            .as_mut()
            .ok_or_else(|| ClipboardError::Unavailable("not initialized".to_string()))
    }

    fn post(tx: &UnboundedSender<DriverMessage>, event: ConsoleEvent) {
        if tx.send(DriverMessage::Session(event)).is_err() {
            tracing::debug!("Console closed before a task finished");
        }
    }

    fn apply(&mut self, effect: Effect) {
        tracing::debug!("Effect: {:?}", effect);
        match effect {
            Effect::ReadClipboard => {
                let event = match self.clipboard().and_then(|c| c.read()) {
                    Ok(payload) => ConsoleEvent::Paste(payload),
                    Err(ClipboardError::Empty) => {
                        ConsoleEvent::PasteFailed("No image or text in clipboard".to_string())
                    }
                    Err(e) => ConsoleEvent::PasteFailed(e.to_string()),
                };
                Self::post(&self.tx, event);
            }
            Effect::RunOcr(image) => {
                let ocr = Arc::clone(&self.services.ocr);
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = ocr.recognize(&image).await;
                    Self::post(&tx, ConsoleEvent::OcrFinished(result));
                });
            }
            Effect::RunSearch { generation, query } => {
                self.cancel_search();
                let aggregator = self.services.aggregator.clone();
                let tx = self.tx.clone();
                self.search_task = Some(tokio::spawn(async move {
                    let report = aggregator.run(&query).await;
                    Self::post(&tx, ConsoleEvent::SearchFinished { generation, report });
                }));
            }
            Effect::CancelSearch => self.cancel_search(),
            Effect::Resolve {
                generation,
                identifier,
            } => {
                let resolver = self.services.resolver.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = resolver.resolve(&identifier).await;
                    Self::post(&tx, ConsoleEvent::RecordResolved { generation, result });
                });
            }
            Effect::CopyToClipboard(text) => {
                let result = self
                    .clipboard()
                    .and_then(|c| c.copy_text(&text))
                    .map_err(|e| e.to_string());
                Self::post(&self.tx, ConsoleEvent::CopyFinished(result));
            }
            Effect::RecordHistory { kind, text } => {
                if let Some(store) = &self.services.history {
                    if let Err(e) = store.append(kind, &text) {
                        tracing::warn!("Failed to record history: {}", e);
                    }
                }
            }
            Effect::Exit => {}
        }
    }

    fn cancel_search(&mut self) {
        if let Some(task) = self.search_task.take() {
            task.abort();
        }
    }
}

/// Run the interactive console until the user exits.
///
/// Returns the BibTeX entries resolved during the session.
pub async fn run_console(
    mut session: ConsoleSession,
    services: ConsoleServices,
) -> io::Result<Vec<String>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let running = Arc::new(AtomicBool::new(true));

    let guard = TerminalGuard::enter()?;
    spawn_input_reader(tx.clone(), Arc::clone(&running));

    let mut driver = Driver {
        services,
        clipboard: None,
        search_task: None,
        tx,
    };

    let outcome = loop {
        if let Err(e) = draw(&session) {
            break Err(e);
        }

        let Some(message) = rx.recv().await else {
            break Ok(());
        };
        match message {
            DriverMessage::Session(event) => {
                for effect in session.handle(event) {
                    driver.apply(effect);
                }
            }
            DriverMessage::Redraw => {}
            DriverMessage::InputClosed(reason) => {
                break Err(io::Error::new(io::ErrorKind::Other, reason));
            }
        }

        if session.is_exiting() {
            break Ok(());
        }
    };

    running.store(false, Ordering::Relaxed);
    driver.cancel_search();
    drop(guard);

    outcome.map(|()| session.resolved_entries().to_vec())
}
