//! Result navigation: browse the merged list, view an abstract, pick one.

use crate::editor::Key;
use crate::models::{ResultList, SearchResult};

/// Navigator state. `Selected` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigatorState {
    Browsing,
    ViewingAbstract,
    Selected,
    Cancelled,
}

impl NavigatorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NavigatorState::Selected | NavigatorState::Cancelled)
    }
}

/// Input to the navigator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    Up,
    Down,
    ShowAbstract,
    Back,
    Confirm,
    Cancel,
}

impl NavEvent {
    /// Key binding used by the console
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::Up | Key::Char('k') => Some(NavEvent::Up),
            Key::Down | Key::Char('j') => Some(NavEvent::Down),
            Key::Char(' ') => Some(NavEvent::ShowAbstract),
            Key::Enter => Some(NavEvent::Confirm),
            Key::Backspace => Some(NavEvent::Back),
            Key::Esc | Key::Char('q') | Key::Ctrl('c') | Key::Ctrl('d') => Some(NavEvent::Cancel),
            _ => None,
        }
    }
}

/// State machine over one query's results
#[derive(Debug, Clone)]
pub struct ResultNavigator {
    results: ResultList,
    state: NavigatorState,
}

impl ResultNavigator {
    pub fn new(results: ResultList) -> Self {
        Self {
            results,
            state: NavigatorState::Browsing,
        }
    }

    pub fn state(&self) -> NavigatorState {
        self.state
    }

    pub fn results(&self) -> &ResultList {
        &self.results
    }

    pub fn selected_index(&self) -> usize {
        self.results.selected_index()
    }

    /// Highlighted result
    pub fn current(&self) -> Option<&SearchResult> {
        self.results.selected()
    }

    /// The chosen result once the state is `Selected`
    pub fn selection(&self) -> Option<&SearchResult> {
        match self.state {
            NavigatorState::Selected => self.results.selected(),
            _ => None,
        }
    }

    /// Apply one event and return the new state.
    ///
    /// Events that do not apply in the current state are no-ops.
    pub fn handle(&mut self, event: NavEvent) -> NavigatorState {
        let next = match (self.state, event) {
            (NavigatorState::Browsing, NavEvent::Up) => {
                self.results.move_selection(-1);
                NavigatorState::Browsing
            }
            (NavigatorState::Browsing, NavEvent::Down) => {
                self.results.move_selection(1);
                NavigatorState::Browsing
            }
            (NavigatorState::Browsing, NavEvent::ShowAbstract) => {
                if self.current().is_some_and(SearchResult::has_abstract) {
                    NavigatorState::ViewingAbstract
                } else {
                    NavigatorState::Browsing
                }
            }
            (NavigatorState::Browsing, NavEvent::Confirm) if !self.results.is_empty() => {
                NavigatorState::Selected
            }
            (NavigatorState::Browsing, NavEvent::Cancel) => NavigatorState::Cancelled,
            (NavigatorState::ViewingAbstract, NavEvent::Back | NavEvent::Cancel) => {
                NavigatorState::Browsing
            }
            (state, _) => state,
        };

        if next != self.state {
            tracing::debug!("Navigator {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        next
    }
}
