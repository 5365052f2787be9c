//! Recall of previously committed queries.

/// In-memory query history with shell-style navigation.
///
/// While navigating, the text being edited before the first recall is kept
/// as a draft and restored when moving past the newest entry. Edits made to
/// a recalled entry are written back into it.
#[derive(Debug, Clone)]
pub struct InputHistory {
    entries: Vec<String>,
    max_entries: usize,
    index: Option<usize>,
    draft: Option<String>,
}

impl InputHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max_entries.max(1),
            index: None,
            draft: None,
        }
    }

    /// History preloaded with `entries`, oldest first
    pub fn with_entries<I, S>(entries: I, max_entries: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut history = Self::new(max_entries);
        for entry in entries {
            history.push(entry);
        }
        history
    }

    /// Record a committed query.
    ///
    /// Blank entries and repeats of the newest entry are skipped; returns
    /// whether the entry was added. Navigation state is reset either way.
    pub fn push(&mut self, entry: impl Into<String>) -> bool {
        self.reset_navigation();

        let entry = entry.into();
        if entry.trim().is_empty() || self.entries.last() == Some(&entry) {
            return false;
        }

        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
        true
    }

    /// Step back to an older entry; `current` is the text being edited.
    ///
    /// Returns `None` when there is nothing older.
    pub fn previous(&mut self, current: &str) -> Option<String> {
        let target = match self.index {
            None => {
                if self.entries.is_empty() {
                    return None;
                }
                self.draft = Some(current.to_string());
                self.entries.len() - 1
            }
            Some(0) => {
                self.entries[0] = current.to_string();
                return None;
            }
            Some(index) => {
                self.entries[index] = current.to_string();
                index - 1
            }
        };

        self.index = Some(target);
        Some(self.entries[target].clone())
    }

    /// Step forward to a newer entry, or back to the draft past the newest.
    ///
    /// Returns `None` when not navigating.
    pub fn next(&mut self, current: &str) -> Option<String> {
        let index = self.index?;
        self.entries[index] = current.to_string();

        if index + 1 < self.entries.len() {
            self.index = Some(index + 1);
            Some(self.entries[index + 1].clone())
        } else {
            self.index = None;
            Some(self.draft.take().unwrap_or_default())
        }
    }

    /// Forget the navigation position and draft
    pub fn reset_navigation(&mut self) {
        self.index = None;
        self.draft = None;
    }

    pub fn is_navigating(&self) -> bool {
        self.index.is_some()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InputHistory {
    fn default() -> Self {
        Self::new(200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_skips_consecutive_duplicates() {
        let mut history = InputHistory::new(10);
        assert!(history.push("a"));
        assert!(!history.push("a"));
        assert!(history.push("b"));
        assert!(history.push("a"));
        assert!(!history.push("   "));
        assert_eq!(history.entries(), &["a", "b", "a"]);
    }

    #[test]
    fn test_push_trims_oldest() {
        let history = InputHistory::with_entries(["1", "2", "3", "4"], 3);
        assert_eq!(history.entries(), &["2", "3", "4"]);
    }

    #[test]
    fn test_navigation_restores_draft() {
        let mut history = InputHistory::with_entries(["first", "second"], 10);

        assert_eq!(history.previous("draft").as_deref(), Some("second"));
        assert_eq!(history.previous("second").as_deref(), Some("first"));
        assert_eq!(history.previous("first"), None);
        assert_eq!(history.next("first").as_deref(), Some("second"));
        assert_eq!(history.next("second").as_deref(), Some("draft"));
        assert!(!history.is_navigating());
        assert_eq!(history.next("draft"), None);
    }

    #[test]
    fn test_edits_written_back() {
        let mut history = InputHistory::with_entries(["first", "second"], 10);

        history.previous("");
        history.previous("second edited");
        assert_eq!(history.entries(), &["first", "second edited"]);
    }

    #[test]
    fn test_previous_on_empty_history() {
        let mut history = InputHistory::new(10);
        assert_eq!(history.previous("text"), None);
        assert!(!history.is_navigating());
    }
}
