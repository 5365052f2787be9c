//! Ordered, DOI-deduplicated result list with a selection cursor.

use std::collections::HashSet;

use super::SearchResult;

/// Results for one query, in display order.
///
/// No two entries share a non-empty DOI; the first occurrence wins.
/// Results without a DOI are never deduplicated against each other.
#[derive(Debug, Clone, Default)]
pub struct ResultList {
    results: Vec<SearchResult>,
    seen_dois: HashSet<String>,
    selected: usize,
}

impl ResultList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result unless its DOI is already present.
    ///
    /// Returns `false` when the result was dropped as a duplicate.
    pub fn push(&mut self, result: SearchResult) -> bool {
        if let Some(doi) = result.doi() {
            if !self.seen_dois.insert(doi.to_lowercase()) {
                return false;
            }
        }
        self.results.push(result);
        true
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SearchResult> {
        self.results.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchResult> {
        self.results.iter()
    }

    /// Keep at most `max` entries
    pub fn truncate(&mut self, max: usize) {
        for dropped in self.results.drain(max.min(self.results.len())..) {
            if let Some(doi) = dropped.doi() {
                self.seen_dois.remove(&doi.to_lowercase());
            }
        }
        self.selected = self.selected.min(self.results.len().saturating_sub(1));
    }

    /// Index of the highlighted entry
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// The highlighted entry, if the list is non-empty
    pub fn selected(&self) -> Option<&SearchResult> {
        self.results.get(self.selected)
    }

    /// Move the selection by `delta`, clamped to `[0, len - 1]`
    pub fn move_selection(&mut self, delta: isize) {
        if self.results.is_empty() {
            return;
        }
        let last = self.results.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }
}

impl FromIterator<SearchResult> for ResultList {
    fn from_iter<T: IntoIterator<Item = SearchResult>>(iter: T) -> Self {
        let mut list = ResultList::new();
        for result in iter {
            list.push(result);
        }
        list
    }
}

impl IntoIterator for ResultList {
    type Item = SearchResult;
    type IntoIter = std::vec::IntoIter<SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SearchResultBuilder, SourceType};

    fn result(title: &str, doi: Option<&str>) -> SearchResult {
        let builder = SearchResultBuilder::new(title, SourceType::CrossRef);
        match doi {
            Some(doi) => builder.doi(doi).build(),
            None => builder.build(),
        }
    }

    #[test]
    fn test_duplicate_doi_dropped() {
        let mut list = ResultList::new();
        assert!(list.push(result("first", Some("10.1/abc"))));
        assert!(!list.push(result("second", Some("10.1/ABC"))));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).unwrap().title(), "first");
    }

    #[test]
    fn test_missing_doi_never_deduplicated() {
        let list: ResultList = vec![result("a", None), result("a", None)].into_iter().collect();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_selection_clamped() {
        let mut list: ResultList = vec![result("a", None), result("b", None), result("c", None)]
            .into_iter()
            .collect();

        list.move_selection(-1);
        assert_eq!(list.selected_index(), 0);

        list.move_selection(5);
        assert_eq!(list.selected_index(), 2);
        assert_eq!(list.selected().unwrap().title(), "c");
    }

    #[test]
    fn test_truncate_releases_dois() {
        let mut list: ResultList = vec![result("a", Some("10.1/a")), result("b", Some("10.1/b"))]
            .into_iter()
            .collect();
        list.truncate(1);
        assert_eq!(list.len(), 1);
        assert!(list.push(result("b again", Some("10.1/b"))));
    }

    #[test]
    fn test_empty_list_selection() {
        let mut list = ResultList::new();
        list.move_selection(1);
        assert!(list.selected().is_none());
        assert_eq!(list.selected_index(), 0);
    }
}
