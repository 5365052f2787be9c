//! Persistent record of committed queries.
//!
//! One JSON object per line in `<data dir>/bibhunt/history.jsonl`, oldest
//! first. The console reloads the newest entries at start.

use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;

/// What a committed query was submitted as
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryEntryKind {
    Title,
    Doi,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub kind: HistoryEntryKind,
    /// Seconds since the Unix epoch
    pub committed_at: u64,
    pub query: String,
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Store in the platform data directory, when there is one
    pub fn new() -> Option<Self> {
        dirs::data_dir().map(|dir| Self::at(dir.join(env!("CARGO_PKG_NAME")).join("history.jsonl")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one committed query
    pub fn append(&self, kind: HistoryEntryKind, query: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let entry = HistoryEntry {
            kind,
            committed_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            query: query.to_string(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())
    }

    /// The newest `limit` entries, oldest first.
    ///
    /// A missing file is an empty history; unreadable lines are skipped.
    pub fn load(&self, limit: usize) -> io::Result<Vec<HistoryEntry>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries: Vec<HistoryEntry> = content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let excess = entries.len().saturating_sub(limit);
        entries.drain(..excess);
        Ok(entries)
    }

    /// Rewrite the file keeping only the newest `limit` entries.
    ///
    /// The new content is written to a sibling temp file and renamed over
    /// the old one, so an interrupted rewrite leaves the old history intact.
    /// Returns the loaded entries, so the console can start from them.
    pub fn compact(&self, limit: usize) -> io::Result<Vec<HistoryEntry>> {
        let entries = self.load(limit)?;
        if !self.path.exists() {
            return Ok(entries);
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        for entry in &entries {
            serde_json::to_writer(&mut file, entry)?;
            file.write_all(b"\n")?;
        }
        file.as_file().sync_all()?;
        file.persist(&self.path)?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn queries(entries: &[HistoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.query.as_str()).collect()
    }

    #[test]
    fn test_append_then_load_newest() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::at(dir.path().join("nested").join("history.jsonl"));

        store.append(HistoryEntryKind::Title, "deep residual learning").unwrap();
        store.append(HistoryEntryKind::Doi, "10.1109/cvpr.2016.90").unwrap();
        store.append(HistoryEntryKind::Title, "attention is all you need").unwrap();

        let entries = store.load(2).unwrap();
        assert_eq!(queries(&entries), vec!["10.1109/cvpr.2016.90", "attention is all you need"]);
        assert_eq!(entries[0].kind, HistoryEntryKind::Doi);
        assert!(entries[0].committed_at > 0);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::at(dir.path().join("missing.jsonl"));
        assert!(store.load(10).unwrap().is_empty());
        assert!(store.compact(10).unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_unreadable_lines_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        fs::write(
            &path,
            "garbage\n{\"kind\":\"title\",\"committed_at\":1,\"query\":\"kept\"}\n{\"kind\":\"isbn\"}\n",
        )
        .unwrap();

        let entries = HistoryStore::at(&path).load(10).unwrap();
        assert_eq!(queries(&entries), vec!["kept"]);
    }

    #[test]
    fn test_compact_drops_oldest() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::at(dir.path().join("history.jsonl"));
        for i in 0..5 {
            store.append(HistoryEntryKind::Title, &format!("query {}", i)).unwrap();
        }

        let kept = store.compact(2).unwrap();
        assert_eq!(queries(&kept), vec!["query 3", "query 4"]);
        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(store.load(10).unwrap(), kept);
    }

    #[test]
    fn test_compact_replaces_file_without_leftovers() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::at(dir.path().join("history.jsonl"));
        for i in 0..3 {
            store.append(HistoryEntryKind::Title, &format!("query {}", i)).unwrap();
        }

        store.compact(1).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("history.jsonl")]);

        store.append(HistoryEntryKind::Doi, "10.1/after").unwrap();
        assert_eq!(queries(&store.load(10).unwrap()), vec!["query 2", "10.1/after"]);
    }
}
