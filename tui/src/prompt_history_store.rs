//! Persistent prompt history backed by a JSONL file.
//!
//! Each line is `{"ts": <unix secs>, "text": "<message>"}`. The file is capped at
//! [`MAX_ENTRIES`] and rewritten atomically on every append.

use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

use crate::atomic_write::write_atomic_text;
use crate::services::HistoryStore;

const MAX_ENTRIES: usize = 500;

pub struct PromptHistoryStore {
    path: Option<PathBuf>,
    /// Oldest first, as stored on disk.
    entries: Vec<HistoryEntry>,
}

impl PromptHistoryStore {
    /// Create a store backed by `path`. When `path` is `None`, persistence is disabled and the
    /// store is purely in-memory.
    pub fn new_with_path(path: Option<PathBuf>) -> Self {
        let mut entries = Vec::new();
        if let Some(path) = path.as_deref() {
            let (loaded, needs_truncate) = load_history_entries(path);
            entries = loaded;
            if needs_truncate && let Err(err) = persist_history(path, &entries) {
                tracing::warn!("failed to truncate prompt history: {err:#}");
            }
        }
        Self { path, entries }
    }
}

impl HistoryStore for PromptHistoryStore {
    /// Record a message as typed. Blank messages and consecutive duplicates are skipped.
    fn append_message(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        if self.entries.last().is_some_and(|prev| prev.text == text) {
            return;
        }

        self.entries.push(HistoryEntry {
            ts: unix_timestamp_secs(),
            text: text.to_string(),
        });
        if self.entries.len() > MAX_ENTRIES {
            let drop_count = self.entries.len() - MAX_ENTRIES;
            self.entries.drain(0..drop_count);
        }

        let Some(path) = self.path.as_deref() else {
            return;
        };
        if let Err(err) = persist_history(path, &self.entries) {
            tracing::warn!(
                "failed to persist prompt history to {}: {err:#}",
                path.display()
            );
        }
    }

    fn recent_messages(&self) -> Vec<String> {
        self.entries
            .iter()
            .rev()
            .map(|entry| entry.text.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryEntry {
    ts: u64,
    text: String,
}

fn unix_timestamp_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn default_history_path(home: &Path) -> PathBuf {
    home.join(".draftpad").join("history.jsonl")
}

fn load_history_entries(path: &Path) -> (Vec<HistoryEntry>, bool) {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return (Vec::new(), false),
        Err(err) => {
            tracing::warn!(
                "failed to read prompt history from {}: {err}",
                path.display()
            );
            return (Vec::new(), false);
        }
    };

    let mut out: Vec<HistoryEntry> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str::<HistoryEntry>(line).ok())
        .filter(|entry| !entry.text.is_empty())
        .collect();

    if out.len() <= MAX_ENTRIES {
        return (out, false);
    }
    let start = out.len() - MAX_ENTRIES;
    (out.split_off(start), true)
}

fn persist_history(path: &Path, entries: &[HistoryEntry]) -> anyhow::Result<()> {
    let mut contents = String::new();
    for entry in entries {
        contents.push_str(&serde_json::to_string(entry)?);
        contents.push('\n');
    }
    write_atomic_text(path, &contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn append_skips_blank_and_consecutive_duplicates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store =
            PromptHistoryStore::new_with_path(Some(dir.path().join("history.jsonl")));

        store.append_message("");
        store.append_message("  \n");
        store.append_message("hello");
        store.append_message("hello");
        store.append_message("world");
        store.append_message("hello");

        assert_eq!(store.recent_messages(), vec!["hello", "world", "hello"]);
    }

    #[test]
    fn keeps_text_untrimmed() {
        let mut store = PromptHistoryStore::new_with_path(None);
        store.append_message("  indented\n");
        assert_eq!(store.recent_messages(), vec!["  indented\n"]);
    }

    #[test]
    fn reloads_from_disk_most_recent_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.jsonl");
        {
            let mut store = PromptHistoryStore::new_with_path(Some(path.clone()));
            store.append_message("first");
            store.append_message("second");
        }

        let store = PromptHistoryStore::new_with_path(Some(path));
        assert_eq!(store.recent_messages(), vec!["second", "first"]);
    }

    #[test]
    fn skips_malformed_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.jsonl");
        std::fs::write(
            &path,
            "{\"ts\":1,\"text\":\"ok\"}\nnot json\n\n{\"ts\":2,\"text\":\"\"}\n",
        )
        .expect("seed history");

        let store = PromptHistoryStore::new_with_path(Some(path));
        assert_eq!(store.recent_messages(), vec!["ok"]);
    }

    #[test]
    fn persists_and_truncates_to_max_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.jsonl");

        let mut store = PromptHistoryStore::new_with_path(Some(path.clone()));
        for idx in 0..(MAX_ENTRIES + 10) {
            store.append_message(&format!("cmd {idx}"));
        }
        assert_eq!(store.recent_messages().len(), MAX_ENTRIES);

        let contents = std::fs::read_to_string(&path).expect("read history");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), MAX_ENTRIES);

        let first: HistoryEntry = serde_json::from_str(lines[0]).expect("decode json");
        assert_eq!(first.text, "cmd 10");
        let last: HistoryEntry =
            serde_json::from_str(lines[MAX_ENTRIES - 1]).expect("decode json");
        assert_eq!(last.text, format!("cmd {}", MAX_ENTRIES + 9));
    }
}
