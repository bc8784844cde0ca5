//! Keeps the committed draft on disk so an unsent message survives a restart.

use std::io;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;

use crate::atomic_write::write_atomic_text;

#[derive(Debug, Clone)]
pub struct DraftFile {
    path: PathBuf,
    /// Last text written (or loaded), used to skip redundant writes.
    last_saved: String,
}

impl DraftFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_saved: String::new(),
        }
    }

    /// Read the saved draft. A missing file is an empty draft.
    pub fn load(&mut self) -> anyhow::Result<String> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("read {}", self.path.display()));
            }
        };
        self.last_saved.clone_from(&text);
        Ok(text)
    }

    /// Persist `text` if it differs from what is on disk. An empty draft removes the file.
    pub fn save(&mut self, text: &str) -> anyhow::Result<bool> {
        if text == self.last_saved {
            return Ok(false);
        }
        if text.is_empty() {
            remove_if_exists(&self.path)?;
        } else {
            write_atomic_text(&self.path, text)?;
        }
        self.last_saved = text.to_string();
        tracing::debug!(bytes = text.len(), "saved draft");
        Ok(true)
    }
}

pub fn default_draft_path(home: &Path) -> PathBuf {
    home.join(".draftpad").join("draft.txt")
}

fn remove_if_exists(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("remove {}", path.display())),
    }
}
