//! Debounced draft storage.
//!
//! The composer keeps two copies of the draft:
//!
//! - `display_text` follows every keystroke and is what gets rendered.
//! - `committed_text` trails it and only changes once input has been quiet for the debounce
//!   window. Consumers that must not run on every keystroke (draft persistence, submission) read
//!   this copy.
//!
//! The pending commit is a deadline owned by the store rather than a spawned timer. The event
//! loop wakes at [`DraftStore::next_deadline`] and calls [`DraftStore::commit_if_due`], so a
//! cancelled or disposed store can never be written to after the fact.

use std::time::Duration;
use std::time::Instant;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Debug)]
pub struct DraftStore {
    display_text: String,
    committed_text: String,
    debounce: Duration,
    /// Deadline of the scheduled trailing-edge commit, if any.
    commit_due_at: Option<Instant>,
    disposed: bool,
}

impl DraftStore {
    pub fn new(debounce: Duration) -> Self {
        Self {
            display_text: String::new(),
            committed_text: String::new(),
            debounce,
            commit_due_at: None,
            disposed: false,
        }
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn committed_text(&self) -> &str {
        &self.committed_text
    }

    /// Record a keystroke-level change. The display copy updates now; the committed copy follows
    /// once `debounce` has elapsed without another update.
    pub fn update(&mut self, raw_text: String, now: Instant) {
        self.display_text = raw_text;
        if self.disposed {
            return;
        }
        self.commit_due_at = Some(now + self.debounce);
    }

    /// Set both copies immediately and drop any scheduled commit.
    pub fn force_set(&mut self, text: String) {
        self.commit_due_at = None;
        self.committed_text.clone_from(&text);
        self.display_text = text;
    }

    /// Apply the scheduled commit if its deadline has passed. Returns `true` when the committed
    /// text changed.
    pub fn commit_if_due(&mut self, now: Instant) -> bool {
        match self.commit_due_at {
            Some(due_at) if now >= due_at => self.commit_now(),
            _ => false,
        }
    }

    /// Commit immediately if a commit is scheduled.
    pub fn flush(&mut self) -> bool {
        if self.commit_due_at.is_some() {
            self.commit_now()
        } else {
            false
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.commit_due_at
    }

    /// Cancel scheduled work for good. Later updates still change the display copy but never
    /// schedule another commit.
    pub fn dispose(&mut self) {
        self.commit_due_at = None;
        self.disposed = true;
    }

    fn commit_now(&mut self) -> bool {
        self.commit_due_at = None;
        if self.committed_text == self.display_text {
            return false;
        }
        self.committed_text.clone_from(&self.display_text);
        true
    }
}
