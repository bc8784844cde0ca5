//! Older/newer stepping through session history, then global history.
//!
//! Idle is represented by the absence of a [`Navigation`]; the composer stores one only while
//! the user is browsing. Global indices address [`HistorySources::global_only`], so an entry that
//! appears in both sources is visited once.

use super::history_sources::HistorySources;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPosition {
    Local(usize),
    Global(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    position: HistoryPosition,
    /// Draft that was live when browsing started; restored when stepping back past the newest
    /// entry.
    saved_draft: String,
}

/// Result of a "newer" step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewerStep {
    /// Still browsing; show `text`.
    Moved { navigation: Navigation, text: String },
    /// Browsing ended; show the saved draft again.
    Restored(String),
}

impl Navigation {
    /// First "older" step from Idle. Returns `None` when there is no history at all.
    pub fn start(live_draft: &str, sources: &HistorySources<'_>) -> Option<(Self, String)> {
        let position = if !sources.session().is_empty() {
            HistoryPosition::Local(0)
        } else if !sources.global_only().is_empty() {
            HistoryPosition::Global(0)
        } else {
            return None;
        };
        let navigation = Self {
            position,
            saved_draft: live_draft.to_string(),
        };
        let text = navigation.entry(sources)?;
        Some((navigation, text))
    }

    pub fn position(&self) -> HistoryPosition {
        self.position
    }

    pub fn saved_draft(&self) -> &str {
        &self.saved_draft
    }

    /// Step toward older entries. Returns the entry to show, or `None` when already at the
    /// oldest entry.
    pub fn older(&mut self, sources: &HistorySources<'_>) -> Option<String> {
        let session_len = sources.session().len();
        let global_len = sources.global_only().len();
        let next = match self.position {
            HistoryPosition::Local(i) if i + 1 < session_len => HistoryPosition::Local(i + 1),
            HistoryPosition::Local(_) if global_len > 0 => HistoryPosition::Global(0),
            HistoryPosition::Global(i) if i + 1 < global_len => HistoryPosition::Global(i + 1),
            _ => return None,
        };
        self.position = next;
        self.entry(sources)
    }

    /// Step toward newer entries, ending at the saved draft.
    pub fn newer(self, sources: &HistorySources<'_>) -> NewerStep {
        let session_len = sources.session().len();
        let next = match self.position {
            HistoryPosition::Local(i) if i > 0 => HistoryPosition::Local(i - 1),
            HistoryPosition::Global(i) if i > 0 => HistoryPosition::Global(i - 1),
            HistoryPosition::Global(0) if session_len > 0 => {
                HistoryPosition::Local(session_len - 1)
            }
            _ => return NewerStep::Restored(self.saved_draft),
        };
        let navigation = Self {
            position: next,
            saved_draft: self.saved_draft,
        };
        match navigation.entry(sources) {
            Some(text) => NewerStep::Moved { navigation, text },
            // The sources shrank underneath us; fall back to the live draft.
            None => NewerStep::Restored(navigation.saved_draft),
        }
    }

    fn entry(&self, sources: &HistorySources<'_>) -> Option<String> {
        match self.position {
            HistoryPosition::Local(i) => sources.session().get(i).cloned(),
            HistoryPosition::Global(i) => sources
                .global_only()
                .get(i)
                .map(|entry| (*entry).to_string()),
        }
    }
}
