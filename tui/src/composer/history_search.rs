//! Incremental reverse search over the combined history.

use super::history_sources::HistorySources;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSession {
    query: String,
    results: Vec<String>,
    selected: usize,
    original_draft: String,
}

impl SearchSession {
    /// Open a search over every history entry. The caller displays [`Self::displayed_text`].
    pub fn open(original_draft: &str, sources: &HistorySources<'_>) -> Self {
        Self {
            query: String::new(),
            results: owned(sources.combined()),
            selected: 0,
            original_draft: original_draft.to_string(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[String] {
        &self.results
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn original_draft(&self) -> &str {
        &self.original_draft
    }

    /// What the draft should show right now: the selected match, or the original draft when
    /// nothing matches.
    pub fn displayed_text(&self) -> &str {
        self.results
            .get(self.selected)
            .map_or(self.original_draft.as_str(), String::as_str)
    }

    pub fn push_query(&mut self, text: &str, sources: &HistorySources<'_>) {
        self.query.push_str(text);
        self.refilter(sources);
    }

    /// Remove the last character of the query. Returns `false` when the query was already empty.
    pub fn pop_query(&mut self, sources: &HistorySources<'_>) -> bool {
        if self.query.pop().is_none() {
            return false;
        }
        self.refilter(sources);
        true
    }

    pub fn select_next(&mut self) {
        self.cycle(1);
    }

    pub fn select_previous(&mut self) {
        self.cycle(-1);
    }

    /// Close the session. Confirm and cancel both land here and hand back the original draft.
    pub fn finish(self) -> String {
        self.original_draft
    }

    fn refilter(&mut self, sources: &HistorySources<'_>) {
        let needle = self.query.to_lowercase();
        self.results = owned(
            sources
                .combined()
                .into_iter()
                .filter(|entry| needle.is_empty() || entry.to_lowercase().contains(&needle))
                .collect(),
        );
        self.selected = 0;
    }

    fn cycle(&mut self, delta: isize) {
        let len = self.results.len() as isize;
        if len == 0 {
            return;
        }
        self.selected = ((self.selected as isize + delta + len) % len) as usize;
    }
}

fn owned(entries: Vec<&str>) -> Vec<String> {
    entries.into_iter().map(str::to_string).collect()
}
