//! Merges session-scoped and persisted history into the view used by navigation and search.

/// Borrowed snapshot of both history sources.
///
/// Built fresh for every navigation or search step; either source can change between steps
/// (a submission lands in the session list, Ctrl+C records a draft in the global store).
#[derive(Debug, Clone, Copy)]
pub struct HistorySources<'a> {
    session: &'a [String],
    global: &'a [String],
}

impl<'a> HistorySources<'a> {
    /// `session` is used in the order the caller supplies it; `global` in the order the history
    /// store returns it (most recent first).
    pub fn new(session: &'a [String], global: &'a [String]) -> Self {
        Self { session, global }
    }

    pub fn session(&self) -> &'a [String] {
        self.session
    }

    /// Global entries that do not exactly match any session entry, in store order.
    pub fn global_only(&self) -> Vec<&'a str> {
        self.global
            .iter()
            .filter(|entry| !self.session.contains(entry))
            .map(String::as_str)
            .collect()
    }

    /// Session entries followed by the global entries not already present in the session.
    pub fn combined(&self) -> Vec<&'a str> {
        let mut combined: Vec<&'a str> = self.session.iter().map(String::as_str).collect();
        combined.extend(self.global_only());
        combined
    }

    pub fn is_empty(&self) -> bool {
        self.session.is_empty() && self.global.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn global_duplicates_of_session_entries_are_dropped() {
        let session = strings(&["a", "b"]);
        let global = strings(&["b", "c"]);
        let sources = HistorySources::new(&session, &global);
        assert_eq!(sources.combined(), vec!["a", "b", "c"]);
        assert_eq!(sources.global_only(), vec!["c"]);
    }

    #[test]
    fn source_order_is_preserved_without_sorting() {
        let session = strings(&["zeta", "alpha"]);
        let global = strings(&["mid", "alpha", "beta", "mid"]);
        let sources = HistorySources::new(&session, &global);
        // Repeats inside the global store itself are kept; only session matches are removed.
        assert_eq!(sources.combined(), vec!["zeta", "alpha", "mid", "beta", "mid"]);
    }

    #[test]
    fn matching_is_exact() {
        let session = strings(&["Fix the build"]);
        let global = strings(&["fix the build", "Fix the build "]);
        let sources = HistorySources::new(&session, &global);
        assert_eq!(
            sources.combined(),
            vec!["Fix the build", "fix the build", "Fix the build "]
        );
    }

    #[test]
    fn empty_sources() {
        let sources = HistorySources::new(&[], &[]);
        assert!(sources.is_empty());
        assert!(sources.combined().is_empty());
    }
}
