/// A documented, already-triaged issue matching a user-reported error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnownIssue {
    pub title: String,
    pub reference_url: Option<String>,
}

/// Lookup seam for matching free-text error reports against known issues.
///
/// The production deployment currently ships the empty index; the trait exists
/// so a real index can be plugged in without touching router logic.
pub trait KnownIssueIndex: Send + Sync {
    fn lookup(&self, query: &str) -> Option<KnownIssue>;
}

/// No known issues: every lookup reports not-found.
#[derive(Default)]
pub struct EmptyKnownIssueIndex;

impl KnownIssueIndex for EmptyKnownIssueIndex {
    fn lookup(&self, _query: &str) -> Option<KnownIssue> {
        None
    }
}

/// Case-insensitive substring matching over a fixed entry list.
pub struct StaticKnownIssueIndex {
    entries: Vec<(String, KnownIssue)>,
}

impl StaticKnownIssueIndex {
    pub fn new(entries: Vec<(String, KnownIssue)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(pattern, issue)| (pattern.to_ascii_lowercase(), issue))
                .collect(),
        }
    }
}

impl KnownIssueIndex for StaticKnownIssueIndex {
    fn lookup(&self, query: &str) -> Option<KnownIssue> {
        let normalized = query.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .find(|(pattern, _)| normalized.contains(pattern.as_str()))
            .map(|(_, issue)| issue.clone())
    }
}
