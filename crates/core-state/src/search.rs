//! Search state.
//!
//! Holds the live query, direction, last committed match, and a bounded
//! history. The actual scan reuses [`core_text::Searcher`] (KMP over the
//! buffer's byte streams) — this module only adds case-smart query
//! resolution and the forward/backward wraparound-with-skip-cursor rule.

use core_text::Searcher;
use core_text::tree::Tree;

const HISTORY_CAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    Backward,
}

impl SearchDirection {
    pub fn reversed(self) -> Self {
        match self {
            SearchDirection::Forward => SearchDirection::Backward,
            SearchDirection::Backward => SearchDirection::Forward,
        }
    }
}

/// A located match, in character-position units (half-open span).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub start: usize,
    pub end: usize,
}

/// One of the four ways a committed search can conclude. The dispatcher
/// interprets this against the active buffer; this crate only names the
/// choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCompletion {
    MoveCursor,
    DeleteToMatch,
    ChangeToMatch,
    CopyToMatch,
}

/// Strip a trailing `\C`/`\c` case override and decide case-sensitivity:
/// implicitly case-insensitive if the remaining query is all-lowercase,
/// case-sensitive otherwise, unless overridden.
pub fn resolve_case_sensitivity(raw_query: &str) -> (String, bool) {
    if let Some(stripped) = raw_query.strip_suffix("\\C") {
        return (stripped.to_string(), true);
    }
    if let Some(stripped) = raw_query.strip_suffix("\\c") {
        return (stripped.to_string(), false);
    }
    let case_sensitive = raw_query.chars().any(|c| c.is_uppercase());
    (raw_query.to_string(), case_sensitive)
}

/// Locate the next/previous match from `origin`, applying forward wraparound
/// (backward "wraparound" is simply the rightmost match in the document — see
/// `DESIGN.md`'s Open Question decision) and the "a match exactly on the
/// cursor is never returned" rule: forward scans start at `origin + 1`;
/// backward scans read the reverse stream starting at `origin`, which by
/// construction never yields a match covering `origin` itself.
pub fn find_match(
    tree: &Tree,
    raw_query: &str,
    origin: usize,
    direction: SearchDirection,
) -> Option<SearchMatch> {
    let (query, case_sensitive) = resolve_case_sensitivity(raw_query);
    if query.is_empty() {
        return None;
    }
    let pattern_len = query.chars().count();
    let folded_pattern = if case_sensitive {
        query.clone()
    } else {
        query.to_lowercase()
    };
    let searcher = Searcher::new(&folded_pattern);
    let num_chars = tree.num_chars();
    match direction {
        SearchDirection::Forward => {
            let start = (origin + 1).min(num_chars);
            let fwd = fold_reader(tree.reader_at_position(start), case_sensitive);
            if let Some(pos) = searcher.next_in_reader(start, fwd, None) {
                return Some(SearchMatch {
                    start: pos,
                    end: pos + pattern_len,
                });
            }
            // Wrap around: scan from the top, permitted to land back on the
            // original cursor if it is the only occurrence.
            let limit = origin + 1;
            let wrapped = fold_reader(tree.reader_at_position(0), case_sensitive);
            searcher
                .next_in_reader(0, wrapped, Some(limit))
                .map(|pos| SearchMatch {
                    start: pos,
                    end: pos + pattern_len,
                })
        }
        SearchDirection::Backward => {
            let rev = fold_reader(tree.reverse_reader_at_position(origin), case_sensitive);
            if let Some(pos) = searcher.last_in_reader(origin, rev, None) {
                return Some(SearchMatch {
                    start: pos,
                    end: pos + pattern_len,
                });
            }
            // Wrap around: rightmost match anywhere in the document.
            let rev_full = fold_reader(tree.reverse_reader_at_position(num_chars), case_sensitive);
            searcher
                .last_in_reader(num_chars, rev_full, None)
                .map(|pos| SearchMatch {
                    start: pos,
                    end: pos + pattern_len,
                })
        }
    }
}

fn fold_reader(
    reader: impl Iterator<Item = u8>,
    case_sensitive: bool,
) -> impl Iterator<Item = u8> {
    reader.map(move |b| if case_sensitive { b } else { b.to_ascii_lowercase() })
}

/// Editor-owned search state: live query, direction, last committed match,
/// and a bounded history with duplicate-adjacent and empty entries
/// suppressed.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    query: String,
    direction: Option<SearchDirection>,
    last_match: Option<SearchMatch>,
    history: Vec<String>,
    /// What committing the current query should do once it resolves to a
    /// match: e.g. a bare `/` is `MoveCursor`, while `d/` entered with a
    /// pending delete operator is `DeleteToMatch`.
    completion: SearchCompletion,
}

impl Default for SearchCompletion {
    fn default() -> Self {
        SearchCompletion::MoveCursor
    }
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn direction(&self) -> SearchDirection {
        self.direction.unwrap_or(SearchDirection::Forward)
    }

    pub fn last_match(&self) -> Option<SearchMatch> {
        self.last_match
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn completion(&self) -> SearchCompletion {
        self.completion
    }

    /// Begin a new search: archive the previous committed query into
    /// history (dropping it if empty or identical to the most recent
    /// entry) and reset the live query.
    pub fn start(&mut self, direction: SearchDirection) {
        self.start_with_completion(direction, SearchCompletion::MoveCursor);
    }

    pub fn start_with_completion(&mut self, direction: SearchDirection, completion: SearchCompletion) {
        self.archive_current_query();
        self.direction = Some(direction);
        self.completion = completion;
        self.query.clear();
    }

    fn archive_current_query(&mut self) {
        if self.query.is_empty() {
            return;
        }
        if self.history.last().map(|s| s.as_str()) == Some(self.query.as_str()) {
            return;
        }
        self.history.push(std::mem::take(&mut self.query));
        if self.history.len() > HISTORY_CAP {
            self.history.remove(0);
        }
    }

    pub fn push_char(&mut self, c: char) {
        self.query.push(c);
    }

    pub fn backspace(&mut self) {
        self.query.pop();
    }

    pub fn set_provisional_match(&mut self, m: Option<SearchMatch>) {
        self.last_match = m;
    }

    /// Toggle the stored direction (used by `FindNextMatch(reverse)`,
    /// which toggles direction relative to the stored direction).
    pub fn effective_direction(&self, reverse: bool) -> SearchDirection {
        let base = self.direction();
        if reverse { base.reversed() } else { base }
    }
}
