//! Navigation timeline across opened files.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub path: std::path::PathBuf,
    pub line: usize,
    pub col: usize,
}

/// Two stacks (past, future) of locations. Loading a new file pushes onto
/// `past` and clears `future`; navigating back/forward moves entries
/// between the stacks.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    past: Vec<TimelineEntry>,
    future: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TimelineEntry) {
        self.past.push(entry);
        self.future.clear();
    }

    /// Move the current location (supplied by the caller, since this crate
    /// doesn't track "the current location" on its own) back one step,
    /// pushing it onto `future` and returning the entry to navigate to.
    pub fn navigate_back(&mut self, current: TimelineEntry) -> Option<TimelineEntry> {
        let target = self.past.pop()?;
        self.future.push(current);
        Some(target)
    }

    pub fn navigate_forward(&mut self, current: TimelineEntry) -> Option<TimelineEntry> {
        let target = self.future.pop()?;
        self.past.push(current);
        Some(target)
    }

    pub fn past(&self) -> &[TimelineEntry] {
        &self.past
    }

    pub fn future(&self) -> &[TimelineEntry] {
        &self.future
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(p: &str, line: usize) -> TimelineEntry {
        TimelineEntry {
            path: PathBuf::from(p),
            line,
            col: 0,
        }
    }

    #[test]
    fn push_clears_future() {
        let mut t = Timeline::new();
        t.push(entry("a", 0));
        t.navigate_back(entry("a", 0));
        assert!(!t.future().is_empty());
        t.push(entry("b", 0));
        assert!(t.future().is_empty());
    }

    #[test]
    fn back_then_forward_round_trips() {
        let mut t = Timeline::new();
        t.push(entry("a.txt", 3));
        let back_target = t.navigate_back(entry("b.txt", 7)).unwrap();
        assert_eq!(back_target, entry("a.txt", 3));
        let fwd_target = t.navigate_forward(entry("a.txt", 3)).unwrap();
        assert_eq!(fwd_target, entry("b.txt", 7));
    }

    #[test]
    fn navigating_back_with_empty_past_returns_none() {
        let mut t = Timeline::new();
        assert_eq!(t.navigate_back(entry("x", 0)), None);
    }
}
