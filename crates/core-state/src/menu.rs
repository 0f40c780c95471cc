//! Menu overlay.
//!
//! An in-memory filterable list of items. The item's `action` payload is
//! left generic (`A`) rather than tied to `core_actions::Action` — that
//! crate depends on this one, not the reverse, and the menu's filtering/
//! ordering logic has no reason to know what running an item does.

/// One candidate in the menu, with a display name, optional aliases also
/// searched, and an opaque action payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem<A> {
    pub name: String,
    pub aliases: Vec<String>,
    pub action: A,
}

impl<A> MenuItem<A> {
    pub fn new(name: impl Into<String>, action: A) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            action,
        }
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }
}

/// Default ordering applied to an unfiltered (or score-tied) item list.
/// Ascending for command/file-path/child-dir menus, descending for
/// parent-dir, "original" (insertion order, untouched) for file-location
/// lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuStyle {
    Ascending,
    Descending,
    Original,
}

/// A filterable, wrap-around-selectable menu over `Vec<MenuItem<A>>`.
pub struct MenuState<A> {
    items: Vec<MenuItem<A>>,
    query: String,
    style: MenuStyle,
    list_all_on_empty_query: bool,
    selected: usize,
    filtered: Vec<usize>,
    active: bool,
}

impl<A> MenuState<A> {
    pub fn new(items: Vec<MenuItem<A>>, style: MenuStyle, list_all_on_empty_query: bool) -> Self {
        let mut m = Self {
            items,
            query: String::new(),
            style,
            list_all_on_empty_query,
            selected: 0,
            filtered: Vec::new(),
            active: true,
        };
        m.refilter();
        m
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Indices into the original item list that currently pass the filter,
    /// in display order.
    pub fn filtered_indices(&self) -> &[usize] {
        &self.filtered
    }

    pub fn selected_item(&self) -> Option<&MenuItem<A>> {
        self.filtered.get(self.selected).map(|&i| &self.items[i])
    }

    pub fn push_char(&mut self, c: char) {
        self.query.push(c);
        self.refilter();
    }

    pub fn backspace(&mut self) {
        self.query.pop();
        self.refilter();
    }

    /// Move the selection by `delta` (positive = down), wrapping around the
    /// filtered list.
    pub fn move_selection(&mut self, delta: isize) {
        if self.filtered.is_empty() {
            return;
        }
        let len = self.filtered.len() as isize;
        let current = self.selected as isize;
        let next = (current + delta).rem_euclid(len);
        self.selected = next as usize;
    }

    pub fn close(&mut self) {
        self.active = false;
    }

    fn refilter(&mut self) {
        if self.query.is_empty() && !self.list_all_on_empty_query {
            self.filtered.clear();
            self.selected = 0;
            return;
        }
        let mut scored: Vec<(usize, i64)> = self
            .items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| score(item, &self.query).map(|s| (i, s)))
            .collect();
        match self.style {
            MenuStyle::Ascending => {
                scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| self.items[a.0].name.cmp(&self.items[b.0].name)))
            }
            MenuStyle::Descending => scored.sort_by(|a, b| {
                b.1.cmp(&a.1).then_with(|| self.items[b.0].name.cmp(&self.items[a.0].name))
            }),
            MenuStyle::Original => scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0))),
        }
        self.filtered = scored.into_iter().map(|(i, _)| i).collect();
        self.selected = self.selected.min(self.filtered.len().saturating_sub(1));
    }
}

/// Substring/subsequence score over an item's name and aliases: an exact
/// substring match scores higher than a mere subsequence match; no match
/// (neither) excludes the item.
fn score<A>(item: &MenuItem<A>, query: &str) -> Option<i64> {
    if query.is_empty() {
        return Some(0);
    }
    let q = query.to_lowercase();
    std::iter::once(&item.name)
        .chain(item.aliases.iter())
        .filter_map(|candidate| {
            let c = candidate.to_lowercase();
            if c.contains(&q) {
                Some(1_000 - c.len() as i64)
            } else if is_subsequence(&q, &c) {
                Some(100 - c.len() as i64)
            } else {
                None
            }
        })
        .max()
}

fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut chars = haystack.chars();
    needle.chars().all(|n| chars.any(|h| h == n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<MenuItem<u32>> {
        vec![
            MenuItem::new("alpha", 1),
            MenuItem::new("beta", 2),
            MenuItem::new("gamma", 3).with_aliases(vec!["alias-alpha".into()]),
        ]
    }

    #[test]
    fn empty_query_hides_all_when_not_list_all() {
        let m = MenuState::new(sample(), MenuStyle::Ascending, false);
        assert!(m.filtered_indices().is_empty());
    }

    #[test]
    fn empty_query_lists_all_when_configured() {
        let m = MenuState::new(sample(), MenuStyle::Ascending, true);
        assert_eq!(m.filtered_indices().len(), 3);
    }

    #[test]
    fn substring_query_filters_and_matches_aliases() {
        let mut m = MenuState::new(sample(), MenuStyle::Ascending, false);
        for c in "alpha".chars() {
            m.push_char(c);
        }
        let names: Vec<&str> = m
            .filtered_indices()
            .iter()
            .map(|&i| m.items[i].name.as_str())
            .collect();
        assert!(names.contains(&"alpha"));
        assert!(names.contains(&"gamma")); // via alias "alias-alpha"
        assert!(!names.contains(&"beta"));
    }

    #[test]
    fn selection_wraps_both_directions() {
        let mut m = MenuState::new(sample(), MenuStyle::Ascending, true);
        m.move_selection(-1);
        assert_eq!(m.selected_item().unwrap().action, m.items[m.filtered[m.filtered.len() - 1]].action);
        m.move_selection(1);
        assert_eq!(m.selected, 0);
    }

    #[test]
    fn backspace_re_filters() {
        let mut m = MenuState::new(sample(), MenuStyle::Ascending, false);
        m.push_char('b');
        assert_eq!(m.filtered_indices().len(), 1);
        m.backspace();
        assert!(m.filtered_indices().is_empty());
    }
}
