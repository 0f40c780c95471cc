//! Clipboard "pages" — a page-id keyed map distinct from the vim-style
//! `Registers` numbered/named ring this crate already carries (`lib.rs`'s
//! `Registers`/`RegistersFacade`, which back the existing `d`/`y`/`p`
//! dispatch path). `Registers` stays as the engine the operator/paste
//! dispatch already depends on and is well covered by tests; `Clipboard`
//! models a closed `PageId` set (`Null`, `Default`, `ShellCmdOutput`,
//! `LetterA..LetterZ`) for callers that want that exact vocabulary (e.g. a
//! future `"*`/`"+`-style shell-output yank, or a scripting surface).

use std::collections::HashMap;

/// Closed set of addressable clipboard pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageId {
    /// The black hole register: writes are discarded, reads are empty.
    Null,
    /// The implicit page used when no page is explicitly named.
    Default,
    /// Populated by shell-command output capture.
    ShellCmdOutput,
    /// `a`..`z` named pages.
    Letter(char),
}

impl PageId {
    /// Map a register-designator character (as typed after `"`) to a page,
    /// if it names one of the closed set. Uppercase letters select the
    /// same page as their lowercase counterpart (append semantics are a
    /// caller concern, mirroring `Registers::record_yank_named`).
    pub fn from_char(c: char) -> Option<PageId> {
        match c {
            '_' => Some(PageId::Null),
            '"' => Some(PageId::Default),
            '%' | '.' => None,
            c if c.is_ascii_alphabetic() => Some(PageId::Letter(c.to_ascii_lowercase())),
            _ => None,
        }
    }
}

/// A single clipboard page's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub text: String,
    pub linewise: bool,
}

/// Mapping from [`PageId`] to [`Page`]. Writes to `Null` are discarded;
/// reads from an unset page yield the empty page.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    pages: HashMap<PageId, Page>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `text` into `page`. A write to [`PageId::Null`] is silently
    /// discarded.
    pub fn write(&mut self, page: PageId, text: impl Into<String>, linewise: bool) {
        if matches!(page, PageId::Null) {
            return;
        }
        self.pages.insert(
            page,
            Page {
                text: text.into(),
                linewise,
            },
        );
    }

    /// Read `page`'s contents. An unset page (including `Null`, which is
    /// never populated) yields the empty page rather than `None`.
    pub fn read(&self, page: PageId) -> Page {
        self.pages.get(&page).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut c = Clipboard::new();
        c.write(PageId::Letter('a'), "hello", false);
        assert_eq!(c.read(PageId::Letter('a')).text, "hello");
    }

    #[test]
    fn null_page_writes_are_discarded() {
        let mut c = Clipboard::new();
        c.write(PageId::Null, "gone", false);
        assert_eq!(c.read(PageId::Null), Page::default());
    }

    #[test]
    fn unset_page_reads_as_empty() {
        let c = Clipboard::new();
        assert_eq!(c.read(PageId::Default), Page::default());
        assert_eq!(c.read(PageId::ShellCmdOutput), Page::default());
    }

    #[test]
    fn linewise_flag_is_preserved() {
        let mut c = Clipboard::new();
        c.write(PageId::Default, "line\n", true);
        assert!(c.read(PageId::Default).linewise);
    }

    #[test]
    fn from_char_maps_letters_case_insensitively() {
        assert_eq!(PageId::from_char('a'), Some(PageId::Letter('a')));
        assert_eq!(PageId::from_char('A'), Some(PageId::Letter('a')));
        assert_eq!(PageId::from_char('_'), Some(PageId::Null));
        assert_eq!(PageId::from_char('"'), Some(PageId::Default));
        assert_eq!(PageId::from_char('9'), None);
    }

    #[test]
    fn overwriting_a_page_replaces_prior_contents() {
        let mut c = Clipboard::new();
        c.write(PageId::Letter('z'), "first", false);
        c.write(PageId::Letter('z'), "second", true);
        let p = c.read(PageId::Letter('z'));
        assert_eq!(p.text, "second");
        assert!(p.linewise);
    }
}
