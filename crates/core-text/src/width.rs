//! Display width of a single grapheme cluster (EGC), in terminal cells.
//!
//! Per the spec, a cluster's display width is the width of its *first* rune
//! (emoji sequences render as the width of their leading code point), with
//! two specials layered on top: tabs expand to the next multiple of a
//! caller-supplied tab size, and carriage returns are zero-width. Everything
//! else is delegated to East Asian Width tables via `unicode-width`, with a
//! small pictographic-range override because `unicode_width` classifies many
//! emoji code points as "ambiguous" (width 1) rather than wide.

use unicode_width::UnicodeWidthChar;

/// Extended-pictographic ranges wide terminals render at two cells even
/// though their Unicode East Asian Width property is merely "ambiguous".
fn is_extended_pictographic(c: char) -> bool {
    ('\u{1F300}'..='\u{1FAFF}').contains(&c) || ('\u{2600}'..='\u{27BF}').contains(&c)
}

fn rune_width(c: char) -> usize {
    if is_extended_pictographic(c) {
        return 2;
    }
    UnicodeWidthChar::width(c).unwrap_or(1)
}

/// Width of grapheme cluster `g` in terminal cells, given the current column
/// (needed to compute tab-stop expansion) and a configured tab size.
pub fn egc_width_at(g: &str, col: usize, tab_size: usize) -> usize {
    let mut chars = g.chars();
    let Some(first) = chars.next() else {
        return 0;
    };
    if first == '\t' {
        let tab_size = tab_size.max(1);
        return tab_size - (col % tab_size);
    }
    if first == '\r' {
        return 0;
    }
    rune_width(first)
}

/// Width of an isolated cluster, assuming it is not a tab (column-independent
/// callers — e.g. comparing two clusters outside of a line layout).
pub fn egc_width(g: &str) -> usize {
    egc_width_at(g, 0, 8)
}
