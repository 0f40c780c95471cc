//! Locators: the motion vocabulary shared by Normal and Visual modes.
//!
//! Every function here is `(tree, ..., pos) -> pos` (or `-> (pos, found)`),
//! total (never panics, even on an empty tree or an out-of-range `pos`) and
//! free of side effects. `pos` is an absolute rune index into the `Tree`,
//! the same coordinate space `Tree` itself uses — callers that think in
//! `(line, byte)` terms (the dispatcher, via `core_text::Buffer`) convert
//! at the boundary rather than this crate adopting their coordinate.

use core_text::{grapheme, Tree};

/// Absolute rune index into a `Tree`.
pub type Pos = usize;

/// `(start, end)` of the current line as rune indices, `end` excluding the
/// line's own trailing newline — the set of positions a cursor can occupy
/// on this line is `start..=end`.
fn line_bounds_chars(tree: &Tree, line: usize) -> (Pos, Pos) {
    let start = tree.line_start_position(line);
    let next_start = if line + 1 < tree.num_lines() {
        tree.line_start_position(line + 1)
    } else {
        tree.num_chars()
    };
    let start_byte = tree.char_to_byte(start);
    let next_byte = tree.char_to_byte(next_start);
    let s = tree.to_string();
    let end_byte = if next_byte > start_byte && s.as_bytes()[next_byte - 1] == b'\n' {
        next_byte - 1
    } else {
        next_byte
    };
    (start, tree.byte_to_char(end_byte))
}

fn line_text_and_start_byte(tree: &Tree, line: usize) -> (String, usize) {
    let (start_char, end_char) = line_bounds_chars(tree, line);
    let start_byte = tree.char_to_byte(start_char);
    let end_byte = tree.char_to_byte(end_char);
    let s = tree.to_string();
    (s[start_byte..end_byte].to_string(), start_byte)
}

/// Advance up to `count` grapheme clusters, never crossing the line's
/// newline. `include_eol` allows resting one past the last cluster (the
/// insertion point); otherwise the cursor clamps to the last cluster's
/// start (Normal-mode block-cursor rule).
pub fn next_char_in_line(tree: &Tree, count: usize, include_eol: bool, pos: Pos) -> Pos {
    let line = tree.line_num_for_position(pos.min(tree.num_chars()));
    let (line_text, start_byte) = line_text_and_start_byte(tree, line);
    let cap = if include_eol {
        line_text.len()
    } else if line_text.is_empty() {
        0
    } else {
        grapheme::prev_boundary(&line_text, line_text.len())
    };
    let mut byte_off = tree
        .char_to_byte(pos)
        .saturating_sub(start_byte)
        .min(line_text.len());
    for _ in 0..count {
        if byte_off >= cap {
            break;
        }
        byte_off = grapheme::next_boundary(&line_text, byte_off).min(cap);
    }
    tree.byte_to_char(start_byte + byte_off)
}

/// Symmetric to [`next_char_in_line`]: retreat up to `count` clusters,
/// never crossing the start of the line.
pub fn prev_char_in_line(tree: &Tree, count: usize, pos: Pos) -> Pos {
    let line = tree.line_num_for_position(pos.min(tree.num_chars()));
    let (line_text, start_byte) = line_text_and_start_byte(tree, line);
    let mut byte_off = tree
        .char_to_byte(pos)
        .saturating_sub(start_byte)
        .min(line_text.len());
    for _ in 0..count {
        if byte_off == 0 {
            break;
        }
        byte_off = grapheme::prev_boundary(&line_text, byte_off);
    }
    tree.byte_to_char(start_byte + byte_off)
}

/// Forward search on the current line for the `count`-th occurrence of
/// `ch` strictly after `pos` (a match sitting on the cursor is ignored).
/// `include_char` lands on the match; otherwise one position before it.
/// `count == 0` never finds anything.
pub fn next_matching_char_in_line(
    tree: &Tree,
    ch: char,
    count: usize,
    include_char: bool,
    pos: Pos,
) -> (Pos, bool) {
    if count == 0 {
        return (pos, false);
    }
    let line = tree.line_num_for_position(pos.min(tree.num_chars()));
    let (line_text, start_byte) = line_text_and_start_byte(tree, line);
    let cur_byte = tree
        .char_to_byte(pos)
        .saturating_sub(start_byte)
        .min(line_text.len());
    let mut seen = 0usize;
    let mut hit = None;
    for (i, c) in line_text.char_indices() {
        if i <= cur_byte {
            continue;
        }
        if c == ch {
            seen += 1;
            if seen == count {
                hit = Some(i);
                break;
            }
        }
    }
    match hit {
        Some(byte) => {
            let target = if include_char {
                byte
            } else {
                line_text[..byte].char_indices().last().map_or(0, |(i, _)| i)
            };
            (tree.byte_to_char(start_byte + target), true)
        }
        None => (pos, false),
    }
}

/// Start of the line following the one `pos` sits on (`NumChars()` past
/// the last line).
pub fn next_line_boundary(tree: &Tree, pos: Pos) -> Pos {
    let line = tree.line_num_for_position(pos.min(tree.num_chars()));
    if line + 1 >= tree.num_lines() {
        tree.num_chars()
    } else {
        tree.line_start_position(line + 1)
    }
}

/// Start of the line preceding the one `pos` sits on (0 on the first line).
pub fn prev_line_boundary(tree: &Tree, pos: Pos) -> Pos {
    let line = tree.line_num_for_position(pos.min(tree.num_chars()));
    if line == 0 {
        0
    } else {
        tree.line_start_position(line - 1)
    }
}

/// Start of the line `pos` sits on.
pub fn start_of_line(tree: &Tree, pos: Pos) -> Pos {
    let line = tree.line_num_for_position(pos.min(tree.num_chars()));
    tree.line_start_position(line)
}

/// Start of the line following the one `pos` sits on, same as
/// [`next_line_boundary`] — named separately because callers reach for it
/// from a "start of line" family rather than a boundary-crossing one.
pub fn start_of_next_line(tree: &Tree, pos: Pos) -> Pos {
    next_line_boundary(tree, pos)
}

/// Start of the last line in the buffer.
pub fn start_of_last_line(tree: &Tree) -> Pos {
    tree.line_start_position(tree.num_lines().saturating_sub(1))
}

/// Clamp `pos` onto the last valid grapheme-cluster start of its line —
/// the position a Normal-mode cursor resets to when insert mode exits off
/// the end of a line.
pub fn closest_char_on_line(tree: &Tree, pos: Pos) -> Pos {
    let line = tree.line_num_for_position(pos.min(tree.num_chars()));
    let (line_text, start_byte) = line_text_and_start_byte(tree, line);
    if line_text.is_empty() {
        return tree.byte_to_char(start_byte);
    }
    let last_start = grapheme::prev_boundary(&line_text, line_text.len());
    let cur_byte = tree
        .char_to_byte(pos)
        .saturating_sub(start_byte)
        .min(line_text.len())
        .min(last_start);
    tree.byte_to_char(start_byte + cur_byte)
}

fn line_is_empty(tree: &Tree, line: usize) -> bool {
    let (start, end) = line_bounds_chars(tree, line);
    start == end
}

/// Next paragraph boundary: an empty line, but only once real content has
/// been seen since the previous one (a run of consecutive blank lines is a
/// single boundary, not one per line).
pub fn next_paragraph(tree: &Tree, pos: Pos) -> Pos {
    let start_line = tree.line_num_for_position(pos.min(tree.num_chars()));
    let mut seen_content = !line_is_empty(tree, start_line);
    let mut line = start_line;
    loop {
        line += 1;
        if line >= tree.num_lines() {
            return tree.num_chars();
        }
        if line_is_empty(tree, line) {
            if seen_content {
                return tree.line_start_position(line);
            }
        } else {
            seen_content = true;
        }
    }
}

/// Symmetric to [`next_paragraph`], scanning backward. Because a
/// contiguous blank-line run collapses to one boundary from either
/// direction, this need not return the same line `next_paragraph` would
/// going forward — each finds the blank line nearest the scan's start.
pub fn prev_paragraph(tree: &Tree, pos: Pos) -> Pos {
    let start_line = tree.line_num_for_position(pos.min(tree.num_chars()));
    let mut seen_content = !line_is_empty(tree, start_line);
    let mut line = start_line;
    loop {
        if line == 0 {
            return 0;
        }
        line -= 1;
        if line_is_empty(tree, line) {
            if seen_content {
                return tree.line_start_position(line);
            }
        } else {
            seen_content = true;
        }
    }
}

fn char_class(c: char) -> u8 {
    if c == '\n' || c.is_whitespace() {
        0
    } else if c.is_alphanumeric() || c == '_' {
        1
    } else {
        2
    }
}

/// Start of the `count`-th word after `pos`, crossing line boundaries
/// (a run of blank lines counts as whitespace between words).
pub fn next_word_start(tree: &Tree, count: usize, pos: Pos) -> Pos {
    let s = tree.to_string();
    let chars: Vec<char> = s.chars().collect();
    let mut i = pos.min(chars.len());
    for _ in 0..count.max(1) {
        if i >= chars.len() {
            break;
        }
        let class = char_class(chars[i]);
        if class != 0 {
            while i < chars.len() && char_class(chars[i]) == class {
                i += 1;
            }
        }
        while i < chars.len() && char_class(chars[i]) == 0 {
            i += 1;
        }
    }
    i.min(tree.num_chars())
}

/// Start of the `count`-th word before `pos`.
pub fn prev_word_start(tree: &Tree, count: usize, pos: Pos) -> Pos {
    let s = tree.to_string();
    let chars: Vec<char> = s.chars().collect();
    let mut i = pos.min(chars.len());
    for _ in 0..count.max(1) {
        if i == 0 {
            break;
        }
        i -= 1;
        while i > 0 && char_class(chars[i]) == 0 {
            i -= 1;
        }
        let class = char_class(chars[i]);
        while i > 0 && char_class(chars[i - 1]) == class {
            i -= 1;
        }
    }
    i
}

/// `[start, end)` of the word `pos` sits in (or the whitespace/punctuation
/// run, if `pos` sits on one).
pub fn current_word_bounds(tree: &Tree, pos: Pos) -> (Pos, Pos) {
    let s = tree.to_string();
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return (0, 0);
    }
    let i = pos.min(chars.len() - 1);
    let class = char_class(chars[i]);
    let mut start = i;
    while start > 0 && char_class(chars[start - 1]) == class {
        start -= 1;
    }
    let mut end = i + 1;
    while end < chars.len() && char_class(chars[end]) == class {
        end += 1;
    }
    (start, end)
}

/// `[start, end)` of a quoted string around `pos`. `lookup` is an optional
/// parser hook: given `pos`, return the `[start, end)` of the string-role
/// token covering it, if any. When `lookup` doesn't resolve (no parser, or
/// no token there, or the token doesn't start with `quote`), falls back to
/// scanning the current line for the nearest quote pair: if the cursor
/// sits on a quote, its partner is searched forward then backward;
/// otherwise backward then forward.
pub fn string_object(
    quote: char,
    tree: &Tree,
    lookup: Option<&dyn Fn(Pos) -> Option<(Pos, Pos)>>,
    include_quotes: bool,
    pos: Pos,
) -> Option<(Pos, Pos)> {
    let s = tree.to_string();
    let chars: Vec<char> = s.chars().collect();
    if let Some(lookup) = lookup
        && let Some((tok_start, tok_end)) = lookup(pos)
        && tok_start < chars.len()
        && chars[tok_start] == quote
    {
        return Some(span(tok_start, tok_end, include_quotes));
    }
    let line = tree.line_num_for_position(pos.min(tree.num_chars()));
    let (line_start, line_end) = line_bounds_chars(tree, line);
    let pos = pos.min(chars.len().saturating_sub(1));
    let on_quote = !chars.is_empty() && chars[pos] == quote;
    let find_right = |from: Pos| (from..line_end).find(|&i| chars[i] == quote);
    let find_left = |from: Pos| (line_start..=from).rev().find(|&i| chars[i] == quote);
    let (left, right) = if on_quote {
        (pos, find_right(pos + 1)?)
    } else {
        match (find_left(pos), find_right(pos)) {
            (Some(l), Some(r)) => (l, r),
            _ => return None,
        }
    };
    if left >= right {
        return None;
    }
    Some(span(left, right + 1, include_quotes))
}

fn span(start: Pos, end: Pos, include_quotes: bool) -> (Pos, Pos) {
    if include_quotes {
        (start, end)
    } else {
        (start + 1, end.saturating_sub(1).max(start + 1))
    }
}

/// Line number and grapheme-cluster column of `pos`. Columns past the end
/// of the line clamp to the last on-line cluster.
pub fn pos_to_line_num_and_col(tree: &Tree, pos: Pos) -> (usize, usize) {
    let pos = pos.min(tree.num_chars());
    let line = tree.line_num_for_position(pos);
    let (line_text, start_byte) = line_text_and_start_byte(tree, line);
    let pos_byte = tree
        .char_to_byte(pos)
        .saturating_sub(start_byte)
        .min(line_text.len());
    let col = grapheme::forward(&line_text)
        .take_while(|seg| seg.start < pos_byte)
        .count();
    (line, col)
}

/// Inverse of [`pos_to_line_num_and_col`]; a past-end column clamps to the
/// last on-line cluster, and a past-end line clamps to the last line.
pub fn line_num_and_col_to_pos(tree: &Tree, line: usize, col: usize) -> Pos {
    let line = line.min(tree.num_lines().saturating_sub(1));
    let (line_text, start_byte) = line_text_and_start_byte(tree, line);
    let segs: Vec<_> = grapheme::forward(&line_text).collect();
    let byte_off = segs.get(col).map_or(line_text.len(), |seg| seg.start);
    tree.byte_to_char(start_byte + byte_off)
}

/// When `enabled`, collapse a pure-whitespace run immediately before `pos`
/// to the previous indent stop: a multiple of `tab_size` for spaces, one
/// position per literal tab. A run with anything other than spaces/tabs,
/// or a disabled config, falls back to a single-character backspace.
pub fn prev_auto_indent(tree: &Tree, enabled: bool, tab_size: usize, pos: Pos) -> Pos {
    if !enabled || tab_size == 0 {
        return prev_char_in_line(tree, 1, pos);
    }
    let line = tree.line_num_for_position(pos.min(tree.num_chars()));
    let (start_char, _) = line_bounds_chars(tree, line);
    let start_byte = tree.char_to_byte(start_char);
    let pos_byte = tree.char_to_byte(pos).max(start_byte);
    let s = tree.to_string();
    let prefix = &s[start_byte..pos_byte];
    if prefix.is_empty() || !prefix.chars().all(|c| c == ' ' || c == '\t') {
        return prev_char_in_line(tree, 1, pos);
    }
    let col = prefix.chars().count();
    let target_col = if col == 0 { 0 } else { ((col - 1) / tab_size) * tab_size };
    start_char + target_col
}
