//! Knuth–Morris–Pratt substring search over byte streams, returning
//! character (rune) offsets rather than byte offsets.
//!
//! The searcher never materializes the haystack: it consumes any
//! `Iterator<Item = u8>` — in practice a [`crate::tree::ForwardBytes`] or
//! [`crate::tree::ReverseBytes`] from a [`crate::tree::Tree`] — one byte at
//! a time, folding leading-byte counts as it goes so a byte-level match can
//! be reported back in character-position units without a second pass.

use crate::tree::is_leading_byte;

fn build_prefix(pattern: &[u8]) -> Vec<usize> {
    let mut prefix = vec![0usize; pattern.len()];
    let mut k = 0usize;
    for i in 1..pattern.len() {
        while k > 0 && pattern[k] != pattern[i] {
            k = prefix[k - 1];
        }
        if pattern[k] == pattern[i] {
            k += 1;
        }
        prefix[i] = k;
    }
    prefix
}

/// A compiled query, reusable across many searches.
pub struct Searcher {
    pattern: Vec<u8>,
    prefix: Vec<usize>,
    rev_pattern: Vec<u8>,
    rev_prefix: Vec<usize>,
}

impl Searcher {
    pub fn new(query: &str) -> Self {
        let pattern = query.as_bytes().to_vec();
        let prefix = build_prefix(&pattern);
        let rev_pattern: Vec<u8> = pattern.iter().rev().copied().collect();
        let rev_prefix = build_prefix(&rev_pattern);
        Searcher {
            pattern,
            prefix,
            rev_pattern,
            rev_prefix,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    /// First match at or after `start_pos`, scanning `reader` forward.
    /// `offset_limit`, when set, bounds the scan to that many characters
    /// past `start_pos`. Returns the character position the match starts
    /// at, or `None` if no match was found within range.
    pub fn next_in_reader(
        &self,
        start_pos: usize,
        reader: impl Iterator<Item = u8>,
        offset_limit: Option<usize>,
    ) -> Option<usize> {
        if self.pattern.is_empty() {
            return None;
        }
        let mut k = 0usize;
        let mut consumed = 0usize;
        let mut chars_seen = 0usize;
        // history[i] = number of leading bytes among the first i bytes consumed.
        let mut history = vec![0usize];
        for b in reader {
            if let Some(limit) = offset_limit {
                if chars_seen >= limit {
                    break;
                }
            }
            while k > 0 && self.pattern[k] != b {
                k = self.prefix[k - 1];
            }
            if self.pattern[k] == b {
                k += 1;
            }
            if is_leading_byte(b) {
                chars_seen += 1;
            }
            history.push(chars_seen);
            consumed += 1;
            if k == self.pattern.len() {
                let start_byte = consumed - self.pattern.len();
                return Some(start_pos + history[start_byte]);
            }
        }
        None
    }

    /// Last match at or before `start_pos`, scanning a *reverse* byte
    /// stream (bytes emitted last-to-first, as produced by
    /// [`crate::tree::Tree::reverse_reader_at_position`]). Returns the
    /// character position the match starts at in forward (document) order.
    pub fn last_in_reader(
        &self,
        start_pos: usize,
        reverse_reader: impl Iterator<Item = u8>,
        offset_limit: Option<usize>,
    ) -> Option<usize> {
        if self.rev_pattern.is_empty() {
            return None;
        }
        let mut k = 0usize;
        let mut chars_seen = 0usize;
        for b in reverse_reader {
            if let Some(limit) = offset_limit {
                if chars_seen >= limit {
                    break;
                }
            }
            while k > 0 && self.rev_pattern[k] != b {
                k = self.rev_prefix[k - 1];
            }
            if self.rev_pattern[k] == b {
                k += 1;
            }
            if is_leading_byte(b) {
                chars_seen += 1;
            }
            if k == self.rev_pattern.len() {
                return start_pos.checked_sub(chars_seen);
            }
        }
        None
    }
}
