//! Persistent computation cache enabling incremental reparse across small
//! edits.

use crate::combinator::eval_with_recovery;
use crate::lang::CompiledParser;
use crate::token::{StateId, Token, INITIAL_STATE};

/// Minimum number of consumed characters a coalesced leaf should cover,
/// bounding cache memory.
const MIN_LEAF_CHARS: usize = 1024;

#[derive(Debug, Clone)]
pub struct CacheLeaf {
    pub start_char: usize,
    pub start_state: StateId,
    pub end_state: StateId,
    pub consumed_chars: usize,
    pub read_ahead_chars: usize,
    pub tokens: Vec<Token>,
}

impl CacheLeaf {
    fn end_char(&self) -> usize {
        self.start_char + self.consumed_chars
    }

    fn read_ahead_end(&self) -> usize {
        self.start_char + self.read_ahead_chars
    }
}

/// One raw run of the parser, before coalescing.
fn run_one(parser: &CompiledParser, chars: &[char], at: usize, state: StateId) -> CacheLeaf {
    let r = eval_with_recovery(&parser.root, chars, at, state);
    CacheLeaf {
        start_char: at,
        start_state: state,
        end_state: r.next_state,
        consumed_chars: r.consumed,
        read_ahead_chars: (r.max_read - at).max(r.consumed),
        tokens: r.tokens,
    }
}

fn coalesce(raw: Vec<CacheLeaf>) -> Vec<CacheLeaf> {
    let mut out: Vec<CacheLeaf> = Vec::new();
    for leaf in raw {
        match out.last_mut() {
            Some(prev) if prev.consumed_chars < MIN_LEAF_CHARS && prev.end_char() == leaf.start_char => {
                prev.consumed_chars += leaf.consumed_chars;
                prev.read_ahead_chars = prev.read_ahead_chars.max(
                    leaf.start_char - prev.start_char + leaf.read_ahead_chars,
                );
                prev.end_state = leaf.end_state;
                prev.tokens.extend(leaf.tokens);
            }
            _ => out.push(leaf),
        }
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct Cache {
    leaves: Vec<CacheLeaf>,
}

impl Cache {
    pub fn empty() -> Self {
        Cache { leaves: Vec::new() }
    }

    /// Parse the whole buffer from scratch (spec's `ParseAll`).
    pub fn parse_all(chars: &[char], parser: &CompiledParser) -> Self {
        let mut raw = Vec::new();
        let mut pos = 0usize;
        let mut state = INITIAL_STATE;
        while pos < chars.len() {
            let leaf = run_one(parser, chars, pos, state);
            pos += leaf.consumed_chars.max(1);
            state = leaf.end_state;
            raw.push(leaf);
        }
        Cache {
            leaves: coalesce(raw),
        }
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.leaves.iter().flat_map(|l| l.tokens.iter())
    }

    pub fn leaves(&self) -> &[CacheLeaf] {
        &self.leaves
    }

    /// The token covering character position `pos`, if any (spec §4.3
    /// "Queries"). Tokens never overlap, so at most one matches.
    pub fn token_at_position(&self, pos: usize) -> Option<&Token> {
        self.tokens()
            .find(|t| t.start_char <= pos && pos < t.end_char())
    }

    /// Every token that overlaps the half-open character range
    /// `[lo, hi)` (spec §4.3 "Queries"), in order.
    pub fn tokens_intersecting_range(&self, lo: usize, hi: usize) -> impl Iterator<Item = &Token> {
        self.tokens()
            .filter(move |t| t.start_char < hi && t.end_char() > lo)
    }

    /// Incrementally update the cache after an edit at character position
    /// `pos` that inserted `num_inserted` and deleted `num_deleted`
    /// characters.
    pub fn reparse_after_edit(
        &mut self,
        chars: &[char],
        parser: &CompiledParser,
        pos: usize,
        num_inserted: usize,
        num_deleted: usize,
    ) {
        let delta = num_inserted as isize - num_deleted as isize;
        let affected_end = pos + num_inserted.max(num_deleted);

        let mut kept_before: Vec<CacheLeaf> = Vec::new();
        let mut first_unkept = 0usize;
        for (i, leaf) in self.leaves.iter().enumerate() {
            if leaf.end_char() <= pos {
                kept_before.push(leaf.clone());
                first_unkept = i + 1;
            } else {
                break;
            }
        }

        let mut shiftable: Vec<CacheLeaf> = Vec::new();
        for leaf in &self.leaves[first_unkept..] {
            let intersects_edit = leaf.start_char < affected_end && leaf.read_ahead_end() > pos;
            if leaf.start_char >= pos && !intersects_edit {
                let mut shifted = leaf.clone();
                shifted.start_char = (shifted.start_char as isize + delta).max(0) as usize;
                shiftable.push(shifted);
            }
        }
        shiftable.sort_by_key(|l| l.start_char);

        let reparse_start = kept_before
            .last()
            .map(|l| l.end_char())
            .unwrap_or(0);
        let start_state = kept_before.last().map(|l| l.end_state).unwrap_or(INITIAL_STATE);

        let mut fresh = Vec::new();
        let mut cursor = reparse_start;
        let mut state = start_state;
        let quiescent_at = loop {
            if let Some(candidate) = shiftable.iter().find(|l| l.start_char == cursor) {
                if candidate.start_state == state {
                    break cursor;
                }
            }
            if cursor >= chars.len() {
                break cursor;
            }
            let leaf = run_one(parser, chars, cursor, state);
            cursor += leaf.consumed_chars.max(1);
            state = leaf.end_state;
            fresh.push(leaf);
        };

        let mut result = kept_before;
        result.extend(fresh);
        result.extend(shiftable.into_iter().filter(|l| l.start_char >= quiescent_at));
        self.leaves = coalesce(result);
    }
}
