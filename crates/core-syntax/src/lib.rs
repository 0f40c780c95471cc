//! Incremental tokenizer: a combinator-driven parser that
//! turns a `core_text::Tree` into an ordered stream of typed tokens, and
//! reuses prior parse work across small edits via a persistent
//! computation cache.

pub mod cache;
pub mod combinator;
pub mod lang;
pub mod token;

use core_text::Tree;
use thiserror::Error;

pub use cache::{Cache, CacheLeaf};
pub use combinator::{Combinator, ParseOutcome};
pub use lang::{parser_for_language, CompiledParser};
pub use token::{StateId, Token, TokenRole};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unknown language {0:?}")]
    UnknownLanguage(String),
}

/// Owns a buffer's token stream: language parser plus computation cache,
/// kept in sync with the buffer as edits land. A fresh `chars` snapshot is
/// taken on full reparse and after every incremental edit; tokenisation
/// itself always runs against that snapshot, never the tree directly.
pub struct Tokenizer {
    parser: Option<CompiledParser>,
    cache: Cache,
    chars: Vec<char>,
}

impl Tokenizer {
    pub fn new(language: Option<&str>) -> Self {
        let parser = language.and_then(parser_for_language);
        Tokenizer {
            parser,
            cache: Cache::empty(),
            chars: Vec::new(),
        }
    }

    pub fn set_language(&mut self, language: Option<&str>, tree: &Tree) {
        self.parser = language.and_then(parser_for_language);
        self.reparse_all(tree);
    }

    pub fn reparse_all(&mut self, tree: &Tree) {
        self.chars = tree.to_string().chars().collect();
        self.cache = match &self.parser {
            Some(p) => Cache::parse_all(&self.chars, p),
            None => Cache::empty(),
        };
        tracing::trace!(target: "syntax.cache", chars = self.chars.len(), "full reparse");
    }

    /// Incrementally update tokens after an edit at character position
    /// `pos` that inserted `num_inserted` and deleted `num_deleted`
    /// characters. Callers pass the buffer's state *after* the edit.
    pub fn on_edit(&mut self, tree: &Tree, pos: usize, num_inserted: usize, num_deleted: usize) {
        self.chars = tree.to_string().chars().collect();
        if let Some(parser) = &self.parser {
            self.cache
                .reparse_after_edit(&self.chars, parser, pos, num_inserted, num_deleted);
        }
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.cache.tokens()
    }

    /// The token covering character position `pos`, if any.
    pub fn token_at_position(&self, pos: usize) -> Option<&Token> {
        self.cache.token_at_position(pos)
    }

    /// Every token overlapping the half-open character range `[lo, hi)`.
    pub fn tokens_intersecting_range(&self, lo: usize, hi: usize) -> impl Iterator<Item = &Token> {
        self.cache.tokens_intersecting_range(lo, hi)
    }

    pub fn has_language(&self) -> bool {
        self.parser.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_has_no_language_produces_no_tokens() {
        let tree = Tree::from_str("fn main() {}");
        let mut tok = Tokenizer::new(None);
        tok.reparse_all(&tree);
        assert_eq!(tok.tokens().count(), 0);
    }

    #[test]
    fn rust_language_tokenizes_keywords() {
        let tree = Tree::from_str("fn main() {}");
        let mut tok = Tokenizer::new(Some("rust"));
        tok.reparse_all(&tree);
        assert!(tok.tokens().any(|t| t.role == TokenRole::Keyword));
    }

    #[test]
    fn on_edit_keeps_tokens_consistent_with_full_reparse() {
        let mut tree = Tree::from_str("fn a() {}");
        let mut tok = Tokenizer::new(Some("rust"));
        tok.reparse_all(&tree);

        tree.insert_at_position(3, 'b').unwrap();
        tok.on_edit(&tree, 3, 1, 0);

        let mut reference = Tokenizer::new(Some("rust"));
        reference.reparse_all(&tree);

        let got: Vec<_> = tok.tokens().map(|t| (t.start_char, t.length, t.role)).collect();
        let want: Vec<_> = reference
            .tokens()
            .map(|t| (t.start_char, t.length, t.role))
            .collect();
        assert_eq!(got, want);
    }
}
