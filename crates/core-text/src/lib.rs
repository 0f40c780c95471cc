//! Document buffer: a balanced tree of fixed-capacity UTF-8 leaves, a
//! `(line, byte)`-addressed `Buffer` facade over it, and the grapheme-
//! segmentation, display-width, and substring-search primitives built
//! directly on top of `Tree`.
//!
//! `Buffer`'s own motion helpers cover only the line-local set the
//! dispatcher calls inline (`left`/`right`/`word_forward`/...). The full
//! document-wide locator vocabulary — paragraph and word-object bounds,
//! line/column round-tripping, matching delimiters — lives in
//! `core-locate`, built on `Tree` directly rather than through this facade.
//! Anything mode-aware (selection, undo, registers) lives in `core-state`.

pub mod buffer;
pub mod search;
pub mod segment;
pub mod tree;
pub mod width;

pub use buffer::{motion, Buffer, Position};
pub use search::Searcher;
pub use tree::{BufferError, ForwardBytes, ReverseBytes, Tree, LEAF_CAPACITY};

/// Grapheme-boundary helpers, addressed the way callers outside this crate
/// spell it (`core_text::grapheme::{next_boundary, prev_boundary}`).
pub use segment as grapheme;
