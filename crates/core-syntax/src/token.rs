//! Token shape shared by every language rule set.

/// Small closed role enum plus sixteen language-specific "custom" slots,
/// preferring plain enums over dynamic style classes in hot paths (see
/// `core-keymap`'s `MappingOutput`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenRole {
    Operator,
    Keyword,
    Number,
    String,
    Comment,
    Custom(u8), // 0..16
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub start_char: usize,
    pub length: usize,
    pub role: TokenRole,
}

impl Token {
    pub fn new(start_char: usize, length: usize, role: TokenRole) -> Self {
        debug_assert!(length > 0, "tokens are never empty");
        Token {
            start_char,
            length,
            role,
        }
    }

    pub fn end_char(&self) -> usize {
        self.start_char + self.length
    }
}

/// Parser state id. Each language defines its own small set of named
/// states (e.g. "default", "in block comment", "in heredoc body");
/// `0` is always the language's initial state.
pub type StateId = u16;

pub const INITIAL_STATE: StateId = 0;
