//! Rust lexical rules. Module named `rust_lang` (not `rust`) to avoid
//! shadowing the `rust` crate-name convention elsewhere in the workspace.

use super::common::*;
use super::CompiledParser;
use crate::combinator::Combinator;

const KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
    "where", "while", "async", "await", "dyn",
];

const OPERATORS: &[&str] = &[
    "->", "=>", "::", "..=", "..", "==", "!=", "<=", ">=", "&&", "||", "+=", "-=", "*=", "/=",
    "+", "-", "*", "/", "%", "&", "|", "^", "!", "<", ">", "=", "(", ")", "{", "}", "[", "]", ",",
    ".", ";", ":", "#",
];

pub fn parser() -> CompiledParser {
    let mut alts: Vec<Combinator> = vec![
        whitespace(),
        line_comment("//"),
        block_comment("/*", "*/"),
        quoted_string("\""),
        quoted_string("'"),
        number(),
        ident_or_keyword(KEYWORDS),
    ];
    alts.extend(OPERATORS.iter().map(|op| operator(op)));
    CompiledParser {
        root: any_of(alts),
    }
}
