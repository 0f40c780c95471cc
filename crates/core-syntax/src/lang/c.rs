use super::common::*;
use super::CompiledParser;
use crate::combinator::Combinator;

const KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while",
];

const OPERATORS: &[&str] = &[
    "<<=", ">>=", "->", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=",
    "+", "-", "*", "/", "%", "&", "|", "^", "~", "<", ">", "=", "!", "(", ")", "{", "}", "[", "]",
    ",", ".", ";", "#",
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
