use super::common::*;
use super::CompiledParser;
use crate::combinator::Combinator;

const KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var",
];

const OPERATORS: &[&str] = &[
    "<<=", ">>=", "&^=", ":=", "==", "!=", "<=", ">=", "&&", "||", "<-", "++", "--", "+", "-",
    "*", "/", "%", "&", "|", "^", "<", ">", "=", "!", "(", ")", "{", "}", "[", "]", ",", ".", ";",
    ":",
];

pub fn parser() -> CompiledParser {
    let mut alts: Vec<Combinator> = vec![
        whitespace(),
        line_comment("//"),
        block_comment("/*", "*/"),
        quoted_string("\""),
        quoted_string("`"),
        quoted_string("'"),
        number(),
        ident_or_keyword(KEYWORDS),
    ];
    alts.extend(OPERATORS.iter().map(|op| operator(op)));
    CompiledParser {
        root: any_of(alts),
    }
}
