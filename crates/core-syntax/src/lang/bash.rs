//! Bash lexical rules.
//!
//! Heredocs are recognised only as the `<<WORD` operator pair; the body
//! between the opening word and its matching closing line is not given
//! its own parser state, and a redirect appearing after the heredoc word
//! on the same line (`<<EOF >out.txt`) is not specially handled. Both are
//! deliberate scope limits, not bugs — see the corresponding entry in
//! DESIGN.md.

use super::common::*;
use super::CompiledParser;
use crate::combinator::Combinator;
use crate::token::TokenRole;

const KEYWORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "for", "while", "until", "do", "done", "case", "esac",
    "function", "select", "in", "time",
];

const OPERATORS: &[&str] = &[
    "<<-", "<<", ">>", "&&", "||", "|&", ";;", "|", "&", ";", "(", ")", "{", "}", "<", ">", "=",
];

fn variable() -> Combinator {
    Combinator::Or(
        vec![
            Combinator::Delimited {
                open: "${",
                close: "}",
                role: TokenRole::Custom(0),
                close_optional_at_eof: true,
            },
            Combinator::WhileFirstRest {
                first: |c| c == '$',
                rest: |c| c.is_alphanumeric() || c == '_',
                role: Some(TokenRole::Custom(0)),
            },
        ]
        .into(),
    )
}

pub fn parser() -> CompiledParser {
    let mut alts: Vec<Combinator> = vec![
        whitespace(),
        line_comment("#"),
        quoted_string("\""),
        quoted_string("'"),
        variable(),
        ident_or_keyword(KEYWORDS),
    ];
    alts.extend(OPERATORS.iter().map(|op| operator(op)));
    CompiledParser {
        root: any_of(alts),
    }
}
