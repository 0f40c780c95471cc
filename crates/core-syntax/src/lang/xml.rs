//! XML/HTML lexical rules: tags, attributes, comments, and text runs.

use super::CompiledParser;
use crate::combinator::Combinator;
use crate::token::TokenRole;

fn comment() -> Combinator {
    Combinator::Delimited {
        open: "<!--",
        close: "-->",
        role: TokenRole::Comment,
        close_optional_at_eof: true,
    }
}

fn tag() -> Combinator {
    // "<" ... ">" including the optional leading "/" and self-closing "/>".
    Combinator::Delimited {
        open: "<",
        close: ">",
        role: TokenRole::Keyword,
        close_optional_at_eof: false,
    }
}

fn attr_string(quote: &'static str) -> Combinator {
    Combinator::Delimited {
        open: quote,
        close: quote,
        role: TokenRole::String,
        close_optional_at_eof: false,
    }
}

fn text_run() -> Combinator {
    Combinator::While {
        pred: |c| c != '<',
        min: 1,
        role: None,
    }
}

fn single_char() -> Combinator {
    Combinator::While {
        pred: |_| true,
        min: 1,
        role: None,
    }
}

pub fn parser() -> CompiledParser {
    CompiledParser {
        root: Combinator::Or(
            vec![
                comment(),
                tag(),
                attr_string("\""),
                attr_string("'"),
                text_run(),
                single_char(),
            ]
            .into(),
        ),
    }
}
