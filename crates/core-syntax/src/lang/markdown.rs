//! Markdown lexical rules: this is a *lexical* combinator over inline and
//! line-leading markers (headings, emphasis, code spans, links), not a
//! block-structure CommonMark parser — block nesting (lists inside
//! blockquotes inside list items, etc.) is out of scope.

use super::CompiledParser;
use crate::combinator::Combinator;
use crate::token::TokenRole;

fn heading_marker() -> Combinator {
    Combinator::While {
        pred: |c| c == '#',
        min: 1,
        role: Some(TokenRole::Custom(1)),
    }
}

fn fenced_code_block() -> Combinator {
    Combinator::Delimited {
        open: "```",
        close: "```",
        role: TokenRole::Custom(2),
        close_optional_at_eof: true,
    }
}

fn inline_code() -> Combinator {
    Combinator::Delimited {
        open: "`",
        close: "`",
        role: TokenRole::Custom(2),
        close_optional_at_eof: false,
    }
}

fn bold() -> Combinator {
    Combinator::Delimited {
        open: "**",
        close: "**",
        role: TokenRole::Custom(3),
        close_optional_at_eof: false,
    }
}

fn italic() -> Combinator {
    Combinator::Delimited {
        open: "*",
        close: "*",
        role: TokenRole::Custom(4),
        close_optional_at_eof: false,
    }
}

fn link() -> Combinator {
    // [text](url) — tokenized as a single custom span; the split between
    // label and target is a rendering concern, not a lexical one here.
    Combinator::Then(
        std::rc::Rc::new(Combinator::Delimited {
            open: "[",
            close: "]",
            role: TokenRole::Custom(5),
            close_optional_at_eof: false,
        }),
        std::rc::Rc::new(Combinator::Delimited {
            open: "(",
            close: ")",
            role: TokenRole::Custom(5),
            close_optional_at_eof: false,
        }),
    )
}

fn plain_run() -> Combinator {
    Combinator::While {
        pred: |c| !matches!(c, '#' | '`' | '*' | '['),
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
                heading_marker(),
                fenced_code_block(),
                inline_code(),
                bold(),
                italic(),
                link(),
                plain_run(),
                single_char(),
            ]
            .into(),
        ),
    }
}
