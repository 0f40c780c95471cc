//! Building blocks shared across language rule sets: identifiers, numbers,
//! quoted strings, and line/block comments, each expressed once as a
//! `Combinator` value rather than re-implemented per language.

use std::rc::Rc;

use crate::combinator::Combinator;
use crate::token::TokenRole;

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn whitespace() -> Combinator {
    Combinator::While {
        pred: |c| c.is_whitespace(),
        min: 1,
        role: None,
    }
}

/// Identifier that resolves to `Keyword` when its text is in `keywords`,
/// otherwise is not emitted as a token at all (bare identifiers have no
/// dedicated role).
pub fn ident_or_keyword(keywords: &'static [&'static str]) -> Combinator {
    reclassify_ident(keywords)
}

fn reclassify_ident(keywords: &'static [&'static str]) -> Combinator {
    // `WhileFirstRest` can't see the matched text to decide keyword-ness
    // (it only knows predicates), so identifiers are consumed via a
    // two-pass trick: first match the span silently, then re-run a keyword
    // literal alternation anchored at the same start. `Or` tries each
    // keyword literal (longest form wins via `ThenNot` on a trailing
    // identifier character) before falling back to a silent identifier
    // scan that emits no token.
    let literal_alts: Vec<Combinator> = keywords
        .iter()
        .map(|kw| {
            Combinator::ThenNot(
                Rc::new(Combinator::Lit(kw, TokenRole::Keyword)),
                Rc::new(Combinator::While {
                    pred: is_ident_continue,
                    min: 1,
                    role: None,
                }),
            )
        })
        .collect();
    let mut alts = literal_alts;
    alts.push(Combinator::WhileFirstRest {
        first: is_ident_start,
        rest: is_ident_continue,
        role: None,
    });
    Combinator::Or(alts.into())
}

pub fn number() -> Combinator {
    Combinator::While {
        pred: |c| c.is_ascii_digit() || c == '.' || c == '_',
        min: 1,
        role: Some(TokenRole::Number),
    }
}

pub fn line_comment(marker: &'static str) -> Combinator {
    Combinator::Delimited {
        open: marker,
        close: "\n",
        role: TokenRole::Comment,
        close_optional_at_eof: true,
    }
}

pub fn block_comment(open: &'static str, close: &'static str) -> Combinator {
    Combinator::Delimited {
        open,
        close,
        role: TokenRole::Comment,
        close_optional_at_eof: true,
    }
}

pub fn quoted_string(quote: &'static str) -> Combinator {
    Combinator::Delimited {
        open: quote,
        close: quote,
        role: TokenRole::String,
        close_optional_at_eof: true,
    }
}

pub fn operator(lit: &'static str) -> Combinator {
    Combinator::Lit(lit, TokenRole::Operator)
}

pub fn any_of(alts: Vec<Combinator>) -> Combinator {
    Combinator::Or(alts.into())
}
