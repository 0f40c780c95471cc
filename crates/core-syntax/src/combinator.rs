//! Parser combinators.
//!
//! A parse function is `(chars, at, state) -> ParseOutcome` obeying four
//! laws: determinism, progress (`consumed >= 1` on success, `== 0` on
//! failure), interiority (tokens lie within `[0, consumed)` and are
//! ordered/non-overlapping), and tracking (`max_read` records the
//! furthest character position inspected, which may exceed `consumed`
//! when a combinator looked ahead and backed off). `Combinator` values
//! are built once per language at registration time — composing `Then`,
//! `Or`, and friends into a tree of plain enum values, not boxed
//! closures rebuilt on every call, mirrors `core-keymap`'s compiled-trie
//! approach to "compile once, traverse many".

use std::rc::Rc;

use crate::token::{StateId, Token};

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub consumed: usize,
    pub tokens: Vec<Token>,
    pub next_state: StateId,
    pub max_read: usize,
}

impl ParseOutcome {
    fn fail(state: StateId, max_read: usize) -> Self {
        ParseOutcome {
            consumed: 0,
            tokens: Vec::new(),
            next_state: state,
            max_read,
        }
    }

    pub fn is_success(&self) -> bool {
        self.consumed > 0
    }
}

type Predicate = fn(char) -> bool;
type TokenMap = fn(Vec<Token>) -> Vec<Token>;

#[derive(Clone)]
pub enum Combinator {
    /// Match a literal string verbatim; on success emits one token of
    /// the given role spanning the whole literal.
    Lit(&'static str, crate::token::TokenRole),
    /// Consume a run of characters matching `pred`, requiring at least
    /// `min` to succeed. Emits one token over the run if `role` is set,
    /// otherwise consumes silently (used for whitespace).
    While {
        pred: Predicate,
        min: usize,
        role: Option<crate::token::TokenRole>,
    },
    /// Like `While`, but the first character must satisfy `first` and
    /// the rest `rest` (identifiers: letter/underscore then alnum).
    WhileFirstRest {
        first: Predicate,
        rest: Predicate,
        role: Option<crate::token::TokenRole>,
    },
    /// `open` .. `close` delimited run (line comments use an
    /// end-of-line-or-input close; block comments an explicit closing
    /// literal). `close` is consumed too.
    Delimited {
        open: &'static str,
        close: &'static str,
        role: crate::token::TokenRole,
        close_optional_at_eof: bool,
    },
    Then(Rc<Combinator>, Rc<Combinator>),
    Or(Rc<[Combinator]>),
    ThenMaybe(Rc<Combinator>, Rc<Combinator>),
    ThenNot(Rc<Combinator>, Rc<Combinator>),
    Map(Rc<Combinator>, TokenMap),
    InStates(Rc<[StateId]>, Rc<Combinator>),
    SetState(Rc<Combinator>, StateId),
}

fn chars_eq(chars: &[char], at: usize, lit: &str) -> Option<usize> {
    let mut i = at;
    for c in lit.chars() {
        if i >= chars.len() || chars[i] != c {
            return None;
        }
        i += 1;
    }
    Some(i - at)
}

pub fn eval(comb: &Combinator, chars: &[char], at: usize, state: StateId) -> ParseOutcome {
    match comb {
        Combinator::Lit(lit, role) => {
            let probe_end = (at + lit.chars().count()).min(chars.len());
            match chars_eq(chars, at, lit) {
                Some(n) => ParseOutcome {
                    consumed: n,
                    tokens: vec![Token::new(at, n, *role)],
                    next_state: state,
                    max_read: at + n,
                },
                None => ParseOutcome::fail(state, probe_end),
            }
        }
        Combinator::While { pred, min, role } => {
            let mut i = at;
            while i < chars.len() && pred(chars[i]) {
                i += 1;
            }
            let n = i - at;
            if n < *min {
                return ParseOutcome::fail(state, i);
            }
            let tokens = match role {
                Some(r) => vec![Token::new(at, n, *r)],
                None => Vec::new(),
            };
            ParseOutcome {
                consumed: n,
                tokens,
                next_state: state,
                max_read: i,
            }
        }
        Combinator::WhileFirstRest { first, rest, role } => {
            if at >= chars.len() || !first(chars[at]) {
                return ParseOutcome::fail(state, (at + 1).min(chars.len()));
            }
            let mut i = at + 1;
            while i < chars.len() && rest(chars[i]) {
                i += 1;
            }
            let n = i - at;
            let tokens = match role {
                Some(r) => vec![Token::new(at, n, *r)],
                None => Vec::new(),
            };
            ParseOutcome {
                consumed: n,
                tokens,
                next_state: state,
                max_read: i,
            }
        }
        Combinator::Delimited {
            open,
            close,
            role,
            close_optional_at_eof,
        } => {
            let open_len = match chars_eq(chars, at, open) {
                Some(n) => n,
                None => return ParseOutcome::fail(state, (at + open.chars().count()).min(chars.len())),
            };
            let mut i = at + open_len;
            loop {
                if i >= chars.len() {
                    if *close_optional_at_eof {
                        return ParseOutcome {
                            consumed: i - at,
                            tokens: vec![Token::new(at, i - at, *role)],
                            next_state: state,
                            max_read: i,
                        };
                    }
                    return ParseOutcome::fail(state, i);
                }
                if let Some(close_len) = chars_eq(chars, i, close) {
                    let end = i + close_len;
                    return ParseOutcome {
                        consumed: end - at,
                        tokens: vec![Token::new(at, end - at, *role)],
                        next_state: state,
                        max_read: end,
                    };
                }
                i += 1;
            }
        }
        Combinator::Then(a, b) => {
            let ra = eval(a, chars, at, state);
            if !ra.is_success() {
                return ParseOutcome::fail(state, ra.max_read);
            }
            let rb = eval(b, chars, at + ra.consumed, ra.next_state);
            if !rb.is_success() {
                return ParseOutcome::fail(state, ra.max_read.max(rb.max_read));
            }
            let mut tokens = ra.tokens;
            tokens.extend(rb.tokens);
            ParseOutcome {
                consumed: ra.consumed + rb.consumed,
                tokens,
                next_state: rb.next_state,
                max_read: ra.max_read.max(rb.max_read),
            }
        }
        Combinator::Or(alts) => {
            let mut max_read = at;
            for alt in alts.iter() {
                let r = eval(alt, chars, at, state);
                max_read = max_read.max(r.max_read);
                if r.is_success() {
                    return ParseOutcome { max_read, ..r };
                }
            }
            ParseOutcome::fail(state, max_read)
        }
        Combinator::ThenMaybe(a, b) => {
            let ra = eval(a, chars, at, state);
            if !ra.is_success() {
                return ParseOutcome::fail(state, ra.max_read);
            }
            let rb = eval(b, chars, at + ra.consumed, ra.next_state);
            if rb.is_success() {
                let mut tokens = ra.tokens;
                tokens.extend(rb.tokens);
                ParseOutcome {
                    consumed: ra.consumed + rb.consumed,
                    tokens,
                    next_state: rb.next_state,
                    max_read: ra.max_read.max(rb.max_read),
                }
            } else {
                ParseOutcome {
                    consumed: ra.consumed,
                    tokens: ra.tokens,
                    next_state: ra.next_state,
                    max_read: ra.max_read.max(rb.max_read),
                }
            }
        }
        Combinator::ThenNot(a, b) => {
            let ra = eval(a, chars, at, state);
            if !ra.is_success() {
                return ParseOutcome::fail(state, ra.max_read);
            }
            let rb = eval(b, chars, at + ra.consumed, ra.next_state);
            let max_read = ra.max_read.max(rb.max_read);
            if rb.is_success() {
                ParseOutcome::fail(state, max_read)
            } else {
                ParseOutcome {
                    consumed: ra.consumed,
                    tokens: ra.tokens,
                    next_state: ra.next_state,
                    max_read,
                }
            }
        }
        Combinator::Map(inner, f) => {
            let r = eval(inner, chars, at, state);
            if !r.is_success() {
                return r;
            }
            ParseOutcome {
                tokens: f(r.tokens),
                ..r
            }
        }
        Combinator::InStates(allowed, inner) => {
            if !allowed.contains(&state) {
                return ParseOutcome::fail(state, at);
            }
            eval(inner, chars, at, state)
        }
        Combinator::SetState(inner, new_state) => {
            let r = eval(inner, chars, at, state);
            if !r.is_success() {
                return r;
            }
            ParseOutcome {
                next_state: *new_state,
                ..r
            }
        }
    }
}

/// Top-level recovery wrapper: if every branch of the
/// language's root combinator fails at `at`, consume one rune without
/// emitting a token so the cache builder always makes forward progress.
pub fn eval_with_recovery(root: &Combinator, chars: &[char], at: usize, state: StateId) -> ParseOutcome {
    if at >= chars.len() {
        return ParseOutcome {
            consumed: 0,
            tokens: Vec::new(),
            next_state: state,
            max_read: at,
        };
    }
    let r = eval(root, chars, at, state);
    if r.is_success() {
        return r;
    }
    ParseOutcome {
        consumed: 1,
        tokens: Vec::new(),
        next_state: state,
        max_read: r.max_read.max(at + 1),
    }
}
