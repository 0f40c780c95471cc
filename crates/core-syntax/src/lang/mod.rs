//! Language rule sets: Go, C, Rust, Bash, Markdown, XML. Each module
//! exposes `parser()`, compiled once and reused for every buffer opened in
//! that language.

pub mod bash;
pub mod c;
pub mod common;
pub mod go;
pub mod markdown;
pub mod rust_lang;
pub mod xml;

use crate::combinator::Combinator;

#[derive(Clone)]
pub struct CompiledParser {
    pub root: Combinator,
}

/// `None` means plain text: no tokenisation.
pub fn parser_for_language(name: &str) -> Option<CompiledParser> {
    match name {
        "go" => Some(go::parser()),
        "c" => Some(c::parser()),
        "rust" => Some(rust_lang::parser()),
        "bash" | "sh" => Some(bash::parser()),
        "markdown" | "md" => Some(markdown::parser()),
        "xml" | "html" => Some(xml::parser()),
        _ => None,
    }
}
