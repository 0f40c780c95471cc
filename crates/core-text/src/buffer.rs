//! Line/byte-addressed facade over [`Tree`], and the line-local motion
//! primitives every mode-aware caller (`core-state`, `core-actions`) shares.
//!
//! `Tree` itself only knows absolute rune indices. Everything above it
//! thinks in terms of a `(line, byte)` cursor and whole-document byte
//! ranges, so `Buffer` is the seam that does the conversion: it owns a
//! `Tree` and a display name, and every method here either walks the tree
//! once to translate a coordinate or delegates straight through.

use crate::segment;
use crate::tree::{BufferError, Tree};

/// A cursor-shaped coordinate: a line index and a byte offset within that
/// line, excluding the line's own trailing newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub byte: usize,
}

impl Position {
    pub fn origin() -> Self {
        Position { line: 0, byte: 0 }
    }

    /// Clamp `line` to the last valid line and `byte` to whatever
    /// `line_len` reports for that (possibly adjusted) line.
    pub fn clamp_to(&mut self, line_count: usize, line_len: impl Fn(usize) -> usize) {
        if line_count == 0 {
            self.line = 0;
            self.byte = 0;
            return;
        }
        if self.line >= line_count {
            self.line = line_count - 1;
        }
        let len = line_len(self.line);
        if self.byte > len {
            self.byte = len;
        }
    }
}

/// Named document buffer: a [`Tree`] plus the `(line, byte)` <-> absolute
/// translation the rest of the editor builds on.
#[derive(Debug, Clone)]
pub struct Buffer {
    name: String,
    tree: Tree,
}

impl Buffer {
    pub fn from_str(name: &str, text: &str) -> Result<Self, BufferError> {
        Ok(Buffer {
            name: name.to_string(),
            tree: Tree::from_str(text),
        })
    }

    pub fn from_reader<R: std::io::Read>(name: &str, src: R) -> Result<Self, BufferError> {
        Ok(Buffer {
            name: name.to_string(),
            tree: Tree::from_reader(src)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Escape hatch down to the absolute-rune-indexed tree, for callers
    /// that need the document-wide locator vocabulary in `core-locate`
    /// rather than this module's line-local motions.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn is_empty(&self) -> bool {
        self.tree.num_chars() == 0
    }

    pub fn line_count(&self) -> usize {
        self.tree.num_lines()
    }

    /// Content of `line`, including its trailing `\n` if it has one.
    /// `None` if `line` is past the end of the buffer.
    pub fn line(&self, line: usize) -> Option<String> {
        if line >= self.tree.num_lines() {
            return None;
        }
        let start_char = self.tree.line_start_position(line);
        let end_char = if line + 1 < self.tree.num_lines() {
            self.tree.line_start_position(line + 1)
        } else {
            self.tree.num_chars()
        };
        let start_byte = self.tree.char_to_byte(start_char);
        let end_byte = self.tree.char_to_byte(end_char);
        let whole = self.tree.to_string();
        Some(whole[start_byte..end_byte].to_string())
    }

    /// Byte length of `line`, excluding its trailing newline.
    pub fn line_byte_len(&self, line: usize) -> usize {
        match self.line(line) {
            Some(l) => l.strip_suffix('\n').unwrap_or(&l).len(),
            None => 0,
        }
    }

    fn line_start_byte(&self, line: usize) -> usize {
        let char_idx = self.tree.line_start_position(line);
        self.tree.char_to_byte(char_idx)
    }

    /// Absolute document byte offset of a `(line, byte)` coordinate.
    pub fn absolute_byte(&self, pos: Position) -> usize {
        self.line_start_byte(pos.line) + pos.byte
    }

    /// Absolute character index of a `(line, byte)` coordinate, the
    /// coordinate system `core-syntax`'s tokenizer and `core-locate`'s
    /// motion catalogue operate in.
    pub fn char_at(&self, pos: Position) -> usize {
        self.tree.byte_to_char(self.absolute_byte(pos))
    }

    /// Inverse of [`Buffer::absolute_byte`].
    pub fn position_at_byte(&self, abs_byte: usize) -> Position {
        let abs_byte = abs_byte.min(self.tree.num_bytes());
        let char_idx = self.tree.byte_to_char(abs_byte);
        let line = self.tree.line_num_for_position(char_idx);
        let line_start = self.line_start_byte(line);
        Position {
            line,
            byte: abs_byte - line_start,
        }
    }

    /// Absolute byte range `[start, end)`, decoded as a `String`.
    pub fn slice_bytes(&self, start: usize, end: usize) -> String {
        let whole = self.tree.to_string();
        let start = start.min(whole.len());
        let end = end.min(whole.len());
        if start >= end {
            return String::new();
        }
        whole[start..end].to_string()
    }

    /// Insert `text` (one or more runes, e.g. a grapheme cluster) at `pos`,
    /// advancing `pos` past what was inserted.
    pub fn insert_grapheme(&mut self, pos: &mut Position, text: &str) {
        let abs = self.absolute_byte(*pos);
        let mut idx = self.tree.byte_to_char(abs);
        for ch in text.chars() {
            self.tree
                .insert_at_position(idx, ch)
                .expect("cursor position is always within tree bounds");
            idx += 1;
        }
        pos.byte += text.len();
    }

    /// Split the line at `pos`, moving the cursor to the start of the new
    /// line that follows.
    pub fn insert_newline(&mut self, pos: &mut Position) {
        let abs = self.absolute_byte(*pos);
        let idx = self.tree.byte_to_char(abs);
        self.tree
            .insert_at_position(idx, '\n')
            .expect("cursor position is always within tree bounds");
        pos.line += 1;
        pos.byte = 0;
    }

    /// Remove the absolute byte range `[start, end)` and return what was
    /// removed. Order-independent: `start > end` is treated as swapped.
    pub fn delete_bytes(&mut self, start: usize, end: usize) -> String {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let start_char = self.tree.byte_to_char(start);
        let end_char = self.tree.byte_to_char(end);
        let mut removed = String::new();
        for _ in start_char..end_char {
            let (ch, _) = self.tree.delete_at_position(start_char);
            removed.push(ch);
        }
        removed
    }

    /// Remove the grapheme cluster at `pos` (a no-op at end of buffer).
    /// `pos` itself is left unchanged, matching a block cursor resting on
    /// whatever now occupies that cell.
    pub fn delete_grapheme_at(&mut self, pos: &mut Position) -> String {
        let abs = self.absolute_byte(*pos);
        if abs >= self.tree.num_bytes() {
            return String::new();
        }
        let whole = self.tree.to_string();
        let end = segment::next_boundary(&whole, abs);
        self.delete_bytes(abs, end)
    }

    /// Remove the grapheme cluster before `pos`, moving `pos` back onto it.
    pub fn delete_grapheme_before(&mut self, pos: &mut Position) -> String {
        let abs = self.absolute_byte(*pos);
        if abs == 0 {
            return String::new();
        }
        let whole = self.tree.to_string();
        let start = segment::prev_boundary(&whole, abs);
        let removed = self.delete_bytes(start, abs);
        *pos = self.position_at_byte(start);
        removed
    }
}

impl std::fmt::Display for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tree.to_string())
    }
}

/// Line-local cursor motions shared by every mode that walks text (spec'd
/// more fully, with full document-wide locators, by `core-locate`; these
/// cover the narrow horizontal/vertical set the dispatcher calls inline).
pub mod motion {
    use super::{segment, Buffer, Position};

    fn line_content(buffer: &Buffer, line: usize) -> String {
        let l = buffer.line(line).unwrap_or_default();
        l.strip_suffix('\n').map(str::to_string).unwrap_or(l)
    }

    fn char_class(c: char) -> u8 {
        if c.is_whitespace() {
            0
        } else if c.is_alphanumeric() || c == '_' {
            1
        } else {
            2
        }
    }

    pub fn left(buffer: &Buffer, pos: &mut Position) {
        if pos.byte == 0 {
            return;
        }
        let content = line_content(buffer, pos.line);
        pos.byte = segment::prev_boundary(&content, pos.byte.min(content.len()));
    }

    pub fn right(buffer: &Buffer, pos: &mut Position) {
        let content = line_content(buffer, pos.line);
        if pos.byte >= content.len() {
            return;
        }
        pos.byte = segment::next_boundary(&content, pos.byte);
    }

    pub fn line_start(_buffer: &Buffer, pos: &mut Position) {
        pos.byte = 0;
    }

    pub fn line_end(buffer: &Buffer, pos: &mut Position) {
        pos.byte = buffer.line_byte_len(pos.line);
    }

    pub fn up(buffer: &Buffer, pos: &mut Position, sticky: Option<usize>) -> Option<usize> {
        let col = sticky.unwrap_or(pos.byte);
        if pos.line == 0 {
            return Some(col);
        }
        pos.line -= 1;
        pos.byte = col.min(buffer.line_byte_len(pos.line));
        Some(col)
    }

    pub fn down(buffer: &Buffer, pos: &mut Position, sticky: Option<usize>) -> Option<usize> {
        let col = sticky.unwrap_or(pos.byte);
        let last = buffer.line_count().saturating_sub(1);
        if pos.line >= last {
            return Some(col);
        }
        pos.line += 1;
        pos.byte = col.min(buffer.line_byte_len(pos.line));
        Some(col)
    }

    pub fn word_forward(buffer: &Buffer, pos: &mut Position) {
        let content = line_content(buffer, pos.line);
        if pos.byte >= content.len() {
            return;
        }
        let chars: Vec<(usize, char)> = content.char_indices().collect();
        let mut i = chars
            .iter()
            .position(|&(b, _)| b == pos.byte)
            .unwrap_or(chars.len());
        if i >= chars.len() {
            pos.byte = content.len();
            return;
        }
        let start_class = char_class(chars[i].1);
        if start_class != 0 {
            while i < chars.len() && char_class(chars[i].1) == start_class {
                i += 1;
            }
        }
        while i < chars.len() && char_class(chars[i].1) == 0 {
            i += 1;
        }
        pos.byte = if i < chars.len() {
            chars[i].0
        } else {
            content.len()
        };
    }

    pub fn word_backward(buffer: &Buffer, pos: &mut Position) {
        let content = line_content(buffer, pos.line);
        if pos.byte == 0 {
            return;
        }
        let chars: Vec<(usize, char)> = content.char_indices().collect();
        let mut i = chars
            .iter()
            .position(|&(b, _)| b == pos.byte)
            .unwrap_or(chars.len());
        if i == 0 {
            pos.byte = 0;
            return;
        }
        i -= 1;
        while i > 0 && char_class(chars[i].1) == 0 {
            i -= 1;
        }
        let class = char_class(chars[i].1);
        while i > 0 && char_class(chars[i - 1].1) == class {
            i -= 1;
        }
        pos.byte = chars[i].0;
    }

    /// Vim's block-cursor rule: in Normal mode the cursor can never rest
    /// one byte past the last grapheme of a non-empty line.
    pub fn normalize_normal_mode_position(buffer: &Buffer, pos: &mut Position) {
        let content = line_content(buffer, pos.line);
        if content.is_empty() {
            pos.byte = 0;
            return;
        }
        if pos.byte >= content.len() {
            pos.byte = segment::prev_boundary(&content, content.len());
        }
    }
}
