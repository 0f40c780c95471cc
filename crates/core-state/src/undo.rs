use core_text::{Buffer, Position};
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

use crate::Mode;

/// Maximum number of snapshots retained in undo history.
pub const UNDO_HISTORY_MAX: usize = 200;

/// Snapshot classification controlling restore semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotKind {
    /// Text edit snapshot (coalesced insert run or discrete edit). Mode is not restored.
    Edit,
    // Future: ModeTransition, Structural, etc.
}

/// A full-state snapshot for undo/redo (Phase 1: coarse clone for simplicity).
#[derive(Clone)]
pub struct EditSnapshot {
    pub kind: SnapshotKind,
    pub buffer: Buffer,
    pub position: Position,
    pub mode: Mode,
    /// Content hash of the buffer at snapshot capture (Phase 3 Step 11).
    pub hash: u64,
}

/// Insert run state tracking (Refactor R1 Step 6).
#[derive(Debug, Clone)]
pub enum InsertRun {
    Inactive,
    Active {
        started_at: std::time::Instant,
        edits: u32,
    },
}

pub struct UndoEngine {
    undo_stack: Vec<EditSnapshot>,
    redo_stack: Vec<EditSnapshot>,
    insert_run: InsertRun,
    /// Count of snapshots skipped due to identical successive state (Phase 3 Step 11).
    undo_snapshots_skipped: AtomicU64,
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoEngine {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            insert_run: InsertRun::Inactive,
            undo_snapshots_skipped: AtomicU64::new(0),
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
    pub fn insert_run(&self) -> &InsertRun {
        &self.insert_run
    }
    pub fn snapshots_skipped(&self) -> u64 {
        self.undo_snapshots_skipped.load(Ordering::Relaxed)
    }

    pub fn push_snapshot(
        &mut self,
        kind: SnapshotKind,
        cursor: Position,
        buffer: &Buffer,
        mode: Mode,
    ) {
        let current_hash = buffer_hash(buffer);
        if let Some(last) = self.undo_stack.last()
            && last.hash == current_hash
        {
            self.undo_snapshots_skipped.fetch_add(1, Ordering::Relaxed);
            trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), hash = current_hash, "snapshot_dedupe_skip");
            return;
        }
        let snap = EditSnapshot {
            kind,
            buffer: buffer.clone(),
            position: cursor,
            mode,
            hash: current_hash,
        };
        let rope_lines_before = buffer.line_count();
        self.undo_stack.push(snap);
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), lines = rope_lines_before, hash = current_hash, "push_snapshot");
        if self.undo_stack.len() > UNDO_HISTORY_MAX {
            let _ = self.undo_stack.remove(0);
            trace!(target: "state.undo", "undo_stack_trimmed");
        }
        self.redo_stack.clear();
        trace!(target: "state.undo", "redo_stack_cleared_on_new_edit");
    }

    pub fn begin_insert_coalescing(&mut self, cursor: Position, buffer: &Buffer, mode: Mode) {
        match self.insert_run {
            InsertRun::Inactive => {
                self.push_snapshot(SnapshotKind::Edit, cursor, buffer, mode);
                self.insert_run = InsertRun::Active {
                    started_at: std::time::Instant::now(),
                    edits: 0,
                };
            }
            InsertRun::Active { .. } => {}
        }
    }

    pub fn end_insert_coalescing(&mut self) {
        self.insert_run = InsertRun::Inactive;
    }
    pub fn push_discrete_edit_snapshot(&mut self, cursor: Position, buffer: &Buffer, mode: Mode) {
        self.push_snapshot(SnapshotKind::Edit, cursor, buffer, mode);
    }
    pub fn note_insert_edit(&mut self) {
        if let InsertRun::Active { edits, .. } = &mut self.insert_run {
            *edits += 1;
        }
    }

    /// The operations the most recently pushed snapshot would undo if
    /// `current` is the live buffer, expressed as `Insert`/`Delete`
    /// operations. `None` if no snapshot has been pushed yet.
    pub fn pending_ops(&self, current: &Buffer) -> Option<Vec<Op>> {
        self.undo_stack.last().map(|snap| diff_ops(&snap.buffer, current))
    }

    pub fn undo(&mut self, cursor: &mut Position, buffer: &mut Buffer, mode: &mut Mode) -> bool {
        if let Some(last) = self.undo_stack.pop() {
            trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "undo_pop");
            let current = EditSnapshot {
                kind: last.kind,
                buffer: buffer.clone(),
                position: *cursor,
                mode: *mode,
                hash: buffer_hash(buffer),
            };
            self.redo_stack.push(current);
            trace!(target: "state.undo", redo_depth = self.redo_stack.len(), "redo_push_from_undo");
            *buffer = last.buffer;
            *cursor = last.position;
            if !matches!(last.kind, SnapshotKind::Edit) {
                *mode = last.mode;
            }
            true
        } else {
            false
        }
    }

    pub fn redo(&mut self, cursor: &mut Position, buffer: &mut Buffer, mode: &mut Mode) -> bool {
        if let Some(next) = self.redo_stack.pop() {
            trace!(target: "state.undo", redo_depth = self.redo_stack.len(), undo_depth = self.undo_stack.len(), "redo_pop");
            let current = EditSnapshot {
                kind: next.kind,
                buffer: buffer.clone(),
                position: *cursor,
                mode: *mode,
                hash: buffer_hash(buffer),
            };
            self.undo_stack.push(current);
            trace!(target: "state.undo", undo_depth = self.undo_stack.len(), "undo_push_from_redo");
            *buffer = next.buffer;
            *cursor = next.position;
            if !matches!(next.kind, SnapshotKind::Edit) {
                *mode = next.mode;
            }
            true
        } else {
            false
        }
    }
}

fn buffer_hash(buf: &Buffer) -> u64 {
    let mut h = DefaultHasher::new();
    for i in 0..buf.line_count() {
        if let Some(l) = buf.line(i) {
            h.write(l.as_bytes());
        }
    }
    h.finish()
}

/// An undo entry, in terms of an ordered list of `Insert{pos, text}` /
/// `Delete{pos, text, linewise?}` operations. `UndoEngine` stores
/// whole-buffer snapshots rather than operation lists internally (see
/// `EditSnapshot`, validated by this crate's dispatcher-level test suite),
/// but the ops themselves are a real, recoverable view: diffing two
/// snapshots' text by common prefix/suffix recovers exactly the edit that
/// was applied between them, since every entry in this engine corresponds
/// to a single contiguous text change (one coalesced insert run, or one
/// discrete delete/replace).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Insert { pos: Position, text: String },
    Delete { pos: Position, text: String, linewise: bool },
}

/// Recover the ops that were applied to `before` to produce `after`.
///
/// Returns an empty vec if the two buffers hold identical text. Otherwise
/// returns at most one `Delete` (the text `before` had that `after` does
/// not) followed by at most one `Insert` (the text `after` has that
/// `before` did not), matching the order operations would need replaying
/// in to turn `before` into `after`.
pub fn diff_ops(before: &Buffer, after: &Buffer) -> Vec<Op> {
    let old = before.tree().to_string();
    let new = after.tree().to_string();
    if old == new {
        return Vec::new();
    }
    let old_bytes = old.as_bytes();
    let new_bytes = new.as_bytes();
    let max_common = old_bytes.len().min(new_bytes.len());
    let mut prefix = 0usize;
    while prefix < max_common && old_bytes[prefix] == new_bytes[prefix] {
        prefix += 1;
    }
    // Bytes before `prefix` are identical in both strings, so char-boundary
    // status at any index <= prefix agrees between them; back off to a
    // boundary that's valid in both before slicing.
    while prefix > 0 && !old.is_char_boundary(prefix) {
        prefix -= 1;
    }
    // Don't let the shared suffix eat back into the shared prefix.
    let max_suffix = max_common - prefix;
    let mut suffix = 0usize;
    while suffix < max_suffix
        && old_bytes[old_bytes.len() - 1 - suffix] == new_bytes[new_bytes.len() - 1 - suffix]
    {
        suffix += 1;
    }
    // The suffix boundary must be valid in *both* strings independently —
    // unlike the prefix, the bytes just inside it aren't necessarily shared.
    while suffix > 0
        && (!old.is_char_boundary(old_bytes.len() - suffix)
            || !new.is_char_boundary(new_bytes.len() - suffix))
    {
        suffix -= 1;
    }
    let old_mid = &old[prefix..old_bytes.len() - suffix];
    let new_mid = &new[prefix..new_bytes.len() - suffix];
    let pos = before.position_at_byte(prefix);
    let mut ops = Vec::with_capacity(2);
    if !old_mid.is_empty() {
        let linewise = prefix == 0 || old_bytes[prefix - 1] == b'\n';
        let linewise = linewise && old_mid.ends_with('\n');
        ops.push(Op::Delete {
            pos,
            text: old_mid.to_string(),
            linewise,
        });
    }
    if !new_mid.is_empty() {
        ops.push(Op::Insert {
            pos,
            text: new_mid.to_string(),
        });
    }
    ops
}

#[cfg(test)]
mod diff_tests {
    use super::*;

    fn buf(text: &str) -> Buffer {
        Buffer::from_str("t", text).unwrap()
    }

    #[test]
    fn pure_insert_at_end_is_a_single_insert_op() {
        let before = buf("abc");
        let after = buf("abc\nd");
        let ops = diff_ops(&before, &after);
        assert_eq!(
            ops,
            vec![Op::Insert {
                pos: Position { line: 0, byte: 3 },
                text: "\nd".to_string(),
            }]
        );
    }

    #[test]
    fn pure_delete_is_a_single_delete_op() {
        // S1: "abc\nd" with the trailing 'd' removed via PrevCharInLine.
        let before = buf("abc\nd");
        let after = buf("abc\n");
        let ops = diff_ops(&before, &after);
        assert_eq!(
            ops,
            vec![Op::Delete {
                pos: Position { line: 1, byte: 0 },
                text: "d".to_string(),
                linewise: false,
            }]
        );
    }

    #[test]
    fn identical_buffers_yield_no_ops() {
        let before = buf("same");
        let after = buf("same");
        assert!(diff_ops(&before, &after).is_empty());
    }

    #[test]
    fn replace_produces_delete_then_insert() {
        let before = buf("foo bar baz");
        let after = buf("foo XYZ baz");
        let ops = diff_ops(&before, &after);
        assert_eq!(
            ops,
            vec![
                Op::Delete {
                    pos: Position { line: 0, byte: 4 },
                    text: "bar".to_string(),
                    linewise: false,
                },
                Op::Insert {
                    pos: Position { line: 0, byte: 4 },
                    text: "XYZ".to_string(),
                },
            ]
        );
    }

    #[test]
    fn whole_line_delete_is_linewise() {
        let before = buf("keep\ndrop me\nkeep");
        let after = buf("keep\nkeep");
        let ops = diff_ops(&before, &after);
        assert_eq!(
            ops,
            vec![Op::Delete {
                pos: Position { line: 1, byte: 0 },
                text: "drop me\n".to_string(),
                linewise: true,
            }]
        );
    }

    #[test]
    fn pending_ops_tracks_engine_top_of_stack() {
        let mut engine = UndoEngine::new();
        let b0 = buf("abc");
        engine.push_snapshot(SnapshotKind::Edit, Position::origin(), &b0, Mode::Normal);
        let b1 = buf("abcd");
        let ops = engine.pending_ops(&b1).unwrap();
        assert_eq!(
            ops,
            vec![Op::Insert {
                pos: Position { line: 0, byte: 3 },
                text: "d".to_string(),
            }]
        );
    }
}
