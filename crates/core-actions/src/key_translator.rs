//! KeyTranslator: stateful key->Action translation.
//!
//! Phase 4 Progress:
//! * Step 1: Count accumulation for motions (e.g. `5l`) -> `MotionWithCount`.
//! * Step 2: Operator pending state (`d`,`y`,`c`) + composite
//!   `ApplyOperator { op, motion, count }` emission with multiplicative count
//!   semantics (e.g. `2d3w` => count 6). Vim rule for `0` as a motion after an
//!   operator (e.g. `d0`) is preserved (treat as `LineStart` motion rather than
//!   starting a trailing count).
//!
//! State Machine (minimal):
//! * Idle: optional `pending_count` accumulating prefix digits.
//! * OperatorPending(op): operator captured; may accumulate a post-operator
//!   count (`post_op_count`) via digits 1-9 (leading 0 is NOT a count and is a
//!   motion `LineStart`).
//! * On motion while OperatorPending -> emit `ApplyOperator` with
//!   `count = prefix_count * post_op_count` (default 1). State resets.
//! * <Esc> while pending operator cancels and resets state silently.
//!
//! Breadth-First Guarantee: Dispatcher still treats operator actions as
//! inert (no buffer mutation yet). Later steps will implement span
//! resolution & actual delete/yank/change semantics.
//!
//! Design Tenets Applied:
//! * Modularity: confines complexity to this translator.
//! * Evolution: incremental activation per design plan.
//! * Safety: clamped counts (<= 999_999) prevent overflow.

use crate::{Action, EditKind, ModeChange, MotionKind, OperatorKind};
use core_events::{KeyCode, KeyEvent, KeyModifiers};
use core_state::{Mode, SearchCompletion};

#[derive(Debug, Default)]
pub struct KeyTranslator {
    /// Count prefix prior to an operator or motion (e.g. `12d` or `12w`).
    pending_count: Option<u32>,
    /// Pending operator kind (d,y,c) awaiting motion.
    pending_operator: Option<OperatorKind>,
    /// Count following an operator but before the motion (e.g. `d3w`).
    post_op_count: Option<u32>,
    /// Pending explicit register (after '"')
    pending_register: Option<char>,
    /// True if we just saw '"' and expect a register designator next.
    awaiting_register: bool,
    /// True if we just saw 'q' and expect a register designator next, to
    /// toggle recording into (or out of) that register.
    awaiting_macro_record_register: bool,
    /// True if we just saw '@' and expect a register designator next, to
    /// replay that register's recorded actions.
    awaiting_macro_replay_register: bool,
    /// Count accumulated before '@', consumed once the register designator
    /// arrives (e.g. `3@a` replays register `a` three times).
    macro_replay_count: Option<u32>,
}

impl KeyTranslator {
    pub fn new() -> Self {
        Self {
            pending_count: None,
            pending_operator: None,
            post_op_count: None,
            pending_register: None,
            awaiting_register: false,
            awaiting_macro_record_register: false,
            awaiting_macro_replay_register: false,
            macro_replay_count: None,
        }
    }

    /// Reset transient state (counts/operators). Intentionally unused until
    /// counts/operator-pending logic (Phase 4) lands. Kept public so the
    /// runtime can invoke it on mode transitions without further signature
    /// churn.
    pub fn reset(&mut self) {
        self.pending_count = None;
        self.pending_operator = None;
        self.post_op_count = None;
        self.pending_register = None;
        self.awaiting_register = false;
        self.awaiting_macro_record_register = false;
        self.awaiting_macro_replay_register = false;
        self.macro_replay_count = None;
    }

    /// True while a count/operator/register sequence is mid-flight. Used by
    /// the NGI adapter to distinguish "genuinely unmapped key" (candidate for
    /// the timeout-based literal queue) from "translator is still gathering
    /// a multi-key Vim sequence" (no literal queuing, no timeout).
    pub(crate) fn has_pending(&self) -> bool {
        self.pending_count.is_some()
            || self.pending_operator.is_some()
            || self.post_op_count.is_some()
            || self.pending_register.is_some()
            || self.awaiting_register
            || self.awaiting_macro_record_register
            || self.awaiting_macro_replay_register
    }

    /// Core translation entrypoint. Mirrors previous `translate_key` behavior.
    pub fn translate(
        &mut self,
        mode: Mode,
        pending_command: &str,
        key: &KeyEvent,
    ) -> Option<Action> {
        // Command-line active: delegate directly (counts/operators/registers do not apply inside ':')
        if pending_command.starts_with(':') {
            return legacy_map(mode, pending_command, key);
        }
        if matches!(mode, Mode::Insert) {
            return legacy_map(mode, pending_command, key);
        }
        if matches!(mode, Mode::Search | Mode::TextField | Mode::Task | Mode::Menu) {
            return legacy_map(mode, pending_command, key);
        }
        // Normal and VisualChar both run the full count/operator/register
        // state machine below; VisualChar additionally resolves operator and
        // paste keys immediately (no awaiting-motion step) further down.

        // Step 6.1: Ctrl-D / Ctrl-U precedence fix.
        // These half-page motions must be interpreted BEFORE any operator
        // pending or count accumulation logic (e.g. Vim's behavior: typing
        // `d` then <C-d> should scroll half a page down and NOT trigger a
        // delete). We therefore short-circuit here. Any pending operator or
        // counts are canceled (breadth-first safety: explicit over implicit).
        if key.mods.contains(KeyModifiers::CTRL) {
            if let KeyCode::Char('d') = key.code {
                self.reset();
                return Some(Action::Motion(MotionKind::PageHalfDown));
            }
            if let KeyCode::Char('u') = key.code {
                self.reset();
                return Some(Action::Motion(MotionKind::PageHalfUp));
            }
        }

        match key.code {
            KeyCode::Esc => {
                // Cancel any pending state.
                self.reset();
                return None;
            }
            KeyCode::Char(c) => {
                // Register prefix entry point (only in Normal / VisualChar like Vim). Occurs before counts/operators.
                if c == '"' {
                    self.awaiting_register = true;
                    self.pending_register = None; // reset previously captured register
                    return None;
                }
                if self.awaiting_register {
                    self.awaiting_register = false;
                    // Valid registers: a-z (named) or A-Z (append). Numbered 0-9 accepted (deferred semantics for Step 7) but stored.
                    if c.is_ascii_alphanumeric() {
                        self.pending_register = Some(c);
                        return None; // continue gathering operator/motion
                    } else {
                        // Invalid register specifier -> drop silently (breadth-first resilience)
                        self.pending_register = None;
                        return None;
                    }
                }
                if self.awaiting_macro_record_register {
                    self.awaiting_macro_record_register = false;
                    return if c.is_ascii_alphanumeric() {
                        Some(Action::MacroRecordToggle(c))
                    } else {
                        None
                    };
                }
                if self.awaiting_macro_replay_register {
                    self.awaiting_macro_replay_register = false;
                    let count = self.macro_replay_count.take().unwrap_or(1).min(999_999);
                    return if c.is_ascii_alphanumeric() {
                        Some(Action::MacroReplay { register: c, count })
                    } else {
                        None
                    };
                }
                // If we are currently waiting for a motion after an operator.
                if let Some(op) = self.pending_operator {
                    // Digits after operator may form a secondary count except leading '0'.
                    if c.is_ascii_digit() {
                        if c == '0' && self.post_op_count.is_none() {
                            // Treat as motion LineStart (d0 behavior)
                            let count_total = self
                                .pending_count
                                .unwrap_or(1)
                                .saturating_mul(self.post_op_count.unwrap_or(1))
                                .min(999_999);
                            self.pending_operator = None;
                            self.post_op_count = None;
                            self.pending_count = None; // counts consumed
                            return Some(Action::ApplyOperator {
                                op,
                                motion: MotionKind::LineStart,
                                count: count_total,
                                register: self.pending_register.take(),
                            });
                        }
                        // Accumulate post-op count (digits 1-9 start, 0 allowed once started)
                        let digit = (c as u8 - b'0') as u32;
                        let new_val = self
                            .post_op_count
                            .unwrap_or(0)
                            .saturating_mul(10)
                            .saturating_add(digit)
                            .min(999_999);
                        self.post_op_count = Some(new_val);
                        return None;
                    }
                    if c == operator_char(op) {
                        let prefix = self.pending_count.unwrap_or(1);
                        let post = self.post_op_count.unwrap_or(1);
                        let total = prefix.saturating_mul(post).min(999_999);
                        self.pending_operator = None;
                        self.post_op_count = None;
                        self.pending_count = None;
                        return Some(Action::LinewiseOperator {
                            op,
                            count: total.max(1),
                            register: self.pending_register.take(),
                        });
                    }
                    // `d/pattern<CR>` / `c/pattern<CR>` send the cursor into
                    // search as the operator's motion target; the operator is
                    // resolved once the search commits (see
                    // `dispatcher::overlay::apply_match`), not here.
                    if c == '/' || c == '?' {
                        let completion = match op {
                            OperatorKind::Delete => SearchCompletion::DeleteToMatch,
                            OperatorKind::Change => SearchCompletion::ChangeToMatch,
                            OperatorKind::Yank => SearchCompletion::CopyToMatch,
                        };
                        self.pending_operator = None;
                        self.post_op_count = None;
                        self.pending_count = None;
                        return Some(Action::EnterSearch {
                            forward: c == '/',
                            completion,
                        });
                    }
                    // Non-digit: attempt to map to a motion.
                    if let Some(Action::Motion(m)) = legacy_map(mode, pending_command, key) {
                        let prefix = self.pending_count.unwrap_or(1);
                        let post = self.post_op_count.unwrap_or(1);
                        let total = prefix.saturating_mul(post).min(999_999);
                        self.pending_operator = None;
                        self.post_op_count = None;
                        self.pending_count = None; // counts consumed
                        return Some(Action::ApplyOperator {
                            op,
                            motion: m,
                            count: total,
                            register: self.pending_register.take(),
                        });
                    } else {
                        // Not a motion; cancel operator and treat key normally.
                        self.pending_operator = None;
                        self.post_op_count = None;
                        // retain pending_register for subsequent operator if any
                        // pending_count intentionally retained: e.g. 2d<non-motion> should ignore operator but still allow count-l motion later.
                        return legacy_map(mode, pending_command, key);
                    }
                }

                // No operator pending: maybe digit (count) or operator key or ordinary motion.
                if c.is_ascii_digit() {
                    // Leading '0' with no current count -> motion LineStart
                    if c == '0' && self.pending_count.is_none() {
                        return Some(Action::Motion(MotionKind::LineStart));
                    }
                    let digit = (c as u8 - b'0') as u32;
                    let new_val = self
                        .pending_count
                        .unwrap_or(0)
                        .saturating_mul(10)
                        .saturating_add(digit)
                        .min(999_999);
                    self.pending_count = Some(new_val);
                    return None;
                }
                // Normal-mode-only top-level commands: search entry,
                // find-next/prev, macro record/replay and dot-repeat. These
                // never await a trailing motion themselves, so they are
                // resolved here rather than inside `legacy_map`.
                if matches!(mode, Mode::Normal) {
                    match c {
                        '/' => {
                            self.pending_count = None;
                            return Some(Action::EnterSearch {
                                forward: true,
                                completion: SearchCompletion::MoveCursor,
                            });
                        }
                        '?' => {
                            self.pending_count = None;
                            return Some(Action::EnterSearch {
                                forward: false,
                                completion: SearchCompletion::MoveCursor,
                            });
                        }
                        'n' => {
                            self.pending_count = None;
                            return Some(Action::FindNext { reverse: false });
                        }
                        'N' => {
                            self.pending_count = None;
                            return Some(Action::FindNext { reverse: true });
                        }
                        'q' => {
                            self.pending_count = None;
                            self.awaiting_macro_record_register = true;
                            return None;
                        }
                        '@' => {
                            self.macro_replay_count = self.pending_count.take();
                            self.awaiting_macro_replay_register = true;
                            return None;
                        }
                        '.' => {
                            self.pending_count = None;
                            return Some(Action::RepeatLastChange);
                        }
                        _ => {}
                    }
                }
                // VisualChar resolves operator/paste keys immediately against
                // the active selection; unlike Normal mode it never awaits a
                // trailing motion.
                if matches!(mode, Mode::VisualChar) {
                    let visual_op = match c {
                        'd' => Some(OperatorKind::Delete),
                        'y' => Some(OperatorKind::Yank),
                        'c' => Some(OperatorKind::Change),
                        _ => None,
                    };
                    if let Some(op) = visual_op {
                        let count = self.pending_count.take().unwrap_or(1).min(999_999);
                        let register = self.pending_register.take();
                        self.post_op_count = None;
                        return Some(Action::VisualOperator { op, register, count });
                    }
                    if c == 'p' || c == 'P' {
                        let count = self.pending_count.take().unwrap_or(1).min(999_999);
                        let register = self.pending_register.take();
                        return Some(Action::VisualPaste {
                            before: c == 'P',
                            register,
                            count,
                        });
                    }
                }

                // Operator keys begin pending operator sequence.
                let op_kind = match c {
                    'd' => Some(OperatorKind::Delete),
                    'y' => Some(OperatorKind::Yank),
                    'c' => Some(OperatorKind::Change),
                    _ => None,
                };
                if let Some(kind) = op_kind {
                    self.pending_operator = Some(kind);
                    self.post_op_count = None;
                    return None; // no immediate action emitted (BeginOperator variant kept inert)
                }

                // If a count was accumulated and this is now a motion, emit MotionWithCount.
                if let Some(count) = self.pending_count.take() {
                    if let Some(Action::Motion(m)) = legacy_map(mode, pending_command, key) {
                        return Some(Action::MotionWithCount { motion: m, count });
                    } else {
                        // Non-motion after count (e.g. 12i) -> drop count breadth-first.
                        return legacy_map(mode, pending_command, key);
                    }
                }
            }
            _ => {}
        }
        // Fallback: legacy mapping.
        let mut act = legacy_map(mode, pending_command, key);
        // Attach any pending count/register to paste actions if present.
        let reg = self.pending_register.take();
        let count = self.pending_count.take();
        if reg.is_some() || count.is_some() {
            if let Some(a) = act.take() {
                act = Some(match a {
                    Action::PasteAfter { .. } => Action::PasteAfter {
                        register: reg,
                        count: count.unwrap_or(1).min(999_999),
                    },
                    Action::PasteBefore { .. } => Action::PasteBefore {
                        register: reg,
                        count: count.unwrap_or(1).min(999_999),
                    },
                    // For motions or others, we just store register/count and continue
                    // (in Vim, a register prefix must precede the operation it targets).
                    other => {
                        if let Some(reg) = reg {
                            self.pending_register = Some(reg);
                        }
                        if let Some(count) = count {
                            self.pending_count = Some(count);
                        }
                        other
                    }
                });
            } else if let Some(reg) = reg {
                // No action produced; keep register (and count) for next keypress.
                self.pending_register = Some(reg);
                if let Some(count) = count {
                    self.pending_count = Some(count);
                }
            } else if let Some(count) = count {
                self.pending_count = Some(count);
            }
        }
        act
    }
}

fn operator_char(op: OperatorKind) -> char {
    match op {
        OperatorKind::Delete => 'd',
        OperatorKind::Yank => 'y',
        OperatorKind::Change => 'c',
    }
}

fn legacy_map(mode: Mode, pending_command: &str, key: &KeyEvent) -> Option<Action> {
    // Lightweight translation event (trace) capturing mode + key + pending lengths.
    // Action classification decision happens at wrapper call site; here we log raw translation attempt.
    tracing::trace!(target: "actions.translate", mode=?mode, pending_len=pending_command.len(), key=?key.code, ctrl=key.mods.contains(KeyModifiers::CTRL), "translate_key_attempt");
    match key.code {
        KeyCode::Char('d')
            if key.mods.contains(KeyModifiers::CTRL) && matches!(mode, Mode::Normal) =>
        {
            Some(Action::Motion(MotionKind::PageHalfDown))
        }
        KeyCode::Char('u')
            if key.mods.contains(KeyModifiers::CTRL) && matches!(mode, Mode::Normal) =>
        {
            Some(Action::Motion(MotionKind::PageHalfUp))
        }
        KeyCode::Char(':') => {
            if pending_command.is_empty() {
                Some(Action::CommandStart)
            } else if pending_command.starts_with(':') {
                Some(Action::CommandChar(':'))
            } else {
                None
            }
        }
        KeyCode::Char(c) => {
            if pending_command.starts_with(':') {
                return Some(Action::CommandChar(c));
            }
            match mode {
                Mode::Normal => match c {
                    'v' => Some(Action::ModeChange(ModeChange::EnterVisualChar)),
                    'r' if key.mods.contains(KeyModifiers::CTRL) => Some(Action::Redo),
                    'h' => Some(Action::Motion(MotionKind::Left)),
                    'l' => Some(Action::Motion(MotionKind::Right)),
                    'j' => Some(Action::Motion(MotionKind::Down)),
                    'k' => Some(Action::Motion(MotionKind::Up)),
                    '0' => Some(Action::Motion(MotionKind::LineStart)),
                    '$' => Some(Action::Motion(MotionKind::LineEnd)),
                    'w' => Some(Action::Motion(MotionKind::WordForward)),
                    'b' => Some(Action::Motion(MotionKind::WordBackward)),
                    'i' => Some(Action::ModeChange(ModeChange::EnterInsert)),
                    'u' if !key.mods.contains(KeyModifiers::CTRL) => Some(Action::Undo),
                    'x' => Some(Action::Edit(EditKind::DeleteUnder {
                        count: 1,
                        register: None,
                    })),
                    'X' => Some(Action::Edit(EditKind::DeleteLeft {
                        count: 1,
                        register: None,
                    })),
                    'D' => Some(Action::ApplyOperator {
                        op: OperatorKind::Delete,
                        motion: MotionKind::LineEnd,
                        count: 1,
                        register: None,
                    }),
                    'C' => Some(Action::ApplyOperator {
                        op: OperatorKind::Change,
                        motion: MotionKind::LineEnd,
                        count: 1,
                        register: None,
                    }),
                    'p' => Some(Action::PasteAfter {
                        register: None,
                        count: 1,
                    }),
                    'P' => Some(Action::PasteBefore {
                        register: None,
                        count: 1,
                    }),
                    _ => None,
                },
                Mode::Insert => {
                    if !c.is_control() {
                        Some(Action::Edit(EditKind::InsertGrapheme(c.to_string())))
                    } else {
                        None
                    }
                }
                Mode::VisualChar => match c {
                    // Motions behave like Normal for now (Step 2 scope).
                    'h' => Some(Action::Motion(MotionKind::Left)),
                    'l' => Some(Action::Motion(MotionKind::Right)),
                    'j' => Some(Action::Motion(MotionKind::Down)),
                    'k' => Some(Action::Motion(MotionKind::Up)),
                    '0' => Some(Action::Motion(MotionKind::LineStart)),
                    '$' => Some(Action::Motion(MotionKind::LineEnd)),
                    'w' => Some(Action::Motion(MotionKind::WordForward)),
                    'b' => Some(Action::Motion(MotionKind::WordBackward)),
                    // 'd'/'y'/'c'/'p'/'P' are resolved earlier in `KeyTranslator::translate`
                    // (they need access to accumulated count/register state this free
                    // function does not have).
                    'v' => Some(Action::ModeChange(ModeChange::LeaveVisualChar)), // toggle exit like Vim
                    'i' => None, // 'i' not active in VisualChar yet (text object placeholder)
                    _ => None,
                },
                Mode::Search => {
                    if !c.is_control() {
                        Some(Action::SearchChar(c))
                    } else {
                        None
                    }
                }
                Mode::TextField => {
                    if !c.is_control() {
                        Some(Action::TextFieldChar(c))
                    } else {
                        None
                    }
                }
                // Menu has no concrete `Action` wiring yet: `core_state::MenuState<A>`
                // stays generic and `EditorState` holds no live instance (see
                // `dispatcher::overlay`'s module doc). Task mode has no
                // committable text input, only `Esc` (handled below).
                Mode::Menu | Mode::Task => None,
            }
        }
        KeyCode::Enter => {
            if pending_command.starts_with(':') {
                Some(Action::CommandExecute(pending_command.to_string()))
            } else if matches!(mode, Mode::Insert) {
                Some(Action::Edit(EditKind::InsertNewline))
            } else if matches!(mode, Mode::Search) {
                Some(Action::SearchCommit)
            } else if matches!(mode, Mode::TextField) {
                Some(Action::TextFieldCommit)
            } else {
                None
            }
        }
        KeyCode::Backspace => {
            if pending_command.starts_with(':') {
                Some(Action::CommandBackspace)
            } else if matches!(mode, Mode::Insert) {
                Some(Action::Edit(EditKind::Backspace))
            } else if matches!(mode, Mode::Search) {
                Some(Action::SearchBackspace)
            } else if matches!(mode, Mode::TextField) {
                Some(Action::TextFieldBackspace)
            } else {
                None
            }
        }
        KeyCode::Esc => {
            if pending_command.starts_with(':') {
                Some(Action::CommandCancel)
            } else if matches!(mode, Mode::Insert) {
                Some(Action::ModeChange(ModeChange::LeaveInsert))
            } else if matches!(mode, Mode::VisualChar) {
                Some(Action::ModeChange(ModeChange::LeaveVisualChar))
            } else if matches!(mode, Mode::Search) {
                Some(Action::SearchAbort)
            } else if matches!(mode, Mode::TextField) {
                Some(Action::TextFieldCancel)
            } else if matches!(mode, Mode::Task) {
                Some(Action::TaskCancel)
            } else {
                None
            }
        }
        KeyCode::Tab if matches!(mode, Mode::TextField) => Some(Action::TextFieldAutocomplete),
        KeyCode::Left => Some(Action::Motion(MotionKind::Left)),
        KeyCode::Right => Some(Action::Motion(MotionKind::Right)),
        KeyCode::Up => Some(Action::Motion(MotionKind::Up)),
        KeyCode::Down => Some(Action::Motion(MotionKind::Down)),
        _ => None,
    }
}
