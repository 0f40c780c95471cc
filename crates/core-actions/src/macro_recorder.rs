//! Macro recording/replay and dot-repeat.
//!
//! `core_state::MacroFlags` only tracks *whether* recording/replaying is
//! happening — the recorded `Action` sequences themselves live here, since
//! `core-state` cannot name this crate's `Action` type. `MacroRecorder`
//! implements `ActionObserver` (the existing pre-dispatch hook) so it can be
//! registered alongside any other observer and passively capture the
//! action stream, mirroring the `Arc<Mutex<_>>` interior-mutability idiom
//! the dispatcher's own observer test already uses.

use crate::{Action, ActionObserver, ModeChange};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct RecorderState {
    registers: HashMap<char, Vec<Action>>,
    recording: Option<(char, Vec<Action>)>,
    in_insert: bool,
    change_in_progress: Vec<Action>,
    last_change: Vec<Action>,
}

#[derive(Debug, Clone, Default)]
pub struct MacroRecorder(Arc<Mutex<RecorderState>>);

impl MacroRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin recording into `register`, discarding any prior unfinished
    /// recording into a different register.
    pub fn begin_recording(&self, register: char) {
        self.0.lock().unwrap().recording = Some((register, Vec::new()));
    }

    /// Stop recording and store the sequence under its register, returning
    /// the number of actions captured (0 if nothing was recording).
    pub fn stop_recording(&self) -> usize {
        let mut inner = self.0.lock().unwrap();
        match inner.recording.take() {
            Some((register, actions)) => {
                let len = actions.len();
                inner.registers.insert(register, actions);
                len
            }
            None => 0,
        }
    }

    pub fn recorded(&self, register: char) -> Vec<Action> {
        self.0
            .lock()
            .unwrap()
            .registers
            .get(&register)
            .cloned()
            .unwrap_or_default()
    }

    /// The most recent complete change, for dot-repeat: either a single
    /// Normal-mode change action, or the whole run of edits made during one
    /// Insert session.
    pub fn last_change(&self) -> Vec<Action> {
        self.0.lock().unwrap().last_change.clone()
    }

    fn record(&self, action: &Action) {
        let mut inner = self.0.lock().unwrap();
        if let Some((_, buf)) = inner.recording.as_mut() {
            buf.push(action.clone());
        }
        match action {
            Action::ModeChange(ModeChange::EnterInsert) => {
                inner.in_insert = true;
                inner.change_in_progress.clear();
            }
            Action::ModeChange(ModeChange::LeaveInsert) => {
                inner.in_insert = false;
                if !inner.change_in_progress.is_empty() {
                    inner.last_change = std::mem::take(&mut inner.change_in_progress);
                }
            }
            _ if is_change_action(action) => {
                inner.change_in_progress.push(action.clone());
                if !inner.in_insert {
                    inner.last_change = std::mem::take(&mut inner.change_in_progress);
                }
            }
            _ => {}
        }
    }
}

impl ActionObserver for MacroRecorder {
    fn on_action(&self, action: &Action) {
        // Control-plane actions are never themselves part of a recording or
        // a repeatable change.
        if matches!(
            action,
            Action::MacroRecordToggle(_) | Action::MacroReplay { .. } | Action::RepeatLastChange
        ) {
            return;
        }
        self.record(action);
    }
}

fn is_change_action(action: &Action) -> bool {
    matches!(
        action,
        Action::Edit(_)
            | Action::ApplyOperator { .. }
            | Action::LinewiseOperator { .. }
            | Action::VisualOperator { .. }
            | Action::PasteAfter { .. }
            | Action::PasteBefore { .. }
            | Action::VisualPaste { .. }
    )
}
