//! Search, text-field, timeline and task-mode sub-dispatch.
//!
//! Menu is deliberately absent here: `core_state::MenuState<A>` is generic
//! over its item payload and `EditorState` holds no live instance of it (a
//! concrete `MenuState<Action>` would make `core-state` depend on this
//! crate). The data structure is complete and tested in `core-state`; the
//! runtime that owns a concrete menu instance (e.g. a command palette) is
//! expected to drive it directly rather than through `dispatch`.

use super::DispatchResult;
use crate::Action;
use core_model::View;
use core_state::{EditorState, Mode, SearchCompletion, SearchDirection};

pub(crate) fn handle_search(action: Action, state: &mut EditorState, view: &mut View) -> DispatchResult {
    match action {
        Action::EnterSearch { forward, completion } => {
            state.enter_overlay(Mode::Search);
            let direction = if forward {
                SearchDirection::Forward
            } else {
                SearchDirection::Backward
            };
            state.search.start_with_completion(direction, completion);
            DispatchResult::dirty()
        }
        Action::SearchChar(c) => {
            state.search.push_char(c);
            refresh_provisional_match(state, view);
            DispatchResult::dirty()
        }
        Action::SearchBackspace => {
            state.search.backspace();
            refresh_provisional_match(state, view);
            DispatchResult::dirty()
        }
        Action::SearchCommit => commit_search(state, view),
        Action::SearchAbort => {
            state.leave_overlay();
            DispatchResult::dirty()
        }
        Action::FindNext { reverse } => find_next(state, view, reverse),
        _ => unreachable!("non-search action routed to search handler"),
    }
}

fn origin_char(state: &EditorState, view: &View) -> usize {
    let buffer = state.active_buffer();
    let tree = buffer.tree();
    tree.byte_to_char(buffer.absolute_byte(view.cursor))
}

fn refresh_provisional_match(state: &mut EditorState, view: &View) {
    let origin = origin_char(state, view);
    let tree = state.active_buffer().tree();
    let m = core_state::search::find_match(tree, state.search.query(), origin, state.search.direction());
    state.search.set_provisional_match(m);
}

fn commit_search(state: &mut EditorState, view: &mut View) -> DispatchResult {
    let completion = state.search.completion();
    let origin = origin_char(state, view);
    let Some(m) = state.search.last_match() else {
        state.leave_overlay();
        return DispatchResult::dirty();
    };
    let result = apply_match(state, view, origin, m.start, completion);
    state.leave_overlay();
    result
}

fn find_next(state: &mut EditorState, view: &mut View, reverse: bool) -> DispatchResult {
    if state.search.query().is_empty() {
        return DispatchResult::clean();
    }
    let origin = origin_char(state, view);
    let direction = state.search.effective_direction(reverse);
    let tree = state.active_buffer().tree();
    let query = state.search.query().to_string();
    let Some(m) = core_state::search::find_match(tree, &query, origin, direction) else {
        state.set_ephemeral("Pattern not found", std::time::Duration::from_secs(2));
        return DispatchResult::dirty();
    };
    state.search.set_provisional_match(Some(m));
    apply_match(state, view, origin, m.start, SearchCompletion::MoveCursor)
}

/// Move the cursor to `match_start`, or delete/change the span between
/// `origin` and `match_start`, depending on `completion`.
fn apply_match(
    state: &mut EditorState,
    view: &mut View,
    origin: usize,
    match_start: usize,
    completion: SearchCompletion,
) -> DispatchResult {
    let buffer = state.active_buffer();
    let tree = buffer.tree();
    let target_byte = tree.char_to_byte(match_start);
    let target_pos = buffer.position_at_byte(target_byte);

    match completion {
        SearchCompletion::MoveCursor | SearchCompletion::CopyToMatch => {
            if matches!(completion, SearchCompletion::CopyToMatch) {
                let (lo, hi) = (origin.min(match_start), origin.max(match_start));
                let tree = state.active_buffer().tree();
                let lo_byte = tree.char_to_byte(lo);
                let hi_byte = tree.char_to_byte(hi);
                let text = state.active_buffer().tree().to_string()[lo_byte..hi_byte].to_string();
                let mut regs = state.registers_facade();
                regs.write_yank(text, None);
            } else {
                view.cursor = target_pos;
            }
            DispatchResult::dirty()
        }
        SearchCompletion::DeleteToMatch | SearchCompletion::ChangeToMatch => {
            let tree = state.active_buffer().tree();
            let lo = origin.min(match_start);
            let hi = origin.max(match_start);
            let lo_byte = tree.char_to_byte(lo);
            let hi_byte = tree.char_to_byte(hi);
            if lo_byte == hi_byte {
                return DispatchResult::clean();
            }
            let mut cursor = view.cursor;
            let removed = state.delete_span_with_snapshot(&mut cursor, lo_byte, hi_byte);
            view.cursor = cursor;
            {
                let mut regs = state.registers_facade();
                regs.write_delete(removed.clone(), None);
            }
            if !state.dirty {
                state.dirty = true;
            }
            if matches!(completion, SearchCompletion::ChangeToMatch) {
                state.mode = Mode::Insert;
            }
            if removed.contains('\n') {
                DispatchResult::buffer_replaced()
            } else {
                DispatchResult::dirty()
            }
        }
    }
}

pub(crate) fn handle_textfield(action: Action, state: &mut EditorState) -> DispatchResult {
    match action {
        Action::EnterTextField { prompt, initial } => {
            state.enter_overlay(Mode::TextField);
            state.textfield = Some(core_state::TextFieldState::open(prompt, initial));
            DispatchResult::dirty()
        }
        Action::TextFieldChar(c) => {
            if let Some(f) = state.textfield.as_mut() {
                f.push_char(c);
            }
            DispatchResult::dirty()
        }
        Action::TextFieldBackspace => {
            if let Some(f) = state.textfield.as_mut() {
                f.backspace();
            }
            DispatchResult::dirty()
        }
        Action::TextFieldAutocomplete => {
            if let Some(f) = state.textfield.as_mut() {
                f.cycle_autocomplete();
            }
            DispatchResult::dirty()
        }
        Action::TextFieldCommit => {
            if let Some(f) = state.textfield.as_mut() {
                f.close();
            }
            state.leave_overlay();
            DispatchResult::dirty()
        }
        Action::TextFieldCancel => {
            state.textfield = None;
            state.leave_overlay();
            DispatchResult::dirty()
        }
        _ => unreachable!("non-text-field action routed to text-field handler"),
    }
}

pub(crate) fn handle_timeline(action: Action, state: &mut EditorState, view: &mut View) -> DispatchResult {
    let buffer = state.active_buffer();
    let tree = buffer.tree();
    let cur_abs_byte = buffer.absolute_byte(view.cursor);
    let (line, col) = core_locate::pos_to_line_num_and_col(tree, tree.byte_to_char(cur_abs_byte));
    let Some(path) = state.file_name.clone() else {
        return DispatchResult::clean();
    };
    let current = core_state::TimelineEntry { path, line, col };
    let target = match action {
        Action::TimelineBack => state.timeline.navigate_back(current),
        Action::TimelineForward => state.timeline.navigate_forward(current),
        _ => unreachable!("non-timeline action routed to timeline handler"),
    };
    let Some(target) = target else {
        return DispatchResult::clean();
    };
    if Some(&target.path) != state.file_name.as_ref() {
        match crate::io_ops::open_file(&target.path) {
            crate::io_ops::OpenFileResult::Success(s) => {
                state.buffers[state.active] = s.buffer;
                state.file_name = Some(s.file_name);
                state.dirty = false;
                state.original_line_ending = s.original_line_ending;
                state.had_trailing_newline = s.had_trailing_newline;
            }
            crate::io_ops::OpenFileResult::Error => {
                state.set_ephemeral("Could not reopen file", std::time::Duration::from_secs(3));
                return DispatchResult::dirty();
            }
        }
    }
    let tree = state.active_buffer().tree();
    let target_pos = core_locate::line_num_and_col_to_pos(tree, target.line, target.col);
    let target_byte = tree.char_to_byte(target_pos);
    view.cursor = state.active_buffer().position_at_byte(target_byte);
    DispatchResult::buffer_replaced()
}

pub(crate) fn handle_task(action: Action, state: &mut EditorState) -> DispatchResult {
    match action {
        Action::EnterTask => {
            state.enter_overlay(Mode::Task);
            DispatchResult::dirty()
        }
        Action::TaskCancel => {
            state.leave_overlay();
            DispatchResult::dirty()
        }
        _ => unreachable!("non-task action routed to task handler"),
    }
}

pub(crate) fn handle_macro_toggle(register: char, state: &mut EditorState) -> DispatchResult {
    if state.macro_flags.is_recording() {
        state.macro_flags.stop_recording();
    } else {
        state.macro_flags.begin_recording(register);
    }
    DispatchResult::dirty()
}
