//! Command line editing & execution (:q, :e <file>, :w).
//!
//! Scope (R3 Step 1): behavior-neutral extraction. Parsing is still string
//! prefix matching; Step 2 introduces a structured `ParsedCommand`.
//!
//! Design Tenet Alignment:
//! * Modularity: isolates ephemeral command line buffer mutations and side
//!   effects (file IO) from the main dispatcher control flow.
//! * Evolution Over Legacy: intentionally simple now; replacing the ad-hoc
//!   parsing with a real parser will be a local change.
//! * Documentation: rustdoc describes future surface to avoid speculative
//!   premature abstractions.
//!
//! Forward Roadmap:
//! * Structured parser returning `ParsedCommand` variants (Step 2).
//! * Additional commands (`:metrics`, `:config-reload`) attach cleanly.
//! * Async file IO (potential) via background task + event completion; this
//!   module will convert completion events into editor state transitions.
//! * Error surfacing improvements (detailed messages, echo area reuse).

use super::DispatchResult;
use super::command_parser::{CommandParser, ParsedCommand};
use crate::Action;
use crate::io_ops::{OpenFileResult, WriteFileResult, open_file, write_file};
use core_model::View;
use core_state::EditorState;
use core_text::Position;
use core_locate::{line_num_and_col_to_pos, pos_to_line_num_and_col};

pub(crate) fn handle_command_action(
    action: Action,
    state: &mut EditorState,
    view: &mut View,
) -> DispatchResult {
    match action {
        Action::CommandStart => {
            state.command_line.begin();
            DispatchResult::dirty()
        }
        Action::CommandChar(ch) => {
            state.command_line.push_char(ch);
            DispatchResult::dirty()
        }
        Action::CommandBackspace => {
            state.command_line.backspace();
            DispatchResult::dirty()
        }
        Action::CommandCancel => {
            state.command_line.clear();
            DispatchResult::dirty()
        }
        Action::CommandExecute(cmd) => execute_command(cmd, state, view),
        _ => unreachable!("non-command action routed to command handler"),
    }
}

fn execute_command(raw: String, state: &mut EditorState, view: &mut View) -> DispatchResult {
    let parsed = CommandParser::parse(&raw);
    let result = match parsed {
        ParsedCommand::Quit { force: _ } => DispatchResult::quit(),
        ParsedCommand::Write { force: _, path: _ } => handle_write(state),
        ParsedCommand::Edit { force: _, path } => match path {
            Some(path) => handle_edit(path, state, view),
            None => {
                state.set_ephemeral("No file name", std::time::Duration::from_secs(3));
                DispatchResult::dirty()
            }
        },
        ParsedCommand::Goto(line) => handle_goto(line, state, view),
        ParsedCommand::Metrics => {
            use core_state::{METRICS_OVERLAY_DEFAULT_LINES, OverlayMode};
            let new_mode = state.toggle_metrics_overlay(METRICS_OVERLAY_DEFAULT_LINES);
            match new_mode {
                OverlayMode::Metrics { lines } => {
                    // Emit a concise one-line ephemeral so overlay rows remain the source of detail.
                    state.set_ephemeral(
                        format!("Metrics overlay ON ({} lines)", lines),
                        std::time::Duration::from_secs(2),
                    );
                }
                OverlayMode::None => {
                    state.set_ephemeral("Metrics overlay OFF", std::time::Duration::from_secs(2));
                }
            }
            // Structured log of toggle event for diagnostics.
            tracing::info!(target: "runtime.metrics", kind=":metrics_toggle", mode=?new_mode);
            DispatchResult::dirty()
        }
        ParsedCommand::Unknown(_) => DispatchResult::dirty(),
    };
    state.command_line.clear();
    result
}

fn handle_edit(
    path: std::path::PathBuf,
    state: &mut EditorState,
    view: &mut View,
) -> DispatchResult {
    match open_file(&path) {
        OpenFileResult::Success(s) => {
            if let Some(prior_name) = &state.file_name {
                let tree = state.buffers[state.active].tree();
                let cur_abs_byte = state.buffers[state.active].absolute_byte(view.cursor);
                let (line, col) = pos_to_line_num_and_col(tree, tree.byte_to_char(cur_abs_byte));
                state.timeline.push(core_state::TimelineEntry {
                    path: prior_name.clone(),
                    line,
                    col,
                });
            }
            state.buffers[state.active] = s.buffer;
            view.cursor = Position::origin();
            state.file_name = Some(s.file_name);
            state.dirty = false;
            state.original_line_ending = s.original_line_ending;
            state.had_trailing_newline = s.had_trailing_newline;
            state.set_ephemeral("Opened", std::time::Duration::from_secs(3));
            if s.mixed_line_endings {
                tracing::warn!(target: "io", "mixed_line_endings_detected");
            }
            DispatchResult::buffer_replaced()
        }
        OpenFileResult::Error => {
            state.set_ephemeral("Open failed", std::time::Duration::from_secs(3));
            DispatchResult::dirty()
        }
    }
}

/// `:N` — jump to line `N` (1-indexed, as typed), preserving the current
/// column where the target line is long enough to hold it.
fn handle_goto(line: usize, state: &mut EditorState, view: &mut View) -> DispatchResult {
    let buffer = &state.buffers[state.active];
    let tree = buffer.tree();
    let cur_abs_byte = buffer.absolute_byte(view.cursor);
    let cur_pos = tree.byte_to_char(cur_abs_byte);
    let (_, col) = pos_to_line_num_and_col(tree, cur_pos);
    let target_line = line.saturating_sub(1).min(tree.num_lines().saturating_sub(1));
    let target_pos = line_num_and_col_to_pos(tree, target_line, col);
    let target_byte = tree.char_to_byte(target_pos);
    view.cursor = buffer.position_at_byte(target_byte);
    DispatchResult::dirty()
}

fn handle_write(state: &mut EditorState) -> DispatchResult {
    match write_file(state, None) {
        WriteFileResult::Success => {
            state.set_ephemeral("Wrote", std::time::Duration::from_secs(3));
        }
        WriteFileResult::NoFilename => {
            tracing::error!(target: "runtime.command", "write_no_filename");
            state.set_ephemeral("No filename", std::time::Duration::from_secs(3));
        }
        WriteFileResult::Error => {
            state.set_ephemeral("Write failed", std::time::Duration::from_secs(3));
        }
    }
    DispatchResult::dirty()
}
