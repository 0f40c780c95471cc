//! Action vocabulary + key-to-action translation for the editor core.
//!
//! This crate sits between raw input (`core-events`) and editor state
//! mutation (`core-state` / `core-model`). It owns:
//! * The `Action` enum — the single vocabulary the dispatcher understands.
//! * `KeyTranslator` — the legacy, synchronous Normal/Insert/VisualChar
//!   key-to-action state machine (counts, operators, registers).
//! * `NgiTranslator` — a thin wrapper around `KeyTranslator` that adds
//!   timeout/debounce handling for genuinely-unmapped literal keys, as
//!   required by the Next-Gen Input adapter.
//! * `dispatcher` — applies an `Action` to `EditorState`/`View`.
//!
//! Design Tenets Applied:
//! * Modularity: translation (this module + `key_translator`) is fully
//!   decoupled from application (`dispatcher`); either can evolve alone.
//! * Evolution Over Legacy: the NGI layer wraps the legacy translator
//!   rather than duplicating its state machine.

mod dispatcher_pub {}

pub mod dispatcher;
mod io_ops;
mod key_translator;
pub mod macro_recorder;
pub mod shell_location;
mod span_resolver;
pub mod task;
mod text_object;

pub use dispatcher::dispatch;

use core_config::Config;
use core_events::{KeyEvent, KeyEventExt, KeyToken, ModMask, NamedKey};
use core_state::Mode;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub use key_translator::KeyTranslator;

/// The full set of editor actions producible by key translation and
/// consumable by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Motion(MotionKind),
    MotionWithCount {
        motion: MotionKind,
        count: u32,
    },
    ModeChange(ModeChange),
    CommandStart,
    CommandChar(char),
    CommandBackspace,
    CommandCancel,
    CommandExecute(String),
    Edit(EditKind),
    Undo,
    Redo,
    PasteAfter {
        register: Option<char>,
        count: u32,
    },
    PasteBefore {
        register: Option<char>,
        count: u32,
    },
    Quit,
    /// Operator key observed (d/y/c); kept inert until a motion resolves it.
    /// Not currently emitted by `KeyTranslator` (it defers emission until the
    /// motion/doubled-operator arrives) but retained as part of the public
    /// vocabulary for observers that want to react to operator-pending entry.
    BeginOperator(OperatorKind),
    ApplyOperator {
        op: OperatorKind,
        motion: MotionKind,
        count: u32,
        register: Option<char>,
    },
    /// Doubled-operator form (`dd`, `yy`, `cc`) — always linewise, spanning
    /// `count` lines starting at the cursor line.
    LinewiseOperator {
        op: OperatorKind,
        count: u32,
        register: Option<char>,
    },
    VisualOperator {
        op: OperatorKind,
        register: Option<char>,
        count: u32,
    },
    VisualPaste {
        before: bool,
        register: Option<char>,
        count: u32,
    },
    /// Open the search overlay; `forward` fixes the
    /// scan direction `n`/`N` resolve relative to, `completion` is what
    /// committing the eventual match does (`MoveCursor` for a bare `/` or
    /// `?`, `DeleteToMatch`/`ChangeToMatch` when a pending operator sent the
    /// cursor into search as its motion target).
    EnterSearch {
        forward: bool,
        completion: core_state::SearchCompletion,
    },
    SearchChar(char),
    SearchBackspace,
    /// Commit the current query: move the cursor (or apply the pending
    /// completion) to the resolved match and archive the query to history.
    SearchCommit,
    SearchAbort,
    /// Repeat the last committed search, `n`/`N`.
    FindNext {
        reverse: bool,
    },
    EnterTextField {
        prompt: String,
        initial: String,
    },
    TextFieldChar(char),
    TextFieldBackspace,
    TextFieldAutocomplete,
    TextFieldCommit,
    TextFieldCancel,
    /// Toggle user-macro recording into `register`. Starts recording if
    /// idle, stops (and stores) if already recording.
    MacroRecordToggle(char),
    MacroReplay {
        register: char,
        count: u32,
    },
    /// Repeat the last change-making action (`.`).
    RepeatLastChange,
    TimelineBack,
    TimelineForward,
    EnterTask,
    TaskCancel,
}

/// Observer hook invoked before each dispatched action (metrics, logging,
/// recording for macros). Intentionally minimal: the dispatcher does not
/// let observers veto or rewrite the action.
pub trait ActionObserver {
    fn on_action(&self, action: &Action);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditKind {
    InsertGrapheme(String),
    InsertNewline,
    Backspace,
    DeleteUnder { count: u32, register: Option<char> },
    DeleteLeft { count: u32, register: Option<char> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    EnterInsert,
    LeaveInsert,
    EnterVisualChar,
    LeaveVisualChar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    Left,
    Right,
    LineStart,
    LineEnd,
    Up,
    Down,
    WordForward,
    WordBackward,
    PageHalfDown,
    PageHalfUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    Delete,
    Yank,
    Change,
}

/// Whether the translator is idle or holding a buffer of genuinely-unmapped
/// literal keys awaiting either another keypress or a timeout flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    Idle,
    AwaitingMore { buffered_len: usize },
}

/// Result of feeding a single keypress (or a flush) through the NGI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NgiResolution {
    pub action: Option<Action>,
    pub pending_state: PendingState,
    pub timeout_deadline: Option<Instant>,
}

impl NgiResolution {
    fn idle(action: Option<Action>) -> Self {
        Self {
            action,
            pending_state: PendingState::Idle,
            timeout_deadline: None,
        }
    }
}

/// Adapts `KeyTranslator` to the richer `KeyEventExt`/`KeyToken` input model,
/// adding timeout-based resolution for single literal keys that the legacy
/// translator does not map to any action (e.g. stray characters destined for
/// a future command palette). Unmapped literals are queued FIFO; the
/// timeout deadline tracks the *oldest* queued literal and does not move
/// when further literals are queued behind it.
#[derive(Debug, Default)]
pub struct NgiTranslator {
    legacy: KeyTranslator,
    literal_queue: VecDeque<(char, Instant)>,
}

impl NgiTranslator {
    pub fn new() -> Self {
        Self {
            legacy: KeyTranslator::new(),
            literal_queue: VecDeque::new(),
        }
    }

    pub fn reset(&mut self) {
        self.legacy.reset();
        self.literal_queue.clear();
    }

    /// Translate a single rich keypress, folding it through the legacy
    /// translator first and falling back to literal-queue/timeout handling
    /// when the legacy translator produces nothing and has no pending
    /// count/operator/register state of its own to report.
    pub fn ingest_keypress(
        &mut self,
        mode: Mode,
        pending_command: &str,
        key: &KeyEventExt,
        cfg: &Config,
    ) -> NgiResolution {
        let legacy_key = to_legacy_key_event(&key.token);
        let Some(legacy_key) = legacy_key else {
            // Token carries no legacy-representable key (e.g. unmapped named
            // key); nothing to queue since we cannot echo it as a literal.
            return NgiResolution::idle(None);
        };

        let resolved = self.legacy.translate(mode, pending_command, &legacy_key);
        if let Some(action) = resolved {
            self.literal_queue.clear();
            return NgiResolution::idle(Some(action));
        }

        // No action yet. If this keypress is a plain, unmodified character
        // that the legacy translator did not consume into pending
        // count/operator/register state, treat it as a genuinely unmapped
        // literal and queue it for timeout-based flush.
        if let KeyCode_Char_Unmodified(Some(c)) = classify_unmapped_literal(&key.token) {
            self.literal_queue.push_back((c, key.timestamp));
            return self.pending_resolution(cfg);
        }

        NgiResolution {
            action: None,
            pending_state: PendingState::Idle,
            timeout_deadline: None,
        }
    }

    fn pending_resolution(&self, cfg: &Config) -> NgiResolution {
        let buffered_len = self.literal_queue.len();
        let timeout_deadline = if cfg.file.input.timeout {
            self.literal_queue
                .front()
                .map(|(_, ts)| *ts + Duration::from_millis(cfg.file.input.timeoutlen as u64))
        } else {
            None
        };
        NgiResolution {
            action: None,
            pending_state: PendingState::AwaitingMore { buffered_len },
            timeout_deadline,
        }
    }

    /// Pop the oldest queued literal (if any) and emit it as a
    /// `CommandChar`. The deadline for any remaining queued literal is
    /// restarted from `now` (the flush time), not the literal's original
    /// timestamp.
    pub fn flush_pending_literal(&mut self, cfg: &Config, now: Instant) -> Option<NgiResolution> {
        let (c, _) = self.literal_queue.pop_front()?;
        if self.literal_queue.is_empty() {
            Some(NgiResolution::idle(Some(Action::CommandChar(c))))
        } else {
            let timeout_deadline = if cfg.file.input.timeout {
                Some(now + Duration::from_millis(cfg.file.input.timeoutlen as u64))
            } else {
                None
            };
            Some(NgiResolution {
                action: Some(Action::CommandChar(c)),
                pending_state: PendingState::AwaitingMore {
                    buffered_len: self.literal_queue.len(),
                },
                timeout_deadline,
            })
        }
    }
}

// Small helper enum used only to keep the `ingest_keypress` match terse.
#[allow(non_camel_case_types)]
enum KeyCode_Char_Unmodified {}
#[allow(non_snake_case)]
fn KeyCode_Char_Unmodified(c: Option<char>) -> Option<char> {
    c
}

fn classify_unmapped_literal(token: &KeyToken) -> Option<char> {
    match token {
        KeyToken::Char(c) => Some(*c),
        _ => None,
    }
}

/// Convert an NGI `KeyToken` into the legacy `KeyEvent` representation the
/// `KeyTranslator` state machine understands. Returns `None` for tokens with
/// no legacy equivalent.
fn to_legacy_key_event(token: &KeyToken) -> Option<KeyEvent> {
    use core_events::{KeyCode, KeyModifiers};
    match token {
        KeyToken::Char(c) => Some(KeyEvent {
            code: KeyCode::Char(*c),
            mods: KeyModifiers::empty(),
        }),
        KeyToken::Named(named) => {
            let code = match named {
                NamedKey::Enter => KeyCode::Enter,
                NamedKey::Esc => KeyCode::Esc,
                NamedKey::Backspace => KeyCode::Backspace,
                NamedKey::Tab => KeyCode::Tab,
                NamedKey::Up => KeyCode::Up,
                NamedKey::Down => KeyCode::Down,
                NamedKey::Left => KeyCode::Left,
                NamedKey::Right => KeyCode::Right,
                NamedKey::F(_)
                | NamedKey::Home
                | NamedKey::End
                | NamedKey::PageUp
                | NamedKey::PageDown
                | NamedKey::Insert
                | NamedKey::Delete => return None,
            };
            Some(KeyEvent {
                code,
                mods: KeyModifiers::empty(),
            })
        }
        KeyToken::Chord { base, mods } => {
            let mut legacy = to_legacy_key_event(base)?;
            if mods.contains(ModMask::CTRL) {
                legacy.mods.insert(KeyModifiers::CTRL);
            }
            if mods.contains(ModMask::ALT) {
                legacy.mods.insert(KeyModifiers::ALT);
            }
            if mods.contains(ModMask::SHIFT) {
                legacy.mods.insert(KeyModifiers::SHIFT);
            }
            Some(legacy)
        }
    }
}

use core_events::KeyModifiers;

thread_local! {
    static LEGACY_TRANSLATOR: RefCell<KeyTranslator> = RefCell::new(KeyTranslator::new());
    static NGI_TRANSLATOR: RefCell<NgiTranslator> = RefCell::new(NgiTranslator::new());
}

/// Translate a single legacy `KeyEvent` using the crate-wide thread-local
/// `KeyTranslator`. This is the simple, synchronous path used by most
/// existing call sites (runtime loop, most tests).
pub fn translate_key(mode: Mode, pending_command: &str, key: &KeyEvent) -> Option<Action> {
    LEGACY_TRANSLATOR.with(|t| t.borrow_mut().translate(mode, pending_command, key))
}

/// Translate a single legacy `KeyEvent` through the NGI adapter (thread-local
/// `NgiTranslator`), using `Instant::now()` as the keypress timestamp.
pub fn translate_ngi(mode: Mode, pending_command: &str, key: &KeyEvent, cfg: &Config) -> NgiResolution {
    translate_ngi_at(mode, pending_command, key, cfg, Instant::now())
}

/// As `translate_ngi`, but with an explicit keypress timestamp (used by
/// tests exercising timeout/debounce behavior deterministically).
pub fn translate_ngi_at(
    mode: Mode,
    pending_command: &str,
    key: &KeyEvent,
    cfg: &Config,
    timestamp: Instant,
) -> NgiResolution {
    let ext = KeyEventExt::from_parts(legacy_key_to_token(key), false, timestamp);
    NGI_TRANSLATOR.with(|t| t.borrow_mut().ingest_keypress(mode, pending_command, &ext, cfg))
}

/// Translate a single rich `KeyEventExt` keypress using an explicit,
/// caller-owned `NgiTranslator` (no thread-local state). Used by the NGI
/// input adapter, which owns its translator instance directly.
pub fn translate_keypress(
    translator: &mut NgiTranslator,
    mode: Mode,
    pending_command: &str,
    key: &KeyEventExt,
    cfg: &Config,
) -> NgiResolution {
    translator.ingest_keypress(mode, pending_command, key, cfg)
}

/// Flush the oldest pending literal from the thread-local `NgiTranslator`,
/// if any, using `Instant::now()`.
pub fn flush_pending_literal(cfg: &Config) -> Option<NgiResolution> {
    flush_pending_literal_at(cfg, Instant::now())
}

/// As `flush_pending_literal`, with an explicit flush timestamp.
pub fn flush_pending_literal_at(cfg: &Config, now: Instant) -> Option<NgiResolution> {
    NGI_TRANSLATOR.with(|t| t.borrow_mut().flush_pending_literal(cfg, now))
}

/// Reset all thread-local translation state (legacy + NGI). Intended for
/// test isolation between cases sharing the same thread.
pub fn reset_translation_state() {
    LEGACY_TRANSLATOR.with(|t| t.borrow_mut().reset());
    NGI_TRANSLATOR.with(|t| *t.borrow_mut() = NgiTranslator::new());
}

/// Reconstruct an (approximate) `KeyToken` for a legacy `KeyEvent`, solely so
/// the simple `translate_ngi`/`translate_ngi_at` entry points can share the
/// `NgiTranslator` literal-queue/timeout machinery without requiring callers
/// to construct `KeyEventExt` themselves.
fn legacy_key_to_token(key: &KeyEvent) -> KeyToken {
    use core_events::KeyCode;
    let base = match key.code {
        KeyCode::Char(c) => KeyToken::Char(c),
        KeyCode::Enter => KeyToken::Named(NamedKey::Enter),
        KeyCode::Esc => KeyToken::Named(NamedKey::Esc),
        KeyCode::Backspace => KeyToken::Named(NamedKey::Backspace),
        KeyCode::Tab => KeyToken::Named(NamedKey::Tab),
        KeyCode::Up => KeyToken::Named(NamedKey::Up),
        KeyCode::Down => KeyToken::Named(NamedKey::Down),
        KeyCode::Left => KeyToken::Named(NamedKey::Left),
        KeyCode::Right => KeyToken::Named(NamedKey::Right),
    };
    if key.mods.is_empty() {
        base
    } else {
        let mut mods = ModMask::empty();
        if key.mods.contains(KeyModifiers::CTRL) {
            mods.insert(ModMask::CTRL);
        }
        if key.mods.contains(KeyModifiers::ALT) {
            mods.insert(ModMask::ALT);
        }
        if key.mods.contains(KeyModifiers::SHIFT) {
            mods.insert(ModMask::SHIFT);
        }
        KeyToken::Chord {
            base: Box::new(base),
            mods,
        }
    }
}
