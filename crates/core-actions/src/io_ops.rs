//! File IO helpers extracted from dispatcher (Refactor R2 Step 5).
//!
//! Breadth-first: synchronous, minimal, no async abstractions yet. These helpers isolate
//! normalization + reconstruction logic so the dispatcher focuses on command semantics.
//! Future (Phase 3+) replacements can provide async versions with identical signatures.

use core_state::{EditorState, LineEnding, normalize_line_endings};
use core_text::Buffer;

/// Result of attempting to open a file.
#[derive(Debug)]
pub enum OpenFileResult {
    Success(OpenSuccess),
    Error, // caller logs / sets ephemeral already
}

pub struct OpenSuccess {
    pub buffer: Buffer,
    pub file_name: std::path::PathBuf,
    pub original_line_ending: LineEnding,
    pub had_trailing_newline: bool,
    pub mixed_line_endings: bool,
}

impl std::fmt::Debug for OpenSuccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSuccess")
            .field("file_name", &self.file_name)
            .field("original_line_ending", &self.original_line_ending)
            .field("had_trailing_newline", &self.had_trailing_newline)
            .field("mixed_line_endings", &self.mixed_line_endings)
            .finish()
    }
}

/// Open a file path into a new Buffer applying line ending normalization.
/// Returns structured metadata required to update EditorState.
pub fn open_file(path: &std::path::Path) -> OpenFileResult {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let norm = normalize_line_endings(&content);
            let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("file");
            match Buffer::from_str(name, norm.buffer_content()) {
                Ok(buffer) => OpenFileResult::Success(OpenSuccess {
                    buffer,
                    file_name: path.to_path_buf(),
                    original_line_ending: norm.original,
                    had_trailing_newline: norm.had_trailing_newline,
                    mixed_line_endings: norm.mixed,
                }),
                Err(e) => {
                    tracing::error!(target: "io", ?e, "buffer_create_failed");
                    OpenFileResult::Error
                }
            }
        }
        Err(e) => {
            tracing::error!(target: "io", ?e, "file_open_error");
            OpenFileResult::Error
        }
    }
}

/// Result of a write attempt.
#[derive(Debug)]
pub enum WriteFileResult {
    Success,
    NoFilename,
    Error,
}

/// Serialize the active buffer out to its associated file name (or provided target)
/// honoring original line ending style. Always appends exactly one trailing
/// newline regardless of whether the loaded file had one — `had_trailing_newline`
/// records that detail without the buffer itself carrying an extra empty
/// final line for it.
pub fn write_file(state: &mut EditorState, target: Option<&std::path::Path>) -> WriteFileResult {
    let path = if let Some(p) = target {
        p.to_path_buf()
    } else if let Some(existing) = state.file_name.clone() {
        existing
    } else {
        return WriteFileResult::NoFilename;
    };
    // Re-expand line endings based on original metadata
    let mut content = String::new();
    let line_ending = state.original_line_ending.as_str();
    let last_index = state.active_buffer().line_count();
    for i in 0..last_index {
        if let Some(mut l) = state.active_buffer().line(i) {
            let ends_nl = l.ends_with('\n');
            if ends_nl {
                l.pop();
            }
            content.push_str(&l);
            if i + 1 < last_index {
                content.push_str(line_ending);
            }
        }
    }
    content.push_str(line_ending);

    match write_bytes_preserving_identity(&path, content.as_bytes()) {
        Ok(()) => {
            state.dirty = false; // mark clean after successful write
            WriteFileResult::Success
        }
        Err(e) => {
            tracing::error!(target: "io", ?e, "file_write_error");
            WriteFileResult::Error
        }
    }
}

/// Write `bytes` to `path`, preserving whatever already sits there,
/// symlink/hardlink-aware with an atomic-rename fallback:
/// * a symlink is written through in place, so the link itself stays a
///   symlink and the target's inode is reused rather than replaced;
/// * a file with more than one hard link is also written in place, for the
///   same reason — renaming a replacement over it would orphan the content
///   seen through the other links;
/// * otherwise, write to a sibling temp file and atomically rename it over
///   the destination, so a crash mid-write never leaves a truncated file.
/// An existing file's permissions are preserved; a newly created file gets
/// mode 0644.
#[cfg(unix)]
fn write_bytes_preserving_identity(path: &std::path::Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write as _;
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    let link_metadata = std::fs::symlink_metadata(path).ok();
    let is_symlink = link_metadata
        .as_ref()
        .is_some_and(|m| m.file_type().is_symlink());
    let resolved_metadata = std::fs::metadata(path).ok();
    let multiple_hardlinks = resolved_metadata.as_ref().is_some_and(|m| m.nlink() > 1);

    if is_symlink || multiple_hardlinks {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        return Ok(());
    }

    let mode = resolved_metadata
        .as_ref()
        .map(|m| m.permissions().mode())
        .unwrap_or(0o644);
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("glyph");
    static TMP_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let unique = TMP_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let tmp_path = dir.join(format!(".{file_name}.glyph-tmp-{}-{unique}", std::process::id()));

    let write_result = (|| -> std::io::Result<()> {
        let mut tmp_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        tmp_file.write_all(bytes)?;
        tmp_file.sync_all()?;
        tmp_file.set_permissions(std::fs::Permissions::from_mode(mode))?;
        std::fs::rename(&tmp_path, path)
    })();

    if write_result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    write_result
}

#[cfg(not(unix))]
fn write_bytes_preserving_identity(path: &std::path::Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)
}
