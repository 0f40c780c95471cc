//! Background watcher for the file backing the active buffer.
//!
//! Polls on an interval rather than relying on platform inotify/FSEvents
//! plumbing — a poll loop keeps this source symmetric with
//! `TickEventSource` and avoids a second async runtime integration. A bare
//! mtime-or-size change is not enough to report: an MD5 digest of the new
//! contents must also differ from the last seen digest, so a `touch` with
//! no real edit stays silent. Emits at most one `Changed` event and then
//! stops — the caller re-creates a fresh watcher after reloading if it
//! wants to keep watching.

use core_events::{AsyncEventSource, Event, FileWatchEvent};
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

struct Snapshot {
    mtime: Option<SystemTime>,
    size: u64,
    digest: [u8; 16],
}

fn snapshot(path: &Path) -> Option<Snapshot> {
    let bytes = std::fs::read(path).ok()?;
    let meta = std::fs::metadata(path).ok()?;
    Some(Snapshot {
        mtime: meta.modified().ok(),
        size: meta.len(),
        digest: Md5::digest(&bytes).into(),
    })
}

pub struct FileWatchSource {
    path: PathBuf,
    poll_interval: Duration,
    last: Option<Snapshot>,
}

impl FileWatchSource {
    pub fn new(path: PathBuf, poll_interval: Duration) -> Self {
        let last = snapshot(&path);
        Self {
            path,
            poll_interval,
            last,
        }
    }

    /// Synchronous check for callers that need an immediate answer (e.g.
    /// before prompting the user to reload) rather than waiting on the next
    /// poll tick.
    pub fn check_moved_or_deleted(&self) -> bool {
        std::fs::symlink_metadata(&self.path).is_err()
    }
}

impl AsyncEventSource for FileWatchSource {
    fn name(&self) -> &'static str {
        "file_watch"
    }

    fn spawn(mut self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.poll_interval);
            interval.tick().await; // first tick fires immediately; skip it
            loop {
                interval.tick().await;
                let Some(current) = snapshot(&self.path) else {
                    let _ = tx.send(Event::FileWatch(FileWatchEvent::MovedOrDeleted)).await;
                    return;
                };
                let metadata_moved = self
                    .last
                    .as_ref()
                    .is_none_or(|l| l.mtime != current.mtime || l.size != current.size);
                if metadata_moved {
                    let digest_changed = self
                        .last
                        .as_ref()
                        .is_none_or(|l| l.digest != current.digest);
                    self.last = Some(current);
                    if digest_changed {
                        let _ = tx.send(Event::FileWatch(FileWatchEvent::Changed)).await;
                        return;
                    }
                }
            }
        })
    }
}
