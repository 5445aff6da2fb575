//! Watches the input device directory for node create/move/delete
//! (spec.md §3 overview, §4.4).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event as NotifyEvent, EventKind as NotifyEventKind, RecursiveMode, Watcher};
use regex::Regex;

/// One directory-level change relevant to device discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotplugEvent {
    /// A node matching the device name pattern appeared (create, or the
    /// destination side of a rename).
    Created(PathBuf),
    /// A node matching the device name pattern disappeared (remove, or the
    /// source side of a rename).
    Removed(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum HotplugError {
    #[error("failed to start directory watch on {path:?}: {source}")]
    Watch { path: PathBuf, #[source] source: notify::Error },
}

/// Matches `/dev/input/event[0-9]+` node names — the "platform-defined name
/// pattern" spec.md §4.4 leaves to the backend.
fn device_name_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^event[0-9]+$").expect("static pattern is valid"))
}

fn matches_device_name(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()).is_some_and(|n| device_name_pattern().is_match(n))
}

/// Watches a device directory on the background thread `notify` manages
/// internally and funnels matching create/remove notifications onto a
/// channel. The Acquisition Worker drains this channel each time its
/// readiness wait reports the hotplug tag.
pub struct HotplugWatcher {
    _watcher: notify::RecommendedWatcher,
    receiver: Receiver<HotplugEvent>,
}

impl HotplugWatcher {
    /// Starts watching `dir` non-recursively. `waker`, if given, is signalled
    /// once per batch of notifications so a thread blocked in the readiness
    /// multiplexer wakes promptly instead of waiting out its poll timeout.
    pub fn watch(dir: &Path, waker: Option<Arc<mio::Waker>>) -> Result<Self, HotplugError> {
        let (tx, rx): (Sender<HotplugEvent>, Receiver<HotplugEvent>) = unbounded();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<NotifyEvent>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(target: "engine.hotplug", error = %err, "directory watch error");
                    return;
                }
            };
            let mapped = translate(&event);
            if mapped.is_empty() {
                return;
            }
            for item in mapped {
                if tx.send(item).is_err() {
                    return; // receiver dropped, watcher about to be torn down
                }
            }
            if let Some(waker) = &waker {
                if let Err(err) = waker.wake() {
                    tracing::warn!(target: "engine.hotplug", error = %err, "failed to wake multiplexer");
                }
            }
        })
        .map_err(|source| HotplugError::Watch { path: dir.to_path_buf(), source })?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| HotplugError::Watch { path: dir.to_path_buf(), source })?;

        Ok(Self { _watcher: watcher, receiver: rx })
    }

    /// Drains all notifications currently queued without blocking.
    pub fn try_drain(&self) -> Vec<HotplugEvent> {
        self.receiver.try_iter().collect()
    }
}

fn translate(event: &NotifyEvent) -> Vec<HotplugEvent> {
    match event.kind {
        NotifyEventKind::Create(_) => {
            event.paths.iter().filter(|p| matches_device_name(p)).map(|p| HotplugEvent::Created(p.clone())).collect()
        }
        NotifyEventKind::Remove(_) => {
            event.paths.iter().filter(|p| matches_device_name(p)).map(|p| HotplugEvent::Removed(p.clone())).collect()
        }
        NotifyEventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::new();
            if let Some(from) = event.paths.first().filter(|p| matches_device_name(p)) {
                out.push(HotplugEvent::Removed(from.clone()));
            }
            if let Some(to) = event.paths.get(1).filter(|p| matches_device_name(p)) {
                out.push(HotplugEvent::Created(to.clone()));
            }
            out
        }
        NotifyEventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            event.paths.iter().filter(|p| matches_device_name(p)).map(|p| HotplugEvent::Removed(p.clone())).collect()
        }
        NotifyEventKind::Modify(ModifyKind::Name(_)) => {
            event.paths.iter().filter(|p| matches_device_name(p)).map(|p| HotplugEvent::Created(p.clone())).collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, Instant};

    #[test]
    fn device_name_pattern_matches_only_event_nodes() {
        assert!(matches_device_name(Path::new("/dev/input/event0")));
        assert!(matches_device_name(Path::new("/dev/input/event17")));
        assert!(!matches_device_name(Path::new("/dev/input/mice")));
        assert!(!matches_device_name(Path::new("/dev/input/js0")));
        assert!(!matches_device_name(Path::new("/dev/input/by-id/some-symlink")));
    }

    #[test]
    fn create_and_remove_of_matching_node_are_observed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let watcher = HotplugWatcher::watch(dir.path(), None).expect("watch starts");

        let node = dir.path().join("event3");
        fs::write(&node, b"").expect("create node");

        let created = wait_for(&watcher, Duration::from_secs(2), |events| {
            events.iter().any(|e| matches!(e, HotplugEvent::Created(p) if p == &node))
        });
        assert!(created, "expected a Created notification for {node:?}");

        fs::remove_file(&node).expect("remove node");
        let removed = wait_for(&watcher, Duration::from_secs(2), |events| {
            events.iter().any(|e| matches!(e, HotplugEvent::Removed(p) if p == &node))
        });
        assert!(removed, "expected a Removed notification for {node:?}");
    }

    fn wait_for(watcher: &HotplugWatcher, timeout: Duration, pred: impl Fn(&[HotplugEvent]) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let batch = watcher.try_drain();
            if pred(&batch) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }
}
