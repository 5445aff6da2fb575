//! The Acquisition Worker: a single long-running thread draining OS input
//! into canonical Event Records (spec.md §4.5).

use std::collections::HashMap;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::Instant;

use core_device::{open_and_identify, DeviceInfo};
use core_events::{Event, EventKind};
use core_hotplug::{HotplugEvent, HotplugWatcher};
use core_poll::{ReadinessMultiplexer, RegistryHandle, Tag, HOTPLUG_TAG};
use mio::unix::SourceFd;
use mio::Interest;

use crate::EngineState;

pub(crate) struct WorkerHandles {
    pub join: JoinHandle<()>,
}

/// Per-device monotonic-timestamp guard (spec.md §3's "non-decreasing"
/// invariant): when the OS-reported wall-clock timestamp regresses (NTP
/// slew, clock step), the engine clamps to `previous + 1` and logs once per
/// device rather than emitting a non-monotonic stream or aborting.
#[derive(Default)]
pub(crate) struct MonotonicClock {
    last: Mutex<HashMap<u32, u64>>,
    warned: Mutex<std::collections::HashSet<u32>>,
}

impl MonotonicClock {
    pub(crate) fn clamp(&self, device_id: u32, observed: u64) -> u64 {
        let mut last = self.last.lock().expect("clock mutex poisoned");
        let previous = last.get(&device_id).copied().unwrap_or(0);
        let value = if observed < previous {
            let mut warned = self.warned.lock().expect("clock mutex poisoned");
            if warned.insert(device_id) {
                tracing::warn!(
                    target: "engine.clock",
                    device_id,
                    observed,
                    previous,
                    "device timestamp regressed; clamping to previous + 1"
                );
            }
            previous + 1
        } else {
            observed
        };
        last.insert(device_id, value);
        value
    }
}

pub(crate) fn spawn(state: std::sync::Arc<EngineState>, device_dir: PathBuf) -> std::io::Result<WorkerHandles> {
    let join = std::thread::Builder::new().name("input-acquisition".to_string()).spawn(move || run(state, device_dir))?;
    Ok(WorkerHandles { join })
}

/// The handful of fallible setup steps the worker runs once before entering
/// its loop, collapsed behind `anyhow::Context` so the single log line at
/// the call site carries the whole chain rather than whichever step
/// happened to fail. The steady-state loop below deals in `io::Result`
/// directly, since by then each error maps to one specific, narrow
/// recovery (retry this device, drop this hotplug batch) rather than "abandon
/// the worker".
fn start(state: &EngineState, device_dir: &Path) -> anyhow::Result<(ReadinessMultiplexer, RegistryHandle, HotplugWatcher)> {
    use anyhow::Context;

    let mut mux = ReadinessMultiplexer::new().context("failed to create readiness multiplexer")?;
    let registry_handle = mux.registry_handle().context("failed to clone multiplexer registry")?;
    if state.registry_handle.set(registry_handle.clone()).is_err() {
        tracing::warn!(target: "engine.worker", "registry handle already published; worker restarted without shutdown?");
    }
    let waker = std::sync::Arc::new(registry_handle.waker(HOTPLUG_TAG).context("failed to create hotplug waker")?);
    let hotplug = HotplugWatcher::watch(device_dir, Some(waker)).context("failed to start hotplug watcher")?;
    Ok((mux, registry_handle, hotplug))
}

fn run(state: std::sync::Arc<EngineState>, device_dir: PathBuf) {
    let (mut mux, registry_handle, hotplug) = match start(&state, &device_dir) {
        Ok(started) => started,
        Err(err) => {
            tracing::error!(target: "engine.worker", error = format!("{err:#}"), "acquisition worker failed to start");
            return;
        }
    };

    let mut rescan_until: Option<Instant> = None;

    run_discovery(&state, &device_dir, &registry_handle);

    while !state.shutdown.load(Ordering::Acquire) {
        if let Some(deadline) = rescan_until {
            if Instant::now() < deadline {
                run_discovery(&state, &device_dir, &registry_handle);
            } else {
                rescan_until = None;
            }
        }

        let ready = match mux.wait(state.config.poll_timeout) {
            Ok(ready) => ready,
            Err(err) => {
                tracing::warn!(target: "engine.worker", error = %err, "multiplexer wait failed");
                continue;
            }
        };

        for tag in ready {
            if tag == HOTPLUG_TAG {
                for event in hotplug.try_drain() {
                    apply_hotplug_event(&state, event, &registry_handle, &mut rescan_until);
                }
                continue;
            }
            drain_device(&state, tag.0 as u32);
        }
    }
}

/// Enumerates `device_dir`, opening and identifying every not-yet-registered
/// node matching the device name pattern, applying the installed filter,
/// and registering accepted devices with the multiplexer (spec.md §4.4).
///
/// Safe to call from any thread that holds a `RegistryHandle`: `set_filter`
/// uses this directly on the caller's thread to admit newly-acceptable
/// nodes immediately after a predicate replacement, matching the worker's
/// own startup and rescan-window calls.
pub(crate) fn run_discovery(state: &EngineState, device_dir: &Path, registry_handle: &core_poll::RegistryHandle) {
    let entries = match std::fs::read_dir(device_dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(target: "engine.discovery", error = %err, dir = %device_dir.display(), "failed to read device directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if core_device::stable_id_from_path(&path).is_none() {
            continue;
        }
        if state.registry.contains_path(&path) {
            continue;
        }
        try_admit(state, &path, registry_handle);
    }
}

fn try_admit(state: &EngineState, path: &Path, registry_handle: &core_poll::RegistryHandle) {
    let descriptor = match open_and_identify(path) {
        Ok(descriptor) => descriptor,
        Err(err) => {
            tracing::debug!(target: "engine.discovery", error = %err, path = %path.display(), "device open/identify failed, may retry during rescan window");
            return;
        }
    };
    admit_descriptor(state, descriptor, registry_handle);
}

fn admit_descriptor(state: &EngineState, descriptor: core_device::DeviceDescriptor, registry_handle: &core_poll::RegistryHandle) {
    let accepted = {
        let filter = state.filter.lock().expect("filter mutex poisoned");
        filter.as_ref().is_none_or(|f| f(&descriptor.info()))
    };
    if !accepted {
        return; // descriptor dropped here; handle closes on Drop
    }

    let fd = descriptor.handle.as_raw_fd();
    let tag = Tag(descriptor.stable_id as usize);
    if let Err(err) = registry_handle.register(&mut SourceFd(&fd), tag, Interest::READABLE) {
        tracing::warn!(target: "engine.discovery", error = %err, path = %descriptor.path.display(), "failed to register device with multiplexer");
        return;
    }

    let path = descriptor.path.clone();
    if state.registry.add(descriptor).is_err() {
        tracing::warn!(target: "engine.discovery", path = %path.display(), "device registry at capacity; dropping newly discovered device");
        let _ = registry_handle.deregister(&mut SourceFd(&fd));
    }
}

fn apply_hotplug_event(
    state: &EngineState,
    event: HotplugEvent,
    registry_handle: &core_poll::RegistryHandle,
    rescan_until: &mut Option<Instant>,
) {
    match event {
        HotplugEvent::Created(path) => {
            if state.registry.contains_path(&path) {
                return;
            }
            match open_and_identify(&path) {
                Ok(descriptor) => admit_descriptor(state, descriptor, registry_handle),
                Err(err) => {
                    tracing::debug!(target: "engine.hotplug", error = %err, path = %path.display(), "transient open failure on hotplug create; arming rescan window");
                    *rescan_until = Some(Instant::now() + state.config.rescan_window);
                }
            }
        }
        HotplugEvent::Removed(path) => {
            if let Some(id) = core_device::stable_id_from_path(&path) {
                remove_device(state, id, registry_handle);
            }
        }
    }
}

pub(crate) fn remove_device(state: &EngineState, stable_id: u32, registry_handle: &core_poll::RegistryHandle) {
    if let Some(descriptor) = state.registry.remove(stable_id) {
        let fd = descriptor.handle.as_raw_fd();
        let _ = registry_handle.deregister(&mut SourceFd(&fd));
    }
}

/// Drains device `stable_id` until its handle reports would-block,
/// decoding each raw packet into an Event Record and invoking the
/// dispatch policy (spec.md §4.5's decoding contract).
fn drain_device(state: &EngineState, stable_id: u32) {
    loop {
        let read = state.registry.with_descriptor(stable_id, |descriptor| descriptor.handle.read_event());
        let raw = match read {
            Some(Ok(Some(raw))) => raw,
            Some(Ok(None)) => return, // would-block: done draining for this wake
            Some(Err(err)) => {
                tracing::debug!(target: "engine.worker", error = %err, stable_id, "device read error; retained, retried on next readiness");
                return;
            }
            None => return, // removed concurrently (hotplug race); nothing to drain
        };

        let Some(kind) = EventKind::from_raw(raw.type_) else {
            continue; // event types the engine does not surface (EV_LED, ...)
        };

        let observed_ns = timestamp_from_raw(raw.time.tv_sec, raw.time.tv_usec);
        let timestamp_ns = state.clock.clamp(stable_id, observed_ns);
        let event = Event::new(stable_id, kind, raw.code, raw.value, timestamp_ns);
        state.dispatch_event(event);
    }
}

fn timestamp_from_raw(tv_sec: i64, tv_usec: i64) -> u64 {
    let micros = tv_sec.saturating_mul(1_000_000).saturating_add(tv_usec);
    micros.max(0) as u64 * 1_000
}

/// Used by `set_filter` to re-evaluate already-open devices on the caller's
/// thread (spec.md §4.4: "the predicate is invoked on the caller thread
/// during `set_filter`").
pub(crate) fn reevaluate_filter(state: &EngineState, registry_handle: &core_poll::RegistryHandle) {
    let filter = state.filter.lock().expect("filter mutex poisoned").clone();
    let ids = state.registry.ids();
    for id in ids {
        let Some(info): Option<DeviceInfo> = state.registry.info(id) else { continue };
        let keep = filter.as_ref().is_none_or(|f| f(&info));
        if !keep {
            remove_device(state, id, registry_handle);
        }
    }
}
