//! Raw input acquisition and dispatch engine: ties the device registry,
//! readiness multiplexer, hotplug watcher, acquisition worker, dispatch
//! policy, keymap interpreter, and legacy pointer reader into a single
//! `InputEngine` handle (spec.md §6).
//!
//! `InputEngine::init` returns an owned handle rather than reaching for a
//! process-wide singleton; [`ffi`] layers the singleton-shaped `extern "C"`
//! contract on top for callers that need it literally.

mod dispatch;
mod error;
pub mod ffi;
mod legacy;
mod worker;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use core_config::EngineConfig;
use core_device::{DeviceRegistry, Filter};
use core_events::{Event, KeyRecord};
use core_keymap::{KeymapInterpreter, KeymapNames};
use core_poll::RegistryHandle;
use core_ring::BoundedRing;

pub use dispatch::SinkFn;
pub use error::InputError;
pub use worker::MonotonicClock;

const DEFAULT_DEVICE_DIR: &str = "/dev/input";

/// Shared state reachable from the caller's thread, the acquisition
/// worker thread, and the optional legacy pointer reader thread.
pub(crate) struct EngineState {
    config: EngineConfig,
    registry: DeviceRegistry,
    /// The device directory the worker's discovery pass scans. Kept here,
    /// not just as a parameter to `worker::spawn`, so `set_filter` can
    /// re-run discovery on the caller's thread without needing its own copy
    /// threaded through the public API.
    device_dir: PathBuf,
    /// Published by the worker once its multiplexer exists, so `set_filter`
    /// can register/deregister devices from the caller's thread while the
    /// worker is independently blocked in `wait()` (spec.md §4.4, §5).
    registry_handle: OnceLock<RegistryHandle>,
    filter: Mutex<Option<Filter>>,
    event_ring: BoundedRing<Event>,
    key_ring: BoundedRing<KeyRecord>,
    event_dispatch: dispatch::DispatchPolicy<Event>,
    key_dispatch: dispatch::DispatchPolicy<KeyRecord>,
    keymap: Mutex<Option<KeymapInterpreter>>,
    keymap_names: Mutex<KeymapNames>,
    keymap_enabled: AtomicBool,
    clock: MonotonicClock,
    shutdown: AtomicBool,
}

impl EngineState {
    /// Entry point every raw event passes through: delivered via the raw
    /// dispatch policy, then, if the keymap layer is enabled, translated and
    /// separately delivered via the key dispatch policy (spec.md §4.7: "the
    /// raw KEY stream a caller already receives is unaffected by whether a
    /// keymap interpreter is attached").
    pub(crate) fn dispatch_event(&self, event: Event) {
        self.event_dispatch.dispatch(&self.event_ring, event);

        if !self.keymap_enabled.load(Ordering::Acquire) {
            return;
        }
        let mut guard = self.keymap.lock().expect("keymap mutex poisoned");
        if let Some(interpreter) = guard.as_mut() {
            if let Some(record) = interpreter.translate(&event) {
                self.key_dispatch.dispatch(&self.key_ring, record);
            }
        }
    }
}

/// The public handle to a running acquisition engine (spec.md §6).
///
/// Dropping or [`shutdown`](Self::shutdown)ing an `InputEngine` stops the
/// acquisition worker and any running legacy pointer reader, then releases
/// every open device handle.
pub struct InputEngine {
    state: Arc<EngineState>,
    worker: Option<worker::WorkerHandles>,
    legacy: Mutex<Option<legacy::LegacyPointerReader>>,
}

impl InputEngine {
    /// Starts the engine: spawns the acquisition worker, which opens the
    /// readiness multiplexer, starts the hotplug watcher, and runs the
    /// initial device discovery pass before this call returns control to
    /// the caller. `flags` is reserved for forward compatibility and
    /// currently unused, matching spec.md §6's `init(flags=0)`.
    pub fn init(_flags: u32) -> Result<Self, InputError> {
        let config = EngineConfig::from_env();
        let device_dir = PathBuf::from(DEFAULT_DEVICE_DIR);
        let state = Arc::new(EngineState {
            registry: DeviceRegistry::new(config.max_devices),
            device_dir: device_dir.clone(),
            registry_handle: OnceLock::new(),
            filter: Mutex::new(None),
            event_ring: BoundedRing::new(config.ring_capacity),
            key_ring: BoundedRing::new(config.key_ring_capacity),
            event_dispatch: dispatch::DispatchPolicy::default(),
            key_dispatch: dispatch::DispatchPolicy::default(),
            keymap: Mutex::new(None),
            keymap_names: Mutex::new(KeymapNames::default()),
            keymap_enabled: AtomicBool::new(false),
            clock: MonotonicClock::default(),
            shutdown: AtomicBool::new(false),
            config,
        });

        let worker = worker::spawn(state.clone(), device_dir)
            .map_err(|source| InputError::System { operation: "spawn acquisition worker", source })?;

        Ok(Self {
            state,
            worker: Some(worker),
            legacy: Mutex::new(None),
        })
    }

    /// Requests shutdown, joins the acquisition worker (and the legacy
    /// reader, if running), then drops every device handle still open in
    /// the registry. Best-effort: join failures are logged, not propagated,
    /// since by this point there is nothing left for the caller to retry
    /// (spec.md §7).
    pub fn shutdown(mut self) {
        self.state.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join.join().is_err() {
                tracing::error!(target: "engine.shutdown", "acquisition worker thread panicked");
            }
        }
        if let Some(legacy) = self.legacy.lock().expect("legacy mutex poisoned").take() {
            legacy.stop();
        }
    }

    /// Number of devices currently registered and readable.
    pub fn device_count(&self) -> u32 {
        self.state.registry.count() as u32
    }

    /// Installs (or clears) the acceptance predicate. Already-registered
    /// devices are re-evaluated synchronously on the caller's thread before
    /// this call returns; devices the new filter rejects are deregistered
    /// and closed, and the discovery pass is re-run so nodes the new
    /// predicate newly accepts are admitted immediately rather than waiting
    /// for a hotplug event (spec.md §4.4: "the discovery pass is re-run to
    /// admit newly-acceptable nodes").
    pub fn set_filter(&self, filter: Option<Filter>) {
        *self.state.filter.lock().expect("filter mutex poisoned") = filter;
        if let Some(registry_handle) = self.state.registry_handle.get() {
            worker::reevaluate_filter(&self.state, registry_handle);
            worker::run_discovery(&self.state, &self.state.device_dir, registry_handle);
        }
    }

    /// Installs (or clears) the raw-event callback sink. While a sink is
    /// installed, [`poll`](Self::poll) always returns `0` (spec.md §4.6).
    pub fn register_callback(&self, sink: Option<SinkFn<Event>>) {
        self.state.event_dispatch.set_sink(sink);
    }

    /// Copies up to `out.len()` buffered raw events, oldest first. Returns
    /// `0` without touching the ring when a callback sink is installed.
    pub fn poll(&self, out: &mut [Event]) -> usize {
        if self.state.event_dispatch.has_sink() {
            return 0;
        }
        self.state.event_ring.pop_many(out, out.len())
    }

    /// Enables or disables the keymap interpretation layer. Enabling builds
    /// a fresh interpreter from the most recently set (or default)
    /// [`KeymapNames`]; disabling drops it. The raw event stream is
    /// unaffected either way.
    pub fn enable_keymap(&self, on: bool) -> Result<(), InputError> {
        self.state.keymap_enabled.store(false, Ordering::Release);
        if !on {
            *self.state.keymap.lock().expect("keymap mutex poisoned") = None;
            return Ok(());
        }
        let names = self.state.keymap_names.lock().expect("keymap names mutex poisoned").clone();
        let interpreter = KeymapInterpreter::new(names)?;
        *self.state.keymap.lock().expect("keymap mutex poisoned") = Some(interpreter);
        self.state.keymap_enabled.store(true, Ordering::Release);
        Ok(())
    }

    /// Rebuilds the live keymap (if the layer is enabled) from a new
    /// `rules`/`model`/`layout`/`variant`/`options` set, or just records the
    /// names for the next [`enable_keymap`](Self::enable_keymap) call if the
    /// layer is currently disabled. A compile failure leaves the previously
    /// active keymap untouched and is reported to the caller (spec.md
    /// §4.7).
    pub fn set_keymap_names(&self, names: KeymapNames) -> Result<(), InputError> {
        let mut guard = self.state.keymap.lock().expect("keymap mutex poisoned");
        if let Some(interpreter) = guard.as_mut() {
            interpreter.rebuild(names.clone())?;
        }
        drop(guard);
        *self.state.keymap_names.lock().expect("keymap names mutex poisoned") = names;
        Ok(())
    }

    /// Installs (or clears) the key-record callback sink. While a sink is
    /// installed, [`poll_key_events`](Self::poll_key_events) always returns
    /// `0`.
    pub fn register_key_callback(&self, sink: Option<SinkFn<KeyRecord>>) {
        self.state.key_dispatch.set_sink(sink);
    }

    /// Copies up to `out.len()` buffered key records, oldest first. Returns
    /// `0` without touching the ring when a callback sink is installed, and
    /// always returns `0` when the keymap layer is disabled (nothing is
    /// ever produced to buffer).
    pub fn poll_key_events(&self, out: &mut [KeyRecord]) -> usize {
        if self.state.key_dispatch.has_sink() {
            return 0;
        }
        self.state.key_ring.pop_many(out, out.len())
    }

    /// Starts or stops the legacy pointer reader thread for
    /// `/dev/input/mice`. Disabled by default (spec.md §4.8). Calling with
    /// the reader's current state is a no-op.
    pub fn enable_legacy_pointer(&self, on: bool) -> Result<(), InputError> {
        let mut guard = self.legacy.lock().expect("legacy mutex poisoned");
        if on {
            if guard.is_some() {
                return Ok(());
            }
            let reader = legacy::LegacyPointerReader::spawn(self.state.clone())
                .map_err(|source| InputError::System { operation: "spawn legacy pointer reader", source })?;
            *guard = Some(reader);
        } else if let Some(reader) = guard.take() {
            reader.stop();
        }
        Ok(())
    }
}

impl Drop for InputEngine {
    fn drop(&mut self) {
        self.state.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join.join();
        }
        if let Some(legacy) = self.legacy.lock().expect("legacy mutex poisoned").take() {
            legacy.stop();
        }
    }
}
