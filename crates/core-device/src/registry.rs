//! Indexed collection of open device descriptors (spec.md §4.2).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::descriptor::DeviceDescriptor;

/// Thread-safe registry of currently-open devices, keyed by stable id.
/// Every operation takes the registry mutex; callers on the worker and any
/// consumer thread calling `device_count`/`iterate` observe a consistent
/// snapshot.
pub struct DeviceRegistry {
    max_devices: usize,
    inner: Mutex<HashMap<u32, DeviceDescriptor>>,
}

/// Returned when `add` would exceed the configured device capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("device registry is at capacity ({max_devices})")]
pub struct RegistryFullError {
    pub max_devices: usize,
}

impl DeviceRegistry {
    pub fn new(max_devices: usize) -> Self {
        Self {
            max_devices,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts `descriptor`, replacing any prior entry with the same stable
    /// id (the invariant in spec.md §3 permits id reuse only for a
    /// matching OS node name, which the caller is responsible for
    /// confirming before calling `add`).
    pub fn add(&self, descriptor: DeviceDescriptor) -> Result<(), RegistryFullError> {
        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        if inner.len() >= self.max_devices && !inner.contains_key(&descriptor.stable_id) {
            return Err(RegistryFullError { max_devices: self.max_devices });
        }
        inner.insert(descriptor.stable_id, descriptor);
        Ok(())
    }

    /// Removes and returns the descriptor for `stable_id`, if present. The
    /// returned descriptor's `Drop` closes its handle.
    pub fn remove(&self, stable_id: u32) -> Option<DeviceDescriptor> {
        self.inner.lock().expect("registry mutex poisoned").remove(&stable_id)
    }

    pub fn contains(&self, stable_id: u32) -> bool {
        self.inner.lock().expect("registry mutex poisoned").contains_key(&stable_id)
    }

    pub fn count(&self) -> usize {
        self.inner.lock().expect("registry mutex poisoned").len()
    }

    /// Returns the stable ids of every currently-registered device, in
    /// unspecified order. Used for filter re-evaluation and iteration where
    /// holding the registry lock across a caller-supplied predicate call
    /// would risk deadlock.
    pub fn ids(&self) -> Vec<u32> {
        self.inner.lock().expect("registry mutex poisoned").keys().copied().collect()
    }

    /// Returns a `DeviceInfo` snapshot for `stable_id`, if present.
    pub fn info(&self, stable_id: u32) -> Option<crate::info::DeviceInfo> {
        self.inner.lock().expect("registry mutex poisoned").get(&stable_id).map(DeviceDescriptor::info)
    }

    /// Calls `f` with the descriptor for `stable_id` while holding the
    /// registry lock, returning `None` if no such device is registered.
    /// Lets callers (the acquisition worker) read from a device's handle
    /// without the registry exposing its lock directly.
    pub fn with_descriptor<R>(&self, stable_id: u32, f: impl FnOnce(&DeviceDescriptor) -> R) -> Option<R> {
        self.inner.lock().expect("registry mutex poisoned").get(&stable_id).map(f)
    }

    /// Returns the path already registered for `path`'s node name, if any —
    /// used by discovery to skip nodes already open.
    pub fn contains_path(&self, path: &std::path::Path) -> bool {
        self.inner.lock().expect("registry mutex poisoned").values().any(|d| d.path == path)
    }
}
