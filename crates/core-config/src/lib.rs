//! Tunable knobs for the acquisition engine.
//!
//! The engine has no on-disk configuration file — it is a library driven
//! entirely by its caller — but it still has a handful of values spec.md
//! leaves as "implementation choice within a bound" (ring capacity, the
//! multiplexer wait timeout, the hotplug rescan window, the maximum device
//! count). `EngineConfig` collects spec-mandated defaults, lets a caller
//! override them via environment variables or direct construction, and
//! clamps out-of-bound overrides the same way the teacher's own config
//! layer clamps a too-large scroll margin: keep the caller's intent where
//! possible, log when it had to be adjusted.

use std::time::Duration;
use tracing::warn;

/// Ring capacity for both the raw-event and key-record rings. Must be a
/// power of two, at least 1024 (spec.md §4.1).
pub const DEFAULT_RING_CAPACITY: usize = 4096;

/// Upper bound the multiplexer wait may not exceed, so shutdown is observed
/// promptly (spec.md §4.3).
pub const MAX_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Default multiplexer wait timeout.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Default hotplug rescan window (spec.md §4.4: "≈3 s").
pub const DEFAULT_RESCAN_WINDOW: Duration = Duration::from_secs(3);

/// Default maximum number of simultaneously registered devices (spec.md
/// §4.2: "≥128").
pub const DEFAULT_MAX_DEVICES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub ring_capacity: usize,
    pub key_ring_capacity: usize,
    pub max_devices: usize,
    pub poll_timeout: Duration,
    pub rescan_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ring_capacity: DEFAULT_RING_CAPACITY,
            key_ring_capacity: DEFAULT_RING_CAPACITY,
            max_devices: DEFAULT_MAX_DEVICES,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            rescan_window: DEFAULT_RESCAN_WINDOW,
        }
    }
}

impl EngineConfig {
    /// Builds a config from defaults overridden by environment variables
    /// (`INPUT_ENGINE_RING_CAPACITY`, `INPUT_ENGINE_MAX_DEVICES`,
    /// `INPUT_ENGINE_POLL_TIMEOUT_MS`, `INPUT_ENGINE_RESCAN_WINDOW_MS`).
    /// Unparseable values fall back to the default and log a
    /// `tracing::warn!` rather than failing engine startup over a tuning
    /// knob.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_usize("INPUT_ENGINE_RING_CAPACITY") {
            cfg.ring_capacity = v;
            cfg.key_ring_capacity = v;
        }
        if let Some(v) = env_usize("INPUT_ENGINE_MAX_DEVICES") {
            cfg.max_devices = v;
        }
        if let Some(v) = env_u64("INPUT_ENGINE_POLL_TIMEOUT_MS") {
            cfg.poll_timeout = Duration::from_millis(v);
        }
        if let Some(v) = env_u64("INPUT_ENGINE_RESCAN_WINDOW_MS") {
            cfg.rescan_window = Duration::from_millis(v);
        }

        cfg.clamp()
    }

    /// Clamps every field to the bounds spec.md mandates, logging when a
    /// value had to change. Idempotent.
    pub fn clamp(mut self) -> Self {
        self.ring_capacity = clamp_ring_capacity("ring_capacity", self.ring_capacity);
        self.key_ring_capacity = clamp_ring_capacity("key_ring_capacity", self.key_ring_capacity);

        if self.max_devices < 128 {
            warn!(
                target: "engine.config",
                requested = self.max_devices,
                clamped = 128,
                "max_devices below spec minimum, clamped"
            );
            self.max_devices = 128;
        }

        if self.poll_timeout > MAX_POLL_TIMEOUT {
            warn!(
                target: "engine.config",
                requested_ms = self.poll_timeout.as_millis() as u64,
                clamped_ms = MAX_POLL_TIMEOUT.as_millis() as u64,
                "poll_timeout above spec maximum, clamped"
            );
            self.poll_timeout = MAX_POLL_TIMEOUT;
        }

        self
    }
}

fn clamp_ring_capacity(field: &'static str, requested: usize) -> usize {
    let rounded = requested.max(1).next_power_of_two();
    let clamped = rounded.max(1024);
    if clamped != requested {
        warn!(
            target: "engine.config",
            field,
            requested,
            clamped,
            "ring capacity adjusted to a power of two of at least 1024"
        );
    }
    clamped
}

fn env_usize(name: &str) -> Option<usize> {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<usize>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(target: "engine.config", name, raw, "ignoring unparseable env override");
                None
            }
        },
        Err(_) => None,
    }
}

fn env_u64(name: &str) -> Option<u64> {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(target: "engine.config", name, raw, "ignoring unparseable env override");
                None
            }
        },
        Err(_) => None,
    }
}
