//! Selection between callback-direct and ring-enqueue delivery for one
//! stream (spec.md §4.6).

use std::sync::{Arc, Mutex};

use core_ring::BoundedRing;

/// A caller-installed sink. Must not block and must not call back into the
/// engine's lifecycle operations — the worker thread invokes it inline
/// (spec.md §4.6, §9 "sink reentrancy").
pub type SinkFn<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Holds at most one sink for a stream, falling back to a [`BoundedRing`]
/// when none is installed.
///
/// Replacing the sink does not serialize with in-flight callbacks: an
/// invocation that already cloned the previous `Arc` runs it to completion
/// regardless of a concurrent `set_sink` (spec.md §4.6: "no per-call
/// serialization across replacements").
pub struct DispatchPolicy<T> {
    sink: Mutex<Option<SinkFn<T>>>,
}

impl<T> Default for DispatchPolicy<T> {
    fn default() -> Self {
        Self { sink: Mutex::new(None) }
    }
}

impl<T> DispatchPolicy<T> {
    pub fn set_sink(&self, sink: Option<SinkFn<T>>) {
        *self.sink.lock().expect("dispatch mutex poisoned") = sink;
    }

    pub fn has_sink(&self) -> bool {
        self.sink.lock().expect("dispatch mutex poisoned").is_some()
    }
}

impl<T: Copy> DispatchPolicy<T> {
    /// Delivers `value` via the callback path if a sink is installed,
    /// otherwise pushes it into `ring`. A full ring drops `value` per the
    /// ring's own tail-preserving policy; that is logged, not propagated,
    /// since no caller is waiting synchronously on this path.
    pub fn dispatch(&self, ring: &BoundedRing<T>, value: T) {
        let sink = self.sink.lock().expect("dispatch mutex poisoned").clone();
        match sink {
            Some(sink) => sink(&value),
            None => {
                if !ring.push(value) {
                    tracing::warn!(target: "engine.dispatch", "ring at capacity, dropping newest event");
                }
            }
        }
    }
}
