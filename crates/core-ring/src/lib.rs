//! Fixed-capacity, mutex-guarded single-producer/multi-consumer queue.
//!
//! Backs both the raw event stream and the keymap stream (spec.md §4.1): one
//! `BoundedRing<core_events::Event>` and one `BoundedRing<core_events::KeyRecord>`.
//! Capacity is fixed at construction and allocated once; `push` never
//! allocates, `pop_many` never allocates (the caller supplies the output
//! buffer). There are no condition variables — consumers poll — per the
//! spec's explicit rationale that readiness is already signalled by the
//! acquisition worker when callback delivery is in use.

use std::mem::MaybeUninit;
use std::sync::Mutex;

/// Default ring capacity when a caller does not specify one. Power of two,
/// at least 1024 per spec.md §4.1.
pub const DEFAULT_CAPACITY: usize = 4096;

struct Inner<T> {
    buf: Box<[MaybeUninit<T>]>,
    /// Index of the oldest live element.
    head: usize,
    len: usize,
}

/// A fixed-capacity FIFO of `T` by value. `T: Copy` so the ring never needs
/// to run destructors on overwritten or unread slots.
pub struct BoundedRing<T: Copy> {
    capacity: usize,
    inner: Mutex<Inner<T>>,
}

impl<T: Copy> BoundedRing<T> {
    /// Creates a ring with the given capacity, which must be a power of two
    /// and non-zero.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or not a power of two.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0 && capacity.is_power_of_two(), "BoundedRing capacity must be a non-zero power of two, got {capacity}");
        let buf = (0..capacity)
            .map(|_| MaybeUninit::uninit())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            capacity,
            inner: Mutex::new(Inner { buf, head: 0, len: 0 }),
        }
    }

    /// Creates a ring with [`DEFAULT_CAPACITY`].
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events currently buffered.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("ring mutex poisoned").len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pushes `value` onto the ring. If the ring is full, the *incoming*
    /// value is dropped and the oldest buffered events are retained
    /// (tail-preserving drop, spec.md §4.1 and §9). Returns `false` when the
    /// value was dropped.
    pub fn push(&self, value: T) -> bool {
        let mut inner = self.inner.lock().expect("ring mutex poisoned");
        if inner.len == self.capacity {
            return false;
        }
        let idx = (inner.head + inner.len) % self.capacity;
        inner.buf[idx] = MaybeUninit::new(value);
        inner.len += 1;
        true
    }

    /// Copies up to `max` contiguous oldest events into `out`, returning the
    /// count actually copied. `max` is further capped by `out.len()`.
    pub fn pop_many(&self, out: &mut [T], max: usize) -> usize {
        let mut inner = self.inner.lock().expect("ring mutex poisoned");
        let n = max.min(out.len()).min(inner.len);
        for (i, slot) in out.iter_mut().take(n).enumerate() {
            let idx = (inner.head + i) % self.capacity;
            // SAFETY: indices `[head, head+len)` are always initialized.
            *slot = unsafe { inner.buf[idx].assume_init() };
        }
        inner.head = (inner.head + n) % self.capacity;
        inner.len -= n;
        n
    }
}

// SAFETY: all access to `buf` goes through the Mutex; `T: Copy` (hence no
// `Drop`) means leaving stale bytes in unread slots is inert.
unsafe impl<T: Copy + Send> Send for BoundedRing<T> {}
unsafe impl<T: Copy + Send> Sync for BoundedRing<T> {}
