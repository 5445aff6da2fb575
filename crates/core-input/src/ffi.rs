//! Thin `extern "C"`-compatible integer-status shim over [`crate::InputEngine`],
//! for callers that need the literal `status`/`count` convention of
//! spec.md §6 rather than the idiomatic `Result`-based API.
//!
//! The instance behind these functions is the process-wide singleton
//! spec.md §9 names as the simplest conforming shape; the idiomatic
//! `InputEngine` type itself does not require one (see `DESIGN.md`).

use std::sync::{Mutex, OnceLock};

use core_events::{Event, EventKind, KeyModifiers, KeyRecord, KeyText};

use crate::InputEngine;

static ENGINE: OnceLock<Mutex<Option<InputEngine>>> = OnceLock::new();

fn slot() -> &'static Mutex<Option<InputEngine>> {
    ENGINE.get_or_init(|| Mutex::new(None))
}

pub const STATUS_OK: i32 = 0;
pub const STATUS_ERROR: i32 = -1;
pub const STATUS_NOT_INITIALIZED: i32 = -2;
pub const STATUS_INVALID_ARGUMENT: i32 = -3;

/// `init(flags=0) -> status`. A second call before `shutdown` returns
/// success without reinitializing.
#[unsafe(no_mangle)]
pub extern "C" fn input_engine_init(flags: u32) -> i32 {
    let mut guard = slot().lock().expect("engine mutex poisoned");
    if guard.is_some() {
        return STATUS_OK;
    }
    match InputEngine::init(flags) {
        Ok(engine) => {
            *guard = Some(engine);
            STATUS_OK
        }
        Err(err) => {
            tracing::error!(target: "engine.ffi", error = %err, "init failed");
            STATUS_ERROR
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn input_engine_shutdown() -> i32 {
    let mut guard = slot().lock().expect("engine mutex poisoned");
    match guard.take() {
        Some(engine) => {
            engine.shutdown();
            STATUS_OK
        }
        None => STATUS_NOT_INITIALIZED,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn input_engine_device_count() -> i32 {
    let guard = slot().lock().expect("engine mutex poisoned");
    match guard.as_ref() {
        Some(engine) => engine.device_count() as i32,
        None => STATUS_NOT_INITIALIZED,
    }
}

/// `poll(out[], max) -> count`.
///
/// # Safety
///
/// `out` must be non-null and point to at least `max` writable [`Event`]
/// slots for the duration of this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn input_engine_poll(out: *mut Event, max: i32) -> i32 {
    if out.is_null() || max <= 0 {
        return STATUS_INVALID_ARGUMENT;
    }
    let guard = slot().lock().expect("engine mutex poisoned");
    let Some(engine) = guard.as_ref() else {
        return STATUS_NOT_INITIALIZED;
    };
    let mut buf = vec![Event::new(0, EventKind::Syn, 0, 0, 0); max as usize];
    let n = engine.poll(&mut buf);
    // SAFETY: caller guarantees `out` has room for `max` events and `n <= max`.
    unsafe {
        std::ptr::copy_nonoverlapping(buf.as_ptr(), out, n);
    }
    n as i32
}

/// `poll_key_events(out[], max) -> count`.
///
/// # Safety
///
/// `out` must be non-null and point to at least `max` writable
/// [`KeyRecord`] slots for the duration of this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn input_engine_poll_key_events(out: *mut KeyRecord, max: i32) -> i32 {
    if out.is_null() || max <= 0 {
        return STATUS_INVALID_ARGUMENT;
    }
    let guard = slot().lock().expect("engine mutex poisoned");
    let Some(engine) = guard.as_ref() else {
        return STATUS_NOT_INITIALIZED;
    };
    let empty_record = KeyRecord { device_id: 0, timestamp_ns: 0, down: false, keysym: 0, mods: KeyModifiers::empty(), text: KeyText::empty() };
    let mut buf = vec![empty_record; max as usize];
    let n = engine.poll_key_events(&mut buf);
    // SAFETY: caller guarantees `out` has room for `max` records and `n <= max`.
    unsafe {
        std::ptr::copy_nonoverlapping(buf.as_ptr(), out, n);
    }
    n as i32
}

#[unsafe(no_mangle)]
pub extern "C" fn input_engine_enable_legacy_pointer(on: i32) -> i32 {
    let guard = slot().lock().expect("engine mutex poisoned");
    let Some(engine) = guard.as_ref() else {
        return STATUS_NOT_INITIALIZED;
    };
    match engine.enable_legacy_pointer(on != 0) {
        Ok(()) => STATUS_OK,
        Err(err) => {
            tracing::error!(target: "engine.ffi", error = %err, "enable_legacy_pointer failed");
            STATUS_ERROR
        }
    }
}
