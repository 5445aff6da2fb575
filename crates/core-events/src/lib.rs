//! Canonical event types and value-space constants for the input engine.
//!
//! This crate has no I/O and no threading of its own: it is the shared
//! vocabulary other crates in the workspace exchange. `Event` is the
//! platform-neutral record produced by the acquisition worker; `KeyRecord`
//! is the optional, separately-addressable output of the keymap layer.

pub mod constants;

use bitflags::bitflags;

/// The kind of an [`Event`]. Numeric values alias the Linux `EV_*` constants
/// exactly (see [`constants`]) so that host code compiled against this crate
/// and code reading raw `evdev` headers agree without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum EventKind {
    Syn = constants::EV_SYN,
    Key = constants::EV_KEY,
    Rel = constants::EV_REL,
    Abs = constants::EV_ABS,
    Msc = constants::EV_MSC,
}

impl EventKind {
    /// Recover an `EventKind` from a raw Linux `EV_*` value, if recognized.
    ///
    /// Event types the engine does not surface (`EV_LED`, `EV_SND`, `EV_FF`,
    /// ...) return `None`; the acquisition worker drops such packets rather
    /// than synthesizing a catch-all variant (spec.md §3 names exactly five
    /// kinds).
    pub fn from_raw(value: u16) -> Option<Self> {
        match value {
            constants::EV_SYN => Some(Self::Syn),
            constants::EV_KEY => Some(Self::Key),
            constants::EV_REL => Some(Self::Rel),
            constants::EV_ABS => Some(Self::Abs),
            constants::EV_MSC => Some(Self::Msc),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u16 {
        self as u16
    }
}

/// The canonical unit of data delivered to consumers (spec.md §3).
///
/// `Event` is `Copy` and carries no allocation: it is pushed into the
/// [`core_ring`](https://docs.rs/core-ring) bounded ring by value or handed
/// to a callback sink by reference, never boxed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Event {
    /// Stable id of the originating device, or the reserved legacy-pointer
    /// pseudo-id (`0`, see [`constants::LEGACY_POINTER_DEVICE_ID`]).
    pub device_id: u32,
    pub kind: EventKind,
    /// Numeric identifier within `kind` (e.g. a particular key or axis).
    pub code: u16,
    /// KEY: 1 press / 0 release (values above 1 are OS auto-repeat). REL:
    /// signed delta. ABS: absolute sample.
    pub value: i32,
    /// Nanoseconds, derived from the kernel per-packet timestamp when one
    /// was supplied, otherwise a monotonic decode-time sample. The source is
    /// fixed for the lifetime of the process (spec.md §3).
    pub timestamp_ns: u64,
}

impl Event {
    pub const fn new(device_id: u32, kind: EventKind, code: u16, value: i32, timestamp_ns: u64) -> Self {
        Self {
            device_id,
            kind,
            code,
            value,
            timestamp_ns,
        }
    }

    /// True for `KEY` events whose `value` is `1` (press, including the
    /// initial edge of an auto-repeat run — callers wanting to exclude
    /// repeats should additionally check `value == 1` themselves since this
    /// helper intentionally only distinguishes press-phase from release).
    pub fn is_key_down(&self) -> bool {
        matches!(self.kind, EventKind::Key) && self.value != 0
    }
}

bitflags! {
    /// Modifier bits reported alongside a [`KeyRecord`]. Positions are fixed
    /// for the lifetime of the ABI (spec.md §3: "fixed positions").
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct KeyModifiers: u8 {
        const SHIFT   = 0b0000_0001;
        const CONTROL = 0b0000_0010;
        const ALT     = 0b0000_0100;
        const SUPER   = 0b0000_1000;
    }
}

/// Maximum number of UTF-8 bytes a [`KeyRecord::text`] buffer can hold,
/// excluding the trailing NUL (spec.md §3: "~32 bytes").
pub const KEY_TEXT_CAPACITY: usize = 32;

/// A bounded, NUL-terminated UTF-8 buffer produced by the keymap layer on
/// key press. Truncation at `KEY_TEXT_CAPACITY` bytes is silent, per spec;
/// truncation is always performed on a `char` boundary so the stored prefix
/// remains valid UTF-8.
#[derive(Clone, Copy)]
pub struct KeyText {
    buf: [u8; KEY_TEXT_CAPACITY + 1],
    len: u8,
}

impl KeyText {
    pub const fn empty() -> Self {
        Self {
            buf: [0u8; KEY_TEXT_CAPACITY + 1],
            len: 0,
        }
    }

    /// Builds a `KeyText` from `s`, truncating to [`KEY_TEXT_CAPACITY`] bytes
    /// on a `char` boundary if necessary.
    pub fn from_str_truncating(s: &str) -> Self {
        let mut end = s.len().min(KEY_TEXT_CAPACITY);
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        let mut buf = [0u8; KEY_TEXT_CAPACITY + 1];
        buf[..end].copy_from_slice(&s.as_bytes()[..end]);
        Self {
            buf,
            len: end as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        // SAFETY: `buf[..len]` is always a prefix of a `&str` passed to
        // `from_str_truncating`, truncated on a char boundary.
        unsafe { std::str::from_utf8_unchecked(&self.buf[..self.len as usize]) }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }
}

impl Default for KeyText {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for KeyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("KeyText").field(&self.as_str()).finish()
    }
}

impl PartialEq for KeyText {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}
impl Eq for KeyText {}

/// Output of the optional keymap interpretation layer (spec.md §3, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRecord {
    pub device_id: u32,
    pub timestamp_ns: u64,
    pub down: bool,
    /// Logical key symbol after layout/modifier application. Implementation
    /// defined (xkbcommon `xkb_keysym_t` on this backend).
    pub keysym: u32,
    pub mods: KeyModifiers,
    /// Populated on press only; always empty on release.
    pub text: KeyText,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_roundtrips_through_raw() {
        for kind in [
            EventKind::Syn,
            EventKind::Key,
            EventKind::Rel,
            EventKind::Abs,
            EventKind::Msc,
        ] {
            assert_eq!(EventKind::from_raw(kind.as_raw()), Some(kind));
        }
    }

    #[test]
    fn unknown_raw_kind_is_none() {
        assert_eq!(EventKind::from_raw(constants::EV_LED), None);
    }

    #[test]
    fn is_key_down_true_only_for_nonzero_key_events() {
        let press = Event::new(1, EventKind::Key, constants::KEY_A, 1, 100);
        let release = Event::new(1, EventKind::Key, constants::KEY_A, 0, 200);
        let motion = Event::new(1, EventKind::Rel, constants::REL_X, 1, 300);
        assert!(press.is_key_down());
        assert!(!release.is_key_down());
        assert!(!motion.is_key_down());
    }

    #[test]
    fn key_text_truncates_silently_on_char_boundary() {
        let long = "x".repeat(40);
        let text = KeyText::from_str_truncating(&long);
        assert_eq!(text.len(), KEY_TEXT_CAPACITY);

        // A multi-byte char sitting right at the boundary must not split.
        let mut s = "a".repeat(KEY_TEXT_CAPACITY - 1);
        s.push('\u{1F4A3}'); // 4-byte emoji
        let text = KeyText::from_str_truncating(&s);
        assert!(text.len() <= KEY_TEXT_CAPACITY);
        assert!(std::str::from_utf8(text.as_str().as_bytes()).is_ok());
    }

    #[test]
    fn key_modifiers_bits_are_distinct() {
        let all = KeyModifiers::SHIFT | KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER;
        assert_eq!(all.bits().count_ones(), 4);
    }
}
