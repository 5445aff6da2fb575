//! Value-space constants for event kinds, keys, buttons, and relative axes.
//!
//! These alias the Linux kernel's `input-event-codes.h` exactly (spec.md
//! §6: "on host platforms providing native definitions, the constants alias
//! those definitions exactly to enable zero-cost interop"). Only the subset
//! actually referenced elsewhere in this workspace (and commonly needed by
//! host applications) is reproduced; the full kernel header defines several
//! hundred more that are out of scope to enumerate here.

/// Reserved pseudo `device_id` for events synthesized by the Legacy Pointer
/// Reader (spec.md §3, §4.8). No evdev-node-derived id is ever `0`.
pub const LEGACY_POINTER_DEVICE_ID: u32 = 0;

// --- Event kinds (EV_*) ------------------------------------------------

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;
pub const EV_ABS: u16 = 0x03;
pub const EV_MSC: u16 = 0x04;
pub const EV_SW: u16 = 0x05;
pub const EV_LED: u16 = 0x11;
pub const EV_SND: u16 = 0x12;
pub const EV_REP: u16 = 0x14;
pub const EV_FF: u16 = 0x15;

// --- Synchronization codes (SYN_*) -------------------------------------

pub const SYN_REPORT: u16 = 0;
pub const SYN_DROPPED: u16 = 3;

// --- Keys (subset of KEY_*) ---------------------------------------------

pub const KEY_ESC: u16 = 1;
pub const KEY_1: u16 = 2;
pub const KEY_ENTER: u16 = 28;
pub const KEY_LEFTCTRL: u16 = 29;
pub const KEY_LEFTSHIFT: u16 = 42;
pub const KEY_RIGHTSHIFT: u16 = 54;
pub const KEY_LEFTALT: u16 = 56;
pub const KEY_SPACE: u16 = 57;
pub const KEY_RIGHTCTRL: u16 = 97;
pub const KEY_RIGHTALT: u16 = 100;
pub const KEY_LEFTMETA: u16 = 125;
pub const KEY_RIGHTMETA: u16 = 126;

pub const KEY_A: u16 = 30;
pub const KEY_B: u16 = 48;
pub const KEY_C: u16 = 46;
pub const KEY_D: u16 = 32;
pub const KEY_E: u16 = 18;
pub const KEY_F: u16 = 33;
pub const KEY_G: u16 = 34;
pub const KEY_H: u16 = 35;
pub const KEY_I: u16 = 23;
pub const KEY_J: u16 = 36;
pub const KEY_K: u16 = 37;
pub const KEY_L: u16 = 38;
pub const KEY_M: u16 = 50;
pub const KEY_N: u16 = 49;
pub const KEY_O: u16 = 24;
pub const KEY_P: u16 = 25;
pub const KEY_Q: u16 = 16;
pub const KEY_R: u16 = 19;
pub const KEY_S: u16 = 31;
pub const KEY_T: u16 = 20;
pub const KEY_U: u16 = 22;
pub const KEY_V: u16 = 47;
pub const KEY_W: u16 = 17;
pub const KEY_X: u16 = 45;
pub const KEY_Y: u16 = 21;
pub const KEY_Z: u16 = 44;

// --- Pointer buttons (BTN_*); KEY events with these codes ---------------

pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;
pub const BTN_MIDDLE: u16 = 0x112;
pub const BTN_SIDE: u16 = 0x113;
pub const BTN_EXTRA: u16 = 0x114;

// --- Relative axes (REL_*) -----------------------------------------------

pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;
pub const REL_WHEEL: u16 = 0x08;
pub const REL_HWHEEL: u16 = 0x06;

// --- Absolute axes (ABS_*) -----------------------------------------------

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_MT_SLOT: u16 = 0x2f;

// --- Misc (MSC_*) ---------------------------------------------------------

pub const MSC_SCAN: u16 = 0x04;
