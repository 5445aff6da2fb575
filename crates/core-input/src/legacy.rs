//! The Legacy Pointer Reader: an optional second thread parsing the
//! aggregated legacy pointer stream into canonical Event Records
//! (spec.md §4.8). On Linux this is `/dev/input/mice`.

use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use smallvec::SmallVec;

use core_device::DeviceHandle;
use core_events::constants::{BTN_LEFT, BTN_MIDDLE, BTN_RIGHT, LEGACY_POINTER_DEVICE_ID, REL_WHEEL, REL_X, REL_Y};
use core_events::{Event, EventKind};

use crate::EngineState;

const DEVICE_PATH: &str = "/dev/input/mice";
/// Conservatively always read a 4-byte packet and treat a device that
/// doesn't support the wheel extension as reporting a `0` fourth byte,
/// rather than running a stateful IntelliMouse negotiation protocol.
const PACKET_LEN: usize = 4;
const WOULD_BLOCK_SLEEP: Duration = Duration::from_millis(5);

/// Worst case one packet decodes to: three button edges plus dx, dy, and
/// wheel. Sized so `decode_packet` never spills to the heap on the hot
/// path (spec.md §5: "no per-event allocation occurs on the hot path").
const INLINE_DECODED_EVENTS: usize = 6;
type DecodedEvents = SmallVec<[Event; INLINE_DECODED_EVENTS]>;

const BIT_LEFT: u8 = 0b001;
const BIT_RIGHT: u8 = 0b010;
const BIT_MIDDLE: u8 = 0b100;

/// Handle to a running legacy pointer reader thread.
pub struct LegacyPointerReader {
    join: JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

impl LegacyPointerReader {
    pub fn spawn(state: Arc<EngineState>) -> io::Result<Self> {
        let handle = DeviceHandle::open(Path::new(DEVICE_PATH))?;
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = stop.clone();
        let join = std::thread::Builder::new()
            .name("input-legacy-pointer".to_string())
            .spawn(move || run(state, handle, stop_for_thread))?;
        Ok(Self { join, stop })
    }

    pub fn stop(self) {
        self.stop.store(true, Ordering::Release);
        let _ = self.join.join();
    }
}

fn run(state: Arc<EngineState>, handle: DeviceHandle, stop: Arc<AtomicBool>) {
    // No OS-supplied per-packet timestamp exists for this stream, so the
    // monotonic decode-time clock is the source used for its lifetime
    // (spec.md §3: "the chosen source must be consistent within a single
    // process lifetime").
    let start = Instant::now();
    let mut prev_buttons = 0u8;
    let mut packet = [0u8; PACKET_LEN];
    let mut filled = 0usize;

    while !stop.load(Ordering::Acquire) && !state.shutdown.load(Ordering::Acquire) {
        match read_byte(&handle) {
            Some(byte) => {
                packet[filled] = byte;
                filled += 1;
                if filled == PACKET_LEN {
                    filled = 0;
                    let timestamp_ns = start.elapsed().as_nanos() as u64;
                    for event in decode_packet(&packet, &mut prev_buttons, timestamp_ns) {
                        state.dispatch_event(event);
                    }
                }
            }
            None => std::thread::sleep(WOULD_BLOCK_SLEEP),
        }
    }
}

/// `/dev/input/mice`'s byte stream has no evdev framing, so this reader
/// talks to the fd directly rather than through `DeviceHandle::read_event`.
fn read_byte(handle: &DeviceHandle) -> Option<u8> {
    let fd = handle.as_raw_fd();
    let mut byte = 0u8;
    // SAFETY: `&mut byte` is one writable byte for the duration of the call.
    let n = unsafe { libc::read(fd, &mut byte as *mut u8 as *mut libc::c_void, 1) };
    if n == 1 {
        Some(byte)
    } else {
        None
    }
}

/// Decodes one PS/2-compatible packet into zero or more canonical events:
/// up to three KEY edges from button-mask diffing, REL X/Y from the motion
/// bytes (Y sign-flipped to the canonical axis orientation), and an
/// optional wheel REL from the fourth byte.
fn decode_packet(packet: &[u8; PACKET_LEN], prev_buttons: &mut u8, timestamp_ns: u64) -> DecodedEvents {
    let mut events = DecodedEvents::new();

    let buttons = packet[0] & (BIT_LEFT | BIT_RIGHT | BIT_MIDDLE);
    for (bit, code) in [(BIT_LEFT, BTN_LEFT), (BIT_RIGHT, BTN_RIGHT), (BIT_MIDDLE, BTN_MIDDLE)] {
        let was_down = *prev_buttons & bit != 0;
        let is_down = buttons & bit != 0;
        if was_down != is_down {
            events.push(Event::new(LEGACY_POINTER_DEVICE_ID, EventKind::Key, code, is_down as i32, timestamp_ns));
        }
    }
    *prev_buttons = buttons;

    let dx = packet[1] as i8 as i32;
    let dy = -(packet[2] as i8 as i32);
    if dx != 0 {
        events.push(Event::new(LEGACY_POINTER_DEVICE_ID, EventKind::Rel, REL_X, dx, timestamp_ns));
    }
    if dy != 0 {
        events.push(Event::new(LEGACY_POINTER_DEVICE_ID, EventKind::Rel, REL_Y, dy, timestamp_ns));
    }

    let wheel = packet[3] as i8 as i32;
    if wheel != 0 {
        events.push(Event::new(LEGACY_POINTER_DEVICE_ID, EventKind::Rel, REL_WHEEL, wheel, timestamp_ns));
    }

    events
}
