//! Synthetic `/dev/uinput` device fixture for the end-to-end tests
//! (SPEC_FULL.md §10). This is test-only infrastructure, not part of the
//! crate's public surface: spec.md §1 names "synthetic device creation for
//! self-test" as an external collaborator, so it lives here rather than in
//! `src/`.
//!
//! `/dev/uinput` is frequently absent or unreadable in sandboxed test
//! runners (no `CAP_SYS_ADMIN`, device node not bind-mounted, ...). Every
//! entry point here returns `None` rather than panicking when the fixture
//! can't be built, and callers are expected to skip rather than fail the
//! test — the same best-effort posture spec.md §7 mandates for the engine
//! itself, applied to the harness that exercises it.

#![allow(dead_code)]

use std::ffi::CString;
use std::io;
use std::os::fd::RawFd;
use std::time::{Duration, Instant};

use core_device::input_event;

const UINPUT_PATH: &str = "/dev/uinput";
const UINPUT_MAX_NAME_SIZE: usize = 80;

const EV_SYN: u32 = 0x00;
const EV_KEY: u32 = 0x01;
const EV_REL: u32 = 0x02;
const SYN_REPORT: u16 = 0;

// ioctl request numbers from <linux/uinput.h>, computed with the same
// `_IOC` formula `core_device::raw` already uses for the `EVIOCG*` family
// rather than hand-copied magic numbers.
const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;
const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;
const IOC_NONE: u32 = 0;
const IOC_WRITE: u32 = 1;

const fn ioc(dir: u32, ty: u32, nr: u32, size: u32) -> libc::c_ulong {
    ((dir << IOC_DIRSHIFT) | (ty << IOC_TYPESHIFT) | (nr << IOC_NRSHIFT) | (size << IOC_SIZESHIFT)) as libc::c_ulong
}

const fn io(ty: u32, nr: u32) -> libc::c_ulong {
    ioc(IOC_NONE, ty, nr, 0)
}

const fn iow(ty: u32, nr: u32, size: usize) -> libc::c_ulong {
    ioc(IOC_WRITE, ty, nr, size as u32)
}

const UINPUT_TYPE: u32 = b'U' as u32;

fn ui_set_evbit() -> libc::c_ulong {
    iow(UINPUT_TYPE, 100, std::mem::size_of::<libc::c_int>())
}
fn ui_set_keybit() -> libc::c_ulong {
    iow(UINPUT_TYPE, 101, std::mem::size_of::<libc::c_int>())
}
fn ui_set_relbit() -> libc::c_ulong {
    iow(UINPUT_TYPE, 102, std::mem::size_of::<libc::c_int>())
}
fn ui_dev_setup() -> libc::c_ulong {
    iow(UINPUT_TYPE, 3, std::mem::size_of::<UinputSetup>())
}
fn ui_dev_create() -> libc::c_ulong {
    io(UINPUT_TYPE, 1)
}
fn ui_dev_destroy() -> libc::c_ulong {
    io(UINPUT_TYPE, 2)
}

#[repr(C)]
struct InputId {
    bustype: u16,
    vendor: u16,
    product: u16,
    version: u16,
}

#[repr(C)]
struct UinputSetup {
    id: InputId,
    name: [u8; UINPUT_MAX_NAME_SIZE],
    ff_effects_max: u32,
}

/// The shape of device the fixture should advertise, so filter-driven
/// discovery tests (spec.md §8 scenario 4) can distinguish a "mouse" from a
/// plain keyboard by name.
pub enum Shape {
    Keyboard,
    Mouse,
}

/// A virtual evdev device created via `/dev/uinput`, torn down on drop.
pub struct UinputDevice {
    fd: RawFd,
}

impl UinputDevice {
    /// Creates and activates a virtual device named `name`. Returns `Ok(None)`
    /// (not an error) when `/dev/uinput` can't be opened or configured —
    /// callers should treat that as "skip this test", matching spec.md §7's
    /// silent-discard-on-routine-failure policy for individual devices.
    pub fn create(name: &str, shape: Shape) -> io::Result<Option<Self>> {
        let fd = match open_uinput() {
            Some(fd) => fd,
            None => return Ok(None),
        };

        let result = (|| -> io::Result<()> {
            set_evbit(fd, EV_SYN)?;
            set_evbit(fd, EV_KEY)?;
            match shape {
                Shape::Keyboard => {
                    for code in core_events::constants::KEY_A..=core_events::constants::KEY_Z {
                        set_keybit(fd, code as u32)?;
                    }
                    set_keybit(fd, core_events::constants::KEY_Q as u32)?;
                }
                Shape::Mouse => {
                    set_evbit(fd, EV_REL)?;
                    set_keybit(fd, core_events::constants::BTN_LEFT as u32)?;
                    set_keybit(fd, core_events::constants::BTN_RIGHT as u32)?;
                    set_relbit(fd, core_events::constants::REL_X as u32)?;
                    set_relbit(fd, core_events::constants::REL_Y as u32)?;
                }
            }
            dev_setup(fd, name)?;
            dev_create(fd)?;
            Ok(())
        })();

        match result {
            Ok(()) => Ok(Some(Self { fd })),
            Err(err) => {
                // SAFETY: `fd` was returned by `libc::open` above and not
                // yet handed to anything else.
                unsafe {
                    libc::close(fd);
                }
                // Sandboxes that expose the node but deny the setup ioctls
                // (no CAP_SYS_ADMIN) are a skip, not a failure; anything
                // else is a genuine bug in the fixture.
                if matches!(err.raw_os_error(), Some(libc::EPERM) | Some(libc::EACCES)) {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Emits one key edge followed by a `SYN_REPORT`, as a real keyboard
    /// driver would.
    pub fn emit_key(&self, code: u16, value: i32) -> io::Result<()> {
        self.write_event(EV_KEY as u16, code, value)?;
        self.write_event(EV_SYN as u16, SYN_REPORT, 0)
    }

    /// Emits a relative-motion sample followed by a `SYN_REPORT`.
    pub fn emit_rel(&self, code: u16, value: i32) -> io::Result<()> {
        self.write_event(EV_REL as u16, code, value)?;
        self.write_event(EV_SYN as u16, SYN_REPORT, 0)
    }

    fn write_event(&self, kind: u16, code: u16, value: i32) -> io::Result<()> {
        // The kernel stamps `time` itself on delivery to `/dev/input/eventN`
        // readers; the value written here is ignored for uinput sources.
        let event: input_event = unsafe {
            let mut e: input_event = std::mem::zeroed();
            e.type_ = kind;
            e.code = code;
            e.value = value;
            e
        };
        let buf = &event as *const input_event as *const libc::c_void;
        let size = std::mem::size_of::<input_event>();
        // SAFETY: `buf` points to `size` readable, initialized bytes.
        let n = unsafe { libc::write(self.fd, buf, size) };
        if n as usize != size {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for UinputDevice {
    fn drop(&mut self) {
        // SAFETY: `fd` is owned exclusively by this fixture.
        unsafe {
            libc::ioctl(self.fd, ui_dev_destroy());
            libc::close(self.fd);
        }
    }
}

fn open_uinput() -> Option<RawFd> {
    let c_path = CString::new(UINPUT_PATH).expect("static path has no NUL");
    // SAFETY: `c_path` is NUL-terminated and valid for the call's duration.
    let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_WRONLY | libc::O_NONBLOCK) };
    if fd < 0 {
        None
    } else {
        Some(fd)
    }
}

fn set_evbit(fd: RawFd, bit: u32) -> io::Result<()> {
    checked_ioctl(fd, ui_set_evbit(), bit as libc::c_int)
}
fn set_keybit(fd: RawFd, bit: u32) -> io::Result<()> {
    checked_ioctl(fd, ui_set_keybit(), bit as libc::c_int)
}
fn set_relbit(fd: RawFd, bit: u32) -> io::Result<()> {
    checked_ioctl(fd, ui_set_relbit(), bit as libc::c_int)
}

fn checked_ioctl(fd: RawFd, request: libc::c_ulong, arg: libc::c_int) -> io::Result<()> {
    // SAFETY: `request` is one of the `UI_SET_*BIT` requests, which take a
    // plain `int` argument by value.
    let ret = unsafe { libc::ioctl(fd, request, arg) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn dev_setup(fd: RawFd, name: &str) -> io::Result<()> {
    let mut setup = UinputSetup {
        id: InputId { bustype: 0x06 /* BUS_VIRTUAL */, vendor: 0x1234, product: 0x5678, version: 1 },
        name: [0u8; UINPUT_MAX_NAME_SIZE],
        ff_effects_max: 0,
    };
    let bytes = name.as_bytes();
    let len = bytes.len().min(UINPUT_MAX_NAME_SIZE - 1);
    setup.name[..len].copy_from_slice(&bytes[..len]);

    let ptr = &mut setup as *mut UinputSetup as *mut libc::c_void;
    // SAFETY: `ptr` is a valid, fully-initialized `UinputSetup` for the
    // duration of the call.
    let ret = unsafe { libc::ioctl(fd, ui_dev_setup(), ptr) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn dev_create(fd: RawFd) -> io::Result<()> {
    // SAFETY: no argument beyond the request code itself.
    let ret = unsafe { libc::ioctl(fd, ui_dev_create()) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    // The kernel creates the `/dev/input/eventN` node asynchronously with
    // respect to this ioctl returning; give udev/devtmpfs a brief window
    // before the caller starts discovery against it.
    std::thread::sleep(Duration::from_millis(100));
    Ok(())
}

/// Polls `f` until it returns `true` or `timeout` elapses, sleeping briefly
/// between attempts. Used to wait out the engine's hotplug rescan window
/// without a fixed sleep.
pub fn wait_until(timeout: Duration, mut f: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if f() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}
