//! RAII ownership of an open device file descriptor.

use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;

use crate::raw::input_event;

/// An open, non-blocking, close-on-exec device handle. Closed on drop,
/// mirroring the teacher's `CrosstermBackend`/`TerminalGuard` RAII shape
/// (enter/leave paired with an unconditional `Drop::drop` cleanup) applied
/// here to a file descriptor instead of terminal state.
#[derive(Debug)]
pub struct DeviceHandle {
    fd: RawFd,
}

impl DeviceHandle {
    /// Opens `path` read-only, non-blocking, close-on-exec.
    pub fn open(path: &Path) -> io::Result<Self> {
        let c_path = path_to_cstring(path)?;
        let flags = libc::O_RDONLY | libc::O_NONBLOCK | libc::O_CLOEXEC;
        // SAFETY: `c_path` is a valid NUL-terminated string for the duration
        // of this call.
        let fd = unsafe { libc::open(c_path.as_ptr(), flags) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { fd })
    }

    /// Issues an `EVIOCG*` identity/name/bitmask query. `request` must be one
    /// of the numbers in [`crate::raw`]. Returns the byte count the kernel
    /// reports having written into `buf` (the ioctl return value itself, for
    /// the variable-length `EVIOCGNAME`/`EVIOCGBIT` queries).
    ///
    /// # Safety
    ///
    /// `buf` must point to a region of at least `len` writable bytes and
    /// must be an appropriate target for the kernel's response to
    /// `request`.
    pub unsafe fn ioctl_read(&self, request: libc::c_ulong, buf: *mut libc::c_void, len: usize) -> io::Result<usize> {
        let _ = len;
        // SAFETY: delegated to caller per this function's contract.
        let ret = unsafe { libc::ioctl(self.fd, request, buf) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ret as usize)
    }

    /// Reads one raw `input_event` packet. Returns `Ok(None)` on
    /// `EWOULDBLOCK`/`EAGAIN` (the handle is non-blocking); any other error
    /// is propagated so the acquisition worker can decide whether the
    /// device's read loop should end for this wake (spec.md §7).
    pub fn read_event(&self) -> io::Result<Option<input_event>> {
        let mut event: input_event = unsafe { std::mem::zeroed() };
        let buf = &mut event as *mut input_event as *mut libc::c_void;
        let size = std::mem::size_of::<input_event>();
        // SAFETY: `buf` points to `size` writable bytes for the duration of
        // this call.
        let n = unsafe { libc::read(self.fd, buf, size) };
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EAGAIN) => Ok(None),
                _ => Err(err),
            };
        }
        if (n as usize) < size {
            // Short read: treat as would-block for this wake rather than
            // handing back a half-initialized packet.
            return Ok(None);
        }
        Ok(Some(event))
    }
}

impl AsRawFd for DeviceHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        // SAFETY: `fd` is owned exclusively by this handle and not closed
        // elsewhere.
        unsafe {
            libc::close(self.fd);
        }
    }
}

fn path_to_cstring(path: &Path) -> io::Result<std::ffi::CString> {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains a NUL byte"))
}
