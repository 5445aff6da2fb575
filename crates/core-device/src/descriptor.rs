//! Device node identification and the stable-id derivation rule.

use std::path::{Path, PathBuf};

use crate::error::DeviceError;
use crate::handle::DeviceHandle;
use crate::info::DeviceInfo;
use crate::raw::{self, InputId};

const NAME_BUF_LEN: usize = 256;

/// An open, identified input device. Owns its [`DeviceHandle`]; dropping a
/// `DeviceDescriptor` closes the underlying fd.
#[derive(Debug)]
pub struct DeviceDescriptor {
    pub stable_id: u32,
    pub path: PathBuf,
    pub name: String,
    pub bus_type: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
    pub handle: DeviceHandle,
}

impl DeviceDescriptor {
    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            stable_id: self.stable_id,
            path: self.path.clone(),
            name: self.name.clone(),
            bus_type: self.bus_type,
            vendor: self.vendor,
            product: self.product,
            version: self.version,
        }
    }
}

/// Derives the stable id of a device from its OS node name (spec.md §3:
/// "derived from the OS node name"). `/dev/input/event7` -> `7`.
///
/// Returns `None` for names that do not match the expected
/// `eventN` pattern.
pub fn stable_id_from_path(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    let digits = name.strip_prefix("event")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Opens `path` non-blocking/close-on-exec and queries its identity via
/// `EVIOCGID`/`EVIOCGNAME`. Failures here are expected to be routine
/// (device-manager permission races) and are surfaced as `DeviceError` for
/// the caller to silently discard, per spec.md §7.
pub fn open_and_identify(path: &Path) -> Result<DeviceDescriptor, DeviceError> {
    let stable_id = stable_id_from_path(path).ok_or_else(|| DeviceError::UnrecognizedNodeName(path.to_path_buf()))?;

    let handle = DeviceHandle::open(path).map_err(|source| DeviceError::Open { path: path.to_path_buf(), source })?;

    let mut id = InputId::default();
    // SAFETY: `id` is a valid `InputId`-sized buffer for the duration of
    // the call.
    unsafe {
        handle
            .ioctl_read(raw::eviocgid(), &mut id as *mut InputId as *mut libc::c_void, std::mem::size_of::<InputId>())
            .map_err(|source| DeviceError::Identify { path: path.to_path_buf(), source })?;
    }

    let mut name_buf = [0u8; NAME_BUF_LEN];
    // SAFETY: `name_buf` is `NAME_BUF_LEN` writable bytes for the duration
    // of the call; the kernel NUL-terminates within that bound.
    let name_len = unsafe {
        handle
            .ioctl_read(raw::eviocgname(NAME_BUF_LEN), name_buf.as_mut_ptr() as *mut libc::c_void, NAME_BUF_LEN)
            .unwrap_or(0)
    };
    let name = String::from_utf8_lossy(&name_buf[..name_len.min(NAME_BUF_LEN)])
        .trim_end_matches('\0')
        .to_string();

    Ok(DeviceDescriptor {
        stable_id,
        path: path.to_path_buf(),
        name,
        bus_type: id.bustype,
        vendor: id.vendor,
        product: id.product,
        version: id.version,
        handle,
    })
}
