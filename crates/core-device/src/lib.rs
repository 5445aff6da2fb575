//! Device identification, raw evdev wire format, and the open-device
//! registry (spec.md §3, §4.2, §4.4).

pub mod descriptor;
pub mod error;
pub mod handle;
pub mod info;
pub mod raw;
pub mod registry;

pub use descriptor::{open_and_identify, stable_id_from_path, DeviceDescriptor};
pub use error::DeviceError;
pub use handle::DeviceHandle;
pub use info::{DeviceInfo, Filter};
pub use raw::{input_event, InputId};
pub use registry::{DeviceRegistry, RegistryFullError};
