//! The view of a candidate device handed to the caller-installed filter.

use std::path::PathBuf;
use std::sync::Arc;

/// Descriptor fields plus the originating OS path, passed to the
/// acceptance predicate during discovery and re-evaluation (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub stable_id: u32,
    pub path: PathBuf,
    pub name: String,
    pub bus_type: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

/// A caller-installed acceptance predicate. Rust closures capture their own
/// context directly, so there is no separate opaque-context pointer the way
/// a C ABI would need one — the predicate itself is already `'static` and
/// thread-safe.
pub type Filter = Arc<dyn Fn(&DeviceInfo) -> bool + Send + Sync>;
