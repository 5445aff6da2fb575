//! The error-kind taxonomy surfaced to callers (spec.md §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("engine is not initialized")]
    NotInitialized,

    #[error("system error while {operation}: {source}")]
    System {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("keymap build failed: {0}")]
    KeymapBuild(#[from] core_keymap::KeymapError),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}
