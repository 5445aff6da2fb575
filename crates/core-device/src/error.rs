use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to open device node {path:?}: {source}")]
    Open { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to query identity for {path:?}: {source}")]
    Identify { path: PathBuf, #[source] source: std::io::Error },

    #[error("device node name did not match the expected pattern: {0:?}")]
    UnrecognizedNodeName(PathBuf),
}
