//! Error types for the fabric controller

use crate::DatapathId;
use thiserror::Error;

/// Fabric error type
#[derive(Error, Debug)]
pub enum FabricError {
    /// Frame too short or otherwise unparseable
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Event payload missing or inconsistent fields
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// Event refers to a switch that is not registered
    #[error("unknown switch: {0}")]
    UnknownSwitch(DatapathId),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the fabric controller
pub type FabricResult<T> = Result<T, FabricError>;
