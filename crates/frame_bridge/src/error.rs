//! Error taxonomy for the render path
//!
//! Every failure on the way from a scene id to PNG bytes is a [`BridgeError`].
//! [`BridgeError::kind`] sorts them into the four classes the endpoint maps to
//! HTTP statuses.

use thiserror::Error;

use crate::native::NativeError;

/// Result alias used across the crate
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors produced while serving a render request
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Scene id does not fit in the renderer cache
    #[error("scene id {scene} is outside the renderer cache (capacity {capacity})")]
    SceneOutOfRange {
        /// Requested id
        scene: u64,
        /// Number of cache slots
        capacity: usize,
    },

    /// The engine reported frame dimensions the marshaller refuses to copy
    #[error("native frame has invalid dimensions {width}x{height} (limit {limit} per side)")]
    InvalidDimensions {
        /// Reported width
        width: u32,
        /// Reported height
        height: u32,
        /// Largest accepted side
        limit: u32,
    },

    /// The engine broke its side of the contract
    #[error("native engine error: {0}")]
    Native(#[from] NativeError),

    /// PNG encoding failed
    #[error("PNG encoding failed: {0}")]
    Encoding(#[from] image::ImageError),

    /// The cache has released its renderers and accepts no more work
    #[error("renderer cache has been shut down")]
    ShutDown,
}

/// Coarse classification of a [`BridgeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input from the client
    Caller,
    /// Null handles, bad dimensions, failed native calls
    NativeContract,
    /// Encoder rejected the buffer
    Encoding,
    /// Shutdown in progress or complete
    Unavailable,
}

impl BridgeError {
    /// Classify this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SceneOutOfRange { .. } => ErrorKind::Caller,
            Self::InvalidDimensions { .. } | Self::Native(_) => ErrorKind::NativeContract,
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::ShutDown => ErrorKind::Unavailable,
        }
    }
}
