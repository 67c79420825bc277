//! Native renderer interface
//!
//! The rendering engine lives on the far side of a foreign-function boundary
//! and is only reachable through the handful of calls in [`NativeRenderer`].
//! Every value it hands back is an opaque [`RawHandle`]; ownership of those
//! tokens is tracked by the guards in [`handle`].
//!
//! ## Implementations
//!
//! - [`SoftwareEngine`]: in-process procedural scenes, used by default
//! - [`StubEngine`]: scripted engine that counts calls and injects failures
//! - `FfiEngine`: links the native `rendering` library (feature `native-ffi`)

pub mod handle;
pub mod software;
pub mod stub;

#[cfg(feature = "native-ffi")]
pub mod ffi;

use std::fmt;
use std::num::NonZeroUsize;

use thiserror::Error;

use crate::scene::SceneId;

pub use handle::{FrameHandle, RendererHandle};
pub use software::SoftwareEngine;
pub use stub::{StubEngine, StubFrame};

#[cfg(feature = "native-ffi")]
pub use ffi::FfiEngine;

/// Raw, non-null token returned by the engine
///
/// Copying a `RawHandle` does not copy the resource behind it. Only the guard
/// that wraps it may release it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonZeroUsize);

impl RawHandle {
    /// Wrap a non-zero token
    pub const fn new(token: NonZeroUsize) -> Self {
        Self(token)
    }

    /// Wrap a raw address, rejecting null
    pub const fn from_addr(addr: usize) -> Option<Self> {
        match NonZeroUsize::new(addr) {
            Some(token) => Some(Self(token)),
            None => None,
        }
    }

    /// The token as an address
    pub const fn addr(self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}

/// What a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    /// Long-lived per-scene render context
    Renderer,
    /// Result of one render pass
    Frame,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Renderer => f.write_str("renderer"),
            Self::Frame => f.write_str("frame"),
        }
    }
}

/// One colour component of an RGBA pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Channel {
    /// Red, index 0
    Red = 0,
    /// Green, index 1
    Green = 1,
    /// Blue, index 2
    Blue = 2,
    /// Alpha, index 3
    Alpha = 3,
}

impl Channel {
    /// All channels in byte order
    pub const RGBA: [Self; 4] = [Self::Red, Self::Green, Self::Blue, Self::Alpha];

    /// Channel index as passed across the boundary
    pub const fn index(self) -> u32 {
        self as u32
    }
}

/// Failures reported by (or detected at) the native boundary
#[derive(Debug, Error)]
pub enum NativeError {
    /// A create or render call returned null
    #[error("engine returned a null {0} handle")]
    NullHandle(HandleKind),

    /// The engine could not create a renderer for this scene
    #[error("renderer creation failed for scene {scene}: {reason}")]
    CreateFailed {
        /// Scene being created
        scene: SceneId,
        /// Engine-supplied reason
        reason: String,
    },

    /// The render pass failed
    #[error("render pass failed: {0}")]
    RenderFailed(String),

    /// A channel query was rejected
    #[error("channel query failed at ({x}, {y}) channel {channel:?}: {reason}")]
    ChannelQuery {
        /// Column
        x: u32,
        /// Row
        y: u32,
        /// Channel requested
        channel: Channel,
        /// Engine-supplied reason
        reason: String,
    },

    /// A handle the engine does not recognise
    #[error("unknown {kind} handle {handle}")]
    UnknownHandle {
        /// Expected kind
        kind: HandleKind,
        /// Offending token
        handle: RawHandle,
    },
}

/// The capability set exposed by a native rendering engine
///
/// Implementations must be callable from several threads at once, but callers
/// never issue concurrent calls against the same renderer handle.
pub trait NativeRenderer: Send + Sync {
    /// Allocate a render context for `scene`
    fn create_renderer(&self, scene: SceneId) -> Result<RawHandle, NativeError>;

    /// Run one render pass and return the resulting frame
    fn render(&self, renderer: RawHandle) -> Result<RawHandle, NativeError>;

    /// Frame width in pixels
    fn frame_width(&self, frame: RawHandle) -> u32;

    /// Frame height in pixels
    fn frame_height(&self, frame: RawHandle) -> u32;

    /// Value of one channel of one pixel
    fn frame_channel(
        &self,
        frame: RawHandle,
        x: u32,
        y: u32,
        channel: Channel,
    ) -> Result<u8, NativeError>;

    /// Copy the whole frame as row-major RGBA8 into `dst`
    ///
    /// `dst` is exactly `width * height * 4` bytes. Returns `Ok(false)` when
    /// the engine has no bulk accessor, in which case `dst` is untouched.
    fn copy_frame(&self, frame: RawHandle, dst: &mut [u8]) -> Result<bool, NativeError> {
        let _ = (frame, dst);
        Ok(false)
    }

    /// Release a renderer or frame handle
    fn release(&self, handle: RawHandle);
}
