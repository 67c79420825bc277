//! # Frame Bridge
//!
//! Serves images from a native scene renderer over HTTP.
//!
//! A request names a scene. The bridge finds (or lazily creates) that scene's
//! renderer, runs one render pass, copies the frame out of the engine, encodes
//! it as PNG and releases the frame. Renderers are kept for the life of the
//! process and released together at shutdown.
//!
//! ## Pipeline
//!
//! ```text
//! SceneId -> RendererCache -> NativeRenderer::render -> FrameMarshaller -> PngFrameEncoder
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use frame_bridge::prelude::*;
//!
//! let engine = Arc::new(SoftwareEngine::default());
//! let endpoint = RenderEndpoint::new(engine, &RenderConfig::default());
//!
//! let response = endpoint.handle(&RenderQuery::with_scene("2"));
//! assert_eq!(response.status.code(), 200);
//!
//! endpoint.shutdown();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod cache;
pub mod config;
pub mod encode;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod marshal;
pub mod native;
pub mod pixels;
pub mod scene;

pub use cache::{RendererCache, RendererLease};
pub use config::{Config, ConfigError, RenderConfig};
pub use encode::{PngCompression, PngFrameEncoder, PNG_CONTENT_TYPE};
pub use endpoint::{RenderEndpoint, RenderQuery, RenderResponse, RenderStatus};
pub use error::{BridgeError, BridgeResult, ErrorKind};
pub use marshal::{FrameMarshaller, TransferStrategy};
pub use native::{NativeError, NativeRenderer, RawHandle};
pub use pixels::PixelBuffer;
pub use scene::{SceneId, CACHE_CAPACITY};

/// Common imports for bridge users
pub mod prelude {
    pub use crate::{
        native::{FrameHandle, RendererHandle, SoftwareEngine},
        BridgeError, Config, FrameMarshaller, NativeRenderer, PixelBuffer, PngFrameEncoder,
        RenderConfig, RenderEndpoint, RenderQuery, RenderResponse, RenderStatus, RendererCache,
        SceneId,
    };
}
