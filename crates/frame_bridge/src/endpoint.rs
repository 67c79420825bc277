//! Render endpoint
//!
//! Transport-agnostic handler for `GET /api/v1/render?sceneId=<n>`. A
//! [`RenderQuery`] goes in, a complete [`RenderResponse`] comes out; the HTTP
//! server only has to copy status, headers and body onto the wire.
//!
//! Status mapping:
//!
//! | Outcome | Status |
//! |---------|--------|
//! | PNG produced | 200 |
//! | `sceneId` missing or not a number | 404 |
//! | `sceneId` outside the cache | 400 |
//! | engine or encoder failure | 500 |
//! | cache shut down | 503 |

use std::sync::Arc;

use serde::Deserialize;

use crate::cache::RendererCache;
use crate::config::RenderConfig;
use crate::encode::{PngFrameEncoder, PNG_CONTENT_TYPE};
use crate::error::{BridgeError, BridgeResult, ErrorKind};
use crate::marshal::FrameMarshaller;
use crate::native::NativeRenderer;
use crate::scene::SceneId;

/// Content type of error bodies
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Query string of a render request
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RenderQuery {
    /// Raw `sceneId` value, unparsed
    #[serde(rename = "sceneId")]
    pub scene_id: Option<String>,
}

impl RenderQuery {
    /// Query carrying `value` as its `sceneId`
    pub fn with_scene(value: impl Into<String>) -> Self {
        Self {
            scene_id: Some(value.into()),
        }
    }
}

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// 200
    Ok,
    /// 400
    BadRequest,
    /// 404
    NotFound,
    /// 500
    InternalError,
    /// 503
    ServiceUnavailable,
}

impl RenderStatus {
    /// Numeric HTTP status code
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::InternalError => 500,
            Self::ServiceUnavailable => 503,
        }
    }

    const fn for_error(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Caller => Self::BadRequest,
            ErrorKind::NativeContract | ErrorKind::Encoding => Self::InternalError,
            ErrorKind::Unavailable => Self::ServiceUnavailable,
        }
    }
}

/// Fully formed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResponse {
    /// Status to send
    pub status: RenderStatus,
    /// Value of the `Content-Type` header
    pub content_type: &'static str,
    /// Body bytes
    pub body: Vec<u8>,
}

impl RenderResponse {
    fn png(body: Vec<u8>) -> Self {
        Self {
            status: RenderStatus::Ok,
            content_type: PNG_CONTENT_TYPE,
            body,
        }
    }

    fn text(status: RenderStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            content_type: TEXT_CONTENT_TYPE,
            body: message.into().into_bytes(),
        }
    }

    /// Value of the `Content-Length` header
    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    /// Headers to write, in order
    pub fn headers(&self) -> [(&'static str, String); 2] {
        [
            ("Content-Type", self.content_type.to_string()),
            ("Content-Length", self.content_length().to_string()),
        ]
    }

    /// Whether the body is a PNG image
    pub fn is_success(&self) -> bool {
        self.status == RenderStatus::Ok
    }
}

/// Scene id to PNG, end to end
pub struct RenderEndpoint<E: NativeRenderer + ?Sized> {
    cache: RendererCache<E>,
    marshaller: FrameMarshaller,
    encoder: PngFrameEncoder,
}

impl<E: NativeRenderer + ?Sized> RenderEndpoint<E> {
    /// Endpoint over `engine` with an empty cache
    pub fn new(engine: Arc<E>, config: &RenderConfig) -> Self {
        Self {
            cache: RendererCache::new(engine),
            marshaller: FrameMarshaller::from_config(config),
            encoder: PngFrameEncoder::from_config(config),
        }
    }

    /// The renderer cache
    pub const fn cache(&self) -> &RendererCache<E> {
        &self.cache
    }

    /// Serve one request
    ///
    /// Never panics on bad input or engine failure; every outcome becomes a
    /// status.
    pub fn handle(&self, query: &RenderQuery) -> RenderResponse {
        let Some(raw) = query.scene_id.as_deref().and_then(SceneId::parse_raw) else {
            log::warn!("Render request without a usable sceneId: {:?}", query.scene_id);
            return RenderResponse::text(RenderStatus::NotFound, "sceneId is required");
        };

        let result = SceneId::new(raw).and_then(|scene| self.render_scene(scene));
        match result {
            Ok(png) => {
                log::info!("Rendered scene {} ({} bytes)", raw, png.len());
                RenderResponse::png(png)
            }
            Err(err) => {
                match err.kind() {
                    ErrorKind::Caller => log::warn!("Rejected scene {}: {}", raw, err),
                    ErrorKind::Unavailable => log::warn!("Scene {} requested after shutdown", raw),
                    ErrorKind::NativeContract | ErrorKind::Encoding => {
                        log::error!("Failed to render scene {}: {}", raw, err);
                    }
                }
                err.into()
            }
        }
    }

    /// Render `scene` and return PNG bytes
    ///
    /// The renderer stays leased through render and marshal; encoding runs
    /// after it is handed back.
    pub fn render_scene(&self, scene: SceneId) -> BridgeResult<Vec<u8>> {
        let buffer = {
            let mut renderer = self.cache.get_or_create(scene)?;
            let frame = renderer.render()?;
            self.marshaller.marshal(frame)?
        };
        self.encoder.encode(&buffer)
    }

    /// Release every cached renderer; see [`RendererCache::shutdown`]
    pub fn shutdown(&self) -> usize {
        self.cache.shutdown()
    }
}

impl From<BridgeError> for RenderResponse {
    fn from(err: BridgeError) -> Self {
        Self::text(RenderStatus::for_error(err.kind()), err.to_string())
    }
}
