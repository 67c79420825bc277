//! PNG encoding of marshalled frames

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use serde::{Deserialize, Serialize};

use crate::config::RenderConfig;
use crate::error::BridgeResult;
use crate::pixels::PixelBuffer;

/// MIME type of everything this module produces
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// PNG compression level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PngCompression {
    /// Fastest, largest output
    Fast,
    /// Encoder default
    #[default]
    Default,
    /// Slowest, smallest output
    Best,
}

impl From<PngCompression> for CompressionType {
    fn from(level: PngCompression) -> Self {
        match level {
            PngCompression::Fast => Self::Fast,
            PngCompression::Default => Self::Default,
            PngCompression::Best => Self::Best,
        }
    }
}

/// Lossless RGBA8 PNG encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct PngFrameEncoder {
    compression: PngCompression,
}

impl PngFrameEncoder {
    /// Encoder at the given compression level
    pub const fn new(compression: PngCompression) -> Self {
        Self { compression }
    }

    /// Encoder configured from [`RenderConfig`]
    pub const fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.compression)
    }

    /// Encode `buffer` as PNG
    ///
    /// Output is deterministic for a given buffer and compression level.
    pub fn encode(&self, buffer: &PixelBuffer) -> BridgeResult<Vec<u8>> {
        let mut out = Vec::with_capacity(buffer.size_bytes() / 2);
        let encoder =
            PngEncoder::new_with_quality(&mut out, self.compression.into(), FilterType::Adaptive);
        encoder.write_image(
            buffer.as_bytes(),
            buffer.width(),
            buffer.height(),
            ExtendedColorType::Rgba8,
        )?;
        log::trace!(
            "Encoded {}x{} frame into {} PNG bytes",
            buffer.width(),
            buffer.height(),
            out.len()
        );
        Ok(out)
    }
}
