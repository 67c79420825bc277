//! Frame marshalling
//!
//! Copies a native frame into an owned [`PixelBuffer`], one channel query per
//! channel per pixel unless the engine offers (and the configuration allows) a
//! bulk copy. The frame handle is consumed, so it is released exactly once on
//! every path out of [`FrameMarshaller::marshal`], including errors.

use serde::{Deserialize, Serialize};

use crate::config::{RenderConfig, DEFAULT_MAX_FRAME_DIMENSION};
use crate::error::{BridgeError, BridgeResult};
use crate::native::{Channel, FrameHandle, NativeRenderer};
use crate::pixels::{PixelBuffer, BYTES_PER_PIXEL};

/// How pixel data crosses the native boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferStrategy {
    /// `frame_channel` for every channel of every pixel
    #[default]
    PerChannel,
    /// Try `copy_frame` first, fall back to per-channel queries
    PreferBulk,
}

/// Turns native frames into owned buffers
#[derive(Debug, Clone, Copy)]
pub struct FrameMarshaller {
    strategy: TransferStrategy,
    max_dimension: u32,
}

impl FrameMarshaller {
    /// Marshaller with an explicit strategy and per-side limit
    pub const fn new(strategy: TransferStrategy, max_dimension: u32) -> Self {
        Self {
            strategy,
            max_dimension,
        }
    }

    /// Marshaller configured from [`RenderConfig`]
    pub const fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.transfer, config.max_frame_dimension)
    }

    /// Strategy in use
    pub const fn strategy(&self) -> TransferStrategy {
        self.strategy
    }

    /// Copy `frame` into a new buffer and release it
    pub fn marshal<E: NativeRenderer + ?Sized>(
        &self,
        frame: FrameHandle<'_, E>,
    ) -> BridgeResult<PixelBuffer> {
        let width = frame.width();
        let height = frame.height();
        let mut buffer = self.allocate(width, height)?;

        if self.strategy == TransferStrategy::PreferBulk && frame.copy_into(buffer.as_bytes_mut())? {
            log::trace!("Bulk-copied frame {} ({}x{})", frame.raw(), width, height);
            return Ok(buffer);
        }

        let row_len = width as usize * BYTES_PER_PIXEL;
        let rows = buffer.as_bytes_mut().chunks_exact_mut(row_len);
        for (y, row) in (0..height).zip(rows) {
            for (x, pixel) in (0..width).zip(row.chunks_exact_mut(BYTES_PER_PIXEL)) {
                for channel in Channel::RGBA {
                    pixel[channel.index() as usize] = frame.channel(x, y, channel)?;
                }
            }
        }

        log::trace!("Marshalled frame {} ({}x{}) per channel", frame.raw(), width, height);
        Ok(buffer)
    }

    fn allocate(&self, width: u32, height: u32) -> BridgeResult<PixelBuffer> {
        let invalid = || BridgeError::InvalidDimensions {
            width,
            height,
            limit: self.max_dimension,
        };
        if width == 0 || height == 0 || width > self.max_dimension || height > self.max_dimension {
            return Err(invalid());
        }
        PixelBuffer::zeroed(width, height).ok_or_else(invalid)
    }
}

impl Default for FrameMarshaller {
    fn default() -> Self {
        Self::new(TransferStrategy::PerChannel, DEFAULT_MAX_FRAME_DIMENSION)
    }
}
