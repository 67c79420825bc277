//! Owned pixel buffers
//!
//! A [`PixelBuffer`] is what survives a render call: plain RGBA8 bytes with no
//! tie to the engine that produced them.

/// Bytes per RGBA8 pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Row-major RGBA8 image owned by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Raw RGBA pixel data
    data: Vec<u8>,
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
}

impl PixelBuffer {
    /// Zero-filled buffer, or `None` if the byte size overflows
    pub fn zeroed(width: u32, height: u32) -> Option<Self> {
        let len = Self::byte_len(width, height)?;
        Some(Self {
            data: vec![0; len],
            width,
            height,
        })
    }

    /// Wrap existing bytes; `None` unless `data` is exactly `width * height * 4`
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (Self::byte_len(width, height)? == data.len()).then_some(Self { data, width, height })
    }

    /// Buffer filled with one colour (handy for tests and placeholders)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = width as usize * height as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
        }
    }

    /// Byte length of a `width` x `height` RGBA8 image
    pub fn byte_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(BYTES_PER_PIXEL)
    }

    /// Width in pixels
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Whole buffer, row-major RGBA8
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable view, for filling in place
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Give up the bytes
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL)
    }

    /// RGBA at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let offset = self.offset(x, y)?;
        let mut rgba = [0; 4];
        rgba.copy_from_slice(&self.data[offset..offset + BYTES_PER_PIXEL]);
        Some(rgba)
    }

    /// Overwrite the pixel at `(x, y)`; returns `false` when out of bounds
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) -> bool {
        match self.offset(x, y) {
            Some(offset) => {
                self.data[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&rgba);
                true
            }
            None => false,
        }
    }

    /// Size of the pixel data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}
