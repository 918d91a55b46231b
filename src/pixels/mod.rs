//! CPU-side images produced by read-back.
pub(crate) mod convert;

use crate::foundation::core::{PixelFormat, Size};
use crate::foundation::error::{OffsceneError, OffsceneResult};

/// A read-back frame: tightly packed, row-major, 4 bytes per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channel layout of `data`.
    pub format: PixelFormat,
    /// Pixel bytes.
    pub data: Vec<u8>,
}

impl Image {
    /// Wrap pixel bytes, checking the length against the dimensions.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> OffsceneResult<Self> {
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(format.bytes_per_pixel());
        if data.len() != expected {
            return Err(OffsceneError::validation(format!(
                "image byte len mismatch: {} != {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Dimensions as a [`Size`].
    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    /// Return `true` when the image holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The 4 channel bytes at `(x, y)`, in the image's own layout.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}
