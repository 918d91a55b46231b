use crate::foundation::core::{PixelFormat, Size};
use crate::foundation::error::{OffsceneError, OffsceneResult};
use crate::pixels::Image;
use crate::pixels::convert::from_premul_rgba8;

/// Offscreen pixel buffer the renderer draws into. Owned by the render worker only.
///
/// The target refuses to be read back unless a draw completed since it was allocated or last
/// read, so a stale or blank buffer is never returned as a frame.
pub(crate) struct RenderTarget {
    size: Size,
    pixmap: vello_cpu::Pixmap,
    drawn: bool,
}

impl RenderTarget {
    /// Allocate a target of `size` physical pixels.
    pub(crate) fn new(size: Size) -> OffsceneResult<Self> {
        let (w, h) = dims_u16(size)?;
        Ok(Self {
            size,
            pixmap: vello_cpu::Pixmap::new(w, h),
            drawn: false,
        })
    }

    /// Reuse `slot` when it already has `size`, otherwise (re)allocate it.
    ///
    /// Returns `true` when a new target was allocated.
    pub(crate) fn ensure(slot: &mut Option<Self>, size: Size) -> OffsceneResult<bool> {
        if slot.as_ref().is_some_and(|t| t.size == size) {
            return Ok(false);
        }
        let old = slot.as_ref().map(|t| t.size);
        *slot = Some(Self::new(size)?);
        tracing::debug!(
            ?old,
            width = size.width,
            height = size.height,
            "render target allocated"
        );
        Ok(true)
    }

    pub(crate) fn size(&self) -> Size {
        self.size
    }

    pub(crate) fn dims_u16(&self) -> (u16, u16) {
        (self.pixmap.width(), self.pixmap.height())
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut vello_cpu::Pixmap {
        &mut self.pixmap
    }

    pub(crate) fn mark_drawn(&mut self) {
        self.drawn = true;
    }

    /// Copy the drawn pixels out in `format` at `output` size.
    ///
    /// A target drawn at a device pixel ratio other than 1 is resampled down (or up) to
    /// `output`, so callers always get the size they asked for.
    pub(crate) fn read_back(
        &mut self,
        format: PixelFormat,
        output: Size,
    ) -> OffsceneResult<Image> {
        if !self.drawn {
            return Err(OffsceneError::render(
                "render target read back before a draw completed",
            ));
        }
        self.drawn = false;
        let premul = self.pixmap.data_as_u8_slice();
        if output == self.size {
            return from_premul_rgba8(premul, output.width, output.height, format);
        }
        let resampled = resample_premul(premul, self.size, output)?;
        from_premul_rgba8(&resampled, output.width, output.height, format)
    }
}

// Both buffers are premultiplied RGBA8.
fn resample_premul(premul: &[u8], from: Size, to: Size) -> OffsceneResult<Vec<u8>> {
    let src = image::RgbaImage::from_raw(from.width, from.height, premul.to_vec())
        .ok_or_else(|| OffsceneError::render("render target buffer does not match its size"))?;
    let out = image::imageops::resize(
        &src,
        to.width,
        to.height,
        image::imageops::FilterType::Triangle,
    );
    tracing::trace!(?from, ?to, "render target resampled");
    Ok(out.into_raw())
}

fn dims_u16(size: Size) -> OffsceneResult<(u16, u16)> {
    if size.is_empty() {
        return Err(OffsceneError::validation(format!(
            "render target must be non-empty, got {}x{}",
            size.width, size.height
        )));
    }
    let w: u16 = size
        .width
        .try_into()
        .map_err(|_| OffsceneError::validation("render target width exceeds u16"))?;
    let h: u16 = size
        .height
        .try_into()
        .map_err(|_| OffsceneError::validation("render target height exceeds u16"))?;
    Ok((w, h))
}

#[cfg(test)]
#[path = "../../tests/unit/render/target.rs"]
mod tests;
