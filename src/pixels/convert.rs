//! Pixel layout conversions between the render target and host formats.
use crate::foundation::core::PixelFormat;
use crate::foundation::error::OffsceneResult;
use crate::pixels::Image;

/// Premultiply straight RGBA8 in place, rounding to nearest.
pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Undo premultiplication in place. Fully transparent pixels become `0,0,0,0`.
pub fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        match a {
            0 => {
                px[0] = 0;
                px[1] = 0;
                px[2] = 0;
            }
            255 => {}
            _ => {
                for c in &mut px[..3] {
                    *c = ((*c as u16 * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
    }
}

/// Build an [`Image`] in `format` from premultiplied RGBA8 bytes.
pub fn from_premul_rgba8(
    premul: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> OffsceneResult<Image> {
    let mut data = premul.to_vec();
    match format {
        PixelFormat::Rgba8Premul => {}
        PixelFormat::Rgba8 => unpremultiply_rgba8_in_place(&mut data),
        PixelFormat::Bgra8 => {
            unpremultiply_rgba8_in_place(&mut data);
            for px in data.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }
    }
    Image::new(width, height, format, data)
}

/// Straight-alpha RGBA8 bytes of an image in any supported layout.
pub fn to_straight_rgba8(image: &Image) -> Vec<u8> {
    let mut data = image.data.clone();
    match image.format {
        PixelFormat::Rgba8Premul => unpremultiply_rgba8_in_place(&mut data),
        PixelFormat::Rgba8 => {}
        PixelFormat::Bgra8 => {
            for px in data.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }
    }
    data
}

/// Drop the alpha channel of straight RGBA8 bytes.
pub fn rgba8_to_rgb8(rgba: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        out.extend_from_slice(&px[..3]);
    }
    out
}

/// Alpha plane of RGBA8 bytes, one byte per pixel.
pub fn extract_alpha(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4).map(|px| px[3]).collect()
}

#[cfg(test)]
#[path = "../../tests/unit/pixels/convert.rs"]
mod tests;
