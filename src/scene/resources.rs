//! Resources a scene references: raster images, SVG documents, and shaped text.
//!
//! Everything here is prepared once at load time and shared read-only (through `Arc`) between
//! the calling thread and the render worker.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::{OffsceneError, OffsceneResult};
use crate::pixels::convert::premultiply_rgba8_in_place;

/// Decoded raster image, ready to be used as a paint.
#[derive(Clone)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    pub(crate) paint: vello_cpu::Image,
}

impl std::fmt::Debug for PreparedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Parsed SVG document.
pub struct PreparedSvg {
    pub(crate) tree: usvg::Tree,
}

impl std::fmt::Debug for PreparedSvg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (w, h) = self.size();
        f.debug_struct("PreparedSvg")
            .field("width", &w)
            .field("height", &h)
            .finish_non_exhaustive()
    }
}

impl PreparedSvg {
    /// Intrinsic `(width, height)` of the document.
    pub fn size(&self) -> (f64, f64) {
        let s = self.tree.size();
        (f64::from(s.width()), f64::from(s.height()))
    }
}

/// Shaped text plus the font used to draw its glyphs.
pub struct PreparedText {
    pub(crate) layout: parley::Layout<()>,
    pub(crate) font: vello_cpu::peniko::FontData,
    /// Family name registered from the font file.
    pub family: String,
}

impl PreparedText {
    /// Laid-out `(width, height)` in pixels.
    pub fn size(&self) -> (f64, f64) {
        (
            f64::from(self.layout.width()),
            f64::from(self.layout.height()),
        )
    }
}

impl std::fmt::Debug for PreparedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedText")
            .field("family", &self.family)
            .field("width", &self.layout.width())
            .field("height", &self.layout.height())
            .finish()
    }
}

/// Resolve a resource reference against the document directory.
///
/// Accepts plain relative or absolute paths and `file://` URLs.
pub fn resolve_resource_path(base_dir: &Path, reference: &str) -> OffsceneResult<PathBuf> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(OffsceneError::scene_load("resource path must be non-empty"));
    }
    let path = Path::new(trimmed.strip_prefix("file://").unwrap_or(trimmed));
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(base_dir.join(path))
    }
}

fn read_resource(base_dir: &Path, reference: &str) -> OffsceneResult<Vec<u8>> {
    let path = resolve_resource_path(base_dir, reference)?;
    std::fs::read(&path).map_err(|e| {
        OffsceneError::scene_load(format!("failed to read resource '{}': {e}", path.display()))
    })
}

/// Decode an image file into premultiplied pixels.
pub fn load_image(base_dir: &Path, reference: &str) -> OffsceneResult<PreparedImage> {
    let bytes = read_resource(base_dir, reference)?;
    decode_image(&bytes).map_err(|e| {
        OffsceneError::scene_load(format!("failed to decode image '{reference}': {e}"))
    })
}

/// Decode encoded image bytes (PNG, JPEG, ...) into premultiplied pixels.
pub fn decode_image(bytes: &[u8]) -> OffsceneResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    let pixmap = pixmap_from_premul_bytes(&rgba8_premul, width, height)?;
    Ok(PreparedImage {
        width,
        height,
        paint: image_paint(pixmap),
    })
}

/// Parse an SVG file; its own relative references resolve against the document directory.
pub fn load_svg(base_dir: &Path, reference: &str) -> OffsceneResult<PreparedSvg> {
    let bytes = read_resource(base_dir, reference)?;
    let opts = usvg::Options {
        resources_dir: Some(base_dir.to_path_buf()),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_data(&bytes, &opts)
        .map_err(|e| OffsceneError::scene_load(format!("failed to parse svg '{reference}': {e}")))?;
    Ok(PreparedSvg { tree })
}

/// Shapes text with fonts loaded from files only; system fonts are never consulted, so output
/// does not depend on the machine.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Construct a new layout engine with fresh Parley contexts.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Load the font file and shape `text` with it.
    pub fn prepare(
        &mut self,
        base_dir: &Path,
        text: &str,
        font: &str,
        size_px: f64,
        max_width_px: Option<f64>,
    ) -> OffsceneResult<PreparedText> {
        let font_bytes = read_resource(base_dir, font)?;
        self.layout_plain(text, font_bytes, size_px as f32, max_width_px.map(|w| w as f32))
            .map_err(|e| OffsceneError::scene_load(format!("failed to lay out text with font '{font}': {e}")))
    }

    /// Shape and lay out plain text using the given font bytes.
    pub fn layout_plain(
        &mut self,
        text: &str,
        font_bytes: Vec<u8>,
        size_px: f32,
        max_width_px: Option<f32>,
    ) -> OffsceneResult<PreparedText> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(OffsceneError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            OffsceneError::validation("no font families registered from font bytes")
        })?;

        let family = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| OffsceneError::validation("registered font family has no name"))?
            .to_string();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));

        let mut layout: parley::Layout<()> = builder.build(text);
        if let Some(w) = max_width_px {
            layout.break_all_lines(Some(w));
            layout.align(
                Some(w),
                parley::Alignment::Start,
                parley::AlignmentOptions::default(),
            );
        } else {
            layout.break_all_lines(None);
        }

        let font = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes), 0);
        Ok(PreparedText {
            layout,
            font,
            family,
        })
    }
}

pub(crate) fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> OffsceneResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| OffsceneError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| OffsceneError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(OffsceneError::render("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

pub(crate) fn image_paint(pixmap: vello_cpu::Pixmap) -> vello_cpu::Image {
    vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/resources.rs"]
mod tests;
