use std::sync::Arc;

use crate::foundation::core::{Affine, Rgba8};
use crate::scene::resources::{PreparedImage, PreparedSvg, PreparedText};

/// Polished snapshot of a scene, ready to be synchronized into the renderer.
///
/// Built on the thread that owns the scene and handed to the render worker by value. Heavy
/// resources are shared through `Arc`, so building one is cheap.
#[derive(Clone, Debug)]
pub struct SceneGraph {
    /// Logical width (before device pixel ratio).
    pub width: u32,
    /// Logical height (before device pixel ratio).
    pub height: u32,
    /// Clear color of the render target.
    pub background: Rgba8,
    /// Draw list in paint order.
    pub nodes: Vec<DrawNode>,
}

/// One visible item in world space.
#[derive(Clone, Debug)]
pub struct DrawNode {
    /// Item-local to scene transform.
    pub transform: Affine,
    /// Accumulated opacity in `[0, 1]`.
    pub opacity: f32,
    /// Item width in item-local units.
    pub width: f64,
    /// Item height in item-local units.
    pub height: f64,
    /// What to draw in the `(0, 0, width, height)` box.
    pub paint: DrawPaint,
}

/// Content of a [`DrawNode`].
#[derive(Clone, Debug)]
pub enum DrawPaint {
    /// Solid (optionally rounded) rectangle.
    Rect {
        /// Straight-alpha fill color.
        color: Rgba8,
        /// Corner radius.
        radius: f64,
    },
    /// Shaped text.
    Text {
        /// Layout and font.
        text: Arc<PreparedText>,
        /// Straight-alpha glyph color.
        color: Rgba8,
    },
    /// Raster image stretched to the box.
    Image(Arc<PreparedImage>),
    /// SVG document stretched to the box.
    Svg(Arc<PreparedSvg>),
}

impl SceneGraph {
    /// An empty graph with a transparent background.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: Rgba8::TRANSPARENT,
            nodes: Vec::new(),
        }
    }
}
