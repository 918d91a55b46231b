use std::collections::HashMap;
use std::sync::Arc;

use crate::foundation::core::{Affine, Rgba8};
use crate::foundation::error::{OffsceneError, OffsceneResult};
use crate::render::context::GraphicsContext;
use crate::render::target::RenderTarget;
use crate::scene::graph::{DrawNode, DrawPaint, SceneGraph};
use crate::scene::resources::{PreparedSvg, image_paint, pixmap_from_premul_bytes};

/// SVG rasters kept before the cache is dropped wholesale.
const SVG_CACHE_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct SvgRasterKey {
    svg: usize,
    w: u32,
    h: u32,
}

/// Draws synchronized [`SceneGraph`] snapshots into a [`RenderTarget`] with `vello_cpu`.
///
/// Lives on the render worker. `sync` replaces the retained graph, `render` draws whatever was
/// last synchronized.
pub(crate) struct SceneRenderer {
    initialized: bool,
    graph: Option<SceneGraph>,
    ctx: Option<vello_cpu::RenderContext>,
    svg_cache: HashMap<SvgRasterKey, (Arc<PreparedSvg>, vello_cpu::Image)>,
}

impl SceneRenderer {
    pub(crate) fn new() -> Self {
        Self {
            initialized: false,
            graph: None,
            ctx: None,
            svg_cache: HashMap::new(),
        }
    }

    /// Bind the renderer to `context`, which must be current on this thread.
    pub(crate) fn initialize(&mut self, context: &dyn GraphicsContext) -> OffsceneResult<()> {
        if !context.is_current() {
            return Err(OffsceneError::context_acquire(
                "renderer initialized without a current context",
            ));
        }
        self.initialized = true;
        Ok(())
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Replace the retained scene with a freshly polished snapshot.
    pub(crate) fn sync(&mut self, graph: SceneGraph) {
        self.graph = Some(graph);
    }

    /// Drop every cached resource and require a new `initialize`.
    pub(crate) fn invalidate(&mut self) {
        self.initialized = false;
        self.graph = None;
        self.ctx = None;
        self.svg_cache.clear();
    }

    /// Draw the synchronized scene into `target`, scaled by `dpr`.
    pub(crate) fn render(&mut self, target: &mut RenderTarget, dpr: f64) -> OffsceneResult<()> {
        if !self.initialized {
            return Err(OffsceneError::render("renderer is not initialized"));
        }
        let graph = self
            .graph
            .take()
            .ok_or_else(|| OffsceneError::render("no scene synchronized before render"))?;

        let (width, height) = target.dims_u16();
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            _ => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();

        let out = self.draw_graph(&mut ctx, &graph, dpr, f64::from(width), f64::from(height));
        self.graph = Some(graph);
        out?;

        ctx.flush();
        ctx.render_to_pixmap(target.pixmap_mut());
        target.mark_drawn();
        self.ctx = Some(ctx);
        Ok(())
    }

    fn draw_graph(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        graph: &SceneGraph,
        dpr: f64,
        width: f64,
        height: f64,
    ) -> OffsceneResult<()> {
        if graph.background.a > 0 {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(color_to_cpu(graph.background));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, width, height));
        }
        let root = Affine::scale(dpr);
        for node in &graph.nodes {
            self.draw_node(ctx, node, root)?;
        }
        Ok(())
    }

    fn draw_node(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        node: &DrawNode,
        root: Affine,
    ) -> OffsceneResult<()> {
        let (w, h) = (node.width, node.height);
        if !(w > 0.0 && h > 0.0) && !matches!(node.paint, DrawPaint::Text { .. }) {
            return Ok(());
        }
        let tr = root * node.transform;
        let opacity = node.opacity.clamp(0.0, 1.0);

        ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        if opacity < 1.0 {
            ctx.push_opacity_layer(opacity);
        }

        let out = match &node.paint {
            DrawPaint::Rect { color, radius } => {
                ctx.set_transform(affine_to_cpu(tr));
                ctx.set_paint(color_to_cpu(*color));
                let radius = radius.clamp(0.0, w.min(h) / 2.0);
                if radius > 0.0 {
                    use vello_cpu::kurbo::Shape;
                    let rr = vello_cpu::kurbo::RoundedRect::new(0.0, 0.0, w, h, radius);
                    ctx.fill_path(&rr.to_path(0.1));
                } else {
                    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
                }
                Ok(())
            }
            DrawPaint::Image(image) => {
                let (iw, ih) = (f64::from(image.width), f64::from(image.height));
                if iw > 0.0 && ih > 0.0 {
                    let stretch = Affine::scale_non_uniform(w / iw, h / ih);
                    ctx.set_transform(affine_to_cpu(tr * stretch));
                    ctx.set_paint(image.paint.clone());
                    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, iw, ih));
                }
                Ok(())
            }
            DrawPaint::Svg(svg) => {
                let (sw, sh) = svg.size();
                if sw > 0.0 && sh > 0.0 {
                    let stretch = Affine::scale_non_uniform(w / sw, h / sh);
                    self.svg_paint_for(svg, tr * stretch).map(|(img, rw, rh, adjust)| {
                        ctx.set_transform(affine_to_cpu(adjust));
                        ctx.set_paint(img);
                        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, rw, rh));
                    })
                } else {
                    Ok(())
                }
            }
            DrawPaint::Text { text, color } => {
                ctx.set_transform(affine_to_cpu(tr));
                ctx.set_paint(color_to_cpu(*color));
                for line in text.layout.lines() {
                    for item in line.items() {
                        let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                            continue;
                        };
                        let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                            id: g.id,
                            x: g.x,
                            y: g.y,
                        });
                        ctx.glyph_run(&text.font)
                            .font_size(run.run().font_size())
                            .fill_glyphs(glyphs);
                    }
                }
                Ok(())
            }
        };

        if opacity < 1.0 {
            ctx.pop_layer();
        }
        out
    }

    fn svg_paint_for(
        &mut self,
        svg: &Arc<PreparedSvg>,
        transform: Affine,
    ) -> OffsceneResult<(vello_cpu::Image, f64, f64, Affine)> {
        let (w, h, transform_adjust) = svg_raster_params(&svg.tree, transform)?;
        let key = SvgRasterKey {
            svg: Arc::as_ptr(svg) as usize,
            w,
            h,
        };
        if let Some((_, img)) = self.svg_cache.get(&key) {
            return Ok((img.clone(), f64::from(w), f64::from(h), transform_adjust));
        }
        let rgba = rasterize_svg_to_premul_rgba8(&svg.tree, w, h)?;
        let img = image_paint(pixmap_from_premul_bytes(&rgba, w, h)?);
        if self.svg_cache.len() >= SVG_CACHE_CAPACITY {
            self.svg_cache.clear();
        }
        self.svg_cache
            .insert(key, (Arc::clone(svg), img.clone()));
        Ok((img, f64::from(w), f64::from(h), transform_adjust))
    }
}

/// Compute a raster size for an SVG given the draw transform.
///
/// The SVG is rasterized at `(width, height)` and drawn with `transform_adjust` instead of the
/// original transform, so scaled-up SVGs stay sharp.
fn svg_raster_params(tree: &usvg::Tree, transform: Affine) -> OffsceneResult<(u32, u32, Affine)> {
    fn to_px(v: f32) -> OffsceneResult<u32> {
        if !v.is_finite() || v <= 0.0 {
            return Err(OffsceneError::render("svg has invalid width/height"));
        }
        Ok((v.ceil() as u32).max(1))
    }

    let size = tree.size();
    let base_w = to_px(size.width())?;
    let base_h = to_px(size.height())?;

    let [a, b, c, d, _e, _f] = transform.as_coeffs();
    let sx = (a * a + b * b).sqrt().max(1e-6);
    let sy = (c * c + d * d).sqrt().max(1e-6);

    let w = ((base_w as f64) * sx).ceil().max(1.0) as u32;
    let h = ((base_h as f64) * sy).ceil().max(1.0) as u32;

    const MAX_DIM: u32 = 16_384;
    if w > MAX_DIM || h > MAX_DIM {
        return Err(OffsceneError::render(format!(
            "svg raster size too large: {w}x{h} (max {MAX_DIM}x{MAX_DIM})"
        )));
    }

    let inv = Affine::scale_non_uniform(1.0 / sx, 1.0 / sy);
    Ok((w, h, transform * inv))
}

fn rasterize_svg_to_premul_rgba8(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
) -> OffsceneResult<Vec<u8>> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| OffsceneError::render("failed to allocate svg pixmap"))?;

    let sx = (width as f32) / tree.size().width();
    let sy = (height as f32) / tree.size().height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(tree, xform, &mut pixmap.as_mut());
    Ok(pixmap.data().to_vec())
}

fn color_to_cpu(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
