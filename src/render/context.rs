//! Graphics contexts and the offscreen surfaces they draw into.
use std::thread::ThreadId;

use crate::foundation::error::{OffsceneError, OffsceneResult};

/// Buffer configuration of an offscreen surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {
    /// Depth buffer bits.
    pub depth_bits: u8,
    /// Stencil buffer bits.
    pub stencil_bits: u8,
}

impl Default for SurfaceFormat {
    fn default() -> Self {
        Self {
            depth_bits: 16,
            stencil_bits: 8,
        }
    }
}

/// Drawable a context is bound to while rendering. Never displayed.
#[derive(Debug)]
pub struct OffscreenSurface {
    /// Buffer configuration the surface was created with.
    pub format: SurfaceFormat,
}

impl OffscreenSurface {
    /// Create a surface with the given buffer configuration.
    pub fn new(format: SurfaceFormat) -> Self {
        Self { format }
    }
}

/// A graphics context owned by exactly one thread at a time.
///
/// The render worker makes the context current before every unit of graphics work and
/// releases it afterwards. Implementations report acquisition failures as
/// [`OffsceneError::ContextAcquire`].
pub trait GraphicsContext: Send {
    /// Bind the context to `surface` on the calling thread.
    fn make_current(&mut self, surface: &OffscreenSurface) -> OffsceneResult<()>;

    /// Unbind the context from the calling thread.
    fn done_current(&mut self);

    /// Wait for submitted work to finish.
    fn flush(&mut self) -> OffsceneResult<()> {
        Ok(())
    }

    /// Return `true` when the context is current on the calling thread.
    fn is_current(&self) -> bool;

    /// Backend the context renders with.
    fn backend(&self) -> BackendKind;
}

/// Available backend kinds.
///
/// - `Cpu` is always available.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// CPU raster backend powered by `vello_cpu`.
    #[default]
    Cpu,
}

impl std::str::FromStr for BackendKind {
    type Err = OffsceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            other => Err(OffsceneError::platform(format!(
                "unknown render backend '{other}'"
            ))),
        }
    }
}

/// Context for the software rasterizer.
///
/// Draw calls run on the CPU, so "current" only records which thread holds the context and
/// checks that the surface matches the configuration the context was created for.
#[derive(Debug)]
pub struct CpuContext {
    format: SurfaceFormat,
    current_on: Option<ThreadId>,
}

impl CpuContext {
    /// Create a context compatible with surfaces of `format`.
    pub fn new(format: SurfaceFormat) -> Self {
        Self {
            format,
            current_on: None,
        }
    }
}

impl GraphicsContext for CpuContext {
    fn make_current(&mut self, surface: &OffscreenSurface) -> OffsceneResult<()> {
        if surface.format != self.format {
            return Err(OffsceneError::context_acquire(format!(
                "surface format {:?} does not match context format {:?}",
                surface.format, self.format
            )));
        }
        self.current_on = Some(std::thread::current().id());
        Ok(())
    }

    fn done_current(&mut self) {
        self.current_on = None;
    }

    fn is_current(&self) -> bool {
        self.current_on == Some(std::thread::current().id())
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Cpu
    }
}

/// Create a graphics context for `kind`.
pub fn create_context(
    kind: BackendKind,
    format: SurfaceFormat,
) -> OffsceneResult<Box<dyn GraphicsContext>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(CpuContext::new(format))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/context.rs"]
mod tests;
