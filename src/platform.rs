//! Process-wide rendering platform.
//!
//! Created on first use and kept until the process exits. Every scene host goes through
//! [`Platform::acquire`] to create its context and surface; the platform is never recreated,
//! and a failed initialization stays failed.
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::foundation::error::{OffsceneError, OffsceneResult};
use crate::render::context::{BackendKind, OffscreenSurface, SurfaceFormat, create_context};
use crate::render::worker::GpuResources;

/// Environment variable selecting the render backend (`cpu`, or `none` to disable rendering).
pub const BACKEND_ENV: &str = "OFFSCENE_BACKEND";

static PLATFORM: OnceLock<Result<Platform, String>> = OnceLock::new();

/// The process-wide rendering platform.
#[derive(Debug)]
pub struct Platform {
    backend: BackendKind,
    surface_format: SurfaceFormat,
    sessions: AtomicU64,
}

impl Platform {
    /// Return the platform, initializing it on first call.
    pub fn acquire() -> OffsceneResult<&'static Platform> {
        PLATFORM
            .get_or_init(|| {
                let configured = std::env::var(BACKEND_ENV).ok();
                Self::from_backend_name(configured.as_deref())
            })
            .as_ref()
            .map_err(|msg| OffsceneError::platform(msg.clone()))
    }

    fn from_backend_name(name: Option<&str>) -> Result<Self, String> {
        let backend = match name.map(str::trim) {
            None | Some("") => BackendKind::default(),
            Some(n) if n.eq_ignore_ascii_case("none") => {
                return Err(format!("rendering disabled by {BACKEND_ENV}=none"));
            }
            Some(n) => n.parse::<BackendKind>().map_err(|e| e.to_string())?,
        };
        tracing::info!(?backend, "render platform initialized");
        Ok(Self {
            backend,
            surface_format: SurfaceFormat::default(),
            sessions: AtomicU64::new(0),
        })
    }

    /// Backend every context is created with.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Surface format requested for every offscreen surface.
    pub fn surface_format(&self) -> SurfaceFormat {
        self.surface_format
    }

    /// Create a context and an offscreen surface for one render session.
    pub fn create_resources(&self) -> OffsceneResult<GpuResources> {
        let context = create_context(self.backend, self.surface_format)?;
        let surface = OffscreenSurface::new(self.surface_format);
        self.sessions.fetch_add(1, Ordering::Relaxed);
        Ok(GpuResources::new(context, surface))
    }

    /// Number of sessions that created resources so far.
    pub fn sessions_created(&self) -> u64 {
        self.sessions.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "../tests/unit/platform.rs"]
mod tests;
