use std::time::Duration;

use crate::animation::clock::{ClockGuard, DeterministicClock};
use crate::foundation::core::{Fps, FrameIndex, PixelFormat, Size};
use crate::foundation::error::{OffsceneError, OffsceneResult};
use crate::pixels::Image;
use crate::platform::Platform;
use crate::render::context::{GraphicsContext, OffscreenSurface, SurfaceFormat};
use crate::render::worker::{GpuResources, RenderFrame, WorkerHandle};
use crate::scene::graph::SceneGraph;
use crate::scene::runtime::{JsonSceneEngine, SceneEngine, SceneRuntime, SceneSource};

/// Environment variable overriding [`SceneHostOpts::render_timeout`] in milliseconds (`0` = none).
pub const RENDER_TIMEOUT_ENV: &str = "OFFSCENE_RENDER_TIMEOUT_MS";
/// Environment variable overriding [`SceneHostOpts::device_pixel_ratio`].
pub const DPR_ENV: &str = "OFFSCENE_DPR";

const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Options shared by [`SceneHost`] and [`crate::SceneProducer`].
#[derive(Clone, Debug, PartialEq)]
pub struct SceneHostOpts {
    /// Frame rate the host counts positions in.
    pub fps: Fps,
    /// Timeline length in seconds. `0` means "use the scene's own timeline".
    pub duration_secs: u64,
    /// Render target scale; output images are `size × device_pixel_ratio`.
    pub device_pixel_ratio: f64,
    /// Longest wait for one worker reply. `None` waits forever.
    pub render_timeout: Option<Duration>,
}

impl Default for SceneHostOpts {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            duration_secs: 0,
            device_pixel_ratio: 1.0,
            render_timeout: Some(DEFAULT_RENDER_TIMEOUT),
        }
    }
}

impl SceneHostOpts {
    /// Defaults with the `OFFSCENE_*` environment overrides applied.
    pub fn from_env() -> OffsceneResult<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub(crate) fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> OffsceneResult<Self> {
        if let Some(raw) = lookup(RENDER_TIMEOUT_ENV) {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                OffsceneError::validation(format!(
                    "{RENDER_TIMEOUT_ENV} must be an integer, got '{raw}'"
                ))
            })?;
            self.render_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(raw) = lookup(DPR_ENV) {
            let dpr: f64 = raw.trim().parse().map_err(|_| {
                OffsceneError::validation(format!("{DPR_ENV} must be a number, got '{raw}'"))
            })?;
            self.device_pixel_ratio = dpr;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check the options for values no render can satisfy.
    pub fn validate(&self) -> OffsceneResult<()> {
        if !(self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0) {
            return Err(OffsceneError::validation(format!(
                "device pixel ratio must be finite and > 0, got {}",
                self.device_pixel_ratio
            )));
        }
        Ok(())
    }
}

/// What the last successful render did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Polish + render cycles issued.
    pub steps: u64,
    /// Clock advances performed (0 for static renders).
    pub clock_advances: u64,
    /// Logical time of the clock after the last advance.
    pub elapsed_ms: u64,
    /// Frame count of the timeline the render ran against.
    pub total_frames: u64,
}

/// Lifecycle of a [`SceneHost`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostStatus {
    /// Worker spawned, init not yet requested.
    NotRunning,
    /// Worker acknowledged init; renders are accepted.
    Initialized,
    /// A wait timed out or the worker died. Every further request fails.
    Faulted,
}

/// One loaded scene bound to one render worker and one context/surface pair.
///
/// The scene is loaded on the first render and kept until [`SceneHost::reload`]. Polish and
/// clock stepping happen on the calling thread; every draw happens on the worker. Dropping the
/// host stops the worker, joins it and then releases the context before the surface.
pub struct SceneHost {
    source: SceneSource,
    opts: SceneHostOpts,
    engine: Box<dyn SceneEngine>,
    runtime: Option<SceneRuntime>,
    worker: Option<WorkerHandle>,
    status: HostStatus,
    last_stats: Option<FrameStats>,
}

impl std::fmt::Debug for SceneHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneHost")
            .field("url", &self.source.url)
            .field("opts", &self.opts)
            .field("loaded", &self.runtime.is_some())
            .field("status", &self.status)
            .finish()
    }
}

impl SceneHost {
    /// Create a host on the process-wide platform's backend.
    pub fn new(source: SceneSource, opts: SceneHostOpts) -> OffsceneResult<Self> {
        opts.validate()?;
        let resources = Platform::acquire()?.create_resources()?;
        Self::spawn(source, opts, resources)
    }

    /// Create a host around a caller-supplied graphics context.
    pub fn with_context(
        source: SceneSource,
        opts: SceneHostOpts,
        context: Box<dyn GraphicsContext>,
    ) -> OffsceneResult<Self> {
        opts.validate()?;
        let surface = OffscreenSurface::new(SurfaceFormat::default());
        Self::spawn(source, opts, GpuResources::new(context, surface))
    }

    fn spawn(
        source: SceneSource,
        opts: SceneHostOpts,
        resources: GpuResources,
    ) -> OffsceneResult<Self> {
        let worker = WorkerHandle::spawn(resources, opts.render_timeout)?;
        tracing::debug!(url = %source.url.display(), "scene host created");
        Ok(Self {
            source,
            opts,
            engine: Box::new(JsonSceneEngine),
            runtime: None,
            worker: Some(worker),
            status: HostStatus::NotRunning,
            last_stats: None,
        })
    }

    /// Replace the scene engine. The scene is reloaded on the next render.
    pub fn set_engine(&mut self, engine: Box<dyn SceneEngine>) {
        self.engine = engine;
        self.runtime = None;
    }

    /// Swap the scene document. The next render loads it.
    pub fn reload(&mut self, source: SceneSource) {
        tracing::debug!(url = %source.url.display(), "scene source replaced");
        self.source = source;
        self.runtime = None;
    }

    /// Current options.
    pub fn opts(&self) -> &SceneHostOpts {
        &self.opts
    }

    /// Set the timeline length used by animated renders (`0` = scene timeline).
    pub fn set_duration_secs(&mut self, duration_secs: u64) {
        self.opts.duration_secs = duration_secs;
    }

    /// Lifecycle state.
    pub fn status(&self) -> HostStatus {
        self.status
    }

    /// Return `true` once a timeout or worker failure has made the host unusable.
    pub fn is_faulted(&self) -> bool {
        self.status == HostStatus::Faulted
    }

    /// Counters of the last successful render.
    pub fn last_stats(&self) -> Option<FrameStats> {
        self.last_stats
    }

    /// Timeline duration of the scene in logical ms, loading it if needed.
    pub fn duration_ms(&mut self) -> OffsceneResult<u64> {
        Ok(self.load()?.duration_ms())
    }

    /// Frame count of the timeline animated renders run against.
    ///
    /// Covers `duration_secs` from the options, or the scene's own timeline (to the
    /// millisecond) when the options leave the duration at `0`.
    pub fn total_frames(&mut self) -> OffsceneResult<u64> {
        let ms = self.timeline_ms()?;
        Ok(self.opts.fps.frames_in_ms(ms))
    }

    fn timeline_ms(&mut self) -> OffsceneResult<u64> {
        if self.opts.duration_secs > 0 {
            return Ok(self.opts.duration_secs.saturating_mul(1000));
        }
        Ok(self.load()?.duration_ms())
    }

    /// Render the scene at rest (logical time 0).
    #[tracing::instrument(skip(self), fields(url = %self.source.url.display()))]
    pub fn render_static(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> OffsceneResult<Image> {
        let size = Size::new(width, height)?;
        self.prepare()?;
        let scene = self.load()?.polish_at(size, 0);
        let image = self.render_step(scene, size, format)?;
        self.last_stats = Some(FrameStats {
            steps: 1,
            clock_advances: 0,
            elapsed_ms: 0,
            total_frames: 1,
        });
        Ok(image)
    }

    /// Render logical frame `frame` of the scene's animation.
    ///
    /// A fresh [`DeterministicClock`] is installed for the call and stepped once per rendered
    /// frame, starting from 0, until the requested frame or the end of the timeline is reached.
    /// Frame `i` is therefore captured after exactly `i + 1` advances; a frame past the end
    /// returns the last frame of the timeline.
    #[tracing::instrument(skip(self), fields(url = %self.source.url.display()))]
    pub fn render_frame(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        frame: FrameIndex,
    ) -> OffsceneResult<Image> {
        let size = Size::new(width, height)?;
        self.prepare()?;
        let ms = self.timeline_ms()?;
        let total = self.opts.fps.frames_in_ms(ms);
        let guard = ClockGuard::install(DeterministicClock::for_timeline(self.opts.fps, ms))?;

        let mut current = 0u64;
        let mut steps = 0u64;
        let image = loop {
            let scene = self.load()?.polish(size);
            let image = self.render_step(scene, size, format)?;
            guard.advance();
            steps += 1;
            if current == frame.0 {
                break image;
            }
            current += 1;
            if current >= total {
                tracing::debug!(requested = frame.0, total, "requested frame past timeline end");
                break image;
            }
        };

        let stats = FrameStats {
            steps,
            clock_advances: guard.advances(),
            elapsed_ms: guard.elapsed(),
            total_frames: total,
        };
        drop(guard);
        tracing::debug!(?stats, "animated frame rendered");
        self.last_stats = Some(stats);
        Ok(image)
    }

    /// Forward a resize hint to the worker. The target itself follows the next render size.
    pub fn request_resize(&mut self, width: u32, height: u32) -> OffsceneResult<()> {
        let size = Size::new(width, height)?;
        let out = self.worker()?.resize(size);
        self.note(out)
    }

    fn load(&mut self) -> OffsceneResult<&SceneRuntime> {
        if self.runtime.is_none() {
            let runtime = self.engine.load(&self.source).inspect_err(|err| {
                tracing::error!(%err, url = %self.source.url.display(), "scene load failed");
            })?;
            self.runtime = Some(runtime);
        }
        self.runtime
            .as_ref()
            .ok_or_else(|| OffsceneError::scene_load("scene runtime missing after load"))
    }

    /// Load the scene, then make sure the worker acknowledged init.
    fn prepare(&mut self) -> OffsceneResult<()> {
        self.load()?;
        match self.status {
            HostStatus::Initialized => Ok(()),
            HostStatus::Faulted => Err(faulted()),
            HostStatus::NotRunning => {
                let out = self.worker()?.init();
                self.note(out)?;
                self.status = HostStatus::Initialized;
                Ok(())
            }
        }
    }

    fn render_step(
        &mut self,
        scene: SceneGraph,
        size: Size,
        format: PixelFormat,
    ) -> OffsceneResult<Image> {
        let frame = RenderFrame {
            scene,
            size,
            dpr: self.opts.device_pixel_ratio,
            format,
        };
        let out = self.worker()?.render(frame);
        self.note(out)
    }

    fn worker(&mut self) -> OffsceneResult<&mut WorkerHandle> {
        if self.status == HostStatus::Faulted {
            return Err(faulted());
        }
        self.worker
            .as_mut()
            .ok_or_else(|| OffsceneError::worker_faulted("render worker is not running"))
    }

    /// Fault the host on errors that leave the worker in an unknown state.
    fn note<T>(&mut self, out: OffsceneResult<T>) -> OffsceneResult<T> {
        if let Err(err) = &out
            && err.is_fatal_for_session()
        {
            tracing::error!(%err, "scene host faulted");
            self.status = HostStatus::Faulted;
        }
        out
    }
}

fn faulted() -> OffsceneError {
    OffsceneError::worker_faulted("scene host faulted by an earlier render failure")
}

impl Drop for SceneHost {
    fn drop(&mut self) {
        let Some(mut worker) = self.worker.take() else {
            return;
        };
        if self.status == HostStatus::Faulted {
            worker.detach();
            return;
        }
        match worker.stop() {
            Ok(resources) => {
                if let Err(err) = worker.join() {
                    tracing::warn!(%err, "render worker join failed");
                }
                resources.release();
            }
            Err(err) => {
                tracing::warn!(%err, "render worker did not acknowledge stop");
                worker.detach();
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/scene_host.rs"]
mod tests;
