//! The render worker: a dedicated thread owning the graphics context, the offscreen surface
//! and the render target.
//!
//! The controller talks to it through a bounded channel carrying a closed set of commands and
//! receives exactly one reply per command through a [`Rendezvous`]. At most one request is in
//! flight at a time.
use std::sync::Arc;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::foundation::core::{PixelFormat, Size};
use crate::foundation::error::{OffsceneError, OffsceneResult};
use crate::pixels::Image;
use crate::render::context::{GraphicsContext, OffscreenSurface};
use crate::render::cpu::SceneRenderer;
use crate::render::rendezvous::Rendezvous;
use crate::render::target::RenderTarget;
use crate::scene::graph::SceneGraph;

/// Name of the render worker thread.
pub(crate) const WORKER_THREAD_NAME: &str = "offscene-render";

/// A graphics context and the surface it draws on, owned by one thread at a time.
///
/// Fields drop in declaration order: the context is always destroyed before its surface.
pub struct GpuResources {
    /// Graphics context.
    pub context: Box<dyn GraphicsContext>,
    /// Offscreen surface the context binds to.
    pub surface: OffscreenSurface,
}

impl GpuResources {
    /// Bundle a context with its surface.
    pub fn new(context: Box<dyn GraphicsContext>, surface: OffscreenSurface) -> Self {
        Self { context, surface }
    }

    /// Destroy the context, then the surface.
    pub fn release(self) {
        let Self { context, surface } = self;
        drop(context);
        drop(surface);
        tracing::debug!("graphics resources released");
    }
}

impl std::fmt::Debug for GpuResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuResources")
            .field("backend", &self.context.backend())
            .field("surface", &self.surface)
            .finish()
    }
}

/// Everything the worker needs to produce one frame.
#[derive(Debug)]
pub(crate) struct RenderFrame {
    pub(crate) scene: SceneGraph,
    /// Logical size of the returned image; the target is drawn at `size × dpr`.
    pub(crate) size: Size,
    pub(crate) dpr: f64,
    pub(crate) format: PixelFormat,
}

#[derive(Debug)]
pub(crate) enum Command {
    Init,
    Render(RenderFrame),
    Resize(Size),
    Stop,
}

#[derive(Debug)]
struct Envelope {
    seq: u64,
    cmd: Command,
}

#[derive(Debug)]
pub(crate) enum Ack {
    Initialized,
    Rendered(Image),
    Resized,
    Stopped(GpuResources),
}

impl Ack {
    fn name(&self) -> &'static str {
        match self {
            Self::Initialized => "Initialized",
            Self::Rendered(_) => "Rendered",
            Self::Resized => "Resized",
            Self::Stopped(_) => "Stopped",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WorkerState {
    Uninitialized,
    Initialized,
    Stopped,
}

/// Controller side of a render worker.
pub(crate) struct WorkerHandle {
    tx: SyncSender<Envelope>,
    rendezvous: Arc<Rendezvous<Ack>>,
    thread: Option<JoinHandle<()>>,
    next_seq: u64,
    timeout: Option<Duration>,
    stopped: bool,
}

impl WorkerHandle {
    /// Start a worker thread and move `resources` to it.
    pub(crate) fn spawn(resources: GpuResources, timeout: Option<Duration>) -> OffsceneResult<Self> {
        let (tx, rx) = sync_channel::<Envelope>(1);
        let rendezvous = Arc::new(Rendezvous::new());
        let worker_rendezvous = Arc::clone(&rendezvous);
        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_owned())
            .spawn(move || run(rx, worker_rendezvous, resources))
            .map_err(|e| OffsceneError::worker_faulted(format!("failed to spawn render worker: {e}")))?;
        tracing::debug!(?timeout, "render worker spawned");
        Ok(Self {
            tx,
            rendezvous,
            thread: Some(thread),
            next_seq: 1,
            timeout,
            stopped: false,
        })
    }

    /// Send one command and block until its reply arrives or the timeout elapses.
    fn request(&mut self, cmd: Command) -> OffsceneResult<Ack> {
        if self.stopped {
            return Err(OffsceneError::worker_faulted("render worker already stopped"));
        }
        let seq = self.next_seq;
        self.next_seq += 1;

        let guard = self.rendezvous.lock();
        self.tx
            .send(Envelope { seq, cmd })
            .map_err(|_| OffsceneError::worker_faulted("render worker is gone"))?;
        self.rendezvous.wait(guard, seq, self.timeout)
    }

    /// Acquire the context on the worker and initialize its renderer. Must be acknowledged
    /// before the first render.
    pub(crate) fn init(&mut self) -> OffsceneResult<()> {
        match self.request(Command::Init)? {
            Ack::Initialized => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Synchronize, draw and read back one frame.
    pub(crate) fn render(&mut self, frame: RenderFrame) -> OffsceneResult<Image> {
        match self.request(Command::Render(frame))? {
            Ack::Rendered(image) => Ok(image),
            other => Err(unexpected(&other)),
        }
    }

    /// Forward a resize hint. The target is only ever resized by the next render.
    pub(crate) fn resize(&mut self, size: Size) -> OffsceneResult<()> {
        match self.request(Command::Resize(size))? {
            Ack::Resized => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Stop the worker and take the context and surface back.
    pub(crate) fn stop(&mut self) -> OffsceneResult<GpuResources> {
        let ack = self.request(Command::Stop);
        self.stopped = true;
        match ack? {
            Ack::Stopped(resources) => Ok(resources),
            other => Err(unexpected(&other)),
        }
    }

    /// Wait for the worker thread to exit.
    pub(crate) fn join(mut self) -> OffsceneResult<()> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| OffsceneError::worker_faulted("render worker thread panicked")),
            None => Ok(()),
        }
    }

    /// Abandon the worker thread. Closing the channel makes it clean up and exit once it
    /// finishes whatever it is stuck on.
    pub(crate) fn detach(mut self) {
        if self.thread.take().is_some() {
            tracing::warn!("render worker detached without joining");
        }
    }
}

fn unexpected(ack: &Ack) -> OffsceneError {
    OffsceneError::worker_faulted(format!("unexpected render worker reply: {}", ack.name()))
}

/// Publishes a fault for the in-flight request if the worker unwinds while handling it.
struct FaultOnUnwind<'a> {
    rendezvous: &'a Rendezvous<Ack>,
    seq: u64,
}

impl Drop for FaultOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.rendezvous.publish(
                self.seq,
                Err(OffsceneError::worker_faulted("render worker panicked")),
            );
        }
    }
}

fn run(rx: Receiver<Envelope>, rendezvous: Arc<Rendezvous<Ack>>, resources: GpuResources) {
    let mut worker = RenderWorker::new(resources);
    while let Ok(Envelope { seq, cmd }) = rx.recv() {
        let stop = matches!(cmd, Command::Stop);
        let fault_guard = FaultOnUnwind {
            rendezvous: &rendezvous,
            seq,
        };
        let reply = worker.handle(cmd);
        drop(fault_guard);
        rendezvous.publish(seq, reply);
        if stop {
            tracing::debug!("render worker stopped");
            return;
        }
    }
    tracing::debug!("render worker channel closed; cleaning up");
    worker.shutdown();
}

struct RenderWorker {
    state: WorkerState,
    resources: Option<GpuResources>,
    renderer: SceneRenderer,
    target: Option<RenderTarget>,
    resize_hint: Option<Size>,
}

impl RenderWorker {
    fn new(resources: GpuResources) -> Self {
        Self {
            state: WorkerState::Uninitialized,
            resources: Some(resources),
            renderer: SceneRenderer::new(),
            target: None,
            resize_hint: None,
        }
    }

    fn handle(&mut self, cmd: Command) -> OffsceneResult<Ack> {
        match cmd {
            Command::Init => self.init().map(|()| Ack::Initialized),
            Command::Render(frame) => self.render(frame).map(Ack::Rendered),
            Command::Resize(size) => {
                tracing::debug!(
                    width = size.width,
                    height = size.height,
                    "resize hint recorded; target follows the next render"
                );
                self.resize_hint = Some(size);
                Ok(Ack::Resized)
            }
            Command::Stop => self.stop().map(Ack::Stopped),
        }
    }

    fn init(&mut self) -> OffsceneResult<()> {
        if self.state != WorkerState::Uninitialized {
            return Err(OffsceneError::validation(format!(
                "render worker cannot initialize from state {:?}",
                self.state
            )));
        }
        let resources = self
            .resources
            .as_mut()
            .ok_or_else(|| OffsceneError::worker_faulted("graphics resources already released"))?;
        make_current(resources)?;
        let out = self.renderer.initialize(resources.context.as_ref());
        resources.context.done_current();
        out?;
        self.state = WorkerState::Initialized;
        tracing::debug!(backend = ?resources.context.backend(), "render worker initialized");
        Ok(())
    }

    /// Draw one frame. The slot lock is not held while drawing, only to publish the reply,
    /// so the caller's timeout can fire on a stuck draw.
    fn render(&mut self, frame: RenderFrame) -> OffsceneResult<Image> {
        if self.state != WorkerState::Initialized {
            return Err(OffsceneError::validation(format!(
                "render requested in state {:?}; init must be acknowledged first",
                self.state
            )));
        }
        let Self {
            resources,
            renderer,
            target,
            ..
        } = self;
        let resources = resources
            .as_mut()
            .ok_or_else(|| OffsceneError::worker_faulted("graphics resources already released"))?;
        make_current(resources)?;

        let out = (|| {
            let physical = frame.size.scaled(frame.dpr);
            RenderTarget::ensure(target, physical)?;
            let target = target
                .as_mut()
                .ok_or_else(|| OffsceneError::render("render target missing after ensure"))?;
            renderer.sync(frame.scene);
            renderer.render(target, frame.dpr)?;
            resources.context.flush()?;
            tracing::trace!(size = ?target.size(), "frame drawn");
            target.read_back(frame.format, frame.size)
        })();
        resources.context.done_current();
        out
    }

    fn stop(&mut self) -> OffsceneResult<GpuResources> {
        self.state = WorkerState::Stopped;
        let mut resources = self
            .resources
            .take()
            .ok_or_else(|| OffsceneError::worker_faulted("graphics resources already released"))?;
        if let Err(err) = resources.context.make_current(&resources.surface) {
            tracing::warn!(%err, "could not make context current for cleanup");
        }
        if self.renderer.is_initialized() {
            self.renderer.invalidate();
        }
        self.target = None;
        resources.context.done_current();
        Ok(resources)
    }

    fn shutdown(&mut self) {
        if self.resources.is_some() {
            match self.stop() {
                Ok(resources) => resources.release(),
                Err(err) => tracing::warn!(%err, "render worker cleanup failed"),
            }
        }
    }
}

fn make_current(resources: &mut GpuResources) -> OffsceneResult<()> {
    resources
        .context
        .make_current(&resources.surface)
        .map_err(|err| match err {
            OffsceneError::ContextAcquire(_) => err,
            other => OffsceneError::context_acquire(other.to_string()),
        })
        .inspect_err(|err| tracing::error!(%err, "failed to make context current"))
}

#[cfg(test)]
#[path = "../../tests/unit/render/worker.rs"]
mod tests;
