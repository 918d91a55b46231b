use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::animation::clock::is_installed;
use crate::render::context::{BackendKind, CpuContext};

const RED: &str = r##"{ "root": { "type": "Rectangle", "color": "#ff0000" } }"##;

const SLIDE: &str = r##"{
  "root": { "type": "Item", "children": [
    { "type": "Rectangle", "id": "box", "width": 4, "height": 4, "color": "#00ff00" },
    { "type": "NumberAnimation", "target": "box", "property": "x", "to": 40, "duration": 2000 }
  ] }
}"##;

fn host(json: &str, opts: SceneHostOpts) -> SceneHost {
    SceneHost::with_context(
        SceneSource::new("/virtual/scene.json", json),
        opts,
        Box::new(CpuContext::new(SurfaceFormat::default())),
    )
    .unwrap()
}

/// Fails every `make_current` after the first `ok_calls`.
struct FlakyContext {
    ok_calls: usize,
    calls: usize,
    current: bool,
}

impl GraphicsContext for FlakyContext {
    fn make_current(&mut self, _surface: &OffscreenSurface) -> OffsceneResult<()> {
        self.calls += 1;
        if self.calls > self.ok_calls {
            return Err(OffsceneError::context_acquire("device lost"));
        }
        self.current = true;
        Ok(())
    }

    fn done_current(&mut self) {
        self.current = false;
    }

    fn is_current(&self) -> bool {
        self.current
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Cpu
    }
}

struct StallingContext {
    inner: CpuContext,
}

impl GraphicsContext for StallingContext {
    fn make_current(&mut self, surface: &OffscreenSurface) -> OffsceneResult<()> {
        self.inner.make_current(surface)
    }

    fn done_current(&mut self) {
        self.inner.done_current();
    }

    fn flush(&mut self) -> OffsceneResult<()> {
        std::thread::sleep(Duration::from_millis(400));
        Ok(())
    }

    fn is_current(&self) -> bool {
        self.inner.is_current()
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Cpu
    }
}

struct CountingEngine {
    loads: Arc<AtomicUsize>,
}

impl SceneEngine for CountingEngine {
    fn load(&self, source: &SceneSource) -> OffsceneResult<SceneRuntime> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        JsonSceneEngine.load(source)
    }
}

#[test]
fn opts_overrides_parse_timeout_and_dpr() {
    let opts = SceneHostOpts::default()
        .with_overrides(|key| match key {
            RENDER_TIMEOUT_ENV => Some("0".to_owned()),
            DPR_ENV => Some(" 2 ".to_owned()),
            _ => None,
        })
        .unwrap();
    assert_eq!(opts.render_timeout, None);
    assert_eq!(opts.device_pixel_ratio, 2.0);

    let opts = SceneHostOpts::default()
        .with_overrides(|key| (key == RENDER_TIMEOUT_ENV).then(|| "1500".to_owned()))
        .unwrap();
    assert_eq!(opts.render_timeout, Some(Duration::from_millis(1500)));

    assert!(
        SceneHostOpts::default()
            .with_overrides(|key| (key == DPR_ENV).then(|| "-1".to_owned()))
            .is_err()
    );
    assert!(
        SceneHostOpts::default()
            .with_overrides(|key| (key == RENDER_TIMEOUT_ENV).then(|| "soon".to_owned()))
            .is_err()
    );
}

#[test]
fn static_render_initializes_once() {
    let mut host = host(RED, SceneHostOpts::default());
    assert_eq!(host.status(), HostStatus::NotRunning);
    let img = host.render_static(5, 3, PixelFormat::Rgba8).unwrap();
    assert_eq!((img.width, img.height), (5, 3));
    assert_eq!(img.pixel(4, 2), Some([255, 0, 0, 255]));
    assert_eq!(host.status(), HostStatus::Initialized);

    // A second init would be rejected by the worker; the host must not send one.
    host.render_static(5, 3, PixelFormat::Rgba8).unwrap();
    assert_eq!(
        host.last_stats(),
        Some(FrameStats {
            steps: 1,
            clock_advances: 0,
            elapsed_ms: 0,
            total_frames: 1,
        })
    );
}

#[test]
fn zero_sized_requests_are_rejected() {
    let mut host = host(RED, SceneHostOpts::default());
    let err = host.render_static(0, 10, PixelFormat::Rgba8).unwrap_err();
    assert!(matches!(err, OffsceneError::Validation(_)));
    assert!(!host.is_faulted());
}

#[test]
fn frame_count_comes_from_the_scene_when_duration_is_unset() {
    let mut host = host(SLIDE, SceneHostOpts::default());
    assert_eq!(host.duration_ms().unwrap(), 2000);
    assert_eq!(host.total_frames().unwrap(), 50);

    host.set_duration_secs(4);
    assert_eq!(host.total_frames().unwrap(), 100);
}

#[test]
fn partial_second_scene_timelines_keep_their_frames() {
    let short = SLIDE.replace("\"duration\": 2000", "\"duration\": 800");
    let mut host = host(&short, SceneHostOpts::default());
    assert_eq!(host.duration_ms().unwrap(), 800);
    assert_eq!(host.total_frames().unwrap(), 20);

    host.render_frame(8, 8, PixelFormat::Rgba8, FrameIndex(19))
        .unwrap();
    let stats = host.last_stats().unwrap();
    assert_eq!(stats.clock_advances, 20);
    assert_eq!(stats.elapsed_ms, 20 * 45);
}

#[test]
fn animated_frame_counts_advances() {
    let mut host = host(SLIDE, SceneHostOpts::default());
    host.render_frame(16, 16, PixelFormat::Rgba8, FrameIndex(3))
        .unwrap();
    let stats = host.last_stats().unwrap();
    assert_eq!(stats.steps, 4);
    assert_eq!(stats.clock_advances, 4);
    // 25 fps over 2 s: (50 - 2) / 2 = 24 corrected fps, 41 ms per step.
    assert_eq!(stats.elapsed_ms, 4 * 41);
    assert_eq!(stats.total_frames, 50);
    assert!(!is_installed());
}

#[test]
fn frames_past_the_end_stop_at_the_last_frame() {
    let mut host = host(SLIDE, SceneHostOpts::default());
    host.render_frame(8, 8, PixelFormat::Rgba8, FrameIndex(10_000))
        .unwrap();
    let stats = host.last_stats().unwrap();
    assert_eq!(stats.steps, 50);
    assert_eq!(stats.clock_advances, 50);
}

#[test]
fn static_scene_animated_render_takes_one_step() {
    let mut host = host(RED, SceneHostOpts::default());
    assert_eq!(host.total_frames().unwrap(), 0);
    let img = host
        .render_frame(2, 2, PixelFormat::Rgba8, FrameIndex(7))
        .unwrap();
    assert_eq!(img.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(host.last_stats().unwrap().steps, 1);
}

#[test]
fn failed_render_uninstalls_the_clock() {
    let mut host = SceneHost::with_context(
        SceneSource::new("/virtual/scene.json", SLIDE),
        SceneHostOpts::default(),
        Box::new(FlakyContext {
            ok_calls: 1,
            calls: 0,
            current: false,
        }),
    )
    .unwrap();
    let err = host
        .render_frame(8, 8, PixelFormat::Rgba8, FrameIndex(5))
        .unwrap_err();
    assert!(matches!(err, OffsceneError::ContextAcquire(_)), "{err}");
    assert!(!is_installed());
    assert!(!host.is_faulted());
    assert!(host.last_stats().is_none());
}

#[test]
fn load_errors_leave_nothing_loaded() {
    let mut host = host("{ not json", SceneHostOpts::default());
    for _ in 0..2 {
        let err = host.render_static(4, 4, PixelFormat::Rgba8).unwrap_err();
        assert!(matches!(err, OffsceneError::SceneLoad(_)), "{err}");
    }
    assert_eq!(host.status(), HostStatus::NotRunning);

    host.reload(SceneSource::new("/virtual/scene.json", RED));
    host.render_static(4, 4, PixelFormat::Rgba8).unwrap();
}

#[test]
fn reload_and_engine_swap_reload_the_scene() {
    let loads = Arc::new(AtomicUsize::new(0));
    let mut host = host(RED, SceneHostOpts::default());
    host.set_engine(Box::new(CountingEngine {
        loads: Arc::clone(&loads),
    }));
    host.render_static(2, 2, PixelFormat::Rgba8).unwrap();
    host.render_static(2, 2, PixelFormat::Rgba8).unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    host.reload(SceneSource::new("/virtual/scene.json", SLIDE));
    host.render_static(2, 2, PixelFormat::Rgba8).unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[test]
fn timeout_faults_the_host() {
    let opts = SceneHostOpts {
        render_timeout: Some(Duration::from_millis(50)),
        ..SceneHostOpts::default()
    };
    let mut host = SceneHost::with_context(
        SceneSource::new("/virtual/scene.json", RED),
        opts,
        Box::new(StallingContext {
            inner: CpuContext::new(SurfaceFormat::default()),
        }),
    )
    .unwrap();
    let err = host.render_static(2, 2, PixelFormat::Rgba8).unwrap_err();
    assert!(matches!(err, OffsceneError::Timeout(_)), "{err}");
    assert!(host.is_faulted());

    let err = host.render_static(2, 2, PixelFormat::Rgba8).unwrap_err();
    assert!(matches!(err, OffsceneError::WorkerFaulted(_)), "{err}");
    assert!(host.request_resize(4, 4).is_err());
    // Dropping a faulted host detaches the worker instead of blocking.
}

#[test]
fn resize_hint_is_accepted() {
    let mut host = host(RED, SceneHostOpts::default());
    host.request_resize(32, 32).unwrap();
    let img = host.render_static(3, 3, PixelFormat::Rgba8).unwrap();
    assert_eq!((img.width, img.height), (3, 3));
}
