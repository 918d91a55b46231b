//! offscene renders declarative scene documents off-screen, one frame per request.
//!
//! A [`SceneHost`] owns a loaded scene and a dedicated render worker thread. The calling
//! thread builds (polishes) a [`SceneGraph`] snapshot of the scene; the worker synchronizes that
//! snapshot into its renderer, draws it into a render target it owns exclusively, and reads the
//! pixels back. The caller blocks for exactly one reply per request.
//!
//! Animated scenes are driven by a [`DeterministicClock`] instead of wall time, so frame `N` of
//! a scene always renders the same pixels.
//!
//! # Pipeline overview
//!
//! 1. **Load**: `SceneSource -> SceneRuntime` (item tree, prepared resources, timeline)
//! 2. **Polish** (calling thread): `SceneRuntime + clock time -> SceneGraph`
//! 3. **Sync + draw** (render worker): `SceneGraph -> RenderTarget`
//! 4. **Read back**: `RenderTarget -> Image` in the requested [`PixelFormat`]
//!
//! [`SceneProducer`] wraps a host in the frame-source contract a media pipeline expects.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod animation;
mod foundation;
mod pixels;
mod platform;
mod producer;
mod render;
mod scene;
mod session;

pub use animation::clock::{
    ClockGuard, DeterministicClock, active_time_ms, is_installed, step_for_timeline,
};
pub use animation::ease::Ease;
pub use foundation::core::{Affine, Fps, FrameIndex, PixelFormat, Rgba8, Size};
pub use foundation::error::{OffsceneError, OffsceneResult};
pub use pixels::Image;
pub use pixels::convert::{
    extract_alpha, from_premul_rgba8, premultiply_rgba8_in_place, rgba8_to_rgb8,
    to_straight_rgba8, unpremultiply_rgba8_in_place,
};
pub use platform::{BACKEND_ENV, Platform};
pub use producer::{HostFrame, HostImageFormat, SceneProducer};
pub use render::context::{
    BackendKind, CpuContext, GraphicsContext, OffscreenSurface, SurfaceFormat, create_context,
};
pub use render::worker::GpuResources;
pub use scene::graph::{DrawNode, DrawPaint, SceneGraph};
pub use scene::metadata::{TimelineNode, compute_duration, duration_secs};
pub use scene::model::{
    ColorAnimationDef, GroupDef, ImageDef, ItemDef, NodeDef, PauseDef, Property,
    PropertyAnimationDef, RectangleDef, SceneDocument, TextDef,
};
pub use scene::resources::{
    PreparedImage, PreparedSvg, PreparedText, TextLayoutEngine, decode_image, load_image,
    load_svg, resolve_resource_path,
};
pub use scene::runtime::{
    JsonSceneEngine, SceneEngine, SceneRuntime, SceneSource, read_scene_source,
};
pub use session::scene_host::{
    DPR_ENV, FrameStats, HostStatus, RENDER_TIMEOUT_ENV, SceneHost, SceneHostOpts,
};
