//! Frame-source glue: what a media pipeline calls to pull scene frames.
//!
//! A [`SceneProducer`] owns the scene path, its properties and at most one [`SceneHost`]. The
//! host is created on the first frame request and reused until a reload, [`SceneProducer::close`]
//! or drop.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::foundation::core::{FrameIndex, PixelFormat};
use crate::foundation::error::OffsceneResult;
use crate::pixels::Image;
use crate::pixels::convert::{extract_alpha, rgba8_to_rgb8};
use crate::scene::runtime::{SceneSource, read_scene_source};
use crate::session::scene_host::{SceneHost, SceneHostOpts};

/// Pixel layout a host asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HostImageFormat {
    /// Straight-alpha RGBA, 4 bytes per pixel.
    #[default]
    Rgba,
    /// RGB, 3 bytes per pixel; alpha only in [`HostFrame::alpha`].
    Rgb,
}

/// One frame handed to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Layout of `image`.
    pub format: HostImageFormat,
    /// Packed pixel bytes.
    pub image: Vec<u8>,
    /// Alpha plane, one byte per pixel.
    pub alpha: Option<Vec<u8>>,
}

impl HostFrame {
    fn from_straight_rgba(image: &Image, format: HostImageFormat) -> Self {
        let alpha = Some(extract_alpha(&image.data));
        let data = match format {
            HostImageFormat::Rgba => image.data.clone(),
            HostImageFormat::Rgb => rgba8_to_rgb8(&image.data),
        };
        Self {
            width: image.width,
            height: image.height,
            format,
            image: data,
            alpha,
        }
    }
}

/// Scene frame source with host-style properties.
pub struct SceneProducer {
    path: PathBuf,
    source: SceneSource,
    opts: SceneHostOpts,
    force_reload: u8,
    host: Option<SceneHost>,
    static_cache: HashMap<(u32, u32), Image>,
}

impl std::fmt::Debug for SceneProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneProducer")
            .field("path", &self.path)
            .field("opts", &self.opts)
            .field("force_reload", &self.force_reload)
            .field("running", &self.host.is_some())
            .field("cached", &self.static_cache.len())
            .finish()
    }
}

impl SceneProducer {
    /// Read the scene document at `path`. Nothing is rendered yet.
    pub fn open(path: impl AsRef<Path>, opts: SceneHostOpts) -> OffsceneResult<Self> {
        opts.validate()?;
        let path = path.as_ref().to_path_buf();
        let source = read_scene_source(&path)?;
        Ok(Self {
            path,
            source,
            opts,
            force_reload: 0,
            host: None,
            static_cache: HashMap::new(),
        })
    }

    /// Path of the scene document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Request a reload before the next frame: `1` recreates the renderer, `2` or more also
    /// re-reads the document from disk. Reset to `0` once handled.
    pub fn set_force_reload(&mut self, level: u8) {
        self.force_reload = level;
    }

    /// Pending reload level.
    pub fn force_reload(&self) -> u8 {
        self.force_reload
    }

    /// Timeline length in seconds; `0` renders the scene statically.
    pub fn set_duration_secs(&mut self, duration_secs: u64) {
        self.opts.duration_secs = duration_secs;
        if let Some(host) = self.host.as_mut() {
            host.set_duration_secs(duration_secs);
        }
    }

    /// Current options.
    pub fn opts(&self) -> &SceneHostOpts {
        &self.opts
    }

    /// Number of static frames kept in the per-size cache.
    pub fn cached_frames(&self) -> usize {
        self.static_cache.len()
    }

    /// Produce the frame at `position` (frames since the start, at the configured fps).
    ///
    /// Animated when `duration_secs > 0`; otherwise the scene is rendered at rest and the
    /// result cached per requested size.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub fn get_image(
        &mut self,
        position: u64,
        format: HostImageFormat,
        width: u32,
        height: u32,
    ) -> OffsceneResult<HostFrame> {
        self.apply_force_reload()?;

        if self.opts.duration_secs > 0 {
            let image = self.host()?.render_frame(
                width,
                height,
                PixelFormat::Rgba8,
                FrameIndex(position),
            )?;
            return Ok(HostFrame::from_straight_rgba(&image, format));
        }

        if let Some(image) = self.static_cache.get(&(width, height)) {
            tracing::trace!(width, height, "static frame served from cache");
            return Ok(HostFrame::from_straight_rgba(image, format));
        }
        let image = self
            .host()?
            .render_static(width, height, PixelFormat::Rgba8)?;
        let frame = HostFrame::from_straight_rgba(&image, format);
        self.static_cache.insert((width, height), image);
        Ok(frame)
    }

    /// Tear down the renderer. The next frame request starts a new session.
    pub fn close(&mut self) {
        self.static_cache.clear();
        if self.host.take().is_some() {
            tracing::debug!(path = %self.path.display(), "scene producer closed");
        }
    }

    fn apply_force_reload(&mut self) -> OffsceneResult<()> {
        let level = std::mem::take(&mut self.force_reload);
        if level == 0 {
            return Ok(());
        }
        tracing::debug!(level, "force reload");
        self.close();
        if level > 1 {
            self.source = read_scene_source(&self.path)?;
        }
        Ok(())
    }

    /// The running host, replacing one that faulted.
    fn host(&mut self) -> OffsceneResult<&mut SceneHost> {
        let host = match self.host.take() {
            Some(host) if !host.is_faulted() => host,
            stale => {
                if stale.is_some() {
                    tracing::warn!("replacing faulted scene host");
                    self.static_cache.clear();
                }
                SceneHost::new(self.source.clone(), self.opts.clone())?
            }
        };
        Ok(self.host.insert(host))
    }
}
