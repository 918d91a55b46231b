//! Loading scene documents and evaluating them at a point in logical time.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::animation::clock::active_time_ms;
use crate::animation::ease::Ease;
use crate::foundation::core::{Affine, Rgba8, Size};
use crate::foundation::error::{OffsceneError, OffsceneResult};
use crate::scene::graph::{DrawNode, DrawPaint, SceneGraph};
use crate::scene::metadata::{TimelineNode, compute_duration};
use crate::scene::model::{NodeDef, Property, SceneDocument};
use crate::scene::resources::{
    PreparedImage, PreparedSvg, PreparedText, TextLayoutEngine, load_image, load_svg,
};

/// A scene document as read from disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneSource {
    /// Location of the document; relative resources resolve against its directory.
    pub url: PathBuf,
    /// Document text.
    pub text: String,
}

impl SceneSource {
    /// Build a source from already-read text.
    pub fn new(url: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
        }
    }

    /// Directory that relative resource paths resolve against.
    pub fn base_dir(&self) -> PathBuf {
        self.url
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

/// Read a scene document from disk.
pub fn read_scene_source(path: impl AsRef<Path>) -> OffsceneResult<SceneSource> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        OffsceneError::scene_load(format!("failed to read scene '{}': {e}", path.display()))
    })?;
    Ok(SceneSource::new(path, text))
}

/// Turns a scene source into a live scene.
///
/// This is the seam where a different declarative runtime can be plugged into a
/// [`crate::SceneHost`].
pub trait SceneEngine: Send {
    /// Parse and instantiate the document. The root must be a visual item.
    fn load(&self, source: &SceneSource) -> OffsceneResult<SceneRuntime>;
}

/// [`SceneEngine`] for JSON scene documents (see [`SceneDocument`]).
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSceneEngine;

impl SceneEngine for JsonSceneEngine {
    #[tracing::instrument(skip(self, source), fields(url = %source.url.display()))]
    fn load(&self, source: &SceneSource) -> OffsceneResult<SceneRuntime> {
        let doc = SceneDocument::from_json_str(&source.text)?;
        let runtime = SceneRuntime::from_document(&doc, &source.base_dir())?;
        tracing::debug!(
            items = runtime.item_count(),
            animations = runtime.animation_count(),
            duration_ms = runtime.duration_ms(),
            "scene loaded"
        );
        Ok(runtime)
    }
}

#[derive(Clone, Copy, Debug)]
struct ItemState {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    opacity: f64,
    rotation: f64,
    scale: f64,
    visible: bool,
    color: Option<Rgba8>,
}

impl ItemState {
    fn get(&self, property: Property) -> f64 {
        match property {
            Property::X => self.x,
            Property::Y => self.y,
            Property::Width => self.width,
            Property::Height => self.height,
            Property::Opacity => self.opacity,
            Property::Rotation => self.rotation,
            Property::Scale => self.scale,
            Property::Color => 0.0,
        }
    }

    fn set(&mut self, property: Property, value: f64) {
        match property {
            Property::X => self.x = value,
            Property::Y => self.y = value,
            Property::Width => self.width = value.max(0.0),
            Property::Height => self.height = value.max(0.0),
            Property::Opacity => self.opacity = value,
            Property::Rotation => self.rotation = value,
            Property::Scale => self.scale = value,
            Property::Color => {}
        }
    }

    /// Translate to `(x, y)`, then rotate and scale about the item centre.
    fn local_transform(&self) -> Affine {
        let cx = self.width / 2.0;
        let cy = self.height / 2.0;
        Affine::translate((self.x + cx, self.y + cy))
            * Affine::rotate(self.rotation.to_radians())
            * Affine::scale(self.scale)
            * Affine::translate((-cx, -cy))
    }
}

#[derive(Debug)]
enum ItemKind {
    Plain,
    Rect { radius: f64 },
    Text(Arc<PreparedText>),
    Image(Arc<PreparedImage>),
    Svg(Arc<PreparedSvg>),
}

impl ItemKind {
    fn paint(&self, state: &ItemState) -> Option<DrawPaint> {
        match self {
            Self::Plain => None,
            Self::Rect { radius } => Some(DrawPaint::Rect {
                color: state.color.unwrap_or(Rgba8::WHITE),
                radius: *radius,
            }),
            Self::Text(text) => Some(DrawPaint::Text {
                text: Arc::clone(text),
                color: state.color.unwrap_or(Rgba8::BLACK),
            }),
            Self::Image(image) => Some(DrawPaint::Image(Arc::clone(image))),
            Self::Svg(svg) => Some(DrawPaint::Svg(Arc::clone(svg))),
        }
    }
}

#[derive(Debug)]
struct ItemNode {
    children: Vec<usize>,
    base: ItemState,
    kind: ItemKind,
}

#[derive(Clone, Copy, Debug)]
enum Channel {
    Number {
        property: Property,
        from: Option<f64>,
        to: f64,
    },
    Color {
        from: Option<Rgba8>,
        to: Rgba8,
    },
}

#[derive(Clone, Copy, Debug)]
struct Track {
    start_ms: u64,
    duration_ms: u64,
    item: usize,
    easing: Ease,
    channel: Channel,
}

/// A loaded scene: the item tree, its prepared resources, and its animation timeline.
///
/// The runtime is immutable once loaded. Animated state is recomputed from the base values
/// on every polish, so evaluating the same time twice always yields the same graph.
#[derive(Debug)]
pub struct SceneRuntime {
    items: Vec<ItemNode>,
    tracks: Vec<Track>,
    timeline: TimelineNode,
    background: Rgba8,
}

impl SceneRuntime {
    /// Instantiate a parsed document. Relative resources resolve against `base_dir`.
    pub fn from_document(doc: &SceneDocument, base_dir: &Path) -> OffsceneResult<Self> {
        if !doc.root.is_visual() {
            return Err(OffsceneError::scene_load(format!(
                "root object is not a visual item (found {})",
                doc.root.type_name()
            )));
        }

        let mut loader = Loader {
            base_dir,
            text_engine: TextLayoutEngine::new(),
            items: Vec::new(),
            ids: HashMap::new(),
            pending: Vec::new(),
        };
        loader.add_item(&doc.root)?;

        let mut tracks = Vec::new();
        for &(node, owner) in &loader.pending {
            loader.schedule(node, 0, owner, &mut tracks)?;
        }
        tracks.sort_by_key(|t: &Track| t.start_ms);

        Ok(Self {
            items: loader.items,
            tracks,
            timeline: TimelineNode::from_node(&doc.root),
            background: doc.background.unwrap_or(Rgba8::TRANSPARENT),
        })
    }

    /// Timeline shape used for duration discovery.
    pub fn timeline(&self) -> &TimelineNode {
        &self.timeline
    }

    /// Aggregate timeline duration in logical milliseconds.
    pub fn duration_ms(&self) -> u64 {
        compute_duration(&self.timeline)
    }

    /// Number of visual items, root included.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Number of property animations after flattening groups.
    pub fn animation_count(&self) -> usize {
        self.tracks.len()
    }

    /// Polish at the time of the clock installed on this thread (0 when none is).
    pub fn polish(&self, size: Size) -> SceneGraph {
        self.polish_at(size, active_time_ms().unwrap_or(0))
    }

    /// Evaluate animations at `time_ms`, size the root to `size`, and build the draw list.
    pub fn polish_at(&self, size: Size, time_ms: u64) -> SceneGraph {
        let mut states: Vec<ItemState> = self.items.iter().map(|i| i.base).collect();
        self.apply_tracks(&mut states, time_ms);
        if let Some(root) = states.first_mut() {
            root.width = f64::from(size.width);
            root.height = f64::from(size.height);
        }

        let mut nodes = Vec::new();
        if !states.is_empty() {
            self.emit(&states, 0, Affine::IDENTITY, 1.0, &mut nodes);
        }
        SceneGraph {
            width: size.width,
            height: size.height,
            background: self.background,
            nodes,
        }
    }

    fn apply_tracks(&self, states: &mut [ItemState], time_ms: u64) {
        for track in &self.tracks {
            if track.start_ms > time_ms {
                break;
            }
            let progress = if track.duration_ms == 0 {
                1.0
            } else {
                (time_ms - track.start_ms) as f64 / track.duration_ms as f64
            };
            let eased = track.easing.apply(progress);
            let Some(state) = states.get_mut(track.item) else {
                continue;
            };
            match track.channel {
                Channel::Number { property, from, to } => {
                    let from = from.unwrap_or_else(|| state.get(property));
                    state.set(property, from + (to - from) * eased);
                }
                Channel::Color { from, to } => {
                    if let Some(current) = state.color {
                        let from = from.unwrap_or(current);
                        state.color = Some(Rgba8::lerp(from, to, eased));
                    }
                }
            }
        }
    }

    fn emit(
        &self,
        states: &[ItemState],
        index: usize,
        parent: Affine,
        parent_opacity: f64,
        out: &mut Vec<DrawNode>,
    ) {
        let state = &states[index];
        if !state.visible {
            return;
        }
        let opacity = parent_opacity * state.opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 {
            return;
        }
        let transform = parent * state.local_transform();
        let item = &self.items[index];
        if let Some(paint) = item.kind.paint(state) {
            out.push(DrawNode {
                transform,
                opacity: opacity as f32,
                width: state.width,
                height: state.height,
                paint,
            });
        }
        for &child in &item.children {
            self.emit(states, child, transform, opacity, out);
        }
    }
}

struct Loader<'a> {
    base_dir: &'a Path,
    text_engine: TextLayoutEngine,
    items: Vec<ItemNode>,
    ids: HashMap<String, usize>,
    /// Animations declared directly inside a visual item, with that item's index.
    pending: Vec<(&'a NodeDef, usize)>,
}

impl<'a> Loader<'a> {
    fn add_item(&mut self, node: &'a NodeDef) -> OffsceneResult<usize> {
        let Some(def) = node.item() else {
            return Err(OffsceneError::scene_load(format!(
                "{} is not a visual item",
                node.type_name()
            )));
        };

        let mut natural = (0.0, 0.0);
        let mut color = None;
        let kind = match node {
            NodeDef::Rectangle(r) => {
                color = Some(r.color);
                ItemKind::Rect { radius: r.radius }
            }
            NodeDef::Text(t) => {
                color = Some(t.color);
                let text = self.text_engine.prepare(
                    self.base_dir,
                    &t.text,
                    &t.font,
                    t.size_px,
                    def.width,
                )?;
                natural = text.size();
                ItemKind::Text(Arc::new(text))
            }
            NodeDef::Image(i) => {
                let image = load_image(self.base_dir, &i.source)?;
                natural = (f64::from(image.width), f64::from(image.height));
                ItemKind::Image(Arc::new(image))
            }
            NodeDef::Svg(i) => {
                let svg = load_svg(self.base_dir, &i.source)?;
                natural = svg.size();
                ItemKind::Svg(Arc::new(svg))
            }
            _ => ItemKind::Plain,
        };

        let index = self.items.len();
        if let Some(id) = &def.id
            && self.ids.insert(id.clone(), index).is_some()
        {
            return Err(OffsceneError::scene_load(format!("duplicate item id '{id}'")));
        }
        self.items.push(ItemNode {
            children: Vec::new(),
            base: ItemState {
                x: def.x,
                y: def.y,
                width: def.width.unwrap_or(natural.0).max(0.0),
                height: def.height.unwrap_or(natural.1).max(0.0),
                opacity: def.opacity,
                rotation: def.rotation,
                scale: def.scale,
                visible: def.visible,
                color,
            },
            kind,
        });

        for child in &def.children {
            if child.is_visual() {
                let child_index = self.add_item(child)?;
                self.items[index].children.push(child_index);
            } else {
                self.pending.push((child, index));
            }
        }
        Ok(index)
    }

    fn resolve_target(&self, target: Option<&str>, owner: usize) -> OffsceneResult<usize> {
        match target {
            None => Ok(owner),
            Some(id) => self.ids.get(id).copied().ok_or_else(|| {
                OffsceneError::scene_load(format!("animation target '{id}' does not exist"))
            }),
        }
    }

    /// Flatten `node` into tracks starting at `start_ms`; returns the node's duration.
    fn schedule(
        &self,
        node: &NodeDef,
        start_ms: u64,
        owner: usize,
        tracks: &mut Vec<Track>,
    ) -> OffsceneResult<u64> {
        match node {
            NodeDef::SequentialAnimation(group) => {
                let mut t = start_ms;
                for child in &group.children {
                    let d = self.schedule(child, t, owner, tracks)?;
                    t = t.saturating_add(d);
                }
                Ok(t - start_ms)
            }
            NodeDef::ParallelAnimation(group) => {
                let mut longest = 0;
                for child in &group.children {
                    longest = longest.max(self.schedule(child, start_ms, owner, tracks)?);
                }
                Ok(longest)
            }
            NodeDef::NumberAnimation(a)
            | NodeDef::PropertyAnimation(a)
            | NodeDef::RotationAnimation(a) => {
                let property = match (&a.property, node) {
                    (Some(name), _) => name.parse::<Property>()?,
                    (None, NodeDef::RotationAnimation(_)) => Property::Rotation,
                    (None, _) => {
                        return Err(OffsceneError::scene_load(format!(
                            "{} needs a property",
                            node.type_name()
                        )));
                    }
                };
                if property == Property::Color {
                    return Err(OffsceneError::scene_load(
                        "color can only be animated by ColorAnimation",
                    ));
                }
                tracks.push(Track {
                    start_ms,
                    duration_ms: a.duration,
                    item: self.resolve_target(a.target.as_deref(), owner)?,
                    easing: a.easing,
                    channel: Channel::Number {
                        property,
                        from: a.from,
                        to: a.to,
                    },
                });
                Ok(a.duration)
            }
            NodeDef::ColorAnimation(a) => {
                if let Some(name) = &a.property
                    && name.parse::<Property>()? != Property::Color
                {
                    return Err(OffsceneError::scene_load(format!(
                        "ColorAnimation cannot animate '{name}'"
                    )));
                }
                let item = self.resolve_target(a.target.as_deref(), owner)?;
                if self.items[item].base.color.is_none() {
                    return Err(OffsceneError::scene_load(
                        "ColorAnimation target has no color",
                    ));
                }
                tracks.push(Track {
                    start_ms,
                    duration_ms: a.duration,
                    item,
                    easing: a.easing,
                    channel: Channel::Color {
                        from: a.from,
                        to: a.to,
                    },
                });
                Ok(a.duration)
            }
            NodeDef::PauseAnimation(p) => Ok(p.duration),
            NodeDef::Item(_)
            | NodeDef::Rectangle(_)
            | NodeDef::Text(_)
            | NodeDef::Image(_)
            | NodeDef::Svg(_) => Err(OffsceneError::scene_load(format!(
                "visual item {} is not allowed inside an animation",
                node.type_name()
            ))),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/runtime.rs"]
mod tests;
