//! Serde model of scene documents.
//!
//! A scene document is JSON. Every node carries a `"type"` tag naming a visual item or an
//! animation, mirroring the object types of declarative UI toolkits:
//!
//! ```json
//! {
//!   "version": "1",
//!   "root": {
//!     "type": "Rectangle", "color": "#202020",
//!     "children": [
//!       { "type": "Rectangle", "id": "box", "width": 40, "height": 40, "color": "red" },
//!       { "type": "NumberAnimation", "target": "box", "property": "x", "to": 200, "duration": 1000 }
//!     ]
//!   }
//! }
//! ```
use std::str::FromStr;

use crate::animation::ease::Ease;
use crate::foundation::core::Rgba8;
use crate::foundation::error::{OffsceneError, OffsceneResult};

/// Top-level scene document.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SceneDocument {
    /// Document format version. Only `"1"` is accepted.
    #[serde(default = "default_version")]
    pub version: String,
    /// Color the render target is cleared to before drawing. Transparent when absent.
    #[serde(default)]
    pub background: Option<Rgba8>,
    /// Root node; must be a visual item.
    pub root: NodeDef,
}

impl SceneDocument {
    /// Parse and version-check a JSON document.
    pub fn from_json_str(s: &str) -> OffsceneResult<Self> {
        let doc: Self = serde_json::from_str(s)
            .map_err(|e| OffsceneError::scene_load(format!("invalid scene document: {e}")))?;
        if doc.version != "1" {
            return Err(OffsceneError::scene_load(format!(
                "unsupported scene document version '{}'",
                doc.version
            )));
        }
        Ok(doc)
    }
}

fn default_version() -> String {
    "1".to_owned()
}

/// One node of the scene tree: a visual item or an animation.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum NodeDef {
    /// Invisible container.
    Item(ItemDef),
    /// Filled, optionally rounded rectangle.
    Rectangle(RectangleDef),
    /// Single-style text block.
    Text(TextDef),
    /// Raster image file.
    Image(ImageDef),
    /// SVG file.
    Svg(ImageDef),
    /// Children run one after another.
    SequentialAnimation(GroupDef),
    /// Children run together; the group lasts as long as its longest child.
    ParallelAnimation(GroupDef),
    /// Animates a numeric property.
    NumberAnimation(PropertyAnimationDef),
    /// Animates a numeric property (generic form).
    PropertyAnimation(PropertyAnimationDef),
    /// Animates `rotation` unless another property is named.
    RotationAnimation(PropertyAnimationDef),
    /// Animates a color property.
    ColorAnimation(ColorAnimationDef),
    /// Waits without changing anything.
    PauseAnimation(PauseDef),
}

impl NodeDef {
    /// Common item fields when this node is a visual item.
    pub fn item(&self) -> Option<&ItemDef> {
        match self {
            Self::Item(item) => Some(item),
            Self::Rectangle(r) => Some(&r.item),
            Self::Text(t) => Some(&t.item),
            Self::Image(i) | Self::Svg(i) => Some(&i.item),
            _ => None,
        }
    }

    /// Return `true` for visual items.
    pub fn is_visual(&self) -> bool {
        self.item().is_some()
    }

    /// The node's `"type"` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Item(_) => "Item",
            Self::Rectangle(_) => "Rectangle",
            Self::Text(_) => "Text",
            Self::Image(_) => "Image",
            Self::Svg(_) => "Svg",
            Self::SequentialAnimation(_) => "SequentialAnimation",
            Self::ParallelAnimation(_) => "ParallelAnimation",
            Self::NumberAnimation(_) => "NumberAnimation",
            Self::PropertyAnimation(_) => "PropertyAnimation",
            Self::RotationAnimation(_) => "RotationAnimation",
            Self::ColorAnimation(_) => "ColorAnimation",
            Self::PauseAnimation(_) => "PauseAnimation",
        }
    }
}

/// Fields shared by every visual item.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ItemDef {
    /// Name animations use to target this item.
    #[serde(default)]
    pub id: Option<String>,
    /// Left edge relative to the parent.
    #[serde(default)]
    pub x: f64,
    /// Top edge relative to the parent.
    #[serde(default)]
    pub y: f64,
    /// Explicit width. Falls back to the content's natural width.
    #[serde(default)]
    pub width: Option<f64>,
    /// Explicit height. Falls back to the content's natural height.
    #[serde(default)]
    pub height: Option<f64>,
    /// Opacity in `[0, 1]`, multiplied into every descendant.
    #[serde(default = "one")]
    pub opacity: f64,
    /// Clockwise rotation in degrees around the item centre.
    #[serde(default)]
    pub rotation: f64,
    /// Uniform scale around the item centre.
    #[serde(default = "one")]
    pub scale: f64,
    /// Hidden items are skipped together with their children.
    #[serde(default = "yes")]
    pub visible: bool,
    /// Child items and animations, in paint order.
    #[serde(default)]
    pub children: Vec<NodeDef>,
}

impl Default for ItemDef {
    fn default() -> Self {
        Self {
            id: None,
            x: 0.0,
            y: 0.0,
            width: None,
            height: None,
            opacity: 1.0,
            rotation: 0.0,
            scale: 1.0,
            visible: true,
            children: Vec::new(),
        }
    }
}

/// `Rectangle` fields.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RectangleDef {
    /// Common item fields.
    #[serde(flatten)]
    pub item: ItemDef,
    /// Fill color.
    #[serde(default = "white")]
    pub color: Rgba8,
    /// Corner radius in item pixels.
    #[serde(default)]
    pub radius: f64,
}

/// `Text` fields.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TextDef {
    /// Common item fields. An explicit width wraps the text.
    #[serde(flatten)]
    pub item: ItemDef,
    /// Text content.
    pub text: String,
    /// Font file (TTF/OTF), relative to the document.
    pub font: String,
    /// Font size in pixels.
    #[serde(default = "default_font_size")]
    pub size_px: f64,
    /// Glyph color.
    #[serde(default = "black")]
    pub color: Rgba8,
}

/// `Image` / `Svg` fields.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ImageDef {
    /// Common item fields. Explicit sizes stretch the content.
    #[serde(flatten)]
    pub item: ItemDef,
    /// Source file, relative to the document.
    pub source: String,
}

/// `SequentialAnimation` / `ParallelAnimation` fields.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct GroupDef {
    /// Animations of the group. Visual items are not allowed here.
    #[serde(default)]
    pub children: Vec<NodeDef>,
}

/// Numeric property animation fields.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PropertyAnimationDef {
    /// Target item id. Defaults to the enclosing visual item.
    #[serde(default)]
    pub target: Option<String>,
    /// Animated property name.
    #[serde(default)]
    pub property: Option<String>,
    /// Start value. Defaults to the property's value when the animation starts.
    #[serde(default)]
    pub from: Option<f64>,
    /// End value.
    pub to: f64,
    /// Duration in logical milliseconds.
    #[serde(default = "default_duration")]
    pub duration: u64,
    /// Easing curve.
    #[serde(default)]
    pub easing: Ease,
}

/// `ColorAnimation` fields.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ColorAnimationDef {
    /// Target item id. Defaults to the enclosing visual item.
    #[serde(default)]
    pub target: Option<String>,
    /// Animated property name; only `color` is supported.
    #[serde(default)]
    pub property: Option<String>,
    /// Start color. Defaults to the current color when the animation starts.
    #[serde(default)]
    pub from: Option<Rgba8>,
    /// End color.
    pub to: Rgba8,
    /// Duration in logical milliseconds.
    #[serde(default = "default_duration")]
    pub duration: u64,
    /// Easing curve.
    #[serde(default)]
    pub easing: Ease,
}

/// `PauseAnimation` fields.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PauseDef {
    /// Duration in logical milliseconds.
    #[serde(default = "default_duration")]
    pub duration: u64,
}

/// Animatable item properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Property {
    /// `x`
    X,
    /// `y`
    Y,
    /// `width`
    Width,
    /// `height`
    Height,
    /// `opacity`
    Opacity,
    /// `rotation`
    Rotation,
    /// `scale`
    Scale,
    /// `color`
    Color,
}

impl FromStr for Property {
    type Err = OffsceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "x" => Self::X,
            "y" => Self::Y,
            "width" => Self::Width,
            "height" => Self::Height,
            "opacity" => Self::Opacity,
            "rotation" => Self::Rotation,
            "scale" => Self::Scale,
            "color" => Self::Color,
            other => {
                return Err(OffsceneError::scene_load(format!(
                    "unknown animated property '{other}'"
                )));
            }
        })
    }
}

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

fn white() -> Rgba8 {
    Rgba8::WHITE
}

fn black() -> Rgba8 {
    Rgba8::BLACK
}

fn default_font_size() -> f64 {
    16.0
}

fn default_duration() -> u64 {
    250
}
