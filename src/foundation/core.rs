use crate::foundation::error::{OffsceneError, OffsceneResult};

pub use kurbo::Affine;

/// Logical frame index counted from the start of a render session.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> OffsceneResult<Self> {
        if den == 0 {
            return Err(OffsceneError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(OffsceneError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Convert seconds to frame count using floor semantics.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * self.as_f64()).floor().max(0.0) as u64
    }

    /// Frames needed to cover a timeline of `duration_ms` logical milliseconds.
    ///
    /// Rounds up, so a partial last frame still gets drawn.
    pub fn frames_in_ms(self, duration_ms: u64) -> u64 {
        let num = u128::from(self.num) * u128::from(duration_ms);
        let den = u128::from(self.den) * 1000;
        u64::try_from(num.div_ceil(den)).unwrap_or(u64::MAX)
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 25, den: 1 }
    }
}

/// Width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a validated, non-empty size.
    pub fn new(width: u32, height: u32) -> OffsceneResult<Self> {
        if width == 0 || height == 0 {
            return Err(OffsceneError::validation(format!(
                "size must be non-empty, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Return `true` when either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Scale by a device pixel ratio, rounding to the nearest pixel.
    pub fn scaled(self, dpr: f64) -> Self {
        let scale = |v: u32| ((f64::from(v) * dpr).round().max(1.0)) as u32;
        Self {
            width: scale(self.width),
            height: scale(self.height),
        }
    }

    /// Number of bytes in a tightly packed 4-channel buffer of this size.
    pub fn rgba_len(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// 4-channel pixel layouts produced by read-back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PixelFormat {
    /// RGBA8 with color channels premultiplied by alpha.
    #[default]
    Rgba8Premul,
    /// RGBA8 with straight (unassociated) alpha.
    Rgba8,
    /// BGRA8 with straight alpha.
    Bgra8,
}

impl PixelFormat {
    /// Bytes per pixel (always 4 for the supported layouts).
    pub fn bytes_per_pixel(self) -> usize {
        4
    }

    /// Return `true` when color channels are premultiplied by alpha.
    pub fn is_premultiplied(self) -> bool {
        matches!(self, Self::Rgba8Premul)
    }
}

/// Straight-alpha RGBA8 color, as written in scene documents.
///
/// Deserializes from `"#RRGGBB"`, `"#AARRGGBB"`, a few named colors, or `[r, g, b]` /
/// `[r, g, b, a]` arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ColorRepr", into = "[u8; 4]")]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Build a color from straight-alpha channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#AARRGGBB` (alpha first, as declarative UI toolkits write it).
    pub fn parse_hex(s: &str) -> OffsceneResult<Self> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| OffsceneError::validation(format!("color '{s}' must start with '#'")))?;
        if !hex.is_ascii() {
            return Err(OffsceneError::validation(format!("invalid hex color '{s}'")));
        }
        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| OffsceneError::validation(format!("invalid hex color '{s}'")))
        };
        match hex.len() {
            3 => {
                let nib = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|_| OffsceneError::validation(format!("invalid hex color '{s}'")))
                };
                Ok(Self::new(nib(0)?, nib(1)?, nib(2)?, 255))
            }
            6 => Ok(Self::new(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Ok(Self::new(byte(2)?, byte(4)?, byte(6)?, byte(0)?)),
            _ => Err(OffsceneError::validation(format!(
                "hex color '{s}' must have 3, 6 or 8 digits"
            ))),
        }
    }

    /// Look up one of the supported named colors.
    pub fn named(name: &str) -> Option<Self> {
        let c = match name.to_ascii_lowercase().as_str() {
            "white" => Self::WHITE,
            "black" => Self::BLACK,
            "transparent" => Self::TRANSPARENT,
            "red" => Self::new(255, 0, 0, 255),
            "green" => Self::new(0, 128, 0, 255),
            "blue" => Self::new(0, 0, 255, 255),
            "yellow" => Self::new(255, 255, 0, 255),
            "gray" | "grey" => Self::new(128, 128, 128, 255),
            _ => return None,
        };
        Some(c)
    }

    /// Linear interpolation per channel, rounding to nearest.
    pub fn lerp(a: Self, b: Self, t: f64) -> Self {
        fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
            let a = f64::from(a);
            let b = f64::from(b);
            (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
        }

        Self {
            r: lerp_u8(a.r, b.r, t),
            g: lerp_u8(a.g, b.g, t),
            b: lerp_u8(a.b, b.b, t),
            a: lerp_u8(a.a, b.a, t),
        }
    }
}

impl From<Rgba8> for [u8; 4] {
    fn from(c: Rgba8) -> Self {
        [c.r, c.g, c.b, c.a]
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Text(String),
    Rgb([u8; 3]),
    Rgba([u8; 4]),
}

impl TryFrom<ColorRepr> for Rgba8 {
    type Error = String;

    fn try_from(value: ColorRepr) -> Result<Self, Self::Error> {
        match value {
            ColorRepr::Text(s) if s.starts_with('#') => {
                Rgba8::parse_hex(&s).map_err(|e| e.to_string())
            }
            ColorRepr::Text(s) => Rgba8::named(&s).ok_or_else(|| format!("unknown color name '{s}'")),
            ColorRepr::Rgb([r, g, b]) => Ok(Rgba8::new(r, g, b, 255)),
            ColorRepr::Rgba([r, g, b, a]) => Ok(Rgba8::new(r, g, b, a)),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
