pub use kurbo::Rect;

/// Axis-aligned detection box `(x1, y1, x2, y2)` in source-image pixel space.
///
/// Callers are expected to supply `x1 <= x2` and `y1 <= y2`, but nothing rejects inverted boxes;
/// see [`BoundingBox::normalized`].
///
/// On the wire a box is either a 4-element array `[x1, y1, x2, y2]` or an object with the same
/// keys. It always serializes as an array.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "BoxRepr", into = "[f64; 4]")]
pub struct BoundingBox {
    /// Left edge.
    pub x1: f64,
    /// Top edge.
    pub y1: f64,
    /// Right edge.
    pub x2: f64,
    /// Bottom edge.
    pub y2: f64,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum BoxRepr {
    Array([f64; 4]),
    Object { x1: f64, y1: f64, x2: f64, y2: f64 },
}

impl From<BoxRepr> for BoundingBox {
    fn from(repr: BoxRepr) -> Self {
        match repr {
            BoxRepr::Array([x1, y1, x2, y2]) | BoxRepr::Object { x1, y1, x2, y2 } => {
                Self { x1, y1, x2, y2 }
            }
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl BoundingBox {
    /// Create a box from its two corners.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Return the box with coordinates swapped so that `x1 <= x2` and `y1 <= y2`.
    pub fn normalized(self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    /// Signed width `x2 - x1`.
    pub fn width(self) -> f64 {
        self.x2 - self.x1
    }

    /// Signed height `y2 - y1`.
    pub fn height(self) -> f64 {
        self.y2 - self.y1
    }

    /// Return `true` when all four coordinates are finite.
    pub fn is_finite(self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }
}

/// Ordered list of detection boxes, supplied wholesale and never mutated by the renderer.
///
/// Boxes are painted in sequence; later boxes land on top of earlier ones where they overlap.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DetectionSet(Vec<BoundingBox>);

impl DetectionSet {
    /// Empty set: base image only, no overlays.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Number of boxes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` when there are no boxes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate boxes in paint order.
    pub fn iter(&self) -> std::slice::Iter<'_, BoundingBox> {
        self.0.iter()
    }

    /// Borrow the boxes as a slice.
    pub fn as_slice(&self) -> &[BoundingBox] {
        &self.0
    }
}

impl From<Vec<BoundingBox>> for DetectionSet {
    fn from(boxes: Vec<BoundingBox>) -> Self {
        Self(boxes)
    }
}

impl FromIterator<BoundingBox> for DetectionSet {
    fn from_iter<I: IntoIterator<Item = BoundingBox>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a BoundingBox;
    type IntoIter = std::slice::Iter<'a, BoundingBox>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Straight (non-premultiplied) RGBA8 color as used in styles and config files.
///
/// Deserializes from `{"r":..,"g":..,"b":..,"a":..}` or a `#RRGGBB` / `#RRGGBBAA` hex string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ColorRepr")]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Channels { r: u8, g: u8, b: u8, a: u8 },
}

impl TryFrom<ColorRepr> for Rgba8 {
    type Error = String;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Channels { r, g, b, a } => Ok(Self { r, g, b, a }),
            ColorRepr::Hex(s) => Self::from_hex(&s).ok_or_else(|| format!("invalid hex color '{s}'")),
        }
    }
}

impl Rgba8 {
    /// Parse `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?, a))
    }

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with alpha multiplied by `opacity` in `[0, 1]`.
    pub fn with_opacity(self, opacity: f32) -> Self {
        let a = (f32::from(self.a) * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
