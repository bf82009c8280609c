use crate::foundation::core::{BoundingBox, Rect};

/// Surface size and scale for an image fitted to a container width.
///
/// `scale = container_width / natural_width`; the surface is `container_width` wide and
/// `round(natural_height * scale)` tall, so the image's aspect ratio survives up to rounding.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct FitLayout {
    /// Image-space to surface-space scale factor.
    pub scale: f64,
    /// Surface width in pixels (always the container width).
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
}

impl FitLayout {
    /// Fit an image of `natural_width x natural_height` into `container_width`.
    ///
    /// A zero container width (layout not settled yet) yields a zero-area layout. A zero natural
    /// width has no meaningful scale and also yields a zero-area layout.
    pub fn fit_width(natural_width: u32, natural_height: u32, container_width: u32) -> Self {
        if natural_width == 0 {
            return Self {
                scale: 0.0,
                width: container_width,
                height: 0,
            };
        }
        let scale = f64::from(container_width) / f64::from(natural_width);
        let height = (f64::from(natural_height) * scale).round() as u32;
        Self {
            scale,
            width: container_width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Map an image-space box into surface space with this layout's scale.
    pub fn map_box(&self, bbox: BoundingBox) -> Rect {
        map_box(bbox, self.scale)
    }

    /// Whole surface as a rectangle.
    pub fn surface_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

/// Transform a box into surface space: origin `(x1*s, y1*s)`, size `((x2-x1)*s, (y2-y1)*s)`.
///
/// Inverted boxes are normalized first, so the resulting size is never negative.
pub fn map_box(bbox: BoundingBox, scale: f64) -> Rect {
    let b = bbox.normalized();
    Rect::from_origin_size(
        (b.x1 * scale, b.y1 * scale),
        ((b.x2 - b.x1) * scale, (b.y2 - b.y1) * scale),
    )
}

#[cfg(test)]
#[path = "../../tests/unit/render/layout.rs"]
mod tests;
