use std::path::Path;

use anyhow::Context;

use crate::{
    assets::decode::DecodedImage,
    foundation::core::{DetectionSet, Rect, Rgba8},
    foundation::error::{TimberlensError, TimberlensResult},
    render::frame::FrameRGBA,
    render::layout::FitLayout,
};

/// Paint parameters for detection overlays.
///
/// Each box gets a wide dark "shadow" stroke, a narrow accent "highlight" stroke on top, and a
/// translucent accent fill. The dark-under-bright pair keeps outlines visible on both light and
/// dark regions of the photo.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Highlight stroke and fill hue.
    pub accent: Rgba8,
    /// Shadow stroke color.
    pub shadow: Rgba8,
    /// Shadow stroke width in surface pixels.
    pub shadow_width: f64,
    /// Highlight stroke width in surface pixels.
    pub highlight_width: f64,
    /// Fill opacity applied on top of the accent's alpha.
    pub fill_opacity: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            accent: Rgba8::new(0xFF, 0xC1, 0x07, 0xFF),
            shadow: Rgba8::new(0, 0, 0, 0xFF).with_opacity(0.5),
            shadow_width: 5.0,
            highlight_width: 2.0,
            fill_opacity: 0.15,
        }
    }
}

impl OverlayStyle {
    pub fn from_json_str(s: &str) -> TimberlensResult<Self> {
        let style: Self =
            serde_json::from_str(s).map_err(|e| TimberlensError::serde(e.to_string()))?;
        style.validate()?;
        Ok(style)
    }

    pub fn from_path(path: impl AsRef<Path>) -> TimberlensResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read overlay style '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> TimberlensResult<()> {
        for (name, w) in [
            ("shadow_width", self.shadow_width),
            ("highlight_width", self.highlight_width),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(TimberlensError::validation(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.fill_opacity) {
            return Err(TimberlensError::validation(
                "fill_opacity must be within [0, 1]",
            ));
        }
        Ok(())
    }

    fn fill(&self) -> Rgba8 {
        self.accent.with_opacity(self.fill_opacity)
    }
}

/// One painted frame plus the geometry that produced it.
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    /// Surface pixels (premultiplied).
    pub frame: FrameRGBA,
    /// Scale and surface size used for this frame.
    pub layout: FitLayout,
    /// Painted box rectangles in surface space, in detection order.
    pub rects: Vec<Rect>,
}

#[derive(Clone, Debug)]
pub enum RenderOutcome {
    /// No decoded image yet; nothing was touched.
    Skipped,
    Painted(RenderedFrame),
}

impl RenderOutcome {
    pub fn into_frame(self) -> Option<RenderedFrame> {
        match self {
            Self::Skipped => None,
            Self::Painted(f) => Some(f),
        }
    }
}

struct Surface {
    width: u16,
    height: u16,
    pixmap: vello_cpu::Pixmap,
}

impl Surface {
    fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixmap: vello_cpu::Pixmap::new(width, height),
        }
    }
}

/// Immediate-mode overlay painter.
///
/// Every [`OverlayRenderer::render`] call is a full repaint of (bitmap, boxes, container width);
/// nothing painted survives between calls. The only retained state is the pixmap allocation,
/// reused while the surface size is unchanged.
pub struct OverlayRenderer {
    style: OverlayStyle,
    surface: Option<Surface>,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(OverlayStyle::default())
    }
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self {
            style,
            surface: None,
        }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Release the surface allocation (used when the source image changes).
    pub fn reset(&mut self) {
        self.surface = None;
    }

    /// Paint `decoded` fitted to `container_width`, then every box in `boxes` on top.
    ///
    /// `decoded == None` is the expected state before the image loads and returns
    /// [`RenderOutcome::Skipped`] without touching the surface.
    #[tracing::instrument(skip(self, decoded, boxes), fields(boxes = boxes.len()))]
    pub fn render(
        &mut self,
        decoded: Option<&DecodedImage>,
        boxes: &DetectionSet,
        container_width: u32,
    ) -> TimberlensResult<RenderOutcome> {
        let Some(decoded) = decoded else {
            return Ok(RenderOutcome::Skipped);
        };

        let layout = FitLayout::fit_width(decoded.width(), decoded.height(), container_width);
        if layout.is_empty() {
            self.surface = None;
            tracing::debug!(?layout, "zero-area surface, nothing to paint");
            return Ok(RenderOutcome::Painted(RenderedFrame {
                frame: FrameRGBA::empty(layout.width, layout.height),
                layout,
                rects: Vec::new(),
            }));
        }

        let width: u16 = layout
            .width
            .try_into()
            .map_err(|_| TimberlensError::render("surface width exceeds u16"))?;
        let height: u16 = layout
            .height
            .try_into()
            .map_err(|_| TimberlensError::render("surface height exceeds u16"))?;

        let mut rects = Vec::with_capacity(boxes.len());
        for (idx, bbox) in boxes.iter().enumerate() {
            if !bbox.is_finite() {
                tracing::warn!(idx, ?bbox, "skipping box with non-finite coordinates");
                continue;
            }
            rects.push(layout.map_box(*bbox));
        }

        let stale = self
            .surface
            .as_ref()
            .is_none_or(|s| s.width != width || s.height != height);
        if stale {
            self.surface = Some(Surface::new(width, height));
        }
        let surface = self
            .surface
            .as_mut()
            .ok_or_else(|| TimberlensError::render("surface was not initialized"))?;
        clear_pixmap(&mut surface.pixmap);

        let mut ctx = vello_cpu::RenderContext::new(width, height);
        paint_base(&mut ctx, decoded, &layout);
        for rect in &rects {
            paint_box(&mut ctx, &self.style, *rect);
        }
        ctx.flush();
        ctx.render_to_pixmap(&mut surface.pixmap);

        tracing::debug!(
            scale = layout.scale,
            width = layout.width,
            height = layout.height,
            painted = rects.len(),
            "overlay painted"
        );

        Ok(RenderOutcome::Painted(RenderedFrame {
            frame: FrameRGBA {
                width: layout.width,
                height: layout.height,
                data: surface.pixmap.data_as_u8_slice().to_vec(),
                premultiplied: true,
            },
            layout,
            rects,
        }))
    }
}

fn paint_base(ctx: &mut vello_cpu::RenderContext, decoded: &DecodedImage, layout: &FitLayout) {
    let (nw, nh) = (f64::from(decoded.width()), f64::from(decoded.height()));
    let sx = f64::from(layout.width) / nw;
    let sy = f64::from(layout.height) / nh;

    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(vello_cpu::kurbo::Affine::scale_non_uniform(sx, sy));
    ctx.set_paint(decoded.paint());
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, nw, nh));
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
}

fn paint_box(ctx: &mut vello_cpu::RenderContext, style: &OverlayStyle, rect: Rect) {
    let r = rect_to_cpu(rect);

    ctx.set_stroke(vello_cpu::kurbo::Stroke::new(style.shadow_width));
    ctx.set_paint(color_to_cpu(style.shadow));
    ctx.stroke_rect(&r);

    ctx.set_stroke(vello_cpu::kurbo::Stroke::new(style.highlight_width));
    ctx.set_paint(color_to_cpu(style.accent));
    ctx.stroke_rect(&r);

    ctx.set_paint(color_to_cpu(style.fill()));
    ctx.fill_rect(&r);
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn color_to_cpu(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap) {
    pixmap.data_as_u8_slice_mut().fill(0);
}

#[cfg(test)]
#[path = "../../tests/unit/render/overlay.rs"]
mod tests;
