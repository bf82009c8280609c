use std::{io::Cursor, sync::Arc};

use anyhow::Context;

use crate::{
    assets::source::looks_like_svg,
    foundation::error::{TimberlensError, TimberlensResult},
    foundation::math::premultiply_rgba8_in_place,
};

/// Largest edge the raster surface can hold (`vello_cpu` pixmaps use 16-bit dimensions).
pub const MAX_IMAGE_DIM: u32 = u16::MAX as u32;

/// A fully decoded bitmap with known natural dimensions, ready to paint.
///
/// `width` and `height` are always > 0. Pixels are premultiplied RGBA8.
#[derive(Clone)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    generation: u64,
    pixmap: Arc<vello_cpu::Pixmap>,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("generation", &self.generation)
            .finish()
    }
}

impl DecodedImage {
    /// Build from tightly packed premultiplied RGBA8 bytes.
    pub fn from_premul_rgba8(width: u32, height: u32, rgba8_premul: &[u8]) -> TimberlensResult<Self> {
        let pixmap = premul_bytes_to_pixmap(rgba8_premul, width, height)?;
        Ok(Self {
            width,
            height,
            generation: 0,
            pixmap: Arc::new(pixmap),
        })
    }

    /// Natural width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Natural height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Loader generation this bitmap was decoded for (0 when decoded outside a loader).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Premultiplied RGBA8 bytes, row-major.
    pub fn rgba8_premul(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub(crate) fn paint(&self) -> vello_cpu::Image {
        vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(self.pixmap.clone()),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        }
    }
}

/// Decode encoded image bytes (PNG, JPEG, WebP, ... or SVG) into a [`DecodedImage`].
///
/// `mime` is an optional hint from the source; content sniffing decides when it is absent.
/// Images with more than `max_pixels` pixels are rejected before the full decode.
pub fn decode_image(
    bytes: &[u8],
    mime: Option<&str>,
    max_pixels: u64,
) -> TimberlensResult<DecodedImage> {
    if bytes.is_empty() {
        return Err(TimberlensError::decode("image payload is empty"));
    }
    if looks_like_svg(mime, bytes) {
        return decode_svg(bytes, max_pixels);
    }

    let (w, h) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("sniff image format")?
        .into_dimensions()
        .map_err(|e| TimberlensError::decode(format!("read image header: {e}")))?;
    check_dimensions(w, h, max_pixels)?;

    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| TimberlensError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    check_dimensions(width, height, max_pixels)?;

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);
    DecodedImage::from_premul_rgba8(width, height, &rgba8_premul)
}

fn decode_svg(bytes: &[u8], max_pixels: u64) -> TimberlensResult<DecodedImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| TimberlensError::decode(format!("parse svg tree: {e}")))?;

    let size = tree.size();
    let (w, h) = (size.width(), size.height());
    if !w.is_finite() || !h.is_finite() || w <= 0.0 || h <= 0.0 {
        return Err(TimberlensError::decode("svg has invalid width/height"));
    }
    let width = w.ceil() as u32;
    let height = h.ceil() as u32;
    check_dimensions(width, height, max_pixels)?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| TimberlensError::decode("failed to allocate svg pixmap"))?;
    let xform = resvg::tiny_skia::Transform::from_scale(width as f32 / w, height as f32 / h);
    resvg::render(&tree, xform, &mut pixmap.as_mut());

    DecodedImage::from_premul_rgba8(width, height, pixmap.data())
}

fn check_dimensions(width: u32, height: u32, max_pixels: u64) -> TimberlensResult<()> {
    if width == 0 || height == 0 {
        return Err(TimberlensError::decode(format!(
            "image has zero-sized dimensions {width}x{height}"
        )));
    }
    if width > MAX_IMAGE_DIM || height > MAX_IMAGE_DIM {
        return Err(TimberlensError::decode(format!(
            "image too large: {width}x{height} (max {MAX_IMAGE_DIM}x{MAX_IMAGE_DIM})"
        )));
    }
    let pixels = u64::from(width) * u64::from(height);
    if pixels > max_pixels {
        return Err(TimberlensError::decode(format!(
            "image has {pixels} pixels, limit is {max_pixels}"
        )));
    }
    Ok(())
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> TimberlensResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| TimberlensError::decode("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| TimberlensError::decode("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(TimberlensError::decode("decoded image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
