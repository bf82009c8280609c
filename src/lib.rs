//! Timberlens maps detection boxes from image pixel space onto a width-fitted canvas and paints
//! them over the decoded image.
//!
//! The pieces compose as:
//!
//! - An [`ImageLoader`] decodes an [`ImageSource`] on a worker pool; only the latest source's
//!   completion is ever applied.
//! - An [`OverlayRenderer`] scales the bitmap to the container width and draws each
//!   [`BoundingBox`] as a shadow stroke, a highlight stroke and a translucent fill.
//! - An [`OverlayView`] repaints only when the decoded image, the [`DetectionSet`] or the
//!   container width changes.
#![forbid(unsafe_code)]

mod foundation;

/// Image sources, decoding and loading.
pub mod assets;
/// Detection response wire format.
pub mod detections;
/// Overlay rendering.
pub mod render;
/// Mountable overlay view.
pub mod view;

pub use crate::foundation::core::{BoundingBox, DetectionSet, Rect, Rgba8};
pub use crate::foundation::error::{TimberlensError, TimberlensResult};

pub use crate::assets::decode::{DecodedImage, MAX_IMAGE_DIM, decode_image};
pub use crate::assets::loader::{
    Completion, DecodeToken, ImageLoader, LoadSlot, LoadState, LoaderOpts,
};
pub use crate::assets::source::{ImageSource, LocalFetcher, SourceFetcher, SourceKind};
pub use crate::detections::DetectionResponse;
pub use crate::render::frame::FrameRGBA;
pub use crate::render::layout::{FitLayout, map_box};
pub use crate::render::overlay::{OverlayRenderer, OverlayStyle, RenderOutcome, RenderedFrame};
pub use crate::view::overlay_view::{LayoutHandle, OverlayView, ViewState, ViewStats};
