use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use crate::{
    assets::loader::{DecodeToken, ImageLoader, LoadState, LoaderOpts},
    assets::source::ImageSource,
    foundation::core::DetectionSet,
    foundation::error::TimberlensResult,
    render::overlay::{OverlayRenderer, OverlayStyle, RenderOutcome, RenderedFrame},
};

/// Injected "layout changed" signal: the host writes the container width from its resize
/// handler, the view reads it on every [`OverlayView::tick`].
///
/// Cloning shares the same width cell.
#[derive(Clone, Debug, Default)]
pub struct LayoutHandle(Arc<AtomicU32>);

impl LayoutHandle {
    pub fn new(width: u32) -> Self {
        Self(Arc::new(AtomicU32::new(width)))
    }

    pub fn set_width(&self, width: u32) {
        self.0.store(width, Ordering::Relaxed);
    }

    pub fn width(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Inputs a painted frame was produced from. A repaint happens only when this changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RenderKey {
    image_generation: u64,
    detections_rev: u64,
    container_width: u32,
}

/// What the mounted view currently shows.
#[derive(Clone, Copy, Debug)]
pub enum ViewState<'a> {
    /// No image source supplied.
    NoSource,
    /// Waiting for the decode (loading placeholder).
    Loading,
    /// The current source could not be fetched or decoded, or the decoded image could not be
    /// painted at the current container width.
    Failed(&'a str),
    /// The current source did not decode within the configured timeout.
    TimedOut,
    /// Image with overlays.
    Ready(&'a RenderedFrame),
}

impl ViewState<'_> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Live metrics for the mounted view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewStats {
    /// Full repaints performed since construction.
    pub renders: u64,
    /// Decode completions discarded because their source was superseded.
    pub stale_decodes: u64,
    /// Boxes in the current detection set.
    pub boxes: usize,
}

/// Mountable image-with-overlays component.
///
/// Owns the loader→renderer pipeline for one visual slot. Repaints are keyed strictly on the
/// decoded image generation, the detection-set revision and the container width; ticking with
/// none of those changed does nothing. A new source resets everything painted so far.
pub struct OverlayView {
    loader: ImageLoader,
    renderer: OverlayRenderer,
    detections: Arc<DetectionSet>,
    detections_rev: u64,
    layout: LayoutHandle,
    painted: Option<(RenderKey, RenderedFrame)>,
    render_failure: Option<(RenderKey, String)>,
    renders: u64,
}

impl OverlayView {
    pub fn new(loader: ImageLoader, renderer: OverlayRenderer, layout: LayoutHandle) -> Self {
        Self {
            loader,
            renderer,
            detections: Arc::new(DetectionSet::empty()),
            detections_rev: 0,
            layout,
            painted: None,
            render_failure: None,
            renders: 0,
        }
    }

    /// View with env-configured loader options and the given style.
    pub fn with_style(style: OverlayStyle, layout: LayoutHandle) -> TimberlensResult<Self> {
        let loader = ImageLoader::new(LoaderOpts::from_env())?;
        Ok(Self::new(loader, OverlayRenderer::new(style), layout))
    }

    pub fn layout(&self) -> &LayoutHandle {
        &self.layout
    }

    pub fn loader(&self) -> &ImageLoader {
        &self.loader
    }

    /// Swap the image. Anything painted for the previous source is dropped immediately.
    pub fn set_source(&mut self, source: ImageSource) -> DecodeToken {
        self.painted = None;
        self.render_failure = None;
        self.renderer.reset();
        self.loader.begin(source)
    }

    /// Unmount the current image without supplying another.
    pub fn clear_source(&mut self) {
        self.painted = None;
        self.render_failure = None;
        self.renderer.reset();
        self.loader.cancel();
    }

    /// Replace the detection set. Every call counts as a new reference and triggers a repaint.
    pub fn set_detections(&mut self, set: impl Into<Arc<DetectionSet>>) {
        self.detections = set.into();
        self.detections_rev += 1;
    }

    pub fn detections(&self) -> &DetectionSet {
        &self.detections
    }

    /// Apply finished decodes and repaint if any render input changed.
    ///
    /// Returns whether a repaint happened.
    pub fn tick(&mut self) -> TimberlensResult<bool> {
        self.loader.poll();
        let Some(decoded) = self.loader.decoded().cloned() else {
            self.painted = None;
            self.render_failure = None;
            return Ok(false);
        };

        let key = RenderKey {
            image_generation: decoded.generation(),
            detections_rev: self.detections_rev,
            container_width: self.layout.width(),
        };
        if self.painted.as_ref().is_some_and(|(k, _)| *k == key)
            || self.render_failure.as_ref().is_some_and(|(k, _)| *k == key)
        {
            return Ok(false);
        }

        tracing::debug!(?key, "render inputs changed");
        let outcome = match self
            .renderer
            .render(Some(&decoded), &self.detections, key.container_width)
        {
            Ok(outcome) => outcome,
            Err(err) => {
                self.painted = None;
                self.render_failure = Some((key, err.to_string()));
                tracing::warn!(%err, "overlay render failed");
                return Err(err);
            }
        };
        match outcome {
            RenderOutcome::Painted(frame) => {
                self.painted = Some((key, frame));
                self.render_failure = None;
                self.renders += 1;
                Ok(true)
            }
            RenderOutcome::Skipped => Ok(false),
        }
    }

    /// Block until the current source resolves (or `timeout` passes), then tick.
    pub fn wait_ready(&mut self, timeout: Duration) -> TimberlensResult<ViewState<'_>> {
        self.loader.wait(timeout);
        self.tick()?;
        Ok(self.state())
    }

    pub fn state(&self) -> ViewState<'_> {
        match self.loader.state() {
            LoadState::Idle => ViewState::NoSource,
            LoadState::Pending { .. } => ViewState::Loading,
            LoadState::Failed { reason, .. } => ViewState::Failed(reason),
            LoadState::TimedOut { .. } => ViewState::TimedOut,
            LoadState::Ready(_) => match (&self.painted, &self.render_failure) {
                (Some((_, frame)), _) => ViewState::Ready(frame),
                (None, Some((_, reason))) => ViewState::Failed(reason),
                (None, None) => ViewState::Loading,
            },
        }
    }

    pub fn stats(&self) -> ViewStats {
        ViewStats {
            renders: self.renders,
            stale_decodes: self.loader.stale_completions(),
            boxes: self.detections.len(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/view/overlay_view.rs"]
mod tests;
