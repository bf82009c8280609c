//! CPU overlay rendering.
//!
//! Every paint is a full repaint of one decoded image and its detection boxes onto a surface
//! fitted to the container width.

/// Rendered pixel buffer type.
pub mod frame;
/// Fit-to-width layout and box mapping.
pub mod layout;
/// Overlay style and renderer.
pub mod overlay;
