//! Mountable view tying the loader and the renderer together.

/// Dependency-keyed overlay view.
pub mod overlay_view;
