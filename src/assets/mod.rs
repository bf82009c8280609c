//! Image sources, decoding, and the generation-guarded asynchronous loader.

/// Bitmap decoding (raster formats via `image`, SVG via `resvg`).
pub mod decode;
/// Background loader and its load state machine.
pub mod loader;
/// Image references and byte fetchers.
pub mod source;
