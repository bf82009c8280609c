/// Convenience result type used across timberlens.
pub type TimberlensResult<T> = Result<T, TimberlensError>;

/// Top-level error taxonomy used by loader, renderer and view APIs.
#[derive(thiserror::Error, Debug)]
pub enum TimberlensError {
    /// Invalid caller-provided data (empty sources, bad options).
    #[error("validation error: {0}")]
    Validation(String),

    /// Source bytes could not be decoded into a bitmap.
    #[error("decode error: {0}")]
    Decode(String),

    /// Source bytes could not be obtained (unreadable path, unsupported scheme).
    #[error("source error: {0}")]
    Source(String),

    /// Errors while sizing or painting the drawing surface.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TimberlensError {
    /// Build a [`TimberlensError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TimberlensError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`TimberlensError::Source`] value.
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Build a [`TimberlensError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`TimberlensError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
