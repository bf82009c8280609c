use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use base64::{Engine as _, engine::general_purpose};
use percent_encoding::percent_decode_str;

use crate::foundation::error::{TimberlensError, TimberlensResult};

/// Opaque reference to image bytes: a data URI, a filesystem path, or a remote URL.
///
/// Immutable once built; cloning shares the underlying string. A new value fully supersedes the
/// old one when handed to a loader.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageSource(Arc<str>);

/// Classified form of an [`ImageSource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceKind<'a> {
    /// `data:<mime>[;param]*[;base64],<payload>`.
    DataUri {
        /// Declared media type without parameters, empty when omitted.
        mime: &'a str,
        /// Whether `payload` is base64-encoded.
        base64: bool,
        /// Everything after the first `,`, still encoded (base64 or percent-encoding).
        payload: &'a str,
    },
    /// `http://` or `https://` reference.
    Remote(&'a str),
    /// Local filesystem path (a `file://` prefix is stripped).
    Path(PathBuf),
}

impl ImageSource {
    /// Build a source, rejecting empty or whitespace-only references.
    pub fn new(reference: impl AsRef<str>) -> TimberlensResult<Self> {
        let s = reference.as_ref().trim();
        if s.is_empty() {
            return Err(TimberlensError::validation("image source must be non-empty"));
        }
        Ok(Self(Arc::from(s)))
    }

    /// Build a `data:` URI source from raw bytes.
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        let encoded = general_purpose::STANDARD.encode(bytes);
        Self(Arc::from(format!("data:{mime};base64,{encoded}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify the reference without touching any IO.
    pub fn kind(&self) -> TimberlensResult<SourceKind<'_>> {
        let s = self.as_str();
        if let Some(rest) = s.strip_prefix("data:") {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| TimberlensError::source("data uri is missing ',' separator"))?;
            let mime = meta.split(';').next().unwrap_or_default().trim();
            let base64 = meta
                .rsplit_once(';')
                .is_some_and(|(_, param)| param.trim().eq_ignore_ascii_case("base64"));
            return Ok(SourceKind::DataUri {
                mime,
                base64,
                payload,
            });
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            return Ok(SourceKind::Remote(s));
        }
        let path = s.strip_prefix("file://").unwrap_or(s);
        Ok(SourceKind::Path(PathBuf::from(path)))
    }

    /// Short label for logs: data URIs are reduced to their media type and size.
    pub fn describe(&self) -> String {
        match self.kind() {
            Ok(SourceKind::DataUri { mime, payload, .. }) => {
                format!("data:{mime} ({} chars)", payload.len())
            }
            _ => self.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Resolves an [`ImageSource`] into raw encoded bytes.
///
/// Runs on a decode worker thread, so implementations must be `Send + Sync`.
pub trait SourceFetcher: Send + Sync {
    fn fetch(&self, source: &ImageSource) -> TimberlensResult<Vec<u8>>;
}

/// Default fetcher: data URIs and local files. Remote URLs are rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFetcher;

impl SourceFetcher for LocalFetcher {
    fn fetch(&self, source: &ImageSource) -> TimberlensResult<Vec<u8>> {
        match source.kind()? {
            SourceKind::DataUri {
                base64: true,
                payload,
                ..
            } => general_purpose::STANDARD
                .decode(payload.trim())
                .map_err(|e| TimberlensError::source(format!("invalid base64 payload: {e}"))),
            SourceKind::DataUri {
                base64: false,
                payload,
                ..
            } => Ok(percent_decode_str(payload).collect()),
            SourceKind::Remote(url) => Err(TimberlensError::source(format!(
                "no fetcher configured for remote source '{url}'"
            ))),
            SourceKind::Path(path) => {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("read image '{}'", path.display()))?;
                Ok(bytes)
            }
        }
    }
}

/// Guess whether `mime`/`bytes` describe an SVG document rather than a raster image.
pub(crate) fn looks_like_svg(mime: Option<&str>, bytes: &[u8]) -> bool {
    if mime.is_some_and(|m| m.eq_ignore_ascii_case("image/svg+xml")) {
        return true;
    }
    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
