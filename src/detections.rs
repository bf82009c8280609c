//! Wire format of a detection response: a box count plus the box list.

use std::path::Path;

use anyhow::Context;

use crate::foundation::{
    core::{BoundingBox, DetectionSet},
    error::{TimberlensError, TimberlensResult},
};

/// Detection result as delivered by the remote service or the simulator.
///
/// `count` is informational; `boxes` is authoritative.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectionResponse {
    #[serde(default)]
    pub count: Option<u32>,
    pub boxes: Vec<BoundingBox>,
}

impl DetectionResponse {
    pub fn from_json_str(s: &str) -> TimberlensResult<Self> {
        let resp: Self =
            serde_json::from_str(s).map_err(|e| TimberlensError::serde(e.to_string()))?;
        if let Some(count) = resp.count
            && count as usize != resp.boxes.len()
        {
            tracing::warn!(
                count,
                boxes = resp.boxes.len(),
                "detection count disagrees with box list; using box list"
            );
        }
        Ok(resp)
    }

    pub fn from_path(path: impl AsRef<Path>) -> TimberlensResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read detections '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn into_set(self) -> DetectionSet {
        DetectionSet::from(self.boxes)
    }
}

#[cfg(test)]
#[path = "../tests/unit/detections.rs"]
mod tests;
