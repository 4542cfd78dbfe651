//! Bbox normalisation shared by every resource that carries pixel-space
//! dialog positions (spec §8 testable property 1: `0<=minX<=maxX<=1`,
//! `0<=minY<=maxY<=1`). Mirrors the clamp-then-reorder shape used by the
//! orchestrator's merge-step bbox handling, applied here to the typed
//! `Bbox` the screenshot parser returns instead of a raw LLM JSON value.

use crate::dimensions::ImageDimensions;
use crate::screenshot::Bbox;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedBbox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl NormalizedBbox {
    pub fn as_array(self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Normalises a screenshot-parser bbox. Coordinates already in `[0,1]` pass
/// through unchanged aside from clamping/reordering; pixel coordinates are
/// divided down by `dims` first.
pub fn normalize_bbox(bbox: &Bbox, dims: ImageDimensions) -> NormalizedBbox {
    let looks_normalized = bbox.x1 <= 1.0 && bbox.y1 <= 1.0 && bbox.x2 <= 1.0 && bbox.y2 <= 1.0;
    let (x1, y1, x2, y2) = if looks_normalized {
        (bbox.x1, bbox.y1, bbox.x2, bbox.y2)
    } else {
        (bbox.x1 / dims.width as f64, bbox.y1 / dims.height as f64, bbox.x2 / dims.width as f64, bbox.y2 / dims.height as f64)
    };

    let (x1, x2) = (clamp01(x1), clamp01(x2));
    let (y1, y2) = (clamp01(y1), clamp01(y2));

    NormalizedBbox { x1: x1.min(x2), y1: y1.min(y2), x2: x1.max(x2), y2: y1.max(y2) }
}
