//! Reading Order Sorting
//!
//! Orders detected regions top-to-bottom by their top edge.

use super::types::DetectedRegion;
#[cfg(test)]
use super::types::BoundingBox;

// ============================================================
// Reading Order Sorter
// ============================================================

/// Sorter for arranging detected regions in reading order
pub struct ReadingOrderSorter;

impl ReadingOrderSorter {
    /// Return the regions ordered by top edge (`y1`) ascending.
    ///
    /// The sort is stable: regions sharing a `y1` keep detector emission
    /// order. NaN coordinates sort after every finite value.
    pub fn order(regions: &[DetectedRegion]) -> Vec<DetectedRegion> {
        let mut ordered = regions.to_vec();
        Self::sort(&mut ordered);
        ordered
    }

    /// In-place variant of [`order`](Self::order)
    pub fn sort(regions: &mut [DetectedRegion]) {
        regions.sort_by(|a, b| Self::top_key(a).total_cmp(&Self::top_key(b)));
    }

    /// `total_cmp` key: NaN becomes +inf and `-0.0` folds into `0.0`
    fn top_key(region: &DetectedRegion) -> f64 {
        if region.bbox.y1.is_nan() {
            f64::INFINITY
        } else {
            region.bbox.y1 + 0.0
        }
    }
}

// ============================================================
// Tests
// ============================================================
