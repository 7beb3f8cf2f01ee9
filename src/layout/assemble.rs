//! Page Result Assembly

use std::path::PathBuf;

use image::RgbImage;

use super::types::{PageInfo, PageRecord, RegionFailure, RegionResult};

/// Packages routed region results into a [`PageRecord`]
pub struct PageAssembler;

impl PageAssembler {
    /// Build the record for one page.
    ///
    /// No filtering or reordering happens here; `results` must already be in
    /// reading order with duplicates removed.
    pub fn assemble(
        page_no: usize,
        width: u32,
        height: u32,
        results: Vec<RegionResult>,
        annotated: RgbImage,
        figures: Vec<PathBuf>,
        failures: Vec<RegionFailure>,
    ) -> PageRecord {
        PageRecord {
            page_info: PageInfo {
                page_no,
                height,
                width,
            },
            layout_dets: results,
            annotated,
            figures,
            failures,
        }
    }
}
