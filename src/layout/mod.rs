//! Layout Analysis module
//!
//! Turns detector output for one page into structured region results.
//!
//! # Stages
//!
//! - Classification: detector class id to [`RegionType`]
//! - Reading order: stable sort by top edge
//! - Routing: OCR, figure persistence or drop per region, with page-scoped
//!   text dedup held in a [`PageContext`]
//! - Assembly: results plus page metadata into a [`PageRecord`]
//!
//! Annotation draws all detections onto a copy of the page for inspection.
//!
//! # Example
//!
//! ```rust,no_run
//! use layout_extract::{
//!     DirectorySink, PageContext, ReadingOrderSorter, RegionClassifier, RegionRouter,
//!     TesseractRecognizer,
//! };
//! use std::sync::Arc;
//!
//! let page = image::open("page_1.png").unwrap().to_rgb8();
//! let regions = vec![]; // from a RegionDetector
//!
//! let router = RegionRouter::new(
//!     Arc::new(TesseractRecognizer::default()),
//!     Arc::new(DirectorySink::new("out")),
//! );
//! let mut ctx = PageContext::new(0);
//! for region in ReadingOrderSorter::order(&regions) {
//!     let kind = RegionClassifier::classify(region.class_id);
//!     if let Ok(Some(result)) = router.route(&region, kind, &page, &mut ctx) {
//!         println!("{}: {:?}", result.category_type, result.text);
//!     }
//! }
//! ```

mod annotate;
mod assemble;
mod classify;
mod reading_order;
mod router;
mod types;

// Re-export public API
pub use annotate::{detection_label, type_color, PageAnnotator};
pub use assemble::PageAssembler;
pub use classify::{RegionClassifier, KNOWN_CLASS_COUNT};
pub use reading_order::ReadingOrderSorter;
pub use router::{
    crop_region, merge_lines, DirectorySink, ImageSink, PageContext, RegionRouter, TABLE_CATEGORY,
};
pub use types::{
    BoundingBox, DetectedRegion, LayoutError, OcrLine, PageInfo, PageRecord, PixelRect,
    RegionFailure, RegionResult, RegionType, Result, RouteKind,
};
