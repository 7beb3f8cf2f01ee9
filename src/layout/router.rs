//! Region Routing and Extraction
//!
//! Dispatches each ordered region to one of three behaviours based on its
//! [`RegionType`]:
//!
//! - OCR: crop, recognize, join lines, keep the best score, dedup per page
//! - Persist: crop and save as `page_<n>_figure_<x1>_<y1>.png`
//! - Drop: nothing
//!
//! All mutable per-page state lives in [`PageContext`], which is created for
//! one page, threaded through every `route` call for that page in reading
//! order, and then discarded.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::{imageops, RgbImage};
use tracing::{debug, warn};

use super::types::{
    DetectedRegion, LayoutError, OcrLine, RegionResult, RegionType, Result, RouteKind,
};
use crate::adapters::{call_with_timeout, TextRecognizer};

/// Category written for table regions regardless of their label
pub const TABLE_CATEGORY: &str = "table";

// ============================================================
// Image Sink
// ============================================================

/// Destination for persisted figure crops
pub trait ImageSink: Send + Sync {
    /// Store `image` under `name`, returning where it went
    fn save(&self, name: &str, image: &RgbImage) -> Result<PathBuf>;
}

/// Sink writing PNG files into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageSink for DirectorySink {
    fn save(&self, name: &str, image: &RgbImage) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        image
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| LayoutError::ImageWrite {
                path: path.clone(),
                message: e.to_string(),
            })?;
        Ok(path)
    }
}

// ============================================================
// Page Context
// ============================================================

/// Per-page routing state
#[derive(Debug)]
pub struct PageContext {
    page_index: usize,
    seen_texts: HashSet<String>,
    figures_saved: usize,
    figure_names: HashSet<String>,
    figure_paths: Vec<PathBuf>,
}

impl PageContext {
    /// Fresh state for the page at `page_index` (0-based)
    pub fn new(page_index: usize) -> Self {
        Self {
            page_index,
            seen_texts: HashSet::new(),
            figures_saved: 0,
            figure_names: HashSet::new(),
            figure_paths: Vec::new(),
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Record `text` as emitted; false if it was already emitted on this page
    pub fn claim_text(&mut self, text: &str) -> bool {
        if self.seen_texts.contains(text) {
            return false;
        }
        self.seen_texts.insert(text.to_string());
        true
    }

    pub fn figures_saved(&self) -> usize {
        self.figures_saved
    }

    /// Next figure file name for a region whose truncated origin is (x1, y1)
    fn next_figure_name(&mut self, x1: i32, y1: i32) -> String {
        let page_no = self.page_index + 1;
        let mut name = format!("page_{}_figure_{}_{}.png", page_no, x1, y1);
        let mut suffix = 1;
        while self.figure_names.contains(&name) {
            name = format!("page_{}_figure_{}_{}_{}.png", page_no, x1, y1, suffix);
            suffix += 1;
        }
        self.figure_names.insert(name.clone());
        name
    }

    fn record_figure(&mut self, path: PathBuf) {
        self.figures_saved += 1;
        self.figure_paths.push(path);
    }

    /// Figure files written so far, consuming the context
    pub fn into_figures(self) -> Vec<PathBuf> {
        self.figure_paths
    }
}

// ============================================================
// Region Router
// ============================================================

/// Extraction engine applying the per-type dispatch policy
pub struct RegionRouter {
    recognizer: Arc<dyn TextRecognizer>,
    sink: Arc<dyn ImageSink>,
    ocr_timeout: Option<Duration>,
}

impl RegionRouter {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, sink: Arc<dyn ImageSink>) -> Self {
        Self {
            recognizer,
            sink,
            ocr_timeout: None,
        }
    }

    /// Bound each OCR call; an expired call counts as "no lines"
    #[must_use]
    pub fn with_ocr_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ocr_timeout = timeout;
        self
    }

    /// Route one region.
    ///
    /// `Ok(None)` covers every non-error outcome that emits nothing: dropped
    /// types, figures, empty OCR, duplicate text and OCR timeouts. An `Err`
    /// fails this region only.
    pub fn route(
        &self,
        region: &DetectedRegion,
        region_type: RegionType,
        page: &RgbImage,
        ctx: &mut PageContext,
    ) -> Result<Option<RegionResult>> {
        match region_type.route() {
            RouteKind::Ocr => {
                let category = match region_type {
                    RegionType::Table => TABLE_CATEGORY.to_string(),
                    other => other.category_type(),
                };
                self.extract_text(region, category, page, ctx)
            }
            RouteKind::Persist => {
                self.persist_figure(region, page, ctx)?;
                Ok(None)
            }
            RouteKind::Drop => {
                debug!(class_id = region.class_id, kind = %region_type, "dropping region");
                Ok(None)
            }
        }
    }

    /// OCR branch
    fn extract_text(
        &self,
        region: &DetectedRegion,
        category: String,
        page: &RgbImage,
        ctx: &mut PageContext,
    ) -> Result<Option<RegionResult>> {
        let Some(crop) = crop_region(page, region) else {
            debug!(bbox = ?region.bbox, "region outside page, nothing to recognize");
            return Ok(None);
        };

        let lines = match self.recognize(crop) {
            Ok(lines) => lines,
            Err(LayoutError::Adapter(e)) if e.is_timeout() => {
                warn!(page = ctx.page_index(), bbox = ?region.bbox, "OCR timed out, region skipped");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let Some((text, score)) = merge_lines(&lines) else {
            return Ok(None);
        };

        if !ctx.claim_text(&text) {
            debug!(page = ctx.page_index(), text = %text, "duplicate text dropped");
            return Ok(None);
        }

        Ok(Some(RegionResult::with_text(category, &region.bbox, text, score)))
    }

    /// Recognizers enforcing their own deadline skip the thread guard
    fn recognize(&self, crop: RgbImage) -> Result<Vec<OcrLine>> {
        let guard = if self.recognizer.enforces_deadline() {
            None
        } else {
            self.ocr_timeout
        };
        let recognizer = Arc::clone(&self.recognizer);
        let lines = call_with_timeout("ocr", guard, move || {
            recognizer.recognize(&crop)
        })?;
        Ok(lines)
    }

    /// Persistence branch
    fn persist_figure(
        &self,
        region: &DetectedRegion,
        page: &RgbImage,
        ctx: &mut PageContext,
    ) -> Result<PathBuf> {
        let crop = crop_region(page, region).ok_or(LayoutError::EmptyCrop(region.bbox))?;
        let [x1, y1, _, _] = region.bbox.to_pixels();
        let name = ctx.next_figure_name(x1, y1);
        let path = self.sink.save(&name, &crop)?;
        debug!(path = %path.display(), "figure saved");
        ctx.record_figure(path.clone());
        Ok(path)
    }
}

// ============================================================
// Helpers
// ============================================================

/// Cut a region out of the page, clamped to the page bounds
pub fn crop_region(page: &RgbImage, region: &DetectedRegion) -> Option<RgbImage> {
    let rect = region.bbox.clamp_to(page.width(), page.height())?;
    Some(imageops::crop_imm(page, rect.x, rect.y, rect.width, rect.height).to_image())
}

/// Space-join line texts in order and take the maximum score.
///
/// `None` when there are no lines.
pub fn merge_lines(lines: &[OcrLine]) -> Option<(String, f64)> {
    if lines.is_empty() {
        return None;
    }

    let text = lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let score = lines
        .iter()
        .map(|l| l.score)
        .fold(f64::NEG_INFINITY, f64::max);

    Some((text, score))
}

// ============================================================
// Tests
// ============================================================
