//! Output serialization
//!
//! Writes a processed document as:
//!
//! - `output.json`: one `{"layout_dets": [...], "page_info": {...}}` object
//!   per page, in document order, indented with 4 spaces
//! - `page_<N>_annotated.png`: one annotated image per page (N is 1-based)
//!
//! `output.json` is written first. A page image that cannot be written is
//! recorded in [`OutputSummary::image_failures`] and does not stop the others.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::layout::{PageInfo, PageRecord, RegionResult};
use crate::pipeline::{DocumentResult, PageFailure};

/// Name of the structured result file
pub const OUTPUT_JSON: &str = "output.json";

// ============================================================
// Error Types
// ============================================================

/// Output error types
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write image {path}: {message}")]
    ImageWrite { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OutputError>;

// ============================================================
// Serialized Shape
// ============================================================

/// A page as it appears in `output.json`
#[derive(Debug, Serialize)]
struct PageJson<'a> {
    layout_dets: &'a [RegionResult],
    page_info: &'a PageInfo,
}

impl<'a> From<&'a PageRecord> for PageJson<'a> {
    fn from(page: &'a PageRecord) -> Self {
        Self {
            layout_dets: &page.layout_dets,
            page_info: &page.page_info,
        }
    }
}

/// Files produced by [`OutputWriter::write`]
#[derive(Debug, Clone, Default)]
pub struct OutputSummary {
    pub json_path: PathBuf,
    pub annotated_images: Vec<PathBuf>,
    pub pages_written: usize,
    pub regions_written: usize,
    /// Pages whose annotated image could not be written
    pub image_failures: Vec<PageFailure>,
}

impl OutputSummary {
    /// True when every requested file was written
    pub fn is_complete(&self) -> bool {
        self.image_failures.is_empty()
    }
}

// ============================================================
// Output Writer
// ============================================================

/// Serializer for processed documents
#[derive(Debug, Clone)]
pub struct OutputWriter {
    output_dir: PathBuf,
    save_annotated: bool,
}

impl OutputWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            save_annotated: true,
        }
    }

    /// Enable or disable annotated page images
    #[must_use]
    pub fn save_annotated(mut self, save: bool) -> Self {
        self.save_annotated = save;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Annotated image file name for a 0-based page number
    pub fn annotated_name(page_no: usize) -> String {
        format!("page_{}_annotated.png", page_no + 1)
    }

    /// Render pages as the `output.json` document
    pub fn to_json_string(pages: &[PageRecord]) -> Result<String> {
        let doc: Vec<PageJson<'_>> = pages.iter().map(PageJson::from).collect();

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        doc.serialize(&mut ser)?;

        // serde_json only emits valid UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write `output.json` and, if enabled, one annotated image per page.
    ///
    /// Only a failure to write `output.json` itself is an error.
    pub fn write(&self, document: &DocumentResult) -> Result<OutputSummary> {
        std::fs::create_dir_all(&self.output_dir)?;

        let json = Self::to_json_string(&document.pages)?;
        let json_path = self.output_dir.join(OUTPUT_JSON);
        std::fs::write(&json_path, json)?;

        let mut annotated_images = Vec::new();
        let mut image_failures = Vec::new();
        if self.save_annotated {
            for page in &document.pages {
                match self.write_annotated(page) {
                    Ok(path) => annotated_images.push(path),
                    Err(e) => {
                        warn!(page = page.page_no(), "{}", e);
                        image_failures.push(PageFailure {
                            page_no: page.page_no(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        let regions_written = document.pages.iter().map(|p| p.layout_dets.len()).sum();
        info!(
            path = %json_path.display(),
            pages = document.pages.len(),
            regions = regions_written,
            "output written"
        );

        Ok(OutputSummary {
            json_path,
            annotated_images,
            pages_written: document.pages.len(),
            regions_written,
            image_failures,
        })
    }

    fn write_annotated(&self, page: &PageRecord) -> Result<PathBuf> {
        let path = self.output_dir.join(Self::annotated_name(page.page_no()));
        page.annotated
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| OutputError::ImageWrite {
                path: path.clone(),
                message: e.to_string(),
            })?;
        Ok(path)
    }
}

// ============================================================
// Tests
// ============================================================
