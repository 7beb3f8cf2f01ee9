//! External collaborator adapters
//!
//! The layout pipeline talks to three collaborators through the traits in
//! this module:
//!
//! - [`Rasterizer`] - document pages to RGB images
//! - [`RegionDetector`] - page image to layout regions
//! - [`TextRecognizer`] - region crop to recognized text lines
//!
//! Concrete implementations shell out to external tools:
//!
//! - [`PdftoppmRasterizer`] (Poppler `pdftoppm`, page count via `lopdf`)
//! - [`CommandDetector`] (any command speaking the JSON region protocol)
//! - [`TesseractRecognizer`] (Tesseract TSV output)
//!
//! # Example
//!
//! ```rust,no_run
//! use layout_extract::{RegionDetector, CommandDetector};
//!
//! let detector = CommandDetector::new("doclayout-detect").confidence_threshold(0.25);
//! let page = image::RgbImage::new(1224, 1584);
//! let regions = detector.detect(&page).unwrap();
//! println!("{} regions", regions.len());
//! ```

use std::path::Path;

use image::RgbImage;
use thiserror::Error;

use crate::layout::{DetectedRegion, OcrLine};

mod command_detector;
mod pdftoppm;
mod process;
mod tesseract;
mod timeout;

pub use command_detector::{CommandDetector, DEFAULT_CONFIDENCE_THRESHOLD};
pub use pdftoppm::{PdftoppmRasterizer, DEFAULT_SCALE, PDF_POINTS_PER_INCH};
pub use process::run_with_deadline;
pub use tesseract::{TesseractRecognizer, DEFAULT_PSM};
pub use timeout::call_with_timeout;

// ============================================================
// Error Types
// ============================================================

/// Adapter error types
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("{tool} failed: {message}")]
    CommandFailed { tool: String, message: String },

    #[error("Malformed adapter output: {0}")]
    MalformedOutput(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Adapter worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Cannot open document: {0}")]
    Document(String),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AdapterError {
    /// Whether this error came from the timeout guard
    pub fn is_timeout(&self) -> bool {
        matches!(self, AdapterError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;

// ============================================================
// Collaborator Traits
// ============================================================

/// Turns a document into page images
pub trait Rasterizer: Send + Sync {
    /// Number of pages in the document.
    ///
    /// Failure here means the document cannot be opened at all.
    fn page_count(&self, document: &Path) -> Result<usize>;

    /// Render one page (0-based) at the given zoom factor
    fn render_page(&self, document: &Path, page_index: usize, scale: f32) -> Result<RgbImage>;
}

/// Detects layout regions on a page image
pub trait RegionDetector: Send + Sync {
    /// Regions at or above the adapter's confidence threshold, in detector order
    fn detect(&self, page: &RgbImage) -> Result<Vec<DetectedRegion>>;

    /// True when `detect` enforces its own deadline, killing any work it
    /// started; callers then skip the thread-based guard
    fn enforces_deadline(&self) -> bool {
        false
    }
}

/// Recognizes text lines in a cropped region
pub trait TextRecognizer: Send + Sync {
    /// Lines in engine order; an empty vector means nothing was recognized
    fn recognize(&self, crop: &RgbImage) -> Result<Vec<OcrLine>>;

    /// True when `recognize` enforces its own deadline
    fn enforces_deadline(&self) -> bool {
        false
    }
}

/// Write an image to a temporary PNG for tools that only read files
pub(crate) fn write_temp_png(image: &RgbImage) -> Result<tempfile::NamedTempFile> {
    let file = tempfile::Builder::new()
        .prefix("layout-extract-")
        .suffix(".png")
        .tempfile()?;
    image.save_with_format(file.path(), image::ImageFormat::Png)?;
    Ok(file)
}

/// Format process stderr into a short error message
pub(crate) fn stderr_message(output: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let first = stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    format!("{} {}", output.status, first.trim()).trim().to_string()
}
