//! Common types for the layout module

use std::path::PathBuf;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapters::AdapterError;

// ============================================================
// Error Types
// ============================================================

/// Layout extraction error types
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Adapter failed: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Region {0:?} lies entirely outside the page image")]
    EmptyCrop(BoundingBox),

    #[error("Failed to write image {path}: {message}")]
    ImageWrite { path: PathBuf, message: String },

    #[error("Invalid font file: {0}")]
    InvalidFont(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;

// ============================================================
// Geometry
// ============================================================

/// Region bounding box in page-pixel coordinates (x1 < x2, y1 < y2)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Integer pixel rectangle inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from a `[x1, y1, x2, y2]` array
    pub fn from_xyxy(xyxy: [f64; 4]) -> Self {
        Self::new(xyxy[0], xyxy[1], xyxy[2], xyxy[3])
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Corner coordinates truncated toward zero
    pub fn to_pixels(&self) -> [i32; 4] {
        [
            self.x1 as i32,
            self.y1 as i32,
            self.x2 as i32,
            self.y2 as i32,
        ]
    }

    /// Four corners, clockwise from top-left: x1,y1,x2,y1,x2,y2,x1,y2
    pub fn to_polygon(&self) -> [i32; 8] {
        let [x1, y1, x2, y2] = self.to_pixels();
        [x1, y1, x2, y1, x2, y2, x1, y2]
    }

    /// Clamp the truncated box to an image of the given size.
    ///
    /// Returns `None` when nothing of the box remains inside the image.
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> Option<PixelRect> {
        let [x1, y1, x2, y2] = self.to_pixels();
        let clamp_x = |v: i32| v.clamp(0, image_width as i32) as u32;
        let clamp_y = |v: i32| v.clamp(0, image_height as i32) as u32;

        let (left, right) = (clamp_x(x1), clamp_x(x2));
        let (top, bottom) = (clamp_y(y1), clamp_y(y2));

        if right <= left || bottom <= top {
            return None;
        }

        Some(PixelRect {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        })
    }
}

// ============================================================
// Region Types
// ============================================================

/// Semantic region category assigned to a detector class id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionType {
    Title,
    PlainText,
    AbandonedText,
    Figure,
    FigureCaption,
    Table,
    TableCaption,
    TableFootnote,
    IsolatedFormula,
    FormulaCaption,
    Unknown,
}

/// What the router does with a region of a given type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Crop, recognize, dedup, emit
    Ocr,
    /// Crop and save as an image file
    Persist,
    /// Ignore entirely
    Drop,
}

impl RegionType {
    /// All types with a detector class id, in class-id order
    pub const KNOWN: [RegionType; 10] = [
        RegionType::Title,
        RegionType::PlainText,
        RegionType::AbandonedText,
        RegionType::Figure,
        RegionType::FigureCaption,
        RegionType::Table,
        RegionType::TableCaption,
        RegionType::TableFootnote,
        RegionType::IsolatedFormula,
        RegionType::FormulaCaption,
    ];

    /// Human-readable label, as drawn on annotated pages
    pub fn label(&self) -> &'static str {
        match self {
            RegionType::Title => "Title",
            RegionType::PlainText => "Plain Text",
            RegionType::AbandonedText => "Abandoned Text",
            RegionType::Figure => "Figure",
            RegionType::FigureCaption => "Figure Caption",
            RegionType::Table => "Table",
            RegionType::TableCaption => "Table Caption",
            RegionType::TableFootnote => "Table Footnote",
            RegionType::IsolatedFormula => "Isolated Formula",
            RegionType::FormulaCaption => "Formula Caption",
            RegionType::Unknown => "Unknown",
        }
    }

    /// Lowercase, space-to-underscore form of [`label`](Self::label)
    pub fn category_type(&self) -> String {
        self.label().to_lowercase().replace(' ', "_")
    }

    /// Dispatch policy for this type
    pub fn route(&self) -> RouteKind {
        match self {
            RegionType::Title
            | RegionType::PlainText
            | RegionType::AbandonedText
            | RegionType::FigureCaption
            | RegionType::Table
            | RegionType::TableCaption
            | RegionType::TableFootnote
            | RegionType::FormulaCaption => RouteKind::Ocr,
            RegionType::Figure => RouteKind::Persist,
            // Formulas are detected but not extracted yet
            RegionType::IsolatedFormula | RegionType::Unknown => RouteKind::Drop,
        }
    }
}

impl std::fmt::Display for RegionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================
// Detector / OCR Output
// ============================================================

/// A single region reported by the layout detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedRegion {
    pub bbox: BoundingBox,
    /// Raw detector class label
    pub class_id: i64,
    /// Detection confidence (0.0-1.0)
    pub confidence: f64,
}

impl DetectedRegion {
    pub fn new(bbox: BoundingBox, class_id: i64, confidence: f64) -> Self {
        Self {
            bbox,
            class_id,
            confidence,
        }
    }
}

/// A recognized text line from the OCR engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,
    /// Recognition confidence (0.0-1.0)
    pub score: f64,
}

impl OcrLine {
    pub fn new(text: impl Into<String>, score: f64) -> Self {
        Self {
            text: text.into(),
            score,
        }
    }
}

// ============================================================
// Page Output
// ============================================================

/// One extracted region, as it appears in `layout_dets`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionResult {
    pub category_type: String,
    #[serde(rename = "poly")]
    pub polygon: [i32; 8],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl RegionResult {
    /// Create a text-bearing result for a region
    pub fn with_text(
        category_type: impl Into<String>,
        bbox: &BoundingBox,
        text: String,
        score: f64,
    ) -> Self {
        Self {
            category_type: category_type.into(),
            polygon: bbox.to_polygon(),
            text: Some(text),
            score: Some(score),
        }
    }
}

/// Page metadata written next to each page's regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Page number (0-based)
    pub page_no: usize,
    pub height: u32,
    pub width: u32,
}

/// A region that failed in isolation on an otherwise processed page
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFailure {
    pub region: DetectedRegion,
    pub message: String,
}

/// Assembled per-page output
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub page_info: PageInfo,

    /// Extracted regions in reading order, post-dedup
    pub layout_dets: Vec<RegionResult>,

    /// Page image with detections drawn on it
    pub annotated: RgbImage,

    /// Figure files written for this page
    pub figures: Vec<PathBuf>,

    /// Regions whose extraction failed
    pub failures: Vec<RegionFailure>,
}

impl PageRecord {
    /// Page number (0-based)
    pub fn page_no(&self) -> usize {
        self.page_info.page_no
    }

    /// Text of every emitted region, in order
    pub fn texts(&self) -> Vec<&str> {
        self.layout_dets
            .iter()
            .filter_map(|r| r.text.as_deref())
            .collect()
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_dimensions() {
        let bbox = BoundingBox::new(10.0, 20.0, 110.0, 70.0);
        assert_eq!(bbox.width(), 100.0);
        assert_eq!(bbox.height(), 50.0);
        assert_eq!(bbox.area(), 5000.0);
    }

    #[test]
    fn test_polygon_is_clockwise_corners() {
        let bbox = BoundingBox::new(10.0, 10.0, 200.0, 40.0);
        assert_eq!(bbox.to_polygon(), [10, 10, 200, 10, 200, 40, 10, 40]);
    }

    #[test]
    fn test_to_pixels_truncates() {
        let bbox = BoundingBox::new(10.9, 20.2, 30.7, 40.99);
        assert_eq!(bbox.to_pixels(), [10, 20, 30, 40]);
    }

    #[test]
    fn test_clamp_inside_image() {
        let bbox = BoundingBox::new(10.0, 20.0, 50.0, 60.0);
        let rect = bbox.clamp_to(100, 100).unwrap();
        assert_eq!(
            rect,
            PixelRect {
                x: 10,
                y: 20,
                width: 40,
                height: 40
            }
        );
    }

    #[test]
    fn test_clamp_partially_outside() {
        let bbox = BoundingBox::new(-15.0, 80.0, 130.0, 140.0);
        let rect = bbox.clamp_to(100, 100).unwrap();
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 80);
        assert_eq!(rect.width, 100);
        assert_eq!(rect.height, 20);
    }

    #[test]
    fn test_clamp_fully_outside() {
        let bbox = BoundingBox::new(120.0, 120.0, 150.0, 150.0);
        assert!(bbox.clamp_to(100, 100).is_none());

        let degenerate = BoundingBox::new(10.0, 10.0, 10.5, 40.0);
        assert!(degenerate.clamp_to(100, 100).is_none());
    }

    #[test]
    fn test_category_type_normalization() {
        assert_eq!(RegionType::Title.category_type(), "title");
        assert_eq!(RegionType::PlainText.category_type(), "plain_text");
        assert_eq!(RegionType::TableFootnote.category_type(), "table_footnote");
        assert_eq!(RegionType::Unknown.category_type(), "unknown");
    }

    #[test]
    fn test_route_policy() {
        assert_eq!(RegionType::Title.route(), RouteKind::Ocr);
        assert_eq!(RegionType::Table.route(), RouteKind::Ocr);
        assert_eq!(RegionType::FormulaCaption.route(), RouteKind::Ocr);
        assert_eq!(RegionType::Figure.route(), RouteKind::Persist);
        assert_eq!(RegionType::IsolatedFormula.route(), RouteKind::Drop);
        assert_eq!(RegionType::Unknown.route(), RouteKind::Drop);
    }

    #[test]
    fn test_region_result_serialization_skips_missing_text() {
        let result = RegionResult {
            category_type: "figure".to_string(),
            polygon: [0, 0, 5, 0, 5, 5, 0, 5],
            text: None,
            score: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("text").is_none());
        assert!(json.get("score").is_none());
        assert_eq!(json["poly"][2], 5);
    }

    #[test]
    fn test_region_result_with_text() {
        let bbox = BoundingBox::new(10.0, 10.0, 200.0, 40.0);
        let result = RegionResult::with_text("title", &bbox, "Hello".to_string(), 0.9);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "category_type": "title",
                "poly": [10, 10, 200, 10, 200, 40, 10, 40],
                "text": "Hello",
                "score": 0.9
            })
        );
    }

    #[test]
    fn test_error_types() {
        let _err1 = LayoutError::EmptyCrop(BoundingBox::default());
        let _err2 = LayoutError::ImageWrite {
            path: PathBuf::from("/tmp/x.png"),
            message: "disk full".to_string(),
        };
        let _err3: LayoutError = std::io::Error::other("test").into();
        let _err4: LayoutError = AdapterError::Timeout("ocr".to_string()).into();
    }
}
