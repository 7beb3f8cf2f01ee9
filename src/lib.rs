//! layout-extract - Document layout analysis and OCR extraction
//!
//! Turns PDF pages into structured region records:
//!
//! 1. Rasterize each page ([`Rasterizer`])
//! 2. Detect layout regions ([`RegionDetector`])
//! 3. Classify and order regions top to bottom
//! 4. OCR text regions, save figures, drop formulas and unknown classes
//! 5. Write `output.json` and annotated page images
//!
//! # Example
//!
//! ```rust,no_run
//! use layout_extract::{LayoutPipeline, PipelineConfig, SilentProgress};
//! use std::path::Path;
//!
//! let config = PipelineConfig::default().with_detector_command("doclayout-detect");
//! let pipeline = LayoutPipeline::from_config(config).unwrap();
//! let (result, summary) = pipeline
//!     .run(Path::new("paper.pdf"), Path::new("out"), &SilentProgress)
//!     .unwrap();
//! println!("{} pages -> {}", result.pages.len(), summary.json_path.display());
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod progress;

// Adapters
pub use adapters::{
    call_with_timeout, AdapterError, CommandDetector, PdftoppmRasterizer, Rasterizer,
    RegionDetector, TesseractRecognizer, TextRecognizer, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_PSM, DEFAULT_SCALE,
};

// CLI
pub use cli::{exit_codes, Cli, Commands, ExtractArgs};

// Config
pub use config::{CliOverrides, Config, ConfigError};

// Layout
pub use layout::{
    BoundingBox, DetectedRegion, DirectorySink, ImageSink, LayoutError, OcrLine, PageAnnotator,
    PageAssembler, PageContext, PageInfo, PageRecord, ReadingOrderSorter, RegionClassifier,
    RegionFailure, RegionResult, RegionRouter, RegionType, RouteKind, TABLE_CATEGORY,
};

// Output
pub use output::{OutputError, OutputSummary, OutputWriter, OUTPUT_JSON};

// Pipeline
pub use pipeline::{
    DocumentResult, LayoutPipeline, PageFailure, PipelineConfig, PipelineError,
    DEFAULT_ADAPTER_TIMEOUT,
};

// Progress
pub use progress::{
    ConsoleProgress, OutputMode, ProcessingStage, ProgressCallback, RunSummary, SilentProgress,
};
