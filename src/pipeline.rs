//! Layout extraction pipeline
//!
//! Runs one document through rasterization, detection, annotation, reading
//! order, routing and assembly. Pages are independent and may be processed in
//! parallel; each page gets its own [`PageContext`] and a failed page never
//! affects its neighbours.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapters::{
    call_with_timeout, AdapterError, CommandDetector, PdftoppmRasterizer, Rasterizer,
    RegionDetector, TesseractRecognizer, TextRecognizer, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_PSM, DEFAULT_SCALE,
};
use crate::layout::{
    DetectedRegion, DirectorySink, ImageSink, PageAnnotator, PageAssembler, PageContext,
    PageRecord, ReadingOrderSorter, RegionClassifier, RegionFailure, RegionRouter,
};
use crate::output::{OutputError, OutputSummary, OutputWriter};
use crate::progress::{ProcessingStage, ProgressCallback};

/// Default bound on a single detector or OCR call
pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================
// Error Types
// ============================================================

/// Pipeline error types. Each of these aborts the whole document.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input file not found: {0}")]
    DocumentNotFound(PathBuf),

    #[error("Cannot open document {path}: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: AdapterError,
    },

    #[error("No detector command configured")]
    MissingDetector,

    #[error("Adapter setup failed: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),

    #[error("Output failed: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

// ============================================================
// Configuration
// ============================================================

/// Settings for one pipeline instance
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Rasterization zoom factor (1.0 = 72 DPI)
    pub scale: f32,
    /// Worker threads for page processing; `None` uses every CPU
    pub threads: Option<usize>,
    /// Process at most this many pages
    pub max_pages: Option<usize>,
    /// Bound on each detector and OCR call; `None` waits forever
    pub adapter_timeout: Option<Duration>,
    /// Write `page_<N>_annotated.png` next to `output.json`
    pub save_annotated: bool,
    /// Detector command speaking the JSON region protocol
    pub detector_command: Option<String>,
    pub detector_args: Vec<String>,
    pub confidence_threshold: f64,
    pub ocr_language: String,
    pub ocr_psm: u8,
    /// Font for annotation labels; a system font is searched when unset
    pub font_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            threads: None,
            max_pages: None,
            adapter_timeout: Some(DEFAULT_ADAPTER_TIMEOUT),
            save_annotated: true,
            detector_command: None,
            detector_args: Vec::new(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            ocr_language: "eng".to_string(),
            ocr_psm: DEFAULT_PSM,
            font_path: None,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    #[must_use]
    pub fn with_adapter_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_save_annotated(mut self, save: bool) -> Self {
        self.save_annotated = save;
        self
    }

    #[must_use]
    pub fn with_detector_command(mut self, command: impl Into<String>) -> Self {
        self.detector_command = Some(command.into());
        self
    }

    /// Worker thread count actually used
    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

// ============================================================
// Results
// ============================================================

/// A page that could not be processed at all
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    /// Page number (0-based)
    pub page_no: usize,
    pub message: String,
}

/// Everything produced for one document
#[derive(Debug, Clone, Default)]
pub struct DocumentResult {
    /// Successfully processed pages, in document order
    pub pages: Vec<PageRecord>,
    /// Pages that failed, in document order
    pub failures: Vec<PageFailure>,
    /// Pages whose detector call timed out; they are kept with no regions
    pub detector_timeouts: Vec<usize>,
}

impl DocumentResult {
    /// True when no page failed and every detector call finished
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.detector_timeouts.is_empty()
    }

    pub fn region_count(&self) -> usize {
        self.pages.iter().map(|p| p.layout_dets.len()).sum()
    }

    /// Region failures across all pages
    pub fn region_failure_count(&self) -> usize {
        self.pages.iter().map(|p| p.failures.len()).sum()
    }
}

// ============================================================
// Pipeline
// ============================================================

/// A processed page plus what went wrong while producing it
struct ProcessedPage {
    record: PageRecord,
    detector_timed_out: bool,
}

/// Layout extraction pipeline over pluggable collaborators
pub struct LayoutPipeline {
    config: PipelineConfig,
    rasterizer: Arc<dyn Rasterizer>,
    detector: Arc<dyn RegionDetector>,
    recognizer: Arc<dyn TextRecognizer>,
    sink: Option<Arc<dyn ImageSink>>,
    annotator: PageAnnotator,
}

impl LayoutPipeline {
    pub fn new(
        config: PipelineConfig,
        rasterizer: Arc<dyn Rasterizer>,
        detector: Arc<dyn RegionDetector>,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Self {
        let annotator = match &config.font_path {
            Some(path) => PageAnnotator::with_font_path(path).unwrap_or_else(|e| {
                warn!("Cannot load font {}: {}", path.display(), e);
                PageAnnotator::with_system_font()
            }),
            None => PageAnnotator::with_system_font(),
        };

        Self {
            config,
            rasterizer,
            detector,
            recognizer,
            sink: None,
            annotator,
        }
    }

    /// Pipeline using the external tool adapters
    /// (`pdftoppm`, the configured detector command, `tesseract`)
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let command = config
            .detector_command
            .clone()
            .ok_or(PipelineError::MissingDetector)?;
        let detector = CommandDetector::new(command)
            .args(config.detector_args.iter().cloned())
            .confidence_threshold(config.confidence_threshold)
            .timeout(config.adapter_timeout);
        let recognizer = TesseractRecognizer::locate()?
            .language(config.ocr_language.clone())
            .psm(config.ocr_psm)
            .timeout(config.adapter_timeout);
        let rasterizer = PdftoppmRasterizer::locate()?;

        Ok(Self::new(
            config,
            Arc::new(rasterizer),
            Arc::new(detector),
            Arc::new(recognizer),
        ))
    }

    /// Send figure crops to `sink` instead of the output directory
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ImageSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Replace the annotator
    #[must_use]
    pub fn with_annotator(mut self, annotator: PageAnnotator) -> Self {
        self.annotator = annotator;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process `document` and write the results into `output_dir`
    pub fn run(
        &self,
        document: &Path,
        output_dir: &Path,
        progress: &dyn ProgressCallback,
    ) -> Result<(DocumentResult, OutputSummary)> {
        let result = self.process(document, output_dir, progress)?;

        progress.on_stage_start(ProcessingStage::WritingOutput, result.pages.len());
        let summary = OutputWriter::new(output_dir)
            .save_annotated(self.config.save_annotated)
            .write(&result)?;
        progress.on_stage_complete(
            ProcessingStage::WritingOutput,
            &format!("{}", summary.json_path.display()),
        );
        progress.on_stage_complete(ProcessingStage::Completed, "done");

        Ok((result, summary))
    }

    /// Process every page of `document`.
    ///
    /// Figure crops go to `output_dir` unless a sink was set. Only a missing
    /// or unreadable document is an error; page failures are collected in
    /// [`DocumentResult::failures`].
    pub fn process(
        &self,
        document: &Path,
        output_dir: &Path,
        progress: &dyn ProgressCallback,
    ) -> Result<DocumentResult> {
        if !document.exists() {
            return Err(PipelineError::DocumentNotFound(document.to_path_buf()));
        }

        progress.on_stage_start(ProcessingStage::Opening, 1);
        let total = self
            .rasterizer
            .page_count(document)
            .map_err(|source| PipelineError::Document {
                path: document.to_path_buf(),
                source,
            })?;
        let page_count = self.config.max_pages.map_or(total, |max| total.min(max));
        info!(
            document = %document.display(),
            pages = total,
            processing = page_count,
            "document opened"
        );
        progress.on_stage_complete(ProcessingStage::Opening, &format!("{} pages", total));

        let sink = match &self.sink {
            Some(sink) => Arc::clone(sink),
            None => Arc::new(DirectorySink::new(output_dir)) as Arc<dyn ImageSink>,
        };
        let router = RegionRouter::new(Arc::clone(&self.recognizer), sink)
            .with_ocr_timeout(self.config.adapter_timeout);

        progress.on_stage_start(ProcessingStage::ProcessingPages, page_count);
        let threads = self.config.effective_threads();
        let outcomes: Vec<std::result::Result<ProcessedPage, PageFailure>> = if threads == 1 {
            (0..page_count)
                .map(|i| self.process_page(document, i, &router, progress))
                .collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| PipelineError::ThreadPool(e.to_string()))?;
            pool.install(|| {
                (0..page_count)
                    .into_par_iter()
                    .map(|i| self.process_page(document, i, &router, progress))
                    .collect()
            })
        };

        let mut result = DocumentResult::default();
        for outcome in outcomes {
            match outcome {
                Ok(page) => {
                    if page.detector_timed_out {
                        result.detector_timeouts.push(page.record.page_no());
                    }
                    result.pages.push(page.record);
                }
                Err(failure) => result.failures.push(failure),
            }
        }
        result.pages.sort_by_key(PageRecord::page_no);
        result.failures.sort_by_key(|f| f.page_no);
        result.detector_timeouts.sort_unstable();

        progress.on_stage_complete(
            ProcessingStage::ProcessingPages,
            &format!(
                "{} pages, {} regions, {} failed",
                result.pages.len(),
                result.region_count(),
                result.failures.len()
            ),
        );

        Ok(result)
    }

    /// Process one page, reporting the outcome to `progress`
    fn process_page(
        &self,
        document: &Path,
        page_index: usize,
        router: &RegionRouter,
        progress: &dyn ProgressCallback,
    ) -> std::result::Result<ProcessedPage, PageFailure> {
        match self.extract_page(document, page_index, router) {
            Ok(page) => {
                progress.on_page_complete(page_index, page.record.layout_dets.len());
                Ok(page)
            }
            Err(message) => {
                warn!(page = page_index, "page failed: {}", message);
                progress.on_page_failed(page_index, &message);
                Err(PageFailure {
                    page_no: page_index,
                    message,
                })
            }
        }
    }

    fn extract_page(
        &self,
        document: &Path,
        page_index: usize,
        router: &RegionRouter,
    ) -> std::result::Result<ProcessedPage, String> {
        let page = self
            .rasterizer
            .render_page(document, page_index, self.config.scale)
            .map_err(|e| format!("rasterization failed: {}", e))?;
        let page = Arc::new(page);

        let detected = self
            .detect(&page, page_index)
            .map_err(|e| format!("detection failed: {}", e))?;
        let detector_timed_out = detected.is_none();
        let regions = detected.unwrap_or_default();
        debug!(page = page_index, regions = regions.len(), "regions detected");

        let annotated = self.annotator.annotate(&page, &regions);

        let mut ctx = PageContext::new(page_index);
        let mut results = Vec::new();
        let mut failures = Vec::new();
        for region in ReadingOrderSorter::order(&regions) {
            let region_type = RegionClassifier::classify(region.class_id);
            match router.route(&region, region_type, &page, &mut ctx) {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {}
                Err(e) => {
                    warn!(page = page_index, bbox = ?region.bbox, "region failed: {}", e);
                    failures.push(RegionFailure {
                        region,
                        message: e.to_string(),
                    });
                }
            }
        }

        let record = PageAssembler::assemble(
            page_index,
            page.width(),
            page.height(),
            results,
            annotated,
            ctx.into_figures(),
            failures,
        );
        Ok(ProcessedPage {
            record,
            detector_timed_out,
        })
    }

    /// Run the detector under the adapter timeout; `None` when it expired.
    ///
    /// Detectors that enforce their own deadline run without the thread guard.
    fn detect(
        &self,
        page: &Arc<RgbImage>,
        page_index: usize,
    ) -> crate::adapters::Result<Option<Vec<DetectedRegion>>> {
        let guard = if self.detector.enforces_deadline() {
            None
        } else {
            self.config.adapter_timeout
        };
        let detector = Arc::clone(&self.detector);
        let image = Arc::clone(page);
        match call_with_timeout("detector", guard, move || detector.detect(&image)) {
            Ok(regions) => Ok(Some(regions)),
            Err(e) if e.is_timeout() => {
                warn!(page = page_index, "detector timed out, page treated as empty");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

// ============================================================
// Tests
// ============================================================
