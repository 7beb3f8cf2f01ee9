//! Progress reporting for layout extraction runs.
//!
//! The pipeline reports through [`ProgressCallback`]; the CLI plugs in a
//! [`ConsoleProgress`] that drives an indicatif bar over pages.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Processing stages of one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingStage {
    /// Opening the document and counting pages
    #[default]
    Opening,
    /// Rasterizing, detecting and routing pages
    ProcessingPages,
    /// Writing `output.json` and page images
    WritingOutput,
    /// Done
    Completed,
}

impl ProcessingStage {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessingStage::Opening => "Opening document",
            ProcessingStage::ProcessingPages => "Processing pages",
            ProcessingStage::WritingOutput => "Writing output",
            ProcessingStage::Completed => "Completed",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// No output
    Quiet,
    /// Stage display and progress bar
    #[default]
    Normal,
    /// Per-page messages
    Verbose,
    /// Debug messages as well
    VeryVerbose,
}

impl OutputMode {
    /// Create OutputMode from `-v` count, `quiet` wins
    pub fn from_flags(verbosity: u8, quiet: bool) -> Self {
        if quiet {
            return OutputMode::Quiet;
        }
        match verbosity {
            0 => OutputMode::Normal,
            1 => OutputMode::Verbose,
            _ => OutputMode::VeryVerbose,
        }
    }

    /// Check if output should be shown at this mode
    pub fn should_show(&self, required: OutputMode) -> bool {
        use OutputMode::*;
        match (self, required) {
            (Quiet, _) => false,
            (Normal, Quiet | Normal) => true,
            (Verbose, Quiet | Normal | Verbose) => true,
            (VeryVerbose, _) => true,
            _ => false,
        }
    }
}

// ============================================================
// Callback
// ============================================================

/// Progress callback for pipeline processing.
///
/// Page callbacks may arrive from several worker threads at once and in
/// any page order.
pub trait ProgressCallback: Send + Sync {
    /// Called when a stage starts; `total` is the number of work items
    fn on_stage_start(&self, _stage: ProcessingStage, _total: usize) {}

    /// Called when a page finished, successfully or not
    fn on_page_complete(&self, _page_no: usize, _regions: usize) {}

    /// Called when a page failed and was skipped
    fn on_page_failed(&self, _page_no: usize, _message: &str) {}

    /// Called when a stage finished
    fn on_stage_complete(&self, _stage: ProcessingStage, _message: &str) {}

    /// Debug message
    fn on_debug(&self, _message: &str) {}
}

/// Callback that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {}

/// Console reporter with a page progress bar
pub struct ConsoleProgress {
    mode: OutputMode,
    bar: ProgressBar,
    failed_pages: AtomicUsize,
}

impl ConsoleProgress {
    pub fn new(mode: OutputMode) -> Self {
        let bar = if mode.should_show(OutputMode::Normal) {
            ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr())
        } else {
            ProgressBar::hidden()
        };
        Self {
            mode,
            bar,
            failed_pages: AtomicUsize::new(0),
        }
    }

    pub fn failed_pages(&self) -> usize {
        self.failed_pages.load(Ordering::Relaxed)
    }

    fn page_style() -> ProgressStyle {
        ProgressStyle::with_template("    {bar:40.cyan/blue} {pos:>4}/{len:4} pages {elapsed_precise} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_stage_start(&self, stage: ProcessingStage, total: usize) {
        if !self.mode.should_show(OutputMode::Normal) {
            return;
        }
        self.bar.println(format!("  {}", stage));
        if stage == ProcessingStage::ProcessingPages {
            self.bar.reset();
            self.bar.set_style(Self::page_style());
            self.bar.set_length(total as u64);
            self.bar.enable_steady_tick(Duration::from_millis(200));
        }
    }

    fn on_page_complete(&self, page_no: usize, regions: usize) {
        self.bar.inc(1);
        if self.mode.should_show(OutputMode::Verbose) {
            self.bar
                .println(format!("    page {}: {} regions", page_no + 1, regions));
        }
    }

    fn on_page_failed(&self, page_no: usize, message: &str) {
        self.failed_pages.fetch_add(1, Ordering::Relaxed);
        self.bar.inc(1);
        if self.mode.should_show(OutputMode::Normal) {
            self.bar
                .println(format!("    page {} failed: {}", page_no + 1, message));
        }
    }

    fn on_stage_complete(&self, stage: ProcessingStage, message: &str) {
        if stage == ProcessingStage::ProcessingPages {
            self.bar.finish_and_clear();
        }
        if self.mode.should_show(OutputMode::Verbose) {
            self.bar.println(format!("    {}: {}", stage, message));
        }
    }

    fn on_debug(&self, message: &str) {
        if self.mode.should_show(OutputMode::VeryVerbose) {
            self.bar.println(format!("    [DEBUG] {}", message));
        }
    }
}

// ============================================================
// Run Summary
// ============================================================

/// Counters for a multi-document run
#[derive(Debug)]
pub struct RunSummary {
    pub total_files: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    start_time: Instant,
}

impl RunSummary {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            succeeded: 0,
            partial: 0,
            failed: 0,
            start_time: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// True when every document was fully processed
    pub fn is_clean(&self) -> bool {
        self.partial == 0 && self.failed == 0
    }

    pub fn print(&self) {
        println!();
        println!("{}", "=".repeat(60));
        println!("Extraction Summary");
        println!("{}", "=".repeat(60));
        println!("  Documents:        {}", self.total_files);
        println!("  Succeeded:        {}", self.succeeded);
        println!("  With page errors: {}", self.partial);
        println!("  Failed:           {}", self.failed);
        println!("  Total time:       {:.2}s", self.elapsed_secs());
        println!("{}", "=".repeat(60));
    }
}
