//! Command-line interface definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::CliOverrides;

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INPUT_NOT_FOUND: i32 = 2;
    /// Output was written but some pages failed
    pub const PARTIAL_FAILURE: i32 = 3;
}

/// Layout analysis and OCR extraction for PDF documents
#[derive(Debug, Parser)]
#[command(name = "layout-extract", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract layout regions and text from a PDF or a directory of PDFs
    Extract(ExtractArgs),
    /// Show available external tools and config locations
    Info,
}

#[derive(Debug, Clone, Args)]
pub struct ExtractArgs {
    /// Input PDF file or directory
    pub input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "./output")]
    pub output: PathBuf,

    /// Config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Rasterization zoom factor (1.0 = 72 DPI)
    #[arg(long)]
    pub scale: Option<f32>,

    /// Worker threads for page processing
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Process at most N pages per document
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Timeout for each detector/OCR call in seconds (0 = none)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Detector command speaking the JSON region protocol
    #[arg(long)]
    pub detector_cmd: Option<String>,

    /// Tesseract language(s), e.g. `chi_sim+eng`
    #[arg(long)]
    pub ocr_lang: Option<String>,

    /// Do not write annotated page images
    #[arg(long)]
    pub no_annotate: bool,

    /// Also print output.json to stdout
    #[arg(long)]
    pub print: bool,

    /// Show the execution plan without processing
    #[arg(long)]
    pub dry_run: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl ExtractArgs {
    /// Values the user set explicitly, for merging over the config file
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            scale: self.scale,
            threads: self.threads,
            max_pages: self.max_pages,
            timeout_secs: self.timeout,
            save_annotated: self.no_annotate.then_some(false),
            detector_command: self.detector_cmd.clone(),
            ocr_language: self.ocr_lang.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_extract_minimal() {
        let cli = parse(&["layout-extract", "extract", "doc.pdf"]);
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert_eq!(args.input, PathBuf::from("doc.pdf"));
        assert_eq!(args.output, PathBuf::from("./output"));
        assert_eq!(args.verbose, 0);
        assert_eq!(args.overrides(), CliOverrides::new());
    }

    #[test]
    fn test_extract_all_options() {
        let cli = parse(&[
            "layout-extract",
            "extract",
            "docs/",
            "-o",
            "out",
            "--scale",
            "1.5",
            "-t",
            "4",
            "--max-pages",
            "3",
            "--timeout",
            "0",
            "--detector-cmd",
            "detect",
            "--ocr-lang",
            "chi_sim",
            "--no-annotate",
            "--print",
            "-vv",
        ]);
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };

        assert!(args.print);
        assert_eq!(args.verbose, 2);
        let overrides = args.overrides();
        assert_eq!(overrides.scale, Some(1.5));
        assert_eq!(overrides.threads, Some(4));
        assert_eq!(overrides.max_pages, Some(3));
        assert_eq!(overrides.timeout_secs, Some(0));
        assert_eq!(overrides.save_annotated, Some(false));
        assert_eq!(overrides.detector_command.as_deref(), Some("detect"));
        assert_eq!(overrides.ocr_language.as_deref(), Some("chi_sim"));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["layout-extract", "extract", "a.pdf", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_info_command() {
        let cli = parse(&["layout-extract", "info"]);
        assert!(matches!(cli.command, Commands::Info));
    }

    #[test]
    fn test_cli_debug_assert() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
