//! layout-extract - PDF layout analysis and OCR extraction
//!
//! CLI entry point

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use layout_extract::{
    exit_codes,
    // CLI
    Cli, Commands, ExtractArgs,
    // Config
    Config,
    // Pipeline
    LayoutPipeline, PipelineConfig,
    // Output
    OutputWriter,
    // Progress
    ConsoleProgress, OutputMode, RunSummary,
};
use tracing::{debug, warn, Level};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract(args) => {
            init_tracing(args.verbose, args.quiet);
            run_extract(&args)
        }
        Commands::Info => {
            init_tracing(0, false);
            run_info().map(|()| exit_codes::SUCCESS)
        }
    };

    std::process::exit(match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_codes::GENERAL_ERROR
        }
    });
}

/// Log to stderr, level from `-v` count
fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ============ Extract Command ============

fn run_extract(args: &ExtractArgs) -> anyhow::Result<i32> {
    if !args.input.exists() {
        eprintln!("Error: Input path does not exist: {}", args.input.display());
        return Ok(exit_codes::INPUT_NOT_FOUND);
    }

    let pdf_files = collect_pdf_files(&args.input)?;
    if pdf_files.is_empty() {
        eprintln!("Error: No PDF files found in input path");
        return Ok(exit_codes::INPUT_NOT_FOUND);
    }

    let file_config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Ignoring config file: {}", e);
            Config::default()
        }),
    };
    let pipeline_config = file_config.merge_with_cli(&args.overrides());
    debug!(?pipeline_config, "configuration resolved");

    if args.dry_run {
        print_execution_plan(args, &pdf_files, &pipeline_config);
        return Ok(exit_codes::SUCCESS);
    }

    let pipeline =
        LayoutPipeline::from_config(pipeline_config).context("Cannot set up pipeline")?;
    let mode = OutputMode::from_flags(args.verbose, args.quiet);
    let per_document_dirs = args.input.is_dir();

    let mut summary = RunSummary::new(pdf_files.len());
    for (idx, pdf_path) in pdf_files.iter().enumerate() {
        let output_dir = if per_document_dirs {
            args.output.join(document_stem(pdf_path))
        } else {
            args.output.clone()
        };

        if mode.should_show(OutputMode::Normal) {
            eprintln!(
                "[{}/{}] Processing: {}",
                idx + 1,
                pdf_files.len(),
                pdf_path.display()
            );
        }

        let progress = ConsoleProgress::new(mode);
        match pipeline.run(pdf_path, &output_dir, &progress) {
            Ok((result, written)) => {
                if args.print {
                    println!("{}", OutputWriter::to_json_string(&result.pages)?);
                }
                if result.is_complete() && written.is_complete() {
                    summary.succeeded += 1;
                } else {
                    summary.partial += 1;
                    for failure in &result.failures {
                        eprintln!("  page {} failed: {}", failure.page_no + 1, failure.message);
                    }
                    for page_no in &result.detector_timeouts {
                        eprintln!("  page {} detector timed out, no regions", page_no + 1);
                    }
                    for failure in &written.image_failures {
                        eprintln!(
                            "  page {} annotated image not written: {}",
                            failure.page_no + 1,
                            failure.message
                        );
                    }
                }
                if mode.should_show(OutputMode::Verbose) {
                    eprintln!(
                        "    Completed: {} pages, {} regions -> {}",
                        written.pages_written,
                        written.regions_written,
                        written.json_path.display()
                    );
                }
            }
            Err(e) => {
                eprintln!("Error processing {}: {}", pdf_path.display(), e);
                summary.failed += 1;
            }
        }
    }

    if !args.quiet && !args.print {
        summary.print();
    }

    Ok(if summary.failed > 0 {
        exit_codes::GENERAL_ERROR
    } else if summary.partial > 0 {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::SUCCESS
    })
}

// ============ Helper Functions ============

/// Collect PDF files from input path (file or directory)
fn collect_pdf_files(input: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut pdf_files = Vec::new();

    if input.is_file() {
        pdf_files.push(input.to_path_buf());
    } else if input.is_dir() {
        for entry in std::fs::read_dir(input)
            .with_context(|| format!("Cannot read directory {}", input.display()))?
        {
            let path = entry?.path();
            if path.is_file() && is_pdf(&path) {
                pdf_files.push(path);
            }
        }
        pdf_files.sort();
    }

    Ok(pdf_files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn document_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Print execution plan for dry-run mode
fn print_execution_plan(args: &ExtractArgs, pdf_files: &[PathBuf], config: &PipelineConfig) {
    println!("=== Dry Run - Execution Plan ===");
    println!();
    println!("Input: {}", args.input.display());
    println!("Output: {}", args.output.display());
    println!("Files to process: {}", pdf_files.len());
    println!();
    println!("Pipeline Configuration:");
    println!(
        "  1. Rasterize (scale: {}, {} DPI)",
        config.scale,
        layout_extract::PdftoppmRasterizer::dpi_for_scale(config.scale)
    );
    match &config.detector_command {
        Some(cmd) => println!(
            "  2. Detect regions: {} {} (confidence >= {})",
            cmd,
            config.detector_args.join(" "),
            config.confidence_threshold
        ),
        None => println!("  2. Detect regions: NOT CONFIGURED"),
    }
    println!(
        "  3. OCR: tesseract (lang: {}, psm: {})",
        config.ocr_language, config.ocr_psm
    );
    println!(
        "  4. Annotated images: {}",
        if config.save_annotated { "ENABLED" } else { "DISABLED" }
    );
    println!();
    println!("Processing Options:");
    println!("  Threads: {}", config.effective_threads());
    match config.adapter_timeout {
        Some(t) => println!("  Adapter timeout: {}s", t.as_secs()),
        None => println!("  Adapter timeout: none"),
    }
    match config.max_pages {
        Some(max) => println!("  Max pages: {}", max),
        None => println!("  Max pages: unlimited"),
    }
    println!();
    println!("Files:");
    for (i, file) in pdf_files.iter().enumerate() {
        println!("  {}. {}", i + 1, file.display());
    }
}

// ============ Info Command ============

fn run_info() -> anyhow::Result<()> {
    println!("layout-extract v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("System Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);
    println!("  CPUs: {}", num_cpus::get());

    println!();
    println!("Rasterizer:");
    check_tool_with_version("pdftoppm", "Poppler", &["-v"]);

    println!();
    println!("OCR:");
    check_tool_with_version("tesseract", "Tesseract", &["--version"]);

    println!();
    println!("Detector:");
    let config = Config::load().unwrap_or_default();
    match &config.detector.command {
        Some(cmd) => check_tool(cmd, cmd),
        None => println!("  Not configured (set [detector] command or --detector-cmd)"),
    }

    println!();
    println!("Config File Locations:");
    println!("  Local: ./{}", layout_extract::config::LOCAL_CONFIG_FILE);
    if let Some(path) = Config::user_config_path() {
        println!("  User:  {}", path.display());
    }

    Ok(())
}

fn check_tool(cmd: &str, name: &str) {
    match which::which(cmd) {
        Ok(path) => println!("  {}: {} (found)", name, path.display()),
        Err(_) => println!("  {}: Not found", name),
    }
}

fn check_tool_with_version(cmd: &str, name: &str, version_args: &[&str]) {
    let Ok(path) = which::which(cmd) else {
        println!("  {}: Not found", name);
        return;
    };

    // pdftoppm prints its version on stderr
    let version = std::process::Command::new(&path)
        .args(version_args)
        .output()
        .ok()
        .and_then(|output| {
            let text = if output.stdout.is_empty() {
                output.stderr
            } else {
                output.stdout
            };
            String::from_utf8_lossy(&text)
                .lines()
                .next()
                .map(|l| l.trim().to_string())
        })
        .filter(|line| !line.is_empty() && line.len() < 80);

    match version {
        Some(v) => println!("  {}: {} ({})", name, v, path.display()),
        None => println!("  {}: {} (found)", name, path.display()),
    }
}
