//! Configuration file support
//!
//! Settings are read from a TOML file and merged with command-line values,
//! which always win. Files are searched in this order:
//!
//! 1. the path given with `--config`
//! 2. `./layout-extract.toml`
//! 3. `<config dir>/layout-extract/config.toml`
//!
//! Every key is optional:
//!
//! ```toml
//! [pipeline]
//! scale = 2.0
//! threads = 4
//! max_pages = 10
//! adapter_timeout_secs = 60   # 0 disables the timeout
//! save_annotated = true
//!
//! [detector]
//! command = "doclayout-detect"
//! args = ["--model", "doclayout_yolo.pt"]
//! confidence_threshold = 0.25
//!
//! [ocr]
//! language = "chi_sim+eng"
//! psm = 6
//!
//! [annotate]
//! font_path = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::pipeline::PipelineConfig;

/// Config file name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "layout-extract.toml";

// ============================================================
// Error Types
// ============================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

// ============================================================
// File Sections
// ============================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSection {
    pub scale: Option<f32>,
    pub threads: Option<usize>,
    pub max_pages: Option<usize>,
    pub adapter_timeout_secs: Option<u64>,
    pub save_annotated: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorSection {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub confidence_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OcrSection {
    pub language: Option<String>,
    pub psm: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotateSection {
    pub font_path: Option<PathBuf>,
}

/// Contents of a config file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineSection,
    pub detector: DetectorSection,
    pub ocr: OcrSection,
    pub annotate: AnnotateSection,
}

// ============================================================
// CLI Overrides
// ============================================================

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub scale: Option<f32>,
    pub threads: Option<usize>,
    pub max_pages: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub save_annotated: Option<bool>,
    pub detector_command: Option<String>,
    pub ocr_language: Option<String>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================
// Loading and Merging
// ============================================================

impl Config {
    /// User-level config file location
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("layout-extract").join("config.toml"))
    }

    /// Load the first config file found in the search order, or defaults
    pub fn load() -> Result<Self> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Self::load_from_path(&local);
        }
        if let Some(user) = Self::user_config_path().filter(|p| p.is_file()) {
            return Self::load_from_path(&user);
        }
        Ok(Self::default())
    }

    /// Load a specific config file; a missing file is an error
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Combine file values, CLI values and defaults (CLI > file > default)
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> PipelineConfig {
        let defaults = PipelineConfig::default();

        let timeout_secs = cli.timeout_secs.or(self.pipeline.adapter_timeout_secs);
        let adapter_timeout = match timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.adapter_timeout,
        };

        PipelineConfig {
            scale: cli.scale.or(self.pipeline.scale).unwrap_or(defaults.scale),
            threads: cli.threads.or(self.pipeline.threads).map(|t| t.max(1)),
            max_pages: cli.max_pages.or(self.pipeline.max_pages),
            adapter_timeout,
            save_annotated: cli
                .save_annotated
                .or(self.pipeline.save_annotated)
                .unwrap_or(defaults.save_annotated),
            detector_command: cli
                .detector_command
                .clone()
                .or_else(|| self.detector.command.clone()),
            detector_args: self.detector.args.clone().unwrap_or_default(),
            confidence_threshold: self
                .detector
                .confidence_threshold
                .unwrap_or(defaults.confidence_threshold),
            ocr_language: cli
                .ocr_language
                .clone()
                .or_else(|| self.ocr.language.clone())
                .unwrap_or(defaults.ocr_language),
            ocr_psm: self.ocr.psm.unwrap_or(defaults.ocr_psm),
            font_path: self.annotate.font_path.clone(),
        }
    }
}
