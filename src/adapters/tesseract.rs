//! Tesseract text recognizer
//!
//! Runs `tesseract <image> stdout -l <lang> --psm <psm> tsv` and folds the
//! word-level TSV rows into lines.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use image::RgbImage;

use super::{
    run_with_deadline, stderr_message, write_temp_png, AdapterError, Result, TextRecognizer,
};
use crate::layout::OcrLine;

/// Page segmentation mode: assume a single uniform block of text
pub const DEFAULT_PSM: u8 = 6;

/// TSV `level` value of word rows
const WORD_LEVEL: &str = "5";

/// Number of TSV columns (level .. text)
const TSV_COLUMNS: usize = 12;

/// Text recognizer backed by the `tesseract` command
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    program: PathBuf,
    language: String,
    psm: u8,
    timeout: Option<Duration>,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            psm: DEFAULT_PSM,
            timeout: None,
        }
    }
}

impl TesseractRecognizer {
    /// Locate `tesseract` on `PATH`
    pub fn locate() -> Result<Self> {
        let program = which::which("tesseract")
            .map_err(|_| AdapterError::ToolNotFound("tesseract".to_string()))?;
        Ok(Self {
            program,
            ..Default::default()
        })
    }

    /// Use a specific binary
    #[must_use]
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the recognition language (e.g. `eng`, `chi_sim+eng`)
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the page segmentation mode
    #[must_use]
    pub fn psm(mut self, psm: u8) -> Self {
        self.psm = psm;
        self
    }

    /// Kill `tesseract` if a single crop takes longer than `timeout`
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fold Tesseract TSV output into lines.
    ///
    /// Words are grouped by (block, paragraph, line) in order of first
    /// appearance; a line's score is its mean word confidence scaled to 0-1.
    pub fn parse_tsv(tsv: &str) -> Result<Vec<OcrLine>> {
        let mut order: Vec<(u32, u32, u32)> = Vec::new();
        let mut lines: HashMap<(u32, u32, u32), (Vec<String>, Vec<f64>)> = HashMap::new();

        for (row_no, row) in tsv.lines().enumerate() {
            if row_no == 0 && row.starts_with("level") {
                continue;
            }
            if row.trim().is_empty() {
                continue;
            }

            let cols: Vec<&str> = row.splitn(TSV_COLUMNS, '\t').collect();
            if cols.len() < TSV_COLUMNS - 1 {
                return Err(AdapterError::MalformedOutput(format!(
                    "tesseract TSV row {} has {} columns",
                    row_no + 1,
                    cols.len()
                )));
            }
            if cols[0] != WORD_LEVEL {
                continue;
            }

            let text = cols.get(11).map(|t| t.trim()).unwrap_or("");
            if text.is_empty() {
                continue;
            }

            let parse_u32 = |s: &str| {
                s.parse::<u32>().map_err(|_| {
                    AdapterError::MalformedOutput(format!("bad TSV number {:?}", s))
                })
            };
            let key = (parse_u32(cols[2])?, parse_u32(cols[3])?, parse_u32(cols[4])?);
            let conf: f64 = cols[10]
                .parse()
                .map_err(|_| AdapterError::MalformedOutput(format!("bad confidence {:?}", cols[10])))?;

            let entry = lines.entry(key).or_insert_with(|| {
                order.push(key);
                (Vec::new(), Vec::new())
            });
            entry.0.push(text.to_string());
            entry.1.push(conf.max(0.0));
        }

        Ok(order
            .into_iter()
            .filter_map(|key| lines.remove(&key))
            .map(|(words, confs)| {
                let mean = confs.iter().sum::<f64>() / confs.len() as f64;
                OcrLine::new(words.join(" "), (mean / 100.0).clamp(0.0, 1.0))
            })
            .collect())
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, crop: &RgbImage) -> Result<Vec<OcrLine>> {
        let image_file = write_temp_png(crop)?;

        let mut command = Command::new(&self.program);
        command
            .arg(image_file.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("tsv");
        let output = run_with_deadline(&mut command, "tesseract", self.timeout)?;

        if !output.status.success() {
            return Err(AdapterError::CommandFailed {
                tool: "tesseract".to_string(),
                message: stderr_message(&output),
            });
        }

        Self::parse_tsv(&String::from_utf8_lossy(&output.stdout))
    }

    fn enforces_deadline(&self) -> bool {
        self.timeout.is_some()
    }
}
