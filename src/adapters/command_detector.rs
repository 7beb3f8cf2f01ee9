//! Command-line layout detector
//!
//! Runs an external detection command (typically a small wrapper around a
//! DocLayout-YOLO model) once per page. The command receives the page PNG
//! path followed by `--conf <threshold>` and must print a JSON array:
//!
//! ```json
//! [{"bbox": [x1, y1, x2, y2], "class_id": 0, "confidence": 0.91}]
//! ```

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use image::RgbImage;
use serde::Deserialize;
use tracing::debug;

use super::{
    run_with_deadline, stderr_message, write_temp_png, AdapterError, RegionDetector, Result,
};
use crate::layout::{BoundingBox, DetectedRegion};

/// Regions below this confidence never reach the pipeline
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.25;

/// One region as printed by the detection command
#[derive(Debug, Deserialize)]
struct WireRegion {
    bbox: [f64; 4],
    class_id: i64,
    confidence: f64,
}

/// Detector that delegates to an external command
#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: PathBuf,
    args: Vec<String>,
    confidence_threshold: f64,
    timeout: Option<Duration>,
}

impl CommandDetector {
    /// Create a detector for the given program
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            timeout: None,
        }
    }

    /// Arguments placed before the image path
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the confidence threshold (clamped to 0-1)
    #[must_use]
    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Kill the command if one page takes longer than `timeout`
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.confidence_threshold
    }

    /// Parse command output and apply the confidence threshold
    pub fn parse_output(stdout: &str, threshold: f64) -> Result<Vec<DetectedRegion>> {
        let wire: Vec<WireRegion> = serde_json::from_str(stdout.trim())
            .map_err(|e| AdapterError::MalformedOutput(format!("detector JSON: {}", e)))?;

        let mut regions = Vec::with_capacity(wire.len());
        for w in wire {
            if w.bbox.iter().any(|v| !v.is_finite()) || !w.confidence.is_finite() {
                return Err(AdapterError::MalformedOutput(format!(
                    "non-finite detection: {:?}",
                    w
                )));
            }
            if w.confidence < threshold {
                continue;
            }

            let [ax, ay, bx, by] = w.bbox;
            let bbox = BoundingBox::new(ax.min(bx), ay.min(by), ax.max(bx), ay.max(by));
            regions.push(DetectedRegion::new(bbox, w.class_id, w.confidence));
        }

        Ok(regions)
    }
}

impl RegionDetector for CommandDetector {
    fn detect(&self, page: &RgbImage) -> Result<Vec<DetectedRegion>> {
        let image_file = write_temp_png(page)?;

        let tool = self.program.display().to_string();
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(image_file.path())
            .arg("--conf")
            .arg(self.confidence_threshold.to_string());
        let output = run_with_deadline(&mut command, &tool, self.timeout)?;

        if !output.status.success() {
            return Err(AdapterError::CommandFailed {
                tool,
                message: stderr_message(&output),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let regions = Self::parse_output(&stdout, self.confidence_threshold)?;
        debug!(count = regions.len(), "detector returned regions");
        Ok(regions)
    }

    fn enforces_deadline(&self) -> bool {
        self.timeout.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output() {
        let json = r#"[
            {"bbox": [10, 10, 200, 40], "class_id": 0, "confidence": 0.9},
            {"bbox": [10.5, 50.0, 300.0, 120.25], "class_id": 1, "confidence": 0.75}
        ]"#;

        let regions = CommandDetector::parse_output(json, 0.25).unwrap();

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].class_id, 0);
        assert_eq!(regions[0].bbox, BoundingBox::new(10.0, 10.0, 200.0, 40.0));
        assert_eq!(regions[1].bbox.y2, 120.25);
    }

    #[test]
    fn test_parse_output_applies_threshold() {
        let json = r#"[
            {"bbox": [0, 0, 10, 10], "class_id": 1, "confidence": 0.24},
            {"bbox": [0, 20, 10, 30], "class_id": 1, "confidence": 0.25}
        ]"#;

        let regions = CommandDetector::parse_output(json, DEFAULT_CONFIDENCE_THRESHOLD).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bbox.y1, 20.0);
    }

    #[test]
    fn test_parse_output_normalizes_corners() {
        let json = r#"[{"bbox": [50, 60, 10, 20], "class_id": 3, "confidence": 0.8}]"#;
        let regions = CommandDetector::parse_output(json, 0.25).unwrap();
        assert_eq!(regions[0].bbox, BoundingBox::new(10.0, 20.0, 50.0, 60.0));
    }

    #[test]
    fn test_parse_output_empty() {
        assert!(CommandDetector::parse_output("[]", 0.25).unwrap().is_empty());
        assert!(CommandDetector::parse_output("  []\n", 0.25).unwrap().is_empty());
    }

    #[test]
    fn test_parse_output_malformed() {
        assert!(matches!(
            CommandDetector::parse_output("not json", 0.25),
            Err(AdapterError::MalformedOutput(_))
        ));
        assert!(matches!(
            CommandDetector::parse_output(r#"[{"bbox": [1, 2, 3], "class_id": 0, "confidence": 1}]"#, 0.25),
            Err(AdapterError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_builder() {
        let detector = CommandDetector::new("detect.py")
            .args(["--model", "doclayout.pt"])
            .confidence_threshold(1.5);

        assert_eq!(detector.threshold(), 1.0);
        assert_eq!(detector.args, vec!["--model", "doclayout.pt"]);
    }

    #[test]
    fn test_detect_missing_program() {
        let detector = CommandDetector::new("/nonexistent/detector");
        let page = RgbImage::new(4, 4);
        assert!(matches!(
            detector.detect(&page),
            Err(AdapterError::CommandFailed { .. })
        ));
    }

    /// Detector running `body` through `sh`; the script sees the usual arguments
    #[cfg(unix)]
    fn shell_detector(dir: &std::path::Path, body: &str) -> CommandDetector {
        let script = dir.join("detect.sh");
        std::fs::write(&script, body).unwrap();
        CommandDetector::new("sh").args([script.display().to_string()])
    }

    #[cfg(unix)]
    #[test]
    fn test_detect_runs_command() {
        let dir = tempfile::tempdir().unwrap();
        let detector = shell_detector(
            dir.path(),
            r#"echo '[{"bbox": [0, 0, 10, 10], "class_id": 3, "confidence": 0.9}]'"#,
        )
        .timeout(Some(std::time::Duration::from_secs(10)));

        let regions = detector.detect(&RgbImage::new(4, 4)).unwrap();

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].class_id, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_detect_kills_slow_command() {
        let dir = tempfile::tempdir().unwrap();
        let detector = shell_detector(dir.path(), "sleep 5")
            .timeout(Some(std::time::Duration::from_millis(100)));
        assert!(detector.enforces_deadline());

        let started = std::time::Instant::now();
        let result = detector.detect(&RgbImage::new(4, 4));

        assert!(matches!(result, Err(AdapterError::Timeout(_))));
        assert!(started.elapsed() < std::time::Duration::from_secs(4));
    }

    #[test]
    fn test_no_deadline_by_default() {
        assert!(!CommandDetector::new("detect").enforces_deadline());
    }
}
