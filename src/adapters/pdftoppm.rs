//! Poppler-based rasterizer
//!
//! Renders single pages with `pdftoppm -singlefile`, one process per page,
//! so that a page that fails to render does not take its siblings with it.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::RgbImage;
use tracing::debug;

use super::{stderr_message, AdapterError, Rasterizer, Result};

/// PDF user space units per inch
pub const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Default page zoom factor
pub const DEFAULT_SCALE: f32 = 2.0;

/// Rasterizer backed by the `pdftoppm` command
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: PathBuf,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pdftoppm"),
        }
    }
}

impl PdftoppmRasterizer {
    /// Use a specific `pdftoppm` binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locate `pdftoppm` on `PATH`
    pub fn locate() -> Result<Self> {
        which::which("pdftoppm")
            .map(Self::with_program)
            .map_err(|_| AdapterError::ToolNotFound("pdftoppm".to_string()))
    }

    /// Rendering resolution for a zoom factor (zoom 1.0 = 72 DPI)
    pub fn dpi_for_scale(scale: f32) -> f32 {
        PDF_POINTS_PER_INCH * scale
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn page_count(&self, document: &Path) -> Result<usize> {
        let doc = lopdf::Document::load(document)
            .map_err(|e| AdapterError::Document(format!("{}: {}", document.display(), e)))?;
        Ok(doc.get_pages().len())
    }

    fn render_page(&self, document: &Path, page_index: usize, scale: f32) -> Result<RgbImage> {
        let work_dir = tempfile::tempdir()?;
        let prefix = work_dir.path().join("page");

        // pdftoppm page numbers are 1-based
        let page_number = (page_index + 1).to_string();
        let dpi = Self::dpi_for_scale(scale);

        debug!(page = page_index, dpi, "rendering page");

        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-singlefile")
            .arg("-r")
            .arg(format!("{}", dpi))
            .arg("-f")
            .arg(&page_number)
            .arg("-l")
            .arg(&page_number)
            .arg(document)
            .arg(&prefix)
            .output()
            .map_err(|e| AdapterError::CommandFailed {
                tool: "pdftoppm".to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(AdapterError::CommandFailed {
                tool: "pdftoppm".to_string(),
                message: stderr_message(&output),
            });
        }

        let image_path = prefix.with_extension("png");
        if !image_path.exists() {
            return Err(AdapterError::MalformedOutput(format!(
                "pdftoppm produced no image for page {}",
                page_number
            )));
        }

        Ok(image::open(&image_path)?.to_rgb8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dpi_for_scale() {
        assert_eq!(PdftoppmRasterizer::dpi_for_scale(1.0), 72.0);
        assert_eq!(PdftoppmRasterizer::dpi_for_scale(DEFAULT_SCALE), 144.0);
    }

    #[test]
    fn test_page_count_missing_document() {
        let rasterizer = PdftoppmRasterizer::default();
        let result = rasterizer.page_count(Path::new("/nonexistent/file.pdf"));
        assert!(matches!(result, Err(AdapterError::Document(_))));
    }

    #[test]
    fn test_page_count_not_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let rasterizer = PdftoppmRasterizer::default();
        assert!(matches!(
            rasterizer.page_count(&path),
            Err(AdapterError::Document(_))
        ));
    }

    #[test]
    fn test_render_with_missing_program() {
        let rasterizer = PdftoppmRasterizer::with_program("/nonexistent/pdftoppm");
        let result = rasterizer.render_page(Path::new("doc.pdf"), 0, 2.0);
        assert!(matches!(result, Err(AdapterError::CommandFailed { .. })));
    }
}
