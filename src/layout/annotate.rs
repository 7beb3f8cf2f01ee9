//! Page annotation
//!
//! Draws every detection onto a copy of the page image: a coloured box per
//! region, a filled label tab, and the label text `"<type> <confidence>"`
//! when a font is available.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::{debug, info};

use super::classify::RegionClassifier;
use super::types::{DetectedRegion, LayoutError, RegionType, Result};

const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Padding around label text, in pixels
const LABEL_PADDING: u32 = 5;

/// Label tab height used when no font is loaded
const FALLBACK_TAB_HEIGHT: u32 = 6;

/// Common system font locations, tried in order
const SYSTEM_FONT_PATHS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Box colour for a region type
pub fn type_color(region_type: RegionType) -> Rgb<u8> {
    match region_type {
        RegionType::Title => Rgb([163, 81, 251]),
        RegionType::PlainText => Rgb([76, 145, 232]),
        RegionType::AbandonedText => Rgb([158, 158, 158]),
        RegionType::Figure => Rgb([235, 87, 87]),
        RegionType::FigureCaption => Rgb([242, 153, 74]),
        RegionType::Table => Rgb([39, 174, 96]),
        RegionType::TableCaption => Rgb([111, 207, 151]),
        RegionType::TableFootnote => Rgb([33, 150, 83]),
        RegionType::IsolatedFormula => Rgb([242, 201, 76]),
        RegionType::FormulaCaption => Rgb([214, 163, 0]),
        RegionType::Unknown => Rgb([90, 90, 90]),
    }
}

/// Label drawn next to a detection
pub fn detection_label(region: &DetectedRegion) -> String {
    let region_type = RegionClassifier::classify(region.class_id);
    format!("{} {:.2}", region_type.label(), region.confidence)
}

/// Draws detections onto page images
pub struct PageAnnotator {
    /// Font for label text. Without one only boxes and tabs are drawn.
    font: Option<FontVec>,
    font_scale: f32,
    thickness: u32,
}

impl Default for PageAnnotator {
    fn default() -> Self {
        Self {
            font: None,
            font_scale: 14.0,
            thickness: 2,
        }
    }
}

impl PageAnnotator {
    /// Annotator with a font loaded from `font_path`
    pub fn with_font_path(font_path: &Path) -> Result<Self> {
        let data = std::fs::read(font_path)?;
        let font = FontVec::try_from_vec(data)
            .map_err(|_| LayoutError::InvalidFont(font_path.to_path_buf()))?;
        Ok(Self {
            font: Some(font),
            ..Default::default()
        })
    }

    /// Annotator with the first system font found, or none
    pub fn with_system_font() -> Self {
        for path in SYSTEM_FONT_PATHS {
            if let Ok(annotator) = Self::with_font_path(Path::new(path)) {
                info!("Loaded label font: {}", path);
                return annotator;
            }
        }
        debug!("No system font found, labels will be drawn without text");
        Self::default()
    }

    /// Set the box outline thickness (minimum 1)
    #[must_use]
    pub fn thickness(mut self, thickness: u32) -> Self {
        self.thickness = thickness.max(1);
        self
    }

    #[must_use]
    pub fn font_scale(mut self, scale: f32) -> Self {
        self.font_scale = scale;
        self
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Copy `page` and draw `regions` on it in the given order
    pub fn annotate(&self, page: &RgbImage, regions: &[DetectedRegion]) -> RgbImage {
        let mut canvas = page.clone();
        for region in regions {
            self.draw_region(&mut canvas, region);
        }
        canvas
    }

    fn draw_region(&self, canvas: &mut RgbImage, region: &DetectedRegion) {
        let Some(rect) = region.bbox.clamp_to(canvas.width(), canvas.height()) else {
            return;
        };
        let color = type_color(RegionClassifier::classify(region.class_id));

        // Concentric outlines, shrinking inward
        for i in 0..self.thickness {
            let (w, h) = (
                rect.width.saturating_sub(2 * i),
                rect.height.saturating_sub(2 * i),
            );
            if w == 0 || h == 0 {
                break;
            }
            let outline = Rect::at((rect.x + i) as i32, (rect.y + i) as i32).of_size(w, h);
            draw_hollow_rect_mut(canvas, outline, color);
        }

        let label = detection_label(region);
        let scale = PxScale::from(self.font_scale);
        let (text_w, text_h) = match &self.font {
            Some(font) => text_size(scale, font, &label),
            None => (0, 0),
        };

        let tab_w = if self.font.is_some() {
            text_w + 2 * LABEL_PADDING
        } else {
            rect.width.min(40)
        };
        let tab_h = if self.font.is_some() {
            text_h + 2 * LABEL_PADDING
        } else {
            FALLBACK_TAB_HEIGHT
        };

        // Tab sits above the box, or inside it when the box touches the top
        let tab_y = if rect.y >= tab_h { rect.y - tab_h } else { rect.y };
        let tab_w = tab_w.min(canvas.width() - rect.x);
        let tab_h = tab_h.min(canvas.height() - tab_y);
        if tab_w == 0 || tab_h == 0 {
            return;
        }
        draw_filled_rect_mut(
            canvas,
            Rect::at(rect.x as i32, tab_y as i32).of_size(tab_w, tab_h),
            color,
        );

        if let Some(font) = &self.font {
            draw_text_mut(
                canvas,
                LABEL_TEXT_COLOR,
                (rect.x + LABEL_PADDING) as i32,
                (tab_y + LABEL_PADDING) as i32,
                scale,
                font,
                &label,
            );
        }
    }
}
