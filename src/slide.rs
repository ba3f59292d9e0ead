//! Slides: one OCR pass over one image variant of a photographed schedule

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::BoundingBox;

/// Suffix used for slides re-OCR'd from a cropped header band
pub const CROPPED_SUFFIX: &str = "c";

/// Image pre-processing applied before OCR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideVariant {
    /// Photo as downloaded
    Original,
    /// Recolored so dark text on light cells survives thresholding
    DarkText,
    /// Recolored so light text on dark cells survives thresholding
    LightText,
}

impl SlideVariant {
    /// All variants, in the order they are OCR'd
    pub const ALL: [SlideVariant; 3] = [
        SlideVariant::Original,
        SlideVariant::DarkText,
        SlideVariant::LightText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlideVariant::Original => "original",
            SlideVariant::DarkText => "dark_text",
            SlideVariant::LightText => "light_text",
        }
    }
}

impl fmt::Display for SlideVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A passenger terminal whose schedule photos are processed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Terminal {
    pub title: String,
    pub id: String,
}

impl Terminal {
    pub fn new(title: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: id.into(),
        }
    }
}

/// Identity and upload time of the source photograph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSource {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// One OCR'd image variant of one photograph
///
/// Immutable once produced. Cropping derives a new `Slide` with narrowed
/// `image_bounds` and freshly OCR'd text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub variant: SlideVariant,
    #[serde(default)]
    pub crop_suffix: Option<String>,
    pub terminal: Terminal,
    pub photo: PhotoSource,
    /// Pixel bounds of the OCR'd image
    pub image_bounds: BoundingBox,
    pub plain_text: String,
    /// Word-level hOCR markup
    pub markup: String,
}

impl Slide {
    /// Derive a cropped slide from new OCR output
    pub fn cropped(
        &self,
        bounds: BoundingBox,
        plain_text: String,
        markup: String,
    ) -> Slide {
        Slide {
            variant: self.variant,
            crop_suffix: Some(CROPPED_SUFFIX.to_string()),
            terminal: self.terminal.clone(),
            photo: self.photo.clone(),
            image_bounds: bounds,
            plain_text,
            markup,
        }
    }

    /// Whether `y` lies within the top `ratio` of the image height
    pub fn is_within_height_ratio(&self, y: i32, ratio: f64) -> bool {
        let height = self.image_bounds.height() as f64;
        (y - self.image_bounds.min_y) as f64 <= height * ratio
    }

    /// Short label for log lines
    pub fn label(&self) -> String {
        match &self.crop_suffix {
            Some(suffix) => format!("{}:{}_{}", self.photo.id, self.variant, suffix),
            None => format!("{}:{}", self.photo.id, self.variant),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::slide;
    use super::*;

    #[test]
    fn test_height_ratio() {
        let s = slide(SlideVariant::Original, "", "");
        assert!(s.is_within_height_ratio(200, 0.5));
        assert!(s.is_within_height_ratio(500, 0.5));
        assert!(!s.is_within_height_ratio(501, 0.5));
    }

    #[test]
    fn test_cropped_keeps_identity() {
        let s = slide(SlideVariant::DarkText, "full", "<html/>");
        let band = BoundingBox::new(0, 40, 1000, 70);
        let c = s.cropped(band, "12 oct 2026".to_string(), String::new());

        assert_eq!(c.variant, SlideVariant::DarkText);
        assert_eq!(c.crop_suffix.as_deref(), Some(CROPPED_SUFFIX));
        assert_eq!(c.photo, s.photo);
        assert_eq!(c.image_bounds, band);
        // original untouched
        assert_eq!(s.plain_text, "full");
        assert!(s.crop_suffix.is_none());
        assert_eq!(c.label(), "photo-1:dark_text_c");
    }
}
