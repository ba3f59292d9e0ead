//! Extraction configuration
//!
//! Every empirically tuned threshold the extraction engine depends on lives
//! here. Values are read from TOML; missing keys keep their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

// ============================================================
// Constants
// ============================================================

/// Default minimum overlap (of the smaller box's area) for two detections to
/// be duplicates
pub const DEFAULT_DUPLICATE_OVERLAP_THRESHOLD: f64 = 0.5;

/// Default share of the smaller box's height two same-terminal destinations
/// must share to be duplicates
pub const DEFAULT_SAME_BAND_THRESHOLD: f64 = 0.5;

/// Default minimum OCR word confidence (0-100)
pub const DEFAULT_MIN_WORD_CONFIDENCE: f64 = 10.0;

/// Default maximum height ratio for the destination label position
pub const DEFAULT_DESTINATION_LABEL_MAX_HEIGHT_RATIO: f64 = 0.5;

/// Default maximum vertical distance between a roll call and its destination
pub const DEFAULT_ROLL_CALL_LINK_MAX_DISTANCE: i32 = 50;

/// Default vertical distance below which seats link to a row
pub const DEFAULT_SEATS_LINK_THRESHOLD: i32 = -5;

/// Default minimum trainable location keyword length
pub const DEFAULT_MIN_KEYWORD_LENGTH: usize = 5;

/// Default number of times a keyword must be trained before it is suggested
pub const DEFAULT_FUZZY_MIN_FREQUENCY: usize = 1;

/// Default depth cap for location keyword indexes
pub const DEFAULT_LOCATION_MAX_DEPTH: usize = 2;

/// Default maximum distance between a header date and the photo time
pub const DEFAULT_HEADER_DATE_MAX_OFFSET_HOURS: i64 = 144;

/// Default margin around a header line when cropping it for re-OCR
pub const DEFAULT_DATE_CROP_MARGIN: i32 = 5;

/// Default maximum age of a photo worth processing
pub const DEFAULT_MAX_PHOTO_AGE_HOURS: i64 = 24;

/// Application name used for the config directory
pub const APP_NAME: &str = "slide-flights";

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

// ============================================================
// Error Types
// ============================================================

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
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
// Extraction Config
// ============================================================

/// Thresholds used by extraction, linking and batch processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub duplicate_overlap_threshold: f64,
    pub same_band_threshold: f64,
    /// Minimum OCR word confidence on a 0-100 scale
    pub min_word_confidence: f64,
    /// A destination label lower than this share of the image height is
    /// treated as misdetected
    pub destination_label_max_height_ratio: f64,
    /// Pixels; destinations further than this from a roll call never link
    pub roll_call_link_max_distance: i32,
    /// Pixels; seats link only to rows they overlap by more than this
    pub seats_link_threshold: i32,
    pub min_keyword_length: usize,
    pub fuzzy_min_frequency: usize,
    pub location_max_depth: usize,
    pub header_date_max_offset_hours: i64,
    /// Pixels added above and below a header line before re-OCR
    pub date_crop_margin: i32,
    pub max_photo_age_hours: i64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            duplicate_overlap_threshold: DEFAULT_DUPLICATE_OVERLAP_THRESHOLD,
            same_band_threshold: DEFAULT_SAME_BAND_THRESHOLD,
            min_word_confidence: DEFAULT_MIN_WORD_CONFIDENCE,
            destination_label_max_height_ratio: DEFAULT_DESTINATION_LABEL_MAX_HEIGHT_RATIO,
            roll_call_link_max_distance: DEFAULT_ROLL_CALL_LINK_MAX_DISTANCE,
            seats_link_threshold: DEFAULT_SEATS_LINK_THRESHOLD,
            min_keyword_length: DEFAULT_MIN_KEYWORD_LENGTH,
            fuzzy_min_frequency: DEFAULT_FUZZY_MIN_FREQUENCY,
            location_max_depth: DEFAULT_LOCATION_MAX_DEPTH,
            header_date_max_offset_hours: DEFAULT_HEADER_DATE_MAX_OFFSET_HOURS,
            date_crop_margin: DEFAULT_DATE_CROP_MARGIN,
            max_photo_age_hours: DEFAULT_MAX_PHOTO_AGE_HOURS,
        }
    }
}

impl ExtractionConfig {
    /// Create a new config builder
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder::default()
    }

    /// Load a config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// `config.toml` in the user's config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from `path` if given, else from the default location if a file
    /// exists there, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(default) if default.exists() => Self::from_file(&default),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Builder for ExtractionConfig
#[derive(Debug, Default)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    /// Set duplicate overlap threshold (clamped to 0-1)
    #[must_use]
    pub fn duplicate_overlap_threshold(mut self, threshold: f64) -> Self {
        self.config.duplicate_overlap_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set same-band threshold (clamped to 0-1)
    #[must_use]
    pub fn same_band_threshold(mut self, threshold: f64) -> Self {
        self.config.same_band_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set minimum word confidence (clamped to 0-100)
    #[must_use]
    pub fn min_word_confidence(mut self, confidence: f64) -> Self {
        self.config.min_word_confidence = confidence.clamp(0.0, 100.0);
        self
    }

    /// Set destination label height ratio (clamped to 0-1)
    #[must_use]
    pub fn destination_label_max_height_ratio(mut self, ratio: f64) -> Self {
        self.config.destination_label_max_height_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn roll_call_link_max_distance(mut self, pixels: i32) -> Self {
        self.config.roll_call_link_max_distance = pixels;
        self
    }

    #[must_use]
    pub fn seats_link_threshold(mut self, pixels: i32) -> Self {
        self.config.seats_link_threshold = pixels;
        self
    }

    #[must_use]
    pub fn min_keyword_length(mut self, length: usize) -> Self {
        self.config.min_keyword_length = length;
        self
    }

    /// Set minimum training frequency (at least 1)
    #[must_use]
    pub fn fuzzy_min_frequency(mut self, frequency: usize) -> Self {
        self.config.fuzzy_min_frequency = frequency.max(1);
        self
    }

    #[must_use]
    pub fn location_max_depth(mut self, depth: usize) -> Self {
        self.config.location_max_depth = depth;
        self
    }

    #[must_use]
    pub fn header_date_max_offset_hours(mut self, hours: i64) -> Self {
        self.config.header_date_max_offset_hours = hours;
        self
    }

    /// Set header crop margin (at least 0)
    #[must_use]
    pub fn date_crop_margin(mut self, pixels: i32) -> Self {
        self.config.date_crop_margin = pixels.max(0);
        self
    }

    #[must_use]
    pub fn max_photo_age_hours(mut self, hours: i64) -> Self {
        self.config.max_photo_age_hours = hours;
        self
    }

    /// Build the config
    #[must_use]
    pub fn build(self) -> ExtractionConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.duplicate_overlap_threshold, 0.5);
        assert_eq!(config.min_word_confidence, 10.0);
        assert_eq!(config.destination_label_max_height_ratio, 0.5);
        assert_eq!(config.roll_call_link_max_distance, 50);
        assert_eq!(config.seats_link_threshold, -5);
        assert_eq!(config.min_keyword_length, 5);
        assert_eq!(config.fuzzy_min_frequency, 1);
        assert_eq!(config.header_date_max_offset_hours, 144);
    }

    #[test]
    fn test_builder_clamps() {
        let config = ExtractionConfig::builder()
            .duplicate_overlap_threshold(1.5)
            .min_word_confidence(-3.0)
            .fuzzy_min_frequency(0)
            .date_crop_margin(-2)
            .roll_call_link_max_distance(80)
            .build();
        assert_eq!(config.duplicate_overlap_threshold, 1.0);
        assert_eq!(config.min_word_confidence, 0.0);
        assert_eq!(config.fuzzy_min_frequency, 1);
        assert_eq!(config.date_crop_margin, 0);
        assert_eq!(config.roll_call_link_max_distance, 80);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config =
            ExtractionConfig::from_toml_str("roll_call_link_max_distance = 70\n").unwrap();
        assert_eq!(config.roll_call_link_max_distance, 70);
        assert_eq!(config.seats_link_threshold, -5);
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "min_word_confidence = 25.0").unwrap();
        writeln!(file, "max_photo_age_hours = 48").unwrap();

        let config = ExtractionConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.min_word_confidence, 25.0);
        assert_eq!(config.max_photo_age_hours, 48);
    }

    #[test]
    fn test_from_file_errors() {
        let missing = ExtractionConfig::from_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "min_word_confidence = \"high\"").unwrap();
        assert!(matches!(
            ExtractionConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
