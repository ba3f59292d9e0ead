//! OCR collaborator
//!
//! Runs the `tesseract` command line tool on an image and returns both the
//! plain text and the word-level hOCR markup the extractors need.

use std::path::PathBuf;
use std::process::Command;

use image::DynamicImage;
use thiserror::Error;
use tracing::debug;

/// Binary looked up on `PATH`
pub const TESSERACT_BINARY: &str = "tesseract";

/// OCR error types
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("tesseract not found on PATH: {0}")]
    NotInstalled(#[from] which::Error),

    #[error("Failed to stage image for OCR: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write OCR input image: {0}")]
    Image(#[from] image::ImageError),

    #[error("tesseract exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

pub type Result<T> = std::result::Result<T, OcrError>;

/// Text recognized on one image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrOutput {
    pub plain_text: String,
    /// hOCR document with per-word `bbox` and `x_wconf`
    pub markup: String,
}

/// Anything that can read text off an image
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput>;
}

/// Tesseract invoked as a subprocess
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    language: String,
}

impl TesseractCli {
    /// Locate `tesseract` on `PATH`
    pub fn locate() -> Result<Self> {
        let binary = which::which(TESSERACT_BINARY)?;
        debug!("Using tesseract at {}", binary.display());
        Ok(Self::with_binary(binary))
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            language: "eng".to_string(),
        }
    }

    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// `tesseract <input> stdout -l <lang> [config]`
    fn run(&self, input: &std::path::Path, config: Option<&str>) -> Result<String> {
        let mut command = Command::new(&self.binary);
        command.arg(input).arg("stdout").arg("-l").arg(&self.language);
        if let Some(config) = config {
            command.arg(config);
        }

        let output = command.output()?;
        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput> {
        // removed when dropped
        let input = tempfile::Builder::new()
            .prefix("slide-")
            .suffix(".png")
            .tempfile()?;
        image.save(input.path())?;

        let plain_text = self.run(input.path(), None)?;
        let markup = self.run(input.path(), Some("hocr"))?;
        debug!(
            "OCR read {} chars of text, {} bytes of hOCR",
            plain_text.len(),
            markup.len()
        );

        Ok(OcrOutput { plain_text, markup })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_missing_binary_reports_io_error() {
        let engine = TesseractCli::with_binary("/nonexistent/tesseract");
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 255, 255])));
        let err = engine.recognize(&img).unwrap_err();
        assert!(matches!(err, OcrError::Io(_)));
    }

    #[test]
    fn test_language_builder() {
        let engine = TesseractCli::with_binary("tesseract").language("deu");
        assert_eq!(engine.language, "deu");
    }

    #[test]
    fn test_failed_display() {
        let err = OcrError::Failed {
            status: "exit status: 1".to_string(),
            stderr: "Error opening data file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "tesseract exited with exit status: 1: Error opening data file"
        );
    }
}
