//! Image pre-processing for OCR
//!
//! Schedule boards mix dark text on light cells with light text on dark
//! cells. Each photo is OCR'd as the original plus one recolored variant per
//! text color, where everything not close to that color is washed out.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Luma};
use thiserror::Error;

use crate::geometry::BoundingBox;
use crate::slide::SlideVariant;

/// Fraction of the intensity range still counted as the text color
pub const COLOR_FUZZ: f32 = 0.35;

/// Image processing error types
#[derive(Debug, Error)]
pub enum ImagingError {
    #[error("Failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Crop {bounds:?} lies outside the {width}x{height} image")]
    EmptyCrop {
        bounds: BoundingBox,
        width: u32,
        height: u32,
    },
}

pub type Result<T> = std::result::Result<T, ImagingError>;

/// Load a photo from disk
pub fn load_photo(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|source| ImagingError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Pixel bounds of a whole image
pub fn image_bounds(image: &DynamicImage) -> BoundingBox {
    BoundingBox::from_size(image.width(), image.height())
}

/// Produce the image OCR'd for `variant`
///
/// The recolored variants are black text on white, as Tesseract expects.
pub fn variant_image(image: &DynamicImage, variant: SlideVariant) -> DynamicImage {
    let fuzz = (255.0 * COLOR_FUZZ) as u8;
    match variant {
        SlideVariant::Original => image.clone(),
        SlideVariant::DarkText => DynamicImage::ImageLuma8(keep_intensity(image, |v| v <= fuzz)),
        SlideVariant::LightText => {
            DynamicImage::ImageLuma8(keep_intensity(image, |v| v >= 255 - fuzz))
        }
    }
}

/// Black where `is_text` holds, white elsewhere
fn keep_intensity(image: &DynamicImage, is_text: impl Fn(u8) -> bool) -> GrayImage {
    let gray = image.to_luma8();
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = if is_text(pixel[0]) { 0 } else { 255 };
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

/// Crop `bounds` out of `image`, clamped to the image
pub fn crop_band(image: &DynamicImage, bounds: &BoundingBox) -> Result<DynamicImage> {
    let clamped = bounds.intersection(&image_bounds(image));
    match clamped {
        Some(b) if b.width() > 0 && b.height() > 0 => Ok(image.crop_imm(
            b.min_x as u32,
            b.min_y as u32,
            b.width() as u32,
            b.height() as u32,
        )),
        _ => Err(ImagingError::EmptyCrop {
            bounds: *bounds,
            width: image.width(),
            height: image.height(),
        }),
    }
}
