//! Per-photo pipeline
//!
//! Runs every stage on the slides of one photograph, in order:
//!
//! 1. header date
//! 2. destination label and extraction limit
//! 3. roll calls, seats label and seats
//! 4. destinations, minus the photo's own terminal
//! 5. linking, grouping, flight assembly
//!
//! The stages only see slides. Re-OCR of a cropped region goes through
//! [`SlideRefiner`], so the core runs without images when none are at hand.

use std::collections::HashMap;

use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ExtractionConfig;
use crate::extract::{
    extract_destinations, extract_roll_calls, extract_seats, extraction_limit,
    find_header_date, find_label_bounds, remove_origin_destinations, Detections, ExtractError,
    HeaderDate, UnplacedRollCall,
};
use crate::flight::{assemble_flights, Flight, FlightOrigin};
use crate::fuzzy::{MatcherSet, KEYWORD_DESTINATION, KEYWORD_SEATS};
use crate::geometry::BoundingBox;
use crate::grouping::{initial_groupings, merge_groupings};
use crate::imaging::{crop_band, image_bounds, variant_image, ImagingError};
use crate::link::link_all;
use crate::ocr::{OcrEngine, OcrError};
use crate::slide::{PhotoSource, Slide, SlideVariant, Terminal};

// ============================================================
// Error Types
// ============================================================

/// Failure to crop and re-read part of a slide
#[derive(Debug, Error)]
pub enum RefineError {
    #[error("Imaging error: {0}")]
    Imaging(#[from] ImagingError),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("No source image for slide variant {0}")]
    MissingVariant(SlideVariant),
}

/// Failure processing one photograph
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Photo has no slides")]
    NoSlides,

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Refine(#[from] RefineError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

// ============================================================
// Refinement
// ============================================================

/// Crops a region of a slide's image and OCRs it again
pub trait SlideRefiner: Sync {
    /// `Ok(None)` when the refiner has nothing better to offer
    fn crop_and_ocr(
        &self,
        slide: &Slide,
        bounds: &BoundingBox,
    ) -> std::result::Result<Option<Slide>, RefineError>;
}

/// Refiner for pre-OCR'd slides without images
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRefiner;

impl SlideRefiner for NoRefiner {
    fn crop_and_ocr(
        &self,
        _slide: &Slide,
        _bounds: &BoundingBox,
    ) -> std::result::Result<Option<Slide>, RefineError> {
        Ok(None)
    }
}

/// Refiner backed by the photo's variant images and an OCR engine
pub struct OcrRefiner<'a> {
    variants: HashMap<SlideVariant, DynamicImage>,
    engine: &'a dyn OcrEngine,
}

impl<'a> OcrRefiner<'a> {
    /// Prepare every variant of `photo`
    pub fn new(photo: &DynamicImage, engine: &'a dyn OcrEngine) -> Self {
        let variants = SlideVariant::ALL
            .iter()
            .map(|&variant| (variant, variant_image(photo, variant)))
            .collect();
        Self { variants, engine }
    }

    fn image(&self, variant: SlideVariant) -> std::result::Result<&DynamicImage, RefineError> {
        self.variants
            .get(&variant)
            .ok_or(RefineError::MissingVariant(variant))
    }

    /// OCR every variant into a slide, in [`SlideVariant::ALL`] order
    pub fn slides(
        &self,
        terminal: &Terminal,
        photo: &PhotoSource,
    ) -> std::result::Result<Vec<Slide>, RefineError> {
        SlideVariant::ALL
            .iter()
            .map(|&variant| {
                let image = self.image(variant)?;
                let output = self.engine.recognize(image)?;
                Ok(Slide {
                    variant,
                    crop_suffix: None,
                    terminal: terminal.clone(),
                    photo: photo.clone(),
                    image_bounds: image_bounds(image),
                    plain_text: output.plain_text,
                    markup: output.markup,
                })
            })
            .collect()
    }
}

impl SlideRefiner for OcrRefiner<'_> {
    fn crop_and_ocr(
        &self,
        slide: &Slide,
        bounds: &BoundingBox,
    ) -> std::result::Result<Option<Slide>, RefineError> {
        let band = crop_band(self.image(slide.variant)?, bounds)?;
        let output = self.engine.recognize(&band)?;
        debug!("Re-read {} band {:?}", slide.label(), bounds);
        Ok(Some(slide.cropped(*bounds, output.plain_text, output.markup)))
    }
}

// ============================================================
// Photo Processing
// ============================================================

/// Everything learned from one photograph
#[derive(Debug, Clone, Serialize)]
pub struct PhotoReport {
    pub terminal: Terminal,
    pub photo: PhotoSource,
    pub header_date: Option<HeaderDate>,
    pub flights: Vec<Flight>,
    /// Times read in the text that could not be positioned
    pub unplaced_roll_calls: Vec<UnplacedRollCall>,
    pub destinations_found: usize,
    pub roll_calls_found: usize,
    pub groupings_merged: usize,
}

impl PhotoReport {
    /// Day the flights are filed under
    pub fn schedule_day(&self) -> chrono::NaiveDate {
        self.header_date
            .map(|h| h.date)
            .unwrap_or_else(|| self.photo.created_at.date_naive())
    }
}

/// Extract the flights of one photograph from its slides
///
/// All slides must belong to the same photo. The first slide supplies the
/// terminal, the photo and the reference image height.
pub fn process_photo(
    slides: &[Slide],
    matchers: &MatcherSet,
    refiner: &dyn SlideRefiner,
    config: &ExtractionConfig,
) -> Result<PhotoReport> {
    let first = slides.first().ok_or(PipelineError::NoSlides)?;
    let terminal = &first.terminal;
    let photo = &first.photo;

    let header_date = find_header_date(slides, matchers, refiner, config)?;

    let destination_label = find_label_bounds(KEYWORD_DESTINATION, slides, matchers, config)?;
    let limit = extraction_limit(destination_label, first, config);

    let (roll_calls, unplaced_roll_calls) = extract_roll_calls(slides, limit, config)?;

    let seats_label = find_label_bounds(KEYWORD_SEATS, slides, matchers, config)?;
    let seats = extract_seats(slides, seats_label, config)?;

    let destinations = extract_destinations(slides, limit, matchers, config)?;
    let destinations = remove_origin_destinations(destinations, terminal);

    let mut detections = Detections {
        destinations,
        roll_calls,
        seats,
        unplaced_roll_calls,
    };
    link_all(&mut detections, config);

    let outcome = merge_groupings(initial_groupings(&detections));
    let origin = FlightOrigin {
        terminal,
        photo,
        header_date: header_date.map(|h| h.date),
    };
    let flights = assemble_flights(&mut detections, &outcome.groupings, &origin);

    info!(
        "{} {}: {} flights ({} destinations, {} roll calls)",
        terminal.title,
        photo.id,
        flights.len(),
        detections.destinations.len(),
        detections.roll_calls.len()
    );

    Ok(PhotoReport {
        terminal: terminal.clone(),
        photo: photo.clone(),
        header_date,
        flights,
        unplaced_roll_calls: detections.unplaced_roll_calls,
        destinations_found: detections.destinations.len(),
        roll_calls_found: detections.roll_calls.len(),
        groupings_merged: outcome.merges,
    })
}
