//! Bounding-box text locator
//!
//! Parses word-level hOCR markup and answers "where on the image is this
//! spelling". Every recognised word node carries a title attribute such as
//! `bbox 10 10 90 20; x_wconf 95`.

use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::geometry::BoundingBox;

static BBOX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"bbox (-?\d+) (-?\d+) (-?\d+) (-?\d+)").unwrap());

static CONFIDENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"x_wconf (\d+(?:\.\d+)?)").unwrap());

// ============================================================
// Error Types
// ============================================================

/// Markup parsing errors
///
/// A spelling that is simply absent is not an error: lookups return an empty
/// list.
#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("Malformed markup: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed markup attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Unparseable bbox in title {0:?}")]
    InvalidBBox(String),
}

pub type Result<T> = std::result::Result<T, MarkupError>;

// ============================================================
// Document
// ============================================================

/// One recognised word
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    pub bbox: BoundingBox,
    /// Recognition confidence on a 0-100 scale, when reported
    pub confidence: Option<f64>,
    /// Identifier of the enclosing line (or the word's own node when it has
    /// no positioned parent)
    pub line: usize,
}

/// Parsed hOCR markup: the positioned words in document order
#[derive(Debug, Clone, Default)]
pub struct HocrDocument {
    words: Vec<OcrWord>,
}

/// Open element while streaming
struct Frame {
    serial: usize,
    bbox: Option<BoundingBox>,
    confidence: Option<f64>,
    text: String,
}

impl HocrDocument {
    /// Parse hOCR markup
    ///
    /// Text is attributed to the nearest enclosing element that carries a
    /// bbox, so words wrapped in inline styling (`<strong>`, `<em>`) keep
    /// their word-level box.
    pub fn parse(markup: &str) -> Result<Self> {
        let mut reader = Reader::from_str(markup);
        reader.trim_text(false);

        let mut stack: Vec<Frame> = Vec::new();
        let mut words = Vec::new();
        let mut serial = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let (bbox, confidence) = parse_title(&e)?;
                    stack.push(Frame {
                        serial,
                        bbox,
                        confidence,
                        text: String::new(),
                    });
                    serial += 1;
                }
                Event::Text(e) => {
                    let text = match e.unescape() {
                        Ok(text) => text.into_owned(),
                        // HTML entities such as &nbsp; are not XML entities
                        Err(_) => String::from_utf8_lossy(&e).into_owned(),
                    };
                    if let Some(frame) = stack.iter_mut().rev().find(|f| f.bbox.is_some()) {
                        frame.text.push_str(&text);
                    }
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    if let Some(frame) = stack.iter_mut().rev().find(|f| f.bbox.is_some()) {
                        frame.text.push_str(&text);
                    }
                }
                Event::End(_) => {
                    let Some(frame) = stack.pop() else {
                        continue;
                    };
                    let (Some(bbox), text) = (frame.bbox, frame.text.trim()) else {
                        continue;
                    };
                    if text.is_empty() {
                        continue;
                    }
                    let line = stack
                        .iter()
                        .rev()
                        .find(|f| f.bbox.is_some())
                        .map_or(frame.serial, |parent| parent.serial);
                    words.push(OcrWord {
                        text: text.to_string(),
                        bbox,
                        confidence: frame.confidence,
                        line,
                    });
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { words })
    }

    pub fn words(&self) -> &[OcrWord] {
        &self.words
    }

    /// Boxes of every word containing `spelling` (case-insensitive)
    ///
    /// Words reporting a confidence below `min_confidence` are dropped. A
    /// spelling with spaces is matched against runs of consecutive words on
    /// one line, and its box is the union of the run.
    pub fn text_bounds(&self, spelling: &str, min_confidence: f64) -> Vec<BoundingBox> {
        let needle = spelling.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let confident = |w: &OcrWord| {
            let keep = w.confidence.is_none_or(|c| c >= min_confidence);
            if !keep {
                debug!("Dropping low-confidence word {:?} ({:?})", w.text, w.confidence);
            }
            keep
        };

        let word_count = needle.split_whitespace().count();
        if word_count <= 1 {
            return self
                .words
                .iter()
                .filter(|w| w.text.to_lowercase().contains(&needle))
                .filter(|w| confident(*w))
                .map(|w| w.bbox)
                .collect();
        }

        let mut found = Vec::new();
        for start in 0..self.words.len() {
            let line = self.words[start].line;
            let run: Vec<&OcrWord> = self.words[start..]
                .iter()
                .take_while(|w| w.line == line)
                .take(word_count)
                .collect();
            if run.len() < word_count {
                continue;
            }
            let joined = run
                .iter()
                .map(|w| w.text.to_lowercase())
                .collect::<Vec<_>>()
                .join(" ");
            if !joined.contains(&needle) || !run.iter().all(|w| confident(*w)) {
                continue;
            }
            let bbox = run[1..]
                .iter()
                .fold(run[0].bbox, |acc, w| acc.union(&w.bbox));
            found.push(bbox);
        }
        found
    }
}

/// Locate `spelling` in raw markup
pub fn text_bounds(markup: &str, spelling: &str, min_confidence: f64) -> Result<Vec<BoundingBox>> {
    Ok(HocrDocument::parse(markup)?.text_bounds(spelling, min_confidence))
}

/// Parse the bbox and confidence out of an element's title attribute
fn parse_title(element: &BytesStart<'_>) -> Result<(Option<BoundingBox>, Option<f64>)> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() != b"title" {
            continue;
        }
        let title = String::from_utf8_lossy(&attr.value).into_owned();
        if !title.contains("bbox") {
            return Ok((None, None));
        }

        let caps = BBOX_RE
            .captures(&title)
            .ok_or_else(|| MarkupError::InvalidBBox(title.clone()))?;
        let mut coords = [0i32; 4];
        for (i, coord) in coords.iter_mut().enumerate() {
            *coord = caps[i + 1]
                .parse()
                .map_err(|_| MarkupError::InvalidBBox(title.clone()))?;
        }
        let bbox = BoundingBox::new(coords[0], coords[1], coords[2], coords[3]);

        let confidence = match CONFIDENCE_RE.captures(&title) {
            Some(c) => Some(
                c[1].parse::<f64>()
                    .map_err(|_| MarkupError::InvalidBBox(title.clone()))?,
            ),
            None => None,
        };
        return Ok((Some(bbox), confidence));
    }
    Ok((None, None))
}


#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html><body>
<div class='ocr_page' id='page_1' title='image "x.png"; bbox 0 0 1000 1000; ppageno 0'>
 <span class='ocr_line' id='line_1_1' title="bbox 10 10 400 20; baseline 0 0">
  <span class='ocrx_word' id='word_1_1' title='bbox 10 10 90 20; x_wconf 91'>DESTINATION</span>
  <span class='ocrx_word' id='word_1_2' title='bbox 300 10 400 20; x_wconf 88'>SEATS</span>
 </span>
 <span class='ocr_line' id='line_1_2' title="bbox 0 80 200 110; baseline 0 0">
  <span class='ocrx_word' id='word_1_3' title='bbox 0 80 30 95; x_wconf 93'>Hill</span>
  <span class='ocrx_word' id='word_1_4' title='bbox 35 80 60 95; x_wconf 90'>AFB</span>
  <span class='ocrx_word' id='word_1_5' title='bbox 100 100 140 110; x_wconf 96'><strong>1430</strong></span>
  <span class='ocrx_word' id='word_1_6' title='bbox 150 100 190 110; x_wconf 4'>1430</span>
 </span>
</div>
</body></html>"#;

    #[test]
    fn test_parse_words_in_order() {
        let doc = HocrDocument::parse(SAMPLE).unwrap();
        let texts: Vec<&str> = doc.words().iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["DESTINATION", "SEATS", "Hill", "AFB", "1430", "1430"]);
        assert_eq!(doc.words()[0].confidence, Some(91.0));
        assert_eq!(doc.words()[0].line, doc.words()[1].line);
        assert_ne!(doc.words()[1].line, doc.words()[2].line);
    }

    #[test]
    fn test_text_bounds_case_insensitive() {
        let found = text_bounds(SAMPLE, "destination", 10.0).unwrap();
        assert_eq!(found, vec![BoundingBox::new(10, 10, 90, 20)]);
    }

    #[test]
    fn test_text_bounds_inline_styling_and_confidence() {
        // the second 1430 is below the confidence threshold
        let found = text_bounds(SAMPLE, "1430", 10.0).unwrap();
        assert_eq!(found, vec![BoundingBox::new(100, 100, 140, 110)]);

        let all = text_bounds(SAMPLE, "1430", 0.0).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_text_bounds_multi_word() {
        let found = text_bounds(SAMPLE, "hill afb", 10.0).unwrap();
        assert_eq!(found, vec![BoundingBox::new(0, 80, 60, 95)]);

        // words on different lines never join
        assert!(text_bounds(SAMPLE, "seats hill", 10.0).unwrap().is_empty());
    }

    #[test]
    fn test_not_found_is_empty() {
        assert!(text_bounds(SAMPLE, "travis", 10.0).unwrap().is_empty());
        assert!(text_bounds("", "travis", 10.0).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_markup_is_error() {
        let bad_box = "<span title='bbox 10 10 ninety 20'>x</span>";
        assert!(matches!(
            text_bounds(bad_box, "x", 10.0),
            Err(MarkupError::InvalidBBox(_))
        ));

        let bad_xml = "<div><span title='bbox 1 1 2 2'>x</div></span>";
        assert!(matches!(text_bounds(bad_xml, "x", 10.0), Err(MarkupError::Xml(_))));
    }

    #[test]
    fn test_builder_markup() {
        let markup = test_support::hocr(&[&[("TRAVIS", (0, 200, 40, 215)), ("AFB", (45, 200, 60, 215))]]);
        let found = text_bounds(&markup, "travis afb", 10.0).unwrap();
        assert_eq!(found, vec![BoundingBox::new(0, 200, 60, 215)]);
    }
}
