//! Header date and row time recovery
//!
//! The schedule header prints the day the schedule covers ("18 Oct 2026" or
//! "October 18, 2026"). OCR mangles both the month name and the digits, so
//! the month is found fuzzily, its header line re-OCR'd from a crop, and every
//! plausible date kept only if it lies near the time the photo was taken.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::config::ExtractionConfig;
use crate::fuzzy::{MatcherSet, MONTHS_LONG};
use crate::markup::HocrDocument;
use crate::pipeline::SlideRefiner;
use crate::slide::Slide;

use super::dedup::dedup;
use super::types::{ExtractError, HeaderDate, Result, RollCall, UnplacedRollCall};

/// 24-hour `HHMM` roll call time
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:[01][0-9]|2[0-3])[0-5][0-9]\b").unwrap());

/// Characters removed from header text before date matching
const HEADER_NOISE: &[char] = &['.', ',', ' '];

// ============================================================
// Month Candidates
// ============================================================

/// A month spelling to look for in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthCandidate {
    pub spelling: String,
    /// 1-based month number
    pub month: u32,
}

/// Current and next month, full names first, then abbreviations
///
/// A photo taken near the end of a month may show the next month's schedule.
pub fn month_candidates(now: DateTime<Utc>) -> Vec<MonthCandidate> {
    let current = now.month0() as usize;
    let next = (current + 1) % 12;

    let long = |i: usize| MonthCandidate {
        spelling: MONTHS_LONG[i].to_string(),
        month: i as u32 + 1,
    };
    let short = |i: usize| MonthCandidate {
        spelling: MONTHS_LONG[i][..3].to_string(),
        month: i as u32 + 1,
    };

    vec![long(current), long(next), short(current), short(next)]
}

// ============================================================
// Date Parsing
// ============================================================

/// Dates written around `spelling` in `text`, day-month-year matches first
///
/// Periods, commas and spaces are removed and the text lowercased first, so
/// "18 Oct. 2026" and "Oct 18, 2026" both become runs like `18oct2026`.
/// Year digits read as `i` or `l` are taken as `1`. Impossible calendar dates
/// are skipped.
pub fn dates_in_text(text: &str, spelling: &str, month: u32) -> Result<Vec<NaiveDate>> {
    let spelling = spelling.trim().to_lowercase();
    if spelling.is_empty() {
        return Ok(Vec::new());
    }
    let escaped = regex::escape(&spelling);
    let input: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !HEADER_NOISE.contains(c))
        .collect();

    let day_month_year =
        Regex::new(&format!("([0-9]{{1,2}})[a-z]{{0,3}}{escaped}([0-9il]{{2,4}})"))
            .map_err(|_| invalid(&spelling, "month spelling"))?;
    let month_day_year =
        Regex::new(&format!("{escaped}([0-9]{{1,2}})[a-z]{{0,3}}([0-9il]{{4}})"))
            .map_err(|_| invalid(&spelling, "month spelling"))?;

    let mut dates = Vec::new();
    for re in [&day_month_year, &month_day_year] {
        for caps in re.captures_iter(&input) {
            let day: u32 = caps[1]
                .parse()
                .map_err(|_| invalid(&caps[1], "header day"))?;
            let year = parse_year(&caps[2])?;
            match NaiveDate::from_ymd_opt(year, month, day) {
                Some(date) => dates.push(date),
                None => debug!("Skipping impossible header date {}-{}-{}", year, month, day),
            }
        }
    }
    Ok(dates)
}

fn parse_year(capture: &str) -> Result<i32> {
    let digits: String = capture
        .chars()
        .map(|c| if c == 'i' || c == 'l' { '1' } else { c })
        .collect();
    let year: i32 = digits.parse().map_err(|_| invalid(capture, "header year"))?;
    Ok(if digits.len() == 2 { 2000 + year } else { year })
}

fn invalid(capture: &str, context: &'static str) -> ExtractError {
    ExtractError::InvalidCapture {
        capture: capture.to_string(),
        context,
    }
}

/// Date closest to `now`, or `None` when even that one is implausibly far
pub fn closest_date(
    dates: &[NaiveDate],
    now: DateTime<Utc>,
    max_offset_hours: i64,
) -> Option<HeaderDate> {
    let (date, offset) = dates
        .iter()
        .map(|date| (*date, (date.and_time(NaiveTime::MIN).and_utc() - now).abs()))
        .min_by_key(|(_, offset)| *offset)?;

    if offset > Duration::hours(max_offset_hours) {
        info!(
            "Header date {} is {}h{:02}m from photo time, treating as unknown",
            date,
            offset.num_hours(),
            offset.num_minutes() % 60
        );
        return None;
    }
    Some(HeaderDate {
        date,
        offset_hours: offset.num_hours(),
    })
}

// ============================================================
// Header Date
// ============================================================

/// Recover the schedule date printed in the header of a photo's slides
///
/// Returns `Ok(None)` when no date is found or the closest one is further than
/// the configured offset from the photo time.
pub fn find_header_date(
    slides: &[Slide],
    matchers: &MatcherSet,
    refiner: &dyn SlideRefiner,
    config: &ExtractionConfig,
) -> Result<Option<HeaderDate>> {
    let Some(first) = slides.first() else {
        return Ok(None);
    };
    let now = first.photo.created_at;
    let mut dates: Vec<NaiveDate> = Vec::new();

    for candidate in month_candidates(now) {
        if let Some((found, source)) =
            matchers.closest_spelling_across_slides(&candidate.spelling, slides)?
        {
            let document = HocrDocument::parse(&source.markup)?;
            let bounds = document.text_bounds(&found.spelling, config.min_word_confidence);

            for slide in slides {
                dates.extend(dates_in_text(&slide.plain_text, &found.spelling, candidate.month)?);

                let Some(line) = bounds.first() else {
                    continue;
                };
                let band = line.horizontal_band(config.date_crop_margin, &slide.image_bounds);
                if let Some(cropped) = refiner.crop_and_ocr(slide, &band)? {
                    dates.extend(dates_in_text(
                        &cropped.plain_text,
                        &found.spelling,
                        candidate.month,
                    )?);
                }
            }

            if bounds.is_empty() {
                debug!(
                    "Month spelling {:?} not located in {}, skipping header crop",
                    found.spelling,
                    source.label()
                );
            }
        }

        // Exact spelling, for months run together with neighbouring text
        for slide in slides {
            dates.extend(dates_in_text(
                &slide.plain_text,
                &candidate.spelling,
                candidate.month,
            )?);
        }
    }

    let header = closest_date(&dates, now, config.header_date_max_offset_hours);
    match &header {
        Some(h) => info!("{} header date {}", first.photo.id, h.date.format("%d %b %Y")),
        None => info!("{} header date unknown ({} candidates)", first.photo.id, dates.len()),
    }
    Ok(header)
}

// ============================================================
// Row Times
// ============================================================

/// Every 24-hour `HHMM` time in `text`, with its literal spelling
pub fn times_in_text(text: &str) -> Result<Vec<(String, NaiveTime)>> {
    let mut times = Vec::new();
    for m in TIME_RE.find_iter(text) {
        let literal = m.as_str();
        let hour: u32 = literal[..2]
            .parse()
            .map_err(|_| invalid(literal, "roll call hour"))?;
        let minute: u32 = literal[2..]
            .parse()
            .map_err(|_| invalid(literal, "roll call minute"))?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| invalid(literal, "roll call time"))?;
        times.push((literal.to_string(), time));
    }
    Ok(times)
}

/// Roll calls located on the slides below `limit_min_y`, deduplicated
///
/// Times found in the text but not in the markup are returned separately:
/// they are real but cannot be linked by position.
pub fn extract_roll_calls(
    slides: &[Slide],
    limit_min_y: i32,
    config: &ExtractionConfig,
) -> Result<(Vec<RollCall>, Vec<UnplacedRollCall>)> {
    let mut placed = Vec::new();
    let mut unplaced: Vec<UnplacedRollCall> = Vec::new();

    for slide in slides {
        let document = HocrDocument::parse(&slide.markup)?;
        for (literal, time) in times_in_text(&slide.plain_text)? {
            let bounds = document.text_bounds(&literal, config.min_word_confidence);
            if bounds.is_empty() {
                if !unplaced.iter().any(|u| u.time == time) {
                    unplaced.push(UnplacedRollCall {
                        time,
                        slide: slide.label(),
                    });
                }
                continue;
            }
            placed.extend(
                bounds
                    .into_iter()
                    .filter(|bbox| bbox.min_y >= limit_min_y)
                    .map(|bbox| RollCall::new(time, bbox)),
            );
        }
    }

    let roll_calls = dedup(&placed, config);
    unplaced.retain(|u| !roll_calls.iter().any(|rc| rc.time == u.time));
    debug!(
        "{} roll calls placed, {} without position",
        roll_calls.len(),
        unplaced.len()
    );
    Ok((roll_calls, unplaced))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::markup::test_support::hocr;
    use crate::pipeline::{NoRefiner, RefineError};
    use crate::slide::test_support::slide;
    use crate::slide::SlideVariant;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_month_candidates() {
        let oct = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let spellings: Vec<_> = month_candidates(oct).into_iter().map(|c| c.spelling).collect();
        assert_eq!(spellings, vec!["october", "november", "oct", "nov"]);

        let dec = Utc.with_ymd_and_hms(2026, 12, 30, 12, 0, 0).unwrap();
        let candidates = month_candidates(dec);
        assert_eq!(candidates[1].spelling, "january");
        assert_eq!(candidates[1].month, 1);
        assert_eq!(candidates[3].spelling, "jan");
    }

    #[test]
    fn test_dates_in_text_formats() {
        assert_eq!(
            dates_in_text("SCHEDULE 18 OCT. 2026", "oct", 10).unwrap(),
            vec![ymd(2026, 10, 18)]
        );
        assert_eq!(
            dates_in_text("Roll calls for October 19, 2026", "october", 10).unwrap(),
            vec![ymd(2026, 10, 19)]
        );
        assert_eq!(
            dates_in_text("18th oct 26", "oct", 10).unwrap(),
            vec![ymd(2026, 10, 18)]
        );
    }

    #[test]
    fn test_dates_in_text_ocr_noise() {
        // misspelled month as found fuzzily; a letter O in the year never parses
        assert_eq!(
            dates_in_text("18 0CT 2O26 / 19 0CT 2026", "0ct", 10).unwrap(),
            vec![ymd(2026, 10, 19)]
        );
        assert_eq!(
            dates_in_text("20 OCT 202l", "oct", 10).unwrap(),
            vec![ymd(2021, 10, 20)]
        );
        assert_eq!(
            dates_in_text("OCT 2O, 2O2i", "oct", 10).unwrap(),
            Vec::<NaiveDate>::new()
        );
        // October 32nd
        assert!(dates_in_text("32 oct 2026", "oct", 10).unwrap().is_empty());
        assert!(dates_in_text("no date", "oct", 10).unwrap().is_empty());
    }

    #[test]
    fn test_spelling_is_escaped() {
        assert!(dates_in_text("18oct2026", "o.t", 10).unwrap().is_empty());
        assert_eq!(
            dates_in_text("18o+t2026", "o+t", 10).unwrap(),
            vec![ymd(2026, 10, 18)]
        );
    }

    #[test]
    fn test_date_sanity_window() {
        let date = ymd(2026, 10, 19);

        // 200 hours before midnight of the 19th
        let far = Utc.with_ymd_and_hms(2026, 10, 10, 16, 0, 0).unwrap();
        assert_eq!(closest_date(&[date], far, 144), None);

        let near = Utc.with_ymd_and_hms(2026, 10, 18, 14, 0, 0).unwrap();
        let kept = closest_date(&[date], near, 144).unwrap();
        assert_eq!(kept.date, date);
        assert_eq!(kept.offset_hours, 10);
    }

    #[test]
    fn test_date_sanity_window_counts_minutes() {
        let date = ymd(2026, 10, 19);

        // 144h59m before midnight of the 19th
        let just_over = Utc.with_ymd_and_hms(2026, 10, 12, 23, 1, 0).unwrap();
        assert_eq!(closest_date(&[date], just_over, 144), None);

        let exactly = Utc.with_ymd_and_hms(2026, 10, 13, 0, 0, 0).unwrap();
        assert_eq!(closest_date(&[date], exactly, 144).unwrap().offset_hours, 144);
    }

    #[test]
    fn test_closest_date_wins() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 6, 0, 0).unwrap();
        let dates = [ymd(2026, 10, 28), ymd(2026, 10, 18), ymd(2016, 10, 18)];
        assert_eq!(closest_date(&dates, now, 144).unwrap().date, ymd(2026, 10, 18));
        assert_eq!(closest_date(&[], now, 144), None);
    }

    struct FixedCrop(&'static str);

    impl SlideRefiner for FixedCrop {
        fn crop_and_ocr(
            &self,
            slide: &Slide,
            bounds: &BoundingBox,
        ) -> std::result::Result<Option<Slide>, RefineError> {
            Ok(Some(slide.cropped(*bounds, self.0.to_string(), String::new())))
        }
    }

    #[test]
    fn test_header_date_from_fuzzy_spelling() {
        let markup = hocr(&[&[
            ("18", (100, 40, 130, 60)),
            ("0CTOBER", (140, 40, 260, 60)),
            ("2026", (270, 40, 330, 60)),
        ]]);
        let slides = vec![
            slide(SlideVariant::Original, "18 0CTOBER 2026", &markup),
            slide(SlideVariant::DarkText, "", ""),
        ];
        let config = ExtractionConfig::default();
        let matchers = MatcherSet::with_schedule_labels(&config);

        let header = find_header_date(&slides, &matchers, &NoRefiner, &config)
            .unwrap()
            .unwrap();
        assert_eq!(header.date, ymd(2026, 10, 18));
    }

    #[test]
    fn test_header_date_from_cropped_slide() {
        // full-image OCR misses the digits, the cropped band recovers them
        let markup = hocr(&[&[("Oct", (140, 40, 200, 60))]]);
        let slides = vec![slide(SlideVariant::Original, "~~ Oct ~~", &markup)];
        let config = ExtractionConfig::default();
        let matchers = MatcherSet::with_schedule_labels(&config);

        let header = find_header_date(&slides, &matchers, &FixedCrop("19 Oct 2026"), &config)
            .unwrap()
            .unwrap();
        assert_eq!(header.date, ymd(2026, 10, 19));

        assert!(find_header_date(&slides, &matchers, &NoRefiner, &config)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_header_date_implausible_is_unknown() {
        let slides = vec![slide(SlideVariant::Original, "18 OCT 2016", "")];
        let config = ExtractionConfig::default();
        let matchers = MatcherSet::with_schedule_labels(&config);
        assert!(find_header_date(&slides, &matchers, &NoRefiner, &config)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_times_in_text() {
        let times = times_in_text("0730 1430\n2359 2400 1460 14301").unwrap();
        let values: Vec<NaiveTime> = times.into_iter().map(|(_, t)| t).collect();
        assert_eq!(values, vec![hm(7, 30), hm(14, 30), hm(23, 59)]);
    }

    #[test]
    fn test_times_in_text_ignores_non_ascii_digits() {
        // U+0663 ARABIC-INDIC DIGIT THREE read in place of a 3
        assert!(times_in_text("roll call 1\u{0663}45 HILL AFB").unwrap().is_empty());

        let times = times_in_text("\u{0661}\u{0664}\u{0663}\u{0660} 0915").unwrap();
        assert_eq!(times, vec![("0915".to_string(), hm(9, 15))]);
    }

    #[test]
    fn test_extract_roll_calls_with_unplaced() {
        let markup = hocr(&[
            &[("DESTINATION", (10, 50, 120, 60))],
            &[("1430", (0, 100, 40, 110)), ("HILL", (60, 100, 100, 110))],
            &[("0200", (0, 20, 40, 30))],
        ]);
        // 1745 is printed with spaced digits: the text has it, the markup does not
        let text = "1430 HILL AFB\n1745 TRAVIS AFB\n0200";
        let slides = vec![
            slide(SlideVariant::Original, text, &markup),
            slide(SlideVariant::DarkText, text, &markup),
        ];

        let (placed, unplaced) =
            extract_roll_calls(&slides, 50, &ExtractionConfig::default()).unwrap();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].time, hm(14, 30));
        assert_eq!(placed[0].bbox, BoundingBox::new(0, 100, 40, 110));

        assert_eq!(unplaced.len(), 1);
        assert_eq!(unplaced[0].time, hm(17, 45));
        assert_eq!(unplaced[0].slide, "photo-1:original");
    }
}
