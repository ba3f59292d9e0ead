//! End-to-end tests of the extraction pipeline on synthetic OCR output

use chrono::{NaiveDate, TimeZone, Utc};
use slide_flights::extract::{dedup, Destination, Detections, RollCall, RollCallId};
use slide_flights::link::link_roll_calls_to_destinations;
use slide_flights::{
    process_photo, BoundingBox, ExtractionConfig, JsonFlightStore, NoRefiner, PhotoSource, Slide,
    SlideVariant, Terminal, TerminalCatalog,
};

const CATALOG: &str = r#"{
    "terminals": [
        { "title": "Dover AFB", "id": "dover" },
        { "title": "Hill AFB", "id": "hill" },
        { "title": "Travis AFB", "id": "travis" },
        { "title": "Ramstein AB (Germany)", "id": "ramstein", "aliases": ["Ramstein"] }
    ]
}"#;

type Word<'a> = (&'a str, [i32; 4]);

fn hocr(lines: &[&[Word<'_>]]) -> String {
    let mut out = String::from("<div class='ocr_page' title='bbox 0 0 1000 1000'>");
    for (l, words) in lines.iter().enumerate() {
        out.push_str(&format!("<span class='ocr_line' id='line_{l}' title='bbox 0 0 1000 1000'>"));
        for (text, [x0, y0, x1, y1]) in words.iter() {
            out.push_str(&format!(
                "<span class='ocrx_word' title='bbox {x0} {y0} {x1} {y1}; x_wconf 90'>{text}</span> "
            ));
        }
        out.push_str("</span>");
    }
    out.push_str("</div>");
    out
}

fn slide(variant: SlideVariant, text: &str, markup: String) -> Slide {
    Slide {
        variant,
        crop_suffix: None,
        terminal: Terminal::new("Dover AFB", "dover"),
        photo: PhotoSource {
            id: "photo-42".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap(),
        },
        image_bounds: BoundingBox::new(0, 0, 1000, 1000),
        plain_text: text.to_string(),
        markup,
    }
}

/// Two variants of the same photo, one reading the label as "destinaton"
fn variant_slides() -> Vec<Slide> {
    let rows: [&[Word<'_>]; 3] = [
        &[("HILL", [0, 80, 30, 95]), ("AFB", [35, 80, 60, 95])],
        &[("1430", [0, 100, 40, 110])],
        &[("TRAVIS", [0, 200, 40, 215]), ("AFB", [45, 200, 60, 215])],
    ];

    let a_lines: Vec<&[Word<'_>]> = std::iter::once(&[("DESTINATION", [10, 10, 90, 20])][..])
        .chain(rows.iter().copied())
        .collect();
    let b_lines: Vec<&[Word<'_>]> = std::iter::once(&[("DESTINATON", [12, 11, 88, 19])][..])
        .chain(rows.iter().copied())
        .collect();

    vec![
        slide(
            SlideVariant::Original,
            "DESTINATION\nHILL AFB\n1430\nTRAVIS AFB",
            hocr(&a_lines),
        ),
        slide(
            SlideVariant::DarkText,
            "DESTINATON\nHILL AFB\n1430\nTRAVIS AFB",
            hocr(&b_lines),
        ),
    ]
}

#[test]
fn test_two_variants_end_to_end() {
    let config = ExtractionConfig::default();
    let catalog = TerminalCatalog::from_json_str(CATALOG).unwrap();
    let matchers = catalog.build_matchers(&config);

    let report = process_photo(&variant_slides(), &matchers, &NoRefiner, &config).unwrap();

    // duplicates from the two variants collapse
    assert_eq!(report.destinations_found, 2);
    assert_eq!(report.roll_calls_found, 1);
    assert!(report.header_date.is_none());
    assert_eq!(report.flights.len(), 2);

    let afternoon = Utc.with_ymd_and_hms(2026, 10, 18, 14, 30, 0).unwrap();
    for flight in &report.flights {
        assert_eq!(flight.origin, "Dover AFB");
        assert_eq!(flight.roll_call, Some(afternoon));
        assert!(flight.unknown_roll_call_date);
        assert_eq!(flight.photo_source, "photo-42");
    }
    let mut destinations: Vec<&str> = report
        .flights
        .iter()
        .map(|f| f.destination.as_str())
        .collect();
    destinations.sort();
    assert_eq!(destinations, vec!["Hill AFB", "Travis AFB"]);
}

#[test]
fn test_slide_json_round_trip_through_pipeline() {
    let config = ExtractionConfig::default();
    let matchers = TerminalCatalog::from_json_str(CATALOG)
        .unwrap()
        .build_matchers(&config);

    let json = serde_json::to_string(&variant_slides()).unwrap();
    let slides: Vec<Slide> = serde_json::from_str(&json).unwrap();
    let report = process_photo(&slides, &matchers, &NoRefiner, &config).unwrap();
    assert_eq!(report.flights.len(), 2);
}

#[test]
fn test_label_duplicates_keep_closest_spelling() {
    let config = ExtractionConfig::default();
    let exact = Destination::new("Travis AFB", "travis afb", 0, BoundingBox::new(10, 10, 90, 20));
    let typo = Destination::new("Travis AFB", "travls afb", 1, BoundingBox::new(12, 11, 88, 19));

    for input in [vec![typo.clone(), exact.clone()], vec![exact.clone(), typo.clone()]] {
        let kept = dedup(&input, &config);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].spelling, "travis afb");
    }
}

#[test]
fn test_roll_call_links_nearest_row_only() {
    let mut detections = Detections {
        destinations: vec![
            Destination::new("Hill AFB", "hill afb", 0, BoundingBox::new(0, 80, 60, 95)),
            Destination::new("Travis AFB", "travis afb", 0, BoundingBox::new(0, 200, 60, 215)),
        ],
        roll_calls: vec![RollCall::new(
            chrono::NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
            BoundingBox::new(0, 100, 40, 110),
        )],
        ..Default::default()
    };

    let linked = link_roll_calls_to_destinations(&mut detections, 50);
    assert_eq!(linked, 1);
    assert_eq!(detections.destinations[0].linked_roll_call, Some(RollCallId(0)));
    assert_eq!(detections.destinations[1].linked_roll_call, None);
}

#[test]
fn test_header_date_and_store_window() {
    let config = ExtractionConfig::default();
    let matchers = TerminalCatalog::from_json_str(CATALOG)
        .unwrap()
        .build_matchers(&config);

    let markup = hocr(&[
        &[("19", [300, 10, 330, 30]), ("OCTOBER", [340, 10, 460, 30]), ("2026", [470, 10, 540, 30])],
        &[("DESTINATION", [100, 60, 220, 75])],
        &[("0915", [0, 100, 40, 110]), ("RAMSTEIN", [100, 100, 170, 110])],
    ]);
    let slides = vec![slide(
        SlideVariant::Original,
        "19 OCTOBER 2026\nDESTINATION\n0915 RAMSTEIN",
        markup,
    )];

    let report = process_photo(&slides, &matchers, &NoRefiner, &config).unwrap();
    let tomorrow = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    assert_eq!(report.header_date.map(|h| h.date), Some(tomorrow));
    assert_eq!(report.schedule_day(), tomorrow);
    assert_eq!(report.flights.len(), 1);
    assert_eq!(report.flights[0].destination, "Ramstein AB (Germany)");
    assert_eq!(
        report.flights[0].roll_call,
        Some(Utc.with_ymd_and_hms(2026, 10, 19, 9, 15, 0).unwrap())
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flights.json");
    let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();

    let mut store = JsonFlightStore::open(&path).unwrap();
    store.replace_for_day("Dover AFB", report.schedule_day(), now, report.flights.clone());
    store.save().unwrap();

    // a second photo of the same schedule replaces rather than duplicates
    let mut store = JsonFlightStore::open(&path).unwrap();
    let summary =
        store.replace_for_day("Dover AFB", report.schedule_day(), now, report.flights.clone());
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.inserted, 1);
    assert_eq!(store.flights().len(), 1);
}
