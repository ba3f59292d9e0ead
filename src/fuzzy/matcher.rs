//! Keyword and terminal matching over OCR text
//!
//! A [`MatcherSet`] is built once per batch and shared read-only by every
//! photo worker. It carries two kinds of index:
//!
//! - label indexes, one per keyword (column headers, month names), each at
//!   depth `len / 2`
//! - location indexes, bucketed by depth, holding every terminal keyword
//!
//! plus a stop-list of OCR spellings known to produce false matches.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, warn};

use super::index::FuzzyIndex;
use super::types::{
    FuzzyError, LocationMatch, LocationTraining, Result, SpellingMatch, KEYWORD_DESTINATION,
    KEYWORD_SEATS, MONTHS_LONG,
};
use crate::config::ExtractionConfig;
use crate::slide::Slide;

/// Characters that separate OCR tokens besides whitespace
const TOKEN_SEPARATORS: &[char] = &[',', ';', ':', '.', '(', ')', '*', '=', '"', '|'];

/// Label and location indexes plus the stop-list
#[derive(Debug, Clone)]
pub struct MatcherSet {
    labels: HashMap<String, FuzzyIndex>,
    locations: BTreeMap<usize, FuzzyIndex>,
    keyword_titles: HashMap<String, String>,
    stop_spellings: HashSet<String>,
    min_keyword_length: usize,
    min_frequency: usize,
    location_max_depth: usize,
}

impl MatcherSet {
    /// Create an empty matcher set
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            labels: HashMap::new(),
            locations: BTreeMap::new(),
            keyword_titles: HashMap::new(),
            stop_spellings: HashSet::new(),
            min_keyword_length: config.min_keyword_length,
            min_frequency: config.fuzzy_min_frequency,
            location_max_depth: config.location_max_depth,
        }
    }

    /// Matcher set with the destination/seats headers and every month name,
    /// full and abbreviated, trained as labels
    pub fn with_schedule_labels(config: &ExtractionConfig) -> Self {
        let mut set = Self::new(config);
        set.train_label(KEYWORD_DESTINATION);
        set.train_label(KEYWORD_SEATS);
        for month in MONTHS_LONG {
            set.train_label(month);
            set.train_label(&month[..3]);
        }
        set
    }

    // ============================================================
    // Training
    // ============================================================

    /// Train a label keyword into its own index at depth `len / 2`
    pub fn train_label(&mut self, keyword: &str) {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() || self.labels.contains_key(&keyword) {
            return;
        }
        let mut index = FuzzyIndex::new(keyword.chars().count() / 2, self.min_frequency);
        index.train(&keyword);
        self.labels.insert(keyword, index);
    }

    /// Train one location keyword for `title` into its depth bucket
    ///
    /// Keywords shorter than the minimum length are rejected: short strings
    /// fuzzily match too much ordinary schedule text.
    pub fn train_location_keyword(&mut self, keyword: &str, title: &str) -> Result<()> {
        let keyword = keyword.trim().to_lowercase();
        let len = keyword.chars().count();
        if len < self.min_keyword_length {
            return Err(FuzzyError::KeywordTooShort {
                keyword,
                min_length: self.min_keyword_length,
            });
        }

        let depth = (len / 2).min(self.location_max_depth);
        let min_frequency = self.min_frequency;
        self.locations
            .entry(depth)
            .or_insert_with(|| FuzzyIndex::new(depth, min_frequency))
            .train(&keyword);

        if let Some(previous) = self.keyword_titles.insert(keyword.clone(), title.to_string()) {
            if previous != title {
                warn!(
                    "Location keyword {:?} reassigned from {} to {}",
                    keyword, previous, title
                );
            }
        }
        Ok(())
    }

    /// Train a terminal title, its long components and its aliases
    pub fn train_location(&mut self, title: &str, aliases: &[String]) -> LocationTraining {
        let trimmed = strip_parenthetical(title);
        let mut keywords: Vec<String> = vec![trimmed.clone()];

        let words: Vec<&str> = trimmed.split_whitespace().collect();
        if words.len() > 1 {
            keywords.extend(
                words
                    .iter()
                    .filter(|w| w.chars().count() > self.min_keyword_length)
                    .map(|w| w.to_string()),
            );
        }
        keywords.extend(aliases.iter().cloned());

        let mut outcome = LocationTraining::default();
        for keyword in keywords {
            match self.train_location_keyword(&keyword, title) {
                Ok(()) => outcome.trained.push(keyword.to_lowercase()),
                Err(_) => outcome.rejected.push(keyword),
            }
        }
        outcome
    }

    /// Never match this OCR spelling
    pub fn add_stop_spelling(&mut self, spelling: &str) {
        self.stop_spellings.insert(spelling.trim().to_lowercase());
    }

    fn is_stopped(&self, spelling: &str) -> bool {
        self.stop_spellings.contains(spelling)
    }

    /// Title a trained location keyword belongs to
    pub fn title_for_keyword(&self, keyword: &str) -> Option<&str> {
        self.keyword_titles.get(keyword).map(String::as_str)
    }

    // ============================================================
    // Queries
    // ============================================================

    /// Closest OCR token in `text` to a trained label keyword
    ///
    /// Returns `Ok(None)` when no token is within the keyword's depth. Asking
    /// for a keyword that was never trained is a caller bug and errors.
    pub fn closest_spelling(&self, keyword: &str, text: &str) -> Result<Option<SpellingMatch>> {
        let keyword = keyword.to_lowercase();
        let index = self
            .labels
            .get(&keyword)
            .ok_or_else(|| FuzzyError::UnknownKeyword(keyword.clone()))?;

        let mut best: Option<SpellingMatch> = None;
        for token in tokenize(text) {
            if self.is_stopped(&token) {
                continue;
            }
            if !index.suggestions(&token).iter().any(|s| s.word == keyword) {
                continue;
            }
            let distance = strsim::levenshtein(&token, &keyword);
            if best.as_ref().is_none_or(|b| distance < b.distance) {
                best = Some(SpellingMatch {
                    spelling: token,
                    distance,
                });
            }
        }
        Ok(best)
    }

    /// Closest spelling of `keyword` over every slide of a photo
    ///
    /// Each recoloring OCRs differently, so the slide that produced the best
    /// spelling is returned with it. Earlier slides win ties.
    pub fn closest_spelling_across_slides<'s>(
        &self,
        keyword: &str,
        slides: &'s [Slide],
    ) -> Result<Option<(SpellingMatch, &'s Slide)>> {
        let mut best: Option<(SpellingMatch, &'s Slide)> = None;

        for slide in slides {
            match self.closest_spelling(keyword, &slide.plain_text)? {
                Some(found) => {
                    if best.as_ref().is_none_or(|(b, _)| found.distance < b.distance) {
                        best = Some((found, slide));
                    }
                }
                None => debug!("No close spelling of {:?} in {}", keyword, slide.label()),
            }
        }

        if let Some((found, slide)) = &best {
            debug!(
                "Closest spelling of {:?} is {:?} (distance {}) in {}",
                keyword,
                found.spelling,
                found.distance,
                slide.label()
            );
        }
        Ok(best)
    }

    /// Terminal mentions in `text`, keyed by the OCR spelling
    ///
    /// Every token and every adjacent token pair is looked up in every depth
    /// bucket; per spelling the closest keyword wins, and on equal distance
    /// the longer keyword wins.
    pub fn find_location_keywords(&self, text: &str) -> HashMap<String, LocationMatch> {
        let tokens = tokenize(text);
        let mut spellings: Vec<String> = tokens.clone();
        spellings.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));

        let mut found: HashMap<String, LocationMatch> = HashMap::new();
        for spelling in spellings {
            if self.is_stopped(&spelling) || found.contains_key(&spelling) {
                continue;
            }

            let mut best: Option<(String, usize)> = None;
            for index in self.locations.values() {
                for suggestion in index.suggestions(&spelling) {
                    let better = match &best {
                        None => true,
                        Some((word, distance)) => {
                            suggestion.distance < *distance
                                || (suggestion.distance == *distance
                                    && suggestion.word.chars().count() > word.chars().count())
                        }
                    };
                    if better {
                        best = Some((suggestion.word, suggestion.distance));
                    }
                }
            }

            let Some((keyword, distance)) = best else {
                continue;
            };
            let Some(title) = self.keyword_titles.get(&keyword) else {
                continue;
            };
            found.insert(
                spelling,
                LocationMatch {
                    title: title.clone(),
                    keyword,
                    distance,
                },
            );
        }
        found
    }
}

/// Lowercased OCR tokens split on whitespace and common punctuation
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || TOKEN_SEPARATORS.contains(&c))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Title with any parenthetical text removed and whitespace collapsed
fn strip_parenthetical(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut depth = 0usize;
    for c in title.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide::test_support::slide;
    use crate::slide::SlideVariant;

    fn matchers() -> MatcherSet {
        let config = ExtractionConfig::default();
        let mut set = MatcherSet::with_schedule_labels(&config);
        set.train_location("Hill AFB", &[]);
        set.train_location("Travis AFB", &[]);
        set.train_location("Ramstein AB (Germany)", &[]);
        set.train_location("Joint Base Charleston", &["charleston".to_string()]);
        set
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("ROLL CALL: 1430,Hill AFB\n(T.B.D)"),
            vec!["roll", "call", "1430", "hill", "afb", "t", "b", "d"]
        );
    }

    #[test]
    fn test_strip_parenthetical() {
        assert_eq!(strip_parenthetical("Ramstein AB (Germany)"), "Ramstein AB");
        assert_eq!(strip_parenthetical("  Dover   AFB "), "Dover AFB");
    }

    #[test]
    fn test_location_keyword_minimum_length() {
        let config = ExtractionConfig::default();
        let mut set = MatcherSet::new(&config);

        let err = set.train_location_keyword("rota", "Rota NS").unwrap_err();
        assert!(matches!(err, FuzzyError::KeywordTooShort { min_length: 5, .. }));
        assert!(set.train_location_keyword("osan.", "Osan AB").is_ok());
        assert!(set.train_location_keyword("dover", "Dover AFB").is_ok());
        assert_eq!(set.title_for_keyword("dover"), Some("Dover AFB"));
    }

    #[test]
    fn test_train_location_components() {
        let config = ExtractionConfig::default();
        let mut set = MatcherSet::new(&config);
        let outcome = set.train_location("Ramstein AB (Germany)", &["RMS".to_string()]);

        assert!(outcome.trained.contains(&"ramstein ab".to_string()));
        assert!(outcome.trained.contains(&"ramstein".to_string()));
        assert!(!outcome.trained.iter().any(|k| k.contains("germany")));
        assert_eq!(outcome.rejected, vec!["RMS".to_string()]);
    }

    #[test]
    fn test_closest_spelling_prefers_smaller_distance() {
        let set = matchers();
        let found = set
            .closest_spelling("destination", "DESTINATON  TIME destination SEATS")
            .unwrap()
            .unwrap();
        assert_eq!(found.spelling, "destination");
        assert_eq!(found.distance, 0);

        let typo = set
            .closest_spelling("destination", "DESTINATON TIME")
            .unwrap()
            .unwrap();
        assert_eq!(typo.spelling, "destinaton");
        assert_eq!(typo.distance, 1);

        assert!(set.closest_spelling("destination", "roll call 1430").unwrap().is_none());
    }

    #[test]
    fn test_closest_spelling_unknown_keyword() {
        let set = matchers();
        assert_eq!(
            set.closest_spelling("gate", "gate 4"),
            Err(FuzzyError::UnknownKeyword("gate".to_string()))
        );
    }

    #[test]
    fn test_stop_spellings_never_match() {
        let mut set = matchers();
        set.add_stop_spelling("Seals");
        assert!(set.closest_spelling("seats", "SEALS 14T").unwrap().is_none());
        assert!(set.closest_spelling("seats", "SEATS 14T").unwrap().is_some());
    }

    #[test]
    fn test_closest_spelling_across_slides() {
        let set = matchers();
        let slides = vec![
            slide(SlideVariant::Original, "DESTIMATI0N", ""),
            slide(SlideVariant::DarkText, "DESTINATON", ""),
            slide(SlideVariant::LightText, "", ""),
        ];
        let (found, from) = set
            .closest_spelling_across_slides("destination", &slides)
            .unwrap()
            .unwrap();
        assert_eq!(found.spelling, "destinaton");
        assert_eq!(from.variant, SlideVariant::DarkText);
    }

    #[test]
    fn test_find_location_keywords_single_and_pair() {
        let set = matchers();
        let found = set.find_location_keywords("1430 HILL AFB 14T\n1600 TRAVlS AFB");

        let hill = found.get("hill afb").unwrap();
        assert_eq!(hill.title, "Hill AFB");
        assert_eq!(hill.distance, 0);

        let travis = found.get("travls afb").unwrap();
        assert_eq!(travis.title, "Travis AFB");
        assert_eq!(travis.distance, 1);

        let component = found.get("travls").unwrap();
        assert_eq!(component.keyword, "travis");
        assert!(!found.contains_key("hill"));
    }

    #[test]
    fn test_find_location_keywords_alias_and_stop() {
        let mut set = matchers();
        let found = set.find_location_keywords("CHARLESTON");
        assert_eq!(found.get("charleston").unwrap().title, "Joint Base Charleston");

        set.add_stop_spelling("charleston");
        assert!(set.find_location_keywords("CHARLESTON").is_empty());
    }
}
