//! Terminal catalog
//!
//! The set of passenger terminals known up front, their alias keywords, and
//! the OCR spellings observed to produce false matches. The catalog is turned
//! into a [`MatcherSet`] once per batch.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ExtractionConfig;
use crate::fuzzy::MatcherSet;
use crate::slide::Terminal;

/// Catalog loading errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate terminal id in catalog: {0}")]
    DuplicateId(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalEntry {
    pub title: String,
    pub id: String,
    /// Extra keywords matched to this terminal, e.g. a base's city name
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl TerminalEntry {
    pub fn terminal(&self) -> Terminal {
        Terminal::new(&self.title, &self.id)
    }
}

/// Known terminals and the stop-list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalCatalog {
    pub terminals: Vec<TerminalEntry>,
    #[serde(default)]
    pub stop_spellings: Vec<String>,
}

impl TerminalCatalog {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let catalog: TerminalCatalog = serde_json::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for entry in &self.terminals {
            if !seen.insert(entry.id.as_str()) {
                return Err(CatalogError::DuplicateId(entry.id.clone()));
            }
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> Option<&TerminalEntry> {
        self.terminals.iter().find(|t| t.id == id)
    }

    pub fn find_by_title(&self, title: &str) -> Option<&TerminalEntry> {
        self.terminals.iter().find(|t| t.title == title)
    }

    /// Build the label and location matchers for a batch
    ///
    /// Keywords too short to match unambiguously are skipped with a warning.
    pub fn build_matchers(&self, config: &ExtractionConfig) -> MatcherSet {
        let mut matchers = MatcherSet::with_schedule_labels(config);

        let mut trained = 0usize;
        for entry in &self.terminals {
            let outcome = matchers.train_location(&entry.title, &entry.aliases);
            for rejected in &outcome.rejected {
                warn!(
                    "Skipping keyword {:?} for {}: shorter than {} characters",
                    rejected, entry.title, config.min_keyword_length
                );
            }
            trained += outcome.trained.len();
        }
        for spelling in &self.stop_spellings {
            matchers.add_stop_spelling(spelling);
        }

        info!(
            "Trained {} location keywords for {} terminals ({} stop spellings)",
            trained,
            self.terminals.len(),
            self.stop_spellings.len()
        );
        matchers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "terminals": [
            { "title": "Dover AFB", "id": "dover" },
            { "title": "Hill AFB", "id": "hill", "aliases": ["Ogden"] },
            { "title": "Naval Station Rota (Spain)", "id": "rota", "aliases": ["Rota"] }
        ],
        "stop_spellings": ["dovers"]
    }"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = TerminalCatalog::from_json_str(CATALOG).unwrap();
        assert_eq!(catalog.terminals.len(), 3);
        assert!(catalog.terminals[0].aliases.is_empty());
        assert_eq!(catalog.find_by_id("hill").unwrap().title, "Hill AFB");
        assert_eq!(catalog.find_by_title("Dover AFB").unwrap().id, "dover");
        assert_eq!(
            catalog.find_by_id("dover").unwrap().terminal(),
            Terminal::new("Dover AFB", "dover")
        );
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let json = r#"{"terminals": [
            {"title": "Dover AFB", "id": "dover"},
            {"title": "Dover Air Force Base", "id": "dover"}
        ]}"#;
        assert!(matches!(
            TerminalCatalog::from_json_str(json),
            Err(CatalogError::DuplicateId(id)) if id == "dover"
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            TerminalCatalog::from_json_str("{ nope"),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn test_build_matchers_skips_short_aliases() {
        let catalog = TerminalCatalog::from_json_str(CATALOG).unwrap();
        let matchers = catalog.build_matchers(&ExtractionConfig::default());

        let found = matchers.find_location_keywords("OGDEN ROTA HILL AFB DOVERS");
        assert_eq!(found["ogden"].title, "Hill AFB");
        assert_eq!(found["hill afb"].title, "Hill AFB");
        // "rota" is too short to be a keyword
        assert!(!found.contains_key("rota"));
        // stop-listed
        assert!(!found.contains_key("dovers"));
    }
}
