//! Keyword catalog: canonical criterion columns and the keywords that route to them.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BatchError, BatchResult};

/// One destination column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Canonical criterion name, used as the column header.
    pub name: String,
    /// snake_case identifier usable as a column name in statistics packages.
    pub alias: String,
    /// Lowercase keywords; a label matches if it contains any of them.
    pub keywords: Vec<String>,
}

/// Immutable catalog, passed explicitly to the demultiplexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCatalog {
    pub criteria: Vec<CatalogEntry>,
}

impl KeywordCatalog {
    pub fn new(criteria: Vec<CatalogEntry>) -> BatchResult<Self> {
        let catalog = Self { criteria };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load from YAML (`criteria: [{name, alias, keywords}]`).
    pub fn load(path: &Path) -> BatchResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BatchError::config(format!(
                "failed to read keyword catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> BatchResult<Self> {
        let catalog: KeywordCatalog = serde_yaml::from_str(raw).map_err(|e| {
            BatchError::config(format!("failed to parse keyword catalog YAML: {}", e))
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> BatchResult<()> {
        if self.criteria.is_empty() {
            return Err(BatchError::config("keyword catalog has no criteria"));
        }
        let mut names = HashSet::new();
        let mut aliases = HashSet::new();
        for entry in &self.criteria {
            if entry.name.trim().is_empty() {
                return Err(BatchError::config("keyword catalog entry has an empty name"));
            }
            if entry.alias.trim().is_empty() {
                return Err(BatchError::config(format!(
                    "criterion '{}' has an empty alias",
                    entry.name
                )));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(BatchError::config(format!(
                    "duplicate criterion '{}' in keyword catalog",
                    entry.name
                )));
            }
            if !aliases.insert(entry.alias.as_str()) {
                return Err(BatchError::config(format!(
                    "duplicate alias '{}' in keyword catalog",
                    entry.alias
                )));
            }
            if entry.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(BatchError::config(format!(
                    "criterion '{}' has no keywords",
                    entry.name
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.criteria.iter().map(|e| e.name.clone()).collect()
    }

    pub fn aliases(&self) -> Vec<String> {
        self.criteria.iter().map(|e| e.alias.clone()).collect()
    }
}

impl Default for KeywordCatalog {
    /// Keywords for the default tone rubric.
    fn default() -> Self {
        let criteria = DEFAULT_KEYWORDS
            .iter()
            .map(|(name, alias, keywords)| CatalogEntry {
                name: (*name).to_string(),
                alias: (*alias).to_string(),
                keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            })
            .collect();
        Self { criteria }
    }
}

const DEFAULT_KEYWORDS: &[(&str, &str, &[&str])] = &[
    ("Modal Verb Strength", "llm_modal_verb", &["modal"]),
    ("Hedging Frequency & Type", "llm_hedging", &["hedging"]),
    ("Qualifier Density", "llm_qualifier", &["qualifier"]),
    ("Acknowledgement of Limitations", "llm_ack_limits", &["limitation"]),
    ("Caution-Signaling Connectors", "llm_caution", &["caution", "contrast"]),
    ("Assertiveness & Voice", "llm_assertiveness", &["assertive"]),
    ("Active/Passive Voice Ratio", "llm_active_passive", &["active", "passive"]),
    ("Sentence Length & Directness", "llm_directness", &["sentence", "direct"]),
    ("Imperative-Form Occurrence", "llm_imperative", &["imperative"]),
    ("Pronoun Commitment", "llm_pronoun", &["pronoun"]),
    ("Novelty-Claim Strength", "llm_novelty", &["novelty", "original"]),
    ("Jargon/Technicality Density", "llm_jargon", &["jargon", "technical"]),
    ("Emotional Valence", "llm_emotional", &["emotional", "emotion"]),
    ("Evidence & Citation Usage", "llm_evidence", &["citation", "evidence"]),
    ("Practical/Impact Orientation", "llm_practical", &["practical", "managerial"]),
    ("Readability", "llm_readability", &["readability", "readable"]),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::Rubric;

    #[test]
    fn default_catalog_covers_default_rubric() {
        let catalog = KeywordCatalog::default();
        catalog.validate().unwrap();
        let rubric = Rubric::default();
        let rubric_names: Vec<&str> = rubric.names().collect();
        assert_eq!(catalog.names(), rubric_names);
        assert_eq!(catalog.criteria[15].alias, "llm_readability");
    }

    #[test]
    fn yaml_catalog_loads() {
        let catalog = KeywordCatalog::from_yaml_str(
            r#"
criteria:
  - name: Warmth
    alias: llm_warmth
    keywords: [warm, friendly]
"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.aliases(), vec!["llm_warmth".to_string()]);
    }

    #[test]
    fn invalid_catalogs_are_config_errors() {
        let empty = KeywordCatalog::new(vec![]).unwrap_err();
        assert!(matches!(empty, BatchError::Config { .. }));

        let entry = |name: &str, alias: &str, kw: &[&str]| CatalogEntry {
            name: name.into(),
            alias: alias.into(),
            keywords: kw.iter().map(|k| k.to_string()).collect(),
        };
        let dup = KeywordCatalog::new(vec![entry("A", "a", &["x"]), entry("A", "b", &["y"])]);
        assert!(dup.unwrap_err().to_string().contains("duplicate criterion 'A'"));

        let no_kw = KeywordCatalog::new(vec![entry("A", "a", &[" "])]);
        assert!(no_kw.unwrap_err().to_string().contains("no keywords"));
    }
}
