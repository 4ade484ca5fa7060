//! Criterion label classification.

use regex::Regex;

use super::catalog::KeywordCatalog;
use crate::error::{BatchError, BatchResult};

/// Outcome of classifying one free-form criterion label.
///
/// Indices refer to positions in the classifier's catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Unmatched,
    Matched(usize),
    Ambiguous(Vec<usize>),
}

/// Routes a criterion label to at most one catalog column.
pub trait CriterionClassifier: Send + Sync {
    /// Catalog whose column order the returned indices refer to.
    fn catalog(&self) -> &KeywordCatalog;

    fn classify(&self, label: &str) -> Classification;
}

/// Substring keyword matcher.
///
/// The label is cut at the first colon (outputs often echo "5. Name: ..."),
/// lowercased and stripped of punctuation; every criterion with a keyword
/// occurring in what remains is a candidate.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    catalog: KeywordCatalog,
    keywords: Vec<Vec<String>>,
    punctuation: Regex,
}

impl KeywordClassifier {
    pub fn new(catalog: KeywordCatalog) -> BatchResult<Self> {
        let punctuation = Regex::new(r"[^\w\s]")
            .map_err(|e| BatchError::config(format!("invalid normalization pattern: {}", e)))?;

        let keywords = catalog
            .criteria
            .iter()
            .map(|entry| {
                entry
                    .keywords
                    .iter()
                    .map(|k| normalize_with(&punctuation, k))
                    .filter(|k| !k.trim().is_empty())
                    .collect()
            })
            .collect();

        Ok(Self {
            catalog,
            keywords,
            punctuation,
        })
    }

    /// Matchable form of a label.
    pub fn normalize(&self, label: &str) -> String {
        let head = label.split(':').next().unwrap_or(label);
        normalize_with(&self.punctuation, head)
    }
}

fn normalize_with(punctuation: &Regex, text: &str) -> String {
    punctuation.replace_all(&text.to_lowercase(), "").into_owned()
}

impl CriterionClassifier for KeywordClassifier {
    fn catalog(&self) -> &KeywordCatalog {
        &self.catalog
    }

    fn classify(&self, label: &str) -> Classification {
        let text = self.normalize(label);
        let hits: Vec<usize> = self
            .keywords
            .iter()
            .enumerate()
            .filter(|(_, kws)| kws.iter().any(|k| text.contains(k.as_str())))
            .map(|(i, _)| i)
            .collect();

        match hits.as_slice() {
            [] => Classification::Unmatched,
            [only] => Classification::Matched(*only),
            _ => Classification::Ambiguous(hits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::new(KeywordCatalog::default()).unwrap()
    }

    fn name_of(c: &KeywordClassifier, result: Classification) -> String {
        match result {
            Classification::Matched(i) => c.catalog().criteria[i].name.clone(),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn prefix_before_colon_is_matched() {
        let c = classifier();
        assert_eq!(
            c.normalize("5. Caution-Signaling Connectors: frequent 'however'"),
            "5 cautionsignaling connectors"
        );
        let hit = c.classify("5. Caution-Signaling Connectors: frequent 'however'");
        assert_eq!(name_of(&c, hit), "Caution-Signaling Connectors");
    }

    #[test]
    fn every_canonical_name_matches_itself() {
        let c = classifier();
        for entry in &c.catalog().criteria {
            assert_eq!(name_of(&c, c.classify(&entry.name)), entry.name);
        }
    }

    #[test]
    fn unmatched_and_ambiguous() {
        let c = classifier();
        assert_eq!(c.classify("Overall tone"), Classification::Unmatched);
        match c.classify("Hedging and modal usage") {
            Classification::Ambiguous(hits) => assert_eq!(hits, vec![0, 1]),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn keywords_after_colon_are_ignored() {
        let c = classifier();
        assert_eq!(
            c.classify("Readability: no hedging at all"),
            Classification::Matched(15)
        );
    }
}
