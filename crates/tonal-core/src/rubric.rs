//! Rubric definition and checklist compilation.
//!
//! The checklist text is embedded verbatim in every request of a batch, so it
//! must not change while a run is in flight. [`Rubric::fingerprint`] gives a
//! stable digest to tie outcomes back to the rubric that produced them.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{BatchError, BatchResult};

/// One scored dimension of the rubric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub scale: String,
}

impl Criterion {
    fn checklist_line(&self) -> String {
        format!(
            "{}. {}: {}. Scale: {}",
            self.id, self.name, self.description, self.scale
        )
    }
}

/// Ordered catalog of criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rubric {
    pub criteria: Vec<Criterion>,
}

impl Rubric {
    /// Build a rubric, rejecting empty catalogs and duplicate ids or names.
    pub fn new(criteria: Vec<Criterion>) -> BatchResult<Self> {
        let rubric = Self { criteria };
        rubric.validate()?;
        Ok(rubric)
    }

    /// Load a rubric from a YAML file (`criteria: [{id, name, description, scale}]`).
    pub fn load(path: &Path) -> BatchResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BatchError::config(format!("failed to read rubric {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> BatchResult<Self> {
        let rubric: Rubric = serde_yaml::from_str(raw)
            .map_err(|e| BatchError::config(format!("failed to parse rubric YAML: {}", e)))?;
        rubric.validate()?;
        Ok(rubric)
    }

    fn validate(&self) -> BatchResult<()> {
        if self.criteria.is_empty() {
            return Err(BatchError::config("rubric has no criteria"));
        }
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for c in &self.criteria {
            if c.name.trim().is_empty() {
                return Err(BatchError::config(format!(
                    "rubric criterion {} has an empty name",
                    c.id
                )));
            }
            if !ids.insert(c.id) {
                return Err(BatchError::config(format!(
                    "duplicate rubric criterion id {}",
                    c.id
                )));
            }
            if !names.insert(c.name.as_str()) {
                return Err(BatchError::config(format!(
                    "duplicate rubric criterion name '{}'",
                    c.name
                )));
            }
        }
        Ok(())
    }

    /// One line per criterion, in catalog order.
    pub fn checklist_text(&self) -> String {
        self.criteria
            .iter()
            .map(Criterion::checklist_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// SHA-256 of the checklist text.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.checklist_text().as_bytes());
        format!("sha256:{:x}", hasher.finalize())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.criteria.iter().map(|c| c.name.as_str())
    }
}

impl Default for Rubric {
    /// The tone rubric for academic abstracts.
    fn default() -> Self {
        let criteria = DEFAULT_CRITERIA
            .iter()
            .enumerate()
            .map(|(i, (name, description, scale))| Criterion {
                id: i as u32 + 1,
                name: (*name).to_string(),
                description: (*description).to_string(),
                scale: (*scale).to_string(),
            })
            .collect();
        Self { criteria }
    }
}

const DEFAULT_CRITERIA: &[(&str, &str, &str)] = &[
    (
        "Modal Verb Strength",
        "Balance of weak ('may', 'might') vs. strong ('will', 'cannot') modals",
        "1=only weak; 10=only strong",
    ),
    (
        "Hedging Frequency & Type",
        "Frequency of single-word qualifiers and larger stance phrases ('it seems that', 'we believe')",
        "1=continuous hedging; 10=no hedges",
    ),
    (
        "Qualifier Density",
        "Use of modifiers ('to some extent', 'relatively') that soften claims",
        "1=extensive qualifiers; 10=none",
    ),
    (
        "Acknowledgement of Limitations",
        "Explicit mention of caveats or boundary conditions ('within context', 'may not generalize')",
        "1=numerous limitations; 10=none or implicit only",
    ),
    (
        "Caution-Signaling Connectors",
        "Use of 'however', 'nevertheless', 'on the other hand' to signal complexity",
        "1=frequent; 5=occasional; 10=none",
    ),
    (
        "Assertiveness & Voice",
        "Proportion of unequivocal verbs ('prove', 'confirm') vs. tentative verbs ('suggest', 'explore')",
        "1=almost all tentative; 10=almost all assertive",
    ),
    (
        "Active/Passive Voice Ratio",
        "Ratio of active ('we test') to passive ('it was tested') constructions",
        "1=90% passive; 5=50/50; 10=90% active",
    ),
    (
        "Sentence Length & Directness",
        "Degree of multi-clausal, convoluted sentences vs. brief, single-clause statements",
        "1=way long; 10=way short",
    ),
    (
        "Imperative-Form Occurrence",
        "Presence of direct commands ('Apply X') vs. none or only embedded suggestions",
        "1=no imperatives; 10=dominant",
    ),
    (
        "Pronoun Commitment",
        "Use of first-person ('we', 'I') vs. impersonal constructions ('the authors')",
        "1=fully impersonal; 10=fully first-person",
    ),
    (
        "Novelty-Claim Strength",
        "Boldness of originality claims ('first to', 'novel framework')",
        "1=no novelty claim; 5=hedged; 10=grandiose",
    ),
    (
        "Jargon/Technicality Density",
        "Density of undefined field-specific terms vs. accessible language",
        "1=minimal jargon; 10=dense undefined jargon",
    ),
    (
        "Emotional Valence",
        "Presence of emotionally charged adjectives ('revolutionary', 'urgent') vs. neutral descriptors",
        "1=none; 10=frequent",
    ),
    (
        "Evidence & Citation Usage",
        "How consistently claims are backed by data, statistics or literature citations",
        "1=none; 10=every claim backed",
    ),
    (
        "Practical/Impact Orientation",
        "Emphasis on real-world applications, policy or practice implications",
        "1=none; 5=may inform practice; 10=will transform practice",
    ),
    (
        "Readability",
        "Precision and ease with which a reader can understand the author's intended meaning",
        "1=difficult to understand; 10=incredibly easy to understand",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_sixteen_ordered_criteria() {
        let rubric = Rubric::default();
        assert_eq!(rubric.criteria.len(), 16);
        assert_eq!(rubric.criteria[0].id, 1);
        assert_eq!(rubric.criteria[15].name, "Readability");
        assert!(rubric.validate().is_ok());
    }

    #[test]
    fn checklist_line_format() {
        let text = Rubric::default().checklist_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 16);
        assert_eq!(
            lines[4],
            "5. Caution-Signaling Connectors: Use of 'however', 'nevertheless', \
             'on the other hand' to signal complexity. Scale: 1=frequent; 5=occasional; 10=none"
        );
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn checklist_and_fingerprint_are_deterministic() {
        let a = Rubric::default();
        let b = Rubric::default();
        assert_eq!(a.checklist_text(), b.checklist_text());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert!(a.fingerprint().starts_with("sha256:"));
        assert_eq!(a.fingerprint().len(), 7 + 64);
    }

    #[test]
    fn yaml_rubric_roundtrips_into_checklist() {
        let raw = r#"
criteria:
  - id: 1
    name: Clarity
    description: How clear the text is
    scale: 1=opaque; 10=crystal
  - id: 2
    name: Brevity
    description: How short the sentences are
    scale: 1=long; 10=short
"#;
        let rubric = Rubric::from_yaml_str(raw).unwrap();
        assert_eq!(
            rubric.checklist_text(),
            "1. Clarity: How clear the text is. Scale: 1=opaque; 10=crystal\n\
             2. Brevity: How short the sentences are. Scale: 1=long; 10=short"
        );
    }

    #[test]
    fn duplicate_ids_rejected() {
        let c = Criterion {
            id: 1,
            name: "A".into(),
            description: "d".into(),
            scale: "s".into(),
        };
        let mut d = c.clone();
        d.name = "B".into();
        let err = Rubric::new(vec![c, d]).unwrap_err();
        assert!(err.to_string().contains("duplicate rubric criterion id 1"));
    }

    #[test]
    fn empty_rubric_rejected() {
        let err = Rubric::from_yaml_str("criteria: []").unwrap_err();
        assert!(matches!(err, BatchError::Config { .. }));
    }
}
