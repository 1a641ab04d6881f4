//! Versioned keyword policy tables.
//!
//! Moderation terms, domain keywords, clarification templates and quick-reply
//! suggestion sets live here as data, so they can be replaced from a TOML file
//! without touching the pipeline. `PolicyTables::default()` carries the
//! built-in tables.

pub mod clarify;
pub mod defaults;
pub mod domain;
pub mod moderation;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use clarify::{Clarification, ClarificationCatalog};
pub use domain::{DomainClassifier, DomainTag};
pub use moderation::{ModerationCategory, ModerationFilter, ModerationVerdict};

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("could not read policy file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse policy tables: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid policy tables: {0}")]
    Validation(String),
    #[error("clarification template `{name}` failed: {source}")]
    Template { name: String, source: tera::Error },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTables {
    pub version: u32,
    pub moderation: ModerationTable,
    /// Checked in order; the first domain with a matching keyword wins.
    pub domains: Vec<DomainKeywords>,
    pub clarifications: ClarificationTable,
    pub answer_suggestions: AnswerSuggestionTable,
    /// Lowercase fragments that reveal the model asked clarifying questions.
    pub clarification_markers: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationTable {
    pub profanity: Vec<String>,
    pub sexual: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainKeywords {
    pub tag: DomainTag,
    pub keywords: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationTable {
    pub technical_drawing: ClarificationTemplate,
    pub product_labeling: ClarificationTemplate,
    pub generic: ClarificationTemplate,
}

impl ClarificationTable {
    pub fn get(&self, tag: DomainTag) -> &ClarificationTemplate {
        match tag {
            DomainTag::TechnicalDrawing => &self.technical_drawing,
            DomainTag::ProductLabeling => &self.product_labeling,
            DomainTag::Generic => &self.generic,
        }
    }
}

/// A canned clarification. `template` is a Tera template; `{{ user_text }}`
/// expands to the caller's message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationTemplate {
    pub template: String,
    pub suggestions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSuggestionTable {
    pub technical_drawing: Vec<String>,
    /// Used for every other domain.
    pub default: Vec<String>,
}

impl AnswerSuggestionTable {
    pub fn for_domain(&self, tag: DomainTag) -> &[String] {
        match tag {
            DomainTag::TechnicalDrawing => &self.technical_drawing,
            DomainTag::ProductLabeling | DomainTag::Generic => &self.default,
        }
    }
}

impl PolicyTables {
    pub fn from_toml_str(raw: &str) -> Result<Self, PolicyError> {
        let tables = toml::from_str::<PolicyTables>(raw)?;
        tables.validated()
    }

    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| PolicyError::ReadFile { path: path.to_path_buf(), source })?;
        let tables = Self::from_toml_str(&raw)?;
        tracing::info!(
            event_name = "system.policy.loaded",
            path = %path.display(),
            version = tables.version,
            "policy tables loaded"
        );
        Ok(tables)
    }

    /// Lowercases and trims every term, drops empty ones, and checks the
    /// structural rules the classifiers rely on.
    pub fn validated(mut self) -> Result<Self, PolicyError> {
        if self.version == 0 {
            return Err(PolicyError::Validation("version must be greater than zero".to_string()));
        }

        self.moderation.profanity = normalize_terms(self.moderation.profanity);
        self.moderation.sexual = normalize_terms(self.moderation.sexual);
        if self.moderation.profanity.is_empty() && self.moderation.sexual.is_empty() {
            return Err(PolicyError::Validation(
                "moderation must list at least one banned term".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &mut self.domains {
            if entry.tag == DomainTag::Generic {
                return Err(PolicyError::Validation(
                    "`generic` is the fallback domain and cannot carry keywords".to_string(),
                ));
            }
            if !seen.insert(entry.tag) {
                return Err(PolicyError::Validation(format!(
                    "domain `{}` is listed more than once",
                    entry.tag.as_str()
                )));
            }
            entry.keywords = normalize_terms(std::mem::take(&mut entry.keywords));
        }

        self.clarification_markers = normalize_terms(std::mem::take(&mut self.clarification_markers));

        // Compile once so a broken template fails at load time, not per request.
        ClarificationCatalog::new(&self.clarifications)?;

        Ok(self)
    }
}

fn normalize_terms(terms: Vec<String>) -> Vec<String> {
    terms
        .into_iter()
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}
