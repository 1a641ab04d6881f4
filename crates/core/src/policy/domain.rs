use serde::{Deserialize, Serialize};

use super::{DomainKeywords, PolicyTables};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainTag {
    /// Drafting standards (ESKD): frames, title blocks, views, tolerances.
    TechnicalDrawing,
    /// Product labeling and packaging standards (GOST, TR CU / EAEU).
    ProductLabeling,
    Generic,
}

impl DomainTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TechnicalDrawing => "technical_drawing",
            Self::ProductLabeling => "product_labeling",
            Self::Generic => "generic",
        }
    }
}

/// Keyword containment classifier. Domains are tried in table order and the
/// first hit wins, so the result is stable for a given table version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainClassifier {
    domains: Vec<DomainKeywords>,
}

impl Default for DomainClassifier {
    fn default() -> Self {
        Self::from_tables(&PolicyTables::default())
    }
}

impl DomainClassifier {
    pub fn new(domains: Vec<DomainKeywords>) -> Self {
        let domains = domains
            .into_iter()
            .map(|entry| DomainKeywords {
                tag: entry.tag,
                keywords: entry.keywords.iter().map(|keyword| keyword.to_lowercase()).collect(),
            })
            .collect();
        Self { domains }
    }

    pub fn from_tables(tables: &PolicyTables) -> Self {
        Self::new(tables.domains.clone())
    }

    pub fn classify(&self, text: &str) -> DomainTag {
        let lowered = text.to_lowercase();
        self.domains
            .iter()
            .find(|entry| entry.keywords.iter().any(|keyword| lowered.contains(keyword.as_str())))
            .map(|entry| entry.tag)
            .unwrap_or(DomainTag::Generic)
    }
}
