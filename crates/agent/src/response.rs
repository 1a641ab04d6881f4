use serde::Serialize;

use normbot_core::policy::{AnswerSuggestionTable, DomainTag, PolicyTables};

pub const STANDARDS_DISCLAIMER: &str =
    "\n\nНапоминание: для реального оформления/производства обязательно сверяйтесь с официальными текстами стандартов.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShapedAnswer {
    pub text: String,
    pub suggestions: Option<Vec<String>>,
}

/// Final shaping of a model completion before it reaches the caller.
#[derive(Clone, Debug)]
pub struct ResponsePostProcessor {
    markers: Vec<String>,
    suggestions: AnswerSuggestionTable,
}

impl Default for ResponsePostProcessor {
    fn default() -> Self {
        Self::from_tables(&PolicyTables::default())
    }
}

impl ResponsePostProcessor {
    pub fn from_tables(tables: &PolicyTables) -> Self {
        Self {
            markers: tables.clarification_markers.iter().map(|marker| marker.to_lowercase()).collect(),
            suggestions: tables.answer_suggestions.clone(),
        }
    }

    /// Quick replies are offered only when the answer itself asks something back.
    pub fn asks_for_clarification(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.markers.iter().any(|marker| lowered.contains(marker.as_str()))
    }

    pub fn finish(&self, raw: &str, domain: DomainTag) -> ShapedAnswer {
        let body = raw.trim();
        let suggestions = self
            .asks_for_clarification(body)
            .then(|| self.suggestions.for_domain(domain).to_vec());

        ShapedAnswer { text: format!("{body}{STANDARDS_DISCLAIMER}"), suggestions }
    }
}
