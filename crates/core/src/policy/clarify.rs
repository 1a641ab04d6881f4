use std::collections::HashMap;

use serde::Serialize;
use tera::{Context, Tera};

use super::{ClarificationTable, DomainTag, PolicyError};

const DOMAINS: [DomainTag; 3] =
    [DomainTag::TechnicalDrawing, DomainTag::ProductLabeling, DomainTag::Generic];

/// A deterministic clarification response, issued instead of a model call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Clarification {
    pub domain: DomainTag,
    pub text: String,
    pub suggestions: Vec<String>,
}

/// Compiled clarification templates, one per domain.
#[derive(Debug)]
pub struct ClarificationCatalog {
    templates: Tera,
    suggestions: HashMap<DomainTag, Vec<String>>,
}

impl ClarificationCatalog {
    pub fn new(table: &ClarificationTable) -> Result<Self, PolicyError> {
        let mut templates = Tera::default();
        templates.autoescape_on(Vec::new());
        let mut suggestions = HashMap::new();

        for tag in DOMAINS {
            let entry = table.get(tag);
            templates.add_raw_template(tag.as_str(), &entry.template).map_err(|source| {
                PolicyError::Template { name: tag.as_str().to_string(), source }
            })?;
            suggestions.insert(tag, entry.suggestions.clone());
        }

        Ok(Self { templates, suggestions })
    }

    pub fn render(&self, domain: DomainTag, user_text: &str) -> Result<Clarification, PolicyError> {
        let mut context = Context::new();
        context.insert("user_text", user_text);

        let text = self.templates.render(domain.as_str(), &context).map_err(|source| {
            PolicyError::Template { name: domain.as_str().to_string(), source }
        })?;

        Ok(Clarification {
            domain,
            text,
            suggestions: self.suggestions.get(&domain).cloned().unwrap_or_default(),
        })
    }
}
