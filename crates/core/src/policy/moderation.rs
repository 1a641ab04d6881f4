use serde::Serialize;

use super::{ModerationTable, PolicyTables};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationCategory {
    Profanity,
    SexualContent,
}

impl ModerationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profanity => "profanity",
            Self::SexualContent => "sexual_content",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModerationVerdict {
    Clean,
    Blocked(ModerationCategory),
}

/// Case-insensitive substring filter over the two banned-term categories.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModerationFilter {
    profanity: Vec<String>,
    sexual: Vec<String>,
}

impl Default for ModerationFilter {
    fn default() -> Self {
        Self::from_tables(&PolicyTables::default())
    }
}

impl ModerationFilter {
    pub fn new(table: &ModerationTable) -> Self {
        let lower = |terms: &[String]| terms.iter().map(|term| term.to_lowercase()).collect();
        Self { profanity: lower(&table.profanity), sexual: lower(&table.sexual) }
    }

    pub fn from_tables(tables: &PolicyTables) -> Self {
        Self::new(&tables.moderation)
    }

    pub fn check(&self, text: &str) -> ModerationVerdict {
        let lowered = text.to_lowercase();
        if self.profanity.iter().any(|term| lowered.contains(term.as_str())) {
            return ModerationVerdict::Blocked(ModerationCategory::Profanity);
        }
        if self.sexual.iter().any(|term| lowered.contains(term.as_str())) {
            return ModerationVerdict::Blocked(ModerationCategory::SexualContent);
        }
        ModerationVerdict::Clean
    }
}
