//! Case-insensitive substring search over patients and care tasks.

use crate::patient::Patient;
use crate::todo::Todo;

/// A lowercased search needle. Plain substring matching, no tokenizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    needle: String,
}

impl SearchQuery {
    /// `None` for an empty query, which callers treat as "no search".
    pub fn new(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        Some(Self {
            needle: raw.to_lowercase(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.needle
    }

    pub fn matches(&self, haystack: &str) -> bool {
        haystack.to_lowercase().contains(&self.needle)
    }

    /// First name, last name or any diagnosis text.
    pub fn matches_patient(&self, patient: &Patient) -> bool {
        self.matches(&patient.first_name)
            || self.matches(&patient.last_name)
            || patient.diagnoses.iter().any(|d| self.matches(&d.text))
    }

    /// Title or description.
    pub fn matches_todo(&self, todo: &Todo) -> bool {
        self.matches(&todo.title)
            || todo
                .description
                .as_deref()
                .is_some_and(|d| self.matches(d))
    }
}
