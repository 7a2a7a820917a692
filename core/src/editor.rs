//! Interactive editing of a patient's diagnoses and allergies before submission.
//!
//! These rules follow user intent (the last explicit "main" choice wins) and
//! keep exactly one main diagnosis after every operation on a non-empty list.
//! The persisted list still goes through [`crate::diagnosis::prepare`].

use crate::diagnosis::{normalized, Diagnosis};
use crate::error::{ValidationError, ValidationResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosisEditor {
    entries: Vec<Diagnosis>,
}

impl DiagnosisEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a stored list. Legacy data with zero or several main flags
    /// is normalized on load.
    pub fn from_diagnoses(diagnoses: Vec<Diagnosis>) -> Self {
        Self {
            entries: normalized(diagnoses),
        }
    }

    pub fn entries(&self) -> &[Diagnosis] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a diagnosis. It becomes main only when the list was empty.
    pub fn add(&mut self, text: &str) -> ValidationResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText { field: "diagnosis" });
        }
        let is_main = self.entries.is_empty();
        self.entries.push(Diagnosis {
            text: text.to_string(),
            is_main,
        });
        Ok(())
    }

    /// Blank text is allowed while editing and rejected by [`Self::finish`].
    pub fn update_text(&mut self, index: usize, text: impl Into<String>) -> ValidationResult<()> {
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(ValidationError::IndexOutOfRange(index))?;
        entry.text = text.into();
        Ok(())
    }

    /// Check or uncheck the main flag of one entry.
    ///
    /// Checking makes the entry the sole main diagnosis. Unchecking the main
    /// entry hands the flag to the first other entry; it is refused when the
    /// entry is the only one. Unchecking an entry that is not main does nothing.
    pub fn set_main(&mut self, index: usize, checked: bool) -> ValidationResult<()> {
        if index >= self.entries.len() {
            return Err(ValidationError::IndexOutOfRange(index));
        }

        let winner = if checked {
            index
        } else {
            if !self.entries[index].is_main {
                return Ok(());
            }
            if self.entries.len() == 1 {
                return Err(ValidationError::SoleMainDiagnosis);
            }
            if index == 0 {
                1
            } else {
                0
            }
        };

        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.is_main = i == winner;
        }
        Ok(())
    }

    /// Remove an entry. Removing the main diagnosis promotes the new first entry.
    pub fn remove(&mut self, index: usize) -> ValidationResult<Diagnosis> {
        if index >= self.entries.len() {
            return Err(ValidationError::IndexOutOfRange(index));
        }
        let removed = self.entries.remove(index);
        if removed.is_main {
            if let Some(first) = self.entries.first_mut() {
                first.is_main = true;
            }
        }
        Ok(removed)
    }

    /// Submission check: at least one diagnosis, exactly one main, no blank
    /// text. Returns the trimmed list.
    pub fn finish(&self) -> ValidationResult<Vec<Diagnosis>> {
        if self.entries.is_empty() {
            return Err(ValidationError::NoDiagnoses);
        }

        let main_count = self.entries.iter().filter(|d| d.is_main).count();
        if main_count != 1 {
            return Err(ValidationError::MainDiagnosisCount(main_count));
        }

        self.entries
            .iter()
            .map(|d| {
                let text = d.text.trim();
                if text.is_empty() {
                    return Err(ValidationError::EmptyText { field: "diagnosis" });
                }
                Ok(Diagnosis {
                    text: text.to_string(),
                    is_main: d.is_main,
                })
            })
            .collect()
    }
}

/// Allergy entries with case-insensitive de-duplication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllergyList {
    entries: Vec<String>,
}

impl AllergyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_allergies(allergies: Vec<String>) -> Self {
        let mut list = Self::new();
        for allergy in allergies {
            list.add(&allergy);
        }
        list
    }

    /// Returns `false` when the text is blank or already present.
    pub fn add(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() || self.contains(text) {
            return false;
        }
        self.entries.push(text.to_string());
        true
    }

    pub fn contains(&self, text: &str) -> bool {
        let needle = text.trim().to_lowercase();
        self.entries.iter().any(|a| a.to_lowercase() == needle)
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<String> {
        self.entries
    }
}
