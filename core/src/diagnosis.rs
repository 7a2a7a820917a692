//! Main-diagnosis invariant.
//!
//! A patient's diagnosis list carries exactly one entry flagged as main when it
//! is non-empty, and none when it is empty. [`normalize`] restores that
//! invariant for any list and runs before every patient create and update.

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub text: String,
    #[serde(default)]
    pub is_main: bool,
}

impl Diagnosis {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_main: false,
        }
    }

    pub fn main(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_main: true,
        }
    }
}

/// Enforce a single main diagnosis in place.
///
/// When several entries are flagged, the first one in list order keeps the
/// flag. When none is flagged, the first entry receives it. Idempotent and
/// infallible; an empty list is left untouched.
pub fn normalize(diagnoses: &mut [Diagnosis]) {
    let main_count = diagnoses.iter().filter(|d| d.is_main).count();

    match main_count {
        0 => {
            if let Some(first) = diagnoses.first_mut() {
                tracing::debug!(diagnosis = %first.text, "no main diagnosis flagged, promoting first entry");
                first.is_main = true;
            }
        }
        1 => {}
        _ => {
            tracing::debug!(main_count, "multiple main diagnoses flagged, keeping the first");
            let mut seen_main = false;
            for diagnosis in diagnoses.iter_mut().filter(|d| d.is_main) {
                if seen_main {
                    diagnosis.is_main = false;
                } else {
                    seen_main = true;
                }
            }
        }
    }
}

/// Owned variant of [`normalize`].
pub fn normalized(mut diagnoses: Vec<Diagnosis>) -> Vec<Diagnosis> {
    normalize(&mut diagnoses);
    diagnoses
}

/// The entry currently flagged as main.
pub fn main_diagnosis(diagnoses: &[Diagnosis]) -> Option<&Diagnosis> {
    diagnoses.iter().find(|d| d.is_main)
}

/// Persistence-time preparation: trim every text, reject blank entries, then
/// normalize the main flag.
pub fn prepare(diagnoses: Vec<Diagnosis>) -> ValidationResult<Vec<Diagnosis>> {
    let trimmed = diagnoses
        .into_iter()
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
        .collect::<ValidationResult<Vec<_>>>()?;

    Ok(normalized(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_count(diagnoses: &[Diagnosis]) -> usize {
        diagnoses.iter().filter(|d| d.is_main).count()
    }

    #[test]
    fn test_first_main_wins() {
        let list = vec![Diagnosis::main("Flu"), Diagnosis::main("Cold")];
        assert_eq!(
            normalized(list),
            vec![Diagnosis::main("Flu"), Diagnosis::new("Cold")]
        );
    }

    #[test]
    fn test_first_main_wins_when_not_at_index_zero() {
        let list = vec![
            Diagnosis::new("COPD"),
            Diagnosis::main("Hypertonie"),
            Diagnosis::new("Osteoporose"),
            Diagnosis::main("Depression"),
        ];
        let result = normalized(list);
        assert_eq!(main_diagnosis(&result).unwrap().text, "Hypertonie");
        assert_eq!(main_count(&result), 1);
    }

    #[test]
    fn test_first_entry_promoted_when_none_flagged() {
        let list = vec![Diagnosis::new("Flu"), Diagnosis::new("Cold")];
        assert_eq!(
            normalized(list),
            vec![Diagnosis::main("Flu"), Diagnosis::new("Cold")]
        );
    }

    #[test]
    fn test_single_main_untouched() {
        let list = vec![Diagnosis::new("Flu"), Diagnosis::main("Cold")];
        assert_eq!(normalized(list.clone()), list);
    }

    #[test]
    fn test_empty_list_is_noop() {
        assert!(normalized(Vec::new()).is_empty());
    }

    #[test]
    fn test_main_count_is_min_one_len() {
        let flags = [
            vec![],
            vec![false],
            vec![true],
            vec![false, false, false],
            vec![true, true, true],
            vec![false, true, false, true],
        ];
        for pattern in flags {
            let list: Vec<Diagnosis> = pattern
                .iter()
                .enumerate()
                .map(|(i, &is_main)| Diagnosis {
                    text: format!("d{i}"),
                    is_main,
                })
                .collect();
            let len = list.len();
            let once = normalized(list);
            assert_eq!(main_count(&once), len.min(1));
            assert_eq!(normalized(once.clone()), once);
        }
    }

    #[test]
    fn test_normalize_preserves_order_and_text() {
        let list = vec![
            Diagnosis::main("B"),
            Diagnosis::main("A"),
            Diagnosis::new("C"),
        ];
        let texts: Vec<_> = normalized(list).into_iter().map(|d| d.text).collect();
        assert_eq!(texts, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_prepare_trims_and_normalizes() {
        let result = prepare(vec![Diagnosis::new("  COPD "), Diagnosis::new("Asthma")]).unwrap();
        assert_eq!(result, vec![Diagnosis::main("COPD"), Diagnosis::new("Asthma")]);
    }

    #[test]
    fn test_prepare_rejects_blank_text() {
        let err = prepare(vec![Diagnosis::main("COPD"), Diagnosis::new("  ")]).unwrap_err();
        assert_eq!(err, ValidationError::EmptyText { field: "diagnosis" });
    }

    #[test]
    fn test_is_main_defaults_to_false_on_the_wire() {
        let diagnosis: Diagnosis = serde_json::from_str(r#"{"text":"Parkinson-Krankheit"}"#).unwrap();
        assert!(!diagnosis.is_main);

        let json = serde_json::to_value(Diagnosis::main("COPD")).unwrap();
        assert_eq!(json["isMain"], true);
    }
}
