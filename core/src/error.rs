use thiserror::Error;

/// Rejection of caller input. Never transient, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyText { field: &'static str },
    #[error("upcoming window must be a positive number of hours within range, got {0}")]
    InvalidWindow(i64),
    #[error("invalid {field}: {value}")]
    InvalidDate { field: &'static str, value: String },
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
    #[error("{field} must be a positive number")]
    NotPositive { field: &'static str },
    #[error("no diagnosis at position {0}")]
    IndexOutOfRange(usize),
    #[error("at least one diagnosis is required")]
    NoDiagnoses,
    #[error("exactly one diagnosis must be marked as main, found {0}")]
    MainDiagnosisCount(usize),
    #[error("the only diagnosis must stay the main diagnosis")]
    SoleMainDiagnosis,
}

impl ValidationError {
    /// Name of the offending input field, when there is one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::EmptyText { field }
            | Self::InvalidDate { field, .. }
            | Self::NotPositive { field } => Some(field),
            Self::InvalidWindow(_) => Some("hours"),
            Self::UnknownVariant { kind, .. } => Some(kind),
            Self::IndexOutOfRange(_)
            | Self::NoDiagnoses
            | Self::MainDiagnosisCount(_)
            | Self::SoleMainDiagnosis => Some("diagnoses"),
        }
    }
}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Trim `value` and reject it when nothing is left.
pub(crate) fn required_text(field: &'static str, value: &str) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyText { field });
    }
    Ok(trimmed.to_string())
}

/// Trim an optional free-text field; blank collapses to `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
