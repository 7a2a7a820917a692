use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::diagnosis::{self, Diagnosis};
use crate::error::{optional_text, required_text, ValidationError, ValidationResult};
use crate::patch::double_option;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            other => Err(ValidationError::UnknownVariant {
                kind: "gender",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// Kilograms.
    pub weight: f64,
    pub gender: Gender,
    pub diagnoses: Vec<Diagnosis>,
    pub allergies: Vec<String>,
    pub room_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age_on(&self, today: NaiveDate) -> u32 {
        age_on(self.date_of_birth, today)
    }

    /// Merge `update` into a copy of this patient. A supplied diagnosis list
    /// is trimmed, validated and normalized.
    pub fn apply(&self, update: PatientUpdate) -> ValidationResult<Patient> {
        let mut next = self.clone();

        if let Some(first_name) = update.first_name {
            next.first_name = required_text("firstName", &first_name)?;
        }
        if let Some(last_name) = update.last_name {
            next.last_name = required_text("lastName", &last_name)?;
        }
        if let Some(date_of_birth) = update.date_of_birth {
            next.date_of_birth = date_of_birth;
        }
        if let Some(weight) = update.weight {
            next.weight = positive_weight(weight)?;
        }
        if let Some(gender) = update.gender {
            next.gender = gender;
        }
        if let Some(diagnoses) = update.diagnoses {
            next.diagnoses = diagnosis::prepare(diagnoses)?;
        }
        if let Some(allergies) = update.allergies {
            next.allergies = clean_allergies(allergies);
        }
        if let Some(room_number) = update.room_number {
            next.room_number = optional_text(room_number);
        }
        if let Some(notes) = update.notes {
            next.notes = optional_text(notes);
        }

        Ok(next)
    }
}

/// Completed years between `date_of_birth` and `today`.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub weight: f64,
    pub gender: Gender,
    #[serde(default)]
    pub diagnoses: Vec<Diagnosis>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub room_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewPatient {
    /// Validate and clean the payload; the diagnosis list comes out normalized.
    pub fn prepare(self) -> ValidationResult<Self> {
        Ok(Self {
            first_name: required_text("firstName", &self.first_name)?,
            last_name: required_text("lastName", &self.last_name)?,
            date_of_birth: self.date_of_birth,
            weight: positive_weight(self.weight)?,
            gender: self.gender,
            diagnoses: diagnosis::prepare(self.diagnoses)?,
            allergies: clean_allergies(self.allergies),
            room_number: optional_text(self.room_number),
            notes: optional_text(self.notes),
        })
    }

    pub fn into_patient(self, id: Uuid, now: DateTime<Utc>) -> Patient {
        Patient {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            date_of_birth: self.date_of_birth,
            weight: self.weight,
            gender: self.gender,
            diagnoses: self.diagnoses,
            allergies: self.allergies,
            room_number: self.room_number,
            notes: self.notes,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub gender: Option<Gender>,
    pub diagnoses: Option<Vec<Diagnosis>>,
    pub allergies: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub room_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

fn positive_weight(weight: f64) -> ValidationResult<f64> {
    if weight.is_finite() && weight > 0.0 {
        Ok(weight)
    } else {
        Err(ValidationError::NotPositive { field: "weight" })
    }
}

fn clean_allergies(allergies: Vec<String>) -> Vec<String> {
    allergies
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

/// How often a patient has been scheduled for care.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitStatistic {
    pub id: Uuid,
    pub name: String,
    pub visit_count: usize,
    pub diagnoses: Vec<String>,
}

/// One entry per patient with its task count (any completion state), busiest
/// first. Ties keep input order.
pub fn visit_statistics<'a, I>(patients: I) -> Vec<VisitStatistic>
where
    I: IntoIterator<Item = (&'a Patient, usize)>,
{
    let mut statistics: Vec<VisitStatistic> = patients
        .into_iter()
        .map(|(patient, visit_count)| VisitStatistic {
            id: patient.id,
            name: patient.full_name(),
            visit_count,
            diagnoses: patient.diagnoses.iter().map(|d| d.text.clone()).collect(),
        })
        .collect();

    statistics.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
    statistics
}
