use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{optional_text, required_text, ValidationError, ValidationResult};
use crate::patch::double_option;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TodoCategory {
    #[serde(rename = "Beatmung")]
    Beatmung,
    #[serde(rename = "Ernährung")]
    Ernaehrung,
    #[serde(rename = "Bewegung")]
    Bewegung,
    #[serde(rename = "Ausscheidung")]
    Ausscheidung,
}

impl TodoCategory {
    pub const ALL: [TodoCategory; 4] = [
        Self::Beatmung,
        Self::Ernaehrung,
        Self::Bewegung,
        Self::Ausscheidung,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Beatmung => "Beatmung",
            Self::Ernaehrung => "Ernährung",
            Self::Bewegung => "Bewegung",
            Self::Ausscheidung => "Ausscheidung",
        }
    }
}

impl fmt::Display for TodoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownVariant {
                kind: "category",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TodoPriority {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for TodoPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoPriority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(ValidationError::UnknownVariant {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// A scheduled care task for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: TodoCategory,
    pub priority: TodoPriority,
    pub due_date: DateTime<Utc>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub notification_sent: bool,
    pub patient_id: Uuid,
    pub assigned_to_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Row version used for conditional updates.
    pub version: i32,
}

/// Creation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: TodoCategory,
    #[serde(default)]
    pub priority: TodoPriority,
    pub due_date: DateTime<Utc>,
    pub patient_id: Uuid,
    #[serde(default)]
    pub assigned_to_id: Option<Uuid>,
}

impl NewTodo {
    /// Trim text fields and reject a blank title.
    pub fn prepare(self) -> ValidationResult<Self> {
        Ok(Self {
            title: required_text("title", &self.title)?,
            description: optional_text(self.description),
            ..self
        })
    }

    /// Build the stored record. New tasks always start incomplete.
    pub fn into_todo(self, id: Uuid, now: DateTime<Utc>) -> Todo {
        Todo {
            id,
            title: self.title,
            description: self.description,
            category: self.category,
            priority: self.priority,
            due_date: self.due_date,
            completed: false,
            completed_at: None,
            notification_sent: false,
            patient_id: self.patient_id,
            assigned_to_id: self.assigned_to_id,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }
}

/// Partial update. Absent fields keep their stored value; `null` clears the
/// nullable ones.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoUpdate {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub category: Option<TodoCategory>,
    pub priority: Option<TodoPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
    pub notification_sent: Option<bool>,
    pub patient_id: Option<Uuid>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to_id: Option<Option<Uuid>>,
}

impl Todo {
    /// Set the completion flag, stamping `completed_at` on the false→true
    /// transition only. Un-completing keeps the previous stamp.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        if completed && !self.completed {
            self.completed_at = Some(now);
        }
        self.completed = completed;
    }

    /// Merge `update` into a copy of this task.
    pub fn apply(&self, update: TodoUpdate, now: DateTime<Utc>) -> ValidationResult<Todo> {
        let mut next = self.clone();

        if let Some(title) = update.title {
            next.title = required_text("title", &title)?;
        }
        if let Some(description) = update.description {
            next.description = optional_text(description);
        }
        if let Some(category) = update.category {
            next.category = category;
        }
        if let Some(priority) = update.priority {
            next.priority = priority;
        }
        if let Some(due_date) = update.due_date {
            next.due_date = due_date;
        }
        if let Some(notification_sent) = update.notification_sent {
            next.notification_sent = notification_sent;
        }
        if let Some(patient_id) = update.patient_id {
            next.patient_id = patient_id;
        }
        if let Some(assigned_to_id) = update.assigned_to_id {
            next.assigned_to_id = assigned_to_id;
        }
        if let Some(completed) = update.completed {
            next.set_completed(completed, now);
        }

        Ok(next)
    }
}

/// Copy of `todo` marked as completed at `now`.
pub fn mark_completed(todo: &Todo, now: DateTime<Utc>) -> Todo {
    let mut next = todo.clone();
    next.set_completed(true, now);
    next
}

/// Equality filters for task listings. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoFilter {
    pub patient_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub category: Option<TodoCategory>,
    pub completed: Option<bool>,
}

impl TodoFilter {
    pub fn for_patient(patient_id: Uuid) -> Self {
        Self {
            patient_id: Some(patient_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, todo: &Todo) -> bool {
        self.patient_id.map_or(true, |id| todo.patient_id == id)
            && self
                .assigned_to_id
                .map_or(true, |id| todo.assigned_to_id == Some(id))
            && self.category.map_or(true, |c| todo.category == c)
            && self.completed.map_or(true, |c| todo.completed == c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    fn sample_todo() -> Todo {
        NewTodo {
            title: "Lagerungswechsel".to_string(),
            description: Some("Rechte Seite".to_string()),
            category: TodoCategory::Bewegung,
            priority: TodoPriority::High,
            due_date: at(10),
            patient_id: Uuid::new_v4(),
            assigned_to_id: None,
        }
        .into_todo(Uuid::new_v4(), at(8))
    }

    #[test]
    fn test_new_todo_starts_open() {
        let todo = sample_todo();
        assert!(!todo.completed);
        assert!(todo.completed_at.is_none());
        assert!(!todo.notification_sent);
        assert_eq!(todo.created_at, at(8));
        assert_eq!(todo.version, 1);
    }

    #[test]
    fn test_prepare_trims_and_rejects_blank_title() {
        let mut new = NewTodo {
            title: "  Sondenkost  ".to_string(),
            description: Some("   ".to_string()),
            category: TodoCategory::Ernaehrung,
            priority: TodoPriority::default(),
            due_date: at(12),
            patient_id: Uuid::new_v4(),
            assigned_to_id: None,
        };
        let prepared = new.clone().prepare().unwrap();
        assert_eq!(prepared.title, "Sondenkost");
        assert_eq!(prepared.description, None);

        new.title = " ".to_string();
        assert_eq!(
            new.prepare().unwrap_err(),
            ValidationError::EmptyText { field: "title" }
        );
    }

    #[test]
    fn test_completion_stamps_once() {
        let todo = sample_todo();
        let first = todo
            .apply(
                TodoUpdate {
                    completed: Some(true),
                    ..Default::default()
                },
                at(11),
            )
            .unwrap();
        assert!(first.completed);
        assert_eq!(first.completed_at, Some(at(11)));

        let again = first
            .apply(
                TodoUpdate {
                    completed: Some(true),
                    title: Some("Lagerung".to_string()),
                    ..Default::default()
                },
                at(13),
            )
            .unwrap();
        assert_eq!(again.completed_at, Some(at(11)));
    }

    #[test]
    fn test_uncompleting_keeps_stale_stamp() {
        let done = mark_completed(&sample_todo(), at(11));
        let reopened = done
            .apply(
                TodoUpdate {
                    completed: Some(false),
                    ..Default::default()
                },
                at(12),
            )
            .unwrap();
        assert!(!reopened.completed);
        assert_eq!(reopened.completed_at, Some(at(11)));

        let redone = mark_completed(&reopened, at(15));
        assert_eq!(redone.completed_at, Some(at(15)));
    }

    #[test]
    fn test_mark_completed_is_idempotent() {
        let done = mark_completed(&sample_todo(), at(11));
        let still_done = mark_completed(&done, at(11) + Duration::hours(3));
        assert_eq!(still_done.completed_at, Some(at(11)));
    }

    #[test]
    fn test_apply_leaves_absent_fields() {
        let todo = sample_todo();
        let updated = todo
            .apply(
                TodoUpdate {
                    priority: Some(TodoPriority::Urgent),
                    ..Default::default()
                },
                at(9),
            )
            .unwrap();
        assert_eq!(updated.priority, TodoPriority::Urgent);
        assert_eq!(updated.title, todo.title);
        assert_eq!(updated.description, todo.description);
        assert_eq!(updated.version, todo.version);
    }

    #[test]
    fn test_apply_rejects_blank_title() {
        let err = sample_todo()
            .apply(
                TodoUpdate {
                    title: Some("".to_string()),
                    ..Default::default()
                },
                at(9),
            )
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyText { field: "title" });
    }

    #[test]
    fn test_update_null_clears_description() {
        let update: TodoUpdate = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(update.description, Some(None));
        let cleared = sample_todo().apply(update, at(9)).unwrap();
        assert_eq!(cleared.description, None);

        let untouched: TodoUpdate = serde_json::from_str(r#"{"priority": "low"}"#).unwrap();
        assert_eq!(untouched.description, None);
        assert!(sample_todo().apply(untouched, at(9)).unwrap().description.is_some());
    }

    #[test]
    fn test_category_wire_names() {
        let json = serde_json::to_value(TodoCategory::Ernaehrung).unwrap();
        assert_eq!(json, "Ernährung");
        assert_eq!("Ernährung".parse::<TodoCategory>().unwrap(), TodoCategory::Ernaehrung);
        assert!("Schlaf".parse::<TodoCategory>().is_err());
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        let new: NewTodo = serde_json::from_value(serde_json::json!({
            "title": "Blutzucker messen",
            "category": "Ernährung",
            "dueDate": "2026-03-14T10:00:00Z",
            "patientId": Uuid::new_v4(),
        }))
        .unwrap();
        assert_eq!(new.priority, TodoPriority::Medium);
        assert_eq!("urgent".parse::<TodoPriority>().unwrap(), TodoPriority::Urgent);
    }

    #[test]
    fn test_filter_matches() {
        let todo = sample_todo();
        assert!(TodoFilter::default().matches(&todo));
        assert!(TodoFilter::for_patient(todo.patient_id).matches(&todo));
        assert!(!TodoFilter::for_patient(Uuid::new_v4()).matches(&todo));

        let filter = TodoFilter {
            category: Some(TodoCategory::Bewegung),
            completed: Some(false),
            ..Default::default()
        };
        assert!(filter.matches(&todo));

        let assigned = TodoFilter {
            assigned_to_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(!assigned.matches(&todo));
    }
}
