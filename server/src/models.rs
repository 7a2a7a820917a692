//! Wire shapes that exist only at the HTTP boundary. Domain records come
//! from `care_core` and serialize as they are.

use care_core::{Patient, Todo, TodoCategory, TodoFilter};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A patient with its computed age and, on the detail endpoint, its todos.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientView {
    #[serde(flatten)]
    pub patient: Patient,
    pub age: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todos: Option<Vec<Todo>>,
}

impl PatientView {
    pub fn new(patient: Patient, today: NaiveDate) -> Self {
        let age = patient.age_on(today);
        Self {
            patient,
            age,
            todos: None,
        }
    }

    pub fn with_todos(mut self, todos: Vec<Todo>) -> Self {
        self.todos = Some(todos);
        self
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PatientListQuery {
    pub search: Option<String>,
}

// Not a flattened TodoFilter: flattening breaks bool and uuid parsing in
// query strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoListQuery {
    pub patient_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub category: Option<TodoCategory>,
    pub completed: Option<bool>,
    pub search: Option<String>,
}

impl TodoListQuery {
    pub fn filter(&self) -> TodoFilter {
        TodoFilter {
            patient_id: self.patient_id,
            assigned_to_id: self.assigned_to_id,
            category: self.category,
            completed: self.completed,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpcomingQuery {
    pub hours: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListQuery {
    pub user_id: Uuid,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}
