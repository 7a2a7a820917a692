use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{required_text, ValidationError, ValidationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TodoReminder,
    TodoOverdue,
}

impl NotificationType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TodoReminder => "todo_reminder",
            Self::TodoOverdue => "todo_overdue",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo_reminder" => Ok(Self::TodoReminder),
            "todo_overdue" => Ok(Self::TodoOverdue),
            other => Err(ValidationError::UnknownVariant {
                kind: "type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub message: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub user_id: Uuid,
    pub todo_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Mark as read, restamping `read_at` every time.
    pub fn mark_read(&mut self, now: DateTime<Utc>) {
        self.read = true;
        self.read_at = Some(now);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub message: String,
    pub user_id: Uuid,
    #[serde(default)]
    pub todo_id: Option<Uuid>,
}

impl NewNotification {
    pub fn prepare(self) -> ValidationResult<Self> {
        Ok(Self {
            message: required_text("message", &self.message)?,
            ..self
        })
    }

    pub fn into_notification(self, id: Uuid, now: DateTime<Utc>) -> Notification {
        Notification {
            id,
            kind: self.kind,
            message: self.message,
            read: false,
            read_at: None,
            user_id: self.user_id,
            todo_id: self.todo_id,
            created_at: now,
        }
    }
}
