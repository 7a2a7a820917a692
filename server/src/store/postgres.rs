use async_trait::async_trait;
use care_core::{
    Diagnosis, NewNotification, NewPatient, NewTodo, Notification, Patient, SearchQuery, Todo,
    TodoFilter, ValidationError,
};
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use super::{migrations, CareStore, StoreError, StoreResult};
use crate::config::DbConfig;

const PATIENT_COLUMNS: &str = "id, first_name, last_name, date_of_birth, weight, gender, \
     diagnoses, allergies, room_number, notes, created_at, updated_at, version";

const TODO_COLUMNS: &str = "id, title, description, category, priority, due_date, completed, \
     completed_at, notification_sent, patient_id, assigned_to_id, created_at, updated_at, version";

const NOTIFICATION_COLUMNS: &str = "id, type, message, read, read_at, user_id, todo_id, created_at";

const FOREIGN_KEY_VIOLATION: &str = "23503";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DbConfig<'_>) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_string())
            .await?;

        // Fail at startup rather than on the first request.
        sqlx::query("SELECT 1").execute(&pool).await?;
        tracing::info!(max_connections = config.max_connections, "database connected");

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> StoreResult<usize> {
        migrations::run_migrations(&self.pool).await
    }

    // A conditional update matched nothing: tell a stale version from a missing row.
    async fn missing_or_stale(
        &self,
        table: &'static str,
        entity: &'static str,
        id: Uuid,
        expected: i32,
    ) -> StoreError {
        let exists = sqlx::query(&format!("SELECT 1 FROM {table} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        match exists {
            Ok(Some(_)) => StoreError::VersionConflict {
                entity,
                id,
                expected,
            },
            Ok(None) => StoreError::NotFound { entity, id },
            Err(e) => StoreError::Database(e),
        }
    }
}

fn parse_column<T>(raw: &str) -> StoreResult<T>
where
    T: FromStr<Err = ValidationError>,
{
    raw.parse()
        .map_err(|e: ValidationError| StoreError::Corrupt(e.to_string()))
}

/// `%needle%` for ILIKE with the wildcard characters of the needle escaped.
fn like_pattern(query: &SearchQuery) -> String {
    let escaped = query
        .as_str()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn foreign_key_or(err: sqlx::Error, entity: &'static str, id: Uuid) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
            return StoreError::MissingReference { entity, id };
        }
    }
    StoreError::Database(err)
}

fn patient_from_row(row: &PgRow) -> StoreResult<Patient> {
    let gender: String = row.try_get("gender")?;
    let Json(diagnoses): Json<Vec<Diagnosis>> = row.try_get("diagnoses")?;

    Ok(Patient {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        date_of_birth: row.try_get("date_of_birth")?,
        weight: row.try_get("weight")?,
        gender: parse_column(&gender)?,
        diagnoses,
        allergies: row.try_get("allergies")?,
        room_number: row.try_get("room_number")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        version: row.try_get("version")?,
    })
}

fn todo_from_row(row: &PgRow) -> StoreResult<Todo> {
    let category: String = row.try_get("category")?;
    let priority: String = row.try_get("priority")?;

    Ok(Todo {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category: parse_column(&category)?,
        priority: parse_column(&priority)?,
        due_date: row.try_get("due_date")?,
        completed: row.try_get("completed")?,
        completed_at: row.try_get("completed_at")?,
        notification_sent: row.try_get("notification_sent")?,
        patient_id: row.try_get("patient_id")?,
        assigned_to_id: row.try_get("assigned_to_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        version: row.try_get("version")?,
    })
}

fn notification_from_row(row: &PgRow) -> StoreResult<Notification> {
    let kind: String = row.try_get("type")?;

    Ok(Notification {
        id: row.try_get("id")?,
        kind: parse_column(&kind)?,
        message: row.try_get("message")?,
        read: row.try_get("read")?,
        read_at: row.try_get("read_at")?,
        user_id: row.try_get("user_id")?,
        todo_id: row.try_get("todo_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn collect<T>(rows: Vec<PgRow>, from_row: fn(&PgRow) -> StoreResult<T>) -> StoreResult<Vec<T>> {
    rows.iter().map(from_row).collect()
}

#[async_trait]
impl CareStore for PgStore {
    async fn create_patient(&self, patient: NewPatient) -> StoreResult<Patient> {
        let patient = patient.into_patient(Uuid::new_v4(), Utc::now());

        sqlx::query(&format!(
            "INSERT INTO patients ({PATIENT_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(patient.id)
        .bind(&patient.first_name)
        .bind(&patient.last_name)
        .bind(patient.date_of_birth)
        .bind(patient.weight)
        .bind(patient.gender.as_str())
        .bind(Json(&patient.diagnoses))
        .bind(&patient.allergies)
        .bind(&patient.room_number)
        .bind(&patient.notes)
        .bind(patient.created_at)
        .bind(patient.updated_at)
        .bind(patient.version)
        .execute(&self.pool)
        .await?;

        tracing::debug!(id = %patient.id, "patient created");
        Ok(patient)
    }

    async fn get_patient(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        let row = sqlx::query(&format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(patient_from_row).transpose()
    }

    async fn list_patients(&self) -> StoreResult<Vec<Patient>> {
        let rows = sqlx::query(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY last_name, first_name, created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        collect(rows, patient_from_row)
    }

    async fn search_patients(&self, query: &SearchQuery) -> StoreResult<Vec<Patient>> {
        let rows = sqlx::query(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients
             WHERE first_name ILIKE $1
                OR last_name ILIKE $1
                OR EXISTS (
                    SELECT 1 FROM jsonb_array_elements(diagnoses) AS d
                    WHERE d->>'text' ILIKE $1
                )
             ORDER BY last_name, first_name, created_at"
        ))
        .bind(like_pattern(query))
        .fetch_all(&self.pool)
        .await?;

        collect(rows, patient_from_row)
    }

    async fn update_patient(&self, patient: &Patient) -> StoreResult<Patient> {
        let row = sqlx::query(&format!(
            "UPDATE patients
             SET first_name = $2, last_name = $3, date_of_birth = $4, weight = $5,
                 gender = $6, diagnoses = $7, allergies = $8, room_number = $9,
                 notes = $10, updated_at = $11, version = version + 1
             WHERE id = $1 AND version = $12
             RETURNING {PATIENT_COLUMNS}"
        ))
        .bind(patient.id)
        .bind(&patient.first_name)
        .bind(&patient.last_name)
        .bind(patient.date_of_birth)
        .bind(patient.weight)
        .bind(patient.gender.as_str())
        .bind(Json(&patient.diagnoses))
        .bind(&patient.allergies)
        .bind(&patient.room_number)
        .bind(&patient.notes)
        .bind(Utc::now())
        .bind(patient.version)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => patient_from_row(&row),
            None => Err(self
                .missing_or_stale("patients", "patient", patient.id, patient.version)
                .await),
        }
    }

    async fn delete_patient(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "patient",
                id,
            });
        }
        tracing::debug!(%id, "patient deleted with its todos");
        Ok(())
    }

    async fn count_todos_by_patient(&self) -> StoreResult<HashMap<Uuid, usize>> {
        let rows: Vec<(Uuid, i64)> =
            sqlx::query_as("SELECT patient_id, COUNT(*) FROM todos GROUP BY patient_id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, count.max(0) as usize))
            .collect())
    }

    async fn create_todo(&self, todo: NewTodo) -> StoreResult<Todo> {
        let todo = todo.into_todo(Uuid::new_v4(), Utc::now());

        sqlx::query(&format!(
            "INSERT INTO todos ({TODO_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(todo.id)
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.category.as_str())
        .bind(todo.priority.as_str())
        .bind(todo.due_date)
        .bind(todo.completed)
        .bind(todo.completed_at)
        .bind(todo.notification_sent)
        .bind(todo.patient_id)
        .bind(todo.assigned_to_id)
        .bind(todo.created_at)
        .bind(todo.updated_at)
        .bind(todo.version)
        .execute(&self.pool)
        .await
        .map_err(|e| foreign_key_or(e, "patient", todo.patient_id))?;

        tracing::debug!(id = %todo.id, patient = %todo.patient_id, "todo created");
        Ok(todo)
    }

    async fn get_todo(&self, id: Uuid) -> StoreResult<Option<Todo>> {
        let row = sqlx::query(&format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(todo_from_row).transpose()
    }

    async fn list_todos(&self, filter: &TodoFilter) -> StoreResult<Vec<Todo>> {
        let rows = sqlx::query(&format!(
            "SELECT {TODO_COLUMNS} FROM todos
             WHERE ($1::uuid IS NULL OR patient_id = $1)
               AND ($2::uuid IS NULL OR assigned_to_id = $2)
               AND ($3::text IS NULL OR category = $3)
               AND ($4::boolean IS NULL OR completed = $4)
             ORDER BY due_date, created_at"
        ))
        .bind(filter.patient_id)
        .bind(filter.assigned_to_id)
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.completed)
        .fetch_all(&self.pool)
        .await?;

        collect(rows, todo_from_row)
    }

    async fn search_todos(&self, query: &SearchQuery) -> StoreResult<Vec<Todo>> {
        let rows = sqlx::query(&format!(
            "SELECT {TODO_COLUMNS} FROM todos
             WHERE title ILIKE $1 OR description ILIKE $1
             ORDER BY due_date, created_at"
        ))
        .bind(like_pattern(query))
        .fetch_all(&self.pool)
        .await?;

        collect(rows, todo_from_row)
    }

    async fn list_open_todos(&self) -> StoreResult<Vec<Todo>> {
        let rows = sqlx::query(&format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE NOT completed ORDER BY due_date, created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        collect(rows, todo_from_row)
    }

    async fn update_todo(&self, todo: &Todo) -> StoreResult<Todo> {
        let row = sqlx::query(&format!(
            "UPDATE todos
             SET title = $2, description = $3, category = $4, priority = $5,
                 due_date = $6, completed = $7, completed_at = $8,
                 notification_sent = $9, patient_id = $10, assigned_to_id = $11,
                 updated_at = $12, version = version + 1
             WHERE id = $1 AND version = $13
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(todo.id)
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.category.as_str())
        .bind(todo.priority.as_str())
        .bind(todo.due_date)
        .bind(todo.completed)
        .bind(todo.completed_at)
        .bind(todo.notification_sent)
        .bind(todo.patient_id)
        .bind(todo.assigned_to_id)
        .bind(Utc::now())
        .bind(todo.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| foreign_key_or(e, "patient", todo.patient_id))?;

        match row {
            Some(row) => todo_from_row(&row),
            None => Err(self
                .missing_or_stale("todos", "todo", todo.id, todo.version)
                .await),
        }
    }

    async fn mark_notification_sent(&self, id: Uuid) -> StoreResult<Todo> {
        let row = sqlx::query(&format!(
            "UPDATE todos
             SET notification_sent = TRUE, updated_at = $2, version = version + 1
             WHERE id = $1
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => todo_from_row(&row),
            None => Err(StoreError::NotFound { entity: "todo", id }),
        }
    }

    async fn delete_todo(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "todo", id });
        }
        Ok(())
    }

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> StoreResult<Notification> {
        let notification = notification.into_notification(Uuid::new_v4(), Utc::now());

        sqlx::query(&format!(
            "INSERT INTO notifications ({NOTIFICATION_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(notification.id)
        .bind(notification.kind.as_str())
        .bind(&notification.message)
        .bind(notification.read)
        .bind(notification.read_at)
        .bind(notification.user_id)
        .bind(notification.todo_id)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| foreign_key_or(e, "todo", notification.todo_id.unwrap_or_default()))?;

        Ok(notification)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = $1 AND (NOT $2 OR NOT read)
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;

        collect(rows, notification_from_row)
    }

    async fn mark_notification_read(&self, id: Uuid) -> StoreResult<Notification> {
        let row = sqlx::query(&format!(
            "UPDATE notifications SET read = TRUE, read_at = $2
             WHERE id = $1
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => notification_from_row(&row),
            None => Err(StoreError::NotFound {
                entity: "notification",
                id,
            }),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE, read_at = $2
             WHERE user_id = $1 AND NOT read",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "notification",
                id,
            });
        }
        Ok(())
    }
}
