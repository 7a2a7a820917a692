//! Persistence seam. Handlers only see [`CareStore`]; the binary picks
//! [`PgStore`] or [`MemoryStore`] at startup.

use async_trait::async_trait;
use care_core::{
    NewNotification, NewPatient, NewTodo, Notification, Patient, SearchQuery, Todo, TodoFilter,
};
use std::collections::HashMap;
use uuid::Uuid;

mod memory;
pub mod migrations;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{entity} {id} is no longer at version {expected}")]
    VersionConflict {
        entity: &'static str,
        id: Uuid,
        expected: i32,
    },

    #[error("referenced {entity} {id} does not exist")]
    MissingReference { entity: &'static str, id: Uuid },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("migration {name} failed: {source}")]
    Migration {
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for patients, care tasks and notifications.
///
/// Inputs are expected to be validated already. Stores assign ids and
/// timestamps. `update_*` methods write only when the stored version still
/// equals the version of the record passed in, then bump it.
#[async_trait]
pub trait CareStore: Send + Sync {
    async fn create_patient(&self, patient: NewPatient) -> StoreResult<Patient>;
    async fn get_patient(&self, id: Uuid) -> StoreResult<Option<Patient>>;
    /// Ordered by last name, then first name.
    async fn list_patients(&self) -> StoreResult<Vec<Patient>>;
    /// First name, last name or a diagnosis text contains the query.
    async fn search_patients(&self, query: &SearchQuery) -> StoreResult<Vec<Patient>>;
    async fn update_patient(&self, patient: &Patient) -> StoreResult<Patient>;
    /// Removes the patient's todos and their notifications as well.
    async fn delete_patient(&self, id: Uuid) -> StoreResult<()>;
    /// Todos per patient, any completion state. Patients without todos are absent.
    async fn count_todos_by_patient(&self) -> StoreResult<HashMap<Uuid, usize>>;

    /// Fails with `MissingReference` when the patient does not exist.
    async fn create_todo(&self, todo: NewTodo) -> StoreResult<Todo>;
    async fn get_todo(&self, id: Uuid) -> StoreResult<Option<Todo>>;
    /// Ascending by due date.
    async fn list_todos(&self, filter: &TodoFilter) -> StoreResult<Vec<Todo>>;
    /// Title or description contains the query, ascending by due date.
    async fn search_todos(&self, query: &SearchQuery) -> StoreResult<Vec<Todo>>;
    /// Every incomplete todo; input for the classifier.
    async fn list_open_todos(&self) -> StoreResult<Vec<Todo>>;
    async fn update_todo(&self, todo: &Todo) -> StoreResult<Todo>;
    async fn mark_notification_sent(&self, id: Uuid) -> StoreResult<Todo>;
    /// Removes the todo's notifications as well.
    async fn delete_todo(&self, id: Uuid) -> StoreResult<()>;

    async fn create_notification(&self, notification: NewNotification)
        -> StoreResult<Notification>;
    /// Newest first.
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>>;
    async fn mark_notification_read(&self, id: Uuid) -> StoreResult<Notification>;
    /// Number of notifications that changed.
    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64>;
    async fn delete_notification(&self, id: Uuid) -> StoreResult<()>;
}
