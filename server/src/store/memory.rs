use async_trait::async_trait;
use care_core::{
    NewNotification, NewPatient, NewTodo, Notification, Patient, SearchQuery, Todo, TodoFilter,
};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CareStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    patients: HashMap<Uuid, Patient>,
    todos: HashMap<Uuid, Todo>,
    notifications: HashMap<Uuid, Notification>,
}

/// Process-local store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_patients<'a>(patients: impl Iterator<Item = &'a Patient>) -> Vec<Patient> {
    let mut list: Vec<Patient> = patients.cloned().collect();
    list.sort_by(|a, b| {
        (&a.last_name, &a.first_name, a.created_at).cmp(&(&b.last_name, &b.first_name, b.created_at))
    });
    list
}

fn sorted_todos<'a>(todos: impl Iterator<Item = &'a Todo>) -> Vec<Todo> {
    let mut list: Vec<Todo> = todos.cloned().collect();
    list.sort_by_key(|t| (t.due_date, t.created_at));
    list
}

fn check_version(entity: &'static str, stored: i32, expected: i32, id: Uuid) -> StoreResult<()> {
    if stored != expected {
        return Err(StoreError::VersionConflict {
            entity,
            id,
            expected,
        });
    }
    Ok(())
}

#[async_trait]
impl CareStore for MemoryStore {
    async fn create_patient(&self, patient: NewPatient) -> StoreResult<Patient> {
        let patient = patient.into_patient(Uuid::new_v4(), Utc::now());
        let mut tables = self.tables.write().await;
        tables.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn get_patient(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        Ok(self.tables.read().await.patients.get(&id).cloned())
    }

    async fn list_patients(&self) -> StoreResult<Vec<Patient>> {
        Ok(sorted_patients(self.tables.read().await.patients.values()))
    }

    async fn search_patients(&self, query: &SearchQuery) -> StoreResult<Vec<Patient>> {
        let tables = self.tables.read().await;
        Ok(sorted_patients(
            tables.patients.values().filter(|p| query.matches_patient(p)),
        ))
    }

    async fn update_patient(&self, patient: &Patient) -> StoreResult<Patient> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .patients
            .get_mut(&patient.id)
            .ok_or(StoreError::NotFound {
                entity: "patient",
                id: patient.id,
            })?;
        check_version("patient", stored.version, patient.version, patient.id)?;

        let mut next = patient.clone();
        next.created_at = stored.created_at;
        next.updated_at = Utc::now();
        next.version = stored.version + 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn delete_patient(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.patients.remove(&id).is_none() {
            return Err(StoreError::NotFound {
                entity: "patient",
                id,
            });
        }
        let mut removed = HashSet::new();
        tables.todos.retain(|todo_id, todo| {
            let keep = todo.patient_id != id;
            if !keep {
                removed.insert(*todo_id);
            }
            keep
        });
        tables
            .notifications
            .retain(|_, n| n.todo_id.map_or(true, |todo_id| !removed.contains(&todo_id)));
        Ok(())
    }

    async fn count_todos_by_patient(&self) -> StoreResult<HashMap<Uuid, usize>> {
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for todo in tables.todos.values() {
            *counts.entry(todo.patient_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn create_todo(&self, todo: NewTodo) -> StoreResult<Todo> {
        let mut tables = self.tables.write().await;
        if !tables.patients.contains_key(&todo.patient_id) {
            return Err(StoreError::MissingReference {
                entity: "patient",
                id: todo.patient_id,
            });
        }
        let todo = todo.into_todo(Uuid::new_v4(), Utc::now());
        tables.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn get_todo(&self, id: Uuid) -> StoreResult<Option<Todo>> {
        Ok(self.tables.read().await.todos.get(&id).cloned())
    }

    async fn list_todos(&self, filter: &TodoFilter) -> StoreResult<Vec<Todo>> {
        let tables = self.tables.read().await;
        Ok(sorted_todos(tables.todos.values().filter(|t| filter.matches(t))))
    }

    async fn search_todos(&self, query: &SearchQuery) -> StoreResult<Vec<Todo>> {
        let tables = self.tables.read().await;
        Ok(sorted_todos(
            tables.todos.values().filter(|t| query.matches_todo(t)),
        ))
    }

    async fn list_open_todos(&self) -> StoreResult<Vec<Todo>> {
        let tables = self.tables.read().await;
        Ok(sorted_todos(tables.todos.values().filter(|t| !t.completed)))
    }

    async fn update_todo(&self, todo: &Todo) -> StoreResult<Todo> {
        let mut tables = self.tables.write().await;
        if !tables.patients.contains_key(&todo.patient_id) {
            return Err(StoreError::MissingReference {
                entity: "patient",
                id: todo.patient_id,
            });
        }
        let stored = tables.todos.get_mut(&todo.id).ok_or(StoreError::NotFound {
            entity: "todo",
            id: todo.id,
        })?;
        check_version("todo", stored.version, todo.version, todo.id)?;

        let mut next = todo.clone();
        next.created_at = stored.created_at;
        next.updated_at = Utc::now();
        next.version = stored.version + 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn mark_notification_sent(&self, id: Uuid) -> StoreResult<Todo> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .todos
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "todo", id })?;
        stored.notification_sent = true;
        stored.updated_at = Utc::now();
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn delete_todo(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.todos.remove(&id).is_none() {
            return Err(StoreError::NotFound { entity: "todo", id });
        }
        tables.notifications.retain(|_, n| n.todo_id != Some(id));
        Ok(())
    }

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> StoreResult<Notification> {
        let mut tables = self.tables.write().await;
        if let Some(todo_id) = notification.todo_id {
            if !tables.todos.contains_key(&todo_id) {
                return Err(StoreError::MissingReference {
                    entity: "todo",
                    id: todo_id,
                });
            }
        }
        let notification = notification.into_notification(Uuid::new_v4(), Utc::now());
        tables
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut list: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.read))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn mark_notification_read(&self, id: Uuid) -> StoreResult<Notification> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .notifications
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                entity: "notification",
                id,
            })?;
        stored.mark_read(Utc::now());
        Ok(stored.clone())
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut changed = 0;
        for notification in tables
            .notifications
            .values_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            notification.mark_read(now);
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_notification(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .notifications
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound {
                entity: "notification",
                id,
            })
    }
}
