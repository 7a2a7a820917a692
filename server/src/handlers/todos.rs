use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use care_core::{NewTodo, SearchQuery, Todo, TodoUpdate, UpcomingWindow};
use chrono::Utc;
use uuid::Uuid;

use super::location;
use crate::error::{ApiError, ApiResult};
use crate::models::{TodoListQuery, UpcomingQuery};
use crate::AppState;

pub async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<NewTodo>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let todo = state.store.create_todo(payload.prepare()?).await?;
    tracing::info!(id = %todo.id, patient = %todo.patient_id, due = %todo.due_date, "todo scheduled");

    Ok((StatusCode::CREATED, location("todos", todo.id), Json(todo)))
}

/// Filtered list ascending by due date. A non-empty `search` replaces the filters.
pub async fn list_todos(
    State(state): State<AppState>,
    query: Result<Query<TodoListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Todo>>> {
    let Query(query) = query?;

    let todos = match query.search.as_deref().and_then(SearchQuery::new) {
        Some(search) => state.store.search_todos(&search).await?,
        None => state.store.list_todos(&query.filter()).await?,
    };
    Ok(Json(todos))
}

pub async fn overdue_todos(State(state): State<AppState>) -> ApiResult<Json<Vec<Todo>>> {
    let open = state.store.list_open_todos().await?;
    Ok(Json(state.classifier.overdue(&open, Utc::now())))
}

pub async fn todays_todos(State(state): State<AppState>) -> ApiResult<Json<Vec<Todo>>> {
    let open = state.store.list_open_todos().await?;
    Ok(Json(state.classifier.due_today(&open, Utc::now())))
}

/// Todos due within `?hours=` (default 24) that have not been reminded yet.
pub async fn upcoming_todos(
    State(state): State<AppState>,
    query: Result<Query<UpcomingQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Todo>>> {
    let Query(query) = query?;
    let window = match query.hours {
        Some(hours) => UpcomingWindow::hours(hours)?,
        None => UpcomingWindow::default(),
    };

    let open = state.store.list_open_todos().await?;
    Ok(Json(state.classifier.upcoming(&open, Utc::now(), window)))
}

pub async fn get_todo(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Todo>> {
    let Path(id) = id?;
    let todo = state
        .store
        .get_todo(id)
        .await?
        .ok_or_else(|| ApiError::not_found("todo", id))?;
    Ok(Json(todo))
}

/// Merge update. Completing stamps `completedAt` once; re-saving a completed
/// todo keeps the first stamp.
pub async fn update_todo(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<TodoUpdate>, JsonRejection>,
) -> ApiResult<Json<Todo>> {
    let Path(id) = id?;
    let Json(update) = payload?;

    let existing = state
        .store
        .get_todo(id)
        .await?
        .ok_or_else(|| ApiError::not_found("todo", id))?;
    let merged = existing.apply(update, Utc::now())?;
    let saved = state.store.update_todo(&merged).await?;

    if saved.completed && !existing.completed {
        tracing::info!(%id, "todo completed");
    }
    Ok(Json(saved))
}

pub async fn mark_notification_sent(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Todo>> {
    let Path(id) = id?;
    let todo = state.store.mark_notification_sent(id).await?;
    tracing::debug!(%id, "reminder recorded");
    Ok(Json(todo))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    state.store.delete_todo(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
