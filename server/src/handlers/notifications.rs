use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use care_core::{NewNotification, Notification};
use uuid::Uuid;

use super::location;
use crate::error::ApiResult;
use crate::models::{MarkAllReadResponse, NotificationListQuery, UserQuery};
use crate::AppState;

/// Records a reminder dispatched by the caller.
pub async fn create_notification(
    State(state): State<AppState>,
    payload: Result<Json<NewNotification>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let notification = state
        .store
        .create_notification(payload.prepare()?)
        .await?;
    tracing::debug!(id = %notification.id, kind = %notification.kind, "notification stored");

    Ok((
        StatusCode::CREATED,
        location("notifications", notification.id),
        Json(notification),
    ))
}

pub async fn list_notifications(
    State(state): State<AppState>,
    query: Result<Query<NotificationListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Notification>>> {
    let Query(query) = query?;
    let notifications = state
        .store
        .list_notifications(query.user_id, query.unread_only)
        .await?;
    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Notification>> {
    let Path(id) = id?;
    Ok(Json(state.store.mark_notification_read(id).await?))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let Query(query) = query?;
    let updated = state.store.mark_all_notifications_read(query.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    state.store.delete_notification(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
