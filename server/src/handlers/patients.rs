use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use care_core::{
    patient::visit_statistics, NewPatient, PatientUpdate, SearchQuery, TodoFilter, VisitStatistic,
};
use uuid::Uuid;

use super::location;
use crate::error::{ApiError, ApiResult};
use crate::models::{PatientListQuery, PatientView};
use crate::AppState;

pub async fn create_patient(
    State(state): State<AppState>,
    payload: Result<Json<NewPatient>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let patient = state.store.create_patient(payload.prepare()?).await?;
    tracing::info!(id = %patient.id, "patient admitted");

    let headers = location("patients", patient.id);
    let view = PatientView::new(patient, state.today());
    Ok((StatusCode::CREATED, headers, Json(view)))
}

/// All patients ordered by name, or those matching `?search=`.
pub async fn list_patients(
    State(state): State<AppState>,
    query: Result<Query<PatientListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<PatientView>>> {
    let Query(query) = query?;

    let patients = match query.search.as_deref().and_then(SearchQuery::new) {
        Some(search) => state.store.search_patients(&search).await?,
        None => state.store.list_patients().await?,
    };

    let today = state.today();
    Ok(Json(
        patients
            .into_iter()
            .map(|p| PatientView::new(p, today))
            .collect(),
    ))
}

pub async fn patient_statistics(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<VisitStatistic>>> {
    let patients = state.store.list_patients().await?;
    let counts = state.store.count_todos_by_patient().await?;

    let statistics = visit_statistics(
        patients
            .iter()
            .map(|p| (p, counts.get(&p.id).copied().unwrap_or(0))),
    );
    Ok(Json(statistics))
}

/// Patient detail including age and all of its todos.
pub async fn get_patient(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<PatientView>> {
    let Path(id) = id?;
    let patient = state
        .store
        .get_patient(id)
        .await?
        .ok_or_else(|| ApiError::not_found("patient", id))?;
    let todos = state.store.list_todos(&TodoFilter::for_patient(id)).await?;

    Ok(Json(PatientView::new(patient, state.today()).with_todos(todos)))
}

pub async fn update_patient(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PatientUpdate>, JsonRejection>,
) -> ApiResult<Json<PatientView>> {
    let Path(id) = id?;
    let Json(update) = payload?;

    let existing = state
        .store
        .get_patient(id)
        .await?
        .ok_or_else(|| ApiError::not_found("patient", id))?;
    let merged = existing.apply(update)?;
    let saved = state.store.update_patient(&merged).await?;
    tracing::info!(%id, version = saved.version, "patient updated");

    Ok(Json(PatientView::new(saved, state.today())))
}

pub async fn delete_patient(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    state.store.delete_patient(id).await?;
    tracing::info!(%id, "patient removed");
    Ok(StatusCode::NO_CONTENT)
}
