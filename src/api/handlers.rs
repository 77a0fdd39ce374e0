//! Request handlers.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiError, SharedService};
use crate::domain::{PatientPayload, PatientView};
use crate::RecordsError;

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    phone: String,
}

/// Run a service call on the blocking pool.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, RecordsError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| {
            tracing::error!("Storage task failed: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

pub(super) async fn root() -> Json<Value> {
    Json(json!({ "message": "This is a patient records API" }))
}

pub(super) async fn list_patients(
    State(service): State<SharedService>,
) -> Result<Json<Vec<PatientView>>, ApiError> {
    let patients = run_blocking(move || service.list_patients()).await?;
    Ok(Json(patients))
}

pub(super) async fn search_patients(
    State(service): State<SharedService>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<PatientView>>, ApiError> {
    let Query(params) = params?;
    let patients = run_blocking(move || service.search_by_phone(&params.phone)).await?;
    Ok(Json(patients))
}

pub(super) async fn get_patient(
    State(service): State<SharedService>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<PatientView>, ApiError> {
    let Path(id) = id?;
    let patient = run_blocking(move || service.get_patient(id)).await?;
    Ok(Json(patient))
}

pub(super) async fn create_patient(
    State(service): State<SharedService>,
    payload: Result<Json<PatientPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<PatientView>), ApiError> {
    let Json(payload) = payload?;
    let patient = run_blocking(move || service.create_patient(payload)).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub(super) async fn update_patient(
    State(service): State<SharedService>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PatientPayload>, JsonRejection>,
) -> Result<Json<PatientView>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let patient = run_blocking(move || service.update_patient(id, payload)).await?;
    Ok(Json(patient))
}

pub(super) async fn delete_patient(
    State(service): State<SharedService>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    run_blocking(move || service.delete_patient(id)).await?;
    Ok(Json(json!({ "message": "Patient deleted" })))
}
