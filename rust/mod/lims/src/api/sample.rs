use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post, put},
};

use labtrack_core::ListParams;

use super::{AppState, ApiError, authorize_read, authorize_write, ok_json};
use crate::model::{Sample, Test};
use crate::service::catalog::{CreateSampleInput, NestedTest};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/samples", post(create_sample).get(list_samples))
        .route(
            "/samples/{id}",
            get(get_sample).patch(update_sample).delete(delete_sample),
        )
        .route("/samples/{id}/tests", get(sample_tests).put(save_tests))
}

async fn create_sample(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateSampleInput>,
) -> Result<Json<Sample>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.create_sample(&access, body))
}

async fn get_sample(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Sample>, ApiError> {
    authorize_read(&state, &headers)?;
    ok_json(state.svc.get_sample(&id))
}

async fn list_samples(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<labtrack_core::ListResult<Sample>>, ApiError> {
    authorize_read(&state, &headers)?;
    ok_json(state.svc.list_samples(&params))
}

async fn update_sample(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Sample>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.update_sample(&access, &id, patch))
}

async fn delete_sample(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    state.svc.delete_sample(&access, &id).map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn sample_tests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<Test>>, ApiError> {
    authorize_read(&state, &headers)?;
    ok_json(state.svc.sample_tests(&id))
}

/// Apply nested test rows (create / delete / unchanged marks) in one save.
async fn save_tests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(rows): Json<Vec<NestedTest>>,
) -> Result<Json<Vec<Test>>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.save_sample_tests(&access, &id, &rows))
}
