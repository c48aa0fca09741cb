use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post, put},
};
use serde::Deserialize;

use labtrack_core::ListParams;

use super::{AppState, ApiError, authorize_read, authorize_write, ok_json};
use crate::model::{Batch, Test};
use crate::service::assignment::BatchEditView;
use crate::service::batch::{BatchFilters, CreateBatchInput, MethodOption};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/batches", post(create_batch).get(list_batches))
        .route("/batches/available-methods", get(available_methods))
        .route("/batches/{id}", get(get_batch).patch(update_batch).delete(delete_batch))
        .route("/batches/{id}/edit", post(open_for_edit))
        .route("/batches/{id}/label", get(pipet_label))
        .route("/batches/{id}/pipets", put(set_pipets))
        .route(
            "/batches/{id}/tests/{test_id}",
            post(attach_test).delete(detach_test),
        )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBatchBody {
    test_method_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchQuery {
    #[serde(flatten)]
    params: ListParams,
    test_method_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetPipetsBody {
    pipet_ids: Vec<String>,
}

async fn create_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateBatchBody>,
) -> Result<Json<Batch>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.create_batch(&access, CreateBatchInput {
        test_method_id: body.test_method_id,
    }))
}

async fn get_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Batch>, ApiError> {
    authorize_read(&state, &headers)?;
    ok_json(state.svc.get_batch(&id))
}

async fn list_batches(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<BatchQuery>,
) -> Result<Json<labtrack_core::ListResult<Batch>>, ApiError> {
    authorize_read(&state, &headers)?;
    let filters = BatchFilters {
        test_method_id: q.test_method_id,
    };
    ok_json(state.svc.list_batches(&q.params, &filters))
}

async fn update_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Batch>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.update_batch(&access, &id, patch))
}

async fn delete_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    state.svc.delete_batch(&access, &id).map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn available_methods(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<MethodOption>>, ApiError> {
    authorize_read(&state, &headers)?;
    ok_json(state.svc.available_methods())
}

async fn open_for_edit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BatchEditView>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.open_for_edit(&access, &id))
}

async fn pipet_label(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize_read(&state, &headers)?;
    let label = state.svc.batch_pipet_label(&id).map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({"label": label})))
}

async fn set_pipets(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<SetPipetsBody>,
) -> Result<Json<Vec<String>>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.set_batch_pipets(&access, &id, &body.pipet_ids))
}

async fn attach_test(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, test_id)): Path<(String, String)>,
) -> Result<Json<Test>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.attach_test(&access, &id, &test_id))
}

async fn detach_test(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, test_id)): Path<(String, String)>,
) -> Result<Json<Test>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.detach_test(&access, &id, &test_id))
}
