use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
};
use serde::Deserialize;

use labtrack_core::ListParams;

use super::{AppState, ApiError, authorize_read, authorize_write, ok_json};
use crate::model::TestMethod;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/methods", post(create_method).get(list_methods))
        .route("/methods/{id}", get(get_method).delete(delete_method))
}

#[derive(Deserialize)]
struct CreateMethodBody {
    name: String,
}

async fn create_method(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateMethodBody>,
) -> Result<Json<TestMethod>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.create_method(&access, &body.name))
}

async fn get_method(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<TestMethod>, ApiError> {
    authorize_read(&state, &headers)?;
    ok_json(state.svc.get_method(&id))
}

async fn list_methods(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<labtrack_core::ListResult<TestMethod>>, ApiError> {
    authorize_read(&state, &headers)?;
    ok_json(state.svc.list_methods(&params))
}

async fn delete_method(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    state.svc.delete_method(&access, &id).map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}
