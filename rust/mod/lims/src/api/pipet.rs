use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
};

use labtrack_core::ListParams;

use super::{AppState, ApiError, authorize_read, authorize_write, ok_json};
use crate::model::Pipet;
use crate::service::pipet::CreatePipetInput;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pipets", post(create_pipet).get(list_pipets))
        .route(
            "/pipets/{id}",
            get(get_pipet).patch(update_pipet).delete(delete_pipet),
        )
}

async fn create_pipet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreatePipetInput>,
) -> Result<Json<Pipet>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.create_pipet(&access, body))
}

async fn get_pipet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Pipet>, ApiError> {
    authorize_read(&state, &headers)?;
    ok_json(state.svc.get_pipet(&id))
}

async fn list_pipets(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<labtrack_core::ListResult<Pipet>>, ApiError> {
    authorize_read(&state, &headers)?;
    ok_json(state.svc.list_pipets(&params))
}

async fn update_pipet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Pipet>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.update_pipet(&access, &id, patch))
}

async fn delete_pipet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    state.svc.delete_pipet(&access, &id).map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}
