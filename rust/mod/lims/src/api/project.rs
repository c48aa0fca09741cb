use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
};
use serde::Deserialize;

use labtrack_core::ListParams;

use super::{AppState, ApiError, authorize_read, authorize_write, ok_json};
use crate::model::Project;
use crate::service::project::{CreateProjectInput, ProjectFilters};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", post(create_project).get(list_projects))
        .route(
            "/projects/{id}",
            get(get_project).patch(update_project).delete(delete_project),
        )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectQuery {
    #[serde(flatten)]
    params: ListParams,
    user_id: Option<String>,
    received: Option<bool>,
    completed: Option<bool>,
    reported: Option<bool>,
    invoiced: Option<bool>,
    paid: Option<bool>,
}

async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateProjectInput>,
) -> Result<Json<Project>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.create_project(&access, body))
}

async fn get_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    authorize_read(&state, &headers)?;
    ok_json(state.svc.get_project(&id))
}

async fn list_projects(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<ProjectQuery>,
) -> Result<Json<labtrack_core::ListResult<Project>>, ApiError> {
    authorize_read(&state, &headers)?;
    let filters = ProjectFilters {
        user_id: q.user_id,
        received: q.received,
        completed: q.completed,
        reported: q.reported,
        invoiced: q.invoiced,
        paid: q.paid,
    };
    ok_json(state.svc.list_projects(&q.params, &filters))
}

async fn update_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Project>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.update_project(&access, &id, patch))
}

async fn delete_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    state.svc.delete_project(&access, &id).map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}
