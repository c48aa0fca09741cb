use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
};
use serde::Deserialize;

use labtrack_core::ListParams;

use super::{AppState, ApiError, authorize_read, authorize_write, ok_json};
use crate::model::Test;
use crate::service::catalog::{CreateTestInput, TestFilters};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tests", post(create_test).get(list_tests))
        .route("/tests/{id}", get(get_test).delete(delete_test))
        .route("/tests/eligible/{method_id}", get(eligible_tests))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestQuery {
    #[serde(flatten)]
    params: ListParams,
    test_method_id: Option<String>,
    batch_id: Option<String>,
}

async fn create_test(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateTestInput>,
) -> Result<Json<Test>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    ok_json(state.svc.create_test(&access, body))
}

async fn get_test(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Test>, ApiError> {
    authorize_read(&state, &headers)?;
    ok_json(state.svc.get_test(&id))
}

async fn list_tests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<TestQuery>,
) -> Result<Json<labtrack_core::ListResult<Test>>, ApiError> {
    authorize_read(&state, &headers)?;
    let filters = TestFilters {
        test_method_id: q.test_method_id,
        batch_id: q.batch_id,
    };
    ok_json(state.svc.list_tests(&q.params, &filters))
}

/// Unbatched-or-orphaned tests for a method — the pool a batch may draw from.
async fn eligible_tests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(method_id): Path<String>,
) -> Result<Json<Vec<Test>>, ApiError> {
    authorize_read(&state, &headers)?;
    ok_json(state.svc.eligible_tests(&method_id))
}

async fn delete_test(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let access = authorize_write(&state, &headers)?;
    state.svc.delete_test(&access, &id).map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}
