pub mod batch;
pub mod method;
pub mod pipet;
pub mod project;
pub mod sample;
pub mod test;

use std::sync::Arc;

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use labtrack_core::{Authenticator, Role, ServiceError, WriteAccess, require_write};

use crate::service::LimsService;

/// Shared application state: the service plus the injected authenticator.
#[derive(Clone)]
pub struct AppState {
    pub svc: Arc<LimsService>,
    pub auth: Arc<dyn Authenticator>,
}

/// Build the LIMS API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/lims/v1", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(method::routes())
        .merge(sample::routes())
        .merge(test::routes())
        .merge(batch::routes())
        .merge(pipet::routes())
        .merge(project::routes())
}

/// Standard API error response body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        }));
        (status, body).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let code = err.status_code().as_u16();
        ApiError {
            code,
            message: err.to_string(),
        }
    }
}

/// Establish the caller's role; any known role may read.
pub(crate) fn authorize_read(state: &AppState, headers: &HeaderMap) -> Result<Role, ApiError> {
    state.auth.authenticate(headers).map_err(ApiError::from)
}

/// Establish the caller's role and mint the write capability the service
/// requires for every mutation.
pub(crate) fn authorize_write(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<WriteAccess, ApiError> {
    let role = state.auth.authenticate(headers).map_err(ApiError::from)?;
    require_write(role).map_err(ApiError::from)
}

/// Wrap a Result<T, ServiceError> into an API response.
pub(crate) fn ok_json<T: Serialize>(result: Result<T, ServiceError>) -> Result<Json<T>, ApiError> {
    result.map(Json).map_err(ApiError::from)
}
