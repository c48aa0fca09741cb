pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;
use labtrack_core::{Authenticator, Module};

use service::LimsService;

/// LIMS module — laboratory sample-testing tracking.
pub struct LimsModule {
    service: Arc<LimsService>,
    auth: Arc<dyn Authenticator>,
}

impl LimsModule {
    pub fn new(service: LimsService, auth: Arc<dyn Authenticator>) -> Self {
        Self {
            service: Arc::new(service),
            auth,
        }
    }
}

impl Module for LimsModule {
    fn name(&self) -> &str {
        "lims"
    }

    fn routes(&self) -> Router {
        api::router(api::AppState {
            svc: self.service.clone(),
            auth: self.auth.clone(),
        })
    }
}
