use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use handlebars::TemplateError;
use std::sync::Arc;

use crate::config::Config;
use crate::db::RakStorage;
use crate::handlers::certificates::{get_certificate, list_certificates};
use crate::handlers::mint::mint_handler;
use crate::handlers::pages::{home, new_certificate, view};
use crate::render::Pages;
use crate::service::mint::MintService;
use crate::storage::ObjectStore;

/// Headroom on top of the file limit for multipart boundaries and the title field.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct RakState {
    pub storage: RakStorage,
    pub mint: MintService,
    pub pages: Arc<Pages>,
    pub settings: Arc<Config>,
}

impl RakState {
    pub fn new(
        storage: RakStorage,
        objects: Arc<dyn ObjectStore>,
        settings: Config,
    ) -> Result<Self, TemplateError> {
        let mint = MintService::new(
            objects,
            Arc::new(storage.clone()),
            settings.object_key_prefix.clone(),
            settings.cid_poll_attempts,
        );
        Ok(Self {
            storage,
            mint,
            pages: Arc::new(Pages::new()?),
            settings: Arc::new(settings),
        })
    }
}

pub fn rak_router(state: RakState) -> Router {
    let mint_body_limit = state
        .settings
        .upload_limit_bytes()
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(home))
        .route("/new", get(new_certificate))
        .route("/view", get(view))
        .route(
            "/api/mint",
            post(mint_handler).layer(DefaultBodyLimit::max(mint_body_limit)),
        )
        .route("/api/certificates", get(list_certificates))
        .route("/api/certificates/{cid}", get(get_certificate))
        .with_state(state)
}
