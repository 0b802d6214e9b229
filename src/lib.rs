pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod permissions;
pub mod storage;
pub mod store;

use std::path::Path;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use database::Database;
use storage::BlobStore;
use store::RequisitionStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub store: RequisitionStore,
    pub blobs: Arc<dyn BlobStore>,
}

pub fn create_router(state: AppState, photo_dir: &Path) -> Router {
    Router::new()
        // Read-only query-parameter surface
        .route("/api", get(handlers::requisitions::query_api))
        // Auth and user administration
        .route("/api/login", post(handlers::auth::login))
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/api/users/:username", post(handlers::users::update_user))
        .route("/api/users/:username/delete", post(handlers::users::delete_user))
        .route(
            "/api/users/:username/password",
            post(handlers::auth::change_password),
        )
        // Requisitions
        .route(
            "/api/requisitions",
            get(handlers::requisitions::list_requisitions)
                .post(handlers::requisitions::save_requisition),
        )
        .route(
            "/api/requisitions/:id/delete",
            post(handlers::requisitions::delete_requisition),
        )
        .route("/api/images/:file_id", get(handlers::requisitions::get_image))
        // Relocated photos, link-accessible
        .nest_service("/files", ServeDir::new(photo_dir))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                // Inline photo payloads are large
                .layer(DefaultBodyLimit::max(20 * 1024 * 1024)),
        )
        .with_state(state)
}
