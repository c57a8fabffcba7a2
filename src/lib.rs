pub mod config;
pub mod error;
pub mod handlers;
pub mod infrastructure;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::storage::StorageService;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::files::upload_file,
        handlers::files::request_link,
        handlers::files::serve_file,
    ),
    components(
        schemas(
            handlers::auth::AuthRequest,
            handlers::auth::RegisterResponse,
            handlers::auth::AuthResponse,
            handlers::files::UploadResponse,
            handlers::files::LinkRequest,
            handlers::files::LinkResponse,
        )
    ),
    tags(
        (name = "auth", description = "Client registration and authentication"),
        (name = "files", description = "Upload and one-time download links")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub storage: Arc<StorageService>,
    pub config: AppConfig,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/signup", post(handlers::auth::register))
        .route("/api/login", post(handlers::auth::login))
        .route(
            "/api/upload_file",
            post(handlers::files::upload_file).layer(from_fn_with_state(
                state.clone(),
                middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/request_file",
            post(handlers::files::request_link).layer(from_fn_with_state(
                state.clone(),
                middleware::auth::auth_middleware,
            )),
        )
        // No bearer auth: possession of the one-time token is the credential
        .route("/api/serve_file", get(handlers::files::serve_file))
        .with_state(state)
}
