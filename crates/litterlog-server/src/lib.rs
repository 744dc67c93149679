//! Server-rendered web app for logging neighborhood litter cleanups.

pub mod auth;
pub mod cleanups;
pub mod error;
pub mod forms;
pub mod prune;
pub mod session;
pub mod storage;
pub mod views;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use litterlog_db::Database;

use crate::storage::PhotoStore;

/// Uploads dominate request size; the text fields are tiny. 10 MB covers
/// phone photos without letting one request buffer forever.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub photos: Arc<PhotoStore>,
    pub session_secret: String,
}

/// Full application router. `public_dir` holds the stylesheet and the
/// client script; stored photos are served from the photo store's
/// directory under /uploads.
pub fn router(state: AppState, public_dir: PathBuf) -> Router {
    let public_routes = Router::new()
        .route("/", get(auth::root))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/cleanups", get(cleanups::list).post(cleanups::create))
        .route("/cleanups/new", get(cleanups::new_form))
        .layer(middleware::from_fn_with_state(state.clone(), session::require_session))
        .with_state(state.clone());

    let uploads_dir = state.photos.dir().to_path_buf();

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/static", ServeDir::new(public_dir))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}
