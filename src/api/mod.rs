//! API layer: HTTP routes for patient records.
//!
//! Handlers hand the blocking storage work to `spawn_blocking`; the service
//! opens and drops one storage session per request inside that task.

mod error;
mod handlers;

pub use error::ApiError;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::adapters::sqlite::SqliteStorage;
use crate::application::PatientService;

/// Service shared by every handler.
pub type SharedService = PatientService<SqliteStorage>;

/// Build the application router.
pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route(
            "/patients/",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route("/patients/search", get(handlers::search_patients))
        .route("/patients/search/", get(handlers::search_patients))
        .route(
            "/patients/:id",
            get(handlers::get_patient)
                .put(handlers::update_patient)
                .delete(handlers::delete_patient),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
