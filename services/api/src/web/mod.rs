pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod pages;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit, http::Method, middleware as axum_middleware, routing::get, Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use handlers::{
    index_page, index_submit, map_page, profile_page, profile_submit, report_detail_page,
    report_detail_submit, report_form_page, report_submit, reports_page,
};
use rest::list_incidents_handler;
use state::AppState;

pub use middleware::identify_visitor;

/// Builds the application router: HTML pages, the JSON API and stored uploads.
pub fn router(app_state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(&app_state.config.upload_dir);
    let body_limit = app_state.config.max_upload_bytes;

    // The map data is public and read-only, so any origin may fetch it.
    let api_routes = Router::new()
        .route("/api/incidents", get(list_incidents_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        );

    Router::new()
        .route("/", get(index_page).post(index_submit))
        .route("/map", get(map_page))
        .route("/profile", get(profile_page).post(profile_submit))
        .route("/report", get(report_form_page).post(report_submit))
        .route(
            "/report/{report_id}",
            get(report_detail_page).post(report_detail_submit),
        )
        .route("/reports", get(reports_page))
        .merge(api_routes)
        .nest_service("/uploads", uploads)
        .layer(axum_middleware::from_fn(identify_visitor))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
