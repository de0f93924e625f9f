use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::scan::{ScanHandle, StatusBoard};

use super::api::scan as scan_handlers;
use super::api_doc::ApiDoc;
use super::auth::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Control
        .route("/api/scan/full", post(scan_handlers::full))
        .route("/api/scan/horizontal", post(scan_handlers::horizontal))
        .route("/api/scan/section", post(scan_handlers::section))
        .route("/api/scan/single", post(scan_handlers::single))
        .route("/api/scan/stop", post(scan_handlers::stop))
        .route("/api/scan/forward", post(scan_handlers::forward))
        .route("/api/scan/refine", post(scan_handlers::refine))
        .route("/api/scan/clear", post(scan_handlers::clear))
        .route("/api/scan/threshold", post(scan_handlers::threshold))
        .route("/api/scan/calibrate", post(scan_handlers::calibrate))
        // Observation
        .route("/api/scan/status", get(scan_handlers::status))
        .route("/api/scan/report", get(scan_handlers::report))
        .route("/api/scan/tracks", get(scan_handlers::tracks))
        .route("/api/scan/channels", get(scan_handlers::channels))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(
    config: Config,
    engine: ScanHandle,
    status: StatusBoard,
) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    if config.api_keys.is_empty() {
        log::warn!("No API keys configured, every request will be rejected");
    }

    let state = AppState {
        config: Arc::new(config),
        engine,
        status,
    };
    let app = router(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}
