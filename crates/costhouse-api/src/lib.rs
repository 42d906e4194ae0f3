//! Costhouse REST API
//!
//! HTTP surface for the cost-metrics aggregation service: report archive
//! ingestion, daily roll-up queries with JSON/CSV content negotiation, health
//! probes, and OpenAPI docs. Routing, state, and server wiring live here; the
//! server binary only loads configuration and assembles the pieces.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use costhouse_ingest::LabelPolicy;
use costhouse_store::MetricsStore;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod error;
pub mod handlers;
pub mod maintenance;
pub mod models;

pub use config::Config;
pub use maintenance::{MaintenanceConfig, PartitionMaintenance};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MetricsStore>,
    pub policy: Arc<LabelPolicy>,
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/ingress/v1/upload", post(handlers::ingress::upload))
        .route("/metrics/v1/nodes", get(handlers::metrics::query_node_metrics))
        .route("/metrics/v1/pods", get(handlers::metrics::query_pod_metrics));

    let swagger = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi());

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(handlers::health::health_check))
        .route("/live", get(handlers::health::liveness_check))
        .route("/ready", get(handlers::health::readiness_check))
        .merge(swagger)
        .layer(DefaultBodyLimit::max(handlers::ingress::MAX_UPLOAD_SIZE))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(router: Router, address: &str) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!("🚀 costhouse API listening on {}", address);
    tracing::info!("   Swagger UI: http://{}/swagger-ui", address);
    tracing::info!("   Health: http://{}/health", address);

    axum::serve(listener, router).await?;
    Ok(())
}

/// OpenAPI specification
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::ingress::upload,
        handlers::metrics::query_node_metrics,
        handlers::metrics::query_pod_metrics,
        handlers::health::health_check,
        handlers::health::liveness_check,
        handlers::health::readiness_check,
    ),
    components(schemas(
        models::UploadResponse,
        models::HealthResponse,
        models::ErrorResponse,
        models::QueryMetadata,
        models::NodeMetricsRow,
        models::NodeMetricsResponse,
        models::PodMetricsRow,
        models::PodMetricsResponse,
    )),
    tags(
        (name = "ingress", description = "Usage report ingestion"),
        (name = "metrics", description = "Daily cost metrics queries"),
        (name = "health", description = "Health checks"),
    ),
    info(
        title = "Costhouse API",
        version = "0.1.0",
        description = "Cost-metrics aggregation for container clusters"
    )
)]
struct ApiDoc;
