//! KairosDB Influx Line Protocol Service Library
//!
//! Parses Influx line protocol, as sent by Telegraf and the Influx client
//! libraries, into KairosDB metrics and hands them to a [`writer::MetricWriter`].

pub mod config;
pub mod drop_filter;
pub mod field_value;
pub mod handlers;
pub mod ingestion;
pub mod line_parser;
pub mod metrics;
pub mod tokenizer;
pub mod writer;

pub use config::InfluxConfig;
pub use drop_filter::{DropFilter, DropFilters};
pub use ingestion::{IngestReport, IngestionService};
pub use line_parser::{InfluxParser, ParsedLine};
pub use writer::{ChannelWriter, DataPointEvent, MemoryWriter, MetricWriter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ingestion_service: std::sync::Arc<IngestionService>,
    pub config: std::sync::Arc<InfluxConfig>,
}

/// Create the main application router
pub fn create_router(state: AppState) -> axum::Router {
    use crate::handlers::*;
    use axum::extract::DefaultBodyLimit;
    use axum::routing::{get, post};
    use tower::ServiceBuilder;
    use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

    axum::Router::new()
        // Health and monitoring endpoints
        .route(&state.config.health.health_path, get(health_handler))
        .route(&state.config.metrics.metrics_path, get(metrics_handler))
        // Influx compatible endpoints
        .route("/api/influx/write", post(write_v1_handler))
        .route("/api/influx/api/v2/write", post(write_v2_handler))
        .route("/api/influx/query", post(query_handler))
        .route("/api/influx/api/v2/query", post(query_handler))
        .route("/api/v1/telegraf/write", post(telegraf_write_handler))
        // Version endpoint for compatibility
        .route("/api/v1/version", get(version_handler))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(
                    state.config.ingestion.max_request_size,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(
                            tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::TRACE),
                        )
                        .on_request(
                            tower_http::trace::DefaultOnRequest::new().level(tracing::Level::TRACE),
                        )
                        .on_response(
                            tower_http::trace::DefaultOnResponse::new()
                                .level(tracing::Level::TRACE),
                        ),
                )
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Version endpoint for KairosDB compatibility
async fn version_handler() -> impl axum::response::IntoResponse {
    use serde_json::json;

    axum::Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "service": "kairosdb-influx",
        "core_version": kairosdb_core::VERSION,
    }))
}
