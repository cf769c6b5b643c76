use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, trace, warn};
use tracing_subscriber::EnvFilter;

use kairosdb_influx::{
    create_router, metrics::InfluxMetrics, AppState, ChannelWriter, DataPointEvent, InfluxConfig,
    IngestionService,
};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Arc::new(InfluxConfig::load()?);
    info!("Loaded configuration: {:?}", config);

    let metrics = Arc::new(InfluxMetrics::new()?);
    let (writer, events) = ChannelWriter::unbounded();
    let drain = tokio::spawn(drain_events(events));

    let ingestion_service = Arc::new(
        IngestionService::new(config.clone(), Arc::new(writer), metrics)
            .context("Failed to initialize ingestion service")?,
    );
    info!("Initialized ingestion service");

    let state = AppState {
        ingestion_service,
        config: config.clone(),
    };
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    let addr = listener.local_addr()?;
    info!("KairosDB Influx Service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router, and with it the last channel sender, is gone by now
    match drain.await {
        Ok(count) => info!("Shut down after publishing {} data points", count),
        Err(e) => warn!("Event drain task failed: {}", e),
    }

    Ok(())
}

/// Consume published data points until every sender is dropped
async fn drain_events(events: flume::Receiver<DataPointEvent>) -> u64 {
    let mut count = 0;
    while let Ok(event) = events.recv_async().await {
        trace!(
            "{} {} {} {}",
            event.metric_name,
            event.tags,
            event.data_point.timestamp_millis(),
            event.data_point.value
        );
        count += 1;
    }
    count
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
