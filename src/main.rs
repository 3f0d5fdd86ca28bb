use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ip_visit_counter::api;
use ip_visit_counter::config::{Config, CounterBackend};
use ip_visit_counter::counter::{CounterStore, MemoryCounterStore, RedisCounterStore, VISIT_TTL};
use ip_visit_counter::enrichment::{GrpcIpInfoClient, HttpIpInfoClient};
use ip_visit_counter::publisher::{EventPublisher, EventSink, KafkaSink, SqsSink};
use ip_visit_counter::visit::VisitAggregator;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    let text = tokio::fs::read_to_string(&config.response_file)
        .await
        .with_context(|| format!("failed to read response file '{}'", config.response_file))?;

    // Initialize counter store
    let counter: Arc<dyn CounterStore> = match config.counter.backend {
        CounterBackend::Redis => {
            info!("Using Redis counter store: {}", config.counter.redis_address);
            Arc::new(RedisCounterStore::connect(&config.counter.redis_address, VISIT_TTL).await?)
        }
        CounterBackend::Memory => {
            info!("Using in-memory counter store (single replica only)");
            let store = Arc::new(MemoryCounterStore::new(VISIT_TTL));
            store.spawn_sweeper(VISIT_TTL);
            store as Arc<dyn CounterStore>
        }
    };

    // Initialize event sinks
    let kafka = Arc::new(KafkaSink::new(&config.kafka.address, &config.kafka.topic)?);
    let queue: Option<Arc<dyn EventSink>> = match &config.sqs {
        Some(sqs) => Some(Arc::new(SqsSink::connect(&sqs.queue_name).await?)),
        None => {
            info!("SQSQUEUENAME not set, queue sink disabled");
            None
        }
    };
    let publisher = EventPublisher::new(Arc::clone(&kafka) as Arc<dyn EventSink>, queue);

    // Initialize enrichment clients
    let rpc_info = Arc::new(GrpcIpInfoClient::connect_lazy(&config.ip_info.grpc_address)?);
    let http_info = Arc::new(HttpIpInfoClient::new(&config.ip_info.http_address)?);
    info!(
        grpc = %config.ip_info.grpc_address,
        http = %config.ip_info.http_address,
        "IP info clients ready"
    );

    let aggregator = Arc::new(VisitAggregator::new(
        counter, publisher, rpc_info, http_info, text,
    ));

    let router = api::create_router(
        aggregator,
        config.client_ip.clone(),
        config.request_timeout(),
    );

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("🚀 Visit counter listening on http://{}", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutting down, flushing Kafka producer...");
    let flushed = tokio::task::spawn_blocking(move || kafka.flush(Duration::from_secs(5))).await?;
    if let Err(e) = flushed {
        tracing::warn!("Kafka flush on shutdown failed: {:#}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
