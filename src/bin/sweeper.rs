use safecircle_server::{events::EventBus, sweeper};
use sea_orm::Database;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    safecircle_server::telemetry::init_telemetry("safecircle-sweeper");

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    // Metrics sidecar so the sweeper is scrapeable like the server.
    tokio::spawn(async move {
        let app = axum::Router::new()
            .route(
                "/metrics",
                axum::routing::get(|| async move { metric_handle.render() }),
            )
            .layer(prometheus_layer);
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], 9091));
        tracing::info!("Metrics server listening on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        axum::serve(listener, app).await.unwrap();
    });

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let redis_client = redis::Client::open(redis_url).expect("Invalid Redis URL");
    let bus = EventBus::new(redis_client);

    let interval_secs = std::env::var("SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60u64);

    tracing::info!("Starting check-in expiry sweeper (every {}s)...", interval_secs);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            match sweeper::run_sweep(&db, &bus).await {
                Ok(outcome) if outcome.expired_count > 0 => {
                    tracing::info!(
                        expired = outcome.expired_count,
                        escalated = outcome.alerts_created,
                        "expiry sweep completed"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Expiry sweep failed: {}", e),
            }
        }
    });

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutting down sweeper process"),
        Err(err) => tracing::error!("Unable to listen for shutdown signal: {}", err),
    }
}
