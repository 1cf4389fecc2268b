use axum::{
    routing::{get, post},
    Extension, Router,
};
use safecircle_server::{api, events::EventBus, migrator};
use sea_orm::{Database, DatabaseConnection};
use std::net::SocketAddr;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    safecircle_server::telemetry::init_telemetry("safecircle-server");

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let redis_client = redis::Client::open(redis_url).expect("Invalid Redis URL");
    let bus = EventBus::new(redis_client);

    use sea_orm_migration::MigratorTrait;
    migrator::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    safecircle_server::metrics::init_metrics(&db).await;

    let app = app(db, bus, prometheus_layer, metric_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8000));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn health_check() -> &'static str {
    "OK"
}

fn app(
    db: DatabaseConnection,
    bus: EventBus,
    prometheus_layer: axum_prometheus::PrometheusMetricLayer<'static>,
    metric_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(api::auth::register))
        .route("/login", post(api::auth::login));

    let protected_routes = Router::new()
        // Incident lifecycle
        .route("/incidents", post(api::incidents::trigger_incident))
        .route("/incidents/active", get(api::incidents::list_active_incidents))
        .route("/incidents/:id", get(api::incidents::get_incident))
        .route("/incidents/:id/respond", post(api::incidents::respond_to_incident))
        .route("/incidents/:id/resolve", post(api::incidents::resolve_incident))
        .route("/incidents/:id/cancel", post(api::incidents::cancel_incident))
        .route(
            "/incidents/:id/helpers/:helper_id/rate",
            post(api::incidents::rate_helper),
        )
        // Check-in timers
        .route("/timers", post(api::timers::create_timer))
        .route("/timers/active", get(api::timers::get_active_timer))
        .route("/timers/:id/check-in", post(api::timers::check_in))
        // Trusted circle
        .route(
            "/circle",
            get(api::circle::list_circle).post(api::circle::add_trusted_contact),
        )
        .route("/circle/:id/accept", post(api::circle::accept_request))
        .route("/circle/:id/reject", post(api::circle::reject_request))
        .route("/circle/:id", axum::routing::delete(api::circle::remove_contact))
        // Location sharing + profile
        .route("/location", post(api::location::update_location))
        .route("/profile", get(api::gamification::get_profile))
        .route_layer(axum::middleware::from_fn(api::middleware::auth_middleware));

    // Scheduler / ops surface: elevated service credential, no user session.
    let internal_routes = Router::new()
        .route("/internal/check-expired", post(api::timers::check_expired))
        .route("/internal/award-points", post(api::gamification::award_points))
        .route_layer(axum::middleware::from_fn(
            api::middleware::service_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(protected_routes)
        .merge(internal_routes)
        .layer(Extension(db))
        .layer(Extension(bus))
        .layer(tower_cookies::CookieManagerLayer::new())
        .layer(prometheus_layer)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };

                    let user_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .or_else(|| {
                            request
                                .headers()
                                .get("x-real-ip")
                                .and_then(|v| v.to_str().ok())
                        })
                        .unwrap_or("unknown");

                    // Fields the handlers fill in as the request progresses.
                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        user_ip = user_ip,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        action = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        incident_id = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(
                    |_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {
                        // Suppress the default per-request log line.
                    },
                )
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));
                        tracing::info!("request completed");
                    },
                ),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(
                    std::env::var("APP_ORIGIN")
                        .unwrap_or_else(|_| "http://localhost:5173".to_string())
                        .parse::<axum::http::HeaderValue>()
                        .expect("APP_ORIGIN must be a valid origin"),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PATCH,
                    axum::http::Method::DELETE,
                ])
                .allow_headers([axum::http::header::CONTENT_TYPE])
                .allow_credentials(true),
        )
        .route("/metrics", get(|| async move { metric_handle.render() }))
}
