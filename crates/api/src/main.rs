use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigia_api::config::ServerConfig;
use vigia_api::{background, routes, state, ws};
use vigia_core::queue::IngestQueue;
use vigia_core::telemetry::Reading;
use vigia_db::cache::{ConfigCache, InMemoryCache, RedisCache};
use vigia_db::repositories::{ReadingRepo, SensorRepo};
use vigia_db::resolver::ConfigResolver;

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigia_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = vigia_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    vigia_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    vigia_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Config cache + resolver ---
    let cache: Arc<dyn ConfigCache> = match std::env::var("REDIS_URL") {
        Ok(url) => {
            let cache = RedisCache::connect(&url)
                .await
                .expect("Failed to connect to Redis");
            tracing::info!("Redis config cache connected");
            Arc::new(cache)
        }
        Err(_) => {
            tracing::warn!("REDIS_URL not set; using in-process config cache");
            Arc::new(InMemoryCache::new())
        }
    };
    let resolver = ConfigResolver::new(pool.clone(), cache);

    // --- Ingestion queue ---
    let queue: IngestQueue<Reading> = IngestQueue::with_capacity(config.ingest_queue_capacity);
    let persist_pool = pool.clone();
    queue.set_handler(move |reading: Reading| {
        let pool = persist_pool.clone();
        Box::pin(async move {
            ReadingRepo::insert(&pool, &reading).await?;
            SensorRepo::touch_last_seen(&pool, &reading.sensor_id, reading.timestamp).await?;
            Ok(())
        })
    });
    tracing::info!(
        capacity = config.ingest_queue_capacity,
        "Ingestion queue ready"
    );

    // --- CORS ---
    let cors = build_cors_layer(&config);

    // --- Broadcast bus + heartbeat ---
    let bus = Arc::new(ws::BroadcastBus::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&bus));

    // --- Hourly KPI rollup ---
    let rollup_cancel = tokio_util::sync::CancellationToken::new();
    let rollup_handle = tokio::spawn(background::kpi_rollup::run(
        pool.clone(),
        rollup_cancel.clone(),
    ));
    tracing::info!("KPI rollup job spawned");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        bus: Arc::clone(&bus),
        queue: queue.clone(),
        resolver,
    };

    // --- Request ID header name ---
    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = Router::new()
        .merge(routes::health::router())
        .merge(routes::router())
        // -- Middleware stack (applied bottom-up) --
        // Panic recovery: catch panics and return 500 JSON.
        .layer(CatchPanicLayer::new())
        // Request timeout.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        // Propagate request ID to response.
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        // Structured request/response tracing.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Set request ID on incoming requests.
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        // CORS.
        .layer(cors)
        // Shared state.
        .with_state(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop the rollup job.
    rollup_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), rollup_handle).await;
    tracing::info!("KPI rollup job stopped");

    // Let the ingestion queue drain what it already buffered.
    let drain_deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !queue.is_empty() && tokio::time::Instant::now() < drain_deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let stats = queue.stats();
    tracing::info!(
        processed = stats.processed,
        failed = stats.failed,
        rejected = stats.rejected,
        remaining = queue.len(),
        "Ingestion queue drained"
    );

    let ws_count = bus.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    bus.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Build the CORS middleware layer from server configuration.
///
/// Panics at startup if any configured origin is invalid, which is the
/// desired behaviour -- we want misconfiguration to fail fast.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
