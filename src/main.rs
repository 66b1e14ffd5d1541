mod cache;
mod circuit_breaker;
mod coerce;
mod config;
mod engine;
mod errors;
mod handlers;
mod invoice;
mod report;
mod tax;
mod vision;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::vision::VisionService;

/// Wires the service together and runs it:
/// tracing, configuration, the report directory, the extraction cache,
/// the vision client, then the axum router with its middleware stack
/// (body caps, per-IP rate limiting, CORS, request tracing).
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "billsheet_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Make sure the report directory exists before the first upload
    tokio::fs::create_dir_all(&config.report_dir).await?;
    tracing::info!("Report directory ready: {}", config.report_dir);

    // Extraction cache: identical image+instruction pairs skip the paid
    // model call within the TTL
    let extraction_cache = Cache::builder()
        .time_to_live(Duration::from_secs(config.cache_ttl_secs))
        .max_capacity(config.cache_max_entries)
        .build();
    tracing::info!(
        "Extraction cache initialized ({}s TTL, {} entries max)",
        config.cache_ttl_secs,
        config.cache_max_entries
    );

    // Vision-model client (owns the upstream circuit breaker)
    let vision = VisionService::new(&config);
    tracing::info!("✓ Vision client initialized: {}", config.vision_base_url);

    let app_state = Arc::new(handlers::AppState {
        config: config.clone(),
        vision,
        extraction_cache,
    });

    // 10 requests/second per IP with a burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Bill routes sit behind the body cap and the rate limiter
    let protected_routes = Router::new()
        .route("/api/v1/bills/process", post(handlers::process_bill))
        .route("/api/v1/bills/reconcile", post(handlers::reconcile_invoice))
        .route(
            "/api/v1/bills/download/:filename",
            get(handlers::download_report),
        )
        .layer(
            ServiceBuilder::new()
                // Both caps sized for the photo upload
                .layer(DefaultBodyLimit::max(config.max_upload_bytes))
                .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health stays outside the rate limiter so probes never get throttled
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Bind and serve
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
