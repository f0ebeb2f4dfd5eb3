use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use kidstory_api::config::ServerConfig;
use kidstory_api::router::build_app_router;
use kidstory_api::state::AppState;
use kidstory_jobs::ImageJobService;
use kidstory_openai::{OpenAiApi, OpenAiProvider};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "kidstory_api=debug,kidstory_jobs=debug,kidstory_openai=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    if config.openai_api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY is not set; chat and image calls will fail");
    }
    if config.webhook_secret.is_none() {
        tracing::info!("WEBHOOK_SECRET is not set; the job webhook will reject all calls");
    }

    // --- Upstream provider ---
    let http = reqwest::Client::new();
    let provider = Arc::new(
        OpenAiProvider::new(OpenAiApi::with_client(
            http.clone(),
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
        ))
        .with_image_size(config.image_size.clone()),
    );

    // --- Image jobs ---
    let images = ImageJobService::new(provider.clone(), &config.jobs);
    tracing::info!(
        cache_ttl_secs = config.jobs.cache_ttl.as_secs(),
        min_interval_ms = config.jobs.min_call_interval.as_millis() as u64,
        call_timeout_secs = config.jobs.call_timeout.as_secs(),
        retention_secs = config.jobs.retention.as_secs(),
        "Image job service created"
    );

    // Spawn the retention sweeper.
    let reaper_cancel = CancellationToken::new();
    let reaper_handle = tokio::spawn(kidstory_jobs::reaper::run(
        Arc::clone(images.tracker()),
        config.jobs.sweep_interval,
        reaper_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        images,
        chat: provider,
        http,
    };

    let app = build_app_router(state, &config);

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

    reaper_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), reaper_handle).await;
    tracing::info!("Job reaper stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
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
