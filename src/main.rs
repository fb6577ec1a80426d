use std::sync::Arc;

use tower_http::cors::CorsLayer;

use mentorhub::access::{AccessHub, access_routes};
use mentorhub::config::AppConfig;
use mentorhub::onboarding::{OnboardingManager, OnboardingRouteState, onboarding_routes};
use mentorhub::profile::{LibSqlStore, ProfileStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    // Initialize tracing — rolling file when a log dir is configured,
    // stderr otherwise. The guard must outlive the server.
    let _guard = init_tracing(&config);

    eprintln!("🧭 MentorHub v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Access WS:  ws://0.0.0.0:{}/ws", config.port);
    eprintln!("   Access API: http://0.0.0.0:{}/api/access/state", config.port);
    eprintln!("   Onboarding: http://0.0.0.0:{}/api/onboarding/status", config.port);

    // ── Profile store ────────────────────────────────────────────────────
    let db_path = std::path::Path::new(&config.db_path);
    let store: Arc<dyn ProfileStore> = Arc::new(
        LibSqlStore::new_local(db_path).await.unwrap_or_else(|e| {
            eprintln!("Error: Failed to open database at {}: {}", config.db_path, e);
            std::process::exit(1);
        }),
    );

    eprintln!("   Database: {}", config.db_path);

    // ── Access hub + onboarding ──────────────────────────────────────────
    let hub = AccessHub::new(Arc::clone(&store));
    let manager = Arc::new(OnboardingManager::new(Arc::clone(&store)));

    // The identity provider is external; until a sign-in arrives the
    // session settles signed-out so the resolver leaves `loading`.
    hub.settle_signed_out().await;

    let app = access_routes(Arc::clone(&hub), Arc::clone(&store))
        .merge(onboarding_routes(OnboardingRouteState {
            manager,
            hub: Arc::clone(&hub),
        }))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "MentorHub listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Set up the tracing subscriber; returns the appender guard when logging
/// to a file.
fn init_tracing(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mentorhub.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
            None
        }
    }
}
