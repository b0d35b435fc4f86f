use std::sync::Arc;

use tower_http::cors::CorsLayer;

use campus_onboard::config::OnboardConfig;
use campus_onboard::onboarding::routes::{onboarding_routes, OnboardingRouteState};
use campus_onboard::onboarding::WorkflowController;
use campus_onboard::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = OnboardConfig::from_env()?;

    eprintln!("🏫 Campus Onboard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api/onboarding", config.port);
    eprintln!("   Database: {}", config.db_path);

    let db_path = std::path::Path::new(&config.db_path);
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(db_path).await?);

    let controller = Arc::new(WorkflowController::new(db));
    let app = onboarding_routes(OnboardingRouteState { controller })
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "Onboarding server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
