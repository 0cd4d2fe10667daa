use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};
use visioncraft_studio::config::StudioConfig;
use visioncraft_studio::gemini::GeminiClient;
use visioncraft_studio::routes::{router, AppState};
use visioncraft_studio::transport::DirectTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = StudioConfig::from_env();
    match (&config.api_key, config.dev_fallback) {
        (Some(key), _) => tracing::info!("🔑 Credential resolved ({} chars)", key.len()),
        (None, true) => tracing::warn!("📦 No credential; serving dev-fallback placeholders"),
        (None, false) => {
            tracing::warn!("⚠️ No credential; relay actions will report a missing credential")
        }
    }

    let transport = Arc::new(DirectTransport::new(GeminiClient::new(&config)));
    let app = router(AppState { transport });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting relay server");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
