use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use fcm_relay_service::config;
use fcm_relay_service::handlers;
use fcm_relay_service::state;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    tracing::info!("Starting FCM Relay Service...");

    let settings = config::Settings::new()?;
    if !settings.is_configured() {
        tracing::warn!(
            "Neither FIREBASE_SERVER_KEY nor FIREBASE_SERVICE_ACCOUNT is set; requests will fail"
        );
    }

    let addr: SocketAddr = settings.server.listen_addr.parse()?;
    let app_state = Arc::new(state::AppState::new(settings));
    let app = handlers::router(app_state);

    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("FCM Relay Service stopped.");
    Ok(())
}
