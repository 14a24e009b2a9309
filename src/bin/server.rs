use fi_mcp_gateway::{api::{start_server, ApiState}, config::GatewayConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env()?;

    info!("🚀 Fi MCP Gateway");
    info!("📍 Port: {}", config.port);
    if let Some(base) = &config.public_base_url {
        info!("🔗 Login base URL: {}", base);
    }

    let state = ApiState::in_memory(config);
    match state.dataset.allowed_identities().await {
        Ok(identities) => info!("✅ {} test identities available", identities.len()),
        Err(e) => tracing::warn!("⚠️  {}", e),
    }

    info!("📡 Starting API server...");
    start_server(state).await?;

    Ok(())
}
