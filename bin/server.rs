// Price Sync - Relay Server
// Receives order/plan change events and forwards them to the spreadsheet
// endpoint configured in SCRIPT_URL.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use price_sync::server::router;
use price_sync::{ChangeRelay, RelayClient, RelayConfig};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    info!("shutting down");
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    println!("🔁 Price Sync - Relay Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("   Set SCRIPT_URL to the spreadsheet endpoint before starting.");
            std::process::exit(1);
        }
    };

    let client = RelayClient::from_config(&config).context("building relay client")?;
    println!("✓ Relaying to: {}", client.endpoint());

    let app = router(ChangeRelay::new(client));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    let port = config.bind_addr.port();
    println!("\n🚀 Server running on http://localhost:{}", port);
    println!("   Health: http://localhost:{}/api/health", port);
    println!("   Events: POST http://localhost:{}/events/managers/{{managerId}}/...", port);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
