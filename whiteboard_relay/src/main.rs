use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use whiteboard_relay::{RelayConfig, RelayServer};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whiteboard_relay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelayConfig::parse();

    // --- Server Launch ---
    let server = match RelayServer::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match server.local_addr() {
        Ok(addr) => info!("Whiteboard relay listening on {}", addr),
        Err(_) => info!("Whiteboard relay listening on {}", config.bind_addr()),
    }
    server.run().await;

    ExitCode::SUCCESS
}
