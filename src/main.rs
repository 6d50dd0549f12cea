use std::sync::Arc;

use tracing::{error, info};

use ttlsub::broker::Registry;
use ttlsub::client::Client;
use ttlsub::config::load_config;
use ttlsub::transport::websocket::start_websocket_server;
use ttlsub::utils::logging;

#[tokio::main]
async fn main() {
    if let Err(e) = run_server().await {
        // Config may have failed before logging was set up.
        logging::init("info");
        error!("Server failed: {e}");
        std::process::exit(1);
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init(&config.logging.level);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let registry = Arc::new(Registry::new(&config.broker));
    let sweeper = registry.spawn_sweeper();
    let client = Client::new(registry, &config.broker);

    tokio::select! {
        result = start_websocket_server(&addr, client, config.server.clone()) => {
            result?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    sweeper.abort();
    Ok(())
}
