use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use star_theater::config::ServerConfig;
use star_theater::metrics::Metrics;
use star_theater::net::command::ACTIONS;
use star_theater::net::{api, session};
use star_theater::sim::Simulation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Star Theater Server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;

    let seed = config.seed.unwrap_or_else(rand::random);
    info!(
        "Configuration loaded: {}:{}, display {}x{}, seed {}",
        config.bind_address, config.port, config.display_width, config.display_height, seed
    );

    let metrics = Arc::new(Metrics::new());

    #[cfg(feature = "metrics")]
    {
        if config.metrics_port > 0 {
            let metrics_clone = metrics.clone();
            let (bind, port) = (config.bind_address, config.metrics_port);
            tokio::spawn(async move {
                if let Err(e) =
                    star_theater::metrics::start_metrics_server(metrics_clone, bind, port).await
                {
                    error!("Metrics server error: {}", e);
                }
            });
        }
    }

    let star = session::StarSession::new(Simulation::new(config.display(), seed), metrics);
    let sim_loop = session::start_sim_loop(star.clone());

    let addr = SocketAddr::new(config.bind_address, config.port);
    let listener = TcpListener::bind(addr).await?;

    info!("Server ready on http://{}", addr);
    info!("  GET  /health");
    info!("  GET  /api/status");
    info!("  POST /api/manipulate_star  actions: {}", ACTIONS.join(", "));
    info!("  POST /api/reset");

    // Shutdown signal handler
    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received");
    };

    tokio::select! {
        result = api::serve(listener, star) => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown => {
            info!("Shutting down...");
        }
    }

    sim_loop.abort();
    info!("Server stopped");

    Ok(())
}
