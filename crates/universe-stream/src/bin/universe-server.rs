//! Universe stream server
//!
//! Initializes the simulation engine, streams it as MJPEG on `/video` and
//! accepts playback commands on `/ws`. Configured through `UNIVERSE_*`
//! environment variables; logging through `RUST_LOG`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use universe_stream::{node, StreamConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "universe_server=info,universe_stream=info,universe_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = StreamConfig::from_env()?;
    tracing::info!("Starting universe server with {:?}", config);

    let engine = config.build_engine()?;
    let node = match node::start(&config, engine).await {
        Ok(node) => node,
        Err(e) => {
            tracing::error!("Failed to start: {}", e);
            return Err(e.into());
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Interrupt received");
        }
        _ = node.cancelled() => {}
    }

    node.shutdown().await?;
    Ok(())
}
