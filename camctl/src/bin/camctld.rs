//! Camera control server daemon

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use camctl::sim::{SimulatedDio, SimulatedSdk};
use camctl::{DigitalOutput, Registry, Server, ServerConfig, TcpReplyServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!(
        "camctld {} starting (protocol {})",
        env!("CARGO_PKG_VERSION"),
        camctl::PROTOCOL_VERSION
    );

    let output: Option<Arc<dyn DigitalOutput>> = match SimulatedDio::open(config.adio_minor) {
        Ok(board) => {
            camctl::init_sync_port(&board);
            Some(Arc::new(board))
        }
        Err(code) => {
            warn!(
                "Digital I/O board {} unavailable ({}); frame sync disabled",
                config.adio_minor, code
            );
            None
        }
    };

    let sdk = SimulatedSdk::new(config.sim_cameras);
    let registry = Registry::build(&sdk, &config.hasher(), config.camera_id.as_deref(), output)
        .context("Camera setup failed")?;

    for (identity, descriptor) in registry.enumerated() {
        info!("{} -> {}", descriptor, identity);
    }

    let transport = TcpReplyServer::new(config.bind.clone(), config.port);
    let mut server = Server::new(transport, registry)
        .with_capture_limit(config.capture_limit())
        .with_poll_interval(config.poll_interval());

    server.run().await.context("Server failed")?;
    Ok(())
}
