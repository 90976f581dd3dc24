use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use config_engine::ConfigEngine;
use registry_server::{build_service, tls, RegistryState};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

/// Lift plugin registry server
#[derive(Parser, Debug)]
#[command(name = "registry-server")]
#[command(about = "Plugin registry serving gRPC, JSON and package files on one TLS port")]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long, env = "REGISTRY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    let config = ConfigEngine::load(args.config.as_deref()).context("invalid configuration")?;
    telemetry::init_tracing(&config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Lift registry");

    if let Some(address) = config.metrics.listen_address {
        telemetry::install_prometheus(address)?;
    }

    let tls_config = tls::server_config(&config.tls.certificate_pem()?, &config.tls.private_key_pem()?)?;
    let address = config.listen_address();

    // A registry that cannot verify tokens must not start
    let state = RegistryState::connect(config)
        .await
        .context("failed to initialize registry")?;
    let service = build_service(&state);

    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!(
        %address,
        domain = %state.config.primary_domain(),
        "Registry listening"
    );

    tls::serve(listener, TlsAcceptor::from(tls_config), service, shutdown_signal()).await;

    tracing::info!("Registry stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
