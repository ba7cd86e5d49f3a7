//! Chain Deployer - compile, deploy and exercise a Solidity contract
//!
//! Compiles `SimpleStorage`, deploys it to the configured network, reads the
//! stored number, updates it with `store` and reads it back.

use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use chain_deployer::config::Settings;
use chain_deployer::{ChainProvider, DeploymentFlow, SigningCredential};

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets may come from a local .env file
    dotenv::dotenv().ok();

    init_logging();

    info!("Starting Chain Deployer v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load()?;
    let network = settings.network()?.clone();
    info!(
        "Target network {} (chain {}) at {}",
        settings.active_network, network.chain_id, network.endpoint_url
    );

    let credential = SigningCredential::from_env(&settings.wallet.private_key_env);
    if !credential.is_present() {
        warn!(
            "{} is not set; signing will fail",
            settings.wallet.private_key_env
        );
    }

    let provider = Arc::new(ChainProvider::new(network)?);
    let mut flow = DeploymentFlow::new(&settings, provider, credential)?;

    let outcome = tokio::select! {
        outcome = flow.run() => outcome,
        _ = shutdown_signal() => {
            warn!("Interrupted; transactions already broadcast may still be mined");
            return Ok(());
        }
    };

    match outcome {
        Ok(report) => {
            info!(
                "Deployed at {:?} (tx {:?}); value {} -> {} (tx {:?})",
                report.contract_address,
                report.deploy_receipt.transaction_hash,
                report.initial_value,
                report.stored_value,
                report.store_receipt.transaction_hash
            );
            Ok(())
        }
        Err(e) => {
            error!(stage = e.stage(), retryable = e.is_retryable(), "Deployment failed: {}", e);
            Err(anyhow::anyhow!("{} stage failed: {}", e.stage(), e))
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chain_deployer=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
