//! Binary entry point for the clinic gateway.

use anyhow::Context;
use clinic_gateway::{Gateway, GatewayConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env().context("loading gateway configuration")?;
    let gateway = Gateway::new(config).context("constructing gateway")?;
    gateway.serve().await.context("serving")?;
    Ok(())
}
