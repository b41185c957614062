mod config;
mod operators;
mod scenarios;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::DemoConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tributary=info".parse()?))
        .init();

    let mut config = DemoConfig::from_env()?;

    // Optional scenario name overrides TRIBUTARY_SCENARIO (e.g. `tributary form`)
    if let Some(arg) = std::env::args().nth(1) {
        config.scenario = arg.parse()?;
    }

    info!(scenario = %config.scenario, "Tributary demo starting...");
    scenarios::run(config.scenario, &config).await?;
    info!("Tributary demo finished");

    Ok(())
}
