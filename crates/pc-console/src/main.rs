use std::error::Error;

use pc_common::config::ConsoleConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = ConsoleConfig::from_env()?;
    pc_console::serve(config).await?;

    tracing::info!("shut down");
    Ok(())
}
