//! Standalone HTTP server for the AMS converter.
//! Configuration comes from `AMS_*` environment variables or a `.env` file.

use ams_converter::config::ConverterConfig;
use ams_converter::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ConverterConfig::from_env()?;
    server::run(config).await?;
    Ok(())
}
