use anyhow::Context;

use wallet_tracker::{bootstrap, models::Config, utils::setup_logging};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
	// A .env file is optional; real environment variables win
	dotenvy::dotenv().ok();
	setup_logging().map_err(|e| anyhow::anyhow!("failed to set up logging: {}", e))?;

	let config = Config::from_env().context("failed to load required configuration")?;
	bootstrap::run(config).await
}
