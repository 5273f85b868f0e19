use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stockscope::application::{Cli, CommandExecutor};

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials usually live in a local .env file.
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    CommandExecutor::execute(cli).await
}
