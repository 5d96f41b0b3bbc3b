use anyhow::Context;
use clap::Parser;
use reviewer_service::config::{Config, DEFAULT_CONFIG_FILE};
use reviewer_service::services::server::cancel_on_ctrl_c;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the listen address from the config file
    #[arg(long)]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    reviewer_service::run(config, shutdown)
        .await
        .context("reviewer service failed")?;
    Ok(())
}
