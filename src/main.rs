//! Link Checker CLI.

use anyhow::Result;
use clap::Parser;
use link_checker::{server, Config, LinkChecker};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "link-checker")]
#[command(about = "Link checker - classify URLs with a third-party URL reputation scanner")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "link-checker.yaml")]
    config: PathBuf,

    /// Listen address, overrides settings.listen_address (e.g., "127.0.0.1:8000")
    #[arg(long, value_name = "ADDR")]
    listen: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: String,

    /// Print example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --print-config
    if args.print_config {
        println!("{}", Config::example());
        return Ok(());
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    info!(config = %args.config.display(), "Loading configuration");
    let config = Config::load(&args.config)?;

    // Handle --validate
    if args.validate {
        info!("Configuration is valid");
        return Ok(());
    }

    // CLI address wins over the config file
    let addr = match args.listen {
        Some(addr) => addr,
        None => config.listen_addr()?,
    };

    // Create checker and serve
    let checker = LinkChecker::new(config)?;
    server::serve(checker, addr).await?;

    Ok(())
}
