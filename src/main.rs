use std::path::PathBuf;

use clap::Parser;
use stakeout::app::App;
use stakeout::config::Config;
use tokio::signal;
use tracing::{error, info};

/// Risk-gated binary options trading bot.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Force paper mode regardless of configuration.
    #[arg(long)]
    paper: bool,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };
    if cli.paper {
        config.trading.paper = true;
    }

    config.logging.init();
    info!("stakeout starting");

    tokio::select! {
        result = App::run(config) => {
            if let Err(e) = result {
                error!(error = %e, "Fatal error");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("stakeout stopped");
}
