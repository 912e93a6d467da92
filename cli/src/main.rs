mod cli;
mod commands;
mod config;
mod log;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use commands::{info, mine, notify, Connection};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenv::dotenv();

    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if let Ok(path) = dotenv {
        ::log::debug!("Loaded environment from {}", path.display());
    }

    log::print_title("⛏ ETHC MINER");

    match cli.command {
        // Operator Commands

        Commands::Notify(_) => {
            notify::handle_notify_commands(cli).await?;
        }

        // Mining Commands

        Commands::Mine { .. } |
        Commands::Run { .. } => {
            let conn = Connection::open(&cli)?;
            mine::handle_mine_commands(cli, conn).await?;
        }

        // Read Commands

        _ => {
            let conn = Connection::open(&cli)?;
            info::handle_info_commands(cli, conn).await?;
        }
    }

    Ok(())
}
