// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rentbot - a chat-driven booking service for rentable items.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod migrate;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use rentbot_config::{ConfigError, RentbotConfig};

/// Rentbot - a chat-driven booking service for rentable items.
#[derive(Parser, Debug)]
#[command(name = "rentbot", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the standard lookup.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot until interrupted.
    Serve,
    /// Open the database and apply pending migrations.
    Migrate,
    /// Load and validate the configuration, then exit.
    CheckConfig,
}

fn load_config(path: Option<&std::path::Path>) -> Result<RentbotConfig, Vec<ConfigError>> {
    match path {
        Some(path) => rentbot_config::load_and_validate_path(path),
        None => rentbot_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("rentbot: use --help for available commands");
        return;
    };

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            rentbot_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Migrate => migrate::run_migrate(&config).await,
        Commands::CheckConfig => {
            println!(
                "rentbot: configuration is valid (managers={}, database={}, sync={})",
                config.managers.len(),
                config.storage.database_path,
                if config.sync.enabled { "on" } else { "off" }
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
