//! TrueGIS CLI - Deterministic Drawing State
//!
//! Command-line interface for TrueGIS drawing sessions.

use clap::Parser;
use env_logger::Env;
use log::info;

use truegis::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("TrueGIS v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => Ok(handle_command(cmd)?),
        None => {
            println!("TrueGIS v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> truegis::Result<()> {
    match cmd {
        Commands::Init { path } => commands::init(&path),
        Commands::Add { path, shape } => commands::add(&path, shape),
        Commands::Move { path, index, dx, dy } => commands::move_feature(&path, index, dx, dy),
        Commands::Restyle { path, index, style } => commands::restyle(&path, index, style),
        Commands::Undo { path } => commands::undo(&path),
        Commands::Redo { path } => commands::redo(&path),
        Commands::History { path } => commands::show_history(&path),
        Commands::Export { path, output } => commands::export(&path, output.as_deref()),
        Commands::Import { path, file } => commands::import(&path, &file),
        Commands::Clear { path } => commands::clear(&path),
        Commands::Status { path } => commands::status(&path),
    }
}
