mod cli;
mod config;
mod error;
mod excel;
mod reports;
mod services;
mod sources;

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use cli::commands::classify::handle_classify_command;
use cli::commands::combine::handle_combine_command;
use cli::commands::generate::handle_generate_command;
use cli::commands::run::handle_run_command;
use cli::{Cli, Commands};
use config::Config;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // RUST_LOG, when set, takes precedence over -v
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = Config::load(cli.config.as_deref())?;
    log::debug!("Using template {}", config.template.display());

    match cli.command {
        Commands::Classify(args) => handle_classify_command(args),
        Commands::Generate(args) => handle_generate_command(args, config),
        Commands::Combine(args) => handle_combine_command(args, config),
        Commands::Run(args) => handle_run_command(args, config),
    }
}
