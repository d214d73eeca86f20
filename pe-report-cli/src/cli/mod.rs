//! Command-line interface

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::classify::ClassifyCommands;
use commands::combine::CombineCommands;
use commands::generate::GenerateCommands;
use commands::run::RunCommands;

#[derive(Parser)]
#[command(name = "pe-report")]
#[command(about = "Reconcile roster and inventory exports into the PE report workbook")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to <config dir>/pe-report/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show which role each input file fills
    Classify(ClassifyCommands),
    /// Generate a single report sheet
    Generate(GenerateCommands),
    /// Merge generated reports into the template
    Combine(CombineCommands),
    /// Classify, generate every possible report and combine them
    Run(RunCommands),
}
