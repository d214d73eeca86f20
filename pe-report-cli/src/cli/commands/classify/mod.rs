pub mod handler;

use std::path::PathBuf;

use clap::{Args, ValueEnum};

pub use handler::handle_classify_command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Args)]
pub struct ClassifyCommands {
    /// Input workbooks or directories containing them
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}
