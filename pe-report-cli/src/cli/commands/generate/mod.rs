pub mod handler;

use std::path::PathBuf;

use clap::Args;

use crate::reports::ReportKind;

pub use handler::handle_generate_command;

#[derive(Args)]
pub struct GenerateCommands {
    /// Report to generate
    #[arg(value_enum)]
    pub report: ReportKind,

    /// Input workbooks or directories containing them
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Template workbook (overrides config)
    #[arg(long, value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// Output directory (overrides config)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}
