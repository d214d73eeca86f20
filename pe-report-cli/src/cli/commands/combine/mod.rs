pub mod handler;

use std::path::PathBuf;

use clap::Args;

pub use handler::handle_combine_command;

#[derive(Args)]
pub struct CombineCommands {
    /// Generated ASISTENCIA workbook
    #[arg(long, value_name = "PATH")]
    pub attendance: PathBuf,

    /// Generated OP1 workbook
    #[arg(long, value_name = "PATH")]
    pub op1: PathBuf,

    /// Generated OP2 workbook
    #[arg(long, value_name = "PATH")]
    pub op2: PathBuf,

    /// Template workbook (overrides config)
    #[arg(long, value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// Combined output file (defaults to <output dir>/<prefix>_Final.xlsx)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}
