use std::fs;

use anyhow::{Context, Result};
use colored::*;

use super::CombineCommands;
use crate::cli::commands::{read_template, write_output};
use crate::config::Config;
use crate::reports::combine_reports;

pub fn handle_combine_command(args: CombineCommands, config: Config) -> Result<()> {
    let template_path = args.template.unwrap_or_else(|| config.template.clone());
    let template = read_template(&template_path)?;

    let mut reports = Vec::with_capacity(3);
    for path in [&args.attendance, &args.op1, &args.op2] {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read report: {}", path.display()))?;
        reports.push(bytes);
    }
    let refs: Vec<&[u8]> = reports.iter().map(|r| r.as_slice()).collect();

    let combined = combine_reports(&template, &refs)?;
    let output = args.output.unwrap_or_else(|| config.combined_path());
    write_output(&output, &combined)?;

    println!("{} Combined report generated", "✓".green());
    Ok(())
}
