use anyhow::Result;
use colored::*;

use super::GenerateCommands;
use crate::cli::commands::{collect_inputs, read_template, write_output};
use crate::config::Config;
use crate::reports;
use crate::services::classify::classify;

pub fn handle_generate_command(args: GenerateCommands, mut config: Config) -> Result<()> {
    if let Some(template) = args.template {
        config.template = template;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    let kind = args.report;
    let files = classify(collect_inputs(&args.inputs)?);

    let missing = files.missing(kind);
    if !missing.is_empty() {
        let missing: Vec<&str> = missing.iter().map(|r| r.key()).collect();
        anyhow::bail!(
            "Cannot generate {}: no input file for {}",
            kind,
            missing.join(", ")
        );
    }

    let template = read_template(&config.template)?;
    println!("Generating {}...", kind.to_string().cyan());
    let bytes = reports::generate(kind, &template, &files)?;

    write_output(&config.output_path(kind), &bytes)?;
    println!("{} {} generated", "✓".green(), kind);
    Ok(())
}
