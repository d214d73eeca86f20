//! Run command: the whole pipeline from uploaded exports to the final workbook

use anyhow::Result;
use colored::*;

use super::RunCommands;
use crate::cli::commands::{collect_inputs, read_template, write_output};
use crate::config::Config;
use crate::reports::{self, ReportKind, ReportStore, combine_reports};
use crate::services::classify::{ClassifiedFiles, classify};

/// Outcome of one report in a run
#[derive(Debug, PartialEq)]
enum Outcome {
    Generated,
    Skipped(Vec<&'static str>),
    Failed(String),
}

/// Generate every report whose roles are filled
///
/// Failures are collected rather than returned so the other reports still run.
fn generate_all(
    files: &ClassifiedFiles,
    template: &[u8],
    store: &mut ReportStore,
) -> Vec<(ReportKind, Outcome)> {
    ReportKind::ALL
        .iter()
        .map(|&kind| {
            let missing = files.missing(kind);
            let outcome = if !missing.is_empty() {
                log::warn!("Skipping {}: missing roles", kind);
                Outcome::Skipped(missing.iter().map(|r| r.key()).collect())
            } else {
                match store.regenerate(kind, || reports::generate(kind, template, files)) {
                    Ok(_) => Outcome::Generated,
                    Err(e) => Outcome::Failed(format!("{:#}", e)),
                }
            };
            (kind, outcome)
        })
        .collect()
}

pub fn handle_run_command(args: RunCommands, mut config: Config) -> Result<()> {
    if let Some(template) = args.template {
        config.template = template;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    let files = classify(collect_inputs(&args.inputs)?);
    let template = read_template(&config.template)?;
    let mut store = ReportStore::new();

    let outcomes = generate_all(&files, &template, &mut store);

    let mut failures = 0;
    for (kind, outcome) in &outcomes {
        match outcome {
            Outcome::Generated => {
                println!("{} {}", "✓".green(), kind);
                if let Some(bytes) = store.get(*kind) {
                    write_output(&config.output_path(*kind), bytes)?;
                }
            }
            Outcome::Skipped(missing) => {
                println!(
                    "{} {} skipped, missing {}",
                    "-".yellow(),
                    kind,
                    missing.join(", ")
                );
            }
            Outcome::Failed(message) => {
                failures += 1;
                println!("{} {}: {}", "✗".red(), kind, message);
            }
        }
    }

    match store.combined_inputs() {
        Some(inputs) => {
            let combined = combine_reports(&template, &inputs)?;
            write_output(&config.combined_path(), &combined)?;
            println!("{} Combined report generated", "✓".green());
        }
        None => println!("{}", "Combined report needs all three reports".dimmed()),
    }

    if failures > 0 {
        anyhow::bail!("{} report(s) failed", failures);
    }
    Ok(())
}
