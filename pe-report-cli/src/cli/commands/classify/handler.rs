//! Classify command: which role each input fills and which reports are ready

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;

use super::{ClassifyCommands, OutputFormat};
use crate::cli::commands::collect_inputs;
use crate::reports::ReportKind;
use crate::services::classify::{ClassifiedFiles, Role, classify, classify_name};

#[derive(Serialize)]
struct ClassificationReport {
    roles: BTreeMap<Role, Option<String>>,
    ignored: Vec<String>,
    reports: BTreeMap<ReportKind, Vec<Role>>,
}

impl ClassificationReport {
    fn new(files: &ClassifiedFiles, ignored: Vec<String>) -> Self {
        ClassificationReport {
            roles: files.summary(),
            ignored,
            reports: ReportKind::ALL
                .iter()
                .map(|kind| (*kind, files.missing(*kind)))
                .collect(),
        }
    }
}

pub fn handle_classify_command(args: ClassifyCommands) -> Result<()> {
    let inputs = collect_inputs(&args.inputs)?;
    let ignored: Vec<String> = inputs
        .iter()
        .filter(|f| classify_name(&f.name).is_none())
        .map(|f| f.name.clone())
        .collect();
    let files = classify(inputs);
    let report = ClassificationReport::new(&files, ignored);

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .context("Failed to format classification as JSON")?;
            println!("{}", json);
        }
        OutputFormat::Table => print_table(&report),
    }

    Ok(())
}

fn print_table(report: &ClassificationReport) {
    println!("{}", "Detected files".bold());
    for (role, name) in &report.roles {
        let role = format!("{:<10}", role.key());
        match name {
            Some(name) => println!("  {} {}", role.cyan(), name),
            None => println!("  {} {}", role.cyan(), "not provided".dimmed()),
        }
    }

    for name in &report.ignored {
        println!("  {} {}", format!("{:<10}", "ignored").yellow(), name.dimmed());
    }

    println!();
    println!("{}", "Reports".bold());
    for (kind, missing) in &report.reports {
        if missing.is_empty() {
            println!("  {:<10} {}", kind.sheet_name(), "ready".green());
        } else {
            let missing: Vec<&str> = missing.iter().map(|r| r.key()).collect();
            println!(
                "  {:<10} {} {}",
                kind.sheet_name(),
                "missing".red(),
                missing.join(", ")
            );
        }
    }
}
