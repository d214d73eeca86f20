pub mod classify;
pub mod combine;
pub mod generate;
pub mod run;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::*;

use crate::services::classify::SourceFile;

/// Expand inputs into source files
///
/// Directories contribute their `.xlsx` files sorted by name, so the last
/// duplicate for a role is predictable. Excel lock files (`~$...`) are skipped.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut paths: Vec<PathBuf> = fs::read_dir(input)
                .with_context(|| format!("Failed to read directory: {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| is_workbook(path))
                .collect();
            paths.sort();

            for path in paths {
                files.push(SourceFile::read(&path)?);
            }
        } else {
            files.push(SourceFile::read(input)?);
        }
    }

    Ok(files)
}

fn is_workbook(path: &Path) -> bool {
    let is_xlsx = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    let is_lock_file = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with("~$"));
    path.is_file() && is_xlsx && !is_lock_file
}

pub fn read_template(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read template: {}", path.display()))
}

/// Write an output workbook, creating its directory when needed
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }
    fs::write(path, bytes)
        .with_context(|| format!("Failed to write output: {}", path.display()))?;
    println!("  {} {}", "wrote".green(), path.display().to_string().bold());
    Ok(())
}
