//! Report generation
//!
//! Every report opens the template, keeps only its own sheet, walks the data
//! rows below the header and fills data and formula columns keyed by the
//! site/venue already present in the template. Only the filled cells are
//! written back into the template package.

pub mod attendance;
pub mod combine;
mod formula;
mod layout;
pub mod op1;
pub mod op2;
pub mod store;

#[cfg(test)]
pub(crate) mod fixtures;

use std::ops::RangeInclusive;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::error::ReportError;
use crate::excel::{Package, Sheet, read_workbook};
use crate::services::classify::{ClassifiedFiles, Role};

pub use attendance::AttendanceReport;
pub use combine::combine_reports;
pub use op1::Op1Report;
pub use op2::Op2Report;
pub use store::ReportStore;

/// The three single-sheet reports
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Attendance,
    Op1,
    Op2,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::Attendance, ReportKind::Op1, ReportKind::Op2];

    /// Template sheet the report fills
    pub fn sheet_name(&self) -> &'static str {
        match self {
            ReportKind::Attendance => "ASISTENCIA",
            ReportKind::Op1 => "OP1",
            ReportKind::Op2 => "OP2",
        }
    }

    /// Suffix of the output file name, e.g. `_OP1.xlsx`
    pub fn file_suffix(&self) -> String {
        format!("_{}.xlsx", self.sheet_name())
    }

    /// Roles that must be filled before the report can be generated
    pub fn required_roles(&self) -> &'static [Role] {
        match self {
            ReportKind::Attendance => &[Role::Asc, Role::Nom, Role::Acc],
            ReportKind::Op1 => &[Role::AscInst, Role::NomInst, Role::AscFa],
            ReportKind::Op2 => &[Role::AccInst, Role::AccFa],
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sheet_name())
    }
}

/// A report's loaded sources and its row-filling rule
pub trait Report: Sized {
    const KIND: ReportKind;

    /// Parse the classified source files the report needs
    fn load(files: &ClassifiedFiles) -> Result<Self>;

    /// Fill the target sheet; returns the number of rows written
    fn fill(&self, sheet: &mut Sheet) -> usize;
}

/// Load a template keeping only the sheet of `kind`
///
/// Returns the trimmed package together with the sheet's cells as read.
pub fn open_target_sheet(template: &[u8], kind: ReportKind) -> Result<(Package, Sheet)> {
    let missing = || ReportError::MissingSheet {
        sheet: kind.sheet_name().to_string(),
    };

    let workbook = read_workbook(template).context("Failed to read template workbook")?;
    let sheet = workbook.sheet(kind.sheet_name()).ok_or_else(missing)?.clone();

    let mut package = Package::from_bytes(template).context("Failed to open template package")?;
    if !package.retain_only(kind.sheet_name())? {
        return Err(missing().into());
    }
    Ok((package, sheet))
}

/// Fill a report into the template and serialize it
pub fn render<R: Report>(template: &[u8], report: &R) -> Result<Vec<u8>> {
    let kind = R::KIND;
    let (mut package, original) = open_target_sheet(template, kind)?;

    let mut sheet = original.clone();
    let rows = report.fill(&mut sheet);
    log::info!("{}: {} rows written", kind, rows);

    package
        .patch_sheet(&original, &sheet)
        .with_context(|| format!("Failed to write {} report", kind))?;
    package.finish()
}

/// Load the sources of `kind` and render it against `template`
pub fn generate(kind: ReportKind, template: &[u8], files: &ClassifiedFiles) -> Result<Vec<u8>> {
    match kind {
        ReportKind::Attendance => render(template, &AttendanceReport::load(files)?),
        ReportKind::Op1 => render(template, &Op1Report::load(files)?),
        ReportKind::Op2 => render(template, &Op2Report::load(files)?),
    }
}

/// Zero-based indices of the rows below the header, through the last populated row
pub(crate) fn data_rows(sheet: &Sheet) -> RangeInclusive<u32> {
    1..=sheet.max_row().unwrap_or(0)
}
