//! Merge the single-sheet reports back into the full template

use anyhow::{Context, Result};

use crate::excel::{Package, Sheet, Workbook, read_workbook};

/// Copy every sheet of each report into the template
///
/// Sheets are matched by name: an existing sheet is overwritten in place, an
/// unknown one is appended. Formula cells travel as their expression text and
/// each sheet's conditional formats replace the template's. The rest of the
/// template package, styles and other sheets included, is kept as is.
pub fn combine_reports(template: &[u8], reports: &[&[u8]]) -> Result<Vec<u8>> {
    let mut package = Package::from_bytes(template).context("Failed to open template package")?;
    let mut combined = read_workbook(template).context("Failed to read template workbook")?;

    for (i, report) in reports.iter().enumerate() {
        let context = || format!("Failed to read generated report #{}", i + 1);
        let source_package = Package::from_bytes(report).with_context(context)?;
        let source = read_workbook(report).with_context(context)?;

        for sheet in source.sheets() {
            let before = combined.sheet(sheet.name()).cloned();
            let after = copy_sheet(&mut combined, sheet);
            match &before {
                Some(before) => package.patch_sheet(before, after)?,
                None => package.append_sheet(after)?,
            }
            let formats = source_package.conditional_formats(sheet.name())?;
            package
                .replace_conditional_formats(sheet.name(), &formats)
                .with_context(|| format!("Failed to copy highlighting of sheet '{}'", sheet.name()))?;
        }
    }

    log::info!("Combined workbook sheets: {}", package.sheet_names().join(", "));
    package.finish().context("Failed to write combined workbook")
}

/// Overwrite the source's used range in the same-named target sheet
fn copy_sheet<'a>(target: &'a mut Workbook, source: &Sheet) -> &'a Sheet {
    let sheet = target.sheet_or_insert(source.name());

    if let (Some(last_row), Some(last_col)) = (source.max_row(), source.max_col()) {
        sheet.clear_range(last_row, last_col);
    }
    for (row, col, value) in source.cells() {
        sheet.set(row, col, value.clone());
    }

    log::debug!(
        "Copied {} cells into sheet '{}'",
        source.cells().count(),
        source.name()
    );
    sheet
}
