//! Build xlsx fixtures from the workbook model with rust_xlsxwriter
//!
//! The document timestamp is pinned so identical input gives identical bytes.

use anyhow::{Context, Result};
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, Formula, Workbook as XlsxWorkbook, Worksheet};

use super::cell::CellValue;
use super::workbook::{Sheet, Workbook};

/// The model as a rust_xlsxwriter workbook, ready for extra formatting
pub fn to_xlsx_workbook(workbook: &Workbook) -> Result<XlsxWorkbook> {
    let mut xlsx = XlsxWorkbook::new();

    let created = ExcelDateTime::from_ymd(2000, 1, 1).context("Invalid document timestamp")?;
    let properties = DocProperties::new().set_creation_datetime(&created);
    xlsx.set_properties(&properties);

    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    for sheet in workbook.sheets() {
        let worksheet = xlsx.add_worksheet();
        worksheet
            .set_name(sheet.name())
            .with_context(|| format!("Invalid sheet name: {}", sheet.name()))?;

        write_cells(worksheet, sheet, &date_format)
            .with_context(|| format!("Failed to write sheet: {}", sheet.name()))?;
    }

    Ok(xlsx)
}

/// Serialize the model to xlsx bytes
pub fn write_workbook(workbook: &Workbook) -> Result<Vec<u8>> {
    to_xlsx_workbook(workbook)?
        .save_to_buffer()
        .context("Failed to serialize Excel workbook")
}

fn write_cells(worksheet: &mut Worksheet, sheet: &Sheet, date_format: &Format) -> Result<()> {
    for (row, col, value) in sheet.cells() {
        match value {
            CellValue::Empty => {}
            CellValue::Number(f) => {
                worksheet.write_number(row, col, *f)?;
            }
            CellValue::Text(s) => {
                worksheet.write_string(row, col, s)?;
            }
            CellValue::Bool(b) => {
                worksheet.write_boolean(row, col, *b)?;
            }
            CellValue::DateTime(serial) => {
                worksheet.write_number_with_format(row, col, *serial, date_format)?;
            }
            CellValue::Formula(expr) => {
                worksheet.write_formula(row, col, Formula::new(expr))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::read_workbook;

    fn make_workbook() -> Workbook {
        let mut sheet = Sheet::new("ASISTENCIA");
        sheet.set(0, 1, "Sede");
        sheet.set(1, 1, "LIMA");
        sheet.set(1, 5, 12.0);
        sheet.set(1, 13, CellValue::formula("=F2+J2"));

        let mut workbook = Workbook::new();
        workbook.push_sheet(sheet);
        workbook
    }

    #[test]
    fn test_round_trip_preserves_cells() {
        let bytes = write_workbook(&make_workbook()).unwrap();
        let read_back = read_workbook(&bytes).unwrap();

        let sheet = read_back.sheet("ASISTENCIA").unwrap();
        assert_eq!(sheet.text(1, 1), "LIMA");
        assert_eq!(sheet.get(1, 5), &CellValue::Number(12.0));
        assert_eq!(sheet.get(1, 13), &CellValue::Formula("=F2+J2".into()));
    }

    #[test]
    fn test_fixtures_are_deterministic() {
        let workbook = make_workbook();
        assert_eq!(write_workbook(&workbook).unwrap(), write_workbook(&workbook).unwrap());
    }
}
