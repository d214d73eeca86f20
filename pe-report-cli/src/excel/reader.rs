//! Read xlsx byte streams with calamine
//!
//! Positions are absolute: calamine ranges start at the first used cell, so
//! every cell is shifted back by the range origin before it reaches the model.

use std::io::Cursor;

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, Xlsx};

use super::cell::CellValue;
use super::workbook::{Sheet, Workbook};

/// Read every sheet of a workbook, keeping formula text where present
pub fn read_workbook(bytes: &[u8]) -> Result<Workbook> {
    let mut xlsx: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).context("Failed to open Excel workbook")?;

    let sheet_names: Vec<String> = xlsx.sheet_names().to_vec();
    let mut workbook = Workbook::new();

    for sheet_name in sheet_names {
        let range = xlsx
            .worksheet_range(&sheet_name)
            .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

        let mut sheet = Sheet::new(&sheet_name);
        for (row, col, value) in absolute_cells(&range) {
            sheet.set(row, col, CellValue::from(value));
        }

        // Formula text wins over the cached value so the formula survives a rewrite
        let formulas = xlsx
            .worksheet_formula(&sheet_name)
            .with_context(|| format!("Failed to read formulas of sheet: {}", sheet_name))?;
        for (row, col, formula) in absolute_cells(&formulas) {
            if !formula.is_empty() {
                sheet.set(row, col, CellValue::formula(formula.as_str()));
            }
        }

        workbook.push_sheet(sheet);
    }

    log::debug!("Read sheets: {}", workbook.sheet_names().join(", "));
    Ok(workbook)
}

/// Read the first sheet's cached values as rows anchored at A1
///
/// No header is assumed: row 0 of the grid is row 1 of the sheet. Each row
/// ends at its last populated cell, so rows differ in length.
pub fn read_first_sheet_grid(bytes: &[u8]) -> Result<Vec<Vec<CellValue>>> {
    let mut xlsx: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).context("Failed to open Excel workbook")?;

    let sheet_name = xlsx
        .sheet_names()
        .first()
        .context("Excel file has no sheets")?
        .clone();

    let range = xlsx
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

    Ok(to_grid(&range))
}

fn to_grid(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let mut grid: Vec<Vec<CellValue>> = Vec::new();
    for (row, col, value) in absolute_cells(range) {
        let (row, col) = (row as usize, col as usize);
        if grid.len() <= row {
            grid.resize_with(row + 1, Vec::new);
        }
        let cells = &mut grid[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = CellValue::from(value);
    }
    grid
}

fn absolute_cells<T>(range: &Range<T>) -> impl Iterator<Item = (u32, u16, &T)>
where
    T: calamine::CellType,
{
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    range.used_cells().map(move |(row, col, value)| {
        (
            start_row + row as u32,
            (start_col as usize + col) as u16,
            value,
        )
    })
}
