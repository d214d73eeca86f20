//! Header-resolved source table

use crate::error::ReportError;
use crate::excel::CellValue;

/// Rows of a source sheet below its header row
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Split a raw grid at `header_idx`; rows above the header are discarded
    ///
    /// Data rows are cut at the header's last column.
    pub fn from_grid(mut grid: Vec<Vec<CellValue>>, header_idx: usize, trim_names: bool) -> Self {
        let mut rows = grid.split_off((header_idx + 1).min(grid.len()));
        let columns: Vec<String> = grid
            .get(header_idx)
            .map(|header| {
                header
                    .iter()
                    .map(|cell| {
                        let name = cell.as_text();
                        if trim_names {
                            name.trim().to_string()
                        } else {
                            name
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        for row in &mut rows {
            row.truncate(columns.len());
        }

        Table { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Index of the first column with exactly this name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn rename_column(&mut self, idx: usize, name: impl Into<String>) {
        if let Some(column) = self.columns.get_mut(idx) {
            *column = name.into();
        }
    }

    /// Cell at `(row, col)`; short rows read as empty
    pub fn value(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&CellValue::Empty)
    }

    /// Resolve the index of every named column or report all that are missing
    pub fn require_columns(&self, names: &[&str]) -> Result<Vec<usize>, ReportError> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();

        for name in names {
            match self.column_index(name) {
                Some(idx) => indices.push(idx),
                None => missing.push(name.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(ReportError::MissingRequiredColumns { missing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    #[test]
    fn test_from_grid_trims_header_names() {
        let grid = vec![
            text_row(&["Reporte"]),
            text_row(&[" Sede Operativa ", "Local  "]),
            text_row(&["LIMA", "1"]),
        ];

        let table = Table::from_grid(grid, 1, true);
        assert_eq!(table.columns(), &["Sede Operativa", "Local"]);
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.value(0, 0).as_text(), "LIMA");
        assert_eq!(table.value(0, 5), &CellValue::Empty);
    }

    #[test]
    fn test_rows_are_cut_at_header_width() {
        let mut wide = text_row(&["LIMA", "1"]);
        wide.resize(3000, CellValue::Empty);
        wide.push(CellValue::from("stray"));
        let grid = vec![text_row(&["Sede Operativa", "Local"]), wide, text_row(&["CUSCO"])];

        let table = Table::from_grid(grid, 0, true);

        assert_eq!(table.rows()[0].len(), 2);
        assert_eq!(table.rows()[1].len(), 1);
        assert_eq!(table.value(0, 1).as_text(), "1");
        assert_eq!(table.value(0, 3000), &CellValue::Empty);
    }

    #[test]
    fn test_require_columns_reports_every_missing_name() {
        let table = Table::from_grid(vec![text_row(&["Sede Operativa", "Tipo"])], 0, true);

        let err = table
            .require_columns(&["Sede Operativa", "Local", "Tipo", "Inventario en campo"])
            .unwrap_err();
        assert_eq!(
            err,
            ReportError::MissingRequiredColumns {
                missing: vec!["Local".to_string(), "Inventario en campo".to_string()]
            }
        );
    }
}
