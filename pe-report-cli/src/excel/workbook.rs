//! In-memory workbook model
//!
//! Templates are loaded into this model and a report mutates one sheet. The
//! cells that differ from the template are then patched into its package. Coordinates are zero-based `(row, col)`, the
//! same convention `rust_xlsxwriter` uses.

use std::collections::{BTreeMap, BTreeSet};

use super::cell::CellValue;

/// Fill applied by a conditional rule when a cell equals a text value
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalFill {
    pub first_row: u32,
    pub last_row: u32,
    pub col: u16,
    /// Text the evaluated cell must equal, e.g. `ERR`
    pub equals: String,
    /// RGB fill color, e.g. `0xFFC7CE`
    pub color: u32,
}

/// A worksheet: sparse cells plus conditional fills
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<(u32, u16), CellValue>,
    conditional_fills: Vec<ConditionalFill>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            cells: BTreeMap::new(),
            conditional_fills: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, row: u32, col: u16) -> &CellValue {
        self.cells.get(&(row, col)).unwrap_or(&CellValue::Empty)
    }

    /// Set a cell; empty values remove the cell
    pub fn set(&mut self, row: u32, col: u16, value: impl Into<CellValue>) {
        let value = value.into();
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    /// Trimmed text of a cell, empty for blank cells
    pub fn text(&self, row: u32, col: u16) -> String {
        self.get(row, col).as_text().trim().to_string()
    }

    /// Last populated row index, `None` for an empty sheet
    pub fn max_row(&self) -> Option<u32> {
        self.cells.keys().next_back().map(|(row, _)| *row)
    }

    /// Last populated column index, `None` for an empty sheet
    pub fn max_col(&self) -> Option<u16> {
        self.cells.keys().map(|(_, col)| *col).max()
    }

    /// Populated cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (u32, u16, &CellValue)> {
        self.cells.iter().map(|((row, col), value)| (*row, *col, value))
    }

    /// Remove every cell inside `0..=last_row` x `0..=last_col`
    pub fn clear_range(&mut self, last_row: u32, last_col: u16) {
        self.cells
            .retain(|(row, col), _| *row > last_row || *col > last_col);
    }

    /// Cells whose value differs from `before`, cleared cells included
    pub fn changed_cells(&self, before: &Sheet) -> BTreeSet<(u32, u16)> {
        let mut changed: BTreeSet<(u32, u16)> = self
            .cells
            .iter()
            .filter(|(key, value)| before.cells.get(*key) != Some(*value))
            .map(|(key, _)| *key)
            .collect();
        changed.extend(
            before
                .cells
                .keys()
                .filter(|key| !self.cells.contains_key(*key))
                .copied(),
        );
        changed
    }

    pub fn add_conditional_fill(&mut self, fill: ConditionalFill) {
        self.conditional_fills.push(fill);
    }

    pub fn conditional_fills(&self) -> &[ConditionalFill] {
        &self.conditional_fills
    }
}

/// Ordered collection of sheets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Append a sheet, replacing any sheet of the same name in place
    pub fn push_sheet(&mut self, sheet: Sheet) {
        match self.sheets.iter_mut().find(|s| s.name == sheet.name) {
            Some(existing) => *existing = sheet,
            None => self.sheets.push(sheet),
        }
    }

    /// Get the named sheet, appending an empty one when it does not exist
    pub fn sheet_or_insert(&mut self, name: &str) -> &mut Sheet {
        let idx = match self.sheets.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sheets.push(Sheet::new(name));
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_workbook(names: &[&str]) -> Workbook {
        let mut workbook = Workbook::new();
        for name in names {
            workbook.push_sheet(Sheet::new(*name));
        }
        workbook
    }

    #[test]
    fn test_push_sheet_replaces_by_name() {
        let mut workbook = make_workbook(&["A", "B"]);
        let mut replacement = Sheet::new("A");
        replacement.set(0, 0, 5.0);

        workbook.push_sheet(replacement);

        assert_eq!(workbook.sheet_names(), vec!["A", "B"]);
        assert_eq!(workbook.sheet("A").unwrap().get(0, 0), &CellValue::Number(5.0));
    }

    #[test]
    fn test_extent_and_clear_range() {
        let mut sheet = Sheet::new("S");
        sheet.set(0, 0, "key");
        sheet.set(4, 2, 1.0);
        sheet.set(2, 7, "outside");

        assert_eq!(sheet.max_row(), Some(4));
        assert_eq!(sheet.max_col(), Some(7));

        sheet.clear_range(4, 2);
        assert_eq!(sheet.cells().count(), 1);
        assert_eq!(sheet.text(2, 7), "outside");
    }

    #[test]
    fn test_changed_cells_include_cleared_cells() {
        let mut before = Sheet::new("S");
        before.set(0, 0, "Sede");
        before.set(1, 0, 1.0);
        before.set(2, 0, "borrar");

        let mut after = before.clone();
        after.set(1, 0, 2.0);
        after.set(2, 0, CellValue::Empty);
        after.set(3, 4, CellValue::formula("=A2"));

        let changed: Vec<(u32, u16)> = after.changed_cells(&before).into_iter().collect();
        assert_eq!(changed, vec![(1, 0), (2, 0), (3, 4)]);
        assert!(before.changed_cells(&before).is_empty());
    }

    #[test]
    fn test_setting_empty_removes_cell() {
        let mut sheet = Sheet::new("S");
        sheet.set(1, 1, "x");
        sheet.set(1, 1, CellValue::Empty);
        assert_eq!(sheet.max_row(), None);
    }
}
