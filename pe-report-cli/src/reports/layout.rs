//! Column layouts shared by the OP1 and OP2 sheets

use crate::excel::{Sheet, col};
use crate::services::tally::InventoryIndex;

use super::formula::{self, Check};

/// Booklet and answer-sheet block of an instrument report
///
/// Each pair holds the booklet column first and the answer-sheet column second.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentBlock {
    /// Booklet category patterns, OR-ed
    pub booklet: &'static [&'static str],
    /// Answer-sheet category patterns, OR-ed
    pub answer_sheet: &'static [&'static str],
    /// Columns with the expected quantities (already in the template)
    pub expected: [&'static str; 2],
    /// Columns receiving the counted quantities
    pub counted: [&'static str; 2],
    /// `expected - counted`
    pub difference: [&'static str; 2],
    /// `IF(expected=0,1,counted/expected)`
    pub coverage: [&'static str; 2],
}

impl InstrumentBlock {
    pub fn write(&self, sheet: &mut Sheet, row: u32, index: &InventoryIndex, key: (&str, &str)) {
        let (site, venue) = key;
        let sums = [
            index.sum(site, venue, self.booklet),
            index.sum(site, venue, self.answer_sheet),
        ];
        let excel_row = row + 1;

        for i in 0..2 {
            sheet.set(row, col(self.counted[i]), sums[i]);
            sheet.set(
                row,
                col(self.difference[i]),
                formula::difference(self.expected[i], self.counted[i], excel_row),
            );
            sheet.set(
                row,
                col(self.coverage[i]),
                formula::coverage(self.counted[i], self.expected[i], excel_row),
            );
        }
    }
}

/// One auxiliary-form category: where its count goes and how it is checked
#[derive(Debug, Clone, Copy)]
pub struct FormColumn {
    pub counted: &'static str,
    pub patterns: &'static [&'static str],
    pub check_column: &'static str,
    pub check: Check,
}

pub const fn form(
    counted: &'static str,
    patterns: &'static [&'static str],
    check_column: &'static str,
    check: Check,
) -> FormColumn {
    FormColumn {
        counted,
        patterns,
        check_column,
        check,
    }
}

/// Write the count and validation formula of every form category
pub fn write_forms(
    sheet: &mut Sheet,
    row: u32,
    forms: &[FormColumn],
    index: &InventoryIndex,
    key: (&str, &str),
) {
    let (site, venue) = key;
    for form in forms {
        sheet.set(row, col(form.counted), index.sum(site, venue, form.patterns));
        sheet.set(
            row,
            col(form.check_column),
            form.check.formula(form.counted, row + 1),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::CellValue;
    use crate::services::tally::CategoryMatch;
    use crate::sources::inventory::{Inventory, InventoryRecord};

    fn make_index() -> InventoryIndex {
        let inventory: Inventory = vec![
            InventoryRecord {
                site: "X".into(),
                venue: "1".into(),
                category: "FICHA DE RESPUESTA".into(),
                count: 12.0,
            },
            InventoryRecord {
                site: "X".into(),
                venue: "1".into(),
                category: "ACTA FISCAL".into(),
                count: 1.0,
            },
        ]
        .into_iter()
        .collect();
        InventoryIndex::new(&inventory, CategoryMatch::CaseInsensitive)
    }

    #[test]
    fn test_instrument_block_writes_counts_and_formulas() {
        let block = InstrumentBlock {
            booklet: &["CUADERNILLO"],
            answer_sheet: &["FICHA DE RESPUESTA"],
            expected: ["G", "H"],
            counted: ["M", "N"],
            difference: ["O", "P"],
            coverage: ["Q", "R"],
        };
        let mut sheet = Sheet::new("OP1");

        block.write(&mut sheet, 1, &make_index(), ("X", "1"));

        assert_eq!(sheet.get(1, col("M")), &CellValue::Number(0.0));
        assert_eq!(sheet.get(1, col("N")), &CellValue::Number(12.0));
        assert_eq!(sheet.get(1, col("P")).as_text(), "=H2-N2");
        assert_eq!(sheet.get(1, col("R")).as_text(), "=IF(H2=0,1,N2/H2)");
    }

    #[test]
    fn test_forms_write_count_and_check() {
        let forms = [FormColumn {
            counted: "BH",
            patterns: &["ACTA FISCAL"],
            check_column: "BI",
            check: Check::Equal("AL"),
        }];
        let mut sheet = Sheet::new("OP1");

        write_forms(&mut sheet, 4, &forms, &make_index(), ("X", "1"));

        assert_eq!(sheet.get(4, col("BH")), &CellValue::Number(1.0));
        assert_eq!(
            sheet.get(4, col("BI")).as_text(),
            "=IF(BH5=AL5,\"OK\",\"ERR\")"
        );
    }
}
