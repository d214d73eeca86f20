//! Cell-address formula builders
//!
//! Expressions are emitted verbatim for the spreadsheet viewer; `row` is the
//! 1-based sheet row.

use crate::excel::CellValue;

/// `={a}{row}+{b}{row}`
pub fn sum(a: &str, b: &str, row: u32) -> CellValue {
    CellValue::formula(format!("={a}{row}+{b}{row}"))
}

/// `={a}{row}`
pub fn reference(a: &str, row: u32) -> CellValue {
    CellValue::formula(format!("={a}{row}"))
}

/// `={a}{row}-{b}{row}`
pub fn difference(a: &str, b: &str, row: u32) -> CellValue {
    CellValue::formula(format!("={a}{row}-{b}{row}"))
}

/// Share of `expected` that was counted, 1 when nothing was expected
pub fn coverage(counted: &str, expected: &str, row: u32) -> CellValue {
    CellValue::formula(format!(
        "=IF({expected}{row}=0,1,{counted}{row}/{expected}{row})"
    ))
}

/// `={num}{row}/{den}{row}`
pub fn ratio(num: &str, den: &str, row: u32) -> CellValue {
    CellValue::formula(format!("={num}{row}/{den}{row}"))
}

/// Ratio with both operands qualified by sheet name and absolute column
pub fn sheet_ratio(sheet: &str, num: &str, den: &str, row: u32) -> CellValue {
    CellValue::formula(format!("='{sheet}'!${num}{row}/'{sheet}'!${den}{row}"))
}

/// `"OK"` when both cells are equal, `"ERR"` otherwise
pub fn check_equal(a: &str, b: &str, row: u32) -> CellValue {
    CellValue::formula(format!("=IF({a}{row}={b}{row},\"OK\",\"ERR\")"))
}

/// Equality check with absolute columns
pub fn check_equal_abs(a: &str, b: &str, row: u32) -> CellValue {
    CellValue::formula(format!("=IF(${a}{row}=${b}{row},\"OK\",\"ERR\")"))
}

/// `"OK"` when the cell is zero, with an absolute column
pub fn check_zero_abs(a: &str, row: u32) -> CellValue {
    CellValue::formula(format!("=IF(${a}{row}=0,\"OK\",\"ERR\")"))
}

/// Validation emitted next to an auxiliary-form count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// count / expected
    Ratio(&'static str),
    /// count must equal expected
    Equal(&'static str),
    /// count / expected, qualified by the report's own sheet name
    SheetRatio(&'static str, &'static str),
}

impl Check {
    pub fn formula(&self, counted: &str, row: u32) -> CellValue {
        match self {
            Check::Ratio(expected) => ratio(counted, expected, row),
            Check::Equal(expected) => check_equal(counted, expected, row),
            Check::SheetRatio(sheet, expected) => sheet_ratio(sheet, counted, expected, row),
        }
    }
}
