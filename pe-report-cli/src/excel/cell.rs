//! Cell values shared by the reader, the writer and the report engine

use calamine::Data;
use rust_xlsxwriter::utility::column_name_to_number;

/// Content of a single worksheet cell
///
/// Formulas are kept as opaque expression text (with the leading `=`) and are
/// never evaluated here.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    /// Excel serial date
    DateTime(f64),
    Formula(String),
}

impl CellValue {
    /// Build a formula cell, adding the leading `=` when missing
    pub fn formula(expression: impl Into<String>) -> Self {
        let expression = expression.into();
        if expression.starts_with('=') {
            CellValue::Formula(expression)
        } else {
            CellValue::Formula(format!("={}", expression))
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Text rendering used for keys and labels
    ///
    /// Whole numbers render without a decimal part so a venue typed as `1`
    /// compares equal to the text `"1"`.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(f) | CellValue::DateTime(f) => format_number(*f),
            CellValue::Text(s) => s.clone(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Formula(expr) => expr.clone(),
        }
    }

    /// Numeric reading; text is parsed after trimming
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(f) | CellValue::DateTime(f) => Some(*f),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    /// Numeric reading with unparsable content counted as zero
    pub fn number_or_zero(&self) -> f64 {
        self.as_number().unwrap_or(0.0)
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
            Data::DateTimeIso(s) => CellValue::Text(s.clone()),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(e) => CellValue::Text(e.to_string()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

/// Zero-based column index for a column name such as `"AA"`
pub fn col(name: &str) -> u16 {
    column_name_to_number(name)
}
