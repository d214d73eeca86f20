//! Header row discovery for loosely structured exports
//!
//! Inventory and auxiliary-form exports carry a banner of title rows before the
//! real header. The header is the first row mentioning the site column.

use crate::error::ReportError;
use crate::excel::CellValue;

use super::table::Table;

/// Anchor text identifying the header row of inventory-style exports
pub const SITE_ANCHOR: &str = "sede operativa";

/// Index of the first row where any cell's lower-cased text contains `anchor`
pub fn find_header_row(rows: &[Vec<CellValue>], anchor: &str) -> Result<usize, ReportError> {
    rows.iter()
        .position(|row| {
            row.iter()
                .any(|cell| cell.as_text().to_lowercase().contains(anchor))
        })
        .ok_or_else(|| ReportError::HeaderNotFound {
            anchor: anchor.to_string(),
        })
}

/// Re-read a raw grid using the `"sede operativa"` row as header
pub fn locate_and_parse(rows: Vec<Vec<CellValue>>) -> Result<Table, ReportError> {
    let header_idx = find_header_row(&rows, SITE_ANCHOR)?;
    log::debug!("Header row found at sheet row {}", header_idx + 1);
    Ok(Table::from_grid(rows, header_idx, true))
}
