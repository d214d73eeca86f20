//! Instrument and auxiliary-form inventory exports

use anyhow::{Context, Result};

use crate::error::ReportError;
use crate::excel::read_first_sheet_grid;
use crate::services::normalize::normalize_str;

use super::header::locate_and_parse;
use super::table::Table;

pub const COL_SITE: &str = "Sede Operativa";
pub const COL_VENUE: &str = "Local";
pub const COL_CATEGORY: &str = "Tipo";
pub const COL_COUNT: &str = "Inventario en campo";

/// One inventory line: how many items of a category were counted at a venue
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRecord {
    pub site: String,
    pub venue: String,
    pub category: String,
    pub count: f64,
}

/// All records of one inventory export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    records: Vec<InventoryRecord>,
}

impl Inventory {
    /// Read an export, locate its header and extract the records
    pub fn from_xlsx(bytes: &[u8]) -> Result<Self> {
        let grid = read_first_sheet_grid(bytes)?;
        let table = locate_and_parse(grid).context("Failed to locate inventory header")?;
        let inventory = Inventory::from_table(&table).context("Invalid inventory export")?;
        Ok(inventory)
    }

    /// Extract records; site and venue are trimmed, counts coerce to zero
    pub fn from_table(table: &Table) -> Result<Self, ReportError> {
        let cols = table.require_columns(&[COL_SITE, COL_VENUE, COL_CATEGORY, COL_COUNT])?;
        let (site, venue, category, count) = (cols[0], cols[1], cols[2], cols[3]);

        let records = (0..table.rows().len())
            .map(|row| InventoryRecord {
                site: table.value(row, site).as_text().trim().to_string(),
                venue: table.value(row, venue).as_text().trim().to_string(),
                category: table.value(row, category).as_text(),
                count: table.value(row, count).number_or_zero(),
            })
            .collect();

        Ok(Inventory { records })
    }

    /// Canonicalize site, venue and category labels
    pub fn normalized(self) -> Self {
        let records = self
            .records
            .into_iter()
            .map(|r| InventoryRecord {
                site: normalize_str(&r.site),
                venue: normalize_str(&r.venue),
                category: normalize_str(&r.category),
                count: r.count,
            })
            .collect();
        Inventory { records }
    }

    pub fn records(&self) -> &[InventoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<InventoryRecord> for Inventory {
    fn from_iter<I: IntoIterator<Item = InventoryRecord>>(iter: I) -> Self {
        Inventory {
            records: iter.into_iter().collect(),
        }
    }
}
