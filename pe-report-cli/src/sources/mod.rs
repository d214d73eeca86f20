//! Source spreadsheets: header discovery, rosters and inventories

pub mod header;
pub mod inventory;
pub mod roster;
pub mod table;

pub use inventory::Inventory;
pub use roster::{RosterMetric, RosterTotals};
