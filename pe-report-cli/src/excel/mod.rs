//! Excel I/O
//!
//! calamine reads workbooks into the cell model. Output is written by patching
//! the template package with quick-xml, so everything the model does not cover
//! (styles, widths, merges) is carried over from the template.

pub mod cell;
mod package;
mod parts;
mod reader;
mod styles;
pub mod workbook;
mod worksheet;
#[cfg(test)]
pub(crate) mod writer;
mod xml;

pub use cell::{CellValue, col};
pub use package::Package;
pub use reader::{read_first_sheet_grid, read_workbook};
pub use workbook::{ConditionalFill, Sheet, Workbook};
