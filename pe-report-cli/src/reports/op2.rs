//! OP2 sheet: instruments and auxiliary forms of the ACC track
//!
//! Access-track exports are inconsistent about accents, dashes and spacing, so
//! template keys, inventory keys and categories are all normalized before they
//! are compared.

use anyhow::Result;

use crate::excel::{Sheet, col};
use crate::services::classify::{ClassifiedFiles, Role};
use crate::services::normalize::normalize_str;
use crate::services::tally::{CategoryMatch, InventoryIndex};
use crate::sources::Inventory;

use super::formula::Check;
use super::layout::{FormColumn, InstrumentBlock, form, write_forms};
use super::op1::load_inventory;
use super::{Report, ReportKind, data_rows};

const INSTRUMENTS: InstrumentBlock = InstrumentBlock {
    // Truncated so accented and unaccented spellings both match
    booklet: &["cuadernillo de conocimientos pedagog"],
    answer_sheet: &["ficha de respuesta"],
    expected: ["E", "F"],
    counted: ["I", "J"],
    difference: ["K", "L"],
    coverage: ["M", "N"],
};

const FORMS: [FormColumn; 12] = [
    form(
        "AD",
        &["ACTA DE RECEPCION/DEVOLUCION", "ACTA DE RECEPCIÓN/DEVOLUCIÓN"],
        "AE",
        Check::Ratio("R"),
    ),
    form(
        "AF",
        &["ACTA DE APLICACION DEL AULA", "ACTA DE APLICACIÓN DEL AULA"],
        "AG",
        Check::Ratio("S"),
    ),
    form("AH", &["LISTA DE ASISTENCIA"], "AI", Check::Ratio("T")),
    form("AJ", &["LISTA DE RETIRO DE CUADERNILLOS"], "AK", Check::Ratio("U")),
    form(
        "AL",
        &["ACTA DE RESPUESTA A OBSERVACIONES DEL DOCENTE"],
        "AM",
        Check::Ratio("V"),
    ),
    form(
        "AN",
        &["REGISTRO DE ENTREGA INSTRUMENTOS ADICIONALES"],
        "AO",
        Check::Ratio("W"),
    ),
    form("AP", &["ACTA DE INCIDENCIAS DEL CAE"], "AQ", Check::Ratio("X")),
    form(
        "AR",
        &["ACTA DE INCUMPLIMIENTO DE PROCEDIMIENTOS"],
        "AS",
        Check::Equal("Y"),
    ),
    form("AT", &["ACTA DE INCIDENCIAS DE SALUD"], "AU", Check::Ratio("Z")),
    form(
        "AV",
        &[
            "ACTA DE INCIDENCIAS DEL LOCAL DE EVALUACION",
            "ACTA DE INCIDENCIAS DEL LOCAL DE EVALUACIÓN",
        ],
        "AW",
        Check::Ratio("AA"),
    ),
    form("AX", &["ACTA FISCAL"], "AY", Check::Equal("AB")),
    form("AZ", &["SOBRES", "SOBRE"], "BA", Check::SheetRatio("OP2", "AC")),
];

/// Normalized inventories feeding the OP2 sheet
#[derive(Debug, Clone)]
pub struct Op2Report {
    instruments: InventoryIndex,
    forms: InventoryIndex,
}

impl Op2Report {
    /// Build from raw inventories; labels are normalized here
    pub fn new(instruments: Inventory, forms: Inventory) -> Self {
        let index = |inventory: Inventory| {
            InventoryIndex::new(&inventory.normalized(), CategoryMatch::Normalized)
        };
        Op2Report {
            instruments: index(instruments),
            forms: index(forms),
        }
    }
}

impl Report for Op2Report {
    const KIND: ReportKind = ReportKind::Op2;

    fn load(files: &ClassifiedFiles) -> Result<Self> {
        let forms = load_inventory(files, Role::AccFa)?;
        let instruments = load_inventory(files, Role::AccInst)?;
        Ok(Op2Report::new(instruments, forms))
    }

    fn fill(&self, sheet: &mut Sheet) -> usize {
        let mut written = 0;

        for row in data_rows(sheet) {
            let site = normalize_str(&sheet.get(row, col("B")).as_text());
            let venue = normalize_str(&sheet.get(row, col("C")).as_text());
            if site.is_empty() || venue.is_empty() {
                continue;
            }
            let key = (site.as_str(), venue.as_str());
            if !self.instruments.contains(key.0, key.1) {
                log::debug!("OP2 row {}: no instrument records for {} / {}", row + 1, site, venue);
            }

            INSTRUMENTS.write(sheet, row, &self.instruments, key);
            write_forms(sheet, row, &FORMS, &self.forms, key);

            written += 1;
        }

        written
    }
}
