//! OP1 sheet: instruments and auxiliary forms of the ASC and NOM tracks
//!
//! Keys are the trimmed site (B) and venue (C) of each template row. Inventory
//! categories match by case-insensitive substring.

use anyhow::{Context, Result};

use crate::excel::{Sheet, col};
use crate::services::classify::{ClassifiedFiles, Role};
use crate::services::tally::{CategoryMatch, InventoryIndex};
use crate::sources::Inventory;

use super::formula::Check;
use super::layout::{FormColumn, InstrumentBlock, form, write_forms};
use super::{Report, ReportKind, data_rows};

const PEDAGOGICAL_BOOKLET: &str = "CUADERNILLO DE CONOCIMIENTOS PEDAGÓGICOS";
const GENERAL_SKILLS_BOOKLET: &str = "CUADERNILLO DE HABILIDADES GENERALES";
const ANSWER_SHEET: &str = "FICHA DE RESPUESTA";

const ASC_INSTRUMENTS: InstrumentBlock = InstrumentBlock {
    booklet: &[PEDAGOGICAL_BOOKLET],
    answer_sheet: &[ANSWER_SHEET],
    expected: ["G", "H"],
    counted: ["M", "N"],
    difference: ["O", "P"],
    coverage: ["Q", "R"],
};

const NOM_INSTRUMENTS: InstrumentBlock = InstrumentBlock {
    booklet: &[PEDAGOGICAL_BOOKLET, GENERAL_SKILLS_BOOKLET],
    answer_sheet: &[ANSWER_SHEET],
    expected: ["I", "J"],
    counted: ["S", "T"],
    difference: ["U", "V"],
    coverage: ["W", "X"],
};

const ASC_FORMS: [FormColumn; 12] = [
    form("AN", &["ACTA DE RECEPCIÓN/DEVOLUCIÓN"], "AO", Check::Ratio("AB")),
    form("AP", &["ACTA DE APLICACIÓN DEL AULA"], "AQ", Check::Ratio("AC")),
    form("AR", &["LISTA DE ASISTENCIA"], "AS", Check::Ratio("AD")),
    form("AT", &["LISTA DE RETIRO DE CUADERNILLOS"], "AU", Check::Ratio("AE")),
    form(
        "AV",
        &["ACTA DE RESPUESTA A OBSERVACIONES DEL DOCENTE"],
        "AW",
        Check::Ratio("AF"),
    ),
    form(
        "AX",
        &["REGISTRO DE ENTREGA INSTRUMENTOS ADICIONALES"],
        "AY",
        Check::Ratio("AG"),
    ),
    form("AZ", &["ACTA DE INCIDENCIAS DEL CAE"], "BA", Check::Ratio("AH")),
    form(
        "BB",
        &["ACTA DE INCUMPLIMIENTO DE PROCEDIMIENTOS"],
        "BC",
        Check::Equal("AI"),
    ),
    form("BD", &["ACTA DE INCIDENCIAS DE SALUD"], "BE", Check::Ratio("AJ")),
    form(
        "BF",
        &["ACTA DE INCIDENCIAS DEL LOCAL DE EVALUACIÓN"],
        "BG",
        Check::Ratio("AK"),
    ),
    form("BH", &["ACTA FISCAL"], "BI", Check::Equal("AL")),
    form("BJ", &["SOBRES"], "BK", Check::Ratio("AM")),
];

/// Inventories feeding the OP1 sheet
#[derive(Debug, Clone)]
pub struct Op1Report {
    asc_instruments: InventoryIndex,
    nom_instruments: InventoryIndex,
    asc_forms: InventoryIndex,
}

impl Op1Report {
    pub fn new(
        asc_instruments: &Inventory,
        nom_instruments: &Inventory,
        asc_forms: &Inventory,
    ) -> Self {
        let index = |inventory: &Inventory| {
            InventoryIndex::new(inventory, CategoryMatch::CaseInsensitive)
        };
        Op1Report {
            asc_instruments: index(asc_instruments),
            nom_instruments: index(nom_instruments),
            asc_forms: index(asc_forms),
        }
    }
}

pub(super) fn load_inventory(files: &ClassifiedFiles, role: Role) -> Result<Inventory> {
    let bytes = files.bytes(role)?;
    let inventory =
        Inventory::from_xlsx(bytes).with_context(|| format!("Invalid {} inventory", role))?;
    if inventory.is_empty() {
        log::warn!("{} inventory has no records", role);
    } else {
        log::debug!("{} inventory: {} records", role, inventory.len());
    }
    Ok(inventory)
}

impl Report for Op1Report {
    const KIND: ReportKind = ReportKind::Op1;

    fn load(files: &ClassifiedFiles) -> Result<Self> {
        let asc_forms = load_inventory(files, Role::AscFa)?;
        let asc_instruments = load_inventory(files, Role::AscInst)?;
        let nom_instruments = load_inventory(files, Role::NomInst)?;
        Ok(Op1Report::new(&asc_instruments, &nom_instruments, &asc_forms))
    }

    fn fill(&self, sheet: &mut Sheet) -> usize {
        let mut written = 0;

        for row in data_rows(sheet) {
            let site = sheet.text(row, col("B"));
            let venue = sheet.text(row, col("C"));
            if site.is_empty() || venue.is_empty() {
                continue;
            }
            let key = (site.as_str(), venue.as_str());
            if !self.asc_instruments.contains(key.0, key.1) {
                log::debug!("OP1 row {}: no instrument records for {} / {}", row + 1, site, venue);
            }

            ASC_INSTRUMENTS.write(sheet, row, &self.asc_instruments, key);
            NOM_INSTRUMENTS.write(sheet, row, &self.nom_instruments, key);
            write_forms(sheet, row, &ASC_FORMS, &self.asc_forms, key);

            written += 1;
        }

        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::excel::{CellValue, read_workbook};
    use crate::reports::fixtures::{
        inventory_rows, make_all_files, make_files, make_template, single_sheet_xlsx, xlsx,
    };
    use crate::reports::{generate, render};

    fn make_sheet() -> Sheet {
        make_template().sheet("OP1").unwrap().clone()
    }

    fn filled() -> Sheet {
        let mut sheet = make_sheet();
        Op1Report::load(&make_all_files()).unwrap().fill(&mut sheet);
        sheet
    }

    #[test]
    fn test_asc_instruments_scenario() {
        let sheet = filled();

        assert_eq!(sheet.get(1, col("M")), &CellValue::Number(30.0));
        assert_eq!(sheet.get(1, col("N")), &CellValue::Number(28.0));
        assert_eq!(sheet.get(1, col("O")).as_text(), "=G2-M2");
        assert_eq!(sheet.get(1, col("P")).as_text(), "=H2-N2");
        assert_eq!(sheet.get(1, col("Q")).as_text(), "=IF(G2=0,1,M2/G2)");
        assert_eq!(sheet.get(1, col("R")).as_text(), "=IF(H2=0,1,N2/H2)");
    }

    #[test]
    fn test_nom_booklets_include_general_skills() {
        let sheet = filled();

        assert_eq!(sheet.get(1, col("S")), &CellValue::Number(10.0));
        assert_eq!(sheet.get(1, col("T")), &CellValue::Number(10.0));
        assert_eq!(sheet.get(1, col("U")).as_text(), "=I2-S2");
        assert_eq!(sheet.get(1, col("X")).as_text(), "=IF(J2=0,1,T2/J2)");
    }

    #[test]
    fn test_auxiliary_forms() {
        let sheet = filled();

        assert_eq!(sheet.get(1, col("AN")), &CellValue::Number(2.0));
        assert_eq!(sheet.get(1, col("BJ")), &CellValue::Number(5.0));
        assert_eq!(sheet.get(1, col("BH")), &CellValue::Number(1.0));
        assert_eq!(sheet.get(1, col("AP")), &CellValue::Number(0.0));

        assert_eq!(sheet.get(1, col("AO")).as_text(), "=AN2/AB2");
        assert_eq!(sheet.get(1, col("BC")).as_text(), "=IF(BB2=AI2,\"OK\",\"ERR\")");
        assert_eq!(sheet.get(1, col("BI")).as_text(), "=IF(BH2=AL2,\"OK\",\"ERR\")");
        assert_eq!(sheet.get(1, col("BK")).as_text(), "=BJ2/AM2");
    }

    #[test]
    fn test_row_without_venue_is_skipped() {
        let sheet = filled();

        assert_eq!(sheet.get(2, col("M")), &CellValue::Empty);
        assert_eq!(sheet.get(2, col("BK")), &CellValue::Empty);
    }

    #[test]
    fn test_generate_is_idempotent() {
        let template = xlsx(&make_template());
        let files = make_all_files();

        let first = generate(ReportKind::Op1, &template, &files).unwrap();
        let second = generate(ReportKind::Op1, &template, &files).unwrap();
        assert_eq!(first, second);

        let output = read_workbook(&first).unwrap();
        assert_eq!(output.sheet_names(), vec!["OP1"]);
        assert_eq!(
            output.sheet("OP1").unwrap().get(1, col("M")),
            &CellValue::Number(30.0)
        );
    }

    #[test]
    fn test_invalid_inventory_is_reported() {
        let files = make_files(vec![
            (
                "ASC - INSTRUMENTOS.xlsx",
                inventory_rows(&[("X", "1", "FICHA DE RESPUESTA", 1.0)]),
            ),
            (
                "NOM - INSTRUMENTOS.xlsx",
                inventory_rows(&[("X", "1", "FICHA DE RESPUESTA", 1.0)]),
            ),
            (
                "ASC - FA.xlsx",
                vec![vec![CellValue::from("Sede Operativa"), CellValue::from("Local")]],
            ),
        ]);

        let err = Op1Report::load(&files).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ReportError>(),
            Some(&ReportError::MissingRequiredColumns {
                missing: vec!["Tipo".to_string(), "Inventario en campo".to_string()]
            })
        );
    }

    #[test]
    fn test_no_matching_rows_default_to_zero() {
        let inventory = Inventory::from_xlsx(&single_sheet_xlsx(
            "Hoja1",
            &inventory_rows(&[("Z", "9", "FICHA DE RESPUESTA", 3.0)]),
        ))
        .unwrap();
        let report = Op1Report::new(&inventory, &inventory, &inventory);

        let bytes = render(&xlsx(&make_template()), &report).unwrap();
        let output = read_workbook(&bytes).unwrap();
        let sheet = output.sheet("OP1").unwrap();

        for column in ["M", "N", "S", "T", "AN", "BJ"] {
            assert_eq!(sheet.get(1, col(column)), &CellValue::Number(0.0));
        }
    }
}
