//! Workbook fixtures shared by the report tests

use std::io::{Cursor, Read};

use rust_xlsxwriter::{Format, FormatAlign};

use crate::excel::writer::{to_xlsx_workbook, write_workbook};
use crate::excel::{CellValue, Sheet, Workbook, col};
use crate::services::classify::{ClassifiedFiles, SourceFile, classify};

pub fn xlsx(workbook: &Workbook) -> Vec<u8> {
    write_workbook(workbook).unwrap()
}

/// Text of one part of an xlsx package
pub fn part_text(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut text = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
    text
}

/// The `s` attribute of a cell in worksheet XML
pub fn cell_style(sheet_xml: &str, reference: &str) -> Option<String> {
    let start = sheet_xml.find(&format!("<c r=\"{}\"", reference))?;
    let tag = &sheet_xml[start..start + sheet_xml[start..].find('>')?];
    let at = tag.find(" s=\"")? + 4;
    Some(tag[at..at + tag[at..].find('"')?].to_string())
}

/// `make_template` with a percent format on OP1!Q2, a wide OP1 column B and
/// a merged title row on PORTADA
pub fn formatted_template() -> Vec<u8> {
    let mut workbook = to_xlsx_workbook(&make_template()).unwrap();

    let percent = Format::new().set_num_format("0.0%").set_bold();
    let op1 = workbook.worksheet_from_name("OP1").unwrap();
    op1.write_blank(1, col("Q"), &percent).unwrap();
    op1.set_column_width(col("B"), 30).unwrap();

    let centered = Format::new().set_align(FormatAlign::Center);
    let cover = workbook.worksheet_from_name("PORTADA").unwrap();
    cover.merge_range(2, 0, 2, 3, "Periodo 2025", &centered).unwrap();

    workbook.save_to_buffer().unwrap()
}

pub fn sheet_from_rows(name: &str, rows: &[Vec<CellValue>]) -> Sheet {
    let mut sheet = Sheet::new(name);
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            sheet.set(r as u32, c as u16, value.clone());
        }
    }
    sheet
}

pub fn single_sheet_xlsx(name: &str, rows: &[Vec<CellValue>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    workbook.push_sheet(sheet_from_rows(name, rows));
    xlsx(&workbook)
}

fn set(sheet: &mut Sheet, row: u32, column: &str, value: impl Into<CellValue>) {
    sheet.set(row, col(column), value);
}

/// Five-sheet template with ASISTENCIA, OP1 and OP2 key rows
pub fn make_template() -> Workbook {
    let mut workbook = Workbook::new();

    let mut cover = Sheet::new("PORTADA");
    set(&mut cover, 0, "A", "REPORTE PE3");
    workbook.push_sheet(cover);

    let mut attendance = Sheet::new("ASISTENCIA");
    set(&mut attendance, 0, "B", "Sede");
    set(&mut attendance, 0, "D", "Meta");
    set(&mut attendance, 1, "B", "LIMA");
    set(&mut attendance, 1, "D", 30.0);
    set(&mut attendance, 2, "B", " CUSCO ");
    set(&mut attendance, 3, "A", "sin sede");
    set(&mut attendance, 4, "B", "PUNO");
    workbook.push_sheet(attendance);

    let mut op1 = Sheet::new("OP1");
    set(&mut op1, 0, "B", "Sede");
    set(&mut op1, 0, "C", "Local");
    set(&mut op1, 1, "B", "X");
    set(&mut op1, 1, "C", 1.0);
    set(&mut op1, 1, "G", 30.0);
    set(&mut op1, 1, "H", 28.0);
    set(&mut op1, 2, "B", "Y");
    workbook.push_sheet(op1);

    let mut op2 = Sheet::new("OP2");
    set(&mut op2, 0, "B", "Sede");
    set(&mut op2, 0, "C", "Local");
    set(&mut op2, 1, "B", "SEDE – NORTE");
    set(&mut op2, 1, "C", "LOCAL N 1");
    set(&mut op2, 1, "E", 40.0);
    set(&mut op2, 1, "F", 40.0);
    workbook.push_sheet(op2);

    let mut summary = Sheet::new("RESUMEN");
    set(&mut summary, 0, "A", "Total");
    set(&mut summary, 1, "A", CellValue::formula("=SUM(ASISTENCIA!F:F)"));
    workbook.push_sheet(summary);

    workbook
}

/// Roster rows under a banner; metrics in report order
pub fn roster_rows(rows: &[(&str, [f64; 4])]) -> Vec<Vec<CellValue>> {
    let mut grid = vec![
        vec![CellValue::from("RELACIÓN DE POSTULANTES")],
        vec![
            CellValue::from("N"),
            CellValue::from("Sede de Evaluación"),
            CellValue::from("Postulantes"),
            CellValue::from("Asistencia al Local"),
            CellValue::from("Asistencia en Aula"),
            CellValue::from("Casos de inconsistencia"),
        ],
    ];
    for (i, (site, metrics)) in rows.iter().enumerate() {
        let mut row = vec![CellValue::Number(i as f64 + 1.0), CellValue::from(*site)];
        row.extend(metrics.iter().map(|m| CellValue::Number(*m)));
        grid.push(row);
    }
    grid
}

/// Inventory rows `(site, venue, category, count)` under a banner
pub fn inventory_rows(rows: &[(&str, &str, &str, f64)]) -> Vec<Vec<CellValue>> {
    let mut grid = vec![
        vec![CellValue::from("INVENTARIO EN CAMPO")],
        vec![
            CellValue::from("Sede Operativa"),
            CellValue::from("Local"),
            CellValue::from("Tipo"),
            CellValue::from("Inventario en campo"),
        ],
    ];
    for (site, venue, category, count) in rows {
        grid.push(vec![
            CellValue::from(*site),
            CellValue::from(*venue),
            CellValue::from(*category),
            CellValue::Number(*count),
        ]);
    }
    grid
}

pub fn make_files(files: Vec<(&str, Vec<Vec<CellValue>>)>) -> ClassifiedFiles {
    classify(
        files
            .into_iter()
            .map(|(name, rows)| SourceFile::new(name, single_sheet_xlsx("Hoja1", &rows))),
    )
}

/// Every role filled with small, consistent sources
pub fn make_all_files() -> ClassifiedFiles {
    make_files(vec![
        (
            "ASC - POSTULANTES.xlsx",
            roster_rows(&[
                ("LIMA", [10.0, 8.0, 7.0, 1.0]),
                ("LIMA", [20.0, 18.0, 18.0, 0.0]),
                ("CUSCO", [5.0, 4.0, 4.0, 0.0]),
            ]),
        ),
        (
            "NOM - POSTULANTES.xlsx",
            roster_rows(&[("LIMA", [3.0, 3.0, 3.0, 0.0])]),
        ),
        (
            "ACC - POSTULANTES.xlsx",
            roster_rows(&[("CUSCO", [2.0, 2.0, 2.0, 0.0])]),
        ),
        (
            "ASC - INSTRUMENTOS.xlsx",
            inventory_rows(&[
                ("X", "1", "CUADERNILLO DE CONOCIMIENTOS PEDAGÓGICOS", 30.0),
                ("X", "1", "FICHA DE RESPUESTA", 28.0),
            ]),
        ),
        (
            "NOM - INSTRUMENTOS.xlsx",
            inventory_rows(&[
                ("X", "1", "CUADERNILLO DE HABILIDADES GENERALES", 6.0),
                ("X", "1", "Cuadernillo de Conocimientos Pedagógicos", 4.0),
                ("X", "1", "FICHA DE RESPUESTA", 10.0),
            ]),
        ),
        (
            "ASC - FA.xlsx",
            inventory_rows(&[
                ("X", "1", "ACTA DE RECEPCIÓN/DEVOLUCIÓN", 2.0),
                ("X", "1", "SOBRES", 5.0),
                ("X", "1", "ACTA FISCAL", 1.0),
            ]),
        ),
        (
            "ACC - INSTRUMENTOS.xlsx",
            inventory_rows(&[
                ("Sede – Norte", "Local  N 1", "CUADERNILLO DE CONOCIMIENTOS PEDAGOGICOS", 38.0),
                ("SEDE - NORTE", "LOCAL N 1", "Ficha de Respuesta", 40.0),
            ]),
        ),
        (
            "ACC - FA.xlsx",
            inventory_rows(&[
                ("SEDE – NORTE", "LOCAL N 1", "ACTA DE RECEPCIÓN/DEVOLUCIÓN", 3.0),
                ("SEDE – NORTE", "LOCAL N 1", "ACTA DE RECEPCION/DEVOLUCION", 1.0),
                ("SEDE – NORTE", "LOCAL N 1", "SOBRES", 3.0),
                ("SEDE – NORTE", "LOCAL N 1", "SOBRE", 2.0),
            ]),
        ),
    ])
}
