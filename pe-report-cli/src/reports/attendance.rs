//! ASISTENCIA sheet: applicant attendance per site and track

use anyhow::{Context, Result};

use crate::excel::{ConditionalFill, Sheet, col};
use crate::services::classify::{ClassifiedFiles, Role};
use crate::sources::{RosterMetric, RosterTotals};

use super::formula;
use super::{Report, ReportKind, data_rows};

const SITE_COLUMN: &str = "B";

/// Metric columns per track, in `RosterMetric::ALL` order
const ASC_COLUMNS: [&str; 4] = ["F", "G", "H", "I"];
const NOM_COLUMNS: [&str; 4] = ["J", "K", "L", "M"];
const ACC_COLUMNS: [&str; 4] = ["S", "T", "U", "V"];

/// (target, asc, nom) of the ASC + NOM totals
const TOTALS: [(&str, &str, &str); 4] = [
    ("N", "F", "J"),
    ("O", "G", "K"),
    ("P", "H", "L"),
    ("Q", "I", "M"),
];

/// (target, source) of the ACC mirror columns
const ACC_MIRROR: [(&str, &str); 4] = [("W", "S"), ("X", "T"), ("Y", "U"), ("Z", "V")];

const TOTAL_CHECK: &str = "R";
const INCONSISTENCY_CHECK: &str = "AA";

const ERR_FILL: u32 = 0xFFC7CE;
const OK_FILL: u32 = 0xC6EFCE;

/// Roster totals of the three tracks
#[derive(Debug, Clone)]
pub struct AttendanceReport {
    pub asc: RosterTotals,
    pub nom: RosterTotals,
    pub acc: RosterTotals,
}

impl AttendanceReport {
    fn tracks(&self) -> [(&RosterTotals, &[&'static str; 4]); 3] {
        [
            (&self.asc, &ASC_COLUMNS),
            (&self.nom, &NOM_COLUMNS),
            (&self.acc, &ACC_COLUMNS),
        ]
    }
}

fn load_roster(files: &ClassifiedFiles, role: Role) -> Result<RosterTotals> {
    let bytes = files.bytes(role)?;
    RosterTotals::from_xlsx(bytes).with_context(|| format!("Invalid {} roster", role))
}

impl Report for AttendanceReport {
    const KIND: ReportKind = ReportKind::Attendance;

    fn load(files: &ClassifiedFiles) -> Result<Self> {
        Ok(AttendanceReport {
            asc: load_roster(files, Role::Asc)?,
            nom: load_roster(files, Role::Nom)?,
            acc: load_roster(files, Role::Acc)?,
        })
    }

    fn fill(&self, sheet: &mut Sheet) -> usize {
        let mut written = 0;

        for row in data_rows(sheet) {
            let site = sheet.text(row, col(SITE_COLUMN));
            if site.is_empty() {
                continue;
            }
            let r = row + 1;

            for (totals, columns) in self.tracks() {
                for (metric, column) in RosterMetric::ALL.iter().zip(columns.iter()) {
                    sheet.set(row, col(column), totals.get(&site, *metric));
                }
            }

            for (target, asc, nom) in TOTALS {
                sheet.set(row, col(target), formula::sum(asc, nom, r));
            }
            sheet.set(row, col(TOTAL_CHECK), formula::check_equal_abs("D", "Q", r));

            for (target, source) in ACC_MIRROR {
                sheet.set(row, col(target), formula::reference(source, r));
            }
            sheet.set(row, col(INCONSISTENCY_CHECK), formula::check_zero_abs("Z", r));

            written += 1;
        }

        if let Some(last_row) = sheet.max_row().filter(|r| *r >= 1) {
            for column in [TOTAL_CHECK, INCONSISTENCY_CHECK] {
                for (equals, color) in [("ERR", ERR_FILL), ("OK", OK_FILL)] {
                    sheet.add_conditional_fill(ConditionalFill {
                        first_row: 1,
                        last_row,
                        col: col(column),
                        equals: equals.to_string(),
                        color,
                    });
                }
            }
        }

        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::{CellValue, read_workbook};
    use crate::reports::fixtures::{make_all_files, make_template, part_text, xlsx};
    use crate::reports::{generate, render};

    fn make_sheet() -> Sheet {
        make_template().sheet("ASISTENCIA").unwrap().clone()
    }

    fn make_report() -> AttendanceReport {
        AttendanceReport::load(&make_all_files()).unwrap()
    }

    fn number(sheet: &Sheet, row: u32, column: &str) -> f64 {
        match sheet.get(row, col(column)) {
            CellValue::Number(f) => *f,
            other => panic!("expected a number in {column}{}, got {other:?}", row + 1),
        }
    }

    #[test]
    fn test_roster_metrics_per_track() {
        let mut sheet = make_sheet();
        let written = make_report().fill(&mut sheet);

        // LIMA, CUSCO and PUNO; the blank-key row is skipped
        assert_eq!(written, 3);

        assert_eq!(number(&sheet, 1, "F"), 30.0);
        assert_eq!(number(&sheet, 1, "G"), 26.0);
        assert_eq!(number(&sheet, 1, "I"), 1.0);
        assert_eq!(number(&sheet, 1, "J"), 3.0);
        assert_eq!(number(&sheet, 1, "S"), 0.0);

        assert_eq!(number(&sheet, 2, "F"), 5.0);
        assert_eq!(number(&sheet, 2, "S"), 2.0);
    }

    #[test]
    fn test_unknown_site_gets_zeros() {
        let mut sheet = make_sheet();
        make_report().fill(&mut sheet);

        for column in ASC_COLUMNS.iter().chain(&NOM_COLUMNS).chain(&ACC_COLUMNS) {
            assert_eq!(number(&sheet, 4, column), 0.0);
        }
    }

    #[test]
    fn test_blank_key_row_untouched() {
        let mut sheet = make_sheet();
        make_report().fill(&mut sheet);

        assert_eq!(sheet.get(3, col("F")), &CellValue::Empty);
        assert_eq!(sheet.get(3, col("R")), &CellValue::Empty);
        assert_eq!(sheet.text(3, col("A")), "sin sede");
    }

    #[test]
    fn test_formulas() {
        let mut sheet = make_sheet();
        make_report().fill(&mut sheet);

        assert_eq!(sheet.get(1, col("N")).as_text(), "=F2+J2");
        assert_eq!(sheet.get(1, col("Q")).as_text(), "=I2+M2");
        assert_eq!(sheet.get(1, col("R")).as_text(), "=IF($D2=$Q2,\"OK\",\"ERR\")");
        assert_eq!(sheet.get(4, col("W")).as_text(), "=S5");
        assert_eq!(sheet.get(4, col("AA")).as_text(), "=IF($Z5=0,\"OK\",\"ERR\")");
    }

    #[test]
    fn test_highlighting_covers_checks() {
        let mut sheet = make_sheet();
        make_report().fill(&mut sheet);

        let fills = sheet.conditional_fills();
        assert_eq!(fills.len(), 4);
        assert!(fills.iter().all(|f| f.first_row == 1 && f.last_row == 4));
        assert!(
            fills
                .iter()
                .any(|f| f.col == col("AA") && f.equals == "ERR" && f.color == ERR_FILL)
        );
        assert!(
            fills
                .iter()
                .any(|f| f.col == col("R") && f.equals == "OK" && f.color == OK_FILL)
        );
    }

    #[test]
    fn test_render_keeps_only_attendance_sheet() {
        let bytes = render(&xlsx(&make_template()), &make_report()).unwrap();
        let output = read_workbook(&bytes).unwrap();

        assert_eq!(output.sheet_names(), vec!["ASISTENCIA"]);
        let sheet = output.sheet("ASISTENCIA").unwrap();
        assert_eq!(sheet.get(1, col("F")), &CellValue::Number(30.0));
        assert_eq!(sheet.get(1, col("N")).as_text(), "=F2+J2");
    }

    #[test]
    fn test_generate_is_idempotent() {
        let template = xlsx(&make_template());
        let files = make_all_files();

        let first = generate(ReportKind::Attendance, &template, &files).unwrap();
        let second = generate(ReportKind::Attendance, &template, &files).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_rendered_highlighting_rules() {
        let bytes = render(&xlsx(&make_template()), &make_report()).unwrap();
        let sheet = part_text(&bytes, "xl/worksheets/sheet2.xml");

        assert_eq!(sheet.matches(r#"<conditionalFormatting sqref="R2:R5">"#).count(), 2);
        assert_eq!(sheet.matches(r#"<conditionalFormatting sqref="AA2:AA5">"#).count(), 2);
        assert!(sheet.contains("<formula>AA2=&quot;ERR&quot;</formula>"));
        assert!(part_text(&bytes, "xl/styles.xml").contains(r#"<fgColor rgb="FFFFC7CE"/>"#));
    }
}
