//! Applicant roster aggregation
//!
//! Roster exports start with a numbering column whose header cell is `N`.
//! The site column is found heuristically and the four attendance metrics
//! are summed per site.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::error::ReportError;
use crate::excel::{CellValue, read_first_sheet_grid};

use super::table::Table;

/// Header text of the first column in roster exports
pub const ROSTER_ANCHOR: &str = "N";

/// Canonical name given to the detected site column
pub const SITE_COLUMN: &str = "Sede";

/// Fragments that identify the site column (matched on lower-cased names)
const SITE_COLUMN_HINTS: [&str; 4] = ["sede", "operativa", "evaluación", "aplicación"];

/// Attendance metric columns of a roster, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RosterMetric {
    Applicants,
    LocalAttendance,
    RoomAttendance,
    Inconsistencies,
}

impl RosterMetric {
    pub const ALL: [RosterMetric; 4] = [
        RosterMetric::Applicants,
        RosterMetric::LocalAttendance,
        RosterMetric::RoomAttendance,
        RosterMetric::Inconsistencies,
    ];

    /// Exact header text of the metric column
    pub fn column_name(&self) -> &'static str {
        match self {
            RosterMetric::Applicants => "Postulantes",
            RosterMetric::LocalAttendance => "Asistencia al Local",
            RosterMetric::RoomAttendance => "Asistencia en Aula",
            RosterMetric::Inconsistencies => "Casos de inconsistencia",
        }
    }
}

/// Per-site sums of the metrics present in one roster
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterTotals {
    metrics: Vec<RosterMetric>,
    sites: BTreeMap<String, BTreeMap<RosterMetric, f64>>,
}

impl RosterTotals {
    /// Read and aggregate a roster workbook
    pub fn from_xlsx(bytes: &[u8]) -> Result<Self> {
        let grid = read_first_sheet_grid(bytes)?;
        let totals = load_roster(grid).context("Failed to load applicant roster")?;
        for metric in RosterMetric::ALL {
            if !totals.metrics().contains(&metric) {
                log::warn!("Roster has no '{}' column, reporting 0", metric.column_name());
            }
        }
        log::debug!("Roster aggregated over {} sites", totals.site_count());
        Ok(totals)
    }

    /// Metrics that had a column in the source
    pub fn metrics(&self) -> &[RosterMetric] {
        &self.metrics
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Sum for a site and metric; `None` when the metric column was absent
    pub fn metric(&self, site: &str, metric: RosterMetric) -> Option<f64> {
        self.sites.get(site)?.get(&metric).copied()
    }

    /// Sum for a site and metric, zero for unknown sites or absent metrics
    pub fn get(&self, site: &str, metric: RosterMetric) -> f64 {
        self.metric(site, metric).unwrap_or(0.0)
    }
}

/// Index of the first row whose column A upper-cases to exactly `N`
pub fn find_roster_header(rows: &[Vec<CellValue>]) -> Result<usize, ReportError> {
    rows.iter()
        .position(|row| {
            row.first()
                .is_some_and(|cell| cell.as_text().to_uppercase() == ROSTER_ANCHOR)
        })
        .ok_or_else(|| ReportError::HeaderNotFound {
            anchor: ROSTER_ANCHOR.to_string(),
        })
}

/// Index of the first column whose name hints at the site
pub fn detect_site_column(columns: &[String]) -> Result<usize, ReportError> {
    columns
        .iter()
        .position(|name| {
            let lower = name.to_lowercase();
            SITE_COLUMN_HINTS.iter().any(|hint| lower.contains(hint))
        })
        .ok_or(ReportError::MissingSiteColumn)
}

/// Aggregate a raw roster grid into per-site totals
pub fn load_roster(rows: Vec<Vec<CellValue>>) -> Result<RosterTotals, ReportError> {
    let header_idx = find_roster_header(&rows)?;
    let mut table = Table::from_grid(rows, header_idx, false);

    let site_col = detect_site_column(table.columns())?;
    table.rename_column(site_col, SITE_COLUMN);
    log::debug!(
        "Roster header at row {}, site column {}",
        header_idx + 1,
        site_col + 1
    );

    let metric_cols: Vec<(RosterMetric, usize)> = RosterMetric::ALL
        .iter()
        .filter_map(|m| table.column_index(m.column_name()).map(|idx| (*m, idx)))
        .collect();

    let mut totals = RosterTotals {
        metrics: metric_cols.iter().map(|(m, _)| *m).collect(),
        sites: BTreeMap::new(),
    };

    for row in 0..table.rows().len() {
        let site = table.value(row, site_col).as_text().trim().to_string();
        if site.is_empty() {
            continue;
        }

        let entry = totals.sites.entry(site).or_default();
        for (metric, col) in &metric_cols {
            *entry.entry(*metric).or_insert(0.0) += table.value(row, *col).number_or_zero();
        }
    }

    Ok(totals)
}
