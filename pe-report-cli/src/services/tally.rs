//! Category-matched inventory sums per (site, venue)

use std::collections::HashMap;

use crate::sources::inventory::Inventory;

use super::normalize::normalize_str;

/// How category labels are compared against patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryMatch {
    /// Lower-cased substring match
    CaseInsensitive,
    /// Substring match after full label normalization
    Normalized,
}

impl CategoryMatch {
    fn fold(&self, text: &str) -> String {
        match self {
            CategoryMatch::CaseInsensitive => text.to_lowercase(),
            CategoryMatch::Normalized => normalize_str(text),
        }
    }
}

/// Inventory rows grouped by their (site, venue) key
///
/// Keys are compared exactly, so callers decide beforehand whether the
/// inventory and the lookup keys are trimmed or normalized.
#[derive(Debug, Clone)]
pub struct InventoryIndex {
    mode: CategoryMatch,
    groups: HashMap<(String, String), Vec<(String, f64)>>,
}

impl InventoryIndex {
    pub fn new(inventory: &Inventory, mode: CategoryMatch) -> Self {
        let mut groups: HashMap<(String, String), Vec<(String, f64)>> = HashMap::new();
        for record in inventory.records() {
            groups
                .entry((record.site.clone(), record.venue.clone()))
                .or_default()
                .push((mode.fold(&record.category), record.count));
        }
        InventoryIndex { mode, groups }
    }

    /// Whether any row exists for the key
    pub fn contains(&self, site: &str, venue: &str) -> bool {
        self.groups
            .contains_key(&(site.to_string(), venue.to_string()))
    }

    /// Sum of counts whose category contains any of `patterns`
    ///
    /// A row matching several patterns is counted once. Unknown keys sum to 0.
    pub fn sum(&self, site: &str, venue: &str, patterns: &[&str]) -> f64 {
        let Some(rows) = self.groups.get(&(site.to_string(), venue.to_string())) else {
            return 0.0;
        };

        let patterns: Vec<String> = patterns.iter().map(|p| self.mode.fold(p)).collect();
        rows.iter()
            .filter(|(category, _)| patterns.iter().any(|p| category.contains(p.as_str())))
            .map(|(_, count)| count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::inventory::InventoryRecord;

    fn record(site: &str, venue: &str, category: &str, count: f64) -> InventoryRecord {
        InventoryRecord {
            site: site.to_string(),
            venue: venue.to_string(),
            category: category.to_string(),
            count,
        }
    }

    fn make_inventory() -> Inventory {
        vec![
            record("X", "1", "CUADERNILLO DE CONOCIMIENTOS PEDAGÓGICOS - FORMA A", 20.0),
            record("X", "1", "Cuadernillo de conocimientos pedagógicos - forma B", 10.0),
            record("X", "1", "FICHA DE RESPUESTA", 28.0),
            record("X", "1", "CUADERNILLO DE HABILIDADES GENERALES", 5.0),
            record("X", "2", "FICHA DE RESPUESTA", 7.0),
            record("Y", "1", "SOBRES", 3.0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_case_insensitive_sum() {
        let index = InventoryIndex::new(&make_inventory(), CategoryMatch::CaseInsensitive);

        assert_eq!(
            index.sum("X", "1", &["CUADERNILLO DE CONOCIMIENTOS PEDAGÓGICOS"]),
            30.0
        );
        assert_eq!(index.sum("X", "1", &["FICHA DE RESPUESTA"]), 28.0);
        assert_eq!(index.sum("X", "2", &["FICHA DE RESPUESTA"]), 7.0);
    }

    #[test]
    fn test_patterns_are_or_ed_without_double_counting() {
        let index = InventoryIndex::new(&make_inventory(), CategoryMatch::CaseInsensitive);

        assert_eq!(
            index.sum(
                "X",
                "1",
                &[
                    "CUADERNILLO DE CONOCIMIENTOS PEDAGÓGICOS",
                    "CUADERNILLO DE HABILIDADES GENERALES"
                ]
            ),
            35.0
        );
        assert_eq!(index.sum("Y", "1", &["SOBRES", "SOBRE"]), 3.0);
    }

    #[test]
    fn test_unknown_key_is_zero() {
        let index = InventoryIndex::new(&make_inventory(), CategoryMatch::CaseInsensitive);

        assert!(!index.contains("Z", "1"));
        assert_eq!(index.sum("Z", "1", &["FICHA DE RESPUESTA"]), 0.0);
        assert_eq!(index.sum("x", "1", &["FICHA DE RESPUESTA"]), 0.0);
    }

    #[test]
    fn test_normalized_patterns_match_accent_variants() {
        let inventory = make_inventory().normalized();
        let index = InventoryIndex::new(&inventory, CategoryMatch::Normalized);

        assert!(index.contains("x", "1"));
        assert_eq!(
            index.sum("x", "1", &["cuadernillo de conocimientos pedagog"]),
            30.0
        );
        assert_eq!(
            index.sum("x", "1", &["CUADERNILLO DE CONOCIMIENTOS PEDAGÓGICOS"]),
            30.0
        );
    }
}
