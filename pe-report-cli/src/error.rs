//! Engine error taxonomy
//!
//! Every variant is recoverable: the caller reports it and keeps whatever
//! output it generated before.

/// Error raised while reading sources or preparing a report sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// No row carries the expected header anchor
    HeaderNotFound { anchor: String },
    /// Roster header has no column that looks like a site column
    MissingSiteColumn,
    /// Source table lacks columns the report needs
    MissingRequiredColumns { missing: Vec<String> },
    /// Template workbook lacks the report's target sheet
    MissingSheet { sheet: String },
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::HeaderNotFound { anchor } => {
                write!(f, "no header row containing '{}' was found", anchor)
            }
            ReportError::MissingSiteColumn => {
                write!(f, "no valid site column found in the roster header")
            }
            ReportError::MissingRequiredColumns { missing } => {
                write!(f, "missing required columns: {}", missing.join(", "))
            }
            ReportError::MissingSheet { sheet } => {
                write!(f, "template has no sheet named '{}'", sheet)
            }
        }
    }
}

impl std::error::Error for ReportError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_missing_columns() {
        let err = ReportError::MissingRequiredColumns {
            missing: vec!["Local".to_string(), "Tipo".to_string()],
        };
        assert_eq!(err.to_string(), "missing required columns: Local, Tipo");
    }

    #[test]
    fn test_error_survives_anyhow_round_trip() {
        let err: anyhow::Error = ReportError::MissingSheet {
            sheet: "OP1".to_string(),
        }
        .into();
        let err = err.context("Failed to prepare template");

        assert_eq!(
            err.downcast_ref::<ReportError>(),
            Some(&ReportError::MissingSheet {
                sheet: "OP1".to_string()
            })
        );
    }
}
