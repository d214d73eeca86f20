//! Configuration: TOML file, environment overrides and output naming

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::reports::ReportKind;

pub const ENV_TEMPLATE: &str = "PE_REPORT_TEMPLATE";
pub const ENV_OUTPUT_DIR: &str = "PE_REPORT_OUTPUT_DIR";
pub const ENV_PREFIX: &str = "PE_REPORT_PREFIX";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base workbook with the ASISTENCIA, OP1 and OP2 sheets
    pub template: PathBuf,
    /// Where generated workbooks are written
    pub output_dir: PathBuf,
    /// File name prefix, e.g. `PE - Reporte` gives `PE - Reporte_OP1.xlsx`
    pub output_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            template: PathBuf::from("plantillas").join("PE3 - Reporte.xlsx"),
            output_dir: PathBuf::from("."),
            output_prefix: "PE - Reporte".to_string(),
        }
    }
}

impl Config {
    /// `<config dir>/pe-report/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pe-report").join("config.toml"))
    }

    /// Load from `path`, or from the default location when it exists, then
    /// apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Override fields from environment variables; empty values are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(template) = value(ENV_TEMPLATE) {
            self.template = PathBuf::from(template);
        }
        if let Some(dir) = value(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(prefix) = value(ENV_PREFIX) {
            self.output_prefix = prefix;
        }
    }

    /// Output file of a single report
    pub fn output_path(&self, kind: ReportKind) -> PathBuf {
        self.output_dir
            .join(format!("{}{}", self.output_prefix, kind.file_suffix()))
    }

    /// Output file of the combined workbook
    pub fn combined_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_Final.xlsx", self.output_prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(
            config.output_path(ReportKind::Op1),
            PathBuf::from(".").join("PE - Reporte_OP1.xlsx")
        );
        assert_eq!(
            config.combined_path(),
            PathBuf::from(".").join("PE - Reporte_Final.xlsx")
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "output_prefix = \"PE4\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.output_prefix, "PE4");
        assert_eq!(config.template, Config::default().template);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "output_prefix = [").unwrap();

        assert!(Config::from_file(file.path()).is_err());
        assert!(Config::from_file(Path::new("/nonexistent/pe-report.toml")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_TEMPLATE, "base.xlsx"),
            (ENV_OUTPUT_DIR, "out"),
            (ENV_PREFIX, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.template, PathBuf::from("base.xlsx"));
        assert_eq!(
            config.output_path(ReportKind::Attendance),
            PathBuf::from("out").join("PE - Reporte_ASISTENCIA.xlsx")
        );
    }

    #[test]
    fn test_round_trip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            template: PathBuf::from("t.xlsx"),
            output_dir: PathBuf::from("salida"),
            output_prefix: "X".to_string(),
        };
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
    }
}
