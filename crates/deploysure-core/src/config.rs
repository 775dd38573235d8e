//! Configuration schema (deploysure.toml)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::ident::{Ident, IdentError};

/// Warehouse connection settings
///
/// There is no password field: an unknown key fails the parse,
/// so credentials can only arrive through flags or the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Account identifier (e.g. `xy12345.us-east-1`)
    #[serde(default)]
    pub account: Option<String>,

    /// Login name
    #[serde(default)]
    pub user: Option<String>,

    /// Virtual warehouse to run queries on
    #[serde(default)]
    pub warehouse: Option<String>,

    /// Role to assume
    #[serde(default)]
    pub role: Option<String>,
}

/// Names of the externally owned catalog tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Table holding the SQL test cases
    #[serde(default = "default_test_cases_table")]
    pub test_cases_table: String,

    /// Table holding the KPI definitions
    #[serde(default = "default_kpi_table")]
    pub kpi_table: String,

    /// Table name the KPI templates refer to
    #[serde(default = "default_kpi_source_table")]
    pub kpi_source_table: String,
}

fn default_test_cases_table() -> String {
    "TEST_CASES".to_string()
}

fn default_kpi_table() -> String {
    "ORDER_KPIS".to_string()
}

fn default_kpi_source_table() -> String {
    "ORDER_DATA".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            test_cases_table: default_test_cases_table(),
            kpi_table: default_kpi_table(),
            kpi_source_table: default_kpi_source_table(),
        }
    }
}

impl CatalogConfig {
    /// Validate the configured names
    pub fn names(&self) -> Result<CatalogNames, ConfigError> {
        let ident = |raw: &str| {
            Ident::from_user_input(raw).map_err(|e: IdentError| ConfigError::Invalid(e.to_string()))
        };

        Ok(CatalogNames {
            test_cases: ident(&self.test_cases_table)?,
            kpis: ident(&self.kpi_table)?,
            kpi_source: ident(&self.kpi_source_table)?,
        })
    }
}

/// Validated catalog table names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogNames {
    pub test_cases: Ident,
    pub kpis: Ident,
    pub kpi_source: Ident,
}

impl CatalogNames {
    /// Whether a table is one of the catalog tables rather than data
    pub fn is_catalog_table(&self, table: &str) -> bool {
        self.test_cases.eq_ignore_case(table) || self.kpis.eq_ignore_case(table)
    }
}

impl Default for CatalogNames {
    fn default() -> Self {
        // The defaults are plain upper-case identifiers
        Self {
            test_cases: Ident(default_test_cases_table()),
            kpis: Ident(default_kpi_table()),
            kpi_source: Ident(default_kpi_source_table()),
        }
    }
}

/// Default data quality battery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Run the row count check
    #[serde(default = "enabled")]
    pub row_count: bool,

    /// Minimum number of rows for the row count check
    #[serde(default = "default_min_rows")]
    pub min_rows: u64,

    /// Run the duplicate row check
    #[serde(default = "enabled")]
    pub duplicate_rows: bool,
}

fn enabled() -> bool {
    true
}

fn default_min_rows() -> u64 {
    1
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            row_count: true,
            min_rows: default_min_rows(),
            duplicate_rows: true,
        }
    }
}

/// CSV export settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory for exported CSV files; no export when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub quality: QualityConfig,

    #[serde(default)]
    pub export: ExportConfig,

    /// Directory of the loaded config file (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Export directory resolved against the config file location
    pub fn export_dir(&self) -> Option<PathBuf> {
        self.export.dir.as_ref().map(|dir| {
            if dir.is_relative() {
                self.project_root.join(dir)
            } else {
                dir.clone()
            }
        })
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}
