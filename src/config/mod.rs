use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Whether the run prices a debit (impact) or credit (conservation) project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectType {
    Credit,
    Debit,
}

/// Which project types the Space Use Index term applies to. An earlier
/// revision of the scoring method applied SUI to debit projects only; a
/// later revision applies it to both. Both behaviors stay testable by
/// declaring the active one per run instead of branching on a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuiApplicability {
    DebitOnly,
    CreditAndDebit,
}

impl SuiApplicability {
    pub fn applies_to(self, project_type: ProjectType) -> bool {
        match self {
            SuiApplicability::DebitOnly => project_type == ProjectType::Debit,
            SuiApplicability::CreditAndDebit => true,
        }
    }
}

/// Published output schema revision. Column order is a compatibility
/// contract with the downstream spreadsheet calculators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputSchemaVersion {
    V1,
    V2,
}

/// Immutable configuration for a single run. Every stage receives this
/// explicitly; no stage reads ambient or global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub project_type: ProjectType,
    #[serde(default = "default_sui_applicability")]
    pub sui_applies_to: SuiApplicability,
    #[serde(default = "default_schema_version")]
    pub schema_version: OutputSchemaVersion,
    #[serde(default = "default_minimum_unit_acres")]
    pub minimum_unit_acres: f64,
}

fn default_sui_applicability() -> SuiApplicability {
    SuiApplicability::DebitOnly
}

fn default_schema_version() -> OutputSchemaVersion {
    OutputSchemaVersion::V2
}

fn default_minimum_unit_acres() -> f64 {
    0.0
}

impl RunConfig {
    pub fn new(project_type: ProjectType) -> Self {
        Self {
            project_type,
            sui_applies_to: default_sui_applicability(),
            schema_version: default_schema_version(),
            minimum_unit_acres: default_minimum_unit_acres(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Environment wins over the document for operational knobs, the
    /// same precedence the telemetry settings use.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw) = env::var("HQT_MINIMUM_UNIT_ACRES") {
            self.minimum_unit_acres =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnvOverride {
                        name: "HQT_MINIMUM_UNIT_ACRES",
                        value: raw,
                    })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.minimum_unit_acres < 0.0 || !self.minimum_unit_acres.is_finite() {
            return Err(ConfigError::InvalidMinimumUnitAcres(self.minimum_unit_acres));
        }
        Ok(())
    }
}

/// Tracing controls, resolved from the environment the way the service
/// configuration does.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let log_level = env::var("HQT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        Self { log_level }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read run configuration {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("run configuration {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("minimum_unit_acres must be a non-negative finite number, got {0}")]
    InvalidMinimumUnitAcres(f64),
    #[error("environment override {name} is not a number: '{value}'")]
    InvalidEnvOverride { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sui_applicability_gates_by_project_type() {
        assert!(SuiApplicability::DebitOnly.applies_to(ProjectType::Debit));
        assert!(!SuiApplicability::DebitOnly.applies_to(ProjectType::Credit));
        assert!(SuiApplicability::CreditAndDebit.applies_to(ProjectType::Credit));
        assert!(SuiApplicability::CreditAndDebit.applies_to(ProjectType::Debit));
    }

    #[test]
    fn from_path_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"project_type":"Debit"}}"#).expect("write config");
        let config = RunConfig::from_path(file.path()).expect("config loads");
        assert_eq!(config.project_type, ProjectType::Debit);
        assert_eq!(config.sui_applies_to, SuiApplicability::DebitOnly);
        assert_eq!(config.schema_version, OutputSchemaVersion::V2);
        assert_eq!(config.minimum_unit_acres, 0.0);
    }

    #[test]
    fn from_path_rejects_negative_minimum_area() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"project_type":"Credit","minimum_unit_acres":-1.0}}"#
        )
        .expect("write config");
        let error = RunConfig::from_path(file.path()).expect_err("expected rejection");
        assert!(matches!(error, ConfigError::InvalidMinimumUnitAcres(_)));
    }
}
