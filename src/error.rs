use crate::config::ConfigError;
use crate::layers::raster::RasterError;
use crate::telemetry::TelemetryError;
use std::fmt;

/// Top-level error for an engine run. A run either completes with a
/// schema-correct output table or fails with exactly one of these.
#[derive(Debug)]
pub enum EngineError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Csv(csv::Error),
    Raster(RasterError),
    Validation(ValidationError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Config(err) => write!(f, "configuration error: {}", err),
            EngineError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            EngineError::Io(err) => write!(f, "io error: {}", err),
            EngineError::Csv(err) => write!(f, "invalid tabular data: {}", err),
            EngineError::Raster(err) => write!(f, "invalid raster data: {}", err),
            EngineError::Validation(err) => write!(f, "validation error: {}", err),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Config(err) => Some(err),
            EngineError::Telemetry(err) => Some(err),
            EngineError::Io(err) => Some(err),
            EngineError::Csv(err) => Some(err),
            EngineError::Raster(err) => Some(err),
            EngineError::Validation(err) => Some(err),
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for EngineError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for EngineError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for EngineError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<RasterError> for EngineError {
    fn from(value: RasterError) -> Self {
        Self::Raster(value)
    }
}

impl From<ValidationError> for EngineError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Fatal data-integrity failures. These identify the offending input and
/// are never retried or silently defaulted; gaps in optional coverage are
/// handled with declared defaults instead and never reach this type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("layer '{layer}' declares reserved field name '{field}'")]
    ReservedFieldName { layer: String, field: String },
    #[error("layer '{layer}' is missing required column '{column}'")]
    MissingColumn { layer: String, column: String },
    #[error("layer '{layer}' row {row}: cannot parse geometry: {detail}")]
    MalformedGeometry {
        layer: String,
        row: usize,
        detail: String,
    },
    #[error("layer '{layer}' row {row}: geometry must be a polygon or multipolygon")]
    NotAPolygon { layer: String, row: usize },
    #[error("layer '{layer}' row {row}: '{value}' is not a valid {field} code")]
    ValueOutsideDomain {
        layer: String,
        row: usize,
        field: String,
        value: String,
    },
    #[error("no weight row for category '{category}' subtype '{subtype}'")]
    UnresolvedSubtype { category: String, subtype: String },
    #[error("duplicate weight row for category '{category}' subtype '{subtype}'")]
    DuplicateWeightRow { category: String, subtype: String },
    #[error("attribute weight table contains no rows")]
    EmptyWeightTable,
    #[error("remap table contains no bands")]
    EmptyRemapTable,
    #[error("remap band {index} has lower bound {lower} not below upper bound {upper}")]
    InvertedRemapBand { index: usize, lower: f64, upper: f64 },
    #[error(
        "remap band {index} starts at {lower} but the previous band ends at {expected}; \
         bands must be contiguous"
    )]
    NonContiguousRemap {
        index: usize,
        lower: f64,
        expected: f64,
    },
    #[error("space use index value {value} is outside the declared remap range {lower}..{upper}")]
    SpaceUseIndexOutOfRange { value: f64, lower: f64, upper: f64 },
    #[error("input layers cover no area; cannot derive map units")]
    EmptyExtent,
}
