use crate::error::{EngineError, ValidationError};
use geo::{Geometry, MultiPolygon, Polygon};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use wkt::Wkt;

/// Identifier field the engine writes onto generated map units. Input
/// layers may not declare a column of this name.
pub const RESERVED_ID_FIELD: &str = "Feature";

/// Name of the WKT geometry column in tabular layer input.
pub const GEOMETRY_COLUMN: &str = "geometry";

/// Valid codes for the meadow classification, first code is the default
/// applied where no meadow feature covers an area.
pub const MEADOW_DOMAIN: &[&str] = &["No Meadow", "Altered", "Unaltered"];

pub const MEADOW_DEFAULT: &str = "No Meadow";
pub const DISTURBANCE_TYPE_DEFAULT: &str = "Indirect";
pub const DISTURBANCE_SUBTYPE_DEFAULT: &str = "No_Indirect_Dist";
pub const LAND_COVER_DEFAULT: &str = "Unclassified";

/// Attribute fields a categorical layer may carry onto map units. Field
/// access is through this key, never through runtime field-name strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Meadow,
    DisturbanceType,
    DisturbanceSubtype,
    LandCover,
}

impl FieldKey {
    pub fn column_name(self) -> &'static str {
        match self {
            FieldKey::Meadow => "Meadow",
            FieldKey::DisturbanceType => "Type",
            FieldKey::DisturbanceSubtype => "Subtype",
            FieldKey::LandCover => "Land_Cover",
        }
    }
}

/// A field carried forward by a layer, plus the default applied to any
/// area the layer does not cover.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub key: FieldKey,
    pub default: String,
}

impl FieldSpec {
    pub fn new(key: FieldKey, default: impl Into<String>) -> Self {
        Self {
            key,
            default: default.into(),
        }
    }
}

/// One polygon feature with its attribute values, aligned with the owning
/// layer's declared fields.
#[derive(Debug, Clone)]
pub struct PolygonFeature {
    pub geometry: MultiPolygon<f64>,
    pub values: Vec<String>,
}

/// A categorical polygon input layer with a statically declared schema.
#[derive(Debug, Clone)]
pub struct CategoricalLayer {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub features: Vec<PolygonFeature>,
}

impl CategoricalLayer {
    pub fn new(
        name: impl Into<String>,
        fields: Vec<FieldSpec>,
        features: Vec<PolygonFeature>,
    ) -> Result<Self, ValidationError> {
        let layer = Self {
            name: name.into(),
            fields,
            features,
        };
        layer.validate()?;
        Ok(layer)
    }

    /// Wet-meadow classification layer: carries `Meadow`, defaults to
    /// "No Meadow" outside its features.
    pub fn meadow(features: Vec<PolygonFeature>) -> Result<Self, ValidationError> {
        Self::new(
            "Meadow",
            vec![FieldSpec::new(FieldKey::Meadow, MEADOW_DEFAULT)],
            features,
        )
    }

    /// Anthropogenic disturbance layer: carries `Type` and `Subtype`;
    /// uncovered areas score as indirect-only disturbance.
    pub fn disturbance(features: Vec<PolygonFeature>) -> Result<Self, ValidationError> {
        Self::new(
            "Disturbance",
            vec![
                FieldSpec::new(FieldKey::DisturbanceType, DISTURBANCE_TYPE_DEFAULT),
                FieldSpec::new(FieldKey::DisturbanceSubtype, DISTURBANCE_SUBTYPE_DEFAULT),
            ],
            features,
        )
    }

    pub fn land_cover(features: Vec<PolygonFeature>) -> Result<Self, ValidationError> {
        Self::new(
            "Land_Cover",
            vec![FieldSpec::new(FieldKey::LandCover, LAND_COVER_DEFAULT)],
            features,
        )
    }

    /// Reads a layer from CSV with a WKT `geometry` column plus one column
    /// per declared field. Unknown columns are ignored, but a column named
    /// after the engine's reserved identifier field is rejected.
    pub fn from_csv_reader<R: Read>(
        name: impl Into<String>,
        fields: Vec<FieldSpec>,
        reader: R,
    ) -> Result<Self, EngineError> {
        let name = name.into();
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.iter().any(|header| header == RESERVED_ID_FIELD) {
            return Err(ValidationError::ReservedFieldName {
                layer: name,
                field: RESERVED_ID_FIELD.to_string(),
            }
            .into());
        }

        let geometry_index = column_index(&headers, GEOMETRY_COLUMN)
            .ok_or_else(|| ValidationError::MissingColumn {
                layer: name.clone(),
                column: GEOMETRY_COLUMN.to_string(),
            })?;
        let mut field_indices = Vec::with_capacity(fields.len());
        for field in &fields {
            let index = column_index(&headers, field.key.column_name()).ok_or_else(|| {
                ValidationError::MissingColumn {
                    layer: name.clone(),
                    column: field.key.column_name().to_string(),
                }
            })?;
            field_indices.push(index);
        }

        let mut features = Vec::new();
        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            let raw_geometry = record.get(geometry_index).unwrap_or_default();
            let geometry = parse_multi_polygon(&name, row, raw_geometry)?;
            let values = fields
                .iter()
                .zip(&field_indices)
                .map(|(field, &index)| {
                    let value = record.get(index).unwrap_or_default().trim();
                    if value.is_empty() {
                        // data gap: fall back to the declared default
                        field.default.clone()
                    } else {
                        value.to_string()
                    }
                })
                .collect();
            features.push(PolygonFeature { geometry, values });
        }

        Ok(Self::new(name, fields, features)?)
    }

    pub fn meadow_from_csv<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        Self::from_csv_path(
            "Meadow",
            vec![FieldSpec::new(FieldKey::Meadow, MEADOW_DEFAULT)],
            path,
        )
    }

    pub fn disturbance_from_csv<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        Self::from_csv_path(
            "Disturbance",
            vec![
                FieldSpec::new(FieldKey::DisturbanceType, DISTURBANCE_TYPE_DEFAULT),
                FieldSpec::new(FieldKey::DisturbanceSubtype, DISTURBANCE_SUBTYPE_DEFAULT),
            ],
            path,
        )
    }

    pub fn land_cover_from_csv<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        Self::from_csv_path(
            "Land_Cover",
            vec![FieldSpec::new(FieldKey::LandCover, LAND_COVER_DEFAULT)],
            path,
        )
    }

    pub fn from_csv_path<P: AsRef<Path>>(
        name: impl Into<String>,
        fields: Vec<FieldSpec>,
        path: P,
    ) -> Result<Self, EngineError> {
        let file = File::open(path)?;
        Self::from_csv_reader(name, fields, file)
    }

    /// True when the layer declares the given field.
    pub fn carries(&self, key: FieldKey) -> bool {
        self.fields.iter().any(|field| field.key == key)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        for (row, feature) in self.features.iter().enumerate() {
            debug_assert_eq!(feature.values.len(), self.fields.len());
            for (field, value) in self.fields.iter().zip(&feature.values) {
                if field.key == FieldKey::Meadow && !MEADOW_DOMAIN.contains(&value.as_str()) {
                    return Err(ValidationError::ValueOutsideDomain {
                        layer: self.name.clone(),
                        row,
                        field: field.key.column_name().to_string(),
                        value: value.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn column_index(headers: &csv::StringRecord, column: &str) -> Option<usize> {
    headers.iter().position(|header| header == column)
}

fn parse_multi_polygon(
    layer: &str,
    row: usize,
    raw: &str,
) -> Result<MultiPolygon<f64>, ValidationError> {
    let parsed = Wkt::<f64>::from_str(raw).map_err(|err| ValidationError::MalformedGeometry {
        layer: layer.to_string(),
        row,
        detail: err.to_string(),
    })?;
    let geometry =
        Geometry::<f64>::try_from(parsed).map_err(|err| ValidationError::MalformedGeometry {
            layer: layer.to_string(),
            row,
            detail: err.to_string(),
        })?;
    match geometry {
        Geometry::Polygon(polygon) => Ok(MultiPolygon(vec![polygon])),
        Geometry::MultiPolygon(multi) => Ok(multi),
        _ => Err(ValidationError::NotAPolygon {
            layer: layer.to_string(),
            row,
        }),
    }
}

/// Builds an axis-aligned rectangle; convenient for tests and synthetic
/// extents.
pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> MultiPolygon<f64> {
    let exterior = geo::LineString::from(vec![
        (min_x, min_y),
        (max_x, min_y),
        (max_x, max_y),
        (min_x, max_y),
        (min_x, min_y),
    ]);
    MultiPolygon(vec![Polygon::new(exterior, vec![])])
}
