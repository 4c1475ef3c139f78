use crate::config::OutputSchemaVersion;
use crate::error::EngineError;
use crate::layers::vector::{
    DISTURBANCE_SUBTYPE_DEFAULT, DISTURBANCE_TYPE_DEFAULT, MEADOW_DEFAULT,
};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Columns of the published output schema. The intermediate attribute
/// rows address values through this enum only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputColumn {
    MapUnitId,
    Acres,
    Meadow,
    DisturbanceType,
    DisturbanceSubtype,
    DistLek,
    SuiMean,
    Modifier,
}

impl OutputColumn {
    pub fn name(self) -> &'static str {
        match self {
            OutputColumn::MapUnitId => "Map_Unit_ID",
            OutputColumn::Acres => "Acres",
            OutputColumn::Meadow => "Meadow",
            OutputColumn::DisturbanceType => "Disturbance_Type",
            OutputColumn::DisturbanceSubtype => "Disturbance_Subtype",
            OutputColumn::DistLek => "Dist_Lek",
            OutputColumn::SuiMean => "SUI_Mean",
            OutputColumn::Modifier => "Modifier",
        }
    }

    /// Value written when no source attribute supplied one.
    pub fn default_value(self) -> &'static str {
        match self {
            OutputColumn::MapUnitId => "0",
            OutputColumn::Acres => "0",
            OutputColumn::Meadow => MEADOW_DEFAULT,
            OutputColumn::DisturbanceType => DISTURBANCE_TYPE_DEFAULT,
            OutputColumn::DisturbanceSubtype => DISTURBANCE_SUBTYPE_DEFAULT,
            OutputColumn::DistLek => "",
            OutputColumn::SuiMean => "",
            OutputColumn::Modifier => "1",
        }
    }
}

/// Original schema revision: `Acres` trails the row.
pub const OUTPUT_SCHEMA_V1: &[OutputColumn] = &[
    OutputColumn::MapUnitId,
    OutputColumn::Meadow,
    OutputColumn::DisturbanceType,
    OutputColumn::DisturbanceSubtype,
    OutputColumn::DistLek,
    OutputColumn::SuiMean,
    OutputColumn::Modifier,
    OutputColumn::Acres,
];

/// Current schema revision: `Acres` moved to directly after the unit id.
pub const OUTPUT_SCHEMA_V2: &[OutputColumn] = &[
    OutputColumn::MapUnitId,
    OutputColumn::Acres,
    OutputColumn::Meadow,
    OutputColumn::DisturbanceType,
    OutputColumn::DisturbanceSubtype,
    OutputColumn::DistLek,
    OutputColumn::SuiMean,
    OutputColumn::Modifier,
];

pub fn schema_for(version: OutputSchemaVersion) -> &'static [OutputColumn] {
    match version {
        OutputSchemaVersion::V1 => OUTPUT_SCHEMA_V1,
        OutputSchemaVersion::V2 => OUTPUT_SCHEMA_V2,
    }
}

/// One map unit's wide intermediate attributes, keyed by unit id. A stage
/// contributes only the columns it resolved; everything else stays absent
/// until the output projection applies column defaults.
#[derive(Debug, Clone, Default)]
pub struct AttributeRow {
    pub unit_id: u32,
    values: BTreeMap<OutputColumn, String>,
}

impl AttributeRow {
    pub fn new(unit_id: u32) -> Self {
        Self {
            unit_id,
            values: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, column: OutputColumn, value: impl Into<String>) {
        self.values.insert(column, value.into());
    }

    pub fn get(&self, column: OutputColumn) -> Option<&str> {
        self.values.get(&column).map(String::as_str)
    }
}

/// Attribute rows projected onto the target schema but not yet defaulted:
/// absent values are still distinguishable so tables produced from
/// different stages merge without defaults masking real values.
#[derive(Debug, Clone)]
pub struct SimplifiedTable {
    schema: &'static [OutputColumn],
    rows: BTreeMap<u32, Vec<Option<String>>>,
}

/// Projects one stage's rows down to the target columns. Runs once per
/// input table so peak memory stays near the largest single table instead
/// of the sum of all of them.
pub fn simplify_table(rows: &[AttributeRow], schema: &'static [OutputColumn]) -> SimplifiedTable {
    let mut simplified = BTreeMap::new();
    for row in rows {
        let values = schema
            .iter()
            .map(|column| row.get(*column).map(str::to_string))
            .collect();
        simplified.insert(row.unit_id, values);
    }
    debug!(rows = simplified.len(), "simplified attribute table");
    SimplifiedTable {
        schema,
        rows: simplified,
    }
}

impl SimplifiedTable {
    pub fn empty(schema: &'static [OutputColumn]) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
        }
    }

    /// Merges another simplified table into this one. A value present in
    /// `other` overrides one already held; an absent value never clears a
    /// present one, so merge order only matters where both tables carry a
    /// value for the same cell.
    pub fn merge(mut self, other: SimplifiedTable) -> SimplifiedTable {
        debug_assert_eq!(self.schema, other.schema);
        for (unit_id, incoming) in other.rows {
            match self.rows.get_mut(&unit_id) {
                Some(existing) => {
                    for (slot, value) in existing.iter_mut().zip(incoming) {
                        if value.is_some() {
                            *slot = value;
                        }
                    }
                }
                None => {
                    self.rows.insert(unit_id, incoming);
                }
            }
        }
        self
    }

    /// Applies column defaults and fixes the column order, producing the
    /// table that gets persisted.
    pub fn into_output(self) -> OutputTable {
        let schema = self.schema;
        let rows = self
            .rows
            .into_values()
            .map(|values| {
                schema
                    .iter()
                    .zip(values)
                    .map(|(column, value)| value.unwrap_or_else(|| column.default_value().to_string()))
                    .collect()
            })
            .collect();
        OutputTable { schema, rows }
    }
}

/// The final schema-exact table, ordered by unit id.
#[derive(Debug, Clone)]
pub struct OutputTable {
    schema: &'static [OutputColumn],
    rows: Vec<Vec<String>>,
}

impl OutputTable {
    pub fn headers(&self) -> Vec<&'static str> {
        self.schema.iter().map(|column| column.name()).collect()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), EngineError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(self.headers())?;
        for row in &self.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Writes through a sibling temporary file and renames it into place,
    /// so a failed run leaves no partial output at the target path.
    pub fn write_csv_path<P: AsRef<Path>>(&self, path: P) -> Result<(), EngineError> {
        let path = path.as_ref();
        let mut temp_path = path.as_os_str().to_owned();
        temp_path.push(".tmp");
        let temp_path = Path::new(&temp_path);

        let file = fs::File::create(temp_path)?;
        if let Err(err) = self.write_csv(file) {
            let _ = fs::remove_file(temp_path);
            return Err(err);
        }
        fs::rename(temp_path, path)?;
        info!(path = %path.display(), rows = self.rows.len(), "wrote output table");
        Ok(())
    }
}
