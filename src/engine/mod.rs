pub mod classify;
pub mod map_units;
pub mod modifiers;
pub mod simplify;
pub mod zonal;

pub use classify::DisturbanceClassifier;
pub use map_units::{MapUnit, MapUnitGenerator};
pub use modifiers::{ModifierCalculator, ModifierTerm};
pub use simplify::{schema_for, AttributeRow, OutputColumn, OutputTable};
pub use zonal::Statistic;

use crate::config::RunConfig;
use crate::error::EngineError;
use crate::layers::raster::Raster;
use crate::layers::vector::{CategoricalLayer, FieldKey};
use crate::tables::{AttributeWeightTable, RemapTable};
use chrono::{DateTime, Utc};
use simplify::simplify_table;
use tracing::info;

/// Everything one run consumes, resolved before the first stage starts.
/// The Space Use Index surface is optional; scoring terms that depend on
/// it are excluded when it is absent.
pub struct RunInputs {
    pub layers: Vec<CategoricalLayer>,
    pub weights: AttributeWeightTable,
    pub remap: RemapTable,
    pub space_use_index: Option<Raster>,
}

/// Completion summary, logged and returned alongside the output table.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub unit_count: usize,
    pub total_acres: f64,
}

#[derive(Debug)]
pub struct RunOutput {
    pub table: OutputTable,
    pub units: Vec<MapUnit>,
    pub report: RunReport,
}

/// Executes the full pipeline in dependency order: overlay, classify,
/// aggregate, score, simplify. Single-threaded and batch-oriented; the
/// run either returns a complete schema-correct table or fails with one
/// named error.
pub fn run(config: &RunConfig, inputs: RunInputs) -> Result<RunOutput, EngineError> {
    let started_at = Utc::now();
    info!(
        project_type = ?config.project_type,
        layers = inputs.layers.len(),
        sui_supplied = inputs.space_use_index.is_some(),
        "starting run"
    );

    let mut units =
        MapUnitGenerator::new(config.minimum_unit_acres).generate(&inputs.layers)?;

    if let Some(surface) = &inputs.space_use_index {
        let classifier = DisturbanceClassifier::new(&inputs.remap);
        let has_disturbance = inputs
            .layers
            .iter()
            .any(|layer| layer.carries(FieldKey::DisturbanceSubtype) && !layer.features.is_empty());
        let classes = if has_disturbance {
            classifier.classify(surface)?
        } else {
            classifier.neutral(surface)
        };
        for unit in &mut units {
            unit.space_use_index =
                zonal::summarize_continuous(surface, &unit.geometry, Statistic::Mean);
            unit.dist_lek_class = zonal::summarize_classes(&classes, &unit.geometry);
        }
        info!("attached space use index statistics");
    }

    let calculator =
        ModifierCalculator::new(&inputs.weights, config.project_type, config.sui_applies_to);
    let terms = ModifierCalculator::standard_terms();
    for unit in &mut units {
        unit.modifier = Some(calculator.calculate(unit, &terms)?);
    }
    // units are read-only from here on

    let schema = schema_for(config.schema_version);
    let mut combined = simplify_table(&identity_rows(&units), schema);
    for layer in &inputs.layers {
        let rows = layer_rows(&units, layer);
        combined = combined.merge(simplify_table(&rows, schema));
    }
    combined = combined.merge(simplify_table(&scoring_rows(&units), schema));
    let table = combined.into_output();

    let total_acres: f64 = units.iter().map(MapUnit::acres).sum();
    let finished_at = Utc::now();
    let report = RunReport {
        started_at,
        finished_at,
        unit_count: units.len(),
        total_acres,
    };
    info!(
        units = report.unit_count,
        total_acres = format_number(report.total_acres).as_str(),
        elapsed_ms = (finished_at - started_at).num_milliseconds(),
        "run complete"
    );

    Ok(RunOutput {
        table,
        units,
        report,
    })
}

/// Validation-only pass: loads nothing new, exercises every lookup the
/// run would perform, touches no outputs.
pub fn check(inputs: &RunInputs) -> Result<(), EngineError> {
    for layer in &inputs.layers {
        info!(layer = %layer.name, features = layer.features.len(), "layer is valid");
    }
    for layer in &inputs.layers {
        if !layer.carries(FieldKey::DisturbanceSubtype) {
            continue;
        }
        let type_index = layer
            .fields
            .iter()
            .position(|field| field.key == FieldKey::DisturbanceType);
        let subtype_index = layer
            .fields
            .iter()
            .position(|field| field.key == FieldKey::DisturbanceSubtype);
        let (Some(type_index), Some(subtype_index)) = (type_index, subtype_index) else {
            continue;
        };
        for feature in &layer.features {
            inputs
                .weights
                .weight(&feature.values[type_index], &feature.values[subtype_index])?;
        }
    }
    info!(
        weight_rows = inputs.weights.len(),
        remap_bands = inputs.remap.bands().len(),
        "reference tables are valid"
    );
    Ok(())
}

fn identity_rows(units: &[MapUnit]) -> Vec<AttributeRow> {
    units
        .iter()
        .map(|unit| {
            let mut row = AttributeRow::new(unit.id);
            row.set(OutputColumn::MapUnitId, unit.id.to_string());
            row.set(OutputColumn::Acres, format_number(unit.acres()));
            row
        })
        .collect()
}

/// Rows carrying only the columns this layer contributes, so the
/// simplifier can run per input layer instead of over one merged table.
fn layer_rows(units: &[MapUnit], layer: &CategoricalLayer) -> Vec<AttributeRow> {
    units
        .iter()
        .map(|unit| {
            let mut row = AttributeRow::new(unit.id);
            for field in &layer.fields {
                let Some(column) = output_column_for(field.key) else {
                    continue;
                };
                if let Some(value) = unit.attrs.get(field.key) {
                    row.set(column, value);
                }
            }
            row
        })
        .collect()
}

fn scoring_rows(units: &[MapUnit]) -> Vec<AttributeRow> {
    units
        .iter()
        .map(|unit| {
            let mut row = AttributeRow::new(unit.id);
            if let Some(class) = unit.dist_lek_class {
                row.set(OutputColumn::DistLek, class.to_string());
            }
            if let Some(sui) = unit.space_use_index {
                row.set(OutputColumn::SuiMean, format_number(sui));
            }
            if let Some(modifier) = unit.modifier {
                row.set(OutputColumn::Modifier, format_number(modifier));
            }
            row
        })
        .collect()
}

/// Columns the published schema keeps; anything else a layer carries is
/// dropped by the simplifier.
fn output_column_for(key: FieldKey) -> Option<OutputColumn> {
    match key {
        FieldKey::Meadow => Some(OutputColumn::Meadow),
        FieldKey::DisturbanceType => Some(OutputColumn::DisturbanceType),
        FieldKey::DisturbanceSubtype => Some(OutputColumn::DisturbanceSubtype),
        FieldKey::LandCover => None,
    }
}

/// Fixed-precision rendering with trailing zeros trimmed, so output
/// values are stable across platforms.
pub fn format_number(value: f64) -> String {
    let rendered = format!("{value:.6}");
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
