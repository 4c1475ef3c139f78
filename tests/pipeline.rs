use hqt_engine::config::{OutputSchemaVersion, ProjectType, RunConfig, SuiApplicability};
use hqt_engine::engine::{self, RunInputs, RunOutput};
use hqt_engine::error::{EngineError, ValidationError};
use hqt_engine::layers::raster::Raster;
use hqt_engine::layers::vector::{rectangle, CategoricalLayer, PolygonFeature};
use hqt_engine::tables::{AttributeWeightTable, RemapTable};
use std::io::Cursor;

const EXTENT_SQUARE_METERS: f64 = 10_000.0;

fn weights() -> AttributeWeightTable {
    let csv = "Category,Subtype,Weight\n\
               Railways,Railway,0.1\n\
               Indirect,No_Indirect_Dist,0.0\n";
    AttributeWeightTable::from_reader(Cursor::new(csv)).expect("weight table loads")
}

fn remap() -> RemapTable {
    let csv = "LowerBound,UpperBound,Class\n\
               0.0,0.25,1\n\
               0.25,0.5,2\n\
               0.5,0.75,3\n\
               0.75,1.0,4\n";
    RemapTable::from_reader(Cursor::new(csv)).expect("remap table loads")
}

/// Layer A: meadow "Unaltered" over the full 100 m x 100 m extent.
fn full_meadow() -> CategoricalLayer {
    CategoricalLayer::meadow(vec![PolygonFeature {
        geometry: rectangle(0.0, 0.0, 100.0, 100.0),
        values: vec!["Unaltered".to_string()],
    }])
    .expect("meadow layer is valid")
}

/// Layer B: a railway strip covering 10% of the extent.
fn railway_strip(subtype: &str) -> CategoricalLayer {
    CategoricalLayer::disturbance(vec![PolygonFeature {
        geometry: rectangle(0.0, 0.0, 10.0, 100.0),
        values: vec!["Railways".to_string(), subtype.to_string()],
    }])
    .expect("disturbance layer is valid")
}

/// Uniform Space Use Index surface covering the extent.
fn uniform_sui(value: f64) -> Raster {
    Raster::new(10, 10, 0.0, 0.0, 10.0, vec![Some(value); 100]).expect("raster is valid")
}

fn inputs(sui: Option<Raster>) -> RunInputs {
    RunInputs {
        layers: vec![full_meadow(), railway_strip("Railway")],
        weights: weights(),
        remap: remap(),
        space_use_index: sui,
    }
}

fn column<'a>(output: &'a RunOutput, row: usize, name: &str) -> &'a str {
    let index = output
        .table
        .headers()
        .iter()
        .position(|header| *header == name)
        .unwrap_or_else(|| panic!("output schema has no column '{name}'"));
    &output.table.rows()[row][index]
}

fn row_for_subtype(output: &RunOutput, subtype: &str) -> usize {
    (0..output.table.rows().len())
        .find(|row| column(output, *row, "Disturbance_Subtype") == subtype)
        .unwrap_or_else(|| panic!("no output row with subtype '{subtype}'"))
}

#[test]
fn overlapping_layers_yield_the_ninety_ten_split() {
    let config = RunConfig::new(ProjectType::Debit);
    let output = engine::run(&config, inputs(None)).expect("run completes");

    assert_eq!(output.report.unit_count, 2);
    let total_area: f64 = output
        .units
        .iter()
        .map(|unit| geo::Area::unsigned_area(&unit.geometry))
        .sum();
    assert!((total_area - EXTENT_SQUARE_METERS).abs() < 1e-6);

    let railway = row_for_subtype(&output, "Railway");
    let remainder = row_for_subtype(&output, "No_Indirect_Dist");

    assert_eq!(column(&output, railway, "Meadow"), "Unaltered");
    assert_eq!(column(&output, railway, "Disturbance_Type"), "Railways");
    assert_eq!(column(&output, remainder, "Meadow"), "Unaltered");
    assert_eq!(column(&output, remainder, "Disturbance_Type"), "Indirect");

    let railway_acres: f64 = column(&output, railway, "Acres").parse().expect("acres");
    let remainder_acres: f64 = column(&output, remainder, "Acres").parse().expect("acres");
    let ratio = railway_acres / (railway_acres + remainder_acres);
    assert!((ratio - 0.1).abs() < 1e-6);
}

#[test]
fn debit_run_with_sui_multiplies_both_terms() {
    let mut config = RunConfig::new(ProjectType::Debit);
    config.sui_applies_to = SuiApplicability::DebitOnly;
    let output = engine::run(&config, inputs(Some(uniform_sui(0.05)))).expect("run completes");

    let railway = row_for_subtype(&output, "Railway");
    let modifier: f64 = column(&output, railway, "Modifier").parse().expect("modifier");
    assert!((modifier - 1.155).abs() < 1e-9);
    assert_eq!(column(&output, railway, "SUI_Mean"), "0.05");
    assert_eq!(column(&output, railway, "Dist_Lek"), "1");
}

#[test]
fn debit_run_without_sui_excludes_the_term() {
    let config = RunConfig::new(ProjectType::Debit);
    let output = engine::run(&config, inputs(None)).expect("run completes");

    let railway = row_for_subtype(&output, "Railway");
    let modifier: f64 = column(&output, railway, "Modifier").parse().expect("modifier");
    assert!((modifier - 1.1).abs() < 1e-9);
    // the column still exists with its default; only the term is excluded
    assert_eq!(column(&output, railway, "SUI_Mean"), "");
}

#[test]
fn credit_run_skips_sui_unless_applicability_is_broadened() {
    let mut config = RunConfig::new(ProjectType::Credit);
    config.sui_applies_to = SuiApplicability::DebitOnly;
    let output = engine::run(&config, inputs(Some(uniform_sui(0.05)))).expect("run completes");
    let railway = row_for_subtype(&output, "Railway");
    let modifier: f64 = column(&output, railway, "Modifier").parse().expect("modifier");
    assert!((modifier - 1.1).abs() < 1e-9);

    let mut config = RunConfig::new(ProjectType::Credit);
    config.sui_applies_to = SuiApplicability::CreditAndDebit;
    let output = engine::run(&config, inputs(Some(uniform_sui(0.05)))).expect("run completes");
    let railway = row_for_subtype(&output, "Railway");
    let modifier: f64 = column(&output, railway, "Modifier").parse().expect("modifier");
    assert!((modifier - 1.155).abs() < 1e-9);
}

#[test]
fn misspelled_subtype_fails_the_run_with_the_offending_pair() {
    let config = RunConfig::new(ProjectType::Debit);
    let inputs = RunInputs {
        layers: vec![full_meadow(), railway_strip("Railwy")],
        weights: weights(),
        remap: remap(),
        space_use_index: None,
    };
    let error = engine::run(&config, inputs).expect_err("expected lookup failure");
    match error {
        EngineError::Validation(ValidationError::UnresolvedSubtype { category, subtype }) => {
            assert_eq!(category, "Railways");
            assert_eq!(subtype, "Railwy");
        }
        other => panic!("expected unresolved subtype, got {other:?}"),
    }
}

#[test]
fn failed_run_writes_no_output_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let target = dir.path().join("output.csv");

    let config = RunConfig::new(ProjectType::Debit);
    let inputs = RunInputs {
        layers: vec![full_meadow(), railway_strip("Railwy")],
        weights: weights(),
        remap: remap(),
        space_use_index: None,
    };
    let result = engine::run(&config, inputs).and_then(|output| {
        output.table.write_csv_path(&target)?;
        Ok(output)
    });
    assert!(result.is_err());
    assert!(!target.exists());
}

#[test]
fn schema_versions_declare_different_column_orders() {
    let mut config = RunConfig::new(ProjectType::Debit);
    config.schema_version = OutputSchemaVersion::V2;
    let output = engine::run(&config, inputs(None)).expect("run completes");
    assert_eq!(
        output.table.headers(),
        vec![
            "Map_Unit_ID",
            "Acres",
            "Meadow",
            "Disturbance_Type",
            "Disturbance_Subtype",
            "Dist_Lek",
            "SUI_Mean",
            "Modifier",
        ]
    );

    config.schema_version = OutputSchemaVersion::V1;
    let output = engine::run(&config, inputs(None)).expect("run completes");
    assert_eq!(
        output.table.headers(),
        vec![
            "Map_Unit_ID",
            "Meadow",
            "Disturbance_Type",
            "Disturbance_Subtype",
            "Dist_Lek",
            "SUI_Mean",
            "Modifier",
            "Acres",
        ]
    );
}

#[test]
fn uncovered_meadow_area_defaults_instead_of_going_null() {
    // meadow covers only the west half; the disturbance strip sits east
    let meadow = CategoricalLayer::meadow(vec![PolygonFeature {
        geometry: rectangle(0.0, 0.0, 50.0, 100.0),
        values: vec!["Unaltered".to_string()],
    }])
    .expect("meadow layer is valid");
    let disturbance = CategoricalLayer::disturbance(vec![PolygonFeature {
        geometry: rectangle(90.0, 0.0, 100.0, 100.0),
        values: vec!["Railways".to_string(), "Railway".to_string()],
    }])
    .expect("disturbance layer is valid");

    let config = RunConfig::new(ProjectType::Debit);
    let inputs = RunInputs {
        layers: vec![meadow, disturbance],
        weights: weights(),
        remap: remap(),
        space_use_index: None,
    };
    let output = engine::run(&config, inputs).expect("run completes");

    let railway = row_for_subtype(&output, "Railway");
    assert_eq!(column(&output, railway, "Meadow"), "No Meadow");
    for row in 0..output.table.rows().len() {
        assert!(!column(&output, row, "Meadow").is_empty());
    }
}

#[test]
fn check_validates_inputs_without_running_the_overlay() {
    engine::check(&inputs(None)).expect("valid inputs pass");

    let bad = RunInputs {
        layers: vec![railway_strip("Railwy")],
        weights: weights(),
        remap: remap(),
        space_use_index: None,
    };
    let error = engine::check(&bad).expect_err("expected lookup failure");
    assert!(matches!(
        error,
        EngineError::Validation(ValidationError::UnresolvedSubtype { .. })
    ));
}
