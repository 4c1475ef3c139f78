use clap::{Args, Parser, Subcommand};
use hqt_engine::config::{RunConfig, TelemetryConfig};
use hqt_engine::engine::{self, RunInputs};
use hqt_engine::error::EngineError;
use hqt_engine::layers::raster::Raster;
use hqt_engine::layers::vector::CategoricalLayer;
use hqt_engine::tables::{AttributeWeightTable, RemapTable};
use hqt_engine::telemetry;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "hqt-engine",
    about = "Derive scoring map units and credit/debit modifiers from habitat data layers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a full pipeline run and write the output table
    Run(RunArgs),
    /// Validate reference tables and input layers without producing output
    Check(InputArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Run configuration JSON (project type, SUI applicability, schema version)
    #[arg(long)]
    config: PathBuf,
    #[command(flatten)]
    inputs: InputArgs,
    /// Destination CSV path for the output table
    #[arg(long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Attribute weight table CSV (Category, Subtype, Weight)
    #[arg(long)]
    weights: PathBuf,
    /// Space Use Index remap CSV (LowerBound, UpperBound, Class)
    #[arg(long)]
    remap: PathBuf,
    /// Wet-meadow classification layer CSV
    #[arg(long)]
    meadow: Option<PathBuf>,
    /// Anthropogenic disturbance layer CSV
    #[arg(long)]
    disturbance: Option<PathBuf>,
    /// Land-cover layer CSV
    #[arg(long)]
    land_cover: Option<PathBuf>,
    /// Space Use Index surface, ESRI ASCII grid
    #[arg(long)]
    sui: Option<PathBuf>,
}

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("run failed: {err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), EngineError> {
    telemetry::init(&TelemetryConfig::from_env())?;
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run_pipeline(args),
        Command::Check(args) => run_check(args),
    }
}

fn run_pipeline(args: RunArgs) -> Result<(), EngineError> {
    let config = RunConfig::from_path(&args.config)?;
    let inputs = load_inputs(&args.inputs)?;

    let output = engine::run(&config, inputs)?;
    output.table.write_csv_path(&args.output)?;

    println!(
        "Scored {} map units ({} acres total) -> {}",
        output.report.unit_count,
        engine::format_number(output.report.total_acres),
        args.output.display()
    );
    Ok(())
}

fn run_check(args: InputArgs) -> Result<(), EngineError> {
    let inputs = load_inputs(&args)?;
    engine::check(&inputs)?;
    println!(
        "Inputs are valid: {} layers, {} weight rows, {} remap bands",
        inputs.layers.len(),
        inputs.weights.len(),
        inputs.remap.bands().len()
    );
    Ok(())
}

fn load_inputs(args: &InputArgs) -> Result<RunInputs, EngineError> {
    let weights = AttributeWeightTable::from_path(&args.weights)?;
    let remap = RemapTable::from_path(&args.remap)?;

    // layer order fixes overlay precedence: a later layer wins where
    // attributes disagree
    let mut layers = Vec::new();
    if let Some(path) = &args.land_cover {
        layers.push(CategoricalLayer::land_cover_from_csv(path)?);
    }
    if let Some(path) = &args.meadow {
        layers.push(CategoricalLayer::meadow_from_csv(path)?);
    }
    if let Some(path) = &args.disturbance {
        layers.push(CategoricalLayer::disturbance_from_csv(path)?);
    }

    let space_use_index = match &args.sui {
        Some(path) => Some(Raster::from_ascii_path(path)?),
        None => None,
    };

    Ok(RunInputs {
        layers,
        weights,
        remap,
        space_use_index,
    })
}
