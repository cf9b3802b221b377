#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;

use survboard::codec::{FeatureLayout, PatientRecord};
use survboard::model::{ModelStore, SurvivalModel};
use survboard::render::{
    ChartSpec, build_form, chart_series, headline_metrics, read_patients, summary_table, write_curves_tsv,
    write_summary_tsv,
};
use survboard::session::{DEFAULT_MODEL_NAME, DisplayMode, Session};

#[derive(Clone, Copy, ValueEnum)]
pub enum DisplayCli {
    /// Chart only the most recent patient
    Single,
    /// Chart every patient in the session
    Multiple,
}

impl From<DisplayCli> for DisplayMode {
    fn from(value: DisplayCli) -> Self {
        match value {
            DisplayCli::Single => DisplayMode::Single,
            DisplayCli::Multiple => DisplayMode::Multiple,
        }
    }
}

#[derive(Args)]
pub struct PredictArgs {
    /// Name of the survival model; loads <MODEL_DIR>/<MODEL>.toml
    #[arg(long, default_value = DEFAULT_MODEL_NAME)]
    pub model: String,

    /// Directory holding model files
    #[arg(long, default_value = "models")]
    pub model_dir: PathBuf,

    /// Attribute selection for a single patient, e.g. --set "Stage=III" (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE", conflicts_with = "patients")]
    pub assignments: Vec<String>,

    /// TSV file with one patient per row and attribute names as the header
    #[arg(long, value_name = "PATH")]
    pub patients: Option<PathBuf>,

    /// Which curves the chart export contains
    #[arg(long, value_enum, default_value_t = DisplayCli::Multiple)]
    pub display: DisplayCli,

    /// Write the per-patient summary table to this TSV file
    #[arg(long, value_name = "PATH")]
    pub summary_out: Option<PathBuf>,

    /// Write the survival curves (Patients, Time, Survival) to this TSV file
    #[arg(long, value_name = "PATH")]
    pub curves_out: Option<PathBuf>,
}

#[derive(Parser)]
#[command(
    name = "survboard",
    about = "Survival probability estimates for ovarian clear cell carcinoma patients",
    long_about = "Encodes a patient's staging and treatment attributes, runs a pretrained \
                 survival model and reports the survival curve with 1, 3 and 5-year \
                 survival probabilities. This model is a research subject; its accuracy \
                 cannot be guaranteed."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the patient attributes, their permitted values and defaults
    #[command(about = "List patient attributes and permitted values")]
    Schema,

    /// Predict survival for one or more patients
    #[command(about = "Predict survival curves (optional outputs: summary and curve TSV files)")]
    Predict(PredictArgs),

    /// Display version and build information
    #[command(about = "Display version and build information")]
    Version,
}

fn run_schema() -> Result<(), Box<dyn std::error::Error>> {
    let layout = FeatureLayout::ovarian_clear_cell()?;
    for field in build_form(layout.schema()) {
        print!("{field}");
    }
    println!();
    println!("Model input order: {}", layout.required_order().join(", "));
    Ok(())
}

fn predict(args: PredictArgs) -> Result<(), Box<dyn std::error::Error>> {
    let layout = FeatureLayout::ovarian_clear_cell()?;

    let mut store = ModelStore::new(&args.model_dir);
    let model = store.get(&args.model)?;
    model.check_layout(&layout)?;
    println!(
        "Loaded {} model '{}' ({} monthly time steps)",
        model.family(),
        model.name(),
        model.num_time_steps()
    );

    let mut session = Session::new(&args.model);
    session.set_display(args.display.into());

    match &args.patients {
        Some(path) => {
            println!("Loading patients from: {}", path.display());
            let records = read_patients(path, layout.schema())?;
            let count = session.submit_batch(records, &layout, model.as_ref())?;
            println!("Predicted survival for {count} patients");
        }
        None => {
            let mut record = PatientRecord::defaults(layout.schema());
            for assignment in &args.assignments {
                record.apply_assignment(layout.schema(), assignment)?;
            }
            session.submit(record, &layout, model.as_ref())?;
        }
    }

    println!();
    println!("Model: {}", session.model_name());
    for metric in headline_metrics(&session) {
        println!("{}: {}", metric.label, metric.value);
    }
    println!();

    let table = summary_table(&session, &layout);
    println!("{}", table.to_text());

    if let Some(path) = &args.summary_out {
        write_summary_tsv(path, &table)?;
        println!("Summary saved to: {}", path.display());
    }
    if let Some(path) = &args.curves_out {
        let chart = ChartSpec::SURVIVAL;
        write_curves_tsv(path, &chart_series(&session))?;
        println!(
            "{} ({} vs {}) saved to: {}",
            chart.title,
            chart.y_label,
            chart.x_label,
            path.display()
        );
    }

    Ok(())
}

fn print_version_info() {
    let version = env!("CARGO_PKG_VERSION");
    let build_timestamp: u64 = env!("SURVBOARD_BUILD_TIMESTAMP").parse().unwrap_or(0);

    println!("survboard {version}");
    if build_timestamp > 0 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let hours = now.saturating_sub(build_timestamp) as f64 / 3600.0;
        println!("Built: {hours:.1} hours ago");
    } else {
        println!("Built: unknown");
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Schema) => run_schema(),
        Some(Commands::Predict(args)) => predict(args),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
        None => {
            let printed = Cli::command().print_help();
            println!();
            printed.map_err(Into::into)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
