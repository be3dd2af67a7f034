//! Cycle CLI - Command-line interface for Synheart Cycle
//!
//! Commands:
//! - predict: Predict the next period and fertility window
//! - insights: Print cycle and symptom insights
//! - report: Emit the full forecast report (JSON)
//! - ingest: Convert device samples or remote rows into history JSON
//! - validate: Check a history file

use chrono::{Local, NaiveDate};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use synheart_cycle::encoder::ForecastEncoder;
use synheart_cycle::insights::generate_insights_with;
use synheart_cycle::pipeline::{
    health_samples_to_history, merge_sources_to_history, parse_history, remote_periods_to_history,
};
use synheart_cycle::types::{parse_date, CycleHistory};
use synheart_cycle::{build_snapshot, CycleError, OvulationAnchor, CYCLE_VERSION};

/// Cycle - On-device menstrual cycle prediction engine
#[derive(Parser)]
#[command(name = "cycle")]
#[command(author = "Synheart AI Inc")]
#[command(version = CYCLE_VERSION)]
#[command(about = "Predict periods and fertility windows from cycle history", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the next period and fertility window
    Predict {
        /// History JSON file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Day to predict for (YYYY-MM-DD, defaults to the local date)
        #[arg(long, value_parser = parse_today)]
        today: Option<NaiveDate>,

        /// How the ovulation date is anchored
        #[arg(long, value_enum, default_value = "next-period")]
        ovulation_anchor: AnchorArg,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print cycle and symptom insights
    Insights {
        /// History JSON file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Day to compute insights for (YYYY-MM-DD, defaults to the local date)
        #[arg(long, value_parser = parse_today)]
        today: Option<NaiveDate>,

        /// How the ovulation date is anchored
        #[arg(long, value_enum, default_value = "next-period")]
        ovulation_anchor: AnchorArg,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Emit the full forecast report as JSON
    Report {
        /// History JSON file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Day to forecast for (YYYY-MM-DD, defaults to the local date)
        #[arg(long, value_parser = parse_today)]
        today: Option<NaiveDate>,

        /// How the ovulation date is anchored
        #[arg(long, value_enum, default_value = "next-period")]
        ovulation_anchor: AnchorArg,
    },

    /// Convert source data into history JSON
    Ingest {
        /// Source format of the input
        #[arg(long, value_enum)]
        source: SourceFormat,

        /// Source file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Device flow samples to merge with remote rows (remote source only, - for stdin)
        #[arg(long)]
        merge_samples: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Validate a history file
    Validate {
        /// History JSON file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AnchorArg {
    /// Ovulation 14 days before the predicted next period
    NextPeriod,
    /// Ovulation 14 days after today
    TodayPivot,
}

impl From<AnchorArg> for OvulationAnchor {
    fn from(arg: AnchorArg) -> Self {
        match arg {
            AnchorArg::NextPeriod => OvulationAnchor::NextPeriod,
            AnchorArg::TodayPivot => OvulationAnchor::TodayPivot,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceFormat {
    /// Device health flow samples
    Samples,
    /// Remote period rows
    Remote,
}

fn parse_today(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Install a stderr subscriber; `RUST_LOG` overrides the verbosity flag
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (e.g. in tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run(command: Commands) -> Result<(), CycleCliError> {
    match command {
        Commands::Predict {
            input,
            today,
            ovulation_anchor,
            json,
        } => cmd_predict(&input, resolve_today(today), ovulation_anchor.into(), json),

        Commands::Insights {
            input,
            today,
            ovulation_anchor,
            json,
        } => cmd_insights(&input, resolve_today(today), ovulation_anchor.into(), json),

        Commands::Report {
            input,
            output,
            today,
            ovulation_anchor,
        } => cmd_report(&input, &output, resolve_today(today), ovulation_anchor.into()),

        Commands::Ingest {
            source,
            input,
            merge_samples,
            output,
        } => cmd_ingest(source, &input, merge_samples.as_deref(), &output),

        Commands::Validate { input, json } => cmd_validate(&input, json),
    }
}

fn resolve_today(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Local::now().date_naive())
}

fn cmd_predict(
    input: &Path,
    today: NaiveDate,
    anchor: OvulationAnchor,
    json: bool,
) -> Result<(), CycleCliError> {
    let history = load_history(input)?;
    let snapshot = build_snapshot(&history, today, anchor);

    if json {
        let body = serde_json::json!({
            "computed_for": snapshot.computed_for,
            "prediction": snapshot.prediction,
            "fertility": snapshot.fertility,
            "in_fertile_window": snapshot.in_fertile_window,
            "current_cycle_day": snapshot.current_cycle_day,
            "phase": snapshot.phase,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let prediction = &snapshot.prediction;
    let fertility = &snapshot.fertility;

    println!("Cycle Prediction ({})", today);
    println!("=============================");
    println!("Next period:     {}", prediction.predicted_date);
    println!(
        "Likely range:    {} to {}",
        prediction.interval_low, prediction.interval_high
    );
    println!(
        "Confidence:      {} ({:.0}%)",
        prediction.confidence_label,
        prediction.confidence * 100.0
    );
    println!("Reasoning:       {}", prediction.reasoning);
    println!();
    println!("Ovulation:       {}", fertility.ovulation_date);
    println!(
        "Fertile window:  {} to {}{}",
        fertility.fertile_start,
        fertility.fertile_end,
        if snapshot.in_fertile_window { " (today is inside)" } else { "" }
    );

    if let (Some(day), Some(phase)) = (snapshot.current_cycle_day, snapshot.phase) {
        println!();
        println!("Cycle day:       {} ({})", day, phase.as_str());
        println!("                 {}", phase.description());
    }

    Ok(())
}

fn cmd_insights(
    input: &Path,
    today: NaiveDate,
    anchor: OvulationAnchor,
    json: bool,
) -> Result<(), CycleCliError> {
    let history = load_history(input)?;
    let insights = generate_insights_with(&history.periods, &history.symptoms, today, anchor);

    if json {
        println!("{}", serde_json::to_string_pretty(&insights)?);
        return Ok(());
    }

    println!("Cycle Insights");
    println!("==============");
    for line in &insights.cycle_insights {
        println!("  - {}", line);
    }

    if !insights.health_correlations.is_empty() {
        println!("\nHealth Correlations");
        println!("===================");
        for line in &insights.health_correlations {
            println!("  - {}", line);
        }
    }

    Ok(())
}

fn cmd_report(
    input: &Path,
    output: &Path,
    today: NaiveDate,
    anchor: OvulationAnchor,
) -> Result<(), CycleCliError> {
    let history = load_history(input)?;
    let snapshot = build_snapshot(&history, today, anchor);
    let report = ForecastEncoder::new().encode_to_json(&history, &snapshot)?;
    write_output(output, &report)
}

fn cmd_ingest(
    source: SourceFormat,
    input: &Path,
    merge_samples: Option<&Path>,
    output: &Path,
) -> Result<(), CycleCliError> {
    if merge_samples.is_some_and(is_stdin) && is_stdin(input) {
        return Err(CycleCliError::Usage(
            "only one of --input and --merge-samples can read stdin".to_string(),
        ));
    }
    let input_data = read_input(input)?;

    let history_json = match (source, merge_samples) {
        (SourceFormat::Samples, None) => health_samples_to_history(&input_data)?,
        (SourceFormat::Samples, Some(_)) => {
            return Err(CycleCliError::Usage(
                "--merge-samples requires --source remote".to_string(),
            ))
        }
        (SourceFormat::Remote, None) => remote_periods_to_history(&input_data)?,
        (SourceFormat::Remote, Some(samples_path)) => {
            let samples = read_input(samples_path)?;
            merge_sources_to_history(&input_data, &samples)?
        }
    };

    let history: CycleHistory = serde_json::from_str(&history_json)?;
    if history.periods.is_empty() {
        return Err(CycleCliError::NoPeriods);
    }

    write_output(output, &serde_json::to_string_pretty(&history)?)
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), CycleCliError> {
    let input_data = read_input(input)?;

    let (report, failed) = match parse_history(&input_data) {
        Ok(history) => {
            let first = history.periods.first().map(|p| p.start_date);
            let last = history.periods.last().map(|p| p.start_date);
            (
                ValidationReport {
                    valid: true,
                    period_count: history.periods.len(),
                    symptom_count: history.symptoms.len(),
                    first_period_start: first,
                    last_period_start: last,
                    error: None,
                },
                false,
            )
        }
        Err(e) => (
            ValidationReport {
                valid: false,
                period_count: 0,
                symptom_count: 0,
                first_period_start: None,
                last_period_start: None,
                error: Some(e.to_string()),
            },
            true,
        ),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Valid:    {}", report.valid);
        println!("Periods:  {}", report.period_count);
        println!("Symptoms: {}", report.symptom_count);
        if let (Some(first), Some(last)) = (report.first_period_start, report.last_period_start) {
            println!("Span:     {} to {}", first, last);
        }
        if let Some(err) = &report.error {
            println!("\nError: {}", err);
        }
    }

    if failed {
        Err(CycleCliError::ValidationFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn is_stdin(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_input(input: &Path) -> Result<String, CycleCliError> {
    if is_stdin(input) {
        if atty::is(atty::Stream::Stdin) {
            return Err(CycleCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_history(input: &Path) -> Result<CycleHistory, CycleCliError> {
    Ok(parse_history(&read_input(input)?)?)
}

fn write_output(output: &Path, data: &str) -> Result<(), CycleCliError> {
    if is_stdin(output) {
        println!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum CycleCliError {
    Io(io::Error),
    Cycle(CycleError),
    Json(serde_json::Error),
    NoInput,
    NoPeriods,
    ValidationFailed,
    Usage(String),
}

impl From<io::Error> for CycleCliError {
    fn from(e: io::Error) -> Self {
        CycleCliError::Io(e)
    }
}

impl From<CycleError> for CycleCliError {
    fn from(e: CycleError) -> Self {
        CycleCliError::Cycle(e)
    }
}

impl From<serde_json::Error> for CycleCliError {
    fn from(e: serde_json::Error) -> Self {
        CycleCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CycleCliError> for CliError {
    fn from(e: CycleCliError) -> Self {
        match e {
            CycleCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CycleCliError::Cycle(e) => {
                let (code, hint) = match &e {
                    CycleError::DuplicateId(_) | CycleError::UnknownId(_) => {
                        ("RECORD_ERROR", "Record ids must be unique")
                    }
                    CycleError::InvalidRecord(_) => {
                        ("INVALID_RECORD", "Periods need a 1-31 day duration and a distinct start date")
                    }
                    CycleError::DateParseError(_) => ("DATE_ERROR", "Use YYYY-MM-DD dates"),
                    _ => ("PARSE_ERROR", "Run 'cycle validate' for details"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            CycleCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CycleCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a terminal; nothing to read".to_string(),
                hint: Some("Pipe a file in or pass --input <path>".to_string()),
            },
            CycleCliError::NoPeriods => CliError {
                code: "NO_PERIODS".to_string(),
                message: "No periods found in input".to_string(),
                hint: Some("Ensure the source contains flow days or period rows".to_string()),
            },
            CycleCliError::ValidationFailed => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: "History failed validation".to_string(),
                hint: Some("Fix the reported error and retry".to_string()),
            },
            CycleCliError::Usage(msg) => CliError {
                code: "USAGE_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'cycle ingest --help'".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    valid: bool,
    period_count: usize,
    symptom_count: usize,
    first_period_start: Option<NaiveDate>,
    last_period_start: Option<NaiveDate>,
    error: Option<String>,
}
