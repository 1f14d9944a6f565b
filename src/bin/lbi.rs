//! lbi CLI - Command-line interface for the life balance index engine
//!
//! Commands:
//! - import: Load a normalized wearable CSV and refresh each imported day
//! - checkin / wearable: Record one day's inputs
//! - refresh / explain: Recompute or explain a day
//! - analytics / consistency / patterns: Summaries over the stored history
//! - train / predict: Personal next-day risk models
//! - export: Research exports
//! - doctor: Diagnose store and configuration health

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use balance_index::analytics::{render, ReportFormat};
use balance_index::store::{FileKv, KvRepository, KvStore, RECORDS_KEY};
use balance_index::types::{CheckIn, ContextTag, DeepWorkMins, Level, StressIndicators, WearableMetrics};
use balance_index::{BalanceEngine, BalanceError, EngineConfig, ENGINE_VERSION};

type FileEngine = BalanceEngine<KvRepository<FileKv>>;

/// lbi - Life balance index from wearables and daily check-ins
#[derive(Parser)]
#[command(name = "lbi")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score, plan and explain daily balance", long_about = None)]
struct Cli {
    /// Directory holding the JSON store
    #[arg(long, global = true, default_value = ".lbi")]
    store: PathBuf,

    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a normalized wearable CSV (use - for stdin)
    Import {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Record a daily check-in
    Checkin {
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Mood 1-4
        #[arg(long)]
        mood: u8,

        /// Energy 1-4
        #[arg(long)]
        energy: Option<u8>,

        /// Active stress indicators
        #[arg(long, value_enum, value_delimiter = ',')]
        stress: Vec<StressFlag>,

        #[arg(long)]
        caffeine_after_2pm: bool,

        #[arg(long)]
        alcohol: bool,

        /// Deep work minutes (0, 15, 30, 60, 90, 120)
        #[arg(long)]
        deep_work: Option<u16>,

        /// Context tags (illness, travel, late_meal, alcohol, acute_stress, menstrual_cycle)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Record wearable metrics for a day
    Wearable {
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        recovery: f64,

        #[arg(long)]
        sleep_hours: f64,

        #[arg(long)]
        strain: Option<f64>,

        #[arg(long)]
        hrv: Option<f64>,

        #[arg(long)]
        rhr: Option<f64>,
    },

    /// Recompute a day's index and plan
    Refresh {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Explain a day's index
    Explain {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Descriptive statistics and correlations
    Analytics {
        #[arg(long, value_enum, default_value = "markdown")]
        format: AnalyticsFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Consistency score over the trailing window
    Consistency {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Patterns mined from recent history
    Patterns {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Train the next-day risk models if enough history exists
    Train,

    /// Predict tomorrow's risk with the stored models
    Predict,

    /// Export records and plans
    Export {
        #[arg(value_enum)]
        kind: ExportKind,

        /// Most recent days to include (0 for all)
        #[arg(long, default_value = "30")]
        days: usize,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Diagnose store and configuration health
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StressFlag {
    MuscleTension,
    RacingThoughts,
    Irritability,
    Avoidance,
    Restlessness,
}

#[derive(Clone, Copy, ValueEnum)]
enum AnalyticsFormat {
    Csv,
    Markdown,
    Json,
}

impl From<AnalyticsFormat> for ReportFormat {
    fn from(format: AnalyticsFormat) -> Self {
        match format {
            AnalyticsFormat::Csv => ReportFormat::Csv,
            AnalyticsFormat::Markdown => ReportFormat::Markdown,
            AnalyticsFormat::Json => ReportFormat::Json,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    /// Flat daily CSV
    Daily,
    /// Saved plans as JSON
    Plans,
    /// Records and plans together as JSON
    Research,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
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

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), LbiCliError> {
    if let Commands::Doctor { json } = cli.command {
        return cmd_doctor(&cli.store, cli.config.as_deref(), json);
    }

    let engine = open_engine(&cli.store, cli.config.as_deref())?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Import { input } => {
            let summary = engine.import_wearable_csv(&read_input(&input)?)?;
            print_json(&summary)
        }

        Commands::Checkin {
            date,
            mood,
            energy,
            stress,
            caffeine_after_2pm,
            alcohol,
            deep_work,
            tags,
            notes,
        } => {
            let check_in = build_check_in(mood, energy, &stress, caffeine_after_2pm, alcohol, deep_work, &tags, notes)?;
            let refresh = engine.record_check_in(date.unwrap_or(today), check_in)?;
            print_json(&refresh)
        }

        Commands::Wearable {
            date,
            recovery,
            sleep_hours,
            strain,
            hrv,
            rhr,
        } => {
            let wearable = WearableMetrics {
                recovery,
                sleep_hours,
                strain,
                hrv,
                resting_hr: rhr,
            };
            let refresh = engine.record_wearable(date.unwrap_or(today), wearable, None)?;
            print_json(&refresh)
        }

        Commands::Refresh { date } => {
            let date = date.unwrap_or(today);
            match engine.refresh_day(date)? {
                Some(refresh) => print_json(&refresh),
                None => Err(LbiCliError::NoWearable(date)),
            }
        }

        Commands::Explain { date } => print_json(&engine.explain_day(date.unwrap_or(today))?),

        Commands::Analytics { format, output } => {
            let summary = engine.analytics()?;
            let text = render(&summary, format.into())?;
            write_output(output.as_deref(), &text)
        }

        Commands::Consistency { date } => print_json(&engine.consistency(date.unwrap_or(today))?),

        Commands::Patterns { date } => print_json(&engine.patterns(date.unwrap_or(today))?),

        Commands::Train => print_json(&engine.train_if_ready()?),

        Commands::Predict => print_json(&engine.predict_tomorrow()?),

        Commands::Export { kind, days, output } => {
            let text = match kind {
                ExportKind::Daily => engine.export_daily_csv(days)?,
                ExportKind::Plans => engine.export_plans_json(days)?,
                ExportKind::Research => engine.export_research_json(days)?,
            };
            write_output(output.as_deref(), &text)
        }

        Commands::Doctor { .. } => Ok(()),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, LbiCliError> {
    match path {
        Some(p) => Ok(EngineConfig::from_path(p)?),
        None => Ok(EngineConfig::default()),
    }
}

fn open_engine(store: &Path, config: Option<&Path>) -> Result<FileEngine, LbiCliError> {
    let config = load_config(config)?;
    let kv = FileKv::open(store)?;
    info!(store = %store.display(), "opened store");
    Ok(BalanceEngine::new(KvRepository::new(kv), config))
}

#[allow(clippy::too_many_arguments)]
fn build_check_in(
    mood: u8,
    energy: Option<u8>,
    stress: &[StressFlag],
    caffeine_after_2pm: bool,
    alcohol: bool,
    deep_work: Option<u16>,
    tags: &[String],
    notes: Option<String>,
) -> Result<CheckIn, LbiCliError> {
    let level = |value: u8, name: &str| {
        Level::new(value).ok_or_else(|| LbiCliError::InvalidArgument(format!("{name} must be between 1 and 4")))
    };

    let mut indicators = StressIndicators::default();
    for flag in stress {
        match flag {
            StressFlag::MuscleTension => indicators.muscle_tension = true,
            StressFlag::RacingThoughts => indicators.racing_thoughts = true,
            StressFlag::Irritability => indicators.irritability = true,
            StressFlag::Avoidance => indicators.avoidance = true,
            StressFlag::Restlessness => indicators.restlessness = true,
        }
    }

    let mut check_in = CheckIn::new(level(mood, "mood")?, indicators);
    check_in.energy = energy.map(|e| level(e, "energy")).transpose()?;
    check_in.caffeine_after_2pm = Some(caffeine_after_2pm);
    check_in.alcohol = Some(alcohol);
    check_in.deep_work_mins = deep_work
        .map(|m| {
            DeepWorkMins::new(m).ok_or_else(|| {
                LbiCliError::InvalidArgument(format!("deep work must be one of {:?}", DeepWorkMins::ALLOWED))
            })
        })
        .transpose()?;
    check_in.context_tags = tags
        .iter()
        .map(|t| {
            serde_json::from_value::<ContextTag>(serde_json::Value::String(t.trim().to_string()))
                .map_err(|_| LbiCliError::InvalidArgument(format!("unknown context tag: {t}")))
        })
        .collect::<Result<_, _>>()?;
    check_in.notes = notes.filter(|n| !n.trim().is_empty());
    Ok(check_in)
}

fn read_input(input: &Path) -> Result<String, LbiCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: Option<&Path>, text: &str) -> Result<(), LbiCliError> {
    match output {
        Some(path) if path.to_string_lossy() != "-" => {
            fs::write(path, text)?;
            info!(path = %path.display(), bytes = text.len(), "wrote output");
        }
        _ => println!("{text}"),
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), LbiCliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_doctor(store: &Path, config: Option<&Path>, json: bool) -> Result<(), LbiCliError> {
    let mut checks = Vec::new();

    checks.push(match load_config(config) {
        Ok(_) => DoctorCheck::new(
            "config",
            CheckStatus::Ok,
            match config {
                Some(p) => format!("Config valid: {}", p.display()),
                None => "Using default configuration".to_string(),
            },
        ),
        Err(e) => DoctorCheck::new("config", CheckStatus::Error, CliError::from(e).message),
    });

    if store.exists() {
        match FileKv::open(store).and_then(|kv| kv.get_item(RECORDS_KEY)) {
            Ok(Some(raw)) => match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(serde_json::Value::Object(map)) => checks.push(DoctorCheck::new(
                    "records",
                    CheckStatus::Ok,
                    format!("Record store valid ({} days)", map.len()),
                )),
                Ok(_) | Err(_) => checks.push(DoctorCheck::new(
                    "records",
                    CheckStatus::Warning,
                    "Record store is corrupt; it will be backed up and reset on next write".to_string(),
                )),
            },
            Ok(None) => checks.push(DoctorCheck::new(
                "records",
                CheckStatus::Ok,
                "Record store is empty".to_string(),
            )),
            Err(e) => checks.push(DoctorCheck::new(
                "records",
                CheckStatus::Error,
                format!("Cannot read store: {e}"),
            )),
        }
    } else {
        checks.push(DoctorCheck::new(
            "store",
            CheckStatus::Warning,
            format!("Store directory {} does not exist yet", store.display()),
        ));
    }

    checks.push(DoctorCheck::new(
        "stdin",
        CheckStatus::Ok,
        if atty::is(atty::Stream::Stdin) {
            "stdin is a TTY (interactive mode)".to_string()
        } else {
            "stdin is a pipe (CSV import ready)".to_string()
        },
    ));

    let report = DoctorReport {
        version: ENGINE_VERSION.to_string(),
        store: store.display().to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("lbi Doctor Report");
        println!("=================");
        println!("Version: {}", report.version);
        println!("Store:   {}", report.store);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    if report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error)) {
        Err(LbiCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum LbiCliError {
    Io(io::Error),
    Engine(BalanceError),
    Json(serde_json::Error),
    InvalidArgument(String),
    NoWearable(NaiveDate),
    DoctorFailed,
}

impl From<io::Error> for LbiCliError {
    fn from(e: io::Error) -> Self {
        LbiCliError::Io(e)
    }
}

impl From<BalanceError> for LbiCliError {
    fn from(e: BalanceError) -> Self {
        LbiCliError::Engine(e)
    }
}

impl From<serde_json::Error> for LbiCliError {
    fn from(e: serde_json::Error) -> Self {
        LbiCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: &str, message: String, hint: &str) -> Self {
        Self {
            code: code.to_string(),
            message,
            hint: Some(hint.to_string()),
        }
    }
}

impl From<LbiCliError> for CliError {
    fn from(e: LbiCliError) -> Self {
        match e {
            LbiCliError::Io(e) => CliError::new("IO_ERROR", e.to_string(), "Check file paths and permissions"),
            LbiCliError::Engine(BalanceError::ImportRejected(msg)) => CliError::new(
                "IMPORT_REJECTED",
                msg,
                "Expected header: date,sleep_hours,recovery,strain,hrv,rhr",
            ),
            LbiCliError::Engine(BalanceError::ConfigError(msg)) => {
                CliError::new("CONFIG_ERROR", msg, "Fix the configuration file and retry")
            }
            LbiCliError::Engine(e @ BalanceError::IoError(_)) | LbiCliError::Engine(e @ BalanceError::StorageError(_)) => {
                CliError::new("STORAGE_ERROR", e.to_string(), "Check the --store directory")
            }
            LbiCliError::Engine(e) => CliError::new("ENGINE_ERROR", e.to_string(), "Run 'lbi doctor' for details"),
            LbiCliError::Json(e) => CliError::new("JSON_ERROR", e.to_string(), "Check JSON syntax"),
            LbiCliError::InvalidArgument(msg) => CliError::new("INVALID_ARGUMENT", msg, "See 'lbi help'"),
            LbiCliError::NoWearable(date) => CliError::new(
                "NO_WEARABLE",
                format!("No wearable data recorded for {date}"),
                "Import a CSV or run 'lbi wearable' first",
            ),
            LbiCliError::DoctorFailed => CliError::new(
                "DOCTOR_FAILED",
                "One or more health checks failed".to_string(),
                "Review the doctor report for details",
            ),
        }
    }
}

// Report types

#[derive(Serialize)]
struct DoctorReport {
    version: String,
    store: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

impl DoctorCheck {
    fn new(name: &str, status: CheckStatus, message: String) -> Self {
        Self {
            name: name.to_string(),
            status,
            message,
        }
    }
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
