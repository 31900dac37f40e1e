// GcodeGate - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation
// 3. Rule set loading (user file or built-in)
// 4. Batch admission and report output

use clap::Parser;
use gcodegate::app::admission::{self, AdmissionOptions, BatchEntry};
use gcodegate::app::ruleset_mgr;
use gcodegate::core::discovery::{self, DiscoveryConfig};
use gcodegate::core::export::{self, ExportFormat};
use gcodegate::core::model::{AdmissionRecord, JobStatus};
use gcodegate::core::pricing::{self, PricingConfig};
use gcodegate::platform::config::{self, AppConfig, PlatformPaths};
use gcodegate::util::error::{ExportError, GcodeGateError};
use gcodegate::util::{constants, logging};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// GcodeGate - Rule-based gcode admission checker.
///
/// Checks submitted gcode files against printer rules, writes accepted files
/// to the output directory, and reports which jobs can be queued.
#[derive(Parser, Debug)]
#[command(name = "gcodegate", version, about)]
struct Cli {
    /// Gcode files or directories to check. Directories are searched for
    /// *.gcode, *.gco and *.g files.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Rule set TOML file (default: [rules] path from config, then
    /// rules.toml in the config directory, then the built-in rules).
    #[arg(short = 'r', long = "rules")]
    rules: Option<PathBuf>,

    /// Directory accepted files are written to.
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Directory containing config.toml (default: platform config dir).
    #[arg(short = 'c', long = "config-dir")]
    config_dir: Option<PathBuf>,

    /// Price jobs without sales tax.
    #[arg(long = "tax-exempt")]
    tax_exempt: bool,

    /// Write a report of all results (.csv or .json).
    #[arg(long = "report")]
    report: Option<PathBuf>,

    /// Print results as JSON to stdout instead of a summary.
    #[arg(long = "json")]
    json: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

/// Exit code when every file was queued.
const EXIT_ALL_QUEUED: u8 = 0;
/// Exit code when at least one file was cancelled.
const EXIT_REJECTED: u8 = 1;
/// Exit code for operational errors (unreadable files, bad rule set, ...).
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config is read before logging so [logging] level can take effect;
    // its warnings are replayed once the subscriber is up.
    let platform_paths = PlatformPaths::resolve();
    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(|| platform_paths.config_dir.clone());
    let (app_config, config_warnings) = config::load_config(&config_dir);

    logging::init(cli.debug, app_config.log_level.as_deref());

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        config_dir = %config_dir.display(),
        "GcodeGate starting"
    );
    for warning in &config_warnings {
        tracing::warn!("{warning}");
    }

    match run(&cli, &app_config, &config_dir) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, "Admission run failed");
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(cli: &Cli, app_config: &AppConfig, config_dir: &Path) -> Result<u8, GcodeGateError> {
    let rules_path = resolve_ruleset_path(cli, app_config, config_dir);
    let rules = ruleset_mgr::load_ruleset(rules_path.as_deref())?;

    let discovery_config = DiscoveryConfig {
        max_depth: app_config.max_depth,
        max_files: app_config.max_files,
        ..DiscoveryConfig::default()
    };
    let files = collect_inputs(&cli.paths, &discovery_config)?;
    if files.is_empty() {
        eprintln!("No gcode files found.");
        return Ok(EXIT_ALL_QUEUED);
    }

    let options = AdmissionOptions {
        output_dir: cli
            .output_dir
            .clone()
            .or_else(|| app_config.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_OUTPUT_DIR)),
        pricing: PricingConfig {
            rate_per_gram: app_config.rate_per_gram,
            tax_multiplier: app_config.tax_multiplier,
        },
        tax_exempt: cli.tax_exempt,
        max_file_size: app_config.max_file_size,
    };

    let entries = admission::admit_batch(&files, &rules, &options);

    let mut records: Vec<AdmissionRecord> = Vec::with_capacity(entries.len());
    let mut errors = 0usize;
    for BatchEntry { path, result } in entries {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                errors += 1;
                tracing::warn!(file = %path.display(), error = %e, "File could not be admitted");
                eprintln!("Error: {e}");
            }
        }
    }

    if cli.json {
        let stdout = std::io::stdout();
        export::export_json(&records, stdout.lock(), Path::new("<stdout>"))?;
        println!();
    } else {
        print_summary(&records);
    }

    if let Some(report_path) = &cli.report {
        write_report(&records, report_path)?;
    }

    let rejected = records
        .iter()
        .any(|r| r.status == JobStatus::Cancelled);
    Ok(if errors > 0 {
        EXIT_ERROR
    } else if rejected {
        EXIT_REJECTED
    } else {
        EXIT_ALL_QUEUED
    })
}

/// CLI flag > config `[rules] path` > `rules.toml` in the config dir > built-in.
fn resolve_ruleset_path(cli: &Cli, app_config: &AppConfig, config_dir: &Path) -> Option<PathBuf> {
    if let Some(path) = &cli.rules {
        return Some(path.clone());
    }
    if let Some(path) = &app_config.rules_path {
        return Some(path.clone());
    }
    let default_path = config_dir.join(constants::RULESET_FILE_NAME);
    default_path.is_file().then_some(default_path)
}

/// Expand directories through discovery; plain files are taken as given.
fn collect_inputs(
    inputs: &[PathBuf],
    discovery_config: &DiscoveryConfig,
) -> Result<Vec<PathBuf>, GcodeGateError> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let (found, warnings) = discovery::discover_gcode_files(input, discovery_config)?;
            for warning in &warnings {
                tracing::warn!(root = %input.display(), "{warning}");
            }
            files.extend(found.into_iter().map(|f| f.path));
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn print_summary(records: &[AdmissionRecord]) {
    for record in records {
        let file = record.source_file.display();
        match record.status {
            JobStatus::InQueue => {
                let model = record.model_id.as_deref().unwrap_or("-");
                let time = pricing::format_duration(record.time_s.unwrap_or(0));
                println!(
                    "{:<10} {file}  [{model}]  {:.2} g  {time}  ${:.2}{}",
                    record.status.label(),
                    record.weight_g.unwrap_or(0.0),
                    record.cost.unwrap_or(0.0),
                    if record.auto_start { "  (auto-start)" } else { "" },
                );
            }
            JobStatus::Cancelled => {
                println!(
                    "{:<10} {file}  {}: {}",
                    record.status.label(),
                    record.failure_message.as_deref().unwrap_or("-"),
                    record.failure_text.as_deref().unwrap_or(""),
                );
            }
        }
        for advisory in &record.advisories {
            println!("{:<10} note: {advisory}", "");
        }
    }

    let queued = records
        .iter()
        .filter(|r| r.status == JobStatus::InQueue)
        .count();
    println!(
        "{} file(s) checked: {queued} queued, {} cancelled",
        records.len(),
        records.len() - queued
    );
}

fn write_report(records: &[AdmissionRecord], report_path: &Path) -> Result<(), GcodeGateError> {
    let format = ExportFormat::from_path(report_path)?;
    let file = std::fs::File::create(report_path).map_err(|e| ExportError::Io {
        path: report_path.to_path_buf(),
        source: e,
    })?;
    let writer = std::io::BufWriter::new(file);
    let count = match format {
        ExportFormat::Csv => export::export_csv(records, writer, report_path)?,
        ExportFormat::Json => export::export_json(records, writer, report_path)?,
    };
    tracing::info!(path = %report_path.display(), records = count, "Report written");
    Ok(())
}
