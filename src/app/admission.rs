// GcodeGate - app/admission.rs
//
// Job admission: read a submitted file, run the check pipeline, write the
// accepted copy, price the job, and decide its next status.
//
// Check outcomes become `AdmissionRecord`s. Only I/O problems (unreadable
// source, oversized file, unwritable output) are returned as errors.
// Batch admission parallelises across files with rayon; each distinct path
// is checked exactly once and results come back in input order.

use crate::core::check;
use crate::core::model::{AdmissionRecord, CheckOutcome, JobStatus, RuleSet};
use crate::core::pricing::{self, PricingConfig};
use crate::platform::fs;
use crate::util::constants;
use crate::util::error::{AdmissionError, GcodeGateError};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

/// Settings for one admission run.
#[derive(Debug, Clone)]
pub struct AdmissionOptions {
    /// Directory accepted files are written to. Created on demand.
    pub output_dir: PathBuf,
    pub pricing: PricingConfig,
    /// Skip sales tax (jobs billed to a permission code).
    pub tax_exempt: bool,
    /// Largest source file accepted, in bytes.
    pub max_file_size: u64,
}

impl Default for AdmissionOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(constants::DEFAULT_OUTPUT_DIR),
            pricing: PricingConfig::default(),
            tax_exempt: false,
            max_file_size: constants::DEFAULT_MAX_GCODE_FILE_SIZE,
        }
    }
}

/// Result of admitting one path in a batch.
#[derive(Debug)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub result: Result<AdmissionRecord, GcodeGateError>,
}

/// Admit a single gcode file.
///
/// Accepted files are written to `<output_dir>/<stem>.gcode`.
pub fn admit_file(
    path: &Path,
    rules: &RuleSet,
    options: &AdmissionOptions,
) -> Result<AdmissionRecord, GcodeGateError> {
    let output_path = output_path_for(path, &options.output_dir, None);
    admit_to(path, &output_path, rules, options)
}

/// Admit many files in parallel.
///
/// Duplicate paths (compared canonically) are dropped after their first
/// occurrence. Sources that share a file stem get numbered output names
/// (`part.gcode`, `part-2.gcode`) so no accepted copy overwrites another.
pub fn admit_batch(
    paths: &[PathBuf],
    rules: &RuleSet,
    options: &AdmissionOptions,
) -> Vec<BatchEntry> {
    let jobs = plan_batch(paths, &options.output_dir);

    tracing::info!(
        files = jobs.len(),
        duplicates = paths.len() - jobs.len(),
        "Batch admission starting"
    );

    let entries: Vec<BatchEntry> = jobs
        .par_iter()
        .map(|(source, output)| BatchEntry {
            path: source.clone(),
            result: admit_to(source, output, rules, options),
        })
        .collect();

    let queued = entries
        .iter()
        .filter(|e| matches!(&e.result, Ok(r) if r.status == JobStatus::InQueue))
        .count();
    let errors = entries.iter().filter(|e| e.result.is_err()).count();
    tracing::info!(
        files = entries.len(),
        queued,
        cancelled = entries.len() - queued - errors,
        errors,
        "Batch admission complete"
    );

    entries
}

/// Pair each distinct source with a unique output path, in input order.
///
/// Sources are compared by canonical path, so `dir/a.gcode` and
/// `./dir/a.gcode` are one job. Output names are numbered until unused,
/// which also steps over names taken by a source like `part-2.gcode`.
fn plan_batch(paths: &[PathBuf], output_dir: &Path) -> Vec<(PathBuf, PathBuf)> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut taken: HashSet<PathBuf> = HashSet::new();
    let mut jobs = Vec::with_capacity(paths.len());

    for path in paths {
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
        if !seen.insert(key) {
            tracing::debug!(file = %path.display(), "Duplicate path in batch, skipping");
            continue;
        }

        let mut output = output_path_for(path, output_dir, None);
        let mut n = 1;
        while taken.contains(&output) {
            n += 1;
            output = output_path_for(path, output_dir, Some(n));
        }
        taken.insert(output.clone());
        jobs.push((path.clone(), output));
    }

    jobs
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "job".to_string())
}

fn output_path_for(source: &Path, output_dir: &Path, suffix: Option<usize>) -> PathBuf {
    let stem = file_stem(source);
    let name = match suffix {
        Some(n) => format!("{stem}-{n}.{}", constants::OUTPUT_EXTENSION),
        None => format!("{stem}.{}", constants::OUTPUT_EXTENSION),
    };
    output_dir.join(name)
}

fn admit_to(
    path: &Path,
    output_path: &Path,
    rules: &RuleSet,
    options: &AdmissionOptions,
) -> Result<AdmissionRecord, GcodeGateError> {
    if writes_over_source(path, output_path) {
        return Err(AdmissionError::OutputIsSource {
            path: path.to_path_buf(),
        }
        .into());
    }

    let text = match read_submission(path, options.max_file_size)? {
        Some(text) => text,
        None => return Ok(cancelled(path, rules, None, None, Vec::new())),
    };

    let report = check::check_gcode(&text, rules);
    let advisories: Vec<String> = report
        .advisories
        .iter()
        .map(|name| resolve_message(rules, name))
        .collect();

    let record = match report.outcome {
        CheckOutcome::Valid {
            text,
            weight_g,
            time_s,
            model_id,
        } => {
            write_output(output_path, &text)?;
            let cost = pricing::estimate_cost(weight_g, &options.pricing, options.tax_exempt);
            let auto_start = rules.model(&model_id).is_some_and(|m| m.auto_start_prints);
            AdmissionRecord {
                source_file: path.to_path_buf(),
                status: JobStatus::InQueue,
                model_id: Some(model_id),
                auto_start,
                weight_g: Some(weight_g),
                time_s: Some(time_s),
                cost: Some(cost),
                failure_message: None,
                failure_text: None,
                advisories,
                output_file: Some(output_path.to_path_buf()),
                checked_at: Utc::now(),
            }
        }
        CheckOutcome::Invalid { message, model_id } => {
            cancelled(path, rules, message, model_id, advisories)
        }
        CheckOutcome::NoPrinterModel => cancelled(
            path,
            rules,
            Some(constants::MSG_NO_PRINTER_MODEL.to_string()),
            None,
            advisories,
        ),
    };

    tracing::info!(
        file = %path.display(),
        status = %record.status,
        model = record.model_id.as_deref().unwrap_or("-"),
        failure = record.failure_message.as_deref().unwrap_or("-"),
        "Admission decided"
    );

    Ok(record)
}

/// True when `output` names the same file as `source`, e.g. when the output
/// directory is the directory being checked.
fn writes_over_source(source: &Path, output: &Path) -> bool {
    let Ok(source) = std::fs::canonicalize(source) else {
        return false;
    };
    let Some(name) = output.file_name() else {
        return false;
    };
    let dir = match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::canonicalize(dir).is_ok_and(|dir| dir.join(name) == source)
}

/// Read the submission as text. `Ok(None)` means the bytes are not text
/// (binary gcode, wrong file type) and the job is rejected, not errored.
fn read_submission(path: &Path, max_file_size: u64) -> Result<Option<String>, AdmissionError> {
    let size = std::fs::metadata(path)
        .map_err(|e| AdmissionError::Read {
            path: path.to_path_buf(),
            source: e,
        })?
        .len();

    if size > max_file_size {
        return Err(AdmissionError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max_size: max_file_size,
        });
    }

    match fs::read_gcode_text(path, size) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            tracing::warn!(file = %path.display(), error = %e, "Submission is not UTF-8 text");
            Ok(None)
        }
        Err(e) => Err(AdmissionError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn write_output(output_path: &Path, text: &str) -> Result<(), AdmissionError> {
    let write_err = |e: io::Error| AdmissionError::Write {
        path: output_path.to_path_buf(),
        source: e,
    };
    if let Some(dir) = output_path.parent() {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }
    std::fs::write(output_path, text).map_err(write_err)?;
    tracing::debug!(output = %output_path.display(), bytes = text.len(), "Accepted file written");
    Ok(())
}

/// Build a cancelled record. A failure without a message name is reported
/// as `GCODE_CHECK_FAIL`.
fn cancelled(
    path: &Path,
    rules: &RuleSet,
    message: Option<String>,
    model_id: Option<String>,
    advisories: Vec<String>,
) -> AdmissionRecord {
    let name = message.unwrap_or_else(|| constants::MSG_GCODE_CHECK_FAIL.to_string());
    let text = resolve_message(rules, &name);
    let auto_start = model_id
        .as_deref()
        .and_then(|id| rules.model(id))
        .is_some_and(|m| m.auto_start_prints);
    AdmissionRecord {
        source_file: path.to_path_buf(),
        status: JobStatus::Cancelled,
        model_id,
        auto_start,
        weight_g: None,
        time_s: None,
        cost: None,
        failure_message: Some(name),
        failure_text: Some(text),
        advisories,
        output_file: None,
        checked_at: Utc::now(),
    }
}

/// Message text from the catalogue, or the name itself when undefined.
fn resolve_message(rules: &RuleSet, name: &str) -> String {
    rules.message_text(name).unwrap_or(name).to_string()
}
