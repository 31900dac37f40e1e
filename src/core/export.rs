// GcodeGate - core/export.rs
//
// CSV and JSON export of admission records.
// Core layer: writes to any Write trait object.

use crate::core::model::AdmissionRecord;
use crate::util::error::ExportError;
use std::io::Write;
use std::path::Path;

/// Report format, chosen from the report path's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("csv") => Ok(ExportFormat::Csv),
            Some("json") => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Export records to CSV format.
///
/// Writes: checked_at, file, status, model, weight_g, time_s, cost,
/// failure_message, failure_text, advisories, output_file
pub fn export_csv<W: Write>(
    records: &[AdmissionRecord],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let csv_err = |e: csv::Error| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record([
            "checked_at",
            "file",
            "status",
            "model",
            "weight_g",
            "time_s",
            "cost",
            "failure_message",
            "failure_text",
            "advisories",
            "output_file",
        ])
        .map_err(csv_err)?;

    for record in records {
        let opt = |v: Option<String>| v.unwrap_or_default();
        csv_writer
            .write_record([
                record.checked_at.to_rfc3339(),
                record.source_file.display().to_string(),
                record.status.label().to_string(),
                opt(record.model_id.clone()),
                opt(record.weight_g.map(|w| w.to_string())),
                opt(record.time_s.map(|t| t.to_string())),
                opt(record.cost.map(|c| format!("{c:.2}"))),
                opt(record.failure_message.clone()),
                opt(record.failure_text.clone()),
                record.advisories.join(" | "),
                opt(record.output_file.as_ref().map(|p| p.display().to_string())),
            ])
            .map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(records.len())
}

/// Export records to JSON format (array of objects).
pub fn export_json<W: Write>(
    records: &[AdmissionRecord],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    serde_json::to_writer_pretty(writer, records).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(records.len())
}
