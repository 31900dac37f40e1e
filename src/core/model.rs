// GcodeGate - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies. These types are the shared vocabulary across all layers.

use crate::util::constants;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

// =============================================================================
// Instruction line (output of tokenizing)
// =============================================================================

/// One non-empty line of a gcode file.
///
/// Either a code line (`command` is a real token, optionally with params and a
/// trailing comment) or a comment-only line, whose `command` is the `;`
/// sentinel and whose `params` are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GcodeLine {
    pub command: String,
    pub params: Vec<String>,
    /// Comment text after the first `;`, trimmed. Empty when absent.
    pub comment: String,
}

impl GcodeLine {
    /// Build a code line. `command` must not be the comment sentinel.
    pub fn code(
        command: impl Into<String>,
        params: Vec<String>,
        comment: impl Into<String>,
    ) -> Self {
        let command = command.into();
        debug_assert_ne!(command, constants::COMMENT_MARKER);
        Self {
            command,
            params,
            comment: comment.into(),
        }
    }

    /// Build a comment-only line.
    pub fn comment_only(comment: impl Into<String>) -> Self {
        Self {
            command: constants::COMMENT_MARKER.to_string(),
            params: Vec::new(),
            comment: comment.into(),
        }
    }

    pub fn is_comment_only(&self) -> bool {
        self.command == constants::COMMENT_MARKER
    }

    /// The comment if it starts with the slicer's `printer_notes` key.
    pub fn printer_notes(&self) -> Option<&str> {
        self.comment
            .starts_with(constants::PRINTER_NOTES_PREFIX)
            .then_some(self.comment.as_str())
    }
}

// =============================================================================
// Check items
// =============================================================================

/// What a check item does. One variant per supported action kind; the action
/// value is parsed into the variant when the rule set is compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckAction {
    /// Delete every line whose command equals the target.
    RemoveCommandAll,

    /// Append one line with the target command and these params.
    AddCommandAtEnd { params: Vec<String> },

    /// The target command must appear. For the `;` target, a comment-only
    /// line must also contain `comment_match` (trimmed, case-insensitive).
    CommandMustExist { comment_match: String },

    /// The first param of every target line must be at least this value.
    CommandParamMin(u64),

    /// The first param of every target line must be at most this value.
    CommandParamMax(u64),

    /// A `printer_notes` comment must contain the referenced keyword.
    KeywordCheck { keyword_id: String },
}

impl CheckAction {
    /// Action name as written in rule set files.
    pub fn name(&self) -> &'static str {
        match self {
            CheckAction::RemoveCommandAll => "remove_command_all",
            CheckAction::AddCommandAtEnd { .. } => "add_command_at_end",
            CheckAction::CommandMustExist { .. } => "command_must_exist",
            CheckAction::CommandParamMin(_) => "command_param_min",
            CheckAction::CommandParamMax(_) => "command_param_max",
            CheckAction::KeywordCheck { .. } => "keyword_check",
        }
    }
}

/// One configured validation or transformation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckItem {
    /// Command the item targets (e.g. `M104`, or `;` for comment lines).
    pub command: String,
    pub action: CheckAction,
    /// Only meaningful for `KeywordCheck`; every other failing check is hard.
    pub hard_fail: bool,
    /// Name of the failure message reported when this item fails.
    pub message: String,
}

// =============================================================================
// Printer models and keywords
// =============================================================================

/// A group of printers sharing one check-item configuration.
#[derive(Debug, Clone)]
pub struct PrinterModel {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Literal substring identifying this model in `printer_notes`.
    pub keyword: String,
    /// Whether queued jobs for this model may start without an operator.
    pub auto_start_prints: bool,
    /// Model-specific items, in configured order.
    pub check_items: Vec<CheckItem>,
}

/// Keyword id -> literal value lookup used by `KeywordCheck`.
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    values: HashMap<String, String>,
}

impl KeywordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a keyword, returning the previous value for that id if any.
    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(id.into(), value.into())
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.values.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// Rule set (runtime representation)
// =============================================================================

/// Compiled, immutable snapshot of everything one check run needs.
///
/// Built from `RuleSetDefinition` (the raw TOML structure) via validation.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub id: String,
    pub name: String,
    /// Models in configured order; model resolution picks the first match.
    pub models: Vec<PrinterModel>,
    pub keywords: KeywordTable,
    /// Items applied to every model, before the model's own items.
    pub global_items: Vec<CheckItem>,
    /// Failure message name -> human-readable text.
    pub messages: HashMap<String, String>,
    pub is_builtin: bool,
}

impl RuleSet {
    pub fn model(&self, id: &str) -> Option<&PrinterModel> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Items for `model` in execution order: globals first, then the model's.
    pub fn items_for<'a>(&'a self, model: &'a PrinterModel) -> impl Iterator<Item = &'a CheckItem> {
        self.global_items.iter().chain(model.check_items.iter())
    }

    /// Text for a failure message name, if the catalogue defines one.
    pub fn message_text(&self, name: &str) -> Option<&str> {
        self.messages.get(name).map(String::as_str)
    }
}

// =============================================================================
// Extracted metadata
// =============================================================================

/// Facts the slicer embedded in the file's comments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GcodeMetadata {
    pub weight_g: Option<f64>,
    pub time_s: Option<u64>,
    pub model_id: Option<String>,
}

impl GcodeMetadata {
    pub fn is_complete(&self) -> bool {
        self.weight_g.is_some() && self.time_s.is_some() && self.model_id.is_some()
    }
}

// =============================================================================
// Check outcome
// =============================================================================

/// Terminal result of one check run. Exactly one is produced per call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Every check passed; `text` is the serialized, possibly modified gcode.
    Valid {
        text: String,
        weight_g: f64,
        time_s: u64,
        model_id: String,
    },

    /// A hard check failed (`message` names it) or the file could not be
    /// tokenized (`message` is `None`).
    Invalid {
        message: Option<String>,
        model_id: Option<String>,
    },

    /// No printer model keyword was found in the file.
    NoPrinterModel,
}

impl CheckOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, CheckOutcome::Valid { .. })
    }

    /// Short label for logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            CheckOutcome::Valid { .. } => "valid",
            CheckOutcome::Invalid { .. } => "invalid",
            CheckOutcome::NoPrinterModel => "no_printer_model",
        }
    }
}

/// A check outcome with the soft-fail advisories gathered along the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub outcome: CheckOutcome,
    /// Message names of soft `KeywordCheck` misses, in the order they ran.
    pub advisories: Vec<String>,
}

// =============================================================================
// Admission (job-level results)
// =============================================================================

/// Job status after admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Accepted; the serialized file was written and the job can be queued.
    InQueue,
    /// Rejected; the submitter is told why.
    Cancelled,
}

impl JobStatus {
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::InQueue => "IN_QUEUE",
            JobStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything the caller needs to update the job and notify the submitter.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionRecord {
    pub source_file: PathBuf,
    pub status: JobStatus,
    pub model_id: Option<String>,
    /// Whether the resolved model starts queued prints on its own.
    pub auto_start: bool,
    pub weight_g: Option<f64>,
    pub time_s: Option<u64>,
    pub cost: Option<f64>,
    /// Name of the failure message, for cancelled jobs.
    pub failure_message: Option<String>,
    /// Human-readable failure text; falls back to the name when the
    /// catalogue has no entry.
    pub failure_text: Option<String>,
    /// Human-readable soft-fail advisories.
    pub advisories: Vec<String>,
    /// Where the accepted file was written.
    pub output_file: Option<PathBuf>,
    pub checked_at: DateTime<Utc>,
}

// =============================================================================
// Discovered file (output of discovery)
// =============================================================================

/// A gcode file found while walking a batch directory.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}
