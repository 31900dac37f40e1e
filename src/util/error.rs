// GcodeGate - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Check outcomes (valid / invalid / no printer model) are data, not errors;
// the types here cover operational failures only.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all GcodeGate operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum GcodeGateError {
    /// Rule set loading or validation failed.
    RuleSet(RuleSetError),

    /// Reading a submission or writing its accepted copy failed.
    Admission(AdmissionError),

    /// File discovery failed.
    Discovery(DiscoveryError),

    /// Report export failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),
}

impl fmt::Display for GcodeGateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuleSet(e) => write!(f, "Rule set error: {e}"),
            Self::Admission(e) => write!(f, "Admission error: {e}"),
            Self::Discovery(e) => write!(f, "Discovery error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for GcodeGateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RuleSet(e) => Some(e),
            Self::Admission(e) => Some(e),
            Self::Discovery(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenize errors
// ---------------------------------------------------------------------------

/// A gcode buffer that cannot be split into instruction lines.
///
/// Never crosses the engine boundary: the classifier turns it into an
/// `Invalid` outcome with no rule message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// A raw line is structurally malformed (e.g. contains NUL bytes).
    MalformedLine { line_number: usize, reason: &'static str },
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedLine {
                line_number,
                reason,
            } => write!(f, "line {line_number}: {reason}"),
        }
    }
}

impl std::error::Error for TokenizeError {}

// ---------------------------------------------------------------------------
// Rule set errors
// ---------------------------------------------------------------------------

/// Errors related to rule set loading and validation.
#[derive(Debug)]
pub enum RuleSetError {
    /// TOML file could not be parsed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Rule set file exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// A required field is missing or empty.
    MissingField {
        context: String,
        field: &'static str,
    },

    /// Two models or two keywords share an id.
    DuplicateId { kind: &'static str, id: String },

    /// A model or check item references a keyword id that is not defined.
    UnknownKeyword { context: String, keyword_id: String },

    /// A check item names an action kind outside the supported set.
    UnknownAction { context: String, action: String },

    /// A check item's value is not valid for its action kind.
    InvalidActionValue {
        context: String,
        action: &'static str,
        value: String,
        reason: &'static str,
    },

    /// A list exceeds its configured maximum length.
    TooMany {
        kind: &'static str,
        count: usize,
        max: usize,
    },

    /// I/O error reading a rule set file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for RuleSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Failed to parse TOML '{}': {source}", path.display())
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "Rule set '{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::MissingField { context, field } => {
                write!(f, "{context}: missing required field '{field}'")
            }
            Self::DuplicateId { kind, id } => write!(f, "Duplicate {kind} id '{id}'"),
            Self::UnknownKeyword {
                context,
                keyword_id,
            } => write!(f, "{context}: unknown keyword id '{keyword_id}'"),
            Self::UnknownAction { context, action } => write!(
                f,
                "{context}: unknown action '{action}'. Expected one of: \
                 remove_command_all, add_command_at_end, command_must_exist, \
                 command_param_min, command_param_max, keyword_check"
            ),
            Self::InvalidActionValue {
                context,
                action,
                value,
                reason,
            } => write!(f, "{context}: invalid value '{value}' for {action}: {reason}"),
            Self::TooMany { kind, count, max } => {
                write!(f, "Too many {kind} ({count}), maximum is {max}")
            }
            Self::Io { path, source } => {
                write!(f, "I/O error reading rule set '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for RuleSetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<RuleSetError> for GcodeGateError {
    fn from(e: RuleSetError) -> Self {
        Self::RuleSet(e)
    }
}

// ---------------------------------------------------------------------------
// Admission errors
// ---------------------------------------------------------------------------

/// Errors reading a submitted file or writing its accepted copy.
#[derive(Debug)]
pub enum AdmissionError {
    /// The submission could not be read.
    Read { path: PathBuf, source: io::Error },

    /// The submission exceeds the configured size limit.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// The accepted copy would replace the submission itself.
    OutputIsSource { path: PathBuf },

    /// The accepted copy could not be written.
    Write { path: PathBuf, source: io::Error },
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "Cannot read '{}': {source}", path.display())
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "'{}' is {size} bytes, exceeds maximum of {max_size} bytes. \
                 Raise [admission] max_file_size_bytes in config if this is intended.",
                path.display()
            ),
            Self::OutputIsSource { path } => write!(
                f,
                "Refusing to overwrite submission '{}' with its accepted copy. \
                 Choose an output directory other than the source directory.",
                path.display()
            ),
            Self::Write { path, source } => {
                write!(f, "Cannot write '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for AdmissionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Write { source, .. } => Some(source),
            Self::FileTooLarge { .. } | Self::OutputIsSource { .. } => None,
        }
    }
}

impl From<AdmissionError> for GcodeGateError {
    fn from(e: AdmissionError) -> Self {
        Self::Admission(e)
    }
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors related to gcode file discovery.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The root scan path does not exist.
    RootNotFound { path: PathBuf },

    /// The root path is not a directory.
    NotADirectory { path: PathBuf },

    /// Permission denied accessing the root path.
    PermissionDenied { path: PathBuf, source: io::Error },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { path } => {
                write!(f, "Scan path '{}' does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "Scan path '{}' is not a directory", path.display())
            }
            Self::PermissionDenied { path, source } => {
                write!(
                    f,
                    "Permission denied accessing '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PermissionDenied { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DiscoveryError> for GcodeGateError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to report export.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The report path has no recognised extension.
    UnsupportedFormat { path: PathBuf },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
            Self::UnsupportedFormat { path } => write!(
                f,
                "Cannot export to '{}': use a .csv or .json extension",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::UnsupportedFormat { .. } => None,
        }
    }
}

impl From<ExportError> for GcodeGateError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for GcodeGateError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for GcodeGate results.
pub type Result<T> = std::result::Result<T, GcodeGateError>;
