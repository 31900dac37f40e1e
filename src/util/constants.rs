// GcodeGate - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "GcodeGate";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "GcodeGate";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Gcode grammar
// =============================================================================

/// Comment delimiter. Also the `command` sentinel of comment-only lines.
pub const COMMENT_MARKER: &str = ";";

/// Comment prefix carrying the slicer's normal-mode print time estimate.
pub const PRINT_TIME_PREFIX: &str = "estimated printing time (normal mode) =";

/// Comment prefix carrying the slicer's filament weight estimate.
pub const WEIGHT_PREFIX: &str = "total filament used [g] =";

/// Comment prefix of the slicer's printer notes, used for model resolution
/// and keyword checks.
pub const PRINTER_NOTES_PREFIX: &str = "printer_notes";

/// Seconds per duration position, seconds first (after reversing the tokens).
pub const DURATION_UNIT_SECONDS: [u64; 4] = [1, 60, 3_600, 86_400];

// =============================================================================
// Failure message names
// =============================================================================

/// Message reported when a check fails without naming its own message
/// (parse failures).
pub const MSG_GCODE_CHECK_FAIL: &str = "GCODE_CHECK_FAIL";

/// Message reported when no printer model could be resolved.
pub const MSG_NO_PRINTER_MODEL: &str = "NO_PRINTER_MODEL";

// =============================================================================
// Admission limits
// =============================================================================

/// Maximum size of a submitted gcode file in bytes.
pub const DEFAULT_MAX_GCODE_FILE_SIZE: u64 = 512 * 1024 * 1024; // 512 MB

/// Hard upper bound on the configurable gcode file size.
pub const ABSOLUTE_MAX_GCODE_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024; // 2 GB

/// Smallest configurable gcode file size limit.
pub const MIN_MAX_GCODE_FILE_SIZE: u64 = 1024;

/// Files at or above this size are read through a memory map.
pub const MMAP_THRESHOLD: u64 = 32 * 1024 * 1024; // 32 MB

/// Default output directory for accepted files, relative to the working dir.
pub const DEFAULT_OUTPUT_DIR: &str = "queued";

/// Extension written for accepted files.
pub const OUTPUT_EXTENSION: &str = "gcode";

// =============================================================================
// Pricing
// =============================================================================

/// Default price per gram of filament.
pub const DEFAULT_RATE_PER_GRAM: f64 = 0.05;

/// Default sales-tax multiplier applied to non-exempt jobs.
pub const DEFAULT_TAX_MULTIPLIER: f64 = 1.0775;

/// Upper bound on the configurable tax multiplier.
pub const MAX_TAX_MULTIPLIER: f64 = 2.0;

/// Upper bound on the configurable per-gram rate.
pub const MAX_RATE_PER_GRAM: f64 = 10.0;

// =============================================================================
// Rule set limits
// =============================================================================

/// Maximum size of a rule set TOML file in bytes.
pub const MAX_RULESET_FILE_SIZE: u64 = 256 * 1024; // 256 KB

/// Maximum number of printer models in one rule set.
pub const MAX_MODELS: usize = 100;

/// Maximum number of check items per model (and for the global list).
pub const MAX_CHECK_ITEMS: usize = 500;

// =============================================================================
// Discovery limits
// =============================================================================

/// Maximum directory recursion depth during discovery.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Hard upper bound on max depth.
pub const ABSOLUTE_MAX_DEPTH: usize = 50;

/// Maximum number of files to discover in a single batch.
pub const DEFAULT_MAX_FILES: usize = 1_000;

/// Hard upper bound on max files.
pub const ABSOLUTE_MAX_FILES: usize = 10_000;

/// Default include glob patterns for gcode discovery.
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &["*.gcode", "*.gco", "*.g"];

/// Default exclude glob patterns for gcode discovery.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[".git", "*.tmp", "*.bgcode"];

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a gcode line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 120;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default rule set file name looked up in the config directory.
pub const RULESET_FILE_NAME: &str = "rules.toml";
