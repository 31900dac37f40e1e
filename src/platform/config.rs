// GcodeGate - platform/config.rs
//
// Platform-specific configuration, data directory resolution, and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for GcodeGate data and configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/gcodegate/ or %APPDATA%\GcodeGate\config\)
    pub config_dir: PathBuf,

    /// Data directory for queued output when no output dir is configured.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                config_dir: fallback.clone(),
                data_dir: fallback,
            }
        }
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so a newer config file still loads
/// with an older binary.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub pricing: PricingSection,
    pub admission: AdmissionSection,
    pub discovery: DiscoverySection,
    pub rules: RulesSection,
    pub logging: LoggingSection,
}

/// `[pricing]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct PricingSection {
    /// Price per gram of filament.
    pub rate_per_gram: Option<f64>,
    /// Multiplier applied to jobs that are not tax exempt.
    pub tax_multiplier: Option<f64>,
}

/// `[admission]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct AdmissionSection {
    /// Directory accepted files are written to.
    pub output_dir: Option<String>,
    /// Largest gcode file accepted, in bytes.
    pub max_file_size_bytes: Option<u64>,
}

/// `[discovery]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    pub max_depth: Option<usize>,
    pub max_files: Option<usize>,
}

/// `[rules]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RulesSection {
    /// Rule set TOML file. Relative paths resolve against the config dir.
    pub path: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- Pricing --
    pub rate_per_gram: f64,
    pub tax_multiplier: f64,

    // -- Admission --
    /// `None` means the caller picks (CLI flag or `DEFAULT_OUTPUT_DIR`).
    pub output_dir: Option<PathBuf>,
    pub max_file_size: u64,

    // -- Discovery --
    pub max_depth: usize,
    pub max_files: usize,

    // -- Rules --
    pub rules_path: Option<PathBuf>,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rate_per_gram: constants::DEFAULT_RATE_PER_GRAM,
            tax_multiplier: constants::DEFAULT_TAX_MULTIPLIER,
            output_dir: None,
            max_file_size: constants::DEFAULT_MAX_GCODE_FILE_SIZE,
            max_depth: constants::DEFAULT_MAX_DEPTH,
            max_files: constants::DEFAULT_MAX_FILES,
            rules_path: None,
            log_level: None,
        }
    }
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first run).
/// If the file is unreadable or unparseable, returns defaults with a warning.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);

    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(e) => {
            let err = ConfigError::Io {
                path: config_path.clone(),
                source: e,
            };
            warnings.push(format!("{err}. Using defaults."));
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            let err = ConfigError::TomlParse {
                path: config_path.clone(),
                source: e,
            };
            warnings.push(format!("{err}. Using defaults."));
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    let config = validate(raw, config_dir, &mut warnings);

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

/// Validate each field against named constants, accumulating all problems.
fn validate(raw: RawConfig, config_dir: &Path, warnings: &mut Vec<String>) -> AppConfig {
    let mut config = AppConfig::default();
    let mut out_of_range = |field: &str, value: String, expected: String, default: String| {
        let err = ConfigError::ValueOutOfRange {
            field: field.to_string(),
            value,
            expected,
        };
        warnings.push(format!("{err}. Using default ({default})."));
    };

    // -- Pricing --
    if let Some(rate) = raw.pricing.rate_per_gram {
        if rate.is_finite() && (0.0..=constants::MAX_RATE_PER_GRAM).contains(&rate) {
            config.rate_per_gram = rate;
        } else {
            out_of_range(
                "pricing.rate_per_gram",
                rate.to_string(),
                format!("0-{}", constants::MAX_RATE_PER_GRAM),
                constants::DEFAULT_RATE_PER_GRAM.to_string(),
            );
        }
    }
    if let Some(tax) = raw.pricing.tax_multiplier {
        if tax.is_finite() && (1.0..=constants::MAX_TAX_MULTIPLIER).contains(&tax) {
            config.tax_multiplier = tax;
        } else {
            out_of_range(
                "pricing.tax_multiplier",
                tax.to_string(),
                format!("1.0-{}", constants::MAX_TAX_MULTIPLIER),
                constants::DEFAULT_TAX_MULTIPLIER.to_string(),
            );
        }
    }

    // -- Admission --
    if let Some(dir) = raw.admission.output_dir {
        if !dir.trim().is_empty() {
            config.output_dir = Some(PathBuf::from(dir));
        }
    }
    if let Some(size) = raw.admission.max_file_size_bytes {
        if (constants::MIN_MAX_GCODE_FILE_SIZE..=constants::ABSOLUTE_MAX_GCODE_FILE_SIZE)
            .contains(&size)
        {
            config.max_file_size = size;
        } else {
            out_of_range(
                "admission.max_file_size_bytes",
                size.to_string(),
                format!(
                    "{}-{}",
                    constants::MIN_MAX_GCODE_FILE_SIZE,
                    constants::ABSOLUTE_MAX_GCODE_FILE_SIZE
                ),
                constants::DEFAULT_MAX_GCODE_FILE_SIZE.to_string(),
            );
        }
    }

    // -- Discovery --
    if let Some(depth) = raw.discovery.max_depth {
        if (1..=constants::ABSOLUTE_MAX_DEPTH).contains(&depth) {
            config.max_depth = depth;
        } else {
            out_of_range(
                "discovery.max_depth",
                depth.to_string(),
                format!("1-{}", constants::ABSOLUTE_MAX_DEPTH),
                constants::DEFAULT_MAX_DEPTH.to_string(),
            );
        }
    }
    if let Some(files) = raw.discovery.max_files {
        if (1..=constants::ABSOLUTE_MAX_FILES).contains(&files) {
            config.max_files = files;
        } else {
            out_of_range(
                "discovery.max_files",
                files.to_string(),
                format!("1-{}", constants::ABSOLUTE_MAX_FILES),
                constants::DEFAULT_MAX_FILES.to_string(),
            );
        }
    }

    // -- Rules --
    if let Some(path) = raw.rules.path {
        if !path.trim().is_empty() {
            let path = PathBuf::from(path);
            config.rules_path = Some(if path.is_relative() {
                config_dir.join(path)
            } else {
                path
            });
        }
    }

    // -- Logging --
    if let Some(level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level);
        } else {
            out_of_range(
                "logging.level",
                level,
                "error, warn, info, debug, trace".to_string(),
                constants::DEFAULT_LOG_LEVEL.to_string(),
            );
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) {
        std::fs::write(dir.join(constants::CONFIG_FILE_NAME), body).unwrap();
    }

    #[test]
    fn test_missing_config_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = load_config(dir.path());
        assert_eq!(config, AppConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_valid_config_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
[pricing]
rate_per_gram = 0.08
tax_multiplier = 1.1

[admission]
output_dir = "/srv/queue"
max_file_size_bytes = 4096

[rules]
path = "shop.toml"

[logging]
level = "debug"
"#,
        );
        let (config, warnings) = load_config(dir.path());
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.rate_per_gram, 0.08);
        assert_eq!(config.tax_multiplier, 1.1);
        assert_eq!(config.output_dir, Some(PathBuf::from("/srv/queue")));
        assert_eq!(config.max_file_size, 4096);
        assert_eq!(config.rules_path, Some(dir.path().join("shop.toml")));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_out_of_range_values_fall_back_with_warnings() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
[pricing]
rate_per_gram = -1.0
tax_multiplier = 5.0

[admission]
max_file_size_bytes = 10

[logging]
level = "loud"
"#,
        );
        let (config, warnings) = load_config(dir.path());
        assert_eq!(warnings.len(), 4);
        assert_eq!(config.rate_per_gram, constants::DEFAULT_RATE_PER_GRAM);
        assert_eq!(config.tax_multiplier, constants::DEFAULT_TAX_MULTIPLIER);
        assert_eq!(config.max_file_size, constants::DEFAULT_MAX_GCODE_FILE_SIZE);
        assert!(config.log_level.is_none());
        assert!(warnings[0].contains("pricing.rate_per_gram"));
    }

    #[test]
    fn test_unparseable_config_gives_defaults_and_warning() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "[pricing\nrate_per_gram = ");
        let (config, warnings) = load_config(dir.path());
        assert_eq!(config, AppConfig::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Config parse error"));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "[future]\nshiny = true\n");
        let (_, warnings) = load_config(dir.path());
        assert!(warnings.is_empty());
    }
}
