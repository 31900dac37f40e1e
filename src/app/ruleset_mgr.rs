// GcodeGate - app/ruleset_mgr.rs
//
// Loads the active rule set: a user TOML file when one is configured,
// otherwise the built-in rule set embedded in the binary.

use crate::core::model::RuleSet;
use crate::core::ruleset;
use crate::util::constants;
use crate::util::error::RuleSetError;
use std::path::Path;

/// Load the rule set at `path`, or the built-in one when `path` is `None`.
///
/// An explicitly named file that is missing or invalid is an error; the
/// built-in rule set is never substituted silently.
pub fn load_ruleset(path: Option<&Path>) -> Result<RuleSet, RuleSetError> {
    let ruleset = match path {
        Some(path) => load_ruleset_file(path)?,
        None => ruleset::load_builtin_ruleset()?,
    };

    tracing::info!(
        ruleset = %ruleset.id,
        builtin = ruleset.is_builtin,
        models = ruleset.models.len(),
        keywords = ruleset.keywords.len(),
        global_items = ruleset.global_items.len(),
        "Rule set loaded"
    );

    Ok(ruleset)
}

/// Read, parse, and compile a user rule set file.
pub fn load_ruleset_file(path: &Path) -> Result<RuleSet, RuleSetError> {
    let metadata = std::fs::metadata(path).map_err(|e| RuleSetError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if metadata.len() > constants::MAX_RULESET_FILE_SIZE {
        return Err(RuleSetError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: constants::MAX_RULESET_FILE_SIZE,
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| RuleSetError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    ruleset::parse_ruleset_toml(&content, path)
        .and_then(|def| ruleset::validate_and_compile(def, path, false))
}
