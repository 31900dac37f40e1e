// GcodeGate - core/ruleset.rs
//
// Rule set loading and validation.
// Core layer: accepts TOML strings, never touches the filesystem.
// I/O is handled by app::ruleset_mgr which feeds content here.

use crate::core::model::{CheckAction, CheckItem, KeywordTable, PrinterModel, RuleSet};
use crate::util::constants;
use crate::util::error::RuleSetError;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

// =============================================================================
// TOML deserialization structures (raw input)
// =============================================================================

/// Raw TOML rule set as deserialized from a .toml file.
/// This is validated and compiled into a `RuleSet` for runtime use.
#[derive(Debug, Deserialize)]
pub struct RuleSetDefinition {
    pub ruleset: RuleSetMeta,
    #[serde(default)]
    pub keywords: Vec<KeywordDef>,
    #[serde(default)]
    pub models: Vec<ModelDef>,
    /// Items applied to every model.
    #[serde(default)]
    pub check_items: Vec<CheckItemDef>,
    #[serde(default)]
    pub messages: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct RuleSetMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct KeywordDef {
    pub id: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Keyword id whose value identifies this model in `printer_notes`.
    pub keyword: String,
    #[serde(default)]
    pub auto_start_prints: bool,
    #[serde(default)]
    pub check_items: Vec<CheckItemDef>,
}

#[derive(Debug, Deserialize)]
pub struct CheckItemDef {
    pub command: String,
    pub action: String,
    #[serde(default)]
    pub value: ActionValue,
    #[serde(default = "default_hard_fail")]
    pub hard_fail: bool,
    pub message: String,
}

fn default_hard_fail() -> bool {
    true
}

/// An action value written either as a string or as a bare integer.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ActionValue {
    Text(String),
    Integer(i64),
}

impl Default for ActionValue {
    fn default() -> Self {
        ActionValue::Text(String::new())
    }
}

impl ActionValue {
    fn as_text(&self) -> String {
        match self {
            ActionValue::Text(s) => s.clone(),
            ActionValue::Integer(n) => n.to_string(),
        }
    }
}

// =============================================================================
// Validation and compilation
// =============================================================================

/// Parse a TOML string into a `RuleSetDefinition`.
///
/// `source_path` is used for error messages only (not for I/O).
pub fn parse_ruleset_toml(
    toml_content: &str,
    source_path: &Path,
) -> Result<RuleSetDefinition, RuleSetError> {
    toml::from_str(toml_content).map_err(|e| RuleSetError::TomlParse {
        path: source_path.to_path_buf(),
        source: e,
    })
}

/// Validate a `RuleSetDefinition` and compile it into a runtime `RuleSet`.
///
/// Validates:
/// - Ids are present, non-empty, and unique per kind
/// - Every keyword reference resolves
/// - Action names are known and their values parse for the action kind
/// - List sizes are within limits
pub fn validate_and_compile(
    def: RuleSetDefinition,
    source_path: &Path,
    is_builtin: bool,
) -> Result<RuleSet, RuleSetError> {
    if def.ruleset.id.is_empty() {
        return Err(RuleSetError::MissingField {
            context: "ruleset".to_string(),
            field: "ruleset.id",
        });
    }
    if def.models.len() > constants::MAX_MODELS {
        return Err(RuleSetError::TooMany {
            kind: "models",
            count: def.models.len(),
            max: constants::MAX_MODELS,
        });
    }

    let keywords = compile_keywords(&def.keywords)?;

    let global_items = compile_items("global", &def.check_items, &keywords)?;

    let mut seen_models = HashSet::new();
    let mut models = Vec::with_capacity(def.models.len());
    for model_def in &def.models {
        models.push(compile_model(model_def, &keywords, &mut seen_models)?);
    }

    // Unresolvable message names are not fatal: the report falls back to the
    // message name itself.
    let referenced = global_items
        .iter()
        .chain(models.iter().flat_map(|m| m.check_items.iter()))
        .map(|item| item.message.as_str());
    for name in referenced {
        if !def.messages.contains_key(name) {
            tracing::warn!(
                ruleset = %def.ruleset.id,
                source = %source_path.display(),
                message = name,
                "Check item message has no text in [messages]"
            );
        }
    }

    tracing::debug!(
        ruleset = %def.ruleset.id,
        models = models.len(),
        keywords = keywords.len(),
        global_items = global_items.len(),
        "Rule set compiled"
    );

    Ok(RuleSet {
        id: def.ruleset.id,
        name: def.ruleset.name,
        models,
        keywords,
        global_items,
        messages: def.messages,
        is_builtin,
    })
}

fn compile_keywords(defs: &[KeywordDef]) -> Result<KeywordTable, RuleSetError> {
    let mut table = KeywordTable::new();
    for def in defs {
        if def.id.is_empty() {
            return Err(RuleSetError::MissingField {
                context: "keyword".to_string(),
                field: "keywords.id",
            });
        }
        if def.value.is_empty() {
            return Err(RuleSetError::MissingField {
                context: format!("keyword '{}'", def.id),
                field: "keywords.value",
            });
        }
        if table.insert(def.id.as_str(), def.value.as_str()).is_some() {
            return Err(RuleSetError::DuplicateId {
                kind: "keyword",
                id: def.id.clone(),
            });
        }
    }
    Ok(table)
}

fn compile_model(
    def: &ModelDef,
    keywords: &KeywordTable,
    seen: &mut HashSet<String>,
) -> Result<PrinterModel, RuleSetError> {
    if def.id.is_empty() {
        return Err(RuleSetError::MissingField {
            context: "model".to_string(),
            field: "models.id",
        });
    }
    if !seen.insert(def.id.clone()) {
        return Err(RuleSetError::DuplicateId {
            kind: "model",
            id: def.id.clone(),
        });
    }

    let context = format!("model '{}'", def.id);
    let keyword = keywords
        .get(&def.keyword)
        .ok_or_else(|| RuleSetError::UnknownKeyword {
            context: context.clone(),
            keyword_id: def.keyword.clone(),
        })?
        .to_string();

    Ok(PrinterModel {
        id: def.id.clone(),
        name: def.name.clone(),
        description: def.description.clone(),
        keyword,
        auto_start_prints: def.auto_start_prints,
        check_items: compile_items(&context, &def.check_items, keywords)?,
    })
}

fn compile_items(
    owner: &str,
    defs: &[CheckItemDef],
    keywords: &KeywordTable,
) -> Result<Vec<CheckItem>, RuleSetError> {
    if defs.len() > constants::MAX_CHECK_ITEMS {
        return Err(RuleSetError::TooMany {
            kind: "check items",
            count: defs.len(),
            max: constants::MAX_CHECK_ITEMS,
        });
    }
    defs.iter()
        .enumerate()
        .map(|(idx, def)| compile_item(&format!("{owner} check item {}", idx + 1), def, keywords))
        .collect()
}

/// Compile one check item, parsing its value for the action kind.
fn compile_item(
    context: &str,
    def: &CheckItemDef,
    keywords: &KeywordTable,
) -> Result<CheckItem, RuleSetError> {
    if def.command.trim().is_empty() {
        return Err(RuleSetError::MissingField {
            context: context.to_string(),
            field: "command",
        });
    }
    if def.message.is_empty() {
        return Err(RuleSetError::MissingField {
            context: context.to_string(),
            field: "message",
        });
    }

    let value = def.value.as_text();
    let invalid = |action: &'static str, reason: &'static str| RuleSetError::InvalidActionValue {
        context: context.to_string(),
        action,
        value: value.clone(),
        reason,
    };

    let action = match def.action.to_ascii_lowercase().as_str() {
        "remove_command_all" => CheckAction::RemoveCommandAll,
        "add_command_at_end" => {
            if def.command.trim() == constants::COMMENT_MARKER {
                return Err(invalid("add_command_at_end", "cannot append a comment-only line"));
            }
            CheckAction::AddCommandAtEnd {
                params: value.split_whitespace().map(str::to_string).collect(),
            }
        }
        "command_must_exist" => CheckAction::CommandMustExist {
            comment_match: value.clone(),
        },
        "command_param_min" => CheckAction::CommandParamMin(
            value
                .trim()
                .parse()
                .map_err(|_| invalid("command_param_min", "expected a non-negative integer"))?,
        ),
        "command_param_max" => CheckAction::CommandParamMax(
            value
                .trim()
                .parse()
                .map_err(|_| invalid("command_param_max", "expected a non-negative integer"))?,
        ),
        "keyword_check" => {
            let keyword_id = value.trim().to_string();
            if !keywords.contains(&keyword_id) {
                return Err(RuleSetError::UnknownKeyword {
                    context: context.to_string(),
                    keyword_id,
                });
            }
            CheckAction::KeywordCheck { keyword_id }
        }
        _ => {
            return Err(RuleSetError::UnknownAction {
                context: context.to_string(),
                action: def.action.clone(),
            })
        }
    };

    Ok(CheckItem {
        command: def.command.trim().to_string(),
        action,
        hard_fail: def.hard_fail,
        message: def.message.clone(),
    })
}

// =============================================================================
// Built-in rule set (embedded at compile time)
// =============================================================================

/// Embedded TOML content of the built-in rule set.
pub fn builtin_ruleset_source() -> &'static str {
    include_str!("../../rulesets/default.toml")
}

/// Load and validate the built-in rule set.
pub fn load_builtin_ruleset() -> Result<RuleSet, RuleSetError> {
    let path = Path::new("<builtin>/default.toml");
    let ruleset = parse_ruleset_toml(builtin_ruleset_source(), path)
        .and_then(|def| validate_and_compile(def, path, true))?;
    tracing::debug!(ruleset = %ruleset.id, "Loaded built-in rule set");
    Ok(ruleset)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_RULESET_TOML: &str = r#"
[ruleset]
id = "test-rules"
name = "Test Rules"

[[keywords]]
id = "mk3s"
value = "PRINTER_MODEL_MK3S"

[[keywords]]
id = "pla"
value = "PLA"

[[check_items]]
command = "M862.3"
action = "remove_command_all"
message = "GCODE_CHECK_FAIL"

[[models]]
id = "prusa-mk3s"
name = "Prusa i3 MK3S"
keyword = "mk3s"
auto_start_prints = true

[[models.check_items]]
command = "M104"
action = "COMMAND_PARAM_MAX"
value = 260
message = "NOZZLE_TOO_HOT"

[[models.check_items]]
command = ";"
action = "keyword_check"
value = "pla"
hard_fail = false
message = "NOT_PLA"

[[models.check_items]]
command = "M84"
action = "add_command_at_end"
value = "X Y E"
message = "GCODE_CHECK_FAIL"

[messages]
NOZZLE_TOO_HOT = "The nozzle temperature is above what this printer allows."
"#;

    fn compile(toml: &str) -> Result<RuleSet, RuleSetError> {
        let path = Path::new("test.toml");
        let def = parse_ruleset_toml(toml, path)?;
        validate_and_compile(def, path, false)
    }

    #[test]
    fn test_compile_valid_ruleset() {
        let rules = compile(VALID_RULESET_TOML).unwrap();
        assert_eq!(rules.id, "test-rules");
        assert!(!rules.is_builtin);
        assert_eq!(rules.global_items.len(), 1);

        let model = rules.model("prusa-mk3s").unwrap();
        assert_eq!(model.keyword, "PRINTER_MODEL_MK3S");
        assert!(model.auto_start_prints);
        assert_eq!(model.check_items[0].action, CheckAction::CommandParamMax(260));
        assert!(!model.check_items[1].hard_fail);
        assert_eq!(
            model.check_items[2].action,
            CheckAction::AddCommandAtEnd {
                params: vec!["X".into(), "Y".into(), "E".into()]
            }
        );
        assert!(rules.message_text("NOZZLE_TOO_HOT").is_some());
    }

    #[test]
    fn test_hard_fail_defaults_to_true() {
        let rules = compile(VALID_RULESET_TOML).unwrap();
        assert!(rules.global_items[0].hard_fail);
    }

    fn with_item(item: &str) -> String {
        format!(
            r#"
[ruleset]
id = "r"
name = "R"

[[keywords]]
id = "k"
value = "K"

[[models]]
id = "m"
name = "M"
keyword = "k"

[[models.check_items]]
{item}
"#
        )
    }

    #[test]
    fn test_non_integer_param_bound_rejected() {
        let toml = with_item("command = \"M104\"\naction = \"command_param_min\"\nvalue = \"hot\"\nmessage = \"X\"");
        match compile(&toml).unwrap_err() {
            RuleSetError::InvalidActionValue { action, value, .. } => {
                assert_eq!(action, "command_param_min");
                assert_eq!(value, "hot");
            }
            other => panic!("Expected InvalidActionValue, got: {other:?}"),
        }
    }

    #[test]
    fn test_negative_param_bound_rejected() {
        let toml = with_item("command = \"M104\"\naction = \"command_param_max\"\nvalue = -1\nmessage = \"X\"");
        assert!(matches!(
            compile(&toml).unwrap_err(),
            RuleSetError::InvalidActionValue { .. }
        ));
    }

    #[test]
    fn test_unknown_keyword_reference_rejected() {
        let toml = with_item("command = \";\"\naction = \"keyword_check\"\nvalue = \"missing\"\nmessage = \"X\"");
        assert!(matches!(
            compile(&toml).unwrap_err(),
            RuleSetError::UnknownKeyword { .. }
        ));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let toml = with_item("command = \"G28\"\naction = \"explode\"\nmessage = \"X\"");
        assert!(matches!(
            compile(&toml).unwrap_err(),
            RuleSetError::UnknownAction { .. }
        ));
    }

    #[test]
    fn test_appending_comment_line_rejected() {
        let toml = with_item("command = \";\"\naction = \"add_command_at_end\"\nvalue = \"x\"\nmessage = \"X\"");
        assert!(matches!(
            compile(&toml).unwrap_err(),
            RuleSetError::InvalidActionValue { .. }
        ));
    }

    #[test]
    fn test_duplicate_model_id_rejected() {
        let toml = r#"
[ruleset]
id = "r"
name = "R"

[[keywords]]
id = "k"
value = "K"

[[models]]
id = "m"
name = "M"
keyword = "k"

[[models]]
id = "m"
name = "M again"
keyword = "k"
"#;
        match compile(toml).unwrap_err() {
            RuleSetError::DuplicateId { kind, id } => {
                assert_eq!(kind, "model");
                assert_eq!(id, "m");
            }
            other => panic!("Expected DuplicateId, got: {other:?}"),
        }
    }

    #[test]
    fn test_model_with_unknown_keyword_rejected() {
        let toml = r#"
[ruleset]
id = "r"
name = "R"

[[models]]
id = "m"
name = "M"
keyword = "nope"
"#;
        assert!(matches!(
            compile(toml).unwrap_err(),
            RuleSetError::UnknownKeyword { .. }
        ));
    }

    #[test]
    fn test_missing_ruleset_id() {
        let toml = "[ruleset]\nid = \"\"\nname = \"Empty\"\n";
        match compile(toml).unwrap_err() {
            RuleSetError::MissingField { field, .. } => assert_eq!(field, "ruleset.id"),
            other => panic!("Expected MissingField, got: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            compile("[ruleset\nid=").unwrap_err(),
            RuleSetError::TomlParse { .. }
        ));
    }

    #[test]
    fn test_load_builtin_ruleset() {
        let rules = load_builtin_ruleset().unwrap();
        assert!(rules.is_builtin);
        assert!(!rules.models.is_empty(), "No built-in models loaded");
        assert!(rules.message_text(constants::MSG_NO_PRINTER_MODEL).is_some());
        assert!(rules.message_text(constants::MSG_GCODE_CHECK_FAIL).is_some());
    }
}
