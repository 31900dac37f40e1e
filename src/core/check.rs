// GcodeGate - core/check.rs
//
// The full check pipeline: tokenize, extract metadata, run the resolved
// model's check items, serialize. Produces exactly one outcome per call.

use crate::core::metadata;
use crate::core::model::{CheckOutcome, CheckReport, RuleSet};
use crate::core::rules::{self, RuleOutcome};
use crate::core::serializer;
use crate::core::tokenizer;

/// Check a gcode buffer against a rule set.
///
/// Never fails: parse failures, rule violations and missing models are all
/// reported as outcomes.
pub fn check_gcode(text: &str, rules: &RuleSet) -> CheckReport {
    let lines = match tokenizer::tokenize(text) {
        Ok(lines) if !lines.is_empty() => lines,
        Ok(_) => {
            tracing::info!("Gcode contains no instruction lines");
            return invalid(None, None);
        }
        Err(e) => {
            tracing::info!(error = %e, "Gcode could not be tokenized");
            return invalid(None, None);
        }
    };

    let meta = metadata::extract_metadata(&lines, &rules.models);

    let model = match meta.model_id.as_deref().and_then(|id| rules.model(id)) {
        Some(model) => model,
        None => {
            tracing::info!("No printer model resolved");
            return CheckReport {
                outcome: CheckOutcome::NoPrinterModel,
                advisories: Vec::new(),
            };
        }
    };

    let run = rules::run_check_items(lines, rules.items_for(model), &rules.keywords);

    let outcome = match run.outcome {
        RuleOutcome::Violation { message } => {
            tracing::info!(model = %model.id, message = %message, "Gcode rejected");
            CheckOutcome::Invalid {
                message: Some(message),
                model_id: Some(model.id.clone()),
            }
        }
        RuleOutcome::Passed(lines) => {
            tracing::info!(
                model = %model.id,
                lines = lines.len(),
                advisories = run.advisories.len(),
                "Gcode accepted"
            );
            CheckOutcome::Valid {
                text: serializer::serialize(&lines),
                weight_g: meta.weight_g.unwrap_or(0.0),
                time_s: meta.time_s.unwrap_or(0),
                model_id: model.id.clone(),
            }
        }
    };

    CheckReport {
        outcome,
        advisories: run.advisories,
    }
}

fn invalid(message: Option<String>, model_id: Option<String>) -> CheckReport {
    CheckReport {
        outcome: CheckOutcome::Invalid { message, model_id },
        advisories: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{CheckAction, CheckItem, KeywordTable, PrinterModel};

    fn rules_with(items: Vec<CheckItem>) -> RuleSet {
        let mut keywords = KeywordTable::new();
        keywords.insert("mk3s", "PRINTER_MODEL_MK3S");
        keywords.insert("mmu", "MMU2S");
        RuleSet {
            id: "test".to_string(),
            name: "Test".to_string(),
            models: vec![PrinterModel {
                id: "prusa-mk3s".to_string(),
                name: "Prusa MK3S".to_string(),
                description: String::new(),
                keyword: "PRINTER_MODEL_MK3S".to_string(),
                auto_start_prints: false,
                check_items: items,
            }],
            keywords,
            ..RuleSet::default()
        }
    }

    const SLICED: &str = "G28 ; home\n\
                          M104 S215\n\
                          G1 X10 Y10\n\
                          ; total filament used [g] = 20.5\n\
                          ; estimated printing time (normal mode) = 2h 0m 30s\n\
                          ; printer_notes = PRINTER_VENDOR_PRUSA3D PRINTER_MODEL_MK3S";

    #[test]
    fn test_empty_input_is_invalid() {
        let report = check_gcode("", &rules_with(vec![]));
        assert_eq!(
            report.outcome,
            CheckOutcome::Invalid {
                message: None,
                model_id: None
            }
        );
        let report = check_gcode("\n\r\n  \n", &rules_with(vec![]));
        assert!(matches!(report.outcome, CheckOutcome::Invalid { message: None, .. }));
    }

    #[test]
    fn test_binary_input_is_invalid() {
        let report = check_gcode("PK\u{3}\u{4}\u{0}\u{0}", &rules_with(vec![]));
        assert!(matches!(report.outcome, CheckOutcome::Invalid { message: None, .. }));
    }

    #[test]
    fn test_no_items_yields_valid_with_extracted_facts() {
        let report = check_gcode(SLICED, &rules_with(vec![]));
        assert_eq!(
            report.outcome,
            CheckOutcome::Valid {
                text: SLICED.to_string(),
                weight_g: 20.5,
                time_s: 7_230,
                model_id: "prusa-mk3s".to_string(),
            }
        );
        assert!(report.advisories.is_empty());
    }

    #[test]
    fn test_missing_model_skips_items() {
        let items = vec![CheckItem {
            command: "G28".to_string(),
            action: CheckAction::CommandMustExist {
                comment_match: String::new(),
            },
            hard_fail: true,
            message: "NO_HOME".to_string(),
        }];
        let report = check_gcode("G1 X1\n; printer_notes = SOMETHING", &rules_with(items));
        assert_eq!(report.outcome, CheckOutcome::NoPrinterModel);
    }

    #[test]
    fn test_violation_carries_model_id() {
        let items = vec![CheckItem {
            command: "M104".to_string(),
            action: CheckAction::CommandParamMax(200),
            hard_fail: true,
            message: "NOZZLE_TOO_HOT".to_string(),
        }];
        let report = check_gcode(SLICED, &rules_with(items));
        assert_eq!(
            report.outcome,
            CheckOutcome::Invalid {
                message: Some("NOZZLE_TOO_HOT".to_string()),
                model_id: Some("prusa-mk3s".to_string()),
            }
        );
    }

    #[test]
    fn test_soft_keyword_miss_still_valid() {
        let items = vec![CheckItem {
            command: ";".to_string(),
            action: CheckAction::KeywordCheck {
                keyword_id: "mmu".to_string(),
            },
            hard_fail: false,
            message: "MMU_RECOMMENDED".to_string(),
        }];
        let report = check_gcode(SLICED, &rules_with(items));
        assert!(report.outcome.is_valid());
        assert_eq!(report.advisories, vec!["MMU_RECOMMENDED"]);
    }

    #[test]
    fn test_transformations_reach_serialized_text() {
        let items = vec![
            CheckItem {
                command: "M104".to_string(),
                action: CheckAction::RemoveCommandAll,
                hard_fail: true,
                message: "X".to_string(),
            },
            CheckItem {
                command: "M84".to_string(),
                action: CheckAction::AddCommandAtEnd { params: vec![] },
                hard_fail: true,
                message: "X".to_string(),
            },
        ];
        let report = check_gcode(SLICED, &rules_with(items));
        match report.outcome {
            CheckOutcome::Valid { text, .. } => {
                assert!(!text.contains("M104"));
                assert!(text.ends_with("PRINTER_MODEL_MK3S\nM84"));
            }
            other => panic!("Expected Valid, got: {other:?}"),
        }
    }

    #[test]
    fn test_missing_facts_default_to_zero() {
        let report = check_gcode("G28\n; printer_notes = PRINTER_MODEL_MK3S", &rules_with(vec![]));
        match report.outcome {
            CheckOutcome::Valid { weight_g, time_s, .. } => {
                assert_eq!(weight_g, 0.0);
                assert_eq!(time_s, 0);
            }
            other => panic!("Expected Valid, got: {other:?}"),
        }
    }
}
