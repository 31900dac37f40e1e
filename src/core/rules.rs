// GcodeGate - core/rules.rs
//
// Ordered check-item engine. Items may rewrite the line sequence or stop the
// run with a hard failure; the first hard failure ends processing.

use crate::core::metadata::embedded_integer;
use crate::core::model::{CheckAction, CheckItem, GcodeLine, KeywordTable};

/// Result of running every check item.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    /// All items passed; contains the rewritten lines.
    Passed(Vec<GcodeLine>),
    /// A hard check failed; names that item's message.
    Violation { message: String },
}

/// Rule outcome plus the soft-fail advisories gathered before it.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleRun {
    pub outcome: RuleOutcome,
    pub advisories: Vec<String>,
}

/// Verdict of a single check item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Pass,
    SoftFail,
    HardFail,
}

/// Apply `items` in order to `lines`.
pub fn run_check_items<'a, I>(mut lines: Vec<GcodeLine>, items: I, keywords: &KeywordTable) -> RuleRun
where
    I: IntoIterator<Item = &'a CheckItem>,
{
    let mut advisories = Vec::new();

    for (idx, item) in items.into_iter().enumerate() {
        let verdict = apply_item(&mut lines, item, keywords);
        tracing::debug!(
            index = idx,
            command = %item.command,
            action = item.action.name(),
            verdict = ?verdict,
            "Check item applied"
        );

        match verdict {
            Verdict::Pass => {}
            Verdict::SoftFail => advisories.push(item.message.clone()),
            Verdict::HardFail => {
                tracing::info!(
                    command = %item.command,
                    action = item.action.name(),
                    message = %item.message,
                    "Hard check failed; stopping"
                );
                return RuleRun {
                    outcome: RuleOutcome::Violation {
                        message: item.message.clone(),
                    },
                    advisories,
                };
            }
        }
    }

    RuleRun {
        outcome: RuleOutcome::Passed(lines),
        advisories,
    }
}

fn apply_item(lines: &mut Vec<GcodeLine>, item: &CheckItem, keywords: &KeywordTable) -> Verdict {
    match &item.action {
        CheckAction::RemoveCommandAll => {
            lines.retain(|l| l.command != item.command);
            Verdict::Pass
        }
        CheckAction::AddCommandAtEnd { params } => {
            lines.push(GcodeLine::code(item.command.as_str(), params.clone(), ""));
            Verdict::Pass
        }
        CheckAction::CommandMustExist { comment_match } => {
            if command_exists(lines, &item.command, comment_match) {
                Verdict::Pass
            } else {
                Verdict::HardFail
            }
        }
        CheckAction::CommandParamMin(min) => {
            param_bound_holds(lines, &item.command, |v| v >= *min).into()
        }
        CheckAction::CommandParamMax(max) => {
            param_bound_holds(lines, &item.command, |v| v <= *max).into()
        }
        CheckAction::KeywordCheck { keyword_id } => {
            let found = match keywords.get(keyword_id) {
                Some(value) => printer_notes_contain(lines, value),
                None => {
                    tracing::warn!(keyword_id = %keyword_id, "Keyword id not in table; treating as missing");
                    false
                }
            };
            match (found, item.hard_fail) {
                (true, _) => Verdict::Pass,
                (false, true) => Verdict::HardFail,
                (false, false) => Verdict::SoftFail,
            }
        }
    }
}

impl From<bool> for Verdict {
    fn from(passed: bool) -> Self {
        if passed {
            Verdict::Pass
        } else {
            Verdict::HardFail
        }
    }
}

/// A code line with `command`, or a comment-only line (target `;`) whose
/// comment contains `comment_match`, ignoring case and surrounding whitespace.
fn command_exists(lines: &[GcodeLine], command: &str, comment_match: &str) -> bool {
    let needle = comment_match.trim().to_lowercase();
    lines.iter().any(|l| {
        l.command == command
            && (!l.is_comment_only() || l.comment.trim().to_lowercase().contains(&needle))
    })
}

/// Every `command` line's first param satisfies `ok`. A line with no first
/// param, or no digits in it, fails.
fn param_bound_holds(lines: &[GcodeLine], command: &str, ok: impl Fn(u64) -> bool) -> bool {
    lines
        .iter()
        .filter(|l| l.command == command)
        .all(|l| match l.params.first().and_then(|p| embedded_integer(p)) {
            Some(value) => ok(value),
            None => {
                tracing::debug!(command, params = ?l.params, "No numeric first param");
                false
            }
        })
}

fn printer_notes_contain(lines: &[GcodeLine], keyword: &str) -> bool {
    lines
        .iter()
        .any(|l| l.printer_notes().is_some_and(|notes| notes.contains(keyword)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tokenizer::tokenize;

    fn item(command: &str, action: CheckAction, hard_fail: bool, message: &str) -> CheckItem {
        CheckItem {
            command: command.to_string(),
            action,
            hard_fail,
            message: message.to_string(),
        }
    }

    fn keywords() -> KeywordTable {
        let mut table = KeywordTable::new();
        table.insert("mk3s", "PRINTER_MODEL_MK3S");
        table.insert("mmu", "MMU2S");
        table
    }

    fn run(text: &str, items: &[CheckItem]) -> RuleRun {
        run_check_items(tokenize(text).unwrap(), items, &keywords())
    }

    fn passed_lines(run: RuleRun) -> Vec<GcodeLine> {
        match run.outcome {
            RuleOutcome::Passed(lines) => lines,
            other => panic!("Expected Passed, got: {other:?}"),
        }
    }

    #[test]
    fn test_remove_command_all_drops_adjacent_occurrences() {
        let text = "M862.3 P\"MK3S\"\nM862.3 P\"MK3S\"\nG28\nM862.3 P\"MK3S\"\nG1 X1\nM862.3 P\"MK3S\"";
        let items = [item("M862.3", CheckAction::RemoveCommandAll, true, "X")];
        let lines = passed_lines(run(text, &items));
        let commands: Vec<_> = lines.iter().map(|l| l.command.as_str()).collect();
        assert_eq!(commands, vec!["G28", "G1"]);
    }

    #[test]
    fn test_add_command_at_end_appends_line() {
        let items = [item(
            "M84",
            CheckAction::AddCommandAtEnd {
                params: vec!["X".to_string(), "Y".to_string()],
            },
            true,
            "X",
        )];
        let lines = passed_lines(run("G28\n; end", &items));
        assert_eq!(lines.last(), Some(&GcodeLine::code("M84", vec!["X".into(), "Y".into()], "")));
    }

    #[test]
    fn test_command_must_exist_code_line() {
        let items = [item(
            "G28",
            CheckAction::CommandMustExist {
                comment_match: String::new(),
            },
            true,
            "NO_HOME",
        )];
        assert!(matches!(run("G28 W\nG1 X1", &items).outcome, RuleOutcome::Passed(_)));
        assert_eq!(
            run("G1 X1", &items).outcome,
            RuleOutcome::Violation {
                message: "NO_HOME".to_string()
            }
        );
    }

    #[test]
    fn test_command_must_exist_comment_match_is_case_insensitive() {
        let items = [item(
            ";",
            CheckAction::CommandMustExist {
                comment_match: "  Generated By PrusaSlicer ".to_string(),
            },
            true,
            "WRONG_SLICER",
        )];
        assert!(matches!(
            run("; generated by PrusaSlicer 2.6.0\nG28", &items).outcome,
            RuleOutcome::Passed(_)
        ));
        assert!(matches!(
            run("; generated by Cura\nG28", &items).outcome,
            RuleOutcome::Violation { .. }
        ));
    }

    #[test]
    fn test_param_min() {
        let items = [item("M104", CheckAction::CommandParamMin(100), true, "TOO_COLD")];
        assert_eq!(
            run("M104 S90", &items).outcome,
            RuleOutcome::Violation {
                message: "TOO_COLD".to_string()
            }
        );
        assert!(matches!(run("M104 S150", &items).outcome, RuleOutcome::Passed(_)));
    }

    #[test]
    fn test_param_max_checks_every_line() {
        let items = [item("M140", CheckAction::CommandParamMax(110), true, "BED_TOO_HOT")];
        assert!(matches!(run("M140 S60\nM140 S110", &items).outcome, RuleOutcome::Passed(_)));
        assert!(matches!(
            run("M140 S60\nM140 S120", &items).outcome,
            RuleOutcome::Violation { .. }
        ));
    }

    #[test]
    fn test_param_check_without_param_fails_closed() {
        let items = [item("M104", CheckAction::CommandParamMax(260), true, "BAD_TEMP")];
        assert!(matches!(run("M104", &items).outcome, RuleOutcome::Violation { .. }));
    }

    #[test]
    fn test_param_check_ignores_other_commands() {
        let items = [item("M104", CheckAction::CommandParamMin(100), true, "TOO_COLD")];
        assert!(matches!(run("M109 S10\nG28", &items).outcome, RuleOutcome::Passed(_)));
    }

    #[test]
    fn test_keyword_check_soft_fail_records_advisory() {
        let items = [item(
            ";",
            CheckAction::KeywordCheck {
                keyword_id: "mmu".to_string(),
            },
            false,
            "NO_MMU",
        )];
        let result = run("; printer_notes = PRINTER_MODEL_MK3S\nG28", &items);
        assert!(matches!(result.outcome, RuleOutcome::Passed(_)));
        assert_eq!(result.advisories, vec!["NO_MMU"]);
    }

    #[test]
    fn test_keyword_check_hard_fail() {
        let items = [item(
            ";",
            CheckAction::KeywordCheck {
                keyword_id: "mmu".to_string(),
            },
            true,
            "NO_MMU",
        )];
        let result = run("; printer_notes = PRINTER_MODEL_MK3S\nG28", &items);
        assert!(matches!(result.outcome, RuleOutcome::Violation { .. }));
    }

    #[test]
    fn test_keyword_check_found() {
        let items = [item(
            ";",
            CheckAction::KeywordCheck {
                keyword_id: "mk3s".to_string(),
            },
            true,
            "WRONG_PRINTER",
        )];
        let result = run("G28\n; printer_notes = PRINTER_MODEL_MK3S", &items);
        assert!(matches!(result.outcome, RuleOutcome::Passed(_)));
        assert!(result.advisories.is_empty());
    }

    #[test]
    fn test_unknown_keyword_id_counts_as_missing() {
        let items = [item(
            ";",
            CheckAction::KeywordCheck {
                keyword_id: "nope".to_string(),
            },
            false,
            "NOPE",
        )];
        assert_eq!(run("; printer_notes = X", &items).advisories, vec!["NOPE"]);
    }

    #[test]
    fn test_hard_failure_stops_later_items() {
        let items = [
            item(
                ";",
                CheckAction::KeywordCheck {
                    keyword_id: "mmu".to_string(),
                },
                false,
                "SOFT_1",
            ),
            item("M104", CheckAction::CommandParamMin(100), true, "HARD"),
            item(
                ";",
                CheckAction::KeywordCheck {
                    keyword_id: "mmu".to_string(),
                },
                false,
                "SOFT_2",
            ),
        ];
        let result = run("M104 S0", &items);
        assert_eq!(
            result.outcome,
            RuleOutcome::Violation {
                message: "HARD".to_string()
            }
        );
        assert_eq!(result.advisories, vec!["SOFT_1"]);
    }

    #[test]
    fn test_items_see_earlier_rewrites() {
        let items = [
            item("M104", CheckAction::RemoveCommandAll, true, "X"),
            item("M104", CheckAction::CommandParamMin(100), true, "TOO_COLD"),
        ];
        assert!(matches!(run("M104 S0\nG28", &items).outcome, RuleOutcome::Passed(_)));
    }
}
