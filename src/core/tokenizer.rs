// GcodeGate - core/tokenizer.rs
//
// Raw gcode text -> ordered instruction lines.
// Core layer: operates on an in-memory buffer, never touches the filesystem.

use crate::core::model::GcodeLine;
use crate::util::constants;
use crate::util::error::TokenizeError;
use crate::util::logging;

/// Split a gcode buffer into instruction lines.
///
/// Empty and whitespace-only raw lines are dropped rather than treated as
/// malformed, so stray indentation never fails a whole upload. Everything
/// after the first `;` of a line is its comment, further `;` characters
/// included. Code that remains is split on whitespace into command and params.
///
/// Fails on structurally malformed input (NUL bytes, as found in binary
/// uploads). The caller treats failure like an empty result.
pub fn tokenize(text: &str) -> Result<Vec<GcodeLine>, TokenizeError> {
    let mut lines = Vec::new();

    for (idx, raw) in text.split('\n').enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if raw.trim().is_empty() {
            continue;
        }

        if raw.contains('\0') {
            tracing::debug!(
                line_number = idx + 1,
                preview = logging::preview(raw),
                "Rejecting line with NUL byte"
            );
            return Err(TokenizeError::MalformedLine {
                line_number: idx + 1,
                reason: "contains NUL bytes (binary content?)",
            });
        }

        lines.push(tokenize_line(raw));
    }

    tracing::trace!(lines = lines.len(), "Tokenized gcode");
    Ok(lines)
}

/// Tokenize one non-empty raw line.
fn tokenize_line(raw: &str) -> GcodeLine {
    let (code, comment) = match raw.split_once(constants::COMMENT_MARKER) {
        Some((code, comment)) => (code, comment.trim()),
        None => (raw, ""),
    };

    let mut tokens = code.split_whitespace();
    match tokens.next() {
        Some(command) => GcodeLine::code(command, tokens.map(str::to_string).collect(), comment),
        None => GcodeLine::comment_only(comment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_code_line_with_comment() {
        let lines = tokenize("G1 X10 Y20.5 F1500 ; move to start").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].command, "G1");
        assert_eq!(lines[0].params, vec!["X10", "Y20.5", "F1500"]);
        assert_eq!(lines[0].comment, "move to start");
    }

    #[test]
    fn test_tokenize_comment_only_line() {
        let lines = tokenize("; total filament used [g] = 12.34").unwrap();
        assert!(lines[0].is_comment_only());
        assert!(lines[0].params.is_empty());
        assert_eq!(lines[0].comment, "total filament used [g] = 12.34");
    }

    #[test]
    fn test_tokenize_drops_empty_lines() {
        let lines = tokenize("G28\n\n   \r\nG29\r\n").unwrap();
        let commands: Vec<_> = lines.iter().map(|l| l.command.as_str()).collect();
        assert_eq!(commands, vec!["G28", "G29"]);
    }

    #[test]
    fn test_tokenize_indented_comment_is_comment_only() {
        let lines = tokenize("   ; indented note").unwrap();
        assert!(lines[0].is_comment_only());
        assert_eq!(lines[0].comment, "indented note");
    }

    #[test]
    fn test_tokenize_keeps_everything_after_first_semicolon() {
        let lines = tokenize("M117 Hi ; first ; second").unwrap();
        assert_eq!(lines[0].params, vec!["Hi"]);
        assert_eq!(lines[0].comment, "first ; second");
    }

    #[test]
    fn test_tokenize_empty_input_yields_no_lines() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("\n\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_rejects_nul_bytes() {
        let err = tokenize("G28\nPK\u{0}\u{3}\u{4}").unwrap_err();
        assert_eq!(
            err,
            TokenizeError::MalformedLine {
                line_number: 2,
                reason: "contains NUL bytes (binary content?)",
            }
        );
    }
}
