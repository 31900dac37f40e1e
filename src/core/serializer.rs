// GcodeGate - core/serializer.rs
//
// Instruction lines -> gcode text. Inverse of the tokenizer for lines in
// canonical spacing.

use crate::core::model::GcodeLine;
use crate::util::constants;

/// Render lines back into gcode text, one per line, joined by `\n`.
pub fn serialize(lines: &[GcodeLine]) -> String {
    let mut out = String::new();
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        write_line(line, &mut out);
    }
    out
}

fn write_line(line: &GcodeLine, out: &mut String) {
    if line.is_comment_only() {
        out.push_str(constants::COMMENT_MARKER);
        if !line.comment.is_empty() {
            out.push(' ');
            out.push_str(&line.comment);
        }
        return;
    }

    out.push_str(&line.command);
    for param in &line.params {
        out.push(' ');
        out.push_str(param);
    }
    if !line.comment.is_empty() {
        out.push(' ');
        out.push_str(constants::COMMENT_MARKER);
        out.push(' ');
        out.push_str(&line.comment);
    }
}
