// GcodeGate - core/metadata.rs
//
// Slicer metadata extraction: print weight, print time, and printer model.
//
// Slicers write their summary comments at the end of the file, so every
// extractor walks the lines backwards and the first value found wins. Each
// fact has its own extractor; `extract_metadata` combines all three in a
// single backward walk that stops once everything is resolved.

use crate::core::model::{GcodeLine, GcodeMetadata, PrinterModel};
use crate::util::constants;
use regex::Regex;
use std::sync::OnceLock;

// =============================================================================
// Combined walk
// =============================================================================

/// Resolve weight, time, and model from the file's comments.
pub fn extract_metadata(lines: &[GcodeLine], models: &[PrinterModel]) -> GcodeMetadata {
    let mut meta = GcodeMetadata::default();

    for line in lines.iter().rev() {
        if meta.is_complete() {
            break;
        }
        let comment = line.comment.as_str();

        if meta.time_s.is_none() {
            meta.time_s = print_time_from_comment(comment);
        }
        if meta.weight_g.is_none() {
            meta.weight_g = weight_from_comment(comment);
        }
        if meta.model_id.is_none() {
            meta.model_id = model_from_comment(comment, models).map(|m| m.id.clone());
        }
    }

    tracing::debug!(
        weight_g = ?meta.weight_g,
        time_s = ?meta.time_s,
        model = ?meta.model_id,
        "Metadata extracted"
    );

    meta
}

// =============================================================================
// Individual extractors
// =============================================================================

/// Last print time estimate in the file, in seconds.
pub fn extract_print_time(lines: &[GcodeLine]) -> Option<u64> {
    lines
        .iter()
        .rev()
        .find_map(|l| print_time_from_comment(&l.comment))
}

/// Last filament weight estimate in the file, in grams.
pub fn extract_weight(lines: &[GcodeLine]) -> Option<f64> {
    lines.iter().rev().find_map(|l| weight_from_comment(&l.comment))
}

/// Model named by the last `printer_notes` comment that matches any model.
pub fn resolve_model<'a>(
    lines: &[GcodeLine],
    models: &'a [PrinterModel],
) -> Option<&'a PrinterModel> {
    lines
        .iter()
        .rev()
        .find_map(|l| model_from_comment(&l.comment, models))
}

fn print_time_from_comment(comment: &str) -> Option<u64> {
    let value = comment.strip_prefix(constants::PRINT_TIME_PREFIX)?;
    let secs = parse_duration(value);
    if secs.is_none() {
        tracing::debug!(value = value.trim(), "Unparseable print time estimate; skipping");
    }
    secs
}

fn weight_from_comment(comment: &str) -> Option<f64> {
    let value = comment.strip_prefix(constants::WEIGHT_PREFIX)?.trim();
    match value.parse::<f64>() {
        Ok(grams) if grams.is_finite() => Some(grams),
        _ => {
            tracing::debug!(value, "Unparseable filament weight; skipping");
            None
        }
    }
}

fn model_from_comment<'a>(comment: &str, models: &'a [PrinterModel]) -> Option<&'a PrinterModel> {
    if !comment.starts_with(constants::PRINTER_NOTES_PREFIX) {
        return None;
    }
    models
        .iter()
        .find(|m| !m.keyword.is_empty() && comment.contains(m.keyword.as_str()))
}

// =============================================================================
// Value parsing
// =============================================================================

/// Parse a slicer duration such as `1d 2h 3m 4s` into seconds.
///
/// Tokens are read from the right: seconds, minutes, hours, days. A duration
/// with fewer tokens simply has no larger units; tokens past days are ignored.
/// Only the digits of each token count, so the unit letters are not checked.
pub fn parse_duration(value: &str) -> Option<u64> {
    let mut total: u64 = 0;
    for (token, unit) in value
        .split_whitespace()
        .rev()
        .zip(constants::DURATION_UNIT_SECONDS)
    {
        let amount = embedded_integer(token)?;
        total = total.checked_add(amount.checked_mul(unit)?)?;
    }
    Some(total)
}

/// Integer formed by the digits of `token`, other characters ignored.
///
/// `S215` -> 215, `T0` -> 0, `S-5` -> 5. `None` when there are no digits or the
/// value does not fit in a `u64`.
pub fn embedded_integer(token: &str) -> Option<u64> {
    static NON_DIGITS: OnceLock<Regex> = OnceLock::new();
    let re = NON_DIGITS.get_or_init(|| Regex::new(r"\D+").expect("embedded_integer: invalid regex"));
    let digits = re.replace_all(token, "");
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
