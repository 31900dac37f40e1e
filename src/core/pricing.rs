// GcodeGate - core/pricing.rs
//
// Print cost estimation and human-readable durations for submitter messages.

use crate::util::constants;

/// Pricing parameters, validated by platform::config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingConfig {
    pub rate_per_gram: f64,
    /// Applied to jobs that are not tax exempt.
    pub tax_multiplier: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            rate_per_gram: constants::DEFAULT_RATE_PER_GRAM,
            tax_multiplier: constants::DEFAULT_TAX_MULTIPLIER,
        }
    }
}

/// Estimated cost of a print, rounded to cents.
///
/// Tax-exempt jobs (those billed to a permission code) skip the tax multiplier.
pub fn estimate_cost(weight_g: f64, pricing: &PricingConfig, tax_exempt: bool) -> f64 {
    let mut cost = weight_g * pricing.rate_per_gram;
    if !tax_exempt {
        cost *= pricing.tax_multiplier;
    }
    round_cents(cost)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Render seconds as `H:MM:SS`, prefixed with `N day(s), ` past 24 hours.
pub fn format_duration(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    let clock = format!("{hours}:{minutes:02}:{seconds:02}");
    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        n => format!("{n} days, {clock}"),
    }
}
