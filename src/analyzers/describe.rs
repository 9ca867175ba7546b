use crate::models::{EnrichedStation, PercentileLevels};

fn fraction_to_days(p: f64) -> i64 {
    (p * 365.25).round() as i64
}

fn fraction_to_months(p: f64) -> i64 {
    (p * 12.0).round() as i64
}

/// Plain-language reading of percentile level `p` for a window of
/// `total_days` days.
pub fn describe_percentile(p: f64, total_days: u32) -> String {
    if p == 0.0 {
        format!("temp. min in {} days", total_days)
    } else if p == 1.0 {
        format!("temp. max in {} days", total_days)
    } else if p < 0.15 {
        format!("temp. ≤ this {} days/year", fraction_to_days(p))
    } else if p < 0.51 {
        format!("temp. ≤ this {} months/year", fraction_to_months(p))
    } else if 1.0 - p < 0.15 {
        format!("temp. ≥ this {} days/year", fraction_to_days(1.0 - p))
    } else {
        format!("temp. ≥ this {} months/year", fraction_to_months(1.0 - p))
    }
}

fn format_value(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}", v))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Markdown table of one station's percentiles.
pub fn summary_markdown(station: &EnrichedStation, levels: &PercentileLevels) -> String {
    let summary = &station.summary;
    let mut out = String::new();

    out.push_str(&format!(
        "### {}: {} ({:.1}% good data over {} days)\n\n",
        station.id(),
        station.station.description,
        summary.completeness() * 100.0,
        summary.window_days
    ));
    if summary.degenerate {
        out.push_str("_At least one series has no data in the window._\n\n");
    }

    out.push_str("| percentile | low °C | high °C | description |\n");
    out.push_str("|---:|---:|---:|:---|\n");
    for (i, &p) in levels.as_slice().iter().enumerate() {
        out.push_str(&format!(
            "| {:.1} | {} | {} | {} |\n",
            p * 100.0,
            format_value(summary.low_values_c.get(i).copied().flatten()),
            format_value(summary.high_values_c.get(i).copied().flatten()),
            describe_percentile(p, summary.window_days)
        ));
    }

    out
}
