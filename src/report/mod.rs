pub mod json;
pub mod tsv;

use crate::math::format_f64_6;

pub const RESULTS_FILE: &str = "results.tsv";
pub const STATS_FILE: &str = "results_stats.tsv";
pub const FILTER_FILE: &str = "filter_report.tsv";
pub const EFFICIENCIES_FILE: &str = "efficiencies.tsv";
pub const CURVES_FILE: &str = "efficiency_curves.tsv";
pub const SUMMARY_FILE: &str = "summary.json";

pub fn format_ci(ci: (f64, f64)) -> String {
    format!("[{}, {}]", format_f64_6(ci.0), format_f64_6(ci.1))
}

pub fn format_indices(indices: &[usize]) -> String {
    if indices.is_empty() {
        return "-".to_string();
    }
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
