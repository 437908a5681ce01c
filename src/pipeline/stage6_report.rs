use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::calibration::SaveMode;
use crate::error::Result;
use crate::model::settings::RunSettings;
use crate::pipeline::RunSummary;
use crate::report::json::{SummaryReport, render_summary_json};
use crate::report::tsv::{
    write_curves_tsv, write_filter_report, write_results_tsv, write_stats_tsv,
};
use crate::report::{
    CURVES_FILE, EFFICIENCIES_FILE, FILTER_FILE, RESULTS_FILE, STATS_FILE, SUMMARY_FILE,
};

/// Write every report into `out_dir` and record the written paths on `summary`.
pub fn run_stage6(out_dir: &Path, settings: &RunSettings, summary: &mut RunSummary) -> Result<()> {
    fs::create_dir_all(out_dir)?;
    let mut outputs: Vec<PathBuf> = Vec::new();

    let path = out_dir.join(RESULTS_FILE);
    write_results_tsv(&summary.results, &path)?;
    outputs.push(path);

    let path = out_dir.join(STATS_FILE);
    write_stats_tsv(summary.results.stats(&settings.stats), &path)?;
    outputs.push(path);

    if !summary.filter_reports.is_empty() {
        let path = out_dir.join(FILTER_FILE);
        write_filter_report(&summary.filter_reports, &path)?;
        outputs.push(path);
    }

    if let Some(calibrator) = &summary.calibrator {
        if !calibrator.table().is_empty() {
            let path = out_dir.join(EFFICIENCIES_FILE);
            calibrator.table().save(&path, SaveMode::Write)?;
            outputs.push(path);
        }
        if calibrator.curves().next().is_some() {
            let path = out_dir.join(CURVES_FILE);
            write_curves_tsv(calibrator, &path)?;
            outputs.push(path);
        }
    }

    let summary_path = out_dir.join(SUMMARY_FILE);
    outputs.push(summary_path.clone());
    summary.outputs = outputs;
    let json = render_summary_json(&SummaryReport::build(settings, summary))?;
    fs::write(&summary_path, json)?;

    info!(out_dir = %out_dir.display(), n_files = summary.outputs.len(), "reports written");
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage6_report.rs"]
mod tests;
