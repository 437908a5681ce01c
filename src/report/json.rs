use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::model::assay::Assay;
use crate::model::settings::RunSettings;
use crate::pipeline::{RunSummary, Skipped};

#[derive(Debug, Clone, Serialize)]
pub struct AssayCounts {
    pub id: String,
    pub n_rows: usize,
    pub n_groups: usize,
    pub n_missing: usize,
    pub efficiency: f64,
}

impl AssayCounts {
    pub fn of(assay: &Assay) -> Self {
        Self {
            id: assay.id().to_string(),
            n_rows: assay.len(),
            n_groups: assay.groups().len(),
            n_missing: assay.rows().iter().filter(|r| r.ct.is_nan()).count(),
            efficiency: assay.efficiency(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryReport<'a> {
    pub tool: &'static str,
    pub version: &'static str,
    pub settings: &'a RunSettings,
    pub mode: &'static str,
    pub efficiencies: BTreeMap<String, f64>,
    pub assays: Vec<AssayCounts>,
    pub normalisers: Vec<AssayCounts>,
    pub result_columns: Vec<String>,
    pub n_result_rows: usize,
    pub skipped: &'a [Skipped],
    pub outputs: Vec<String>,
}

impl<'a> SummaryReport<'a> {
    pub fn build(settings: &'a RunSettings, summary: &'a RunSummary) -> Self {
        let efficiencies = summary
            .samples
            .iter()
            .chain(&summary.normalisers)
            .map(|a| (a.id().to_string(), a.efficiency()))
            .collect();
        Self {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            settings,
            mode: summary.mode.name(),
            efficiencies,
            assays: summary.samples.iter().map(AssayCounts::of).collect(),
            normalisers: summary.normalisers.iter().map(AssayCounts::of).collect(),
            result_columns: summary.results.column_names(),
            n_result_rows: summary.results.n_rows(),
            skipped: &summary.skipped,
            outputs: summary
                .outputs
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

pub fn render_summary_json(report: &SummaryReport<'_>) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
