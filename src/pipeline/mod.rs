use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::calibration::Calibrator;
use crate::error::{QpcrError, Result};
use crate::model::assay::Assay;
use crate::model::settings::{BatchPolicy, RunSettings};
use crate::results::Results;

pub mod stage1_input;
pub mod stage2_filter;
pub mod stage3_calibrate;
pub mod stage4_delta_ct;
pub mod stage5_normalise;
pub mod stage6_report;

use stage2_filter::FilterReport;
use stage4_delta_ct::Analyser;
use stage5_normalise::{NormMode, Normaliser};

/// An assay left out of a batch run, with the stage that rejected it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub assay: String,
    pub stage: &'static str,
    pub reason: String,
}

/// Assays that made it through a batch stage plus those that were skipped.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub assays: Vec<Assay>,
    pub skipped: Vec<Skipped>,
}

impl BatchOutcome {
    /// Abort returns `err`; Skip logs it and records the assay as skipped.
    pub fn fail_or_skip(
        &mut self,
        assay: &str,
        stage: &'static str,
        err: QpcrError,
        policy: BatchPolicy,
    ) -> Result<()> {
        match policy {
            BatchPolicy::Abort => Err(err),
            BatchPolicy::Skip => {
                warn!(assay = %assay, stage, error = %err, "assay skipped");
                self.skipped.push(Skipped {
                    assay: assay.to_string(),
                    stage,
                    reason: err.to_string(),
                });
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub assays: Vec<PathBuf>,
    pub normalisers: Vec<PathBuf>,
    pub out_dir: PathBuf,
}

/// Everything a run produced, kept in memory for callers of the library.
#[derive(Debug)]
pub struct RunSummary {
    pub samples: Vec<Assay>,
    pub normalisers: Vec<Assay>,
    pub results: Results,
    pub calibrator: Option<Calibrator>,
    pub filter_reports: Vec<FilterReport>,
    pub skipped: Vec<Skipped>,
    pub mode: NormMode,
    pub outputs: Vec<PathBuf>,
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Read, filter, calibrate, analyse and normalise, then write the reports into `inputs.out_dir`.
pub fn run(settings: &RunSettings, inputs: &PipelineInputs) -> Result<RunSummary> {
    if inputs.assays.is_empty() {
        return Err(QpcrError::InvalidSetting("no assay files given".to_string()));
    }
    if inputs.normalisers.is_empty() {
        return Err(QpcrError::InvalidSetting(
            "no normaliser files given".to_string(),
        ));
    }
    let resolved = settings.resolve()?;
    let policy = settings.batch;

    let start = Instant::now();
    let mut samples = stage1_input::run_stage1(&inputs.assays, settings)?;
    let mut normalisers = stage1_input::run_stage1(&inputs.normalisers, settings)?;
    info!(
        stage = "input",
        n_assays = samples.len(),
        n_normalisers = normalisers.len(),
        elapsed_ms = elapsed_ms(start),
        "stage finished"
    );

    let start = Instant::now();
    let mut filter_reports = Vec::new();
    if let Some(kind) = &resolved.filter {
        filter_reports.extend(stage2_filter::run_stage2(kind, &mut samples)?);
        filter_reports.extend(stage2_filter::run_stage2(kind, &mut normalisers)?);
        info!(
            stage = "filter",
            n_reports = filter_reports.len(),
            elapsed_ms = elapsed_ms(start),
            "stage finished"
        );
    }

    let mut skipped = Vec::new();
    let mut calibrator = None;
    if settings.calibration.is_enabled() {
        let start = Instant::now();
        let mut cal = stage3_calibrate::calibrator_from_settings(&settings.calibration)?;
        let outcome =
            stage3_calibrate::run_stage3(&mut cal, samples, &settings.calibration, policy)?;
        samples = outcome.assays;
        skipped.extend(outcome.skipped);
        let outcome =
            stage3_calibrate::run_stage3(&mut cal, normalisers, &settings.calibration, policy)?;
        normalisers = outcome.assays;
        skipped.extend(outcome.skipped);
        info!(
            stage = "calibrate",
            n_efficiencies = cal.table().len(),
            elapsed_ms = elapsed_ms(start),
            "stage finished"
        );
        calibrator = Some(cal);
    }

    let start = Instant::now();
    let analyser = Analyser::new(resolved.anchor.clone(), resolved.delta.clone());
    let outcome = stage4_delta_ct::run_stage4(&analyser, samples, policy)?;
    samples = outcome.assays;
    skipped.extend(outcome.skipped);
    let outcome = stage4_delta_ct::run_stage4(&analyser, normalisers, policy)?;
    normalisers = outcome.assays;
    skipped.extend(outcome.skipped);
    info!(stage = "delta_ct", elapsed_ms = elapsed_ms(start), "stage finished");

    let start = Instant::now();
    let normaliser = Normaliser::new().with_seed(settings.seed);
    let (_, outcome, mut results) = stage5_normalise::run_stage5(
        &normaliser,
        samples,
        &normalisers,
        resolved.mode,
        policy,
    )?;
    samples = outcome.assays;
    skipped.extend(outcome.skipped);
    if resolved.mode == NormMode::PairWise {
        add_raw_columns(&mut results, &samples)?;
    }
    info!(
        stage = "normalise",
        n_columns = results.columns().len(),
        elapsed_ms = elapsed_ms(start),
        "stage finished"
    );

    let start = Instant::now();
    let mut summary = RunSummary {
        samples,
        normalisers,
        results,
        calibrator,
        filter_reports,
        skipped,
        mode: resolved.mode,
        outputs: Vec::new(),
    };
    stage6_report::run_stage6(&inputs.out_dir, settings, &mut summary)?;
    info!(
        stage = "report",
        n_files = summary.outputs.len(),
        elapsed_ms = elapsed_ms(start),
        "stage finished"
    );
    Ok(summary)
}

/// Ct and dCt columns share the ddCt layout only in pair-wise mode.
fn add_raw_columns(results: &mut Results, samples: &[Assay]) -> Result<()> {
    for assay in samples {
        if assay.len() != results.n_rows() {
            continue;
        }
        results.add_ct(assay, false)?;
        results.add_dct(assay, false)?;
    }
    Ok(())
}

/// Efficiencies only: read, optionally filter, calibrate every assay and save the table.
pub fn calibrate_only(
    settings: &RunSettings,
    assays: &[PathBuf],
    out: &Path,
    append: bool,
) -> Result<Calibrator> {
    let resolved = settings.resolve()?;
    let mut loaded = stage1_input::run_stage1(assays, settings)?;
    if let Some(kind) = &resolved.filter {
        stage2_filter::run_stage2(kind, &mut loaded)?;
    }
    let mut cal = stage3_calibrate::calibrator_from_settings(&settings.calibration)?;
    let outcome = stage3_calibrate::run_calibration_only(&mut cal, loaded, settings.batch)?;
    for skipped in &outcome.skipped {
        warn!(assay = %skipped.assay, reason = %skipped.reason, "no efficiency computed");
    }
    stage3_calibrate::save_table(&cal, out, append)?;
    Ok(cal)
}
