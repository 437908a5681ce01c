use std::path::Path;

use tracing::{debug, info};

use crate::calibration::{CalibrationOutcome, Calibrator, EfficiencyTable, SaveMode};
use crate::error::Result;
use crate::model::assay::Assay;
use crate::model::settings::{BatchPolicy, CalibrationSettings};
use crate::pipeline::BatchOutcome;

/// Build a calibrator from settings, loading the efficiency table when one is configured.
pub fn calibrator_from_settings(settings: &CalibrationSettings) -> Result<Calibrator> {
    let mut calibrator = Calibrator::new().remove_calibrators(settings.remove_calibrators);
    if let Some(dilution) = &settings.dilution {
        calibrator = calibrator.with_dilution(dilution.clone())?;
    }
    if let Some(path) = &settings.efficiencies {
        if path.exists() {
            let table = EfficiencyTable::from_file(path)?;
            info!(path = %path.display(), n_entries = table.len(), "efficiency table loaded");
            calibrator = calibrator.with_table(table);
        } else {
            debug!(path = %path.display(), "efficiency table not found, calibrating from scratch");
        }
    }
    Ok(calibrator)
}

/// Assign or calibrate every assay. Failed assays follow `policy`.
pub fn run_stage3(
    calibrator: &mut Calibrator,
    assays: Vec<Assay>,
    settings: &CalibrationSettings,
    policy: BatchPolicy,
) -> Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();
    for mut assay in assays {
        match calibrator.pipe(&mut assay, settings.ignore_uncalibrated) {
            Ok(CalibrationOutcome::Skipped) => {
                debug!(assay = %assay.id(), efficiency = assay.efficiency(), "kept with default efficiency");
                outcome.assays.push(assay);
            }
            Ok(_) => outcome.assays.push(assay),
            Err(err) => outcome.fail_or_skip(assay.id(), "calibrate", err, policy)?,
        }
    }
    Ok(outcome)
}

/// Calibrate every assay from its own dilution series, ignoring stored efficiencies.
pub fn run_calibration_only(
    calibrator: &mut Calibrator,
    assays: Vec<Assay>,
    policy: BatchPolicy,
) -> Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();
    for mut assay in assays {
        match calibrator.calibrate(&mut assay) {
            Ok(_) => outcome.assays.push(assay),
            Err(err) => outcome.fail_or_skip(assay.id(), "calibrate", err, policy)?,
        }
    }
    Ok(outcome)
}

pub fn save_table(calibrator: &Calibrator, path: &Path, append: bool) -> Result<()> {
    let mode = if append { SaveMode::Append } else { SaveMode::Write };
    calibrator.table().save(path, mode)?;
    info!(
        path = %path.display(),
        n_entries = calibrator.table().len(),
        append,
        "efficiency table saved"
    );
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_calibrate.rs"]
mod tests;
