use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::error::{QpcrError, Result};
use crate::math::regression::linear_regression;
use crate::model::assay::Assay;
use crate::model::curve::EfficiencyCurve;
use crate::model::row::Row;

pub mod dilution;
pub mod table;

pub use dilution::Dilution;
pub use table::{EfficiencyTable, SaveMode};

use dilution::dilution_from_group_name;

pub const CALIBRATOR_PREFIX: &str = "calibrator";

pub fn is_calibrator_name(group_name: &str) -> bool {
    group_name.starts_with(CALIBRATOR_PREFIX)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationOutcome {
    Assigned(f64),
    Calibrated(f64),
    Skipped,
}

/// Efficiency from the slope of Ct over natural-log dilution, rounded to 4 decimals.
pub fn efficiency_from_slope(slope: f64) -> f64 {
    let eff = (-1.0 / slope).exp() - 1.0;
    (eff * 10_000.0).round() / 10_000.0
}

#[derive(Debug, Clone)]
pub struct Calibrator {
    table: EfficiencyTable,
    dilution: Option<Dilution>,
    remove_calibrators: bool,
    curves: BTreeMap<String, EfficiencyCurve>,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calibrator {
    pub fn new() -> Self {
        Self {
            table: EfficiencyTable::new(),
            dilution: None,
            remove_calibrators: true,
            curves: BTreeMap::new(),
        }
    }

    pub fn with_table(mut self, table: EfficiencyTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_dilution(mut self, dilution: Dilution) -> Result<Self> {
        dilution.validate()?;
        self.dilution = Some(dilution);
        Ok(self)
    }

    pub fn remove_calibrators(mut self, remove: bool) -> Self {
        self.remove_calibrators = remove;
        self
    }

    pub fn table(&self) -> &EfficiencyTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut EfficiencyTable {
        &mut self.table
    }

    pub fn curve(&self, assay_id: &str) -> Option<&EfficiencyCurve> {
        self.curves.get(assay_id)
    }

    pub fn curves(&self) -> impl Iterator<Item = &EfficiencyCurve> {
        self.curves.values()
    }

    /// Drop stored efficiencies and curves.
    pub fn clear(&mut self) {
        self.table.clear();
        self.curves.clear();
    }

    /// Fit an efficiency from the calibrator groups (or the whole assay when none are tagged).
    pub fn calibrate(&mut self, assay: &mut Assay) -> Result<f64> {
        let has_calibrators = assay.rows().iter().any(|r| is_calibrator_name(&r.group_name));
        let selected: Vec<&Row> = assay
            .rows()
            .iter()
            .filter(|r| !has_calibrators || is_calibrator_name(&r.group_name))
            .collect();
        let is_subset = has_calibrators && selected.len() < assay.len();

        // groups re-anchored to 0.. in row order
        let mut seen: Vec<usize> = Vec::new();
        let group_index: Vec<usize> = selected
            .iter()
            .map(|r| match seen.iter().position(|&g| g == r.group) {
                Some(p) => p,
                None => {
                    seen.push(r.group);
                    seen.len() - 1
                }
            })
            .collect();

        let fractions = match &self.dilution {
            Some(d) => d.per_row(&group_index)?,
            None => selected
                .iter()
                .map(|r| dilution_from_group_name(&r.group_name))
                .collect::<Result<Vec<_>>>()?,
        };

        let mut points: Vec<(f64, f64)> = selected
            .iter()
            .zip(&fractions)
            .filter(|(r, _)| !r.ct.is_nan())
            .map(|(r, &d)| (d.ln(), r.ct))
            .collect();
        points.sort_by(|a, b| a.1.total_cmp(&b.1));

        let dilutions: Vec<f64> = points.iter().map(|p| p.0).collect();
        let ct_values: Vec<f64> = points.iter().map(|p| p.1).collect();
        let fit = linear_regression(&dilutions, &ct_values)?;
        let efficiency = efficiency_from_slope(fit.slope);

        info!(
            assay = %assay.id(),
            n_points = ct_values.len(),
            slope = fit.slope,
            r = fit.r,
            efficiency,
            "efficiency calibrated"
        );

        assay.set_efficiency(efficiency);
        self.table.insert(assay.id(), efficiency);
        self.curves.insert(
            assay.id().to_string(),
            EfficiencyCurve {
                assay: assay.id().to_string(),
                dilutions,
                ct_values,
                fit,
                efficiency,
            },
        );

        if is_subset && self.remove_calibrators {
            assay.retain_groups(|r| !is_calibrator_name(&r.group_name));
        }
        Ok(efficiency)
    }

    /// Apply a known efficiency by assay id. Returns `None` when the id is not in the table.
    pub fn assign(&self, assay: &mut Assay) -> Option<f64> {
        let Some(efficiency) = self.table.get(assay.id()) else {
            warn!(assay = %assay.id(), "no stored efficiency for assay");
            return None;
        };
        assay.set_efficiency(efficiency);
        let has_calibrators = assay.rows().iter().any(|r| is_calibrator_name(&r.group_name));
        let all_calibrators = assay.rows().iter().all(|r| is_calibrator_name(&r.group_name));
        if self.remove_calibrators && has_calibrators && !all_calibrators {
            assay.retain_groups(|r| !is_calibrator_name(&r.group_name));
        }
        Some(efficiency)
    }

    /// Assign when the id is known, otherwise calibrate.
    ///
    /// With `ignore_uncalibrated` an assay that can be neither is left unchanged
    /// and reported as skipped.
    pub fn pipe(&mut self, assay: &mut Assay, ignore_uncalibrated: bool) -> Result<CalibrationOutcome> {
        if self.table.get(assay.id()).is_some() {
            if let Some(eff) = self.assign(assay) {
                return Ok(CalibrationOutcome::Assigned(eff));
            }
        }
        let mut candidate = assay.clone();
        match self.calibrate(&mut candidate) {
            Ok(eff) => {
                *assay = candidate;
                Ok(CalibrationOutcome::Calibrated(eff))
            }
            Err(err) if ignore_uncalibrated => {
                warn!(assay = %assay.id(), error = %err, "assay left uncalibrated");
                Ok(CalibrationOutcome::Skipped)
            }
            Err(err) => Err(QpcrError::Uncalibrated {
                assay: assay.id().to_string(),
                source: Box::new(err),
            }),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/calibration/mod.rs"]
mod tests;
