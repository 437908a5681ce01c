use serde::Serialize;

use crate::math::regression::LinearFit;

/// Dilution series regression kept for inspection after calibration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficiencyCurve {
    pub assay: String,
    /// Natural-log dilutions, sorted together with `ct_values` by ascending Ct.
    pub dilutions: Vec<f64>,
    pub ct_values: Vec<f64>,
    pub fit: LinearFit,
    pub efficiency: f64,
}

impl EfficiencyCurve {
    /// Ct predicted by the fitted line at a natural-log dilution.
    pub fn predict(&self, log_dilution: f64) -> f64 {
        self.fit.intercept + self.fit.slope * log_dilution
    }
}
