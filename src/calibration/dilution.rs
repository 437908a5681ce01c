use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{QpcrError, Result};

/// Dilution of a calibrator series.
///
/// A `Step` `d` yields `d^g` for the g-th calibrator group. A `Series` gives
/// one value per group or one per row. Values above 1 are inverse ratios
/// (`2` means 1:2) and are converted to fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dilution {
    Step(f64),
    Series(Vec<f64>),
}

pub fn as_fraction(v: f64) -> f64 {
    if v > 1.0 { 1.0 / v } else { v }
}

impl Dilution {
    pub fn validate(&self) -> Result<()> {
        let values: &[f64] = match self {
            Dilution::Step(v) => std::slice::from_ref(v),
            Dilution::Series(v) => v,
        };
        if values.is_empty() {
            return Err(QpcrError::InvalidDilution("empty dilution series".to_string()));
        }
        for &v in values {
            if !v.is_finite() || v <= 0.0 {
                return Err(QpcrError::InvalidDilution(format!(
                    "dilution values must be positive and finite, got {v}"
                )));
            }
        }
        Ok(())
    }

    /// Fractional dilution per row, given each row's contiguous calibrator group index.
    pub fn per_row(&self, group_index: &[usize]) -> Result<Vec<f64>> {
        self.validate()?;
        let n_groups = group_index.iter().max().map(|g| g + 1).unwrap_or(0);
        match self {
            Dilution::Step(d) => Ok(group_index
                .iter()
                .map(|&g| as_fraction(d.powi(g as i32)))
                .collect()),
            Dilution::Series(values) => {
                if values.len() == n_groups {
                    Ok(group_index.iter().map(|&g| as_fraction(values[g])).collect())
                } else if values.len() == group_index.len() {
                    Ok(values.iter().map(|&v| as_fraction(v)).collect())
                } else {
                    Err(QpcrError::InvalidDilution(format!(
                        "series of {} values matches neither {} groups nor {} rows",
                        values.len(),
                        n_groups,
                        group_index.len()
                    )))
                }
            }
        }
    }
}

impl FromStr for Dilution {
    type Err = QpcrError;

    /// `2` is a step, `1,2,4,16` is a series.
    fn from_str(s: &str) -> Result<Self> {
        let parse = |x: &str| {
            x.trim()
                .parse::<f64>()
                .map_err(|_| QpcrError::InvalidDilution(format!("'{x}' is not a number")))
        };
        let dilution = if s.contains(',') {
            Dilution::Series(s.split(',').map(parse).collect::<Result<Vec<_>>>()?)
        } else {
            Dilution::Step(parse(s)?)
        };
        dilution.validate()?;
        Ok(dilution)
    }
}

/// Inverse dilution from a `calibrator:<name>:<step>` group name.
pub fn dilution_from_group_name(group_name: &str) -> Result<f64> {
    let step = group_name
        .split(':')
        .nth(2)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0);
    match step {
        Some(v) => Ok(as_fraction(v)),
        None => Err(QpcrError::DilutionNotInferred {
            group_name: group_name.to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/calibration/dilution.rs"]
mod tests;
