use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{QpcrError, Result};

const TINY: f64 = 1.0e-20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r: f64,
    pub p_value: f64,
    pub stderr: f64,
    pub intercept_stderr: f64,
}

/// Ordinary least squares of `y` on `x`.
///
/// NaN pairs must be removed by the caller. Fails when fewer than two
/// distinct `x` values are present.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<LinearFit> {
    if x.len() != y.len() {
        return Err(QpcrError::length_mismatch("regression", x.len(), y.len()));
    }
    let n = x.len();
    if n < 2 {
        return Err(QpcrError::DegenerateRegression { points: n });
    }
    let nf = n as f64;
    let x_mean = x.iter().sum::<f64>() / nf;
    let y_mean = y.iter().sum::<f64>() / nf;

    let mut ssxm = 0.0;
    let mut ssym = 0.0;
    let mut ssxym = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        ssxm += (xi - x_mean) * (xi - x_mean);
        ssym += (yi - y_mean) * (yi - y_mean);
        ssxym += (xi - x_mean) * (yi - y_mean);
    }
    ssxm /= nf;
    ssym /= nf;
    ssxym /= nf;

    if ssxm == 0.0 {
        return Err(QpcrError::DegenerateRegression { points: 1 });
    }

    let r = if ssym == 0.0 {
        0.0
    } else {
        (ssxym / (ssxm * ssym).sqrt()).clamp(-1.0, 1.0)
    };
    let slope = ssxym / ssxm;
    let intercept = y_mean - slope * x_mean;

    let (p_value, stderr, intercept_stderr) = if n == 2 {
        let p = if y[0] == y[1] { 1.0 } else { 0.0 };
        (p, 0.0, 0.0)
    } else {
        let df = (n - 2) as f64;
        let t = r * (df / ((1.0 - r) * (1.0 + r) + TINY)).sqrt();
        let p = match StudentsT::new(0.0, 1.0, df) {
            Ok(dist) => 2.0 * dist.sf(t.abs()),
            Err(_) => f64::NAN,
        };
        let stderr = ((1.0 - r * r) * ssym / ssxm / df).sqrt();
        let intercept_stderr = stderr * (ssxm + x_mean * x_mean).sqrt();
        (p, stderr, intercept_stderr)
    };

    Ok(LinearFit {
        slope,
        intercept,
        r,
        p_value,
        stderr,
        intercept_stderr,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/math/regression.rs"]
mod tests;
