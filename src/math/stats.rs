use statrs::distribution::{ContinuousCDF, StudentsT};

pub fn finite_values(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

pub fn count_non_nan(values: &[f64]) -> usize {
    values.iter().filter(|v| !v.is_nan()).count()
}

/// Mean over non-NaN values; NaN when nothing is left.
pub fn nanmean(values: &[f64]) -> f64 {
    let mut sum = 0.0f64;
    let mut n = 0usize;
    for &v in values {
        if !v.is_nan() {
            sum += v;
            n += 1;
        }
    }
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Standard deviation over non-NaN values with `ddof` delta degrees of freedom.
pub fn nanstd(values: &[f64], ddof: usize) -> f64 {
    let kept = finite_values(values);
    if kept.len() <= ddof {
        return f64::NAN;
    }
    let mean = kept.iter().sum::<f64>() / kept.len() as f64;
    let ss: f64 = kept.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / (kept.len() - ddof) as f64).sqrt()
}

/// Linear-interpolated quantile over non-NaN values, `q` in `[0, 1]`.
pub fn nanquantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = finite_values(values);
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    let q = q.clamp(0.0, 1.0);
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn nanmedian(values: &[f64]) -> f64 {
    nanquantile(values, 0.5)
}

pub fn iqr(values: &[f64], lower: f64, upper: f64) -> f64 {
    nanquantile(values, upper) - nanquantile(values, lower)
}

/// Standard error of the mean (ddof 1) over non-NaN values.
pub fn sem(values: &[f64]) -> f64 {
    let n = count_non_nan(values);
    if n < 2 {
        return f64::NAN;
    }
    nanstd(values, 1) / (n as f64).sqrt()
}

/// Two-sided Student-t interval around the non-NaN mean at confidence `level`.
pub fn t_interval(values: &[f64], level: f64) -> (f64, f64) {
    let n = count_non_nan(values);
    if n < 2 || !(0.0..1.0).contains(&level) {
        return (f64::NAN, f64::NAN);
    }
    let mean = nanmean(values);
    let scale = sem(values);
    if scale == 0.0 {
        return (mean, mean);
    }
    let dist = match StudentsT::new(0.0, 1.0, (n - 1) as f64) {
        Ok(d) => d,
        Err(_) => return (f64::NAN, f64::NAN),
    };
    let t = dist.inverse_cdf(0.5 + level / 2.0);
    (mean - t * scale, mean + t * scale)
}

#[cfg(test)]
#[path = "../../tests/src_inline/math/stats.rs"]
mod tests;
