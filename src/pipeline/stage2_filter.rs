use serde::Serialize;
use tracing::{debug, info};

use crate::error::{QpcrError, Result};
use crate::math::stats::{iqr, nanmedian};
use crate::model::assay::Assay;
use crate::model::settings::FilterSettings;

/// Centre of the inclusion range for [`RangeFilter`].
#[derive(Debug, Clone, PartialEq)]
pub enum RangeAnchor {
    Median,
    Fixed(f64),
    /// One anchor per group, by group index.
    PerGroup(Vec<f64>),
}

/// Keeps replicates within `[anchor - lower, anchor + upper]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFilter {
    pub anchor: RangeAnchor,
    pub lower: f64,
    pub upper: f64,
}

impl Default for RangeFilter {
    fn default() -> Self {
        Self {
            anchor: RangeAnchor::Median,
            lower: 1.0,
            upper: 1.0,
        }
    }
}

/// Keeps replicates within `median ± factor * IQR(0.25, 0.75)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrFilter {
    pub factor: f64,
}

impl Default for IqrFilter {
    fn default() -> Self {
        Self { factor: 1.5 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    Range(RangeFilter),
    Iqr(IqrFilter),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterReport {
    pub assay: String,
    pub group: usize,
    pub group_name: String,
    pub anchor: f64,
    pub lower: f64,
    pub upper: f64,
    pub masked: Vec<usize>,
}

fn check_width(name: &str, v: f64) -> Result<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(QpcrError::InvalidSetting(format!(
            "filter {name} must be a finite non-negative number, got {v}"
        )));
    }
    Ok(())
}

impl FilterKind {
    pub fn from_settings(settings: &FilterSettings) -> Result<Self> {
        let kind = match settings.kind.trim().to_ascii_lowercase().as_str() {
            "range" => {
                check_width("lower", settings.lower)?;
                check_width("upper", settings.upper)?;
                FilterKind::Range(RangeFilter {
                    anchor: RangeAnchor::Median,
                    lower: settings.lower,
                    upper: settings.upper,
                })
            }
            "iqr" => {
                check_width("factor", settings.factor)?;
                FilterKind::Iqr(IqrFilter {
                    factor: settings.factor,
                })
            }
            _ => {
                return Err(QpcrError::UnknownToken {
                    what: "filter",
                    token: settings.kind.clone(),
                });
            }
        };
        Ok(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::Range(_) => "range",
            FilterKind::Iqr(_) => "iqr",
        }
    }

    /// Inclusion bounds `(anchor, lower, upper)` for one group's Ct values.
    fn bounds(&self, group: usize, cts: &[f64]) -> Result<(f64, f64, f64)> {
        match self {
            FilterKind::Range(f) => {
                let anchor = match &f.anchor {
                    RangeAnchor::Median => nanmedian(cts),
                    RangeAnchor::Fixed(v) => *v,
                    RangeAnchor::PerGroup(values) => {
                        values.get(group).copied().ok_or_else(|| {
                            QpcrError::InvalidSetting(format!(
                                "range filter has {} anchors but group {group} was requested",
                                values.len()
                            ))
                        })?
                    }
                };
                Ok((anchor, anchor - f.lower, anchor + f.upper))
            }
            FilterKind::Iqr(f) => {
                let anchor = nanmedian(cts);
                let spread = f.factor * iqr(cts, 0.25, 0.75);
                Ok((anchor, anchor - spread, anchor + spread))
            }
        }
    }

    /// Mask out-of-range replicates to NaN. Groups with a NaN anchor are left alone.
    pub fn apply(&self, assay: &mut Assay) -> Result<Vec<FilterReport>> {
        let mut reports = Vec::new();
        let mut to_mask = Vec::new();
        for group in assay.groups() {
            let indices: Vec<usize> = assay
                .rows()
                .iter()
                .enumerate()
                .filter(|(_, r)| r.group == group)
                .map(|(i, _)| i)
                .collect();
            let cts: Vec<f64> = indices.iter().map(|&i| assay.rows()[i].ct).collect();
            let (anchor, lower, upper) = self.bounds(group, &cts)?;
            if anchor.is_nan() {
                debug!(assay = %assay.id(), group, "filter skipped group without anchor");
                continue;
            }
            let masked: Vec<usize> = indices
                .iter()
                .zip(&cts)
                .filter(|(_, ct)| !ct.is_nan() && (**ct < lower || **ct > upper))
                .map(|(&i, _)| i)
                .collect();
            to_mask.extend_from_slice(&masked);
            let group_name = indices
                .first()
                .and_then(|&i| assay.rows().get(i))
                .map(|r| r.group_name.clone())
                .unwrap_or_default();
            reports.push(FilterReport {
                assay: assay.id().to_string(),
                group,
                group_name,
                anchor,
                lower,
                upper,
                masked,
            });
        }
        assay.ignore(&to_mask, false);
        if !to_mask.is_empty() {
            info!(
                assay = %assay.id(),
                filter = self.name(),
                n_masked = to_mask.len(),
                "replicates masked"
            );
        }
        Ok(reports)
    }
}

pub fn run_stage2(kind: &FilterKind, assays: &mut [Assay]) -> Result<Vec<FilterReport>> {
    let mut reports = Vec::new();
    for assay in assays.iter_mut() {
        reports.extend(kind.apply(assay)?);
    }
    Ok(reports)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_filter.rs"]
mod tests;
