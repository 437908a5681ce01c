use serde::{Deserialize, Serialize};

use crate::error::{QpcrError, Result};
use crate::math::stats::{count_non_nan, iqr, nanmean, nanmedian, nanstd, t_interval};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsOptions {
    pub iqr_lower: f64,
    pub iqr_upper: f64,
    pub ci_level: f64,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            iqr_lower: 0.25,
            iqr_upper: 0.75,
            ci_level: 0.95,
        }
    }
}

impl StatsOptions {
    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.iqr_lower) || !in_unit(self.iqr_upper) || self.iqr_lower >= self.iqr_upper {
            return Err(QpcrError::InvalidSetting(format!(
                "IQR limits must satisfy 0 <= lower < upper <= 1, got {} and {}",
                self.iqr_lower, self.iqr_upper
            )));
        }
        if !(self.ci_level > 0.0 && self.ci_level < 1.0) {
            return Err(QpcrError::InvalidSetting(format!(
                "CI level must lie in (0, 1), got {}",
                self.ci_level
            )));
        }
        Ok(())
    }

    pub fn iqr_header(&self) -> String {
        format!("IQR_{}_{}", self.iqr_lower, self.iqr_upper)
    }

    pub fn ci_header(&self) -> String {
        format!("CI_{}", self.ci_level)
    }
}

/// Summary of one (assay column, group) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRow {
    pub group: usize,
    pub group_name: String,
    pub assay: String,
    pub n: usize,
    pub mean: f64,
    pub stdev: f64,
    pub median: f64,
    pub iqr: f64,
    pub ci: (f64, f64),
}

impl StatsRow {
    pub fn summarise(
        group: usize,
        group_name: &str,
        assay: &str,
        values: &[f64],
        options: &StatsOptions,
    ) -> Self {
        Self {
            group,
            group_name: group_name.to_string(),
            assay: assay.to_string(),
            n: count_non_nan(values),
            mean: nanmean(values),
            stdev: nanstd(values, 0),
            median: nanmedian(values),
            iqr: iqr(values, options.iqr_lower, options.iqr_upper),
            ci: t_interval(values, options.ci_level),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsTable {
    pub options: StatsOptions,
    pub rows: Vec<StatsRow>,
}

impl StatsTable {
    pub fn header(&self) -> Vec<String> {
        vec![
            "group".to_string(),
            "group_name".to_string(),
            "assay".to_string(),
            "n".to_string(),
            "mean".to_string(),
            "stdev".to_string(),
            "median".to_string(),
            self.options.iqr_header(),
            self.options.ci_header(),
        ]
    }

    pub fn find(&self, assay: &str, group_name: &str) -> Option<&StatsRow> {
        self.rows
            .iter()
            .find(|r| r.assay == assay && r.group_name == group_name)
    }
}
