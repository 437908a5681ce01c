use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::calibration::dilution::Dilution;
use crate::error::{QpcrError, Result};
use crate::model::replicates::{GroupNames, Replicates};
use crate::pipeline::stage2_filter::FilterKind;
use crate::pipeline::stage4_delta_ct::{Anchor, DeltaFunction};
use crate::pipeline::stage5_normalise::NormMode;
use crate::results::stats::StatsOptions;

pub const DEFAULT_SEED: u64 = 11299114;

/// What a batch does when one assay fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    pub efficiencies: Option<PathBuf>,
    pub dilution: Option<Dilution>,
    pub remove_calibrators: bool,
    pub ignore_uncalibrated: bool,
    /// Calibrate even without a table or an explicit dilution (names carry the steps).
    pub enabled: bool,
}

impl CalibrationSettings {
    pub fn is_enabled(&self) -> bool {
        self.enabled || self.efficiencies.is_some() || self.dilution.is_some()
    }
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            efficiencies: None,
            dilution: None,
            remove_calibrators: true,
            ignore_uncalibrated: false,
            enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub kind: String,
    pub lower: f64,
    pub upper: f64,
    pub factor: f64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            kind: "range".to_string(),
            lower: 1.0,
            upper: 1.0,
            factor: 1.5,
        }
    }
}

/// Analysis knobs for one run, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub replicates: Option<Replicates>,
    pub names: Option<GroupNames>,
    pub anchor: String,
    pub ref_group: Option<String>,
    pub delta: String,
    pub mode: String,
    pub k: usize,
    pub replace: bool,
    pub seed: u64,
    pub calibration: CalibrationSettings,
    pub filter: Option<FilterSettings>,
    pub stats: StatsOptions,
    pub batch: BatchPolicy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            replicates: None,
            names: None,
            anchor: "first".to_string(),
            ref_group: None,
            delta: "exponential".to_string(),
            mode: "pair-wise".to_string(),
            k: 1,
            replace: false,
            seed: DEFAULT_SEED,
            calibration: CalibrationSettings::default(),
            filter: None,
            stats: StatsOptions::default(),
            batch: BatchPolicy::Abort,
        }
    }
}

/// Settings with every token parsed.
#[derive(Clone)]
pub struct ResolvedSettings {
    pub anchor: Anchor,
    pub delta: DeltaFunction,
    pub mode: NormMode,
    pub filter: Option<FilterKind>,
}

impl RunSettings {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let settings: RunSettings = serde_json::from_str(&text)?;
        Ok(settings)
    }

    /// Parse tokens and check ranges before anything is computed.
    pub fn resolve(&self) -> Result<ResolvedSettings> {
        let anchor = Anchor::from_token(&self.anchor, self.ref_group.as_deref())?;
        let delta: DeltaFunction = self.delta.parse()?;
        let mode = NormMode::from_token(&self.mode, self.k, self.replace)?;
        let filter = match &self.filter {
            Some(f) => Some(FilterKind::from_settings(f)?),
            None => None,
        };
        if let Some(dilution) = &self.calibration.dilution {
            dilution.validate()?;
        }
        self.stats.validate()?;
        if self.k == 0 {
            return Err(QpcrError::InvalidSetting("k must be at least 1".to_string()));
        }
        Ok(ResolvedSettings {
            anchor,
            delta,
            mode,
            filter,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/settings.rs"]
mod tests;
