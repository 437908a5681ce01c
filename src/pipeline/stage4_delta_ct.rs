use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::error::{QpcrError, Result};
use crate::math::stats::nanmean;
use crate::model::assay::Assay;
use crate::model::row::Row;
use crate::model::settings::BatchPolicy;
use crate::pipeline::BatchOutcome;

/// Named numeric parameters forwarded to custom anchor and delta functions.
pub type ExtraParams = BTreeMap<String, f64>;

pub type AnchorFn = Arc<dyn Fn(&[Row], &ExtraParams) -> f64 + Send + Sync>;
pub type DeltaFn = Arc<dyn Fn(f64, f64, &ExtraParams) -> f64 + Send + Sync>;

/// Reference group for the `mean` anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupRef {
    Index(usize),
    Name(String),
}

impl GroupRef {
    pub fn parse(token: &str) -> Self {
        match token.trim().parse::<usize>() {
            Ok(i) => GroupRef::Index(i),
            Err(_) => GroupRef::Name(token.trim().to_string()),
        }
    }

    fn resolve(&self, assay: &Assay) -> Result<usize> {
        match self {
            GroupRef::Index(i) if assay.groups().contains(i) => Ok(*i),
            GroupRef::Index(i) => Err(QpcrError::UnknownGroup(i.to_string())),
            GroupRef::Name(name) => assay
                .group_of_name(name)
                .ok_or_else(|| QpcrError::UnknownGroup(name.clone())),
        }
    }
}

#[derive(Clone)]
pub enum Anchor {
    First,
    Grouped,
    Mean(GroupRef),
    Fixed(f64),
    Custom(AnchorFn),
}

impl Anchor {
    /// `first`, `grouped`, `mean` (with `ref_group`, default group 0) or a number.
    pub fn from_token(token: &str, ref_group: Option<&str>) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Anchor::First),
            "grouped" => Ok(Anchor::Grouped),
            "mean" => Ok(Anchor::Mean(
                ref_group.map(GroupRef::parse).unwrap_or(GroupRef::Index(0)),
            )),
            other => match other.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Anchor::Fixed(v)),
                _ => Err(QpcrError::UnknownToken {
                    what: "anchor",
                    token: token.to_string(),
                }),
            },
        }
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[Row], &ExtraParams) -> f64 + Send + Sync + 'static,
    {
        Anchor::Custom(Arc::new(f))
    }
}

impl fmt::Debug for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::First => write!(f, "First"),
            Anchor::Grouped => write!(f, "Grouped"),
            Anchor::Mean(g) => write!(f, "Mean({g:?})"),
            Anchor::Fixed(v) => write!(f, "Fixed({v})"),
            Anchor::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[derive(Clone)]
pub enum DeltaFunction {
    /// `doubling_factor ^ -(Ct - anchor)`
    Exponential,
    /// `Ct - anchor`
    Linear,
    Custom(DeltaFn),
}

impl DeltaFunction {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(f64, f64, &ExtraParams) -> f64 + Send + Sync + 'static,
    {
        DeltaFunction::Custom(Arc::new(f))
    }
}

impl FromStr for DeltaFunction {
    type Err = QpcrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exponential" => Ok(DeltaFunction::Exponential),
            "linear" => Ok(DeltaFunction::Linear),
            _ => Err(QpcrError::UnknownToken {
                what: "delta function",
                token: s.to_string(),
            }),
        }
    }
}

impl fmt::Debug for DeltaFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaFunction::Exponential => write!(f, "Exponential"),
            DeltaFunction::Linear => write!(f, "Linear"),
            DeltaFunction::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

fn first_readable(rows: &[&Row]) -> f64 {
    rows.iter()
        .map(|r| r.ct)
        .find(|ct| !ct.is_nan())
        .unwrap_or(f64::NAN)
}

/// Delta-Ct computation.
#[derive(Debug, Clone)]
pub struct Analyser {
    anchor: Anchor,
    delta: DeltaFunction,
    params: ExtraParams,
}

impl Default for Analyser {
    fn default() -> Self {
        Self::new(Anchor::First, DeltaFunction::Exponential)
    }
}

impl Analyser {
    pub fn new(anchor: Anchor, delta: DeltaFunction) -> Self {
        Self {
            anchor,
            delta,
            params: ExtraParams::new(),
        }
    }

    pub fn with_params(mut self, params: ExtraParams) -> Self {
        self.params = params;
        self
    }

    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    /// Anchor per row. Rows with NaN Ct never serve as `first`/`grouped` anchors.
    pub fn anchors(&self, assay: &Assay) -> Result<Vec<f64>> {
        let rows = assay.rows();
        let single = match &self.anchor {
            Anchor::First => {
                let all: Vec<&Row> = rows.iter().collect();
                Some(first_readable(&all))
            }
            Anchor::Grouped => None,
            Anchor::Mean(group_ref) => {
                let group = group_ref.resolve(assay)?;
                let cts: Vec<f64> = assay.group_rows_of(group).iter().map(|r| r.ct).collect();
                Some(nanmean(&cts))
            }
            Anchor::Fixed(v) => Some(*v),
            Anchor::Custom(f) => Some(f(rows, &self.params)),
        };
        match single {
            Some(anchor) => Ok(vec![anchor; rows.len()]),
            None => {
                let mut per_group: BTreeMap<usize, f64> = BTreeMap::new();
                for group in assay.groups() {
                    per_group.insert(group, first_readable(&assay.group_rows_of(group)));
                }
                Ok(rows
                    .iter()
                    .map(|r| per_group.get(&r.group).copied().unwrap_or(f64::NAN))
                    .collect())
            }
        }
    }

    /// dCt per row, without touching the assay.
    pub fn compute(&self, assay: &Assay) -> Result<Vec<f64>> {
        let anchors = self.anchors(assay)?;
        let factor = assay.doubling_factor();
        let mut params = self.params.clone();
        params.insert("doubling_factor".to_string(), factor);
        let values = assay
            .rows()
            .iter()
            .zip(&anchors)
            .map(|(row, &anchor)| match &self.delta {
                DeltaFunction::Exponential => factor.powf(-(row.ct - anchor)),
                DeltaFunction::Linear => row.ct - anchor,
                DeltaFunction::Custom(f) => f(row.ct, anchor, &params),
            })
            .collect();
        Ok(values)
    }

    pub fn analyse(&self, assay: &mut Assay) -> Result<()> {
        let values = self.compute(assay)?;
        assay.set_dct(values)?;
        debug!(assay = %assay.id(), n_rows = assay.len(), "dCt computed");
        Ok(())
    }

    /// Analyse every assay; failures abort or are skipped per `policy`.
    pub fn pipe(&self, assays: Vec<Assay>, policy: BatchPolicy) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        for mut assay in assays {
            match self.analyse(&mut assay) {
                Ok(()) => outcome.assays.push(assay),
                Err(err) => outcome.fail_or_skip(assay.id(), "delta_ct", err, policy)?,
            }
        }
        Ok(outcome)
    }
}

pub fn run_stage4(
    analyser: &Analyser,
    assays: Vec<Assay>,
    policy: BatchPolicy,
) -> Result<BatchOutcome> {
    analyser.pipe(assays, policy)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_delta_ct.rs"]
mod tests;
