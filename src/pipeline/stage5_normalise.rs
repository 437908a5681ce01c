use std::fmt;
use std::sync::Arc;

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use statrs::distribution::{Continuous, Normal};
use tracing::{debug, info};

use crate::error::{QpcrError, Result};
use crate::math::seed::rng_for;
use crate::math::stats::{nanmean, nanstd};
use crate::model::assay::{Assay, DdCtColumn};
use crate::model::expand::{group_blocks, stack, tile};
use crate::model::row::Row;
use crate::model::settings::{BatchPolicy, DEFAULT_SEED};
use crate::pipeline::BatchOutcome;
use crate::results::Results;

pub type PrepFn = Arc<dyn Fn(&[Assay]) -> Result<Assay> + Send + Sync>;
pub type DivideFn = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormMode {
    PairWise,
    Combinatoric,
    Permutative { k: usize, replace: bool },
}

impl NormMode {
    pub fn from_token(token: &str, k: usize, replace: bool) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "pair-wise" | "pairwise" => Ok(NormMode::PairWise),
            "combinatoric" => Ok(NormMode::Combinatoric),
            "permutative" => Ok(NormMode::Permutative { k, replace }),
            _ => Err(QpcrError::UnknownToken {
                what: "normalisation mode",
                token: token.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NormMode::PairWise => "pair-wise",
            NormMode::Combinatoric => "combinatoric",
            NormMode::Permutative { .. } => "permutative",
        }
    }
}

/// Combined normaliser; computed once by [`Normaliser::prepare`] and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PseudoNormaliser {
    assay: Assay,
    values: Vec<f64>,
}

impl PseudoNormaliser {
    pub fn id(&self) -> &str {
        self.assay.id()
    }

    pub fn assay(&self) -> &Assay {
        &self.assay
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn group_values(&self, group: usize) -> Vec<f64> {
        self.assay
            .rows()
            .iter()
            .zip(&self.values)
            .filter(|(r, _)| r.group == group)
            .map(|(_, v)| *v)
            .collect()
    }
}

/// Row-wise mean of the normalisers' dCt values (NaN skipped).
pub fn average_normalisers(normalisers: &[Assay]) -> Result<Assay> {
    let Some(first) = normalisers.first() else {
        return Err(QpcrError::InvalidSetting("no normaliser assays given".to_string()));
    };
    let mut columns = Vec::with_capacity(normalisers.len());
    for norm in normalisers {
        let dcts = norm.dcts().ok_or_else(|| QpcrError::MissingDeltaCt {
            assay: norm.id().to_string(),
        })?;
        if norm.len() != first.len() {
            return Err(QpcrError::length_mismatch(
                format!("normaliser '{}'", norm.id()),
                first.len(),
                norm.len(),
            ));
        }
        if norm.group_column() != first.group_column() {
            return Err(QpcrError::GroupMismatch {
                context: format!("normalisers '{}' and '{}'", first.id(), norm.id()),
            });
        }
        columns.push(dcts);
    }
    let mut rows: Vec<Row> = first.rows().to_vec();
    for (i, row) in rows.iter_mut().enumerate() {
        let across: Vec<f64> = columns.iter().map(|c| c[i]).collect();
        row.dct = Some(nanmean(&across));
    }
    let id = normalisers
        .iter()
        .map(|a| a.id())
        .collect::<Vec<_>>()
        .join("+");
    Ok(Assay::from_grouped_rows(id, rows))
}

fn check_same_groups(sample: &Assay, norm: &PseudoNormaliser) -> Result<()> {
    if sample.groups() != norm.assay.groups() {
        return Err(QpcrError::GroupMismatch {
            context: format!("assay '{}' vs normaliser '{}'", sample.id(), norm.id()),
        });
    }
    Ok(())
}

/// Draw `n` values from `pool`, weighting each by the normal density fitted to the pool.
fn weighted_draw(pool: &[f64], rng: &mut Pcg32) -> Vec<f64> {
    let n = pool.len();
    let mu = nanmean(pool);
    let sd = nanstd(pool, 0);
    let weights: Option<Vec<f64>> = Normal::new(mu, sd).ok().filter(|_| sd > 0.0).map(|dist| {
        pool.iter()
            .map(|&v| if v.is_nan() { 0.0 } else { dist.pdf(v) })
            .collect()
    });
    match weights.and_then(|w| WeightedIndex::new(&w).ok()) {
        Some(index) => (0..n).map(|_| pool[index.sample(rng)]).collect(),
        None => (0..n).map(|_| pool[rng.random_range(0..n)]).collect(),
    }
}

/// Delta-Delta-Ct computation against a combined normaliser.
#[derive(Clone)]
pub struct Normaliser {
    prep: Option<PrepFn>,
    divide: Option<DivideFn>,
    seed: u64,
}

impl fmt::Debug for Normaliser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normaliser")
            .field("custom_prep", &self.prep.is_some())
            .field("custom_divide", &self.divide.is_some())
            .field("seed", &self.seed)
            .finish()
    }
}

impl Default for Normaliser {
    fn default() -> Self {
        Self::new()
    }
}

impl Normaliser {
    pub fn new() -> Self {
        Self {
            prep: None,
            divide: None,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_prep<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Assay]) -> Result<Assay> + Send + Sync + 'static,
    {
        self.prep = Some(Arc::new(f));
        self
    }

    /// Replace `s / n` with a custom elementwise division (pair-wise mode only).
    pub fn with_division<F>(mut self, f: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        self.divide = Some(Arc::new(f));
        self
    }

    pub fn prepare(&self, normalisers: &[Assay]) -> Result<PseudoNormaliser> {
        let assay = match &self.prep {
            Some(f) => f(normalisers)?,
            None => average_normalisers(normalisers)?,
        };
        let values = assay.dcts().ok_or_else(|| QpcrError::MissingDeltaCt {
            assay: assay.id().to_string(),
        })?;
        info!(normaliser = %assay.id(), n_rows = assay.len(), "pseudo-normaliser prepared");
        Ok(PseudoNormaliser { assay, values })
    }

    fn divide(&self, s: f64, n: f64) -> f64 {
        match &self.divide {
            Some(f) => f(s, n),
            None => s / n,
        }
    }

    /// ddCt values for `sample` in the layout `mode` produces. The sample is not modified.
    pub fn normalise(
        &self,
        sample: &Assay,
        norm: &PseudoNormaliser,
        mode: NormMode,
    ) -> Result<DdCtColumn> {
        if self.divide.is_some() && mode != NormMode::PairWise {
            return Err(QpcrError::InvalidSetting(format!(
                "a custom division function only supports pair-wise mode, not {}",
                mode.name()
            )));
        }
        let dcts = sample.dcts().ok_or_else(|| QpcrError::MissingDeltaCt {
            assay: sample.id().to_string(),
        })?;
        let (rows, values) = match mode {
            NormMode::PairWise => self.pair_wise(sample, &dcts, norm)?,
            NormMode::Combinatoric => self.combinatoric(sample, &dcts, norm)?,
            NormMode::Permutative { k, replace } => {
                self.permutative(sample, &dcts, norm, k, replace)?
            }
        };
        if rows.len() != values.len() {
            return Err(QpcrError::length_mismatch(
                format!("{} layout for '{}'", mode.name(), sample.id()),
                rows.len(),
                values.len(),
            ));
        }
        debug!(
            assay = %sample.id(),
            normaliser = %norm.id(),
            mode = mode.name(),
            n_values = values.len(),
            "ddCt computed"
        );
        Ok(DdCtColumn {
            normaliser: norm.id().to_string(),
            rows,
            values,
        })
    }

    fn pair_wise(
        &self,
        sample: &Assay,
        dcts: &[f64],
        norm: &PseudoNormaliser,
    ) -> Result<(Vec<Row>, Vec<f64>)> {
        if sample.len() != norm.assay.len() {
            return Err(QpcrError::length_mismatch(
                format!("pair-wise '{}' vs '{}'", sample.id(), norm.id()),
                norm.assay.len(),
                sample.len(),
            ));
        }
        if sample.group_column() != norm.assay.group_column() {
            return Err(QpcrError::GroupMismatch {
                context: format!("pair-wise '{}' vs '{}'", sample.id(), norm.id()),
            });
        }
        let values = dcts
            .iter()
            .zip(&norm.values)
            .map(|(&s, &n)| self.divide(s, n))
            .collect();
        Ok((sample.rows().to_vec(), values))
    }

    /// Every sample replicate over every normaliser replicate of the same group.
    ///
    /// The sample block is tiled once per normaliser replicate; tile `j` is
    /// divided by normaliser replicate `j`.
    fn combinatoric(
        &self,
        sample: &Assay,
        dcts: &[f64],
        norm: &PseudoNormaliser,
    ) -> Result<(Vec<Row>, Vec<f64>)> {
        check_same_groups(sample, norm)?;
        let mut values = Vec::new();
        let mut offset = 0usize;
        for (group, block) in group_blocks(sample.rows()) {
            let sample_values = &dcts[offset..offset + block.len()];
            offset += block.len();
            for n in norm.group_values(group) {
                values.extend(sample_values.iter().map(|&s| self.divide(s, n)));
            }
        }
        let rows = tile(sample.rows(), |g| norm.group_values(g).len());
        Ok((rows, values))
    }

    /// Normaliser replicates shuffled within each group and paired, `k` times.
    fn permutative(
        &self,
        sample: &Assay,
        dcts: &[f64],
        norm: &PseudoNormaliser,
        k: usize,
        replace: bool,
    ) -> Result<(Vec<Row>, Vec<f64>)> {
        check_same_groups(sample, norm)?;
        let k = k.max(1);
        let mut values = Vec::new();
        let mut offset = 0usize;
        for (group, block) in group_blocks(sample.rows()) {
            let sample_values = &dcts[offset..offset + block.len()];
            offset += block.len();
            let pool = norm.group_values(group);
            if pool.len() != sample_values.len() {
                return Err(QpcrError::length_mismatch(
                    format!("permutative group {group} of '{}'", sample.id()),
                    pool.len(),
                    sample_values.len(),
                ));
            }
            for repetition in 0..k {
                let mut rng = rng_for(self.seed, sample.id(), group, repetition);
                let drawn = if replace {
                    weighted_draw(&pool, &mut rng)
                } else {
                    let mut shuffled = pool.clone();
                    shuffled.shuffle(&mut rng);
                    shuffled
                };
                values.extend(
                    sample_values
                        .iter()
                        .zip(&drawn)
                        .map(|(&s, &n)| self.divide(s, n)),
                );
            }
        }
        let rows = stack(sample.rows(), k);
        Ok((rows, values))
    }

    /// Normalise every sample against `norm` and record the columns in `results`.
    pub fn pipe(
        &self,
        samples: Vec<Assay>,
        norm: &PseudoNormaliser,
        mode: NormMode,
        policy: BatchPolicy,
        results: &mut Results,
    ) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        for mut sample in samples {
            let attempt = self
                .normalise(&sample, norm, mode)
                .and_then(|column| sample.add_ddct(column, false))
                .and_then(|()| results.add_ddct(&sample, norm.id(), false));
            match attempt {
                Ok(()) => outcome.assays.push(sample),
                Err(err) => outcome.fail_or_skip(sample.id(), "normalise", err, policy)?,
            }
        }
        Ok(outcome)
    }
}

pub fn run_stage5(
    normaliser: &Normaliser,
    samples: Vec<Assay>,
    normalisers: &[Assay],
    mode: NormMode,
    policy: BatchPolicy,
) -> Result<(PseudoNormaliser, BatchOutcome, Results)> {
    let norm = normaliser.prepare(normalisers)?;
    let mut results = Results::new();
    let outcome = normaliser.pipe(samples, &norm, mode, policy, &mut results)?;
    info!(
        mode = mode.name(),
        n_assays = outcome.assays.len(),
        n_skipped = outcome.skipped.len(),
        "normalisation finished"
    );
    Ok((norm, outcome, results))
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_normalise.rs"]
mod tests;
