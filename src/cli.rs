use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::calibration::Dilution;
use crate::error::Result;
use crate::model::replicates::{GroupNames, Replicates};
use crate::model::settings::{BatchPolicy, FilterSettings, RunSettings};

#[derive(Debug, Parser)]
#[command(name = "kira-qpcr", version, about = "qPCR Delta-Ct / Delta-Delta-Ct analysis")]
pub struct Cli {
    #[arg(short, long, action = ArgAction::Count, global = true, help = "More log output (-vv for trace)")]
    pub verbose: u8,

    #[arg(short, long, default_value_t = false, global = true, help = "Only warnings and errors")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Full analysis: Delta-Ct, optional calibration, normalisation and reports.
    Run(RunArgs),
    /// Compute efficiencies from dilution series and save them.
    Calibrate(CalibrateArgs),
    /// Efficiency table utilities.
    Efficiencies(EfficienciesArgs),
}

/// Options shared by `run` and `calibrate`.
#[derive(Debug, Args)]
pub struct SetupArgs {
    #[arg(long, help = "JSON settings file; flags override its fields")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Replicates per group: an integer or a formula such as 3:4,1")]
    pub replicates: Option<String>,

    #[arg(long, help = "Group names: a,b,c or old=new,...")]
    pub names: Option<String>,

    #[arg(long, help = "Dilution step (e.g. 2) or series (1,0.5,0.25)")]
    pub dilution: Option<String>,

    #[arg(long, help = "Pre-analysis filter: range|iqr")]
    pub filter: Option<String>,

    #[arg(long, default_value_t = false, help = "Skip failing assays instead of aborting")]
    pub skip_failed: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[arg(long, num_args = 1.., required = true, help = "Target assay tables (repeatable)")]
    pub assay: Vec<PathBuf>,

    #[arg(long, num_args = 1.., required = true, help = "Normaliser assay tables (repeatable)")]
    pub normaliser: Vec<PathBuf>,

    #[arg(long)]
    pub out: PathBuf,

    #[command(flatten)]
    pub setup: SetupArgs,

    #[arg(long, help = "Anchor: first|grouped|mean|<float>")]
    pub anchor: Option<String>,

    #[arg(long, help = "Reference group for the mean anchor (index or name)")]
    pub ref_group: Option<String>,

    #[arg(long, help = "Delta function: exponential|linear")]
    pub delta: Option<String>,

    #[arg(long, help = "Normalisation: pair-wise|combinatoric|permutative")]
    pub mode: Option<String>,

    #[arg(long, help = "Permutative repetitions")]
    pub k: Option<usize>,

    #[arg(long, default_value_t = false, help = "Permutative draws with replacement")]
    pub replace: bool,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, help = "Efficiency table (id, efficiency); enables calibration")]
    pub efficiencies: Option<PathBuf>,

    #[arg(long, default_value_t = false, help = "Calibrate from calibrator group names")]
    pub calibrate: bool,

    #[arg(long, default_value_t = false)]
    pub keep_calibrators: bool,

    #[arg(long, default_value_t = false)]
    pub ignore_uncalibrated: bool,
}

#[derive(Debug, Args)]
pub struct CalibrateArgs {
    #[arg(long, num_args = 1.., required = true)]
    pub assay: Vec<PathBuf>,

    #[arg(long, help = "Efficiency table to write (.csv or .tsv)")]
    pub out: PathBuf,

    #[command(flatten)]
    pub setup: SetupArgs,

    #[arg(long, default_value_t = false, help = "Merge into an existing table instead of overwriting")]
    pub append: bool,
}

#[derive(Debug, Args)]
pub struct EfficienciesArgs {
    #[command(subcommand)]
    pub command: EfficienciesCommand,
}

#[derive(Debug, Subcommand)]
pub enum EfficienciesCommand {
    /// Merge tables; entries from later files win.
    Merge(MergeArgs),
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    #[arg(num_args = 1.., required = true)]
    pub tables: Vec<PathBuf>,

    #[arg(long)]
    pub out: PathBuf,
}

impl SetupArgs {
    /// Starting settings: the config file when given, defaults otherwise, then the flags.
    pub fn settings(&self) -> Result<RunSettings> {
        let mut settings = match &self.config {
            Some(path) => RunSettings::from_json_file(path)?,
            None => RunSettings::default(),
        };
        if let Some(reps) = &self.replicates {
            settings.replicates = Some(reps.parse::<Replicates>()?);
        }
        if let Some(names) = &self.names {
            settings.names = Some(GroupNames::parse_list(names));
        }
        if let Some(dilution) = &self.dilution {
            settings.calibration.dilution = Some(dilution.parse::<Dilution>()?);
        }
        if let Some(kind) = &self.filter {
            settings.filter = Some(FilterSettings {
                kind: kind.clone(),
                ..settings.filter.take().unwrap_or_default()
            });
        }
        if self.skip_failed {
            settings.batch = BatchPolicy::Skip;
        }
        Ok(settings)
    }
}

impl RunArgs {
    pub fn settings(&self) -> Result<RunSettings> {
        let mut settings = self.setup.settings()?;
        if let Some(anchor) = &self.anchor {
            settings.anchor = anchor.clone();
        }
        if self.ref_group.is_some() {
            settings.ref_group = self.ref_group.clone();
        }
        if let Some(delta) = &self.delta {
            settings.delta = delta.clone();
        }
        if let Some(mode) = &self.mode {
            settings.mode = mode.clone();
        }
        if let Some(k) = self.k {
            settings.k = k;
        }
        if self.replace {
            settings.replace = true;
        }
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if self.efficiencies.is_some() {
            settings.calibration.efficiencies = self.efficiencies.clone();
        }
        if self.calibrate {
            settings.calibration.enabled = true;
        }
        if self.keep_calibrators {
            settings.calibration.remove_calibrators = false;
        }
        if self.ignore_uncalibrated {
            settings.calibration.ignore_uncalibrated = true;
        }
        settings.resolve()?;
        Ok(settings)
    }
}

#[cfg(test)]
#[path = "../tests/src_inline/cli.rs"]
mod tests;
