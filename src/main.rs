use anyhow::{Context, Result};
use clap::Parser;

use kira_qpcr::calibration::{EfficiencyTable, SaveMode};
use kira_qpcr::cli::{Cli, Commands, EfficienciesCommand};
use kira_qpcr::logging;
use kira_qpcr::pipeline::{self, PipelineInputs};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run(args) => {
            let settings = args.settings().context("invalid run settings")?;
            let inputs = PipelineInputs {
                assays: args.assay.clone(),
                normalisers: args.normaliser.clone(),
                out_dir: args.out.clone(),
            };
            let summary = pipeline::run(&settings, &inputs)
                .with_context(|| format!("analysis failed (output: {})", args.out.display()))?;
            tracing::info!(
                n_assays = summary.samples.len(),
                n_skipped = summary.skipped.len(),
                out_dir = %args.out.display(),
                "run complete"
            );
        }
        Commands::Calibrate(args) => {
            let settings = args.setup.settings().context("invalid calibration settings")?;
            let calibrator = pipeline::calibrate_only(&settings, &args.assay, &args.out, args.append)
                .with_context(|| format!("failed to calibrate into {}", args.out.display()))?;
            for (id, eff) in calibrator.table().iter() {
                tracing::info!(assay = %id, efficiency = eff, "efficiency");
            }
        }
        Commands::Efficiencies(args) => match args.command {
            EfficienciesCommand::Merge(merge) => {
                let table = EfficiencyTable::merge_files(&merge.tables)
                    .context("failed to read efficiency tables")?;
                table
                    .save(&merge.out, SaveMode::Write)
                    .with_context(|| format!("failed to write {}", merge.out.display()))?;
                tracing::info!(
                    n_entries = table.len(),
                    out = %merge.out.display(),
                    "efficiency tables merged"
                );
            }
        },
    }
    Ok(())
}
