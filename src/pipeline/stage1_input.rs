use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;
use crate::input::read_ct_table;
use crate::model::assay::Assay;
use crate::model::settings::RunSettings;

/// Read one table and group it with the configured replicates and names.
pub fn load_assay(path: &Path, settings: &RunSettings) -> Result<Assay> {
    let raw = read_ct_table(path)?;
    let mut assay = Assay::new(raw, settings.replicates.as_ref())?;
    if let Some(names) = &settings.names {
        assay.rename(names)?;
    }
    debug!(
        assay = %assay.id(),
        n_rows = assay.len(),
        n_groups = assay.groups().len(),
        "assay loaded"
    );
    Ok(assay)
}

pub fn run_stage1(paths: &[PathBuf], settings: &RunSettings) -> Result<Vec<Assay>> {
    let assays = paths
        .iter()
        .map(|p| load_assay(p, settings))
        .collect::<Result<Vec<_>>>()?;
    info!(n_assays = assays.len(), "assays loaded");
    Ok(assays)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_input.rs"]
mod tests;
