use tracing::debug;

use crate::error::{QpcrError, Result};
use crate::model::assay::{Assay, dct_column_name, ddct_column_name};
use crate::model::row::Row;
use crate::pipeline::stage4_delta_ct::GroupRef;

pub mod stats;

use stats::{StatsOptions, StatsRow, StatsTable};

const SETUP_COLUMNS: [&str; 3] = ["id", "group", "group_name"];

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// Wide results table: setup columns plus one numeric column per assay value kind.
#[derive(Debug, Clone, Default)]
pub struct Results {
    ids: Vec<String>,
    groups: Vec<usize>,
    group_names: Vec<String>,
    columns: Vec<Column>,
    stats: Option<StatsTable>,
}

impl Results {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_setup(&self) -> bool {
        !self.ids.is_empty()
    }

    pub fn n_rows(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn groups(&self) -> &[usize] {
        &self.groups
    }

    pub fn group_names(&self) -> &[String] {
        &self.group_names
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Adopt id/group/group_name from `rows` when the table is still empty.
    pub fn setup_from_rows(&mut self, rows: &[Row]) {
        if self.is_setup() {
            return;
        }
        self.ids = rows.iter().map(|r| r.id.clone()).collect();
        self.groups = rows.iter().map(|r| r.group).collect();
        self.group_names = rows.iter().map(|r| r.group_name.clone()).collect();
        self.invalidate();
    }

    pub fn add_column(&mut self, name: &str, values: Vec<f64>, overwrite: bool) -> Result<()> {
        if values.len() != self.n_rows() {
            return Err(QpcrError::length_mismatch(
                format!("results column '{name}'"),
                self.n_rows(),
                values.len(),
            ));
        }
        if SETUP_COLUMNS.contains(&name) {
            return Err(QpcrError::DuplicateColumn {
                name: name.to_string(),
            });
        }
        match self.columns.iter().position(|c| c.name == name) {
            Some(_) if !overwrite => {
                return Err(QpcrError::DuplicateColumn {
                    name: name.to_string(),
                });
            }
            Some(pos) => self.columns[pos].values = values,
            None => self.columns.push(Column {
                name: name.to_string(),
                values,
            }),
        }
        self.invalidate();
        Ok(())
    }

    pub fn add_ct(&mut self, assay: &Assay, overwrite: bool) -> Result<()> {
        self.setup_from_rows(assay.rows());
        self.add_column(assay.id(), assay.cts(), overwrite)
    }

    pub fn add_dct(&mut self, assay: &Assay, overwrite: bool) -> Result<()> {
        let values = assay.dcts().ok_or_else(|| QpcrError::MissingDeltaCt {
            assay: assay.id().to_string(),
        })?;
        self.setup_from_rows(assay.rows());
        self.add_column(&dct_column_name(assay.id()), values, overwrite)
    }

    pub fn add_ddct(&mut self, assay: &Assay, normaliser: &str, overwrite: bool) -> Result<()> {
        let column = assay.ddct(normaliser).ok_or_else(|| QpcrError::MissingDeltaCt {
            assay: ddct_column_name(assay.id(), normaliser),
        })?;
        self.setup_from_rows(&column.rows);
        self.add_column(
            &ddct_column_name(assay.id(), normaliser),
            column.values.clone(),
            overwrite,
        )
    }

    /// Rename columns by `(old, new)` pairs. All pairs are checked before anything changes.
    pub fn rename_columns(&mut self, pairs: &[(String, String)]) -> Result<()> {
        let mut names = self.column_names();
        for (old, new) in pairs {
            let Some(pos) = names.iter().position(|n| n == old) else {
                return Err(QpcrError::UnknownToken {
                    what: "column",
                    token: old.clone(),
                });
            };
            if old != new && (names.contains(new) || SETUP_COLUMNS.contains(&new.as_str())) {
                return Err(QpcrError::DuplicateColumn { name: new.clone() });
            }
            names[pos] = new.clone();
        }
        for (column, name) in self.columns.iter_mut().zip(names) {
            column.name = name;
        }
        self.invalidate();
        Ok(())
    }

    pub fn drop_columns(&mut self, names: &[String]) {
        self.columns.retain(|c| !names.contains(&c.name));
        self.invalidate();
    }

    /// Remove every row whose group matches one of `groups`.
    pub fn drop_groups(&mut self, groups: &[GroupRef]) {
        let keep: Vec<bool> = self
            .groups
            .iter()
            .zip(&self.group_names)
            .map(|(g, name)| {
                !groups.iter().any(|r| match r {
                    GroupRef::Index(i) => i == g,
                    GroupRef::Name(n) => n == name,
                })
            })
            .collect();
        for column in &mut self.columns {
            retain_mask(&mut column.values, &keep);
        }
        retain_mask(&mut self.ids, &keep);
        retain_mask(&mut self.groups, &keep);
        retain_mask(&mut self.group_names, &keep);
        self.invalidate();
    }

    /// Crop `<assay>_rel_<normaliser>` column names to `<assay>`.
    pub fn drop_rel(&mut self) -> Result<()> {
        let pairs: Vec<(String, String)> = self
            .columns
            .iter()
            .filter_map(|c| {
                c.name
                    .split_once("_rel_")
                    .map(|(assay, _)| (c.name.clone(), assay.to_string()))
            })
            .collect();
        self.rename_columns(&pairs)
    }

    /// Column-wise join; `other` must have the same row count and no colliding names.
    pub fn merge(&mut self, other: &Results) -> Result<()> {
        if !self.is_setup() {
            self.ids = other.ids.clone();
            self.groups = other.groups.clone();
            self.group_names = other.group_names.clone();
        } else if other.n_rows() != self.n_rows() {
            return Err(QpcrError::length_mismatch(
                "results merge",
                self.n_rows(),
                other.n_rows(),
            ));
        }
        if let Some(c) = other.columns.iter().find(|c| self.column(&c.name).is_some()) {
            return Err(QpcrError::DuplicateColumn {
                name: c.name.clone(),
            });
        }
        self.columns.extend(other.columns.iter().cloned());
        self.invalidate();
        Ok(())
    }

    /// Per (column, group) summary, cached until the table changes or the options differ.
    pub fn stats(&mut self, options: &StatsOptions) -> &StatsTable {
        let table = match self.stats.take() {
            Some(table) if table.options == *options => table,
            _ => {
                debug!(n_columns = self.columns.len(), "computing results stats");
                self.compute_stats(options)
            }
        };
        self.stats.insert(table)
    }

    pub fn stats_cached(&self) -> bool {
        self.stats.is_some()
    }

    fn compute_stats(&self, options: &StatsOptions) -> StatsTable {
        let mut distinct: Vec<(usize, &str)> = Vec::new();
        for (g, name) in self.groups.iter().zip(&self.group_names) {
            if !distinct.iter().any(|(dg, dn)| dg == g && *dn == name.as_str()) {
                distinct.push((*g, name.as_str()));
            }
        }
        let mut rows = Vec::with_capacity(distinct.len() * self.columns.len());
        for column in &self.columns {
            for &(group, name) in &distinct {
                let values: Vec<f64> = column
                    .values
                    .iter()
                    .zip(self.groups.iter().zip(&self.group_names))
                    .filter(|(_, (g, n))| **g == group && n.as_str() == name)
                    .map(|(v, _)| *v)
                    .collect();
                rows.push(StatsRow::summarise(group, name, &column.name, &values, options));
            }
        }
        rows.sort_by(|a, b| a.assay.cmp(&b.assay));
        StatsTable {
            options: *options,
            rows,
        }
    }

    fn invalidate(&mut self) {
        self.stats = None;
    }
}

fn retain_mask<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut i = 0usize;
    values.retain(|_| {
        let k = keep.get(i).copied().unwrap_or(true);
        i += 1;
        k
    });
}

#[cfg(test)]
#[path = "../../tests/src_inline/results/mod.rs"]
mod tests;
