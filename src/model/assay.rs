use std::fmt;

use tracing::warn;

use crate::error::{QpcrError, Result};
use crate::math::format_f64_6;
use crate::model::replicates::{
    GroupNames, Replicates, assign_groups, infer_group_sizes,
};
use crate::model::row::{RawAssay, Row};

/// Delta-Delta-Ct values against one normaliser.
///
/// `rows` carries the (possibly tiled or stacked) layout the values belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct DdCtColumn {
    pub normaliser: String,
    pub rows: Vec<Row>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assay {
    id: String,
    efficiency: f64,
    rows: Vec<Row>,
    replicates: Option<Replicates>,
    ddct: Vec<DdCtColumn>,
}

impl Assay {
    /// Group raw rows by `replicates`, or infer groups from identifier runs.
    pub fn new(raw: RawAssay, replicates: Option<&Replicates>) -> Result<Self> {
        let rows = raw
            .rows
            .into_iter()
            .map(|(id, ct)| Row::new(id, ct))
            .collect();
        let mut assay = Self {
            id: raw.id,
            efficiency: 1.0,
            rows,
            replicates: replicates.cloned(),
            ddct: Vec::new(),
        };
        assay.group_rows()?;
        Ok(assay)
    }

    /// Build from rows that already carry group ids and names.
    pub fn from_grouped_rows(id: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            id: id.into(),
            efficiency: 1.0,
            rows,
            replicates: None,
            ddct: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }

    pub fn doubling_factor(&self) -> f64 {
        2.0 * self.efficiency
    }

    pub fn set_efficiency(&mut self, efficiency: f64) {
        self.efficiency = efficiency;
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn replicates(&self) -> Option<&Replicates> {
        self.replicates.as_ref()
    }

    pub fn cts(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.ct).collect()
    }

    pub fn has_dct(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|r| r.dct.is_some())
    }

    pub fn dcts(&self) -> Option<Vec<f64>> {
        self.rows.iter().map(|r| r.dct).collect()
    }

    pub fn group_column(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.group).collect()
    }

    /// Distinct numeric groups in first-occurrence order.
    pub fn groups(&self) -> Vec<usize> {
        let mut out: Vec<usize> = Vec::new();
        for row in &self.rows {
            if !out.contains(&row.group) {
                out.push(row.group);
            }
        }
        out
    }

    /// Distinct group names in first-occurrence order.
    pub fn names(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for row in &self.rows {
            if !out.iter().any(|n| n == &row.group_name) {
                out.push(row.group_name.clone());
            }
        }
        out
    }

    pub fn group_sizes(&self) -> Vec<usize> {
        self.groups()
            .into_iter()
            .map(|g| self.rows.iter().filter(|r| r.group == g).count())
            .collect()
    }

    pub fn group_rows_of(&self, group: usize) -> Vec<&Row> {
        self.rows.iter().filter(|r| r.group == group).collect()
    }

    pub fn group_of_name(&self, name: &str) -> Option<usize> {
        self.rows.iter().find(|r| r.group_name == name).map(|r| r.group)
    }

    /// Re-run grouping with a new replicate layout.
    pub fn regroup(&mut self, replicates: Option<&Replicates>) -> Result<()> {
        let previous = std::mem::replace(&mut self.replicates, replicates.cloned());
        if let Err(err) = self.group_rows() {
            self.replicates = previous;
            return Err(err);
        }
        self.ddct.clear();
        Ok(())
    }

    pub fn rename(&mut self, names: &GroupNames) -> Result<()> {
        let current = self.names();
        let new_names = names.resolve(&current)?;
        for row in &mut self.rows {
            if let Some(pos) = current.iter().position(|n| n == &row.group_name) {
                row.group_name = new_names[pos].clone();
            }
        }
        for column in &mut self.ddct {
            for row in &mut column.rows {
                if let Some(pos) = current.iter().position(|n| n == &row.group_name) {
                    row.group_name = new_names[pos].clone();
                }
            }
        }
        Ok(())
    }

    /// Mask the listed rows to NaN, or drop them and re-index groups.
    pub fn ignore(&mut self, indices: &[usize], drop: bool) {
        if drop {
            let mut idx = 0usize;
            self.rows.retain(|_| {
                let keep = !indices.contains(&idx);
                idx += 1;
                keep
            });
            self.reindex_groups();
        } else {
            for &i in indices {
                if let Some(row) = self.rows.get_mut(i) {
                    row.ct = f64::NAN;
                    row.dct = row.dct.map(|_| f64::NAN);
                }
            }
        }
    }

    /// Keep only rows whose group satisfies `keep`; groups are renumbered from 0.
    pub fn retain_groups<F>(&mut self, keep: F)
    where
        F: Fn(&Row) -> bool,
    {
        self.rows.retain(|r| keep(r));
        self.reindex_groups();
    }

    pub fn set_dct(&mut self, values: Vec<f64>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(QpcrError::length_mismatch(
                format!("dCt for assay '{}'", self.id),
                self.rows.len(),
                values.len(),
            ));
        }
        for (row, v) in self.rows.iter_mut().zip(values) {
            row.dct = Some(v);
        }
        Ok(())
    }

    pub fn add_ddct(&mut self, column: DdCtColumn, overwrite: bool) -> Result<()> {
        if column.rows.len() != column.values.len() {
            return Err(QpcrError::length_mismatch(
                format!("ddCt for assay '{}'", self.id),
                column.rows.len(),
                column.values.len(),
            ));
        }
        if let Some(pos) = self
            .ddct
            .iter()
            .position(|c| c.normaliser == column.normaliser)
        {
            if !overwrite {
                return Err(QpcrError::DuplicateColumn {
                    name: ddct_column_name(&self.id, &column.normaliser),
                });
            }
            self.ddct[pos] = column;
        } else {
            self.ddct.push(column);
        }
        Ok(())
    }

    pub fn ddct(&self, normaliser: &str) -> Option<&DdCtColumn> {
        self.ddct.iter().find(|c| c.normaliser == normaliser)
    }

    pub fn ddct_columns(&self) -> &[DdCtColumn] {
        &self.ddct
    }

    fn group_rows(&mut self) -> Result<()> {
        let sizes = match &self.replicates {
            Some(reps) => reps.group_sizes(self.rows.len())?,
            None => {
                let ids: Vec<&str> = self.rows.iter().map(|r| r.id.as_str()).collect();
                infer_group_sizes(&ids).ok_or_else(|| QpcrError::ReplicatesNotInferred {
                    assay: self.id.clone(),
                })?
            }
        };
        let groups = assign_groups(&sizes);
        for (row, group) in self.rows.iter_mut().zip(groups) {
            row.group = group;
            row.group_name = format!("Group{group}");
        }
        self.infer_names();
        Ok(())
    }

    /// Use the shared identifier as group name when every group is uniformly named.
    fn infer_names(&mut self) {
        let mut shared: Vec<(usize, &str)> = Vec::new();
        let mut consistent = true;
        for row in &self.rows {
            match shared.iter().find(|(g, _)| *g == row.group) {
                Some((_, id)) if *id != row.id => {
                    consistent = false;
                    break;
                }
                Some(_) => {}
                None => {
                    if shared.iter().any(|(_, id)| *id == row.id) {
                        consistent = false;
                        break;
                    }
                    shared.push((row.group, row.id.as_str()));
                }
            }
        }
        if !consistent {
            warn!(
                assay = %self.id,
                "group names could not be inferred from replicate identifiers; using generic names"
            );
            return;
        }
        for row in &mut self.rows {
            row.group_name = row.id.clone();
        }
    }

    fn reindex_groups(&mut self) {
        let mut seen: Vec<usize> = Vec::new();
        for row in &mut self.rows {
            let pos = match seen.iter().position(|&g| g == row.group) {
                Some(p) => p,
                None => {
                    seen.push(row.group);
                    seen.len() - 1
                }
            };
            row.group = pos;
        }
        self.replicates = Some(Replicates::Sizes(self.group_sizes()));
    }
}

pub fn dct_column_name(assay: &str) -> String {
    format!("{assay}_dCt")
}

pub fn ddct_column_name(assay: &str, normaliser: &str) -> String {
    format!("{assay}_rel_{normaliser}")
}

impl fmt::Display for Assay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Assay(id={}, efficiency={:.4}, rows={}, groups={})",
            self.id,
            self.efficiency,
            self.rows.len(),
            self.groups().len()
        )?;
        writeln!(f, "id\tgroup\tgroup_name\tCt\tdCt")?;
        for row in &self.rows {
            let dct = row.dct.map(format_f64_6).unwrap_or_default();
            writeln!(
                f,
                "{}\t{}\t{}\t{}\t{}",
                row.id,
                row.group,
                row.group_name,
                format_f64_6(row.ct),
                dct
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/assay.rs"]
mod tests;
