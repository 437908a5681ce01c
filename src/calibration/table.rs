use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{QpcrError, Result};
use crate::input::{Delimiter, open_maybe_gz};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Write,
    /// Merge with the entries already on disk; in-memory entries win.
    Append,
}

/// `assay id -> efficiency` records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EfficiencyTable {
    entries: BTreeMap<String, f64>,
}

impl EfficiencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.entries.get(id).copied()
    }

    pub fn insert(&mut self, id: impl Into<String>, efficiency: f64) {
        self.entries.insert(id.into(), efficiency);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Merge `other` into `self`. With `supersede` incoming entries win, otherwise existing ones do.
    pub fn merge(&mut self, other: &EfficiencyTable, supersede: bool) {
        for (id, eff) in &other.entries {
            if supersede || !self.entries.contains_key(id) {
                self.entries.insert(id.clone(), *eff);
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let delimiter = Delimiter::from_path(path);
        let reader = open_maybe_gz(path)?;
        let mut table = Self::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields = delimiter.split(line);
            if fields.len() < 2 {
                return Err(QpcrError::Parse {
                    path: path.to_path_buf(),
                    line: line_no,
                    msg: "expected two columns (id, efficiency)".to_string(),
                });
            }
            let id = fields[0].trim();
            let value = fields[1].trim();
            match value.parse::<f64>() {
                Ok(eff) => table.insert(id, eff),
                Err(_) if line_no == 1 => continue,
                Err(_) => {
                    return Err(QpcrError::Parse {
                        path: path.to_path_buf(),
                        line: line_no,
                        msg: format!("efficiency '{value}' is not a number"),
                    });
                }
            }
        }
        debug!(path = %path.display(), n = table.len(), "efficiency table read");
        Ok(table)
    }

    /// Load a table from disk, replacing the current entries unless `merge` is set.
    pub fn load(&mut self, path: &Path, merge: bool, supersede: bool) -> Result<()> {
        let incoming = Self::from_file(path)?;
        if merge {
            self.merge(&incoming, supersede);
        } else {
            *self = incoming;
        }
        Ok(())
    }

    pub fn save(&self, path: &Path, mode: SaveMode) -> Result<()> {
        let to_write = match mode {
            SaveMode::Write => self.clone(),
            SaveMode::Append if path.exists() => {
                let mut existing = Self::from_file(path)?;
                existing.merge(self, true);
                existing
            }
            SaveMode::Append => self.clone(),
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let delimiter = Delimiter::from_path(path).as_char();
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "id{delimiter}efficiency")?;
        for (id, eff) in to_write.iter() {
            writeln!(out, "{id}{delimiter}{eff:.4}")?;
        }
        out.flush()?;
        Ok(())
    }

    /// Combine several tables; later files win.
    pub fn merge_files(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = Self::new();
        for path in paths {
            let incoming = Self::from_file(path)?;
            merged.merge(&incoming, true);
        }
        Ok(merged)
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/calibration/table.rs"]
mod tests;
