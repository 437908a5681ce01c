use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{QpcrError, Result};

/// Replicate layout of an assay.
///
/// `Uniform(r)` means every group holds `r` rows. `Sizes` lists the size of
/// each group in row order. The formula `"n:m,..."` parses into `Sizes`, a
/// bare integer parses into `Uniform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replicates {
    Uniform(usize),
    Sizes(Vec<usize>),
}

impl Replicates {
    /// Expand `"n:m,n2:m2"` (missing `:m` means 1) into group sizes.
    pub fn from_formula(formula: &str) -> Result<Vec<usize>> {
        let invalid = |reason: &str| QpcrError::InvalidReplicates {
            formula: formula.to_string(),
            reason: reason.to_string(),
        };
        let mut sizes = Vec::new();
        for segment in formula.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                return Err(invalid("empty segment"));
            }
            let (size, times) = match segment.split_once(':') {
                Some((s, t)) => (s.trim(), t.trim()),
                None => (segment, "1"),
            };
            let size: usize = size
                .parse()
                .map_err(|_| invalid(&format!("'{size}' is not a group size")))?;
            let times: usize = times
                .parse()
                .map_err(|_| invalid(&format!("'{times}' is not a repeat count")))?;
            if size == 0 {
                return Err(invalid("group size must be positive"));
            }
            sizes.extend(std::iter::repeat_n(size, times));
        }
        if sizes.is_empty() {
            return Err(invalid("formula produced no groups"));
        }
        Ok(sizes)
    }

    /// Resolve into one size per group, checking the layout covers `n_rows` exactly.
    pub fn group_sizes(&self, n_rows: usize) -> Result<Vec<usize>> {
        match self {
            Replicates::Uniform(r) => {
                if *r == 0 || n_rows % r != 0 {
                    return Err(QpcrError::ReplicatesDontCover {
                        n_rows,
                        replicates: self.to_string(),
                    });
                }
                Ok(vec![*r; n_rows / r])
            }
            Replicates::Sizes(sizes) => {
                if sizes.iter().any(|&s| s == 0) || sizes.iter().sum::<usize>() != n_rows {
                    return Err(QpcrError::ReplicatesDontCover {
                        n_rows,
                        replicates: self.to_string(),
                    });
                }
                Ok(sizes.clone())
            }
        }
    }
}

impl FromStr for Replicates {
    type Err = QpcrError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(r) = s.parse::<usize>() {
            if r == 0 {
                return Err(QpcrError::InvalidReplicates {
                    formula: s.to_string(),
                    reason: "group size must be positive".to_string(),
                });
            }
            return Ok(Replicates::Uniform(r));
        }
        Ok(Replicates::Sizes(Self::from_formula(s)?))
    }
}

impl fmt::Display for Replicates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replicates::Uniform(r) => write!(f, "{r}"),
            Replicates::Sizes(sizes) => {
                let parts: Vec<String> = sizes.iter().map(|s| s.to_string()).collect();
                write!(f, "({})", parts.join(","))
            }
        }
    }
}

impl Serialize for Replicates {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Replicates::Uniform(r) => serializer.serialize_u64(*r as u64),
            Replicates::Sizes(sizes) => sizes.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReplicatesRepr {
    Int(usize),
    List(Vec<usize>),
    Formula(String),
}

impl<'de> Deserialize<'de> for Replicates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match ReplicatesRepr::deserialize(deserializer)? {
            ReplicatesRepr::Int(r) => Ok(Replicates::Uniform(r)),
            ReplicatesRepr::List(sizes) => Ok(Replicates::Sizes(sizes)),
            ReplicatesRepr::Formula(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Group id per row from a list of group sizes.
pub fn assign_groups(sizes: &[usize]) -> Vec<usize> {
    let mut groups = Vec::with_capacity(sizes.iter().sum());
    for (group, &size) in sizes.iter().enumerate() {
        groups.extend(std::iter::repeat_n(group, size));
    }
    groups
}

/// Group sizes inferred from contiguous runs of identical identifiers.
///
/// Returns `None` unless at least one run holds more than one row.
pub fn infer_group_sizes<S: AsRef<str>>(ids: &[S]) -> Option<Vec<usize>> {
    let mut sizes: Vec<usize> = Vec::new();
    let mut prev: Option<&str> = None;
    for id in ids {
        let id = id.as_ref();
        match (prev, sizes.last_mut()) {
            (Some(p), Some(last)) if p == id => *last += 1,
            _ => sizes.push(1),
        }
        prev = Some(id);
    }
    if sizes.iter().any(|&s| s > 1) {
        Some(sizes)
    } else {
        None
    }
}

/// User supplied group names, either positional or keyed by the current name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupNames {
    Positional(Vec<String>),
    Mapping(Vec<(String, String)>),
}

impl GroupNames {
    /// Parse `a,b,c` as positional names or `old=new,...` as a mapping.
    pub fn parse_list(s: &str) -> Self {
        let items: Vec<&str> = s.split(',').map(str::trim).filter(|x| !x.is_empty()).collect();
        if !items.is_empty() && items.iter().all(|x| x.contains('=')) {
            GroupNames::Mapping(
                items
                    .iter()
                    .filter_map(|x| x.split_once('='))
                    .map(|(a, b)| (a.trim().to_string(), b.trim().to_string()))
                    .collect(),
            )
        } else {
            GroupNames::Positional(items.iter().map(|x| x.to_string()).collect())
        }
    }

    /// Translate `current` distinct names into new ones, in the same order.
    pub fn resolve(&self, current: &[String]) -> Result<Vec<String>> {
        match self {
            GroupNames::Positional(names) => {
                if names.len() != current.len() {
                    return Err(QpcrError::GroupNamesDontCover {
                        current: current.to_vec(),
                        received: names.clone(),
                    });
                }
                Ok(names.clone())
            }
            GroupNames::Mapping(pairs) => {
                let mut out = Vec::with_capacity(current.len());
                for name in current {
                    match pairs.iter().find(|(old, _)| old == name) {
                        Some((_, new)) => out.push(new.clone()),
                        None => {
                            return Err(QpcrError::GroupNamesDontCover {
                                current: current.to_vec(),
                                received: pairs.iter().map(|(old, _)| old.clone()).collect(),
                            });
                        }
                    }
                }
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/replicates.rs"]
mod tests;
