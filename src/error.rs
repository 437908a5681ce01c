use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QpcrError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Structural,
    Inference,
    Configuration,
    MissingData,
    Io,
    Parse,
}

#[derive(Debug, Error)]
pub enum QpcrError {
    #[error(
        "replicates {replicates} do not cover all {n_rows} rows (an integer must divide the row count, a list must sum to it)"
    )]
    ReplicatesDontCover { n_rows: usize, replicates: String },

    #[error("new group names do not cover the current groups: current={current:?}, received={received:?}")]
    GroupNamesDontCover {
        current: Vec<String>,
        received: Vec<String>,
    },

    #[error("column '{name}' already exists; set overwrite to replace it")]
    DuplicateColumn { name: String },

    #[error("{context}: expected {expected} rows, got {actual}")]
    LengthMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("{context}: sample and normaliser grouping differ")]
    GroupMismatch { context: String },

    #[error("replicates could not be inferred for assay '{assay}'; specify replicates explicitly")]
    ReplicatesNotInferred { assay: String },

    #[error("dilution could not be inferred from group name '{group_name}' (expected 'calibrator:<name>:<step>')")]
    DilutionNotInferred { group_name: String },

    #[error("regression needs at least two distinct dilution points, got {points}")]
    DegenerateRegression { points: usize },

    #[error("unknown {what} '{token}'")]
    UnknownToken { what: &'static str, token: String },

    #[error("invalid replicate formula '{formula}': {reason}")]
    InvalidReplicates { formula: String, reason: String },

    #[error("invalid dilution: {0}")]
    InvalidDilution(String),

    #[error("reference group '{0}' not found")]
    UnknownGroup(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("assay '{assay}' has no dCt values yet")]
    MissingDeltaCt { assay: String },

    #[error("no efficiency found for assay '{assay}'")]
    MissingEfficiency { assay: String },

    #[error("assay '{assay}' could neither be assigned an efficiency nor calibrated: {source}")]
    Uncalibrated {
        assay: String,
        #[source]
        source: Box<QpcrError>,
    },

    #[error("parse error in {} (line {line}): {msg}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        msg: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QpcrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QpcrError::ReplicatesDontCover { .. }
            | QpcrError::GroupNamesDontCover { .. }
            | QpcrError::DuplicateColumn { .. }
            | QpcrError::LengthMismatch { .. }
            | QpcrError::GroupMismatch { .. }
            | QpcrError::MissingDeltaCt { .. } => ErrorKind::Structural,
            QpcrError::ReplicatesNotInferred { .. }
            | QpcrError::DilutionNotInferred { .. }
            | QpcrError::DegenerateRegression { .. } => ErrorKind::Inference,
            QpcrError::UnknownToken { .. }
            | QpcrError::InvalidReplicates { .. }
            | QpcrError::InvalidDilution(_)
            | QpcrError::UnknownGroup(_)
            | QpcrError::InvalidSetting(_) => ErrorKind::Configuration,
            QpcrError::MissingEfficiency { .. } | QpcrError::Uncalibrated { .. } => {
                ErrorKind::MissingData
            }
            QpcrError::Io(_) => ErrorKind::Io,
            QpcrError::Parse { .. } | QpcrError::Json(_) => ErrorKind::Parse,
        }
    }

    pub(crate) fn length_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        QpcrError::LengthMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}
