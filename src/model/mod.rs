pub mod assay;
pub mod curve;
pub mod expand;
pub mod replicates;
pub mod row;
pub mod settings;

pub use assay::{Assay, DdCtColumn};
pub use replicates::{GroupNames, Replicates};
pub use row::{RawAssay, Row};
