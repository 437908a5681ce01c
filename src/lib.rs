pub mod calibration;
pub mod cli;
pub mod error;
pub mod input;
pub mod logging;
pub mod math;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod results;

pub use error::{ErrorKind, QpcrError, Result};
pub use model::{Assay, Replicates};
pub use pipeline::stage4_delta_ct::{Analyser, Anchor, DeltaFunction};
pub use pipeline::stage5_normalise::{NormMode, Normaliser, PseudoNormaliser};
pub use results::Results;
