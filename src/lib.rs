//! Predicts how many cycles a tiled matrix-vector product takes on a GPU, without
//! running it. The model plans how tiles are mapped on the compute units, then sums the
//! cost of each round of tiles under an assumption on where the data initially resides.
extern crate tilecost_utils as utils;

pub mod device;
pub mod error;
pub mod model;

pub use crate::device::MachineProfile;
pub use crate::error::Error;
pub use crate::model::{estimate, Accounting, Estimate, Problem, Residency};

/// Result type of the cost model.
pub type Result<T> = std::result::Result<T, Error>;
