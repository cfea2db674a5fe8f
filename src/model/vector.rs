//! Cost of elementary vector operations.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utils::{div_ceil, log2_u32};

use crate::device::MachineProfile;
use crate::error::{checked, divisor, Error};

/// Returns the number of cycles needed to apply an elementwise operation on a vector of
/// `len` elements. Operations are issued one warp at a time and a partial warp costs as
/// much as a full one.
///
/// This assumes all the data is already present in registers. Memory operations are
/// assumed to take the same time as other operations.
pub fn vector_op(len: u64, profile: &MachineProfile) -> Result<u64, Error> {
    let warps = div_ceil(len, divisor(profile.warp_size.into(), "warp_size")?);
    let cpi = divisor(profile.cpi.into(), "cpi")?;
    checked(warps.checked_mul(cpi), "vector operation cost")
}

/// Indicates how the operations applied to each row of a tile are counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accounting {
    /// A multiply, a reduction and an add, each as a single vector operation.
    Simple,
    /// Same as `Simple`, but the reduction takes `log2(warp_size)` steps.
    Refined,
}

impl Accounting {
    /// Returns the number of vector operations applied to each row of a tile.
    pub fn ops_per_row(self, profile: &MachineProfile) -> Result<u64, Error> {
        match self {
            Accounting::Simple => Ok(3),
            Accounting::Refined => {
                let steps = log2_u32(profile.warp_size).ok_or_else(|| {
                    Error::configuration("warp_size", "must be a power of two")
                })?;
                Ok(2 + u64::from(steps))
            }
        }
    }
}

impl Default for Accounting {
    fn default() -> Self { Accounting::Simple }
}

impl fmt::Display for Accounting {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Accounting::Simple => write!(f, "simple"),
            Accounting::Refined => write!(f, "refined"),
        }
    }
}

/// Error raised when parsing an unknown accounting mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseAccountingError(String);

impl fmt::Display for ParseAccountingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown accounting `{}`, expected `simple` or `refined`", self.0)
    }
}

impl std::error::Error for ParseAccountingError {}

impl FromStr for Accounting {
    type Err = ParseAccountingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "simple" => Ok(Accounting::Simple),
            "refined" => Ok(Accounting::Refined),
            other => Err(ParseAccountingError(other.to_string())),
        }
    }
}
