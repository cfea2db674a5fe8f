//! Latency of transfers through the memory hierarchy. Transfers are limited by the
//! bandwidth of each level, which is shared by all the tiles running concurrently.
use serde::{Deserialize, Serialize};

use crate::device::MachineProfile;
use crate::error::{checked, Error};

const MB: f64 = 1024.0 * 1024.0;

/// A transfer path between two levels of the memory hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Path {
    /// Between the L2 cache and the scratchpad.
    L2ToScratchpad,
    /// Between the global memory and the L2 cache.
    MemoryToL2,
}

impl Path {
    /// Returns the bandwidth of the path, in MB/s.
    pub fn bandwidth(self, profile: &MachineProfile) -> u64 {
        match self {
            Path::L2ToScratchpad => profile.l2_bw,
            Path::MemoryToL2 => profile.global_mem_bw,
        }
    }
}

/// Returns the number of bytes moved by `access_count` warp-wide accesses.
pub fn working_set(access_count: u64, profile: &MachineProfile) -> Result<u64, Error> {
    checked(
        access_count
            .checked_mul(u64::from(profile.warp_size))
            .and_then(|x| x.checked_mul(u64::from(profile.val_size))),
        "working set size",
    )
}

fn check_concurrency(concurrency: u64) -> Result<(), Error> {
    if concurrency == 0 {
        Err(Error::dimension("concurrency", 0, "must be at least 1"))
    } else {
        Ok(())
    }
}

/// Converts a duration in seconds into cycles.
fn to_cycles(seconds: f64, profile: &MachineProfile) -> Result<u64, Error> {
    let cycles = (seconds * profile.clock_hz()).round();
    if cycles.is_finite() && cycles < u64::max_value() as f64 {
        Ok(cycles as u64)
    } else {
        Err(Error::overflow("transfer latency"))
    }
}

/// Computes the number of cycles needed to move the data of `access_count` warp-wide
/// accesses along `path`, when `concurrency` tiles share its bandwidth.
pub fn transfer_latency(
    path: Path,
    access_count: u64,
    concurrency: u64,
    profile: &MachineProfile,
) -> Result<u64, Error> {
    check_concurrency(concurrency)?;
    let bandwidth = path.bandwidth(profile);
    if bandwidth == 0 {
        return Err(Error::configuration("bandwidth", "must be strictly positive"));
    }
    let data_mb = working_set(access_count, profile)? as f64 / MB;
    let share = bandwidth as f64 / concurrency as f64;
    to_cycles(data_mb / share, profile)
}

/// Latency of moving data between the L2 cache and the scratchpad.
pub fn l2_latency(access_count: u64, concurrency: u64, profile: &MachineProfile)
    -> Result<u64, Error>
{
    transfer_latency(Path::L2ToScratchpad, access_count, concurrency, profile)
}

/// Latency of moving data between the global memory and the L2 cache.
pub fn mem_latency(access_count: u64, concurrency: u64, profile: &MachineProfile)
    -> Result<u64, Error>
{
    transfer_latency(Path::MemoryToL2, access_count, concurrency, profile)
}

/// Returns the fraction of the working set of a tile that fits in its share of the L2
/// cache. Values above 1 indicate the whole working set fits.
pub fn l2_fit_fraction(access_count: u64, concurrency: u64, profile: &MachineProfile)
    -> Result<f64, Error>
{
    check_concurrency(concurrency)?;
    let bytes = working_set(access_count, profile)?;
    if bytes == 0 {
        return Ok(std::f64::INFINITY);
    }
    let share = profile.l2_cap as f64 / concurrency as f64;
    Ok(share / bytes as f64)
}

/// Latency of bringing the data of a tile into the scratchpad when it initially resides
/// in global memory. The part of the working set that fits in the L2 cache only pays the
/// L2 latency, the rest also pays the memory latency.
pub fn blended_latency(access_count: u64, concurrency: u64, profile: &MachineProfile)
    -> Result<u64, Error>
{
    let l2 = l2_latency(access_count, concurrency, profile)?;
    let fit = l2_fit_fraction(access_count, concurrency, profile)?;
    if fit >= 1.0 {
        return Ok(l2);
    }
    let mem = mem_latency(access_count, concurrency, profile)?;
    let miss = checked(l2.checked_add(mem), "blended latency")?;
    let blended = fit * l2 as f64 + (1.0 - fit) * miss as f64;
    Ok(blended.round() as u64)
}
