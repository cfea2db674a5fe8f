//! Overlap of memory latency with useful work from other threads.
use utils::ratio;

use crate::device::MachineProfile;
use crate::error::Error;

/// Returns the occupancy of a compute unit running `resident_threads` threads, capped
/// at 1.
pub fn occupancy(resident_threads: u64, profile: &MachineProfile) -> f64 {
    ratio(resident_threads, u64::from(profile.max_threads_sm)).min(1.0)
}

/// Returns the fraction of the memory latency that is not hidden by other threads. The
/// fraction decreases linearly with the occupancy, down to `1 - max_lat_hide`.
pub fn unhidden_fraction(resident_threads: u64, profile: &MachineProfile) -> f64 {
    let hidden = profile.max_lat_hide * occupancy(resident_threads, profile);
    (1.0 - hidden).max(0.0).min(1.0)
}

/// Returns the part of a nominal latency that ends up on the critical path.
pub fn observed_latency(nominal: u64, resident_threads: u64, profile: &MachineProfile)
    -> Result<u64, Error>
{
    let observed = (nominal as f64 * unhidden_fraction(resident_threads, profile)).round();
    if observed < u64::max_value() as f64 {
        Ok(observed as u64)
    } else {
        Err(Error::overflow("observed latency"))
    }
}
