//! Cost of combining partial results of several blocks into the same output.
use crate::device::MachineProfile;
use crate::error::{checked, Error};

/// Returns the cycles spent synchronizing `overlap_count` blocks that accumulate into the
/// same output location.
pub fn sync_penalty(overlap_count: u64, profile: &MachineProfile) -> Result<u64, Error> {
    checked(
        overlap_count.checked_mul(u64::from(profile.sync_penalty)),
        "synchronization penalty",
    )
}
