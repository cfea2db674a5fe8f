//! Analytical model of the execution time of a tiled matrix-vector product.
pub mod hiding;
pub mod memory;
pub mod sync;
pub mod tile;
pub mod tiling;
pub mod vector;

pub use self::tile::{tile_cost, CostBreakdown, Residency, TileContext};
pub use self::tiling::{Problem, RoundSchedule, TileDescriptor};
pub use self::vector::{vector_op, Accounting};

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use utils::div_ceil;

use crate::device::MachineProfile;
use crate::error::{checked, Error};

/// Converts a number of cycles into microseconds, truncating the result.
pub fn cycles_to_time(cycles: u64, profile: &MachineProfile) -> Result<u64, Error> {
    cycles.checked_div(u64::from(profile.gpu_clock))
        .ok_or_else(|| Error::configuration("gpu_clock", "must be strictly positive"))
}

/// Cost of a group of identical rounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundCost {
    /// Index of the first round of the group.
    pub first: u64,
    /// Number of rounds in the group.
    pub repeat: u64,
    /// Number of tiles processed by the device in each round.
    pub tiles: u64,
    /// Number of tiles processed by each compute unit in each round.
    pub tiles_per_sm: u64,
    /// Cost of a single tile.
    pub tile: CostBreakdown,
    /// Cycles spent by each round.
    pub cycles: u64,
}

/// The predicted execution time of a problem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Name of the machine profile used.
    pub profile: String,
    /// The estimated problem.
    pub problem: Problem,
    /// Where the data initially resides.
    pub residency: Residency,
    /// How the operations on each row are counted.
    pub accounting: Accounting,
    /// How the tiles are mapped onto the device.
    pub schedule: RoundSchedule,
    /// Cost of each group of identical rounds.
    pub rounds: Vec<RoundCost>,
    /// Total number of cycles.
    pub cycles: u64,
    /// Total time, in microseconds.
    pub time_us: u64,
}

/// Computes the cost of a round that processes `tiles` tiles.
fn round_cost(
    first: u64,
    repeat: u64,
    tiles: u64,
    schedule: &RoundSchedule,
    residency: Residency,
    accounting: Accounting,
    profile: &MachineProfile,
) -> Result<RoundCost, Error> {
    // Tiles are spread over the compute units, which run their tiles one after the other.
    let tiles_per_sm = std::cmp::min(
        schedule.tiles_per_sm,
        div_ceil(tiles, u64::from(profile.num_sms)),
    );
    let context = TileContext::for_round(schedule, tiles, tiles_per_sm)?;
    let tile = tile_cost(residency, accounting, &schedule.tile, &context, profile)?;
    let cycles = checked(tile.total()?.checked_mul(tiles_per_sm), "round cycles")?;
    trace!("rounds {}..{}: {} tiles, {} per SM, {} cycles per tile ({})",
           first, first + repeat, tiles, tiles_per_sm, tile.total()?, tile);
    Ok(RoundCost { first, repeat, tiles, tiles_per_sm, tile, cycles })
}

/// Estimates the number of cycles and the time needed to compute `problem` when the data
/// initially resides at the given level of the memory hierarchy.
pub fn estimate(
    problem: &Problem,
    residency: Residency,
    accounting: Accounting,
    profile: &MachineProfile,
) -> Result<Estimate, Error> {
    profile.validate()?;
    let schedule = RoundSchedule::plan(problem, profile)?;
    // All rounds but the last one are full and thus have the same cost.
    let capacity = schedule.round_capacity(profile);
    let full_rounds = schedule.tile_count / capacity;
    let remainder = schedule.tile_count % capacity;
    debug_assert_eq!(full_rounds + (remainder > 0) as u64, schedule.num_rounds);
    let mut rounds = vec![];
    if full_rounds > 0 {
        rounds.push(round_cost(
            0, full_rounds, capacity, &schedule, residency, accounting, profile)?);
    }
    if remainder > 0 {
        rounds.push(round_cost(
            full_rounds, 1, remainder, &schedule, residency, accounting, profile)?);
    }
    let cycles = rounds.iter().try_fold(0u64, |acc, round| {
        round.cycles.checked_mul(round.repeat).and_then(|x| acc.checked_add(x))
    });
    let cycles = checked(cycles, "total cycles")?;
    let time_us = cycles_to_time(cycles, profile)?;
    debug!("{} residency: {} cycles, {}us", residency, cycles, time_us);
    Ok(Estimate {
        profile: profile.name.clone(),
        problem: *problem,
        residency,
        accounting,
        schedule,
        rounds,
        cycles,
        time_us,
    })
}
