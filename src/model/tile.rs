//! Cost of computing one tile of the weight matrix against the input vector.
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::device::MachineProfile;
use crate::error::{checked, Error};
use crate::model::tiling::{RoundSchedule, TileDescriptor};
use crate::model::vector::{vector_op, Accounting};
use crate::model::{hiding, memory, sync};

/// The level of the memory hierarchy assumed to hold the data of a tile. Each level
/// accounts for the costs of the previous ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Residency {
    /// Data is already in registers: only the arithmetic is counted.
    Register,
    /// Data is in the scratchpad: loads and stores cost a vector operation each.
    Scratchpad,
    /// Data is in the L2 cache: the transfers to the scratchpad are partially hidden, and
    /// blocks writing the same outputs must synchronize.
    L2,
    /// Data is in global memory: the part of the working set that does not fit in L2
    /// also pays the memory latency.
    Memory,
    /// As `Memory`, with the cost scaled by the contention of all the active threads on
    /// the global memory bus. Rounds with fewer active threads than the bus width cost
    /// the same as `Memory`.
    Bus,
}

impl Residency {
    pub const ALL: [Residency; 5] = [
        Residency::Register,
        Residency::Scratchpad,
        Residency::L2,
        Residency::Memory,
        Residency::Bus,
    ];
}

impl Default for Residency {
    fn default() -> Self { Residency::Register }
}

impl fmt::Display for Residency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Residency::Register => "register",
            Residency::Scratchpad => "scratchpad",
            Residency::L2 => "l2",
            Residency::Memory => "memory",
            Residency::Bus => "bus",
        };
        write!(f, "{}", name)
    }
}

/// Error raised when parsing an unknown residency.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResidencyError(String);

impl fmt::Display for ParseResidencyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "unknown residency `{}`, expected one of {} or 0 to 4",
            self.0,
            Residency::ALL.iter().format(", ")
        )
    }
}

impl std::error::Error for ParseResidencyError {}

impl FromStr for Residency {
    type Err = ParseResidencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "register" | "registers" | "0" => Ok(Residency::Register),
            "scratchpad" | "shared" | "1" => Ok(Residency::Scratchpad),
            "l2" | "2" => Ok(Residency::L2),
            "memory" | "mem" | "3" => Ok(Residency::Memory),
            "bus" | "4" => Ok(Residency::Bus),
            _ => Err(ParseResidencyError(s.to_string())),
        }
    }
}

/// Describes what runs alongside a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileContext {
    /// Number of tiles processed at the same time on the whole device.
    pub concurrency: u64,
    /// Number of threads resident on the compute unit that runs the tile.
    pub resident_threads: u64,
    /// Number of threads active on the whole device.
    pub active_threads: u64,
    /// Number of other blocks accumulating into the same outputs.
    pub overlap: u64,
}

impl TileContext {
    /// Describes a round where `tiles_in_round` tiles run, with `tiles_on_sm` of them on
    /// each compute unit.
    pub fn for_round(schedule: &RoundSchedule, tiles_in_round: u64, tiles_on_sm: u64)
        -> Result<Self, Error>
    {
        Ok(TileContext {
            concurrency: tiles_in_round.max(1),
            resident_threads: checked(
                tiles_on_sm.checked_mul(schedule.threads_per_tile),
                "resident threads",
            )?,
            active_threads: checked(
                tiles_in_round.checked_mul(schedule.threads_per_tile),
                "active threads",
            )?,
            overlap: schedule.output_overlap(),
        })
    }
}

/// The cycles spent by a tile, by cause.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub input_reads: u64,
    pub weight_reads: u64,
    pub work: u64,
    pub store: u64,
    pub sync: u64,
    /// Memory latency that is not hidden by other threads.
    pub latency: u64,
    /// Extra cycles due to the contention on the memory bus.
    pub contention: u64,
}

impl CostBreakdown {
    fn terms(&self) -> [(&'static str, u64); 7] {
        [
            ("input reads", self.input_reads),
            ("weight reads", self.weight_reads),
            ("work", self.work),
            ("store", self.store),
            ("sync", self.sync),
            ("latency", self.latency),
            ("contention", self.contention),
        ]
    }

    /// Returns the total number of cycles.
    pub fn total(&self) -> Result<u64, Error> {
        let total = self.terms().iter().try_fold(0u64, |acc, &(_, x)| acc.checked_add(x));
        checked(total, "tile cost")
    }
}

impl fmt::Display for CostBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let terms = self.terms();
        let shown = terms
            .iter()
            .filter(|&&(_, x)| x > 0)
            .map(|&(name, x)| format!("{}: {}", name, x))
            .join(", ");
        if shown.is_empty() {
            write!(f, "no cost")
        } else {
            write!(f, "{}", shown)
        }
    }
}

/// Computes the cycles needed to process one tile under the given residency assumption.
///
/// Each row of the tile is multiplied with the input vector, reduced and added to the
/// output. Processing several elements per thread lengthens the vectors accordingly.
pub fn tile_cost(
    residency: Residency,
    accounting: Accounting,
    tile: &TileDescriptor,
    context: &TileContext,
    profile: &MachineProfile,
) -> Result<CostBreakdown, Error> {
    profile.validate()?;
    if tile.elements_per_thread == 0 {
        return Err(Error::dimension("elements_per_thread", 0, "must be at least 1"));
    }
    let len = u64::from(tile.width);
    let height = u64::from(tile.height);
    let ops_per_row = accounting.ops_per_row(profile)?;
    let thread_len = checked(len.checked_mul(tile.elements_per_thread), "thread vector length")?;
    let work = checked(
        vector_op(thread_len, profile)?
            .checked_mul(ops_per_row)
            .and_then(|x| x.checked_mul(height)),
        "tile work",
    )?;
    let mut cost = CostBreakdown { work, ..CostBreakdown::default() };
    if residency == Residency::Register {
        return Ok(cost);
    }
    // The input vector is read once, then each row of weights, and the output is stored
    // once.
    cost.input_reads = vector_op(len, profile)?;
    cost.weight_reads = checked(height.checked_mul(cost.input_reads), "weight reads")?;
    cost.store = vector_op(height, profile)?;
    if residency == Residency::Scratchpad {
        return Ok(cost);
    }
    let accesses = checked(
        cost.input_reads
            .checked_add(cost.weight_reads)
            .and_then(|x| x.checked_add(cost.store)),
        "access count",
    )? / u64::from(profile.cpi);
    let nominal = if residency == Residency::L2 {
        memory::l2_latency(accesses, context.concurrency, profile)?
    } else {
        memory::blended_latency(accesses, context.concurrency, profile)?
    };
    cost.latency = hiding::observed_latency(nominal, context.resident_threads, profile)?;
    cost.sync = sync::sync_penalty(context.overlap, profile)?;
    if residency == Residency::Bus {
        // The bus only slows the round down once it is saturated.
        let factor = context.active_threads as f64 / f64::from(profile.global_bus_width);
        if factor > 1.0 {
            let extra = (cost.total()? as f64 * (factor - 1.0)).round();
            if extra >= u64::max_value() as f64 {
                return Err(Error::overflow("bus contention"));
            }
            cost.contention = extra as u64;
        }
    }
    Ok(cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(width: u32, height: u32, elements_per_thread: u64) -> TileDescriptor {
        TileDescriptor { width, height, elements_per_thread }
    }

    fn context() -> TileContext {
        TileContext { concurrency: 160, resident_threads: 2048, active_threads: 163_840, overlap: 31 }
    }

    #[test]
    fn register_counts_only_work() {
        let profile = MachineProfile::titan_v();
        let cost = tile_cost(
            Residency::Register, Accounting::Simple, &tile(32, 32, 1), &context(), &profile);
        let cost = cost.unwrap();
        assert_eq!(cost.work, 96);
        assert_eq!(cost.total().unwrap(), 96);
        let refined = tile_cost(
            Residency::Register, Accounting::Refined, &tile(32, 32, 1), &context(), &profile);
        assert_eq!(refined.unwrap().total().unwrap(), 32 * 7);
    }

    #[test]
    fn elements_per_thread_lengthen_vectors() {
        let profile = MachineProfile::titan_v();
        let cost = tile_cost(
            Residency::Register, Accounting::Simple, &tile(64, 64, 4), &context(), &profile);
        assert_eq!(cost.unwrap().work, 64 * 3 * 8);
    }

    #[test]
    fn scratchpad_counts_loads_and_stores() {
        let profile = MachineProfile::titan_v();
        let cost = tile_cost(
            Residency::Scratchpad, Accounting::Simple, &tile(32, 32, 1), &context(), &profile);
        let cost = cost.unwrap();
        assert_eq!(cost.input_reads, 1);
        assert_eq!(cost.weight_reads, 32);
        assert_eq!(cost.store, 1);
        assert_eq!(cost.latency, 0);
        assert_eq!(cost.sync, 0);
        assert_eq!(cost.total().unwrap(), 1 + 32 + 96 + 1);
    }

    #[test]
    fn l2_adds_hidden_latency_and_sync() {
        let profile = MachineProfile::titan_v();
        let ctx = context();
        let cost = tile_cost(
            Residency::L2, Accounting::Simple, &tile(32, 32, 1), &ctx, &profile).unwrap();
        let nominal = memory::l2_latency(34, 160, &profile).unwrap();
        assert_eq!(cost.latency, hiding::observed_latency(nominal, 2048, &profile).unwrap());
        assert!(cost.latency < nominal);
        assert_eq!(cost.sync, 31 * 100);
        assert_eq!(cost.contention, 0);
    }

    #[test]
    fn no_sync_without_overlap() {
        let profile = MachineProfile::titan_v();
        let ctx = TileContext { overlap: 0, ..context() };
        let cost = tile_cost(
            Residency::L2, Accounting::Simple, &tile(32, 32, 1), &ctx, &profile).unwrap();
        assert_eq!(cost.sync, 0);
    }

    #[test]
    fn memory_spills_past_l2() {
        let mut profile = MachineProfile::titan_v();
        profile.l2_cap = 64 * 1024;
        let ctx = context();
        let l2 = tile_cost(Residency::L2, Accounting::Simple, &tile(32, 32, 1), &ctx, &profile);
        let mem = tile_cost(Residency::Memory, Accounting::Simple, &tile(32, 32, 1), &ctx, &profile);
        assert!(mem.unwrap().latency > l2.unwrap().latency);
    }

    #[test]
    fn memory_is_l2_when_it_fits() {
        let profile = MachineProfile::titan_v();
        let ctx = context();
        let l2 = tile_cost(Residency::L2, Accounting::Simple, &tile(32, 32, 1), &ctx, &profile);
        let mem = tile_cost(Residency::Memory, Accounting::Simple, &tile(32, 32, 1), &ctx, &profile);
        assert_eq!(mem.unwrap(), l2.unwrap());
    }

    #[test]
    fn bus_contention_scales_the_total() {
        let profile = MachineProfile::titan_v();
        let ctx = TileContext { active_threads: 3 * 3072, ..context() };
        let mem = tile_cost(
            Residency::Memory, Accounting::Simple, &tile(32, 32, 1), &ctx, &profile).unwrap();
        let bus = tile_cost(
            Residency::Bus, Accounting::Simple, &tile(32, 32, 1), &ctx, &profile).unwrap();
        assert_eq!(bus.total().unwrap(), 3 * mem.total().unwrap());
    }

    #[test]
    fn unsaturated_bus_costs_as_memory() {
        let profile = MachineProfile::titan_v();
        // A single 32x32 tile: 1024 active threads on a 3072-bit bus.
        let lone = TileContext {
            concurrency: 1,
            resident_threads: 1024,
            active_threads: 1024,
            overlap: 0,
        };
        let mem = tile_cost(
            Residency::Memory, Accounting::Simple, &tile(32, 32, 1), &lone, &profile).unwrap();
        let bus = tile_cost(
            Residency::Bus, Accounting::Simple, &tile(32, 32, 1), &lone, &profile).unwrap();
        assert_eq!(bus.contention, 0);
        assert_eq!(bus.total().unwrap(), mem.total().unwrap());
    }

    #[test]
    fn zeroed_profile_fields_are_errors() {
        for &field in &["cpi", "warp_size", "max_threads_sm", "global_bus_width"] {
            let mut profile = MachineProfile::titan_v();
            match field {
                "cpi" => profile.cpi = 0,
                "warp_size" => profile.warp_size = 0,
                "max_threads_sm" => profile.max_threads_sm = 0,
                _ => profile.global_bus_width = 0,
            }
            let cost = tile_cost(
                Residency::Bus, Accounting::Simple, &tile(32, 32, 1), &context(), &profile);
            match cost {
                Err(Error::Configuration { field: f, .. }) => assert_eq!(f, field),
                other => panic!("unexpected result {:?} for {}", other, field),
            }
        }
    }

    #[test]
    fn residencies_are_increasingly_expensive() {
        let profile = MachineProfile::titan_v();
        let ctx = context();
        let costs = Residency::ALL
            .iter()
            .map(|&r| {
                tile_cost(r, Accounting::Simple, &tile(32, 32, 1), &ctx, &profile)
                    .and_then(|c| c.total())
                    .unwrap()
            })
            .collect::<Vec<_>>();
        assert!(costs.windows(2).all(|w| w[0] <= w[1]), "{:?}", costs);
    }

    #[test]
    fn rejects_zero_elements_per_thread() {
        let profile = MachineProfile::titan_v();
        let cost = tile_cost(
            Residency::Register, Accounting::Simple, &tile(32, 32, 0), &context(), &profile);
        assert!(cost.is_err());
    }

    #[test]
    fn parses_residencies() {
        assert_eq!("L2".parse::<Residency>(), Ok(Residency::L2));
        assert_eq!("3".parse::<Residency>(), Ok(Residency::Memory));
        assert_eq!("registers".parse::<Residency>(), Ok(Residency::Register));
        assert!("disk".parse::<Residency>().is_err());
        for r in &Residency::ALL {
            assert_eq!(r.to_string().parse::<Residency>().as_ref(), Ok(r));
        }
    }

    #[test]
    fn displays_non_zero_terms() {
        let cost = CostBreakdown { work: 96, sync: 3, ..CostBreakdown::default() };
        assert_eq!(cost.to_string(), "work: 96, sync: 3");
        assert_eq!(CostBreakdown::default().to_string(), "no cost");
    }
}
