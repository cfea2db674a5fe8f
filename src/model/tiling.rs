//! Splits the weight matrix into tiles and maps the tiles onto the compute units.
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use utils::div_ceil;

use crate::device::MachineProfile;
use crate::error::{checked, divisor, Error};

/// Dimensions of a matrix-vector product and of the tiles used to compute it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Length of the input vector.
    pub input_dim: u32,
    /// Length of the output vector.
    pub output_dim: u32,
    /// Width of a tile, along the input dimension.
    pub tile_width: u32,
    /// Height of a tile, along the output dimension.
    pub tile_height: u32,
}

impl Problem {
    pub fn new(input_dim: u32, output_dim: u32, tile_width: u32, tile_height: u32) -> Self {
        Problem { input_dim, output_dim, tile_width, tile_height }
    }

    /// Ensures the problem can be tiled.
    pub fn validate(&self) -> Result<(), Error> {
        let dims = [
            ("input_dim", self.input_dim),
            ("output_dim", self.output_dim),
            ("tile_width", self.tile_width),
            ("tile_height", self.tile_height),
        ];
        for &(name, value) in &dims {
            if value == 0 {
                return Err(Error::dimension(name, 0, "must be at least 1"));
            }
        }
        if self.tile_width > self.input_dim {
            return Err(Error::dimension(
                "tile_width",
                self.tile_width.into(),
                format!("exceeds input_dim ({})", self.input_dim),
            ));
        }
        if self.tile_height > self.output_dim {
            return Err(Error::dimension(
                "tile_height",
                self.tile_height.into(),
                format!("exceeds output_dim ({})", self.output_dim),
            ));
        }
        Ok(())
    }
}

impl Default for Problem {
    fn default() -> Self { Problem::new(1024, 1024, 32, 32) }
}

/// A rectangular block of the weight matrix, processed by one thread block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileDescriptor {
    pub width: u32,
    pub height: u32,
    /// Number of elements each thread processes.
    pub elements_per_thread: u64,
}

/// Computes the number of tiles needed to cover the weight matrix. Rows and columns that
/// do not fill a whole tile are dropped.
pub fn number_of_tiles(input_dim: u32, output_dim: u32, tile_width: u32, tile_height: u32)
    -> u64
{
    u64::from(input_dim / tile_width) * u64::from(output_dim / tile_height)
}

/// Computes the number of threads needed to process a tile with one thread per element.
pub fn threads_per_tile(tile_width: u32, tile_height: u32) -> u64 {
    u64::from(tile_width) * u64::from(tile_height)
}

/// Reduces the number of threads of a tile until it fits in a thread block, by having
/// each thread process more elements. Returns the number of threads per tile and the
/// number of elements per thread.
///
/// The divisor starts at 2 and is the smallest one for which the threads fit. The thread
/// count is rounded up so that no element is left without a thread.
pub fn subdivide(threads: u64, profile: &MachineProfile) -> Result<(u64, u64), Error> {
    let max_threads = divisor(profile.max_threads_block.into(), "max_threads_block")?;
    if threads <= max_threads {
        return Ok((threads, 1));
    }
    let elements_per_thread = std::cmp::max(2, div_ceil(threads, max_threads));
    Ok((div_ceil(threads, elements_per_thread), elements_per_thread))
}

/// Returns how many tiles can be mapped to a single compute unit.
pub fn tiles_per_compute_unit(threads_per_tile: u64, profile: &MachineProfile)
    -> Result<u64, Error>
{
    if threads_per_tile == 0 {
        return Err(Error::dimension("threads_per_tile", 0, "must be at least 1"));
    }
    let max_threads = divisor(profile.max_threads_sm.into(), "max_threads_sm")?;
    Ok(div_ceil(max_threads, threads_per_tile))
}

/// Computes the number of sequential rounds of execution needed to process `tile_count`
/// tiles, when several tiles are mapped to each compute unit.
pub fn rounds(tile_count: u64, threads_per_tile: u64, profile: &MachineProfile)
    -> Result<u64, Error>
{
    let tiles_per_sm = tiles_per_compute_unit(threads_per_tile, profile)?;
    let normalized = div_ceil(tile_count, tiles_per_sm);
    Ok(div_ceil(normalized, divisor(profile.num_sms.into(), "num_sms")?))
}

/// How tiles are distributed over the compute units and over time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSchedule {
    pub tile: TileDescriptor,
    pub tile_count: u64,
    /// Number of threads per tile, after subdivision.
    pub threads_per_tile: u64,
    pub tiles_per_sm: u64,
    pub num_rounds: u64,
    /// Number of tiles that accumulate into the same slice of the output.
    pub tiles_per_band: u64,
}

impl RoundSchedule {
    /// Plans the execution of `problem` on the machine.
    pub fn plan(problem: &Problem, profile: &MachineProfile) -> Result<Self, Error> {
        profile.validate()?;
        problem.validate()?;
        if problem.input_dim % problem.tile_width != 0
            || problem.output_dim % problem.tile_height != 0
        {
            warn!(
                "{}x{} tiles do not divide the {}x{} matrix, remainder rows and columns are ignored",
                problem.tile_width, problem.tile_height, problem.input_dim, problem.output_dim
            );
        }
        let tile_count = number_of_tiles(
            problem.input_dim,
            problem.output_dim,
            problem.tile_width,
            problem.tile_height,
        );
        let (threads, elements_per_thread) =
            subdivide(threads_per_tile(problem.tile_width, problem.tile_height), profile)?;
        let tiles_per_sm = tiles_per_compute_unit(threads, profile)?;
        let num_rounds = rounds(tile_count, threads, profile)?;
        checked(
            num_rounds
                .checked_mul(tiles_per_sm)
                .and_then(|x| x.checked_mul(u64::from(profile.num_sms))),
            "round capacity",
        )?;
        let schedule = RoundSchedule {
            tile: TileDescriptor {
                width: problem.tile_width,
                height: problem.tile_height,
                elements_per_thread,
            },
            tile_count,
            threads_per_tile: threads,
            tiles_per_sm,
            num_rounds,
            tiles_per_band: u64::from(problem.input_dim / problem.tile_width),
        };
        debug!("schedule {:?}", schedule);
        Ok(schedule)
    }

    /// Returns the number of tiles processed by the whole device in a full round.
    pub fn round_capacity(&self, profile: &MachineProfile) -> u64 {
        profile.max_concurrent_blocks(self.tiles_per_sm)
    }

    /// Returns the number of other tiles accumulating into the output of a tile.
    pub fn output_overlap(&self) -> u64 {
        self.tiles_per_band.saturating_sub(1)
    }
}
