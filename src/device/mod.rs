//! Describes the accelerator the cost model targets.
mod load;

use crate::error::Error;
use serde::{Deserialize, Serialize};
use utils::log2_u32;

const MB: u64 = 1024 * 1024;

// references:
// https://www.techpowerup.com/gpu-specs/titan-v.c3051

/// Hardware constants of a GPU-class accelerator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct MachineProfile {
    /// The name of the accelerator.
    pub name: String,
    /// Capacity of the global memory, in bytes.
    pub global_mem_cap: u64,
    /// Bandwidth between the global memory and the L2 cache, in MB/s.
    pub global_mem_bw: u64,
    /// Number of cores.
    pub num_cores: u32,
    /// Clock of the compute units, in MHz.
    pub gpu_clock: u32,
    /// Number of threads in a warp.
    pub warp_size: u32,
    /// Number of compute units (SMs).
    pub num_sms: u32,
    /// Maximal number of threads in a block.
    pub max_threads_block: u32,
    /// Maximal number of resident threads on a compute unit.
    pub max_threads_sm: u32,
    /// Capacity of the L2 cache, in bytes.
    pub l2_cap: u64,
    /// Bandwidth between the L2 cache and the scratchpad, in MB/s.
    pub l2_bw: u64,
    /// Capacity of the constant memory, in bytes.
    pub constant_cap: u64,
    /// Capacity of the shared memory (scratchpad) per block, in bytes.
    pub shared_cap: u64,
    /// Size of a value, in bytes.
    pub val_size: u32,
    /// Number of cycles per instruction, in equilibrium.
    pub cpi: u32,
    /// Maximal fraction of the memory latency that can be hidden.
    pub max_lat_hide: f64,
    /// Cycles spent each time a block synchronizes with another on an output.
    pub sync_penalty: u32,
    /// Width of the global memory bus, in bits.
    pub global_bus_width: u32,
}

impl MachineProfile {
    /// Returns the profile of a Titan V.
    pub fn titan_v() -> Self {
        MachineProfile {
            name: "titan_v".to_string(),
            global_mem_cap: 12037 * MB,
            // bus width (bytes) * transfers/cycle (assumed DDR) * bus clock (MHz).
            global_mem_bw: (3072 / 8) * 2 * 850,
            num_cores: 5120,
            gpu_clock: 1455,
            warp_size: 32,
            num_sms: 80,
            max_threads_block: 1024,
            max_threads_sm: 2048,
            l2_cap: 4_718_592,
            // Measured L2 read bandwidth on Volta, rounded down.
            l2_bw: 2_200_000,
            constant_cap: 65536,
            shared_cap: 49152,
            val_size: 8,
            cpi: 1,
            max_lat_hide: 0.8,
            // Order of magnitude of a contended global atomic.
            sync_penalty: 100,
            global_bus_width: 3072,
        }
    }

    /// Returns the preset with the given name, if any.
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim() {
            "titan_v" | "titan-v" | "titanv" => Some(Self::titan_v()),
            _ => None,
        }
    }

    /// Ensures the profile describes a possible machine.
    pub fn validate(&self) -> Result<(), Error> {
        let positive: [(&'static str, u64); 16] = [
            ("global_mem_cap", self.global_mem_cap),
            ("global_mem_bw", self.global_mem_bw),
            ("num_cores", self.num_cores.into()),
            ("gpu_clock", self.gpu_clock.into()),
            ("warp_size", self.warp_size.into()),
            ("num_sms", self.num_sms.into()),
            ("max_threads_block", self.max_threads_block.into()),
            ("max_threads_sm", self.max_threads_sm.into()),
            ("l2_cap", self.l2_cap),
            ("l2_bw", self.l2_bw),
            ("constant_cap", self.constant_cap),
            ("shared_cap", self.shared_cap),
            ("val_size", self.val_size.into()),
            ("cpi", self.cpi.into()),
            ("sync_penalty", self.sync_penalty.into()),
            ("global_bus_width", self.global_bus_width.into()),
        ];
        if let Some(&(field, _)) = positive.iter().find(|&&(_, value)| value == 0) {
            return Err(Error::configuration(field, "must be strictly positive"));
        }
        if log2_u32(self.warp_size).is_none() {
            return Err(Error::configuration(
                "warp_size",
                format!("must be a power of two, got {}", self.warp_size),
            ));
        }
        if self.max_threads_block > self.max_threads_sm {
            return Err(Error::configuration(
                "max_threads_block",
                format!(
                    "({}) exceeds max_threads_sm ({})",
                    self.max_threads_block, self.max_threads_sm
                ),
            ));
        }
        if !(self.max_lat_hide >= 0.0 && self.max_lat_hide <= 1.0) {
            return Err(Error::configuration(
                "max_lat_hide",
                format!("must be within [0, 1], got {}", self.max_lat_hide),
            ));
        }
        Ok(())
    }

    /// Returns the clock in Hz.
    pub fn clock_hz(&self) -> f64 { f64::from(self.gpu_clock) * 1e6 }

    /// Returns the number of tiles that fit on the whole device at once.
    pub fn max_concurrent_blocks(&self, tiles_per_sm: u64) -> u64 {
        tiles_per_sm * u64::from(self.num_sms)
    }
}

impl Default for MachineProfile {
    fn default() -> Self { Self::titan_v() }
}
