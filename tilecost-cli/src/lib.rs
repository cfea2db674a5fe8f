//! Helpers for the command line front-end of the cost model.
use std::path::PathBuf;

use failure::format_err;
use log::info;
use prettytable::Table;
use structopt::StructOpt;

use tilecost::{Estimate, MachineProfile};

#[derive(StructOpt)]
pub struct ProfileOpt {
    /// Path to the machine profile to use.
    ///
    /// The profile must be in TOML or JSON format. Missing fields take the values of the
    /// preset.
    #[structopt(parse(from_os_str), long = "profile")]
    profile_path: Option<PathBuf>,

    /// Name of the built-in machine profile to use.
    #[structopt(long = "preset", default_value = "titan_v")]
    preset: String,
}

impl ProfileOpt {
    pub fn profile(&self) -> Result<MachineProfile, failure::Error> {
        if let Some(path) = &self.profile_path {
            info!("loading machine profile from {}", path.display());
            Ok(MachineProfile::from_path(path)?)
        } else {
            MachineProfile::preset(&self.preset)
                .ok_or_else(|| format_err!("unknown machine preset `{}`", self.preset))
        }
    }
}

fn add_row<T: ToString>(table: &mut Table, name: &str, value: T) {
    table.add_row(vec![name.to_string(), value.to_string()].into_iter().collect());
}

/// Summarizes an estimate.
pub fn summary(estimate: &Estimate) -> Table {
    let schedule = &estimate.schedule;
    let mut table = Table::new();
    add_row(&mut table, "Tile count", schedule.tile_count);
    add_row(&mut table, "Threads per tile", schedule.threads_per_tile);
    add_row(&mut table, "Elements per thread", schedule.tile.elements_per_thread);
    add_row(&mut table, "Tiles per SM", schedule.tiles_per_sm);
    add_row(&mut table, "Number of rounds", schedule.num_rounds);
    add_row(&mut table, "Cycles", estimate.cycles);
    add_row(&mut table, "Time (us)", estimate.time_us);
    table
}

/// Details the cost of each group of rounds.
pub fn breakdown(estimate: &Estimate) -> Table {
    let mut table = Table::new();
    let header = ["rounds", "tiles", "tiles/SM", "cycles/tile", "cycles/round", "tile cost"];
    table.add_row(header.iter().collect());
    for round in &estimate.rounds {
        let tile_total = round.tile.total().map(|x| x.to_string()).unwrap_or_default();
        table.add_row(
            vec![
                format!("{}..{}", round.first, round.first + round.repeat),
                round.tiles.to_string(),
                round.tiles_per_sm.to_string(),
                tile_total,
                round.cycles.to_string(),
                round.tile.to_string(),
            ]
            .into_iter()
            .collect(),
        );
    }
    table
}
