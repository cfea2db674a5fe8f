//! Estimates the execution time of a tiled fully-connected layer.
use log::error;
use structopt::StructOpt;

use tilecost::{estimate, Accounting, Problem, Residency};
use tilecost_cli::{breakdown, summary, ProfileOpt};

#[derive(StructOpt)]
#[structopt(name = "tilecost")]
struct Opt {
    /// Dimension of the input vector.
    #[structopt(short = "i", long = "input-dim", default_value = "1024")]
    input_dim: u32,

    /// Dimension of the output vector.
    #[structopt(short = "n", long = "output-dim", default_value = "1024")]
    output_dim: u32,

    /// Width of a tile, along the input dimension.
    #[structopt(short = "w", long = "tile-width", default_value = "32")]
    tile_width: u32,

    /// Height of a tile, along the output dimension.
    #[structopt(short = "t", long = "tile-height", default_value = "32")]
    tile_height: u32,

    /// Where the data initially resides: register, scratchpad, l2, memory or bus (or
    /// 0 to 4).
    #[structopt(short = "r", long = "residency", default_value = "register")]
    residency: Residency,

    /// How the operations on each row are counted: simple or refined.
    #[structopt(long = "accounting", default_value = "simple")]
    accounting: Accounting,

    #[structopt(flatten)]
    profile: ProfileOpt,

    /// Print the estimate as JSON.
    #[structopt(long = "json")]
    json: bool,

    /// Print the cost of each round.
    #[structopt(long = "breakdown")]
    breakdown: bool,

    /// Print the machine profile in use.
    #[structopt(long = "show-profile")]
    show_profile: bool,
}

impl Opt {
    fn problem(&self) -> Problem {
        Problem::new(self.input_dim, self.output_dim, self.tile_width, self.tile_height)
    }

    fn run(&self) -> Result<(), failure::Error> {
        let profile = self.profile.profile()?;
        if self.show_profile {
            println!("{}", profile);
        }
        let estimate = estimate(&self.problem(), self.residency, self.accounting, &profile)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&estimate)?);
            return Ok(());
        }
        summary(&estimate).printstd();
        if self.breakdown {
            breakdown(&estimate).printstd();
        }
        Ok(())
    }
}

fn main() {
    let args = Opt::from_args();
    env_logger::init();

    if let Err(err) = args.run() {
        error!("{}", err);
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
