//! End-to-end estimations on the default machine.
use tilecost::model::{self, RoundSchedule};
use tilecost::{estimate, Accounting, Error, MachineProfile, Problem, Residency};
use tilecost_utils::unwrap;

/// Estimates the reference 1024x1024 layer with 32x32 tiles.
#[test]
fn reference_layer_in_registers() {
    let _ = env_logger::try_init();
    let profile = MachineProfile::titan_v();
    let estimate = unwrap!(estimate(
        &Problem::new(1024, 1024, 32, 32),
        Residency::Register,
        Accounting::Simple,
        &profile
    ));
    let schedule = &estimate.schedule;
    assert_eq!(schedule.tile_count, 1024);
    assert_eq!(schedule.threads_per_tile, 1024);
    assert_eq!(schedule.tile.elements_per_thread, 1);
    assert_eq!(schedule.tiles_per_sm, 2);
    assert_eq!(schedule.num_rounds, 7);
    // Six full rounds of two tiles per SM, then a last round of one tile per SM.
    assert_eq!(estimate.rounds[0].tile.total().unwrap(), 96);
    assert_eq!(estimate.cycles, 96 * 13);
    assert_eq!(estimate.time_us, 96 * 13 / 1455);
}

/// The refined accounting prices the reduction as a tree of warp shuffles.
#[test]
fn reference_layer_refined() {
    let _ = env_logger::try_init();
    let profile = MachineProfile::titan_v();
    let problem = Problem::default();
    let estimate = unwrap!(estimate(&problem, Residency::Register, Accounting::Refined, &profile));
    assert_eq!(estimate.cycles, 224 * 13);
    assert_eq!(estimate.time_us, 2);
}

/// Deeper residencies never make the layer faster.
#[test]
fn residencies_are_ordered() {
    let _ = env_logger::try_init();
    let profile = MachineProfile::titan_v();
    for problem in &[
        Problem::default(),
        Problem::new(4096, 4096, 64, 64),
        Problem::new(1000, 300, 16, 8),
        Problem::new(8192, 512, 128, 32),
    ] {
        let cycles = Residency::ALL
            .iter()
            .map(|&r| unwrap!(estimate(problem, r, Accounting::Simple, &profile)).cycles)
            .collect::<Vec<_>>();
        assert!(cycles.windows(2).all(|w| w[0] <= w[1]), "{:?}: {:?}", problem, cycles);
    }
}

/// Bigger layers take longer.
#[test]
fn cycles_grow_with_the_problem() {
    let _ = env_logger::try_init();
    let profile = MachineProfile::titan_v();
    for &residency in &Residency::ALL {
        let mut last = 0;
        for &dim in &[256u32, 512, 1024, 2048, 4096, 8192] {
            let problem = Problem::new(dim, dim, 32, 32);
            let cycles = unwrap!(estimate(&problem, residency, Accounting::Simple, &profile)).cycles;
            assert!(cycles >= last, "{} {}", residency, dim);
            last = cycles;
        }
    }
}

/// Dimensions that are not multiples of the tile are truncated.
#[test]
fn uneven_dimensions_are_truncated() {
    let _ = env_logger::try_init();
    let profile = MachineProfile::titan_v();
    let uneven = unwrap!(estimate(
        &Problem::new(1000, 1024, 32, 32),
        Residency::Scratchpad,
        Accounting::Simple,
        &profile
    ));
    let even = unwrap!(estimate(
        &Problem::new(992, 1024, 32, 32),
        Residency::Scratchpad,
        Accounting::Simple,
        &profile
    ));
    assert_eq!(uneven.schedule.tile_count, 31 * 32);
    assert_eq!(uneven.cycles, even.cycles);
}

/// Tiles larger than a block are split between fewer threads.
#[test]
fn large_tiles_are_subdivided() {
    let _ = env_logger::try_init();
    let profile = MachineProfile::titan_v();
    let schedule = unwrap!(RoundSchedule::plan(&Problem::new(4096, 4096, 128, 64), &profile));
    assert!(schedule.threads_per_tile <= u64::from(profile.max_threads_block));
    assert!(schedule.threads_per_tile * schedule.tile.elements_per_thread >= 128 * 64);
    assert_eq!(schedule.tile.elements_per_thread, 8);
}

/// A profile loaded from a file changes the estimate.
#[test]
fn alternate_profile() {
    let _ = env_logger::try_init();
    let profile = unwrap!(MachineProfile::from_toml("name = \"slow\"\ngpu_clock = 96\ncpi = 2\n"));
    let estimate = unwrap!(estimate(
        &Problem::default(),
        Residency::Register,
        Accounting::Simple,
        &profile
    ));
    assert_eq!(estimate.profile, "slow");
    assert_eq!(estimate.cycles, 2 * 96 * 13);
    assert_eq!(estimate.time_us, 26);
}

/// Invalid inputs are reported rather than causing a division by zero.
#[test]
fn invalid_inputs() {
    let _ = env_logger::try_init();
    let profile = MachineProfile::titan_v();
    match estimate(&Problem::new(1024, 1024, 0, 32), Residency::L2, Accounting::Simple, &profile) {
        Err(Error::InvalidDimension { name, .. }) => assert_eq!(name, "tile_width"),
        other => panic!("unexpected result {:?}", other),
    }
    let mut profile = MachineProfile::titan_v();
    profile.max_threads_sm = 512;
    match estimate(&Problem::default(), Residency::L2, Accounting::Simple, &profile) {
        Err(Error::Configuration { field, .. }) => assert_eq!(field, "max_threads_block"),
        other => panic!("unexpected result {:?}", other),
    }
}

/// Huge problems on a slow machine overflow instead of wrapping around.
#[test]
fn overflow_is_detected() {
    let _ = env_logger::try_init();
    let mut profile = MachineProfile::titan_v();
    profile.cpi = u32::max_value();
    profile.num_sms = 1;
    profile.warp_size = 1;
    let problem = Problem::new(u32::max_value(), u32::max_value(), 1, 1);
    match estimate(&problem, Residency::Register, Accounting::Simple, &profile) {
        Err(Error::Overflow { .. }) => (),
        other => panic!("unexpected result {:?}", other),
    }
}

/// The estimate serializes to JSON for other tools.
#[test]
fn estimate_to_json() {
    let _ = env_logger::try_init();
    let profile = MachineProfile::titan_v();
    let estimate = unwrap!(estimate(&Problem::default(), Residency::Bus, Accounting::Simple, &profile));
    let json = unwrap!(serde_json::to_value(&estimate));
    assert_eq!(json["residency"], "bus");
    assert_eq!(json["schedule"]["num_rounds"], 7);
    assert_eq!(json["cycles"], estimate.cycles);
    assert_eq!(model::cycles_to_time(estimate.cycles, &profile).unwrap(), estimate.time_us);
}
