//! Forward vs inverse field synthesis
//!
//! Times both strategies over a range of point densities on the same grid
//! and reports where `Strategy::Auto` would land.

use anyhow::Result;
use env_logger::Env;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use voxcrate_algorithms::IndexKind;
use voxcrate_core::{BoundingVolume, ChargeCloud, Point3f, WeightedPoint};
use voxcrate_reconstruction::{FieldBuilder, FieldConfig, Strategy};

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    println!("Field Strategy Comparison");
    println!("=========================");

    let dims = [40, 40, 40];
    let samples: usize = dims.iter().product();
    let base = FieldConfig::default()
        .with_volume(BoundingVolume::from_corners(Point3f::origin(), Point3f::new(8.0, 8.0, 8.0)))
        .with_resolution(dims)
        .with_range(0.6)
        .with_index(IndexKind::RTree);

    let mut rng = StdRng::seed_from_u64(7);
    for count in [50, 500, 5_000, 30_000, 60_000] {
        let cloud: ChargeCloud = (0..count)
            .map(|_| {
                WeightedPoint::unit(Point3f::new(
                    rng.gen_range(0.0..8.0),
                    rng.gen_range(0.0..8.0),
                    rng.gen_range(0.0..8.0),
                ))
            })
            .collect();

        println!("\n{} points ({} samples), auto picks {:?}", count, samples, Strategy::Auto.resolve(count, samples));
        for strategy in [Strategy::Forward, Strategy::Inverse] {
            let start = Instant::now();
            let sampled = FieldBuilder::new(base.clone().with_strategy(strategy)).build(&cloud)?;
            let (_, max) = sampled.field.min_max();
            println!("- {:?}: {:?} (max value {:.2})", strategy, start.elapsed(), max);
        }
    }

    Ok(())
}
