use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use voxcrate_core::{BoundingVolume, ChargeCloud, Point3f, WeightedPoint};
use voxcrate_reconstruction::{FieldBuilder, FieldConfig, MarchingCubes, MarchingCubesConfig, Strategy};

const RESOLUTION: usize = 48;
const POINT_COUNTS: [usize; 4] = [100, 1_000, 10_000, 50_000];

fn random_cloud(count: usize) -> ChargeCloud {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| {
            WeightedPoint::new(
                Point3f::new(rng.gen_range(0.0..10.0), rng.gen_range(0.0..10.0), rng.gen_range(0.0..10.0)),
                rng.gen_range(0.5..1.5),
            )
        })
        .collect()
}

fn base_config() -> FieldConfig {
    FieldConfig::default()
        .with_volume(BoundingVolume::from_corners(Point3f::origin(), Point3f::new(10.0, 10.0, 10.0)))
        .with_resolution([RESOLUTION; 3])
        .with_range(0.75)
}

fn field_strategies(c: &mut Criterion) {
    let mut g = c.benchmark_group("field strategies");
    g.sample_size(10);

    for count in POINT_COUNTS {
        let cloud = random_cloud(count);
        for strategy in [Strategy::Forward, Strategy::Inverse] {
            let builder = FieldBuilder::new(base_config().with_strategy(strategy));
            g.bench_with_input(BenchmarkId::new(format!("{:?}", strategy), count), &(&builder, &cloud), |b, &(builder, cloud)| {
                b.iter(|| builder.build(std::hint::black_box(cloud)).unwrap());
            });
        }
    }

    g.finish();
}

fn isosurface_extraction(c: &mut Criterion) {
    let field = FieldBuilder::new(base_config())
        .build(&random_cloud(2_000))
        .unwrap()
        .field;
    let extractor = MarchingCubes::new(MarchingCubesConfig::default().with_iso_level(2.0));

    let mut g = c.benchmark_group("marching cubes");
    g.sample_size(10);
    g.bench_function("random charges", |b| {
        b.iter(|| extractor.extract_isosurface(std::hint::black_box(&field)).unwrap());
    });
    g.finish();
}

criterion_group!(benches, field_strategies, isosurface_extraction);
criterion_main!(benches);
