//! Integration tests for voxcrate-reconstruction
//!
//! These tests run the whole path from weighted points through field
//! synthesis to an extracted, world-placed mesh.

use approx::assert_relative_eq;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use voxcrate_core::{BoundingVolume, ChargeCloud, Interval, Plane, Point3f, WeightedPoint};
use voxcrate_reconstruction::*;

/// Two unit charges far enough apart that their ranges never overlap
fn separated_charges() -> ChargeCloud {
    ChargeCloud::from_points(vec![
        WeightedPoint::unit(Point3::new(-2.0, 0.0, 0.0)),
        WeightedPoint::unit(Point3::new(2.0, 0.0, 0.0)),
    ])
}

fn nearest_distance(point: &Point3f, centers: &[Point3f]) -> f32 {
    centers
        .iter()
        .map(|c| (point - c).norm())
        .fold(f32::INFINITY, f32::min)
}

#[test]
fn test_points_to_mesh_pipeline() {
    let config = FieldConfig::default()
        .with_volume(BoundingVolume::from_corners(
            Point3::new(-4.0, -4.0, -4.0),
            Point3::new(4.0, 4.0, 4.0),
        ))
        .with_resolution([41, 41, 41])
        .with_range(1.5);
    let sampled = FieldBuilder::new(config).build(&separated_charges()).unwrap();
    assert!(sampled.warnings.is_empty());

    // 1/d = 1.5 puts the surface at d = 2/3 around each charge.
    let mesh = sampled.isosurface(MarchingCubesConfig::default().with_iso_level(1.5)).unwrap();
    assert!(mesh.face_count() > 100);
    assert!(mesh.is_closed());

    let centers = [Point3::new(-2.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)];
    for vertex in &mesh.vertices {
        let d = nearest_distance(vertex, &centers);
        assert!((d - 2.0 / 3.0).abs() < 0.05, "vertex {:?} at {}", vertex, d);
    }
}

#[test]
fn test_strategies_produce_matching_fields() {
    let mut config = FieldConfig::default()
        .with_volume(BoundingVolume::from_corners(
            Point3::new(-4.0, -2.0, -2.0),
            Point3::new(4.0, 2.0, 2.0),
        ))
        .with_resolution([17, 9, 9])
        .with_range(1.3);

    config.strategy = Strategy::Forward;
    let forward = FieldBuilder::new(config.clone()).build(&separated_charges()).unwrap();
    config.strategy = Strategy::Inverse;
    let inverse = FieldBuilder::new(config).build(&separated_charges()).unwrap();

    assert_eq!(forward.strategy, Strategy::Forward);
    assert_eq!(inverse.strategy, Strategy::Inverse);
    for (a, b) in forward.field.values().iter().zip(inverse.field.values()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-4, max_relative = 1e-4);
    }
}

#[test]
fn test_single_raised_voxel() {
    let field = ScalarField::from_fn([3, 3, 3], |x, y, z| {
        if (x, y, z) == (1, 1, 1) {
            1.0
        } else {
            0.0
        }
    })
    .unwrap();

    let mesh = marching_cubes(&field, 0.5).unwrap();
    assert_eq!(mesh.vertex_count(), 6);
    assert_eq!(mesh.face_count(), 8);
    assert!(mesh.is_closed());

    // One vertex halfway along each of the six edges leaving the raised sample.
    let center = Point3::new(1.0f32, 1.0, 1.0);
    for vertex in &mesh.vertices {
        let offset = vertex - center;
        assert_relative_eq!(offset.norm(), 0.5, epsilon = 1e-6);
        assert_eq!(offset.iter().filter(|c| c.abs() > 1e-6).count(), 1);
    }
    for (face, normal) in mesh.faces.iter().zip(mesh.calculate_face_normals()) {
        let centroid = (mesh.vertices[face[0]].coords
            + mesh.vertices[face[1]].coords
            + mesh.vertices[face[2]].coords)
            / 3.0;
        assert!(normal.dot(&(centroid - center.coords)) > 0.0);
    }
}

#[test]
fn test_rotated_volume_with_cell_size() {
    let rotation = UnitQuaternion::from_euler_angles(0.0, 0.0, std::f32::consts::FRAC_PI_4);
    let plane = Plane::new(
        Point3::new(5.0, 5.0, 0.0),
        rotation * Vector3::x(),
        rotation * Vector3::y(),
    )
    .unwrap();
    let volume = BoundingVolume::new(
        plane,
        Interval::new(-2.0, 2.0),
        Interval::new(-2.0, 2.0),
        Interval::new(-2.0, 2.0),
    );

    let charge = Point3::new(5.0, 5.0, 0.0);
    let config = FieldConfig::default()
        .with_volume(volume)
        .with_cell_size(0.25)
        .with_range(1.5)
        .with_falloff(Falloff::Linear);
    let cloud = ChargeCloud::from_points(vec![WeightedPoint::new(charge, 2.0)]);
    let sampled = FieldBuilder::new(config).build(&cloud).unwrap();
    assert_eq!(sampled.field.dimensions(), [17, 17, 17]);

    // 2/d = 2 puts the surface on the unit sphere around the charge.
    let mesh = sampled.isosurface(MarchingCubesConfig::default().with_iso_level(2.0)).unwrap();
    assert!(mesh.is_closed());
    for vertex in &mesh.vertices {
        assert!(((vertex - charge).norm() - 1.0).abs() < 0.05);
    }
}

#[test]
fn test_weight_broadcast_scales_field() {
    let positions = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)];
    let config = FieldConfig::default().with_resolution([6, 6, 4]).with_range(1.0);

    let unit = sample_field(&positions, &[], config.clone()).unwrap();
    let doubled = sample_field(&positions, &[2.0], config).unwrap();
    assert_eq!(unit.field.dimensions(), doubled.field.dimensions());
    for (a, b) in unit.field.values().iter().zip(doubled.field.values()) {
        assert_relative_eq!(*a * 2.0, *b, epsilon = 1e-5, max_relative = 1e-5);
    }
}

#[test]
fn test_extraction_memory_stays_bounded() {
    let cloud: ChargeCloud = (0..20)
        .map(|i| WeightedPoint::unit(Point3::new(0.0, 0.0, i as f32 * 0.5)))
        .collect();
    let config = FieldConfig::default()
        .with_resolution([12, 12, 60])
        .with_range(1.0)
        .with_accumulation(Accumulation::Max);
    let sampled = FieldBuilder::new(config).build(&cloud).unwrap();
    let [nx, ny, _] = sampled.field.dimensions();

    let (mesh, stats) = MarchingCubes::new(MarchingCubesConfig::default().with_iso_level(2.0))
        .extract_with_stats(&sampled.field)
        .unwrap();
    assert!(!mesh.is_empty());
    assert_eq!(stats.vertices, mesh.vertex_count());
    assert_eq!(stats.faces, mesh.face_count());
    assert!(stats.peak_cache_entries <= 9 * nx * ny);
}

#[test]
fn test_closed_field_caps_open_surfaces() {
    // A slab that runs through the whole grid is open where it meets the boundary.
    let field = ScalarField::from_fn([8, 8, 8], |_, _, z| if (2..6).contains(&z) { 1.0 } else { 0.0 }).unwrap();
    let open = marching_cubes(&field, 0.5).unwrap();
    assert!(!open.is_closed());

    let capped = marching_cubes(&field.closed(0.0), 0.5).unwrap();
    assert!(capped.is_closed());
}
