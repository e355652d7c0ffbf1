use super::*;

use glam::dvec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SupportConfig;
use crate::mesh::{make_cube, TriangleMesh};

use std::collections::HashMap;

#[test]
fn test_pairhash_is_symmetric_and_unique() {
  let mut rng = StdRng::seed_from_u64(1);
  let mut seen: HashMap<u64, (u32, u32)> = HashMap::new();

  for _ in 0..1000 {
    let a: u32 = rng.random_range(0..u32::MAX);
    let b: u32 = rng.random_range(0..u32::MAX);
    if a == b {
      continue;
    }

    let hash_ab = pairhash(a, b);
    let hash_ba = pairhash(b, a);
    assert_eq!(hash_ab, hash_ba);

    match seen.get(&hash_ab) {
      Some(&(x, y)) => assert!((x, y) == (a, b) || (x, y) == (b, a)),
      None => {
        seen.insert(hash_ab, (a, b));
      }
    }
  }
}

#[test]
fn test_pairhash_distinguishes_neighbours() {
  assert_ne!(pairhash(1, 2), pairhash(1, 3));
  assert_ne!(pairhash(0, 1), pairhash(1, 1));
  assert_ne!(pairhash(7, 9), pairhash(8, 8));
}

fn empty_sm(cfg: SupportConfig) -> SupportableMesh {
  SupportableMesh::new(TriangleMesh::new(), vec![], cfg)
}

#[test]
fn test_ground_pillar_with_free_space() {
  let sm = empty_sm(SupportConfig::default());
  let builder = SupportTreeBuilder::default();

  let pid = create_ground_pillar(
    &builder,
    &sm,
    dvec3(0., 0., 10.),
    DOWN,
    0.5,
    0.5,
    ID_UNSET,
  )
  .expect("free space must yield a pillar");

  let pillar = builder.pillar(pid).unwrap();
  assert!((pillar.endpt.z - ground_level(&sm)).abs() < 1e-9);
  assert!((pillar.height - (10. - ground_level(&sm))).abs() < 1e-9);
  // Full-radius pillars take a pedestal.
  assert_eq!(builder.pedestals().len(), 1);
}

#[test]
fn test_long_mini_pillar_gets_a_widening_bridge() {
  let sm = empty_sm(SupportConfig::default());
  let builder = SupportTreeBuilder::default();

  let radius = 0.2;
  let pid = create_ground_pillar(
    &builder,
    &sm,
    dvec3(0., 0., 20.),
    DOWN,
    radius,
    radius,
    ID_UNSET,
  )
  .expect("widening must rescue the thin pillar");

  // A diff bridge widens the branch before the pillar starts.
  let diffbridges = builder.diffbridges();
  assert_eq!(diffbridges.len(), 1);
  assert!((diffbridges[0].r - radius).abs() < 1e-9);
  assert!((diffbridges[0].end_r - sm.cfg.head_back_radius_mm).abs() < 1e-9);

  let pillar = builder.pillar(pid).unwrap();
  assert!((pillar.r_start - sm.cfg.head_back_radius_mm).abs() < 1e-9);
}

#[test]
fn test_failed_pad_gap_walk_commits_nothing() {
  // Zero elevation with a pedestal clearance larger than the pad wall:
  // the thin pillar gets its widening bridge, but every foot position
  // the walk can reach stays inside the pad gap, so the route fails
  // after the bridge was already found. The store must stay untouched.
  let mut cfg = SupportConfig::default();
  cfg.object_elevation_mm = 0.;
  cfg.pillar_base_safety_distance_mm = 3.;
  let mut plate = make_cube(60., 60., 1.);
  plate.translate(glam::vec3(-30., -30., 0.));
  let sm = SupportableMesh::new(plate, vec![], cfg);
  let builder = SupportTreeBuilder::default();

  let dir = spheric_to_dir(PI - sm.cfg.bridge_slope, 0.);
  let result = create_ground_pillar(
    &builder,
    &sm,
    dvec3(0., 0., 20.),
    dir,
    0.2,
    0.2,
    ID_UNSET,
  );

  assert!(result.is_err());
  // The staged widening bridge must not leak into the output geometry.
  assert!(builder.diffbridges().is_empty());
  assert!(builder.junctions().is_empty());
  assert!(builder.bridges().is_empty());
  assert!(builder.pillars().is_empty());
  assert!(builder.pedestals().is_empty());
}

#[test]
fn test_zero_elevation_widened_pillar_commits_the_whole_route() {
  // Same thin pillar, but with room to walk out of the pad gap: the
  // widening bridge, the corrector bridge and the pillar all land in
  // the store together.
  let mut cfg = SupportConfig::default();
  cfg.object_elevation_mm = 0.;
  let mut shelf = make_cube(8., 8., 1.);
  shelf.translate(glam::vec3(-4., -4., 0.));
  let sm = SupportableMesh::new(shelf, vec![], cfg);
  let builder = SupportTreeBuilder::default();

  let dir = spheric_to_dir(PI - sm.cfg.bridge_slope, 0.);
  let pid = create_ground_pillar(
    &builder,
    &sm,
    dvec3(0., 0., 20.),
    dir,
    0.2,
    0.2,
    ID_UNSET,
  )
  .expect("walking out of the small shelf's gap must succeed");

  assert_eq!(builder.diffbridges().len(), 1);
  let pillar = builder.pillar(pid).unwrap();
  // The foot cleared the shelf footprint and its pad gap.
  let gap = sm.query.squared_distance(pillar.endpt).sqrt();
  assert!(gap >= sm.cfg.pillar_base_safety_distance_mm);
}

#[test]
fn test_connect_to_ground_walks_past_an_obstacle() {
  // A shelf below the junction; the straight drop is blocked, walking
  // sideways along the bridge direction clears it.
  let mut shelf = make_cube(8., 8., 1.);
  shelf.translate(glam::vec3(-4., -4., 4.));
  let sm = SupportableMesh::new(shelf, vec![], SupportConfig::default());
  let builder = SupportTreeBuilder::default();

  let j = Junction::new(dvec3(0., 0., 10.), 0.5);
  let dir = spheric_to_dir(PI - sm.cfg.bridge_slope, 0.);

  let pid = connect_to_ground(&builder, &sm, &j, dir, 0.5).expect("route must exist");

  let pillar = builder.pillar(pid).unwrap();
  // The pillar foot moved off the shelf footprint.
  assert!(pillar.endpt.x > 4.);
  // A bridge connects the junction to the walked-out point.
  assert_eq!(builder.bridges().len(), 1);
}

#[test]
fn test_connect_to_ground_fails_when_boxed_in() {
  // A large slab below; the junction cannot clear it within the allowed
  // bridge length.
  let mut cfg = SupportConfig::default();
  cfg.max_bridge_length_mm = 3.;
  let mut slab = make_cube(60., 60., 2.);
  slab.translate(glam::vec3(-30., -30., 2.));
  let sm = SupportableMesh::new(slab, vec![], cfg);
  let builder = SupportTreeBuilder::default();

  let j = Junction::new(dvec3(0., 0., 10.), 0.5);

  assert!(connect_to_ground(&builder, &sm, &j, DOWN, 0.5).is_err());
  assert_eq!(builder.pillars().len(), 0);
}

#[test]
fn test_search_ground_route_escapes_a_cavity() {
  // A slab right below the junction and walls towards +X and +Y; only a
  // slanted bridge towards the open quadrant reaches the ground.
  let mut scene = TriangleMesh::new();
  let mut slab = make_cube(4., 4., 1.);
  slab.translate(glam::vec3(-2., -2., 4.));
  let mut wall_a = make_cube(1., 20., 14.);
  wall_a.translate(glam::vec3(2., -10., 0.));
  let mut wall_b = make_cube(20., 1., 14.);
  wall_b.translate(glam::vec3(-10., 2., 0.));
  scene.merge(&slab);
  scene.merge(&wall_a);
  scene.merge(&wall_b);

  let sm = SupportableMesh::new(scene, vec![], SupportConfig::default());
  let builder = SupportTreeBuilder::default();

  let j = Junction::new(dvec3(0., 0., 12.), 0.5);

  let pid = search_ground_route(&builder, &sm, &j, 0.5, DOWN)
    .expect("the open quadrant must be found");

  let pillar = builder.pillar(pid).unwrap();
  assert!(pillar.endpt.x < 0. || pillar.endpt.y < 0.);
}
