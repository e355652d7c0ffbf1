use super::*;

use glam::vec3;

use crate::config::{JobController, SupportConfig, SupportPoint};
use crate::mesh::make_cube;

// 20 x 20 x 1 plate centered over the origin, bottom face at z = 10.
fn plate_mesh() -> crate::mesh::TriangleMesh {
  let mut plate = make_cube(20., 20., 1.);
  plate.translate(vec3(-10., -10., 10.));
  plate
}

fn plate_sm(points: &[(f32, f32)]) -> SupportableMesh {
  let points = points
    .iter()
    .map(|&(x, y)| SupportPoint::new(vec3(x, y, 10.), 0.2))
    .collect();
  SupportableMesh::new(plate_mesh(), points, SupportConfig::default())
}

#[test]
fn test_spread_points_get_one_pillar_each() {
  let sm = plate_sm(&[(-8., -8.), (8., -8.), (8., 8.), (-8., 8.)]);
  let builder = SupportTreeBuilder::default();

  let unroutable = create_default_tree(&builder, &sm).unwrap();

  assert!(unroutable.is_empty());
  assert_eq!(builder.heads().len(), 4);
  assert_eq!(builder.pillars().len(), 4);
  assert_eq!(builder.pedestals().len(), 4);

  let gnd = ground_level(&sm);
  for pillar in builder.pillars() {
    assert!((pillar.endpt.z - gnd).abs() < 1e-6);
    // Pillar top joins its head's junction.
    assert!(pillar.starts_from_head);
    let head = builder.head(pillar.start_junction_id).unwrap();
    assert!((pillar.start_point() - head.junction_point()).length() < 1e-6);
  }
}

#[test]
fn test_close_points_share_a_central_pillar() {
  let sm = plate_sm(&[(0., 0.), (2., 0.), (0., 2.), (-2., 0.)]);
  let builder = SupportTreeBuilder::default();

  let unroutable = create_default_tree(&builder, &sm).unwrap();

  assert!(unroutable.is_empty());
  assert_eq!(builder.pillars().len(), 1);
  // The three satellites bridge onto the central pillar.
  assert_eq!(builder.bridges().len(), 3);
  assert_eq!(builder.pillar(0).unwrap().bridges, 3);

  for bridge in builder.bridges() {
    // Bridges descend at the configured slope.
    let d = bridge.endp - bridge.startp;
    let d_xy = (d.x * d.x + d.y * d.y).sqrt();
    assert!(d.z < 0.);
    assert!((d_xy / -d.z - sm.cfg.bridge_slope.tan()).abs() < 1e-6);
  }
}

#[test]
fn test_bridge_cap_forces_extra_pillars() {
  // Five close points: one central pillar takes three bridges, the
  // leftover head must route on its own.
  let sm = plate_sm(&[(0., 0.), (2., 0.), (0., 2.), (-2., 0.), (0., -2.)]);
  let builder = SupportTreeBuilder::default();

  let unroutable = create_default_tree(&builder, &sm).unwrap();

  assert!(unroutable.is_empty());
  assert_eq!(builder.bridges().len(), 3);
  assert_eq!(builder.pillars().len(), 2);

  // The two pillars stand close together and get cross-linked.
  assert!(!builder.crossbridges().is_empty());
  for cb in builder.crossbridges() {
    assert!(cb.startp.z > cb.endp.z);
  }
}

#[test]
fn test_heads_do_not_pierce_the_model() {
  let sm = plate_sm(&[(-8., -8.), (0., 0.), (5., -3.)]);
  let builder = SupportTreeBuilder::default();

  create_default_tree(&builder, &sm).unwrap();

  for head in builder.heads().iter().filter(|h| h.is_valid()) {
    let sd = sm.cfg.safety_distance(head.r_back_mm);
    let hit = crate::collision::pinhead_mesh_hit(
      &sm.query,
      head.pos,
      head.dir,
      head.r_pin_mm,
      head.r_back_mm,
      head.width_mm,
      sd,
    );
    assert!(hit.distance >= head.fullwidth());
  }
}

#[test]
fn test_pillars_do_not_pierce_the_model() {
  let sm = plate_sm(&[(-8., -8.), (8., 8.), (0., 0.)]);
  let builder = SupportTreeBuilder::default();

  create_default_tree(&builder, &sm).unwrap();

  let gnd = ground_level(&sm);
  for pillar in builder.pillars() {
    let beam = Beam::uniform(pillar.start_point(), DOWN, pillar.r_start);
    let hit = beam_mesh_hit(&sm.query, &beam, BEAM_SAMPLES, 0.);
    // Any hit along the pillar must be below ground level.
    assert!(pillar.start_point().z - hit.distance <= gnd + EPSILON);
  }
}

#[test]
fn test_unsupportable_point_is_reported_not_built() {
  // The middle point sits on the plate's top face and cannot take a
  // head.
  let mut points = vec![
    SupportPoint::new(vec3(-8., -8., 10.), 0.2),
    SupportPoint::new(vec3(0., 0., 11.), 0.2),
  ];
  points.push(SupportPoint::new(vec3(8., 8., 10.), 0.2));
  let sm = SupportableMesh::new(plate_mesh(), points, SupportConfig::default());
  let builder = SupportTreeBuilder::default();

  let unroutable = create_default_tree(&builder, &sm).unwrap();

  assert_eq!(unroutable, vec![1]);
  assert_eq!(builder.heads().len(), 2);
  assert_eq!(builder.pillars().len(), 2);
}

#[test]
fn test_overhang_above_model_routes_into_the_surface() {
  // A wide slab below the plate: heads over it cannot reach the ground
  // and anchor into the slab's top face instead.
  let mut mesh = plate_mesh();
  let mut slab = make_cube(20., 20., 2.);
  slab.translate(vec3(-10., -10., 4.));
  mesh.merge(&slab);

  let sm = SupportableMesh::new(
    mesh,
    vec![SupportPoint::new(vec3(0., 0., 10.), 0.2)],
    SupportConfig::default(),
  );
  let builder = SupportTreeBuilder::default();

  let unroutable = create_default_tree(&builder, &sm).unwrap();

  assert!(unroutable.is_empty());
  assert_eq!(builder.pillars().len(), 0);
  assert_eq!(builder.anchors().len(), 1);
  assert_eq!(builder.bridges().len(), 1);

  // The anchor fastens into the slab ceiling below the head.
  let anchor = builder.anchors()[0];
  assert!((anchor.0.pos.z - 6.).abs() < 0.1);
}

#[test]
fn test_empty_input_produces_an_empty_tree() {
  let sm = SupportableMesh::new(plate_mesh(), vec![], SupportConfig::default());
  let builder = SupportTreeBuilder::default();

  let unroutable = create_default_tree(&builder, &sm).unwrap();

  assert!(unroutable.is_empty());
  assert!(builder.merged_mesh(16).is_empty());
}

#[test]
fn test_cancellation_stops_the_pipeline() {
  let sm = plate_sm(&[(0., 0.)]);
  let ctl = JobController::new(|_, _, _| (), || true);
  let builder = SupportTreeBuilder::new(ctl);

  let result = create_default_tree(&builder, &sm);

  assert_eq!(result.unwrap_err(), Error::Cancelled);
  assert!(builder.heads().is_empty());
}

#[test]
fn test_progress_reports_every_stage() {
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  let phases = Arc::new(AtomicU32::new(0));
  let phases2 = Arc::clone(&phases);
  let ctl = JobController::new(
    move |_, _, _| {
      phases2.fetch_add(1, Ordering::Relaxed);
    },
    || false,
  );
  let builder = SupportTreeBuilder::new(ctl);
  let sm = plate_sm(&[(0., 0.)]);

  create_default_tree(&builder, &sm).unwrap();

  assert_eq!(phases.load(Ordering::Relaxed), 5);
}
