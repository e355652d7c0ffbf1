use super::*;

use glam::dvec3;

use crate::geometry::DOWN;

fn sample_head(pos: DVec3) -> Head {
  Head::new(0.5, 0.2, 1., 0.3, DOWN, pos)
}

#[test]
fn test_add_head_assigns_the_support_point_id() {
  let builder = SupportTreeBuilder::default();

  let head = builder.add_head(7, sample_head(dvec3(1., 2., 10.)));

  assert_eq!(head.id, 7);
  assert_eq!(builder.head(7).unwrap().id, 7);
  assert!(builder.head(3).is_none());
}

#[test]
fn test_pillar_for_head_links_both_ways() {
  let builder = SupportTreeBuilder::default();
  builder.add_head(0, sample_head(dvec3(0., 0., 10.)));

  let pillar_id = builder.add_pillar_for_head(0, 8.);

  let head = builder.head(0).unwrap();
  let pillar = builder.pillar(pillar_id).unwrap();

  assert_eq!(head.pillar_id, pillar_id);
  assert!(pillar.starts_from_head);
  assert_eq!(pillar.start_junction_id, head.id);

  // Pillar top must coincide with the head junction.
  let jp = head.junction_point();
  assert!((pillar.start_point() - jp).length() < 1e-12);
  assert!((pillar.height - 8.).abs() < 1e-12);
}

#[test]
fn test_element_ids_are_sequential_per_kind() {
  let builder = SupportTreeBuilder::default();

  let j0 = builder.add_junction(dvec3(0., 0., 1.), 0.5);
  let j1 = builder.add_junction(dvec3(0., 0., 2.), 0.5);
  let b0 = builder.add_bridge(dvec3(0., 0., 1.), dvec3(1., 0., 0.5), 0.4);
  let d0 = builder.add_diffbridge(dvec3(0., 0., 2.), dvec3(1., 0., 1.), 0.4, 0.6);

  assert_eq!((j0.id, j1.id), (0, 1));
  assert_eq!(b0.id, 0);
  assert_eq!(d0.id, 0);
}

#[test]
fn test_pillar_base_sits_at_the_pillar_foot() {
  let builder = SupportTreeBuilder::default();
  let pid = builder.add_pillar(dvec3(3., 4., 0.), 12., 0.5, 0.7);

  builder.add_pillar_base(pid, 1., 2.5);

  let pedestals = builder.pedestals();
  assert_eq!(pedestals.len(), 1);
  assert_eq!(pedestals[0].pos, dvec3(3., 4., 0.));
  assert_eq!(pedestals[0].r_bottom, 2.5);
  assert_eq!(pedestals[0].r_top, 0.7);
}

#[test]
fn test_bridge_from_head_records_the_link() {
  let builder = SupportTreeBuilder::default();
  builder.add_head(0, sample_head(dvec3(0., 0., 10.)));

  let bridge = builder.add_bridge_from_head(0, dvec3(3., 0., 8.));

  assert_eq!(builder.head(0).unwrap().bridge_id, bridge.id);
  assert!((bridge.startp - builder.head(0).unwrap().junction_point()).length() < 1e-12);
}

#[test]
fn test_bridge_counters() {
  let builder = SupportTreeBuilder::default();
  let pid = builder.add_pillar(dvec3(0., 0., 0.), 5., 0.5, 0.5);

  builder.increment_bridges(pid);
  builder.increment_bridges(pid);
  builder.increment_links(pid);

  let pillar = builder.pillar(pid).unwrap();
  assert_eq!(pillar.bridges, 2);
  assert_eq!(pillar.links, 1);
  assert_eq!(builder.bridge_count_on(pid), 2);
}

#[test]
fn test_merged_mesh_is_cached_until_mutation() {
  let builder = SupportTreeBuilder::default();
  builder.add_junction(dvec3(0., 0., 5.), 0.5);

  let a = builder.merged_mesh(DEFAULT_MESH_STEPS);
  let b = builder.merged_mesh(DEFAULT_MESH_STEPS);
  assert!(Arc::ptr_eq(&a, &b));

  builder.add_junction(dvec3(2., 0., 5.), 0.5);
  let c = builder.merged_mesh(DEFAULT_MESH_STEPS);
  assert!(!Arc::ptr_eq(&a, &c));
  assert!(c.vertices.len() > a.vertices.len());
}

#[test]
fn test_invalidated_heads_produce_no_geometry() {
  let builder = SupportTreeBuilder::default();
  builder.add_head(0, sample_head(dvec3(0., 0., 10.)));
  builder.add_head(1, sample_head(dvec3(5., 0., 10.)));

  let full = builder.merged_mesh(16).vertices.len();

  builder.with_head_mut(1, |h| h.invalidate());
  let reduced = builder.merged_mesh(16).vertices.len();

  assert_eq!(reduced * 2, full);
}

#[test]
fn test_merged_mesh_spans_the_whole_tree() {
  let builder = SupportTreeBuilder::default();
  builder.add_head(0, sample_head(dvec3(0., 0., 10.)));
  let pid = builder.add_pillar_for_head(0, 8.);
  builder.add_pillar_base(pid, 1., 2.);

  let bb = builder.merged_mesh(DEFAULT_MESH_STEPS).bounding_box();

  // Head junction is around z = 10, the pillar reaches 8 below it, the
  // pedestal adds nothing below the pillar foot.
  assert!(bb.max.z as f64 >= 10.);
  assert!((bb.min.z as f64 - (builder.head(0).unwrap().junction_point().z - 8.)).abs() < 0.5);
}
