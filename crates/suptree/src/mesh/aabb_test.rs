use super::*;

use glam::dvec3;

use crate::mesh::{make_cube, make_cylinder};

fn unit_cube_query() -> MeshQuery {
  MeshQuery::new(make_cube(1., 1., 1.))
}

#[test]
fn test_ray_hits_a_cube_from_outside() {
  let q = unit_cube_query();

  let hit = q.ray_hit(dvec3(0.5, 0.5, -5.), dvec3(0., 0., 1.));

  assert!(hit.is_hit());
  assert!(!hit.is_inside);
  assert!((hit.distance - 5.).abs() < 1e-9);
}

#[test]
fn test_ray_from_inside_reports_the_exit() {
  let q = unit_cube_query();

  let hit = q.ray_hit(dvec3(0.5, 0.5, 0.25), dvec3(0., 0., 1.));

  assert!(hit.is_hit());
  assert!(hit.is_inside);
  assert!((hit.distance - 0.75).abs() < 1e-9);
}

#[test]
fn test_missing_ray_reports_no_hit() {
  let q = unit_cube_query();

  let hit = q.ray_hit(dvec3(3., 3., -5.), dvec3(0., 0., 1.));

  assert!(!hit.is_hit());
  assert_eq!(hit.distance, f64::INFINITY);
}

#[test]
fn test_diagonal_ray_through_many_leaves() {
  let q = MeshQuery::new(make_cylinder(3., 6., 128));

  let dir = dvec3(1., 0.2, 0.1).normalize();
  let hit = q.ray_hit(dvec3(-10., 0., 3.), dir);

  assert!(hit.is_hit());
  // Entry must be near the cylinder wall.
  let p = dvec3(-10., 0., 3.) + hit.distance * dir;
  let r = (p.x * p.x + p.y * p.y).sqrt();
  assert!((r - 3.).abs() < 0.05, "entry radius {r}");
}

#[test]
fn test_squared_distance_below_and_above() {
  let q = unit_cube_query();

  let d2 = q.squared_distance(dvec3(0.3, 0.5, -5.));
  assert!((d2 - 25.).abs() < 1e-9);

  let d2 = q.squared_distance(dvec3(0.3, 0.5, 5.));
  assert!((d2 - 16.).abs() < 1e-9);
}

#[test]
fn test_squared_distance_to_an_edge() {
  let q = unit_cube_query();

  // Diagonally off the top-right edge.
  let d2 = q.squared_distance(dvec3(2., 0.5, 2.));
  assert!((d2 - 2.).abs() < 1e-9);
}

#[test]
fn test_closest_face_returns_the_contact_point() {
  let q = unit_cube_query();

  let (d2, face, cp) = q.closest_face(dvec3(0.25, 0.25, 3.));

  assert!((d2 - 4.).abs() < 1e-9);
  assert_ne!(face, u32::MAX);
  assert!((cp - dvec3(0.25, 0.25, 1.)).length() < 1e-9);
}

#[test]
fn test_normals_point_outward() {
  let q = unit_cube_query();

  let top = q.normal_at(dvec3(0.5, 0.5, 1.2));
  assert!((top - dvec3(0., 0., 1.)).length() < 1e-9);

  let bottom = q.normal_at(dvec3(0.5, 0.5, -0.2));
  assert!((bottom - dvec3(0., 0., -1.)).length() < 1e-9);

  let side = q.normal_at(dvec3(1.4, 0.5, 0.5));
  assert!((side - dvec3(1., 0., 0.)).length() < 1e-9);
}

#[test]
fn test_empty_mesh_never_hits() {
  let q = MeshQuery::new(TriangleMesh::new());

  assert!(!q.ray_hit(dvec3(0., 0., 0.), dvec3(0., 0., -1.)).is_hit());
  assert_eq!(q.squared_distance(dvec3(1., 2., 3.)), f64::INFINITY);
}
