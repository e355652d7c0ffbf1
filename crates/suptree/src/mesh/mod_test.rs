use super::*;

fn signed_volume(mesh: &TriangleMesh) -> f64 {
  let mut vol = 0f64;
  for f in 0..mesh.triangle_count() {
    let [a, b, c] = mesh.triangle(f);
    vol += a.as_dvec3().dot(b.as_dvec3().cross(c.as_dvec3())) / 6.;
  }
  vol
}

// A closed, consistently wound mesh has every edge shared by exactly two
// triangles in opposite directions.
fn is_closed(mesh: &TriangleMesh) -> bool {
  use std::collections::HashMap;
  let mut edges: HashMap<(u32, u32), i32> = HashMap::new();
  for t in &mesh.indices {
    for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
      *edges.entry((a.min(b), a.max(b))).or_insert(0) += if a < b { 1 } else { -1 };
    }
  }
  edges.values().all(|&v| v == 0)
}

#[test]
fn test_cube_is_closed_with_correct_volume() {
  let cube = make_cube(2., 3., 4.);

  assert_eq!(cube.triangle_count(), 12);
  assert!(is_closed(&cube));
  assert!((signed_volume(&cube) - 24.).abs() < 1e-6);
}

#[test]
fn test_cylinder_is_closed_with_correct_volume() {
  let cyl = make_cylinder(2., 5., 64);

  assert!(is_closed(&cyl));
  let expected = std::f64::consts::PI * 4. * 5.;
  let vol = signed_volume(&cyl);
  // The polygonal cross section is slightly smaller than the circle.
  assert!(vol > 0.98 * expected && vol < expected, "volume {vol}");
}

#[test]
fn test_pyramid_and_prism_are_closed() {
  assert!(is_closed(&make_pyramid(10., 10.)));
  assert!(is_closed(&make_prism(10., 10., 5.)));
  assert!(signed_volume(&make_pyramid(3., 3.)) > 0.);
  assert!(signed_volume(&make_prism(3., 4., 5.)) > 0.);
}

#[test]
fn test_merge_offsets_indices() {
  let mut a = make_cube(1., 1., 1.);
  let mut b = make_cube(1., 1., 1.);
  b.translate(vec3(5., 0., 0.));

  let verts_a = a.vertices.len() as u32;
  a.merge(&b);

  assert_eq!(a.triangle_count(), 24);
  assert!(a.indices[12..].iter().all(|t| t.iter().all(|&i| i >= verts_a)));
  assert!(is_closed(&a));
}

#[test]
fn test_bounding_box() {
  let mut cube = make_cube(2., 2., 2.);
  cube.translate(vec3(-1., -1., 3.));

  let bb = cube.bounding_box();

  assert!(bb.is_valid());
  assert_eq!(bb.min, vec3(-1., -1., 3.));
  assert_eq!(bb.max, vec3(1., 1., 5.));
  assert_eq!(bb.center(), vec3(0., 0., 4.));
}

#[test]
fn test_empty_mesh_bounding_box_is_invalid() {
  assert!(!TriangleMesh::new().bounding_box().is_valid());
}
