use super::*;

use std::collections::HashMap;
use std::f64::consts::PI;

fn is_closed(mesh: &TriangleMesh) -> bool {
  let mut edges: HashMap<(u32, u32), i32> = HashMap::new();
  for t in &mesh.indices {
    for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
      *edges.entry((a.min(b), a.max(b))).or_insert(0) += if a < b { 1 } else { -1 };
    }
  }
  edges.values().all(|&v| v == 0)
}

fn signed_volume(mesh: &TriangleMesh) -> f64 {
  let mut vol = 0f64;
  for f in 0..mesh.triangle_count() {
    let [a, b, c] = mesh.triangle(f);
    vol += a.as_dvec3().dot(b.as_dvec3().cross(c.as_dvec3())) / 6.;
  }
  vol
}

#[test]
fn test_full_sphere_is_closed_with_sphere_volume() {
  let s = sphere(2., make_portion(0., PI), 2. * PI / 60.);

  assert!(is_closed(&s));

  let expected = 4. / 3. * PI * 8.;
  let vol = signed_volume(&s);
  assert!(
    vol > 0.97 * expected && vol < expected,
    "volume {vol} vs {expected}"
  );
}

#[test]
fn test_sphere_vertices_lie_on_the_radius() {
  let s = sphere(1.5, make_portion(0., PI), 2. * PI / 24.);

  for v in &s.vertices {
    assert!((v.length() - 1.5).abs() < 1e-5);
  }
}

#[test]
fn test_zero_radius_sphere_is_empty() {
  assert!(sphere(0., make_portion(0., PI), 0.1).is_empty());
  assert!(sphere(1e-9, make_portion(0., PI), 0.1).is_empty());
}

#[test]
fn test_pinhead_is_closed_and_spans_the_full_height() {
  let (r_pin, r_back, len) = (0.2, 0.5, 1.5);
  let head = pinhead(r_pin, r_back, len, 45);

  assert!(!head.is_empty());
  assert!(is_closed(&head));

  let bb = head.bounding_box();
  // From the bottom of the back sphere to the tip of the pin sphere.
  let full = r_back + (r_back + r_pin + len) + r_pin;
  assert!(((bb.max.z - bb.min.z) as f64 - full).abs() < 1e-3);
  assert!((bb.min.z as f64 + r_back).abs() < 1e-3);
}

#[test]
fn test_degenerate_pinhead_is_empty() {
  assert!(pinhead(0., 0.5, 1., 45).is_empty());
  assert!(pinhead(0.2, 0., 1., 45).is_empty());
}

#[test]
fn test_halfcone_is_closed_with_frustum_volume() {
  let (h, r1, r2) = (4., 2., 1.);
  let cone = halfcone(h, r1, r2, DVec3::new(1., 2., 3.), 90);

  assert!(is_closed(&cone));

  let expected = PI * h / 3. * (r1 * r1 + r1 * r2 + r2 * r2);
  let vol = signed_volume(&cone);
  assert!(
    vol > 0.97 * expected && vol < 1.01 * expected,
    "volume {vol} vs {expected}"
  );
}

#[test]
fn test_halfcone_respects_position() {
  let cone = halfcone(2., 1., 1., DVec3::new(5., -3., 10.), 32);
  let bb = cone.bounding_box();

  assert!((bb.min.z - 10.).abs() < 1e-6);
  assert!((bb.max.z - 12.).abs() < 1e-6);
  assert!(((bb.min.x + bb.max.x) / 2. - 5.).abs() < 1e-4);
}

#[test]
fn test_zero_height_halfcone_is_empty() {
  assert!(halfcone(0., 1., 1., DVec3::ZERO, 32).is_empty());
}

#[test]
fn test_cylinder_matches_halfcone() {
  let c = cylinder(1., 3., 45);

  assert!(is_closed(&c));
  let bb = c.bounding_box();
  assert_eq!(bb.min.z, 0.);
  assert_eq!(bb.max.z, 3.);
}
