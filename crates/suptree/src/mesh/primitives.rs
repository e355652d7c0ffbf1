//! Meshing primitives for the support-tree elements.
//!
//! All primitives produce oriented, manifold triangle sets; degenerate
//! requests (zero radius or height) yield empty meshes.

use glam::{vec3, DVec3};

use super::TriangleMesh;

use std::f64::consts::PI;

/// Latitude band of a sphere, measured from the bottom pole (0) to the top
/// pole (π).
pub type Portion = (f64, f64);

pub fn make_portion(a: f64, b: f64) -> Portion {
  (a, b)
}

/// Sphere of radius `rho` centered at the origin, tessellated as stacked
/// rings with pole caps. `portion` selects a latitude band; bands not
/// touching a pole are left open. `fa` is the facet angle.
pub fn sphere(rho: f64, portion: Portion, fa: f64) -> TriangleMesh {
  let mut mesh = TriangleMesh::new();
  if rho <= 1e-6 {
    return mesh;
  }

  let (lat_a, lat_b) = portion;
  debug_assert!(lat_a < lat_b);

  let steps = ((2. * PI / fa).floor() as usize).max(3);
  let lat_steps = (((lat_b - lat_a) / fa).ceil() as usize).max(1);

  let bottom_pole = lat_a < 1e-9;
  let top_pole = lat_b > PI - 1e-9;

  let ring_vertex = |theta: f64, i: usize| {
    let phi = 2. * PI * i as f64 / steps as f64;
    let r = rho * theta.sin();
    let z = -rho * theta.cos();
    vec3(
      (r * phi.cos()) as f32,
      (r * phi.sin()) as f32,
      z as f32,
    )
  };

  // Ring latitudes; degenerate pole rings are replaced by single vertices.
  let k_first = usize::from(bottom_pole);
  let k_last = lat_steps - usize::from(top_pole);

  if bottom_pole {
    mesh.vertices.push(vec3(0., 0., -rho as f32));
  }
  for k in k_first..=k_last {
    let theta = lat_a + (lat_b - lat_a) * k as f64 / lat_steps as f64;
    for i in 0..steps {
      mesh.vertices.push(ring_vertex(theta, i));
    }
  }
  if top_pole {
    mesh.vertices.push(vec3(0., 0., rho as f32));
  }

  let n_rings = k_last + 1 - k_first;
  let ring_base = |ring: usize| (usize::from(bottom_pole) + ring * steps) as u32;

  if bottom_pole && n_rings > 0 {
    for i in 0..steps as u32 {
      let j = (i + 1) % steps as u32;
      mesh.indices.push([0, ring_base(0) + j, ring_base(0) + i]);
    }
  }

  for ring in 0..n_rings.saturating_sub(1) {
    let lo = ring_base(ring);
    let hi = ring_base(ring + 1);
    for i in 0..steps as u32 {
      let j = (i + 1) % steps as u32;
      mesh.indices.push([lo + i, lo + j, hi + j]);
      mesh.indices.push([lo + i, hi + j, hi + i]);
    }
  }

  if top_pole && n_rings > 0 {
    let pole = mesh.vertices.len() as u32 - 1;
    let last = ring_base(n_rings - 1);
    for i in 0..steps as u32 {
      let j = (i + 1) % steps as u32;
      mesh.indices.push([pole, last + i, last + j]);
    }
  }

  mesh
}

/// The pin-shaft-back geometry of a support head, pointing up: the back
/// sphere sits at the origin, the pin sphere at `z = r_pin + r_back +
/// length`. Both spheres are cut at the latitude where the connecting cone
/// leaves them tangentially.
pub fn pinhead(r_pin: f64, r_back: f64, length: f64, steps: usize) -> TriangleMesh {
  let mut mesh = TriangleMesh::new();
  if r_pin <= 0. || r_back <= 0. || length < 0. || steps < 3 {
    return mesh;
  }

  let detail = 2. * PI / steps as f64;
  let h = r_back + r_pin + length;

  // Latitude of the tangent circle, from the rules of tangent circles.
  let phi = PI / 2. - ((r_back - r_pin) / h).acos();
  if !phi.is_finite() {
    return mesh;
  }

  let s1 = sphere(r_back, make_portion(0., PI / 2. + phi), detail);
  let mut s2 = sphere(r_pin, make_portion(PI / 2. + phi, PI), detail);
  s2.translate(vec3(0., 0., h as f32));

  let s1_len = s1.vertices.len() as u32;
  mesh.merge(&s1);
  mesh.merge(&s2);

  // Join the open boundary rings with the conical robe. The back sphere's
  // last ring occupies its final `steps` vertices, the pin sphere's first
  // ring its initial `steps` vertices.
  let steps = steps as u32;
  for i in 0..steps {
    let j = (i + 1) % steps;
    let lo_i = s1_len - steps + i;
    let lo_j = s1_len - steps + j;
    let hi_i = s1_len + i;
    let hi_j = s1_len + j;
    mesh.indices.push([lo_i, lo_j, hi_j]);
    mesh.indices.push([lo_i, hi_j, hi_i]);
  }

  mesh
}

/// Truncated cone from `pos` (radius `r_bottom`) up to `pos + baseheight·Z`
/// (radius `r_top`), closed by triangle fans on both ends.
pub fn halfcone(
  baseheight: f64,
  r_bottom: f64,
  r_top: f64,
  pos: DVec3,
  steps: usize,
) -> TriangleMesh {
  let mut mesh = TriangleMesh::new();
  if baseheight <= 0. || steps < 3 || (r_bottom <= 0. && r_top <= 0.) {
    return mesh;
  }

  let a = 2. * PI / steps as f64;
  let ep = pos + DVec3::new(0., 0., baseheight);

  for i in 0..steps {
    let phi = i as f64 * a;
    mesh.vertices.push(vec3(
      (pos.x + r_top * phi.cos()) as f32,
      (pos.y + r_top * phi.sin()) as f32,
      ep.z as f32,
    ));
  }
  for i in 0..steps {
    let phi = i as f64 * a;
    mesh.vertices.push(vec3(
      (pos.x + r_bottom * phi.cos()) as f32,
      (pos.y + r_bottom * phi.sin()) as f32,
      pos.z as f32,
    ));
  }
  mesh.vertices.push(pos.as_vec3());
  mesh.vertices.push(ep.as_vec3());

  let lcenter = mesh.vertices.len() as u32 - 2;
  let hcenter = mesh.vertices.len() as u32 - 1;
  let offs = steps as u32;

  for i in 0..steps as u32 {
    let j = (i + 1) % steps as u32;
    mesh.indices.push([i, offs + i, offs + j]);
    mesh.indices.push([i, offs + j, j]);
    mesh.indices.push([i, j, hcenter]);
    mesh.indices.push([lcenter, offs + j, offs + i]);
  }

  mesh
}

/// Cylinder standing at the origin, reaching up to `h`.
pub fn cylinder(r: f64, h: f64, steps: usize) -> TriangleMesh {
  halfcone(h, r, r, DVec3::ZERO, steps)
}

#[cfg(test)]
#[path = "primitives_test.rs"]
mod primitives_test;
