//! Anchor-candidate sampling on the model surface and the print bed.
//!
//! The tree needs a set of target points it may terminate on. Both the mesh
//! surface and the bed outline are covered with roughly `area / (π r²)`
//! uniformly distributed samples. Sampling is seeded, so repeated runs see
//! the same candidates.

use glam::{vec2, vec3, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Node;

const SAMPLING_SEED: u64 = 0;

/// A bed outline in millimetres: one contour and any number of holes.
#[derive(Clone, Debug, Default)]
pub struct BedPolygon {
  pub contour: Vec<Vec2>,
  pub holes: Vec<Vec<Vec2>>,
}

/// Uniform area-weighted surface samples of an indexed triangle set.
pub fn sample_mesh(vertices: &[Vec3], faces: &[[u32; 3]], radius: f64) -> Vec<Node> {
  let mut cumulative = Vec::with_capacity(faces.len());
  let mut surface_area = 0.;
  for face in faces {
    let a = vertices[face[0] as usize];
    let b = vertices[face[1] as usize];
    let c = vertices[face[2] as usize];
    surface_area += 0.5 * (b - a).cross(c - a).length() as f64;
    cumulative.push(surface_area);
  }

  let n = (surface_area / (std::f64::consts::PI * radius * radius)) as usize;
  let mut ret = Vec::with_capacity(n);
  if surface_area <= 0. {
    return ret;
  }

  let mut rng = StdRng::seed_from_u64(SAMPLING_SEED);
  for _ in 0..n {
    let pick = rng.random_range(0.0..surface_area);
    let fidx = cumulative.partition_point(|&acc| acc < pick);
    let face = faces[fidx.min(faces.len() - 1)];

    let a = vertices[face[0] as usize];
    let b = vertices[face[1] as usize];
    let c = vertices[face[2] as usize];

    let mut u: f32 = rng.random_range(0.0..1.0);
    let mut v: f32 = rng.random_range(0.0..1.0);
    if u + v > 1. {
      u = 1. - u;
      v = 1. - v;
    }

    ret.push(Node::new(a + u * (b - a) + v * (c - a), 0.));
  }

  ret
}

/// Samples of the bed surface: the bed polygons are triangulated into a
/// flat sheet at height `z` which is then sampled like a mesh.
pub fn sample_bed(bed: &[BedPolygon], z: f32, radius: f64) -> Vec<Node> {
  let mut vertices = Vec::new();
  let mut faces = Vec::new();

  for poly in bed {
    let mut flat = Vec::with_capacity(2 * poly.contour.len());
    let mut hole_indices = Vec::with_capacity(poly.holes.len());

    for p in &poly.contour {
      flat.push(p.x as f64);
      flat.push(p.y as f64);
    }
    for hole in &poly.holes {
      hole_indices.push(flat.len() / 2);
      for p in hole {
        flat.push(p.x as f64);
        flat.push(p.y as f64);
      }
    }

    let triangles = match earcutr::earcut(&flat, &hole_indices, 2) {
      Ok(t) => t,
      Err(_) => continue,
    };

    let base = vertices.len() as u32;
    for i in (0..flat.len()).step_by(2) {
      vertices.push(vec3(flat[i] as f32, flat[i + 1] as f32, z));
    }
    for tri in triangles.chunks_exact(3) {
      faces.push([base + tri[0] as u32, base + tri[1] as u32, base + tri[2] as u32]);
    }
  }

  sample_mesh(&vertices, &faces, radius)
}

/// A rectangular bed polygon derived from the model bounding box, inflated
/// by a 10 mm margin.
pub fn make_bed_poly(vertices: &[Vec3]) -> BedPolygon {
  let mut min = vec2(f32::INFINITY, f32::INFINITY);
  let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);
  for v in vertices {
    min = min.min(vec2(v.x, v.y));
    max = max.max(vec2(v.x, v.y));
  }
  if vertices.is_empty() {
    min = Vec2::ZERO;
    max = Vec2::ZERO;
  }

  const MARGIN: f32 = 10.;
  min -= Vec2::splat(MARGIN);
  max += Vec2::splat(MARGIN);

  BedPolygon {
    contour: vec![
      vec2(min.x, min.y),
      vec2(max.x, min.y),
      vec2(max.x, max.y),
      vec2(min.x, max.y),
    ],
    holes: Vec::new(),
  }
}

#[cfg(test)]
#[path = "sampling_test.rs"]
mod sampling_test;
