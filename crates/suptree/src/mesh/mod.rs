//! Triangle mesh container and fixture shapes.

pub mod aabb;
pub mod primitives;

pub use aabb::{Hit, MeshQuery};

use glam::{vec3, Vec3};

/// An indexed triangle set: vertex positions plus triangles referencing
/// them. The support generator both consumes these (the model) and
/// produces them (the merged support geometry).
#[derive(Clone, Debug, Default)]
pub struct TriangleMesh {
  pub vertices: Vec<Vec3>,
  pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len()
  }

  /// Append another mesh, offsetting its indices.
  pub fn merge(&mut self, other: &TriangleMesh) {
    let offset = self.vertices.len() as u32;
    self.vertices.extend_from_slice(&other.vertices);
    self
      .indices
      .extend(other.indices.iter().map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]));
  }

  pub fn translate(&mut self, d: Vec3) {
    for v in &mut self.vertices {
      *v += d;
    }
  }

  pub fn bounding_box(&self) -> Aabb {
    let mut bb = Aabb::empty();
    for v in &self.vertices {
      bb.grow(*v);
    }
    bb
  }

  /// Corner positions of a triangle.
  pub fn triangle(&self, face: usize) -> [Vec3; 3] {
    let t = self.indices[face];
    [
      self.vertices[t[0] as usize],
      self.vertices[t[1] as usize],
      self.vertices[t[2] as usize],
    ]
  }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug)]
pub struct Aabb {
  pub min: Vec3,
  pub max: Vec3,
}

impl Aabb {
  pub fn empty() -> Self {
    Self {
      min: Vec3::INFINITY,
      max: Vec3::NEG_INFINITY,
    }
  }

  pub fn grow(&mut self, p: Vec3) {
    self.min = self.min.min(p);
    self.max = self.max.max(p);
  }

  pub fn merge(&mut self, other: &Aabb) {
    self.min = self.min.min(other.min);
    self.max = self.max.max(other.max);
  }

  pub fn center(&self) -> Vec3 {
    (self.min + self.max) * 0.5
  }

  pub fn is_valid(&self) -> bool {
    self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
  }
}

// Fixture shapes. Tests and callers build scenes from these; none of them
// is used by the algorithms themselves.

/// Axis-aligned box spanning (0,0,0)..(w,d,h).
pub fn make_cube(w: f32, d: f32, h: f32) -> TriangleMesh {
  let vertices = vec![
    vec3(0., 0., 0.),
    vec3(w, 0., 0.),
    vec3(w, d, 0.),
    vec3(0., d, 0.),
    vec3(0., 0., h),
    vec3(w, 0., h),
    vec3(w, d, h),
    vec3(0., d, h),
  ];
  let indices = vec![
    // bottom (z = 0, facing -Z)
    [0, 2, 1],
    [0, 3, 2],
    // top (z = h, facing +Z)
    [4, 5, 6],
    [4, 6, 7],
    // front (y = 0)
    [0, 1, 5],
    [0, 5, 4],
    // right (x = w)
    [1, 2, 6],
    [1, 6, 5],
    // back (y = d)
    [2, 3, 7],
    [2, 7, 6],
    // left (x = 0)
    [3, 0, 4],
    [3, 4, 7],
  ];

  TriangleMesh { vertices, indices }
}

/// Closed cylinder standing on the XY plane, centered on the Z axis.
pub fn make_cylinder(r: f32, h: f32, steps: usize) -> TriangleMesh {
  let steps = steps.max(3);
  let mut mesh = TriangleMesh::new();

  for i in 0..steps {
    let phi = 2. * std::f32::consts::PI * i as f32 / steps as f32;
    let (s, c) = phi.sin_cos();
    mesh.vertices.push(vec3(r * c, r * s, 0.));
    mesh.vertices.push(vec3(r * c, r * s, h));
  }
  let bottom_center = mesh.vertices.len() as u32;
  mesh.vertices.push(vec3(0., 0., 0.));
  let top_center = mesh.vertices.len() as u32;
  mesh.vertices.push(vec3(0., 0., h));

  for i in 0..steps as u32 {
    let j = (i + 1) % steps as u32;
    let (b0, t0, b1, t1) = (2 * i, 2 * i + 1, 2 * j, 2 * j + 1);
    // side quad
    mesh.indices.push([b0, b1, t1]);
    mesh.indices.push([b0, t1, t0]);
    // caps
    mesh.indices.push([bottom_center, b1, b0]);
    mesh.indices.push([top_center, t0, t1]);
  }

  mesh
}

/// Square-based pyramid with the base centered at the origin and the apex
/// at (0, 0, h).
pub fn make_pyramid(base: f32, h: f32) -> TriangleMesh {
  let b = base / 2.;
  let vertices = vec![
    vec3(-b, -b, 0.),
    vec3(b, -b, 0.),
    vec3(b, b, 0.),
    vec3(-b, b, 0.),
    vec3(0., 0., h),
  ];
  let indices = vec![
    [0, 2, 1],
    [0, 3, 2],
    [0, 1, 4],
    [1, 2, 4],
    [2, 3, 4],
    [3, 0, 4],
  ];

  TriangleMesh { vertices, indices }
}

/// Triangular prism: the profile is an isosceles triangle of width `w` and
/// height `h` in XZ, extruded along Y over `depth`, standing on the ridge
/// when flipped. The base rests on z = 0.
pub fn make_prism(w: f32, depth: f32, h: f32) -> TriangleMesh {
  let hw = w / 2.;
  let hd = depth / 2.;
  let vertices = vec![
    vec3(-hw, -hd, 0.),
    vec3(hw, -hd, 0.),
    vec3(0., -hd, h),
    vec3(-hw, hd, 0.),
    vec3(hw, hd, 0.),
    vec3(0., hd, h),
  ];
  let indices = vec![
    // ends
    [0, 1, 2],
    [3, 5, 4],
    // bottom
    [0, 4, 1],
    [0, 3, 4],
    // slanted sides
    [1, 4, 5],
    [1, 5, 2],
    [0, 2, 5],
    [0, 5, 3],
  ];

  TriangleMesh { vertices, indices }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
