//! AABB-indexed ray and distance queries against a triangle mesh.
//!
//! A median-split bounding volume tree over the triangles backs the two
//! queries every routing decision is made of: first-hit ray casts and
//! closest-point distances. "No hit" is encoded as an infinite distance,
//! never as an error.

use glam::{DVec3, Vec3};

use super::TriangleMesh;

/// Result of a ray cast. A zero-distance hit means the ray was fired from
/// a position where no collision-free geometry fits at all; callers treat
/// it like an immediate obstacle.
#[derive(Clone, Copy, Debug)]
pub struct Hit {
  pub distance: f64,
  pub face: u32,
  pub is_inside: bool,
}

impl Hit {
  pub const NONE: Hit = Hit {
    distance: f64::INFINITY,
    face: u32::MAX,
    is_inside: false,
  };

  /// An immediate obstacle: zero free distance.
  pub fn blocked() -> Hit {
    Hit {
      distance: 0.,
      face: u32::MAX,
      is_inside: true,
    }
  }

  pub fn with_distance(distance: f64) -> Hit {
    Hit {
      distance,
      face: u32::MAX,
      is_inside: false,
    }
  }

  pub fn is_hit(&self) -> bool {
    self.distance.is_finite()
  }
}

const LEAF_SIZE: usize = 4;

struct Node {
  bb_min: Vec3,
  bb_max: Vec3,
  // Leaf when count > 0: `a` indexes into tri_order. Internal otherwise:
  // `a` and `b` are the child node indices.
  a: u32,
  b: u32,
  count: u32,
}

/// The mesh plus its acceleration structure.
pub struct MeshQuery {
  mesh: TriangleMesh,
  nodes: Vec<Node>,
  tri_order: Vec<u32>,
}

impl MeshQuery {
  pub fn new(mesh: TriangleMesh) -> Self {
    let mut tri_order: Vec<u32> = (0..mesh.indices.len() as u32).collect();
    let mut nodes = Vec::new();

    if !tri_order.is_empty() {
      let centroids: Vec<Vec3> = (0..mesh.indices.len())
        .map(|f| {
          let [a, b, c] = mesh.triangle(f);
          (a + b + c) / 3.
        })
        .collect();
      build(&mesh, &centroids, &mut tri_order, 0, &mut nodes);
    }

    Self {
      mesh,
      nodes,
      tri_order,
    }
  }

  pub fn mesh(&self) -> &TriangleMesh {
    &self.mesh
  }

  /// First triangle intersection along the ray. `dir` must be a unit
  /// vector. When the origin lies inside the mesh, the exit hit is
  /// returned with `is_inside` set.
  pub fn ray_hit(&self, src: DVec3, dir: DVec3) -> Hit {
    if self.nodes.is_empty() {
      return Hit::NONE;
    }

    let inv_dir = DVec3::new(1. / dir.x, 1. / dir.y, 1. / dir.z);
    let mut best = Hit::NONE;
    let mut stack = vec![0usize];

    while let Some(ni) = stack.pop() {
      let node = &self.nodes[ni];
      let Some(t_box) = slab_hit(node, src, inv_dir) else {
        continue;
      };
      if t_box > best.distance {
        continue;
      }

      if node.count > 0 {
        for &f in &self.tri_order[node.a as usize..(node.a + node.count) as usize] {
          let [a, b, c] = self.triangle_d(f as usize);
          if let Some(t) = ray_triangle(src, dir, a, b, c) {
            if t < best.distance {
              let n = (b - a).cross(c - a);
              best = Hit {
                distance: t,
                face: f,
                is_inside: n.dot(dir) > 0.,
              };
            }
          }
        }
      } else {
        stack.push(node.a as usize);
        stack.push(node.b as usize);
      }
    }

    best
  }

  /// Squared distance from `p` to the mesh surface.
  pub fn squared_distance(&self, p: DVec3) -> f64 {
    self.closest_face(p).0
  }

  /// Squared distance, the face realising it, and the closest point.
  pub fn closest_face(&self, p: DVec3) -> (f64, u32, DVec3) {
    let mut best = (f64::INFINITY, u32::MAX, p);
    if self.nodes.is_empty() {
      return best;
    }

    let mut stack = vec![0usize];
    while let Some(ni) = stack.pop() {
      let node = &self.nodes[ni];
      if box_distance_sq(node, p) >= best.0 {
        continue;
      }

      if node.count > 0 {
        for &f in &self.tri_order[node.a as usize..(node.a + node.count) as usize] {
          let [a, b, c] = self.triangle_d(f as usize);
          let q = closest_point_triangle(p, a, b, c);
          let d2 = p.distance_squared(q);
          if d2 < best.0 {
            best = (d2, f, q);
          }
        }
      } else {
        // Descend into the nearer child first.
        let l = node.a as usize;
        let r = node.b as usize;
        let dl = box_distance_sq(&self.nodes[l], p);
        let dr = box_distance_sq(&self.nodes[r], p);
        if dl < dr {
          stack.push(r);
          stack.push(l);
        } else {
          stack.push(l);
          stack.push(r);
        }
      }
    }

    best
  }

  /// Outward unit normal of the face nearest to `p`.
  pub fn normal_at(&self, p: DVec3) -> DVec3 {
    let (_, face, _) = self.closest_face(p);
    if face == u32::MAX {
      return DVec3::Z;
    }

    let [a, b, c] = self.triangle_d(face as usize);
    (b - a).cross(c - a).normalize_or_zero()
  }

  fn triangle_d(&self, face: usize) -> [DVec3; 3] {
    let [a, b, c] = self.mesh.triangle(face);
    [a.as_dvec3(), b.as_dvec3(), c.as_dvec3()]
  }
}

fn build(
  mesh: &TriangleMesh,
  centroids: &[Vec3],
  order: &mut [u32],
  start: usize,
  nodes: &mut Vec<Node>,
) -> usize {
  let mut bb_min = Vec3::INFINITY;
  let mut bb_max = Vec3::NEG_INFINITY;
  for &f in order.iter() {
    for v in mesh.triangle(f as usize) {
      bb_min = bb_min.min(v);
      bb_max = bb_max.max(v);
    }
  }

  if order.len() <= LEAF_SIZE {
    nodes.push(Node {
      bb_min,
      bb_max,
      a: start as u32,
      b: 0,
      count: order.len() as u32,
    });
    return nodes.len() - 1;
  }

  let extent = bb_max - bb_min;
  let axis = if extent.x >= extent.y && extent.x >= extent.z {
    0
  } else if extent.y >= extent.z {
    1
  } else {
    2
  };

  order
    .sort_by(|&a, &b| centroids[a as usize][axis].total_cmp(&centroids[b as usize][axis]));
  let mid = order.len() / 2;

  let slot = nodes.len();
  nodes.push(Node {
    bb_min,
    bb_max,
    a: 0,
    b: 0,
    count: 0,
  });

  let (left, right) = order.split_at_mut(mid);
  let li = build(mesh, centroids, left, start, nodes);
  let ri = build(mesh, centroids, right, start + mid, nodes);

  nodes[slot].a = li as u32;
  nodes[slot].b = ri as u32;

  slot
}

fn slab_hit(node: &Node, src: DVec3, inv_dir: DVec3) -> Option<f64> {
  let mut t0 = 0f64;
  let mut t1 = f64::INFINITY;

  for axis in 0..3 {
    let lo = (node.bb_min[axis] as f64 - src[axis]) * inv_dir[axis];
    let hi = (node.bb_max[axis] as f64 - src[axis]) * inv_dir[axis];
    let (near, far) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    t0 = t0.max(near);
    t1 = t1.min(far);
    if t0 > t1 {
      return None;
    }
  }

  Some(t0)
}

fn box_distance_sq(node: &Node, p: DVec3) -> f64 {
  let mut d2 = 0f64;
  for axis in 0..3 {
    let v = p[axis];
    let lo = node.bb_min[axis] as f64;
    let hi = node.bb_max[axis] as f64;
    let d = if v < lo {
      lo - v
    } else if v > hi {
      v - hi
    } else {
      0.
    };
    d2 += d * d;
  }
  d2
}

fn ray_triangle(src: DVec3, dir: DVec3, a: DVec3, b: DVec3, c: DVec3) -> Option<f64> {
  const T_MIN: f64 = 1e-9;

  let e1 = b - a;
  let e2 = c - a;
  let pvec = dir.cross(e2);
  let det = e1.dot(pvec);
  if det.abs() < 1e-14 {
    return None;
  }

  let inv_det = 1. / det;
  let tvec = src - a;
  let u = tvec.dot(pvec) * inv_det;
  if !(-1e-12..=1. + 1e-12).contains(&u) {
    return None;
  }

  let qvec = tvec.cross(e1);
  let v = dir.dot(qvec) * inv_det;
  if v < -1e-12 || u + v > 1. + 1e-12 {
    return None;
  }

  let t = e2.dot(qvec) * inv_det;
  (t > T_MIN).then_some(t)
}

/// Closest point on triangle abc to p (Ericson, Real-Time Collision
/// Detection).
fn closest_point_triangle(p: DVec3, a: DVec3, b: DVec3, c: DVec3) -> DVec3 {
  let ab = b - a;
  let ac = c - a;
  let ap = p - a;

  let d1 = ab.dot(ap);
  let d2 = ac.dot(ap);
  if d1 <= 0. && d2 <= 0. {
    return a;
  }

  let bp = p - b;
  let d3 = ab.dot(bp);
  let d4 = ac.dot(bp);
  if d3 >= 0. && d4 <= d3 {
    return b;
  }

  let vc = d1 * d4 - d3 * d2;
  if vc <= 0. && d1 >= 0. && d3 <= 0. {
    let v = d1 / (d1 - d3);
    return a + v * ab;
  }

  let cp = p - c;
  let d5 = ab.dot(cp);
  let d6 = ac.dot(cp);
  if d6 >= 0. && d5 <= d6 {
    return c;
  }

  let vb = d5 * d2 - d1 * d6;
  if vb <= 0. && d2 >= 0. && d6 <= 0. {
    let w = d2 / (d2 - d6);
    return a + w * ac;
  }

  let va = d3 * d6 - d5 * d4;
  if va <= 0. && (d4 - d3) >= 0. && (d5 - d6) >= 0. {
    let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
    return b + w * (c - b);
  }

  let denom = 1. / (va + vb + vc);
  let v = vb * denom;
  let w = vc * denom;
  a + ab * v + ac * w
}

#[cfg(test)]
#[path = "aabb_test.rs"]
mod aabb_test;
