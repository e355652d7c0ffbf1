//! Horizontal cross sections of a triangle mesh.
//!
//! Each triangle crossing the plane contributes one oriented segment;
//! chaining the segments yields closed loops, counterclockwise around
//! material. Loops wound the other way are holes and get assigned to the
//! smallest contour containing them.

use std::collections::HashMap;

use glam::{DVec2, DVec3};

use crate::mesh::TriangleMesh;
use crate::polygon::{scaled, ExPolygon, IntPoint, Polygon};

/// Slice the mesh at height `z` (in mm) into expolygons with scaled
/// integer coordinates.
pub fn cross_section(mesh: &TriangleMesh, z: f64) -> Vec<ExPolygon> {
  let segments = collect_segments(mesh, z);
  let loops = chain_loops(segments);

  build_expolygons(loops)
}

fn collect_segments(mesh: &TriangleMesh, z: f64) -> Vec<(IntPoint, IntPoint)> {
  let mut segments = Vec::new();

  // Vertices exactly on the plane would create degenerate crossings;
  // nudging the plane instead keeps every crossing a clean two-edge cut.
  let mut z = z;
  let on_plane = |z: f64| {
    mesh
      .vertices
      .iter()
      .any(|v| ((v.z as f64) - z).abs() < 1e-9)
  };
  while on_plane(z) {
    z += 1e-7;
  }

  for face in 0..mesh.triangle_count() {
    let tri = mesh.indices[face];
    let [a, b, c] = mesh.triangle(face);
    let pts = [a.as_dvec3(), b.as_dvec3(), c.as_dvec3()];

    let mut crossings: Vec<DVec3> = Vec::with_capacity(2);
    for (i, j, vi, vj) in [
      (0usize, 1usize, tri[0], tri[1]),
      (1, 2, tri[1], tri[2]),
      (2, 0, tri[2], tri[0]),
    ] {
      let (pa, pb) = (pts[i], pts[j]);
      if (pa.z > z) == (pb.z > z) {
        continue;
      }
      // Interpolate on the canonical vertex order so shared edges of
      // neighbouring triangles produce bit-identical points.
      let (lo, hi) = if vi < vj { (pts[i], pts[j]) } else { (pts[j], pts[i]) };
      let t = (z - lo.z) / (hi.z - lo.z);
      crossings.push(lo + t * (hi - lo));
    }

    if crossings.len() != 2 {
      continue;
    }

    // Orient the segment so material stays to its left when viewed from
    // above: the direction follows z-up crossed with the face normal.
    let n = (pts[1] - pts[0]).cross(pts[2] - pts[0]);
    let along = DVec2::new(-n.y, n.x);
    let d = crossings[1] - crossings[0];
    let (p0, p1) = if DVec2::new(d.x, d.y).dot(along) >= 0. {
      (crossings[0], crossings[1])
    } else {
      (crossings[1], crossings[0])
    };

    let a = IntPoint::new(scaled(p0.x), scaled(p0.y));
    let b = IntPoint::new(scaled(p1.x), scaled(p1.y));
    if a != b {
      segments.push((a, b));
    }
  }

  segments
}

fn chain_loops(segments: Vec<(IntPoint, IntPoint)>) -> Vec<Polygon> {
  let mut by_start: HashMap<IntPoint, Vec<usize>> = HashMap::new();
  for (i, (a, _)) in segments.iter().enumerate() {
    by_start.entry(*a).or_default().push(i);
  }

  let mut used = vec![false; segments.len()];
  let mut loops = Vec::new();

  for start in 0..segments.len() {
    if used[start] {
      continue;
    }

    let mut points = Vec::new();
    let mut current = start;
    loop {
      used[current] = true;
      let (a, b) = segments[current];
      points.push(a);

      if b == segments[start].0 {
        // Closed back onto the loop start.
        break;
      }

      let next = by_start
        .get(&b)
        .and_then(|c| c.iter().find(|&&i| !used[i]))
        .copied();
      match next {
        Some(i) => current = i,
        None => {
          // Open chain from degenerate geometry; discard it.
          points.clear();
          break;
        }
      }
    }

    if points.len() >= 3 {
      loops.push(Polygon::new(points));
    }
  }

  loops
}

fn build_expolygons(loops: Vec<Polygon>) -> Vec<ExPolygon> {
  let mut contours: Vec<Polygon> = Vec::new();
  let mut holes: Vec<Polygon> = Vec::new();

  for polygon in loops {
    if polygon.is_empty() {
      continue;
    }
    if polygon.is_ccw() {
      contours.push(polygon);
    } else {
      holes.push(polygon);
    }
  }

  // Sort contours by area so each hole lands in the smallest container.
  contours.sort_by(|a, b| a.area().total_cmp(&b.area()));

  let mut out: Vec<ExPolygon> = contours.into_iter().map(ExPolygon::new).collect();
  'holes: for hole in holes {
    let probe = hole.points[0];
    for ex in &mut out {
      if ex.contour.contains(probe) {
        ex.holes.push(hole);
        continue 'holes;
      }
    }
  }

  out
}

#[cfg(test)]
#[path = "slice_test.rs"]
mod slice_test;
