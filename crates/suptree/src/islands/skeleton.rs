//! Sampling strategies over the island skeleton.

use glam::DVec2;

use super::voronoi::{voronoi_skeleton, VoronoiSkeleton};
use super::SampleConfig;
use crate::polygon::{ExPolygon, IntPoint, Polygon};

pub(super) fn sample_island(island: &ExPolygon, cfg: &SampleConfig) -> Vec<IntPoint> {
  let original = island;
  let island = simplified(island, cfg.simplification_tolerance);
  if island.contour.is_empty() {
    // The island collapsed under simplification; a freshly appearing
    // speck this small still needs its one support.
    if original.contour.is_empty() {
      return Vec::new();
    }
    let c = to_int(original.contour.centroid());
    return if original.contains(c) { vec![c] } else { Vec::new() };
  }

  let skeleton = voronoi_skeleton(&island);

  let mut samples: Vec<DVec2> = Vec::new();
  let mut branches = sample_thin_branches(&skeleton, cfg);

  relax_branches(&mut branches, &island, cfg);
  align_branches(&mut branches, cfg);

  for branch in &branches {
    samples.extend(
      branch
        .iter()
        .filter(|p| valid_sample(&island, **p, cfg.minimal_distance_from_outline)),
    );
  }

  if skeleton
    .nodes
    .iter()
    .any(|n| n.width >= cfg.thick_min_width)
  {
    sample_thick_interior(&island, cfg, &mut samples);
    sample_thick_outline(&island, cfg, &mut samples);
  }

  if samples.is_empty() {
    // Tiny island: fall back to its centroid.
    let c = island.contour.centroid();
    if island.contains(to_int(c)) {
      samples.push(c);
    }
  }

  dedup(samples, cfg.head_radius)
    .into_iter()
    .map(to_int)
    .collect()
}

fn simplified(island: &ExPolygon, tolerance: f64) -> ExPolygon {
  let contour = island.contour.simplified(tolerance);
  let holes = island
    .holes
    .iter()
    .map(|h| h.simplified(tolerance))
    .filter(|h| !h.is_empty())
    .collect();

  ExPolygon::with_holes(contour, holes)
}

fn to_int(p: DVec2) -> IntPoint {
  IntPoint::new(p.x.round() as i32, p.y.round() as i32)
}

fn valid_sample(island: &ExPolygon, p: DVec2, clearance: f64) -> bool {
  island.contains(to_int(p)) && island.distance_to_outline(p) >= clearance
}

/// One polyline of samples per thin skeleton component: a single point
/// for short branches, two for middling ones, a spaced run otherwise.
fn sample_thin_branches(skeleton: &VoronoiSkeleton, cfg: &SampleConfig) -> Vec<Vec<DVec2>> {
  let n = skeleton.nodes.len();
  let thin = |i: usize| skeleton.nodes[i].width <= cfg.thin_max_width;

  let mut component = vec![usize::MAX; n];
  let mut branches = Vec::new();

  for seed in 0..n {
    if component[seed] != usize::MAX || !thin(seed) {
      continue;
    }

    // Collect the thin component around the seed.
    let comp_id = branches.len();
    let mut members = Vec::new();
    let mut stack = vec![seed];
    component[seed] = comp_id;
    while let Some(i) = stack.pop() {
      members.push(i);
      for &(j, _) in &skeleton.nodes[i].adj {
        if thin(j) && component[j] == usize::MAX {
          component[j] = comp_id;
          stack.push(j);
        }
      }
    }

    let mut total = 0f64;
    for &i in &members {
      for &(j, len) in &skeleton.nodes[i].adj {
        if thin(j) && i < j {
          total += len;
        }
      }
    }

    let path = longest_path(skeleton, &members, &thin);

    let mut branch = Vec::new();
    if total <= cfg.max_length_for_one_support_point || path.len() < 2 {
      if let Some(p) = point_along(skeleton, &path, 0.5) {
        branch.push(p);
      } else if let Some(&i) = members.first() {
        branch.push(skeleton.nodes[i].pos);
      }
    } else if total <= cfg.max_length_for_two_support_points {
      let r = cfg.max_length_ratio_for_two_support_points;
      branch.extend(point_along(skeleton, &path, r));
      branch.extend(point_along(skeleton, &path, 1. - r));
    } else {
      branch.extend(walk_with_spacing(skeleton, &members, &thin, cfg.thin_max_distance));
    }

    branches.push(branch);
  }

  branches
}

/// Longest path between two leaves of the thin subgraph, found with a
/// double sweep. Works on trees; cycles just yield a reasonable chord.
fn longest_path(
  skeleton: &VoronoiSkeleton,
  members: &[usize],
  thin: &dyn Fn(usize) -> bool,
) -> Vec<usize> {
  if members.is_empty() {
    return Vec::new();
  }

  let far = |start: usize| -> (usize, Vec<usize>) {
    let mut best = (start, vec![start]);
    let mut stack = vec![(start, vec![start], 0f64)];
    let mut seen = std::collections::HashSet::new();
    seen.insert(start);
    let mut best_d = 0f64;

    while let Some((i, path, d)) = stack.pop() {
      if d > best_d {
        best_d = d;
        best = (i, path.clone());
      }
      for &(j, len) in &skeleton.nodes[i].adj {
        if thin(j) && seen.insert(j) {
          let mut p = path.clone();
          p.push(j);
          stack.push((j, p, d + len));
        }
      }
    }

    best
  };

  let (a, _) = far(members[0]);
  let (_, path) = far(a);

  path
}

/// Interpolated position at `t` (0..1) of the path's arc length.
fn point_along(skeleton: &VoronoiSkeleton, path: &[usize], t: f64) -> Option<DVec2> {
  if path.is_empty() {
    return None;
  }
  if path.len() == 1 {
    return Some(skeleton.nodes[path[0]].pos);
  }

  let mut total = 0f64;
  for w in path.windows(2) {
    total += skeleton.nodes[w[0]].pos.distance(skeleton.nodes[w[1]].pos);
  }

  let mut remaining = t.clamp(0., 1.) * total;
  for w in path.windows(2) {
    let a = skeleton.nodes[w[0]].pos;
    let b = skeleton.nodes[w[1]].pos;
    let len = a.distance(b);
    if remaining <= len || len <= 0. {
      let s = if len > 0. { remaining / len } else { 0. };
      return Some(a + (b - a) * s);
    }
    remaining -= len;
  }

  Some(skeleton.nodes[*path.last().unwrap()].pos)
}

/// Walk every thin edge of the component depth first, emitting a sample
/// whenever the travelled distance since the last one exceeds `spacing`.
fn walk_with_spacing(
  skeleton: &VoronoiSkeleton,
  members: &[usize],
  thin: &dyn Fn(usize) -> bool,
  spacing: f64,
) -> Vec<DVec2> {
  let mut out = Vec::new();
  let Some(&start) = members.first() else {
    return out;
  };

  let mut seen = std::collections::HashSet::new();
  seen.insert(start);
  let mut stack = vec![(start, 0f64)];
  out.push(skeleton.nodes[start].pos);

  while let Some((i, since_last)) = stack.pop() {
    for &(j, len) in &skeleton.nodes[i].adj {
      if !thin(j) || !seen.insert(j) {
        continue;
      }

      let a = skeleton.nodes[i].pos;
      let b = skeleton.nodes[j].pos;

      // Emit samples along the edge whenever the travelled distance
      // reaches the spacing.
      let mut acc = since_last;
      let mut pos = 0f64;
      loop {
        let need = spacing - acc;
        if pos + need > len {
          acc += len - pos;
          break;
        }
        pos += need;
        out.push(a + (b - a) * (pos / len.max(1.)));
        acc = 0.;
      }

      stack.push((j, acc));
    }
  }

  out
}

/// Even out branch samples by pulling each one towards the midpoint of
/// its neighbours, while it stays inside with clearance.
fn relax_branches(branches: &mut [Vec<DVec2>], island: &ExPolygon, cfg: &SampleConfig) {
  for _ in 0..cfg.count_iteration {
    let mut max_move = 0f64;

    for branch in branches.iter_mut() {
      for i in 1..branch.len().saturating_sub(1) {
        let target = (branch[i - 1] + branch[i + 1]) / 2.;
        let candidate = (branch[i] + target) / 2.;
        if valid_sample(island, candidate, cfg.minimal_distance_from_outline) {
          max_move = max_move.max(branch[i].distance(candidate));
          branch[i] = candidate;
        }
      }
    }

    if max_move < cfg.minimal_move {
      break;
    }
  }
}

/// Nudge samples of different branches onto shared axes when they nearly
/// line up, to break visible support patterns.
fn align_branches(branches: &mut [Vec<DVec2>], cfg: &SampleConfig) {
  let mut flat: Vec<(usize, usize, DVec2)> = Vec::new();
  for (b, branch) in branches.iter().enumerate() {
    for (i, p) in branch.iter().enumerate() {
      flat.push((b, i, *p));
    }
  }

  for k in 0..flat.len() {
    for l in (k + 1)..flat.len() {
      let (b0, i0, p0) = flat[k];
      let (b1, i1, p1) = flat[l];
      if b0 == b1 {
        continue;
      }
      if p0.distance(p1) > cfg.max_align_distance {
        continue;
      }

      let d = p1 - p0;
      if d.x.abs() < d.y.abs() {
        let x = (p0.x + p1.x) / 2.;
        branches[b0][i0].x = x;
        branches[b1][i1].x = x;
      } else {
        let y = (p0.y + p1.y) / 2.;
        branches[b0][i0].y = y;
        branches[b1][i1].y = y;
      }
    }
  }
}

/// Hexagonal field of samples across the island interior.
fn sample_thick_interior(island: &ExPolygon, cfg: &SampleConfig, out: &mut Vec<DVec2>) {
  let (min, max) = island.contour.bounding_box();
  let s = cfg.thick_inner_max_distance;
  let dy = s * 3f64.sqrt() / 2.;

  let mut row = 0usize;
  let mut y = min.y as f64;
  while y <= max.y as f64 {
    let offset = if row % 2 == 1 { s / 2. } else { 0. };
    let mut x = min.x as f64 + offset;
    while x <= max.x as f64 {
      let p = DVec2::new(x, y);
      if valid_sample(island, p, cfg.minimal_distance_from_outline) {
        out.push(p);
      }
      x += s;
    }
    y += dy;
    row += 1;
  }
}

/// A chain of samples along each outline ring, inset into the island.
fn sample_thick_outline(island: &ExPolygon, cfg: &SampleConfig, out: &mut Vec<DVec2>) {
  let insets = [
    cfg.maximal_distance_from_outline,
    cfg.maximal_distance_from_outline / 2.,
    cfg.minimal_distance_from_outline,
  ];

  let spacing = cfg.thick_outline_max_distance;
  let place = |ring: &Polygon, out: &mut Vec<DVec2>| {
    // Walk the ring, dropping an inset sample every `spacing` of arc
    // length. The first usable inset wins.
    let mut acc = spacing / 2.;

    for (a, b) in ring.segments() {
      let a = a.as_dvec2();
      let b = b.as_dvec2();
      let len = a.distance(b);
      if len <= 0. {
        continue;
      }
      let dir = (b - a) / len;
      // Interior lies to the left of the ring direction.
      let inward = DVec2::new(-dir.y, dir.x);

      let mut pos = 0f64;
      loop {
        let need = spacing - acc;
        if pos + need > len {
          acc += len - pos;
          break;
        }
        pos += need;
        acc = 0.;

        let base = a + dir * pos;
        for inset in insets {
          let p = base + inward * inset;
          if valid_sample(island, p, cfg.minimal_distance_from_outline) {
            out.push(p);
            break;
          }
        }
      }
    }
  };

  for ring in island.rings() {
    place(ring, out);
  }
}

/// Keep-first filtering of samples closer than `min_dist` to each other.
fn dedup(samples: Vec<DVec2>, min_dist: f64) -> Vec<DVec2> {
  let mut out: Vec<DVec2> = Vec::with_capacity(samples.len());
  for p in samples {
    if out.iter().all(|q| q.distance(p) >= min_dist) {
      out.push(p);
    }
  }
  out
}

#[cfg(test)]
#[path = "skeleton_test.rs"]
mod skeleton_test;
