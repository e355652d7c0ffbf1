//! The Voronoi back-end adapter.
//!
//! This is the only module that touches the diagram library types: outline
//! segments go in, a width-annotated skeleton graph comes out, so the
//! back-end can be swapped without touching the samplers downstream.

use boostvoronoi::builder::Builder as DiagramBuilder;
use boostvoronoi::geometry::{Line, Point};
use glam::DVec2;

use crate::polygon::ExPolygon;

/// A node of the medial-axis skeleton. Coordinates and widths are in
/// scaled units; `width` is twice the clearance to the nearest outline.
#[derive(Clone, Debug)]
pub struct SkeletonNode {
  pub pos: DVec2,
  pub width: f64,
  /// Adjacent node index plus the arc length of the connecting edge.
  pub adj: Vec<(usize, f64)>,
}

#[derive(Clone, Debug, Default)]
pub struct VoronoiSkeleton {
  pub nodes: Vec<SkeletonNode>,
}

impl VoronoiSkeleton {
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Total arc length of the skeleton, in scaled units.
  pub fn total_length(&self) -> f64 {
    self
      .nodes
      .iter()
      .enumerate()
      .flat_map(|(i, n)| n.adj.iter().filter(move |(j, _)| i < *j))
      .map(|(_, len)| *len)
      .sum()
  }
}

/// Medial-axis skeleton of the island interior: the segment Voronoi
/// diagram of the outline, restricted to vertices inside the island.
/// Curved (parabolic) edges are approximated by their chords.
pub fn voronoi_skeleton(island: &ExPolygon) -> VoronoiSkeleton {
  let segments: Vec<Line<i32>> = island
    .segments()
    .filter(|(a, b)| a != b)
    .map(|(a, b)| Line::new(Point { x: a.x, y: a.y }, Point { x: b.x, y: b.y }))
    .collect();

  if segments.is_empty() {
    return VoronoiSkeleton::default();
  }

  let Ok(vb) = DiagramBuilder::<i32>::default().with_segments(segments.iter()) else {
    return VoronoiSkeleton::default();
  };
  let Ok(diagram) = vb.build() else {
    return VoronoiSkeleton::default();
  };

  let vertices = diagram.vertices();
  let edges = diagram.edges();

  // Keep diagram vertices that lie strictly inside the island; their
  // medial width is twice the distance to the outline.
  let mut node_of_vertex = vec![usize::MAX; vertices.len()];
  let mut skeleton = VoronoiSkeleton::default();

  for (vi, vertex) in vertices.iter().enumerate() {
    let pos = DVec2::new(vertex.x(), vertex.y());
    let ip = crate::polygon::IntPoint::new(pos.x.round() as i32, pos.y.round() as i32);

    if !island.contains(ip) {
      continue;
    }

    let width = 2. * island.distance_to_outline(pos);
    node_of_vertex[vi] = skeleton.nodes.len();
    skeleton.nodes.push(SkeletonNode {
      pos,
      width,
      adj: Vec::new(),
    });
  }

  for edge in edges.iter() {
    if !edge.is_primary() {
      continue;
    }
    let Some(v0) = edge.vertex0() else {
      continue;
    };
    let Ok(twin) = edge.twin() else {
      continue;
    };
    let Some(v1) = edges[twin.usize()].vertex0() else {
      continue;
    };
    // Visit each undirected edge once.
    if v0.usize() >= v1.usize() {
      continue;
    }

    let (n0, n1) = (node_of_vertex[v0.usize()], node_of_vertex[v1.usize()]);
    if n0 == usize::MAX || n1 == usize::MAX {
      continue;
    }

    // The chord midpoint must be interior too; edges hugging a reflex
    // corner can dip outside even when both endpoints are in.
    let mid = (skeleton.nodes[n0].pos + skeleton.nodes[n1].pos) / 2.;
    let mid_ip =
      crate::polygon::IntPoint::new(mid.x.round() as i32, mid.y.round() as i32);
    if !island.contains(mid_ip) {
      continue;
    }

    let len = skeleton.nodes[n0].pos.distance(skeleton.nodes[n1].pos);
    skeleton.nodes[n0].adj.push((n1, len));
    skeleton.nodes[n1].adj.push((n0, len));
  }

  skeleton
}

#[cfg(test)]
#[path = "voronoi_test.rs"]
mod voronoi_test;
