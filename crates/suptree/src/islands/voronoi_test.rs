use super::*;

use crate::polygon::{scaled, ExPolygon, IntPoint, Polygon};

fn rect_island(w_mm: f64, h_mm: f64) -> ExPolygon {
  ExPolygon::new(Polygon::rectangle(
    IntPoint::from_mm(0., 0.),
    IntPoint::from_mm(w_mm, h_mm),
  ))
}

#[test]
fn test_skeleton_of_a_rectangle_runs_along_the_middle() {
  let island = rect_island(20., 4.);

  let skeleton = voronoi_skeleton(&island);

  assert!(!skeleton.is_empty());

  // The medial axis of a long rectangle contains points on the center
  // line y = 2 mm with width equal to the rectangle height.
  let mid_y = scaled(2.) as f64;
  let center_nodes: Vec<_> = skeleton
    .nodes
    .iter()
    .filter(|n| (n.pos.y - mid_y).abs() < scaled(0.01) as f64)
    .collect();

  assert!(!center_nodes.is_empty());
  for n in center_nodes {
    assert!((n.width - scaled(4.) as f64).abs() < scaled(0.05) as f64);
  }
}

#[test]
fn test_all_skeleton_nodes_are_inside() {
  let island = rect_island(10., 10.);

  let skeleton = voronoi_skeleton(&island);

  for n in &skeleton.nodes {
    let ip = IntPoint::new(n.pos.x.round() as i32, n.pos.y.round() as i32);
    assert!(island.contains(ip));
    assert!(n.width > 0.);
  }
}

#[test]
fn test_skeleton_is_connected_for_a_rectangle() {
  let island = rect_island(10., 4.);

  let skeleton = voronoi_skeleton(&island);
  assert!(!skeleton.is_empty());
  assert!(skeleton.total_length() > 0.);

  // Flood fill from node 0 must reach every node.
  let mut seen = vec![false; skeleton.nodes.len()];
  let mut stack = vec![0usize];
  seen[0] = true;
  while let Some(i) = stack.pop() {
    for &(j, _) in &skeleton.nodes[i].adj {
      if !seen[j] {
        seen[j] = true;
        stack.push(j);
      }
    }
  }
  assert!(seen.iter().all(|&s| s));
}

#[test]
fn test_annulus_skeleton_avoids_the_hole() {
  let mut hole = Polygon::rectangle(IntPoint::from_mm(15., 15.), IntPoint::from_mm(25., 25.));
  hole.reverse();
  let island = ExPolygon::with_holes(
    Polygon::rectangle(IntPoint::from_mm(0., 0.), IntPoint::from_mm(40., 40.)),
    vec![hole],
  );

  let skeleton = voronoi_skeleton(&island);

  assert!(!skeleton.is_empty());
  for n in &skeleton.nodes {
    let ip = IntPoint::new(n.pos.x.round() as i32, n.pos.y.round() as i32);
    assert!(island.contains(ip), "skeleton node inside the hole: {ip:?}");
  }
}

#[test]
fn test_degenerate_island_yields_empty_skeleton() {
  let island = ExPolygon::new(Polygon::new(vec![]));

  assert!(voronoi_skeleton(&island).is_empty());
}
