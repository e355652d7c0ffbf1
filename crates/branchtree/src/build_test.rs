use super::*;

use glam::vec3;

use crate::Properties;

#[derive(Default)]
struct RecordingBuilder {
  accept: bool,
  bridges: Vec<(i32, i32)>,
  mergers: Vec<(i32, i32, Node)>,
  ground_bridges: Vec<(i32, i32)>,
  mesh_bridges: Vec<(i32, i32)>,
  unroutable: Vec<i32>,
}

impl RecordingBuilder {
  fn accepting() -> Self {
    Self {
      accept: true,
      ..Self::default()
    }
  }
}

impl Builder for RecordingBuilder {
  fn add_bridge(&mut self, from: &Node, to: &Node) -> bool {
    if self.accept {
      self.bridges.push((from.id, to.id));
    }
    self.accept
  }

  fn add_merger(&mut self, node: &Node, closest: &Node, merge_node: &Node) -> bool {
    if self.accept {
      self.mergers.push((node.id, closest.id, *merge_node));
    }
    self.accept
  }

  fn add_ground_bridge(&mut self, from: &Node, to: &Node) -> bool {
    if self.accept {
      self.ground_bridges.push((from.id, to.id));
    }
    self.accept
  }

  fn add_mesh_bridge(&mut self, from: &Node, to: &Node) -> bool {
    if self.accept {
      self.mesh_bridges.push((from.id, to.id));
    }
    self.accept
  }

  fn report_unroutable(&mut self, node: &Node) {
    self.unroutable.push(node.id);
  }
}

fn bed_grid(half: i32, spacing: f32) -> Vec<Node> {
  let mut pts = Vec::new();
  for i in -half..=half {
    for j in -half..=half {
      pts.push(Node::new(vec3(i as f32 * spacing, j as f32 * spacing, 0.), 0.1));
    }
  }
  pts
}

fn leaf_grid(n: usize, spacing: f32, z: f32) -> Vec<Node> {
  let mut leaves = Vec::new();
  for i in 0..n {
    for j in 0..n {
      leaves.push(Node::new(
        vec3(i as f32 * spacing, j as f32 * spacing, z),
        0.2,
      ));
    }
  }
  leaves
}

fn grid_cloud() -> PointCloud {
  let props = Properties::default()
    .max_slope(std::f64::consts::FRAC_PI_4)
    .ground_level(0.)
    .max_branch_length(50.);

  PointCloud::new(Vec::new(), bed_grid(8, 1.), leaf_grid(3, 3., 10.), props)
}

#[test]
fn test_grid_leaves_merge_before_grounding() {
  let mut cloud = grid_cloud();
  let mut builder = RecordingBuilder::accepting();

  build_tree(&mut cloud, &mut builder);

  assert!(builder.unroutable.is_empty());
  assert!(!builder.mergers.is_empty(), "expected at least one merger");
  // Merging 9 leaves can never need more than 9 ground contacts.
  assert!(builder.ground_bridges.len() <= 9);
  assert!(!builder.ground_bridges.is_empty());
}

#[test]
fn test_merger_junctions_lie_below_their_parents() {
  let mut cloud = grid_cloud();
  let mut builder = RecordingBuilder::accepting();

  build_tree(&mut cloud, &mut builder);

  for (a, b, merge_node) in &builder.mergers {
    let pa = cloud.find(*a).unwrap().pos;
    let pb = cloud.find(*b).unwrap().pos;
    assert!(merge_node.pos.z <= pa.z.max(pb.z) + EPSILON);
    assert!(merge_node.pos.z as f64 > cloud.properties().get_ground_level());
  }
}

#[test]
fn test_merger_records_both_operands() {
  let mut cloud = grid_cloud();
  let mut builder = RecordingBuilder::accepting();

  build_tree(&mut cloud, &mut builder);

  let (a, b, merge_node) = builder.mergers[0];
  let junction = cloud.find(merge_node.id).expect("junction inserted");
  assert_eq!(junction.left, a);
  assert_eq!(junction.right, b);
}

#[test]
fn test_rejecting_builder_reports_all_leaves_unroutable() {
  let mut cloud = grid_cloud();
  let mut builder = RecordingBuilder::default();

  build_tree(&mut cloud, &mut builder);

  // Every leaf must eventually be reported; no connection was accepted.
  assert_eq!(builder.unroutable.len(), cloud.leaves().len());
  assert!(builder.mergers.is_empty());
  assert!(builder.ground_bridges.is_empty());
}

struct CancelledBuilder;

impl Builder for CancelledBuilder {
  fn add_bridge(&mut self, _: &Node, _: &Node) -> bool {
    false
  }
  fn add_merger(&mut self, _: &Node, _: &Node, _: &Node) -> bool {
    false
  }
  fn add_ground_bridge(&mut self, _: &Node, _: &Node) -> bool {
    false
  }
  fn add_mesh_bridge(&mut self, _: &Node, _: &Node) -> bool {
    false
  }
  fn report_unroutable(&mut self, _: &Node) {
    panic!("cancelled build must not report unroutable nodes");
  }
  fn is_valid(&self) -> bool {
    false
  }
}

#[test]
fn test_cancelled_build_stops_immediately() {
  let mut cloud = grid_cloud();

  build_tree(&mut cloud, &mut CancelledBuilder);

  assert!(cloud.junctions().is_empty());
}
