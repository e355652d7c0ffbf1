//! branchtree - Greedy branching-tree construction over a typed point cloud.
//!
//! The algorithm grows an arborescent support structure from a set of *leaf*
//! points down towards a set of *bed* (ground) and *mesh* anchor candidates.
//! Nodes are processed highest-Z first; each step either merges two branches
//! through a cost-aware merge point, bridges to a lower node, or terminates
//! the branch on the bed or the mesh.
//!
//! The crate is deliberately ignorant of what the tree is made of. All
//! geometry decisions that require collision knowledge go through the
//! [`Builder`] callback trait; the caller accepts or rejects every proposed
//! connection.

pub mod geom;
pub mod point_cloud;
pub mod queue;
pub mod sampling;

mod build;

pub use build::build_tree;
pub use geom::{find_merge_pt, is_outside_support_cone};
pub use point_cloud::{traverse, NodeKind, PointCloud, TraverseCtl};
pub use sampling::{make_bed_poly, sample_bed, sample_mesh, BedPolygon};

use glam::Vec3;

/// Numeric fuzz used by the tree construction.
pub const EPSILON: f32 = 1e-6;

/// A node of the branching tree: a position, the minimum radius the branch
/// needs at this point, and the accumulated weight (total branch length
/// hanging below it). `left`/`right` record the two children merged into
/// this node.
#[derive(Clone, Copy, Debug)]
pub struct Node {
  pub id: i32,
  pub left: i32,
  pub right: i32,
  pub pos: Vec3,
  pub r_min: f32,
  pub weight: f32,
}

impl Node {
  pub const ID_NONE: i32 = -1;

  pub fn new(pos: Vec3, r_min: f32) -> Self {
    Self {
      id: Self::ID_NONE,
      left: Self::ID_NONE,
      right: Self::ID_NONE,
      pos,
      r_min,
      weight: 0.,
    }
  }
}

/// True when both child slots of the node are taken.
pub fn is_occupied(n: &Node) -> bool {
  n.left != Node::ID_NONE && n.right != Node::ID_NONE
}

/// Input parameters of the tree construction. In-line fillable with setters
/// returning self.
#[derive(Clone, Debug)]
pub struct Properties {
  max_slope: f64,
  ground_level: f64,
  sampling_radius: f64,
  max_branch_len: f64,
  bed_shape: Vec<BedPolygon>,
}

impl Default for Properties {
  fn default() -> Self {
    Self {
      max_slope: std::f64::consts::FRAC_PI_4,
      ground_level: 0.,
      sampling_radius: 0.5,
      max_branch_len: 10.,
      bed_shape: Vec::new(),
    }
  }
}

impl Properties {
  /// Maximum angular deviation from vertical for any bridge of the tree.
  pub fn max_slope(mut self, val: f64) -> Self {
    self.max_slope = val;
    self
  }

  /// Z level of the ground.
  pub fn ground_level(mut self, val: f64) -> Self {
    self.ground_level = val;
    self
  }

  /// Spacing of the anchor candidates sampled on the mesh and the bed.
  pub fn sampling_radius(mut self, val: f64) -> Self {
    self.sampling_radius = val;
    self
  }

  /// Shape of the print bed (ground).
  pub fn bed_shape(mut self, bed: Vec<BedPolygon>) -> Self {
    self.bed_shape = bed;
    self
  }

  pub fn max_branch_length(mut self, val: f64) -> Self {
    self.max_branch_len = val;
    self
  }

  pub fn get_max_slope(&self) -> f64 {
    self.max_slope
  }

  pub fn get_ground_level(&self) -> f64 {
    self.ground_level
  }

  pub fn get_sampling_radius(&self) -> f64 {
    self.sampling_radius
  }

  pub fn get_max_branch_length(&self) -> f64 {
    self.max_branch_len
  }

  pub fn get_bed_shape(&self) -> &[BedPolygon] {
    &self.bed_shape
  }
}

/// Output interface of the tree generator. Every method is a proposal; the
/// implementation checks it (typically against the model geometry) and
/// returns whether the connection may be materialised. Rejected proposals
/// make the algorithm try other paths; when all of them fail,
/// [`Builder::report_unroutable`] is invoked as a last resort.
pub trait Builder {
  /// A simple bridge from node to node.
  fn add_bridge(&mut self, from: &Node, to: &Node) -> bool;

  /// A Y shaped structure: two source nodes and a merge point below both.
  /// Merge points respect the `max_slope` property.
  fn add_merger(&mut self, node: &Node, closest: &Node, merge_node: &Node) -> bool;

  /// An anchoring bridge to the ground (print bed).
  fn add_ground_bridge(&mut self, from: &Node, to: &Node) -> bool;

  /// An anchoring bridge into the model body.
  fn add_mesh_bridge(&mut self, from: &Node, to: &Node) -> bool;

  /// A waypoint that sidesteps the model when `from` cannot reach the bed
  /// within `max_bridge_len`.
  fn suggest_avoidance(&self, _from: &Node, _max_bridge_len: f32) -> Option<Vec3> {
    None
  }

  /// Called for nodes that could not be routed to any endpoint.
  fn report_unroutable(&mut self, node: &Node);

  /// When this returns false the build stops (cancellation).
  fn is_valid(&self) -> bool {
    true
  }
}
