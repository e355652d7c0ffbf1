//! The typed point cloud the tree is built over.
//!
//! Four node categories share one contiguous id space:
//!
//! ```text
//! [ 0 .. MESHPTS_BEGIN )   bed-contact candidates
//! [ MESHPTS_BEGIN .. LEAVES_BEGIN )    mesh-contact candidates
//! [ LEAVES_BEGIN .. JUNCTIONS_BEGIN )  support leaves (input points)
//! [ JUNCTIONS_BEGIN .. )   junctions inserted during the build
//! ```
//!
//! Category lookup is a constant-time range test. All nodes are indexed in
//! an R* tree on insertion; junctions can be added while the build runs,
//! every other category is fixed at construction.

use glam::Vec3;
use rstar::primitives::GeomWithData;
use rstar::{RStarInsertionStrategy, RTree, RTreeParams};

use crate::queue::NodeQueue;
use crate::sampling::{sample_bed, sample_mesh};
use crate::{geom, Node, Properties, EPSILON};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
  Bed,
  Mesh,
  Leaf,
  Junction,
}

// R* parameters mirroring the branching factor the algorithm was tuned with.
struct IndexParams;

impl RTreeParams for IndexParams {
  const MIN_SIZE: usize = 4;
  const MAX_SIZE: usize = 16;
  const REINSERTION_COUNT: usize = 3;
  type DefaultInsertionStrategy = RStarInsertionStrategy;
}

type IndexEl = GeomWithData<[f32; 3], usize>;

pub struct PointCloud {
  bedpoints: Vec<Node>,
  meshpoints: Vec<Node>,
  leaves: Vec<Node>,
  junctions: Vec<Node>,

  props: Properties,
  cos2bridge_slope: f64,

  meshpts_begin: usize,
  leaves_begin: usize,
  junctions_begin: usize,

  searchable: Vec<bool>,
  reachable_cnt: usize,

  index: RTree<IndexEl, IndexParams>,
  max_z: f32,
}

impl PointCloud {
  /// Build the cloud by sampling the given mesh and the bed shape from
  /// `props` for anchor candidates.
  pub fn from_mesh(
    vertices: &[Vec3],
    faces: &[[u32; 3]],
    support_leaves: Vec<Node>,
    props: Properties,
  ) -> Self {
    let meshpts = sample_mesh(vertices, faces, props.get_sampling_radius());
    let bedpts = sample_bed(
      props.get_bed_shape(),
      props.get_ground_level() as f32,
      props.get_sampling_radius(),
    );

    Self::new(meshpts, bedpts, support_leaves, props)
  }

  pub fn new(
    meshpts: Vec<Node>,
    bedpts: Vec<Node>,
    support_leaves: Vec<Node>,
    props: Properties,
  ) -> Self {
    let slope = props.get_max_slope();
    let total = bedpts.len() + meshpts.len() + support_leaves.len();

    let mut cloud = Self {
      meshpts_begin: bedpts.len(),
      leaves_begin: bedpts.len() + meshpts.len(),
      junctions_begin: total,
      bedpoints: bedpts,
      meshpoints: meshpts,
      leaves: support_leaves,
      junctions: Vec::new(),
      props,
      cos2bridge_slope: slope.cos() * slope.cos().abs(),
      searchable: vec![true; total],
      reachable_cnt: total,
      index: RTree::new_with_params(),
      max_z: f32::NEG_INFINITY,
    };

    for i in 0..cloud.bedpoints.len() {
      cloud.bedpoints[i].id = i as i32;
      let pos = cloud.bedpoints[i].pos;
      cloud.index_insert(pos, i);
    }
    for i in 0..cloud.meshpoints.len() {
      let id = cloud.meshpts_begin + i;
      cloud.meshpoints[i].id = id as i32;
      let pos = cloud.meshpoints[i].pos;
      cloud.index_insert(pos, id);
    }
    for i in 0..cloud.leaves.len() {
      let id = cloud.leaves_begin + i;
      let leaf = &mut cloud.leaves[i];
      leaf.id = id as i32;
      leaf.left = Node::ID_NONE;
      leaf.right = Node::ID_NONE;
      let pos = leaf.pos;
      cloud.index_insert(pos, id);
    }

    cloud
  }

  fn index_insert(&mut self, pos: Vec3, id: usize) {
    self.index.insert(GeomWithData::new([pos.x, pos.y, pos.z], id));
    self.max_z = self.max_z.max(pos.z);
  }

  pub fn kind(&self, id: usize) -> NodeKind {
    if id < self.meshpts_begin {
      NodeKind::Bed
    } else if id < self.leaves_begin {
      NodeKind::Mesh
    } else if id < self.junctions_begin {
      NodeKind::Leaf
    } else {
      NodeKind::Junction
    }
  }

  pub fn get(&self, id: usize) -> &Node {
    match self.kind(id) {
      NodeKind::Bed => &self.bedpoints[id],
      NodeKind::Mesh => &self.meshpoints[id - self.meshpts_begin],
      NodeKind::Leaf => &self.leaves[id - self.leaves_begin],
      NodeKind::Junction => &self.junctions[id - self.junctions_begin],
    }
  }

  pub fn get_mut(&mut self, id: usize) -> &mut Node {
    match self.kind(id) {
      NodeKind::Bed => &mut self.bedpoints[id],
      NodeKind::Mesh => &mut self.meshpoints[id - self.meshpts_begin],
      NodeKind::Leaf => &mut self.leaves[id - self.leaves_begin],
      NodeKind::Junction => &mut self.junctions[id - self.junctions_begin],
    }
  }

  pub fn find(&self, id: i32) -> Option<&Node> {
    (id >= 0 && (id as usize) < self.junctions_begin + self.junctions.len())
      .then(|| self.get(id as usize))
  }

  /// The original index of a leaf in the input array, if `id` is a leaf.
  pub fn leaf_index_of(&self, id: i32) -> Option<usize> {
    let id = usize::try_from(id).ok()?;
    (id >= self.leaves_begin && id < self.junctions_begin).then(|| id - self.leaves_begin)
  }

  pub fn next_junction_id(&self) -> usize {
    self.junctions_begin + self.junctions.len()
  }

  pub fn insert_junction(&mut self, node: Node) -> usize {
    let new_id = self.next_junction_id();
    let mut node = node;
    node.id = new_id as i32;
    let pos = node.pos;
    self.junctions.push(node);
    self.index_insert(pos, new_id);
    self.searchable.push(true);
    self.reachable_cnt += 1;

    new_id
  }

  pub fn junctions(&self) -> &[Node] {
    &self.junctions
  }

  pub fn bedpoints(&self) -> &[Node] {
    &self.bedpoints
  }

  pub fn meshpoints(&self) -> &[Node] {
    &self.meshpoints
  }

  pub fn leaves(&self) -> &[Node] {
    &self.leaves
  }

  pub fn properties(&self) -> &Properties {
    &self.props
  }

  pub fn mark_unreachable(&mut self, id: usize) {
    debug_assert!(id < self.searchable.len());

    if self.searchable[id] {
      self.searchable[id] = false;
      self.reachable_cnt -= 1;
    }
  }

  pub fn reachable_count(&self) -> usize {
    self.reachable_cnt
  }

  pub fn is_outside_support_cone(&self, supp: Vec3, pt: Vec3) -> bool {
    let d = (pt - supp).as_dvec3();
    let dot_sq = -d.z * d.z.abs();

    dot_sq < d.length_squared() * self.cos2bridge_slope
  }

  /// Branching distance from `p` to the node `id`: Euclidean for bed/mesh
  /// targets inside the support cone, distance to the merge point for
  /// leaf/junction targets. `INFINITY` when the connection is not allowed
  /// or exceeds the max branch length.
  pub fn get_distance(&self, p: Vec3, id: usize) -> f32 {
    let kind = self.kind(id);
    let node = self.get(id);
    let mut ret = f32::INFINITY;

    match kind {
      NodeKind::Bed | NodeKind::Mesh => {
        // Targets outside the support cone of 'p' must be discarded.
        if !self.is_outside_support_cone(p, node.pos) {
          ret = (node.pos - p).length();
        }
      }
      NodeKind::Leaf | NodeKind::Junction => {
        let mergept = geom::find_merge_pt(p, node.pos, self.props.get_max_slope() as f32);
        let max_len = self.props.get_max_branch_length();
        let max_l2 = (max_len * max_len) as f32;

        match mergept {
          Some(m)
            if m.z as f64 >= self.props.get_ground_level() + 2. * node.r_min as f64 =>
          {
            let a = (node.pos - m).length_squared();
            let b = (p - m).length_squared();
            if a < max_l2 && b < max_l2 {
              ret = b.sqrt();
            }
          }
          _ => (),
        }
      }
    }

    // The max branch length bounds node-to-node and node-to-mesh
    // connections; routes to the bed handle long bridges separately.
    if kind != NodeKind::Bed && ret > self.props.get_max_branch_length() as f32 {
      ret = f32::INFINITY;
    }

    ret
  }

  /// Visit the `k` nearest searchable nodes around `pos` that are reachable
  /// (finite branching distance) and farther than `min_dist_sq`. The search
  /// is confined to a box of XY half-extent `2 · max_branch_length` reaching
  /// from just below ground up to the highest indexed node.
  pub fn foreach_reachable<F>(&self, pos: Vec3, k: usize, min_dist_sq: f32, mut visitor: F)
  where
    F: FnMut(usize, f32, f32),
  {
    let brln = 2. * self.props.get_max_branch_length() as f32;
    let zmin = (self.props.get_ground_level() - EPSILON as f64) as f32;

    let mut candidates: Vec<(f32, usize, f32)> = Vec::new();
    for el in self
      .index
      .locate_in_envelope_intersecting(&rstar::AABB::from_corners(
        [pos.x - brln, pos.y - brln, zmin],
        [pos.x + brln, pos.y + brln, self.max_z],
      ))
    {
      let id = el.data;
      if !self.searchable[id] {
        continue;
      }
      let q = el.geom();
      let d_euql_sq =
        (q[0] - pos.x).powi(2) + (q[1] - pos.y).powi(2) + (q[2] - pos.z).powi(2);
      if d_euql_sq <= min_dist_sq {
        continue;
      }
      let d_branching = self.get_distance(pos, id);
      if !d_branching.is_finite() {
        continue;
      }
      candidates.push((d_euql_sq, id, d_branching));
    }

    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    for (d_euql_sq, id, d_branching) in candidates.into_iter().take(k) {
      visitor(id, d_branching, d_euql_sq);
    }
  }

  /// The initial processing queue: every leaf, highest first.
  pub fn start_queue(&self) -> NodeQueue {
    let mut queue = NodeQueue::with_capacity(self.leaves.len());
    for (i, leaf) in self.leaves.iter().enumerate() {
      queue.push(self.leaves_begin + i, leaf.pos.z);
    }

    queue
  }
}

/// Traversal control: which child branches to descend into.
#[derive(Clone, Copy, Debug)]
pub struct TraverseCtl {
  pub to_left: bool,
  pub to_right: bool,
}

impl TraverseCtl {
  pub const BOTH: Self = Self {
    to_left: true,
    to_right: true,
  };
}

/// Depth-first traversal over the `left`/`right` links starting at `root`.
/// The visitor decides per node whether to continue into each child.
pub fn traverse<F>(cloud: &PointCloud, root: i32, visitor: &mut F)
where
  F: FnMut(&Node) -> TraverseCtl,
{
  let Some(node) = cloud.find(root).copied() else {
    return;
  };

  let ctl = visitor(&node);

  if ctl.to_left && node.left >= 0 {
    traverse(cloud, node.left, visitor);
  }
  if ctl.to_right && node.right >= 0 {
    traverse(cloud, node.right, visitor);
  }
}

#[cfg(test)]
#[path = "point_cloud_test.rs"]
mod point_cloud_test;
