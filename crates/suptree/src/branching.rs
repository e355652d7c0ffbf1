//! Branching (organic) support trees.
//!
//! The generic greedy algorithm from the `branchtree` crate proposes
//! bridges, mergers and anchors; this module validates each proposal
//! against the model, materialises accepted subtrees in the element store,
//! and routes the finished trunks to the ground.
//!
//! Subtree geometry is emitted after the greedy loop finishes: a subtree
//! is only ever requested for nodes whose descendants are final, so the
//! deferred pass sees exactly the topology the acceptance decisions were
//! made on.

use std::collections::HashMap;
use std::sync::Mutex;

use glam::Vec3;
use rayon::prelude::*;
use tracing::warn;

use branchtree::point_cloud::{traverse, PointCloud, TraverseCtl};
use branchtree::{make_bed_poly, sample_bed, sample_mesh, Node, Properties};

use crate::builder::SupportTreeBuilder;
use crate::collision::{beam_mesh_hit, WIDE_BEAM_SAMPLES};
use crate::elements::Junction;
use crate::error::Error;
use crate::geometry::{Ball, Beam, DOWN};
use crate::ground::{
  build_ground_connection, deepsearch_ground_connection_with_end_radius, GroundConnection,
};
use crate::heads::{
  calculate_anchor_placement, calculate_pinhead_placement, non_duplicate_support_indices,
};
use crate::support::{ground_level, SupportableMesh};

// Scaling of the configured widening factor to a radius gain per unit of
// branch weight.
const WIDENING_SCALE: f64 = 0.05;

struct BranchingTreeBuilder<'a> {
  builder: &'a SupportTreeBuilder,
  sm: &'a SupportableMesh,

  // Trunk nodes that received a validated ground connection.
  pillars: Vec<Node>,
  gnd_connections: Mutex<HashMap<i32, GroundConnection>>,

  // Roots whose subtree geometry is emitted after the greedy loop.
  subtree_roots: Vec<i32>,
  // Roots of failed branches, discarded (and partially rescued) at the
  // end.
  discard_roots: Vec<i32>,

  // Leaf ids whose subtree had to be discarded.
  unroutable_pinheads: Vec<usize>,
}

impl<'a> BranchingTreeBuilder<'a> {
  fn new(builder: &'a SupportTreeBuilder, sm: &'a SupportableMesh) -> Self {
    Self {
      builder,
      sm,
      pillars: Vec::new(),
      gnd_connections: Mutex::new(HashMap::new()),
      subtree_roots: Vec::new(),
      discard_roots: Vec::new(),
      unroutable_pinheads: Vec::new(),
    }
  }

  fn get_radius(&self, node: &Node) -> f64 {
    let w = WIDENING_SCALE * self.sm.cfg.pillar_widening_factor * node.weight as f64;

    node.r_min as f64 + w
  }

  /// Ground-connection attempt shared by the bed arm and the rescue
  /// paths. Results are cached per node; a node that failed once is not
  /// retried towards another bed point, a better route is unlikely to
  /// appear.
  fn try_ground_connection(&mut self, from: &Node, to: &Node) -> bool {
    let cached = self.gnd_connections.lock().unwrap().get(&from.id).cloned();

    let conn = match cached {
      Some(conn) => conn,
      None => {
        let j = Junction::new(from.pos.as_dvec3(), self.get_radius(from));
        let init_dir = (to.pos - from.pos).as_dvec3().normalize_or(DOWN);

        let conn = deepsearch_ground_connection_with_end_radius(
          self.sm,
          &j,
          self.get_radius(to),
          init_dir,
        );

        self
          .gnd_connections
          .lock()
          .unwrap()
          .insert(from.id, conn.clone());

        conn
      }
    };

    if conn.is_valid() {
      self.pillars.push(*from);
      self.subtree_roots.push(from.id);
      true
    } else {
      false
    }
  }

  /// Materialise the merger geometry hanging below `root`.
  fn build_subtree(&self, cloud: &PointCloud, root: i32) {
    traverse(cloud, root, &mut |node: &Node| {
      if node.left >= 0 && node.right >= 0 {
        let nparent = cloud.get(node.id as usize);
        let nleft = cloud.get(node.left as usize);
        let nright = cloud.get(node.right as usize);
        let to = nparent.pos.as_dvec3();
        let merge_r = self.get_radius(nparent);

        self
          .builder
          .add_diffbridge(nleft.pos.as_dvec3(), to, self.get_radius(nleft), merge_r);
        self
          .builder
          .add_diffbridge(nright.pos.as_dvec3(), to, self.get_radius(nright), merge_r);
        self.builder.add_junction(to, merge_r);
      } else {
        // One occupied child slot at most; its id hides in the sum.
        let child = node.left + node.right + 1;
        if child >= 0 {
          let from = cloud.get(child as usize);
          let to = cloud.get(node.id as usize);
          let to_r = self.get_radius(to);

          self.builder.add_diffbridge(
            from.pos.as_dvec3(),
            to.pos.as_dvec3(),
            self.get_radius(from),
            to_r,
          );
          self.builder.add_junction(to.pos.as_dvec3(), to_r);
        }
      }

      TraverseCtl::BOTH
    });
  }

  /// Discard the support points hanging below `root`; children that can
  /// still reach the ground on their own are rescued and their branches
  /// kept.
  fn discard_subtree_rescue(&mut self, cloud: &PointCloud, root: i32) {
    let glvl = ground_level(self.sm) as f32;

    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
      let Some(node) = cloud.find(id).copied() else {
        continue;
      };

      let mut dst = node;
      dst.pos.z = glvl;
      dst.weight += node.pos.z - glvl;

      if node.left >= 0 {
        let left = *cloud.get(node.left as usize);
        if !self.try_ground_connection(&left, &dst) {
          if let Some(supp) = cloud.leaf_index_of(node.left) {
            self.unroutable_pinheads.push(supp);
          }
          stack.push(node.left);
        }
      }

      if node.right >= 0 && node.right != node.left {
        let right = *cloud.get(node.right as usize);
        if !self.try_ground_connection(&right, &dst) {
          if let Some(supp) = cloud.leaf_index_of(node.right) {
            self.unroutable_pinheads.push(supp);
          }
          stack.push(node.right);
        }
      }

      if let Some(supp) = cloud.leaf_index_of(node.id) {
        self.unroutable_pinheads.push(supp);
      }
    }
  }

  /// Emit all deferred geometry. Rescue passes may queue further subtree
  /// roots, so the drains alternate until everything settles.
  fn materialize(&mut self, cloud: &PointCloud) {
    loop {
      let roots = std::mem::take(&mut self.subtree_roots);
      for root in &roots {
        self.build_subtree(cloud, *root);
      }

      let discards = std::mem::take(&mut self.discard_roots);
      for root in &discards {
        self.discard_subtree_rescue(cloud, *root);
      }

      if self.subtree_roots.is_empty() && self.discard_roots.is_empty() {
        return;
      }
    }
  }

  fn pillars(&self) -> &[Node] {
    &self.pillars
  }

  fn ground_conn(&self, node_id: i32) -> Option<GroundConnection> {
    self.gnd_connections.lock().unwrap().get(&node_id).cloned()
  }
}

impl branchtree::Builder for BranchingTreeBuilder<'_> {
  fn add_bridge(&mut self, from: &Node, to: &Node) -> bool {
    let fromd = from.pos.as_dvec3();
    let tod = to.pos.as_dvec3();
    let from_r = self.get_radius(from);
    let to_r = self.get_radius(to);

    let beam = Beam::between(Ball { p: fromd, r: from_r }, Ball { p: tod, r: to_r });
    let hit = beam_mesh_hit(
      &self.sm.query,
      &beam,
      WIDE_BEAM_SAMPLES,
      self.sm.cfg.safety_distance_mm,
    );

    hit.distance > (tod - fromd).length()
  }

  fn add_merger(&mut self, node: &Node, closest: &Node, merge_node: &Node) -> bool {
    let from1 = node.pos.as_dvec3();
    let from2 = closest.pos.as_dvec3();
    let to = merge_node.pos.as_dvec3();

    let merge_r = self.get_radius(merge_node);
    let beam1 = Beam::between(
      Ball {
        p: from1,
        r: self.get_radius(node),
      },
      Ball { p: to, r: merge_r },
    );
    let beam2 = Beam::between(
      Ball {
        p: from2,
        r: self.get_radius(closest),
      },
      Ball { p: to, r: merge_r },
    );

    let sd = self.sm.cfg.safety_distance_mm;
    let hit1 = beam_mesh_hit(&self.sm.query, &beam1, WIDE_BEAM_SAMPLES, sd);
    let hit2 = beam_mesh_hit(&self.sm.query, &beam2, WIDE_BEAM_SAMPLES, sd);

    hit1.distance > (to - from1).length() && hit2.distance > (to - from2).length()
  }

  fn add_ground_bridge(&mut self, from: &Node, to: &Node) -> bool {
    self.try_ground_connection(from, to)
  }

  fn add_mesh_bridge(&mut self, from: &Node, to: &Node) -> bool {
    if self.sm.cfg.ground_facing_only {
      return false;
    }
    if from.weight as f64 > self.sm.cfg.max_weight_on_model_support {
      return false;
    }

    let fromj = Junction::new(from.pos.as_dvec3(), self.get_radius(from));
    let Some(anchor) = calculate_anchor_placement(self.sm, &fromj, to.pos.as_dvec3()) else {
      return false;
    };

    let toj = Junction::new(anchor.junction_point(), anchor.0.r_back_mm);
    let beam = Beam::between(
      Ball {
        p: fromj.pos,
        r: fromj.r,
      },
      Ball {
        p: toj.pos,
        r: toj.r,
      },
    );
    let hit = beam_mesh_hit(&self.sm.query, &beam, WIDE_BEAM_SAMPLES, 0.);

    if hit.distance > fromj.pos.distance(toj.pos) {
      self
        .builder
        .add_diffbridge(fromj.pos, toj.pos, fromj.r, toj.r);
      self.builder.add_anchor(anchor);
      self.subtree_roots.push(from.id);

      true
    } else {
      false
    }
  }

  fn suggest_avoidance(&self, from: &Node, max_bridge_len: f32) -> Option<Vec3> {
    let glvl = ground_level(self.sm);
    let mut dst = *from;
    dst.pos.z = glvl as f32;
    dst.weight += from.pos.z - glvl as f32;

    let cached = self.gnd_connections.lock().unwrap().get(&from.id).cloned();

    let conn = match cached {
      Some(conn) => conn,
      None => {
        let j = Junction::new(from.pos.as_dvec3(), self.get_radius(from));
        let conn = deepsearch_ground_connection_with_end_radius(
          self.sm,
          &j,
          self.get_radius(&dst),
          DOWN,
        );

        self
          .gnd_connections
          .lock()
          .unwrap()
          .insert(from.id, conn.clone());

        conn
      }
    };

    get_avoidance(&conn, max_bridge_len)
  }

  fn report_unroutable(&mut self, node: &Node) {
    let glvl = ground_level(self.sm) as f32;
    let mut dst = *node;
    dst.pos.z = glvl;
    dst.weight += node.pos.z - glvl;

    if self.try_ground_connection(node, &dst) {
      return;
    }

    warn!(
      "cannot route junction at {} {} {}",
      node.pos.x, node.pos.y, node.pos.z
    );

    self.discard_roots.push(node.id);
  }

  fn is_valid(&self) -> bool {
    !self.builder.ctl().stop_condition()
  }
}

fn get_avoidance(conn: &GroundConnection, maxdist: f32) -> Option<Vec3> {
  if !conn.is_valid() {
    return None;
  }

  if conn.path.len() > 1 {
    Some(conn.path[1].pos.as_vec3())
  } else {
    let mut pbeg = conn.path[0].pos.as_vec3();
    let pend = conn.pillar_base.as_ref().unwrap().pos.as_vec3();
    pbeg.z = (pbeg.z - maxdist).max(pend.z);

    Some(pbeg)
  }
}

/// Run the branching-tree generator. Returns the indices of support
/// points that could not be routed.
pub fn create_branching_tree(
  builder: &SupportTreeBuilder,
  sm: &SupportableMesh,
) -> Result<Vec<usize>, Error> {
  let nondup = non_duplicate_support_indices(&sm.points, 0.1);

  let ctl = builder.ctl();
  let heads: Vec<_> = nondup
    .par_iter()
    .map(|&idx| {
      if ctl.stop_condition() {
        None
      } else {
        calculate_pinhead_placement(sm, idx)
      }
    })
    .collect();

  if builder.ctl().stop_condition() {
    return Err(Error::Cancelled);
  }

  // Leaves stand in for the head junctions; branching head ids are leaf
  // indices, not support point indices.
  let mut unroutable = Vec::new();
  let mut leaves = Vec::with_capacity(nondup.len());
  let mut leaf_to_support = Vec::with_capacity(nondup.len());
  for (i, head) in heads.into_iter().enumerate() {
    match head {
      Some(mut head) => {
        head.id = leaves.len() as i64;
        leaves.push(Node::new(
          head.junction_point().as_vec3(),
          head.r_back_mm as f32,
        ));
        leaf_to_support.push(nondup[i]);
        builder.add_head(head.id as usize, head);
      }
      None => unroutable.push(nondup[i]),
    }
  }

  let its = sm.query.mesh();
  let props = Properties::default()
    .bed_shape(vec![make_bed_poly(&its.vertices)])
    .ground_level(ground_level(sm))
    .max_slope(sm.cfg.bridge_slope)
    .max_branch_length(sm.cfg.max_bridge_length_mm);

  let meshpts = if sm.cfg.ground_facing_only {
    Vec::new()
  } else {
    sample_mesh(&its.vertices, &its.indices, props.get_sampling_radius())
  };

  let mut bedpts = sample_bed(
    props.get_bed_shape(),
    props.get_ground_level() as f32,
    props.get_sampling_radius(),
  );
  for bp in &mut bedpts {
    bp.r_min = sm.cfg.head_back_radius_mm as f32;
  }

  let mut cloud = PointCloud::new(meshpts, bedpts, leaves, props);
  let mut vbuilder = BranchingTreeBuilder::new(builder, sm);

  // Precompute the avoidance routes of the leaves in parallel; they are
  // cached and reused when the greedy loop reaches for them.
  {
    use branchtree::Builder as _;
    let vb = &vbuilder;
    let max_branch = cloud.properties().get_max_branch_length() as f32;
    cloud.leaves().par_iter().for_each(|leaf| {
      vb.suggest_avoidance(leaf, max_branch);
    });
  }

  branchtree::build_tree(&mut cloud, &mut vbuilder);

  vbuilder.materialize(&cloud);

  for trunk in vbuilder.pillars() {
    if let Some(conn) = vbuilder.ground_conn(trunk.id) {
      build_ground_connection(builder, sm, &conn);
    }
  }

  let unroutable_leaves = vbuilder.unroutable_pinheads.clone();
  for leaf_id in unroutable_leaves {
    builder.with_head_mut(leaf_id as i64, |h| h.invalidate());
    unroutable.push(leaf_to_support[leaf_id]);
  }

  if builder.ctl().stop_condition() {
    return Err(Error::Cancelled);
  }

  unroutable.sort_unstable();
  unroutable.dedup();
  Ok(unroutable)
}

#[cfg(test)]
#[path = "branching_test.rs"]
mod branching_test;
