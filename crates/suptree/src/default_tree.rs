//! The deterministic support-tree pipeline.
//!
//! Five stages run in sequence:
//!
//! 1. `add_pinheads` - fit a pinhead to every usable support point.
//! 2. `classify` - split heads into ground facing and model facing, and
//!    group the ground facing ones into proximity clusters.
//! 3. `routing_to_ground` - elect one pillar per cluster and bridge the
//!    remaining heads to it, or give them pillars of their own.
//! 4. `routing_to_model` - fasten the model facing heads to the surface
//!    below them with reverse pinheads.
//! 5. `interconnect_pillars` - stabilise nearby pillar pairs with
//!    cross bridges.
//!
//! Any stage may be cancelled externally; between heads the cancel
//! predicate is polled and the builder is left consistent but partial.
//! Heads that cannot be routed are invalidated and reported, never built
//! halfway.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use glam::DVec3;
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use tracing::{debug, warn};

use crate::builder::SupportTreeBuilder;
use crate::collision::{beam_mesh_hit, BEAM_SAMPLES};
use crate::elements::{Head, Junction};
use crate::error::Error;
use crate::geometry::{Beam, DOWN, EPSILON};
use crate::heads::{
  calculate_anchor_placement, calculate_pinhead_placement, non_duplicate_support_indices,
};
use crate::pillaring::{create_ground_pillar, pairhash};
use crate::support::{ground_level, SupportableMesh};

// Cross-link cap per pillar pair, to keep the load distribution sane.
const MAX_CROSS_LINKS: usize = 3;
// Distance under which two support points count as one.
const DUPLICATE_EPS: f32 = 0.1;

type PillarIndex = RTree<GeomWithData<[f32; 3], i64>>;

pub struct DefaultTree<'a> {
  sm: &'a SupportableMesh,
  builder: &'a SupportTreeBuilder,

  // Support points with a fitted pinhead, by head id.
  iheads: Vec<i64>,
  iheads_onmodel: Vec<i64>,

  // Distance of the vertical scan below each head junction.
  ground_scans: HashMap<i64, f64>,

  // Clusters of ground-facing heads that can share one pillar.
  pillar_clusters: Vec<Vec<i64>>,

  // Start points of the committed pillars, for bridge targets.
  pillar_index: Mutex<PillarIndex>,

  unroutable: Vec<usize>,
}

/// Run the whole pipeline on `builder`. Returns the indices of support
/// points that could not be routed.
pub fn create_default_tree(
  builder: &SupportTreeBuilder,
  sm: &SupportableMesh,
) -> Result<Vec<usize>, Error> {
  DefaultTree::new(builder, sm).execute()
}

impl<'a> DefaultTree<'a> {
  pub fn new(builder: &'a SupportTreeBuilder, sm: &'a SupportableMesh) -> Self {
    Self {
      sm,
      builder,
      iheads: Vec::new(),
      iheads_onmodel: Vec::new(),
      ground_scans: HashMap::new(),
      pillar_clusters: Vec::new(),
      pillar_index: Mutex::new(RTree::new()),
      unroutable: Vec::new(),
    }
  }

  pub fn execute(mut self) -> Result<Vec<usize>, Error> {
    let stages: [(&str, fn(&mut Self)); 5] = [
      ("add_pinheads", Self::add_pinheads),
      ("classify", Self::classify),
      ("routing_to_ground", Self::routing_to_ground),
      ("routing_to_model", Self::routing_to_model),
      ("interconnect_pillars", Self::interconnect_pillars),
    ];

    for (phase, (name, stage)) in stages.iter().enumerate() {
      if self.cancelled() {
        return Err(Error::Cancelled);
      }
      debug!(stage = *name, "support tree stage");
      self
        .builder
        .ctl()
        .progress(phase as u8, phase as u32, stages.len() as u32);
      stage(&mut self);
    }

    if self.cancelled() {
      return Err(Error::Cancelled);
    }

    self.unroutable.sort_unstable();
    Ok(self.unroutable)
  }

  fn cancelled(&self) -> bool {
    self.builder.ctl().stop_condition()
  }

  fn drop_head(&mut self, head_id: i64) {
    self.builder.with_head_mut(head_id, |h| h.invalidate());
    self.unroutable.push(head_id as usize);
    warn!(support_point = head_id, "cannot route support point");
  }

  // Stage 1: fit pinheads in parallel, commit the survivors.
  fn add_pinheads(&mut self) {
    let nondup = non_duplicate_support_indices(&self.sm.points, DUPLICATE_EPS);

    let ctl = self.builder.ctl();
    let fitted: Vec<Option<Head>> = nondup
      .par_iter()
      .map(|&idx| {
        if ctl.stop_condition() {
          None
        } else {
          calculate_pinhead_placement(self.sm, idx)
        }
      })
      .collect();

    for (idx, head) in nondup.iter().zip(fitted) {
      match head {
        Some(head) => {
          self.builder.add_head(*idx, head);
          self.iheads.push(*idx as i64);
        }
        None if !self.cancelled() => self.unroutable.push(*idx),
        None => (),
      }
    }
  }

  // Stage 2: scan straight down from every head junction; a clear path
  // means the head can carry a pillar. Ground-facing heads cluster by
  // junction proximity.
  fn classify(&mut self) {
    let gndlvl = ground_level(self.sm);
    let mut ground_heads = Vec::new();

    for &id in &self.iheads {
      if self.cancelled() {
        return;
      }

      let Some(head) = self.builder.head(id) else {
        continue;
      };
      let jp = head.junction_point();

      let hit = self.sm.query.ray_hit(jp, DOWN);
      self.ground_scans.insert(id, hit.distance);

      if hit.distance > jp.z - gndlvl {
        ground_heads.push(id);
      } else {
        self.iheads_onmodel.push(id);
      }
    }

    self.pillar_clusters = self.cluster_heads(&ground_heads);
  }

  fn cluster_heads(&self, head_ids: &[i64]) -> Vec<Vec<i64>> {
    let mut index: RTree<GeomWithData<[f32; 3], i64>> = RTree::new();
    let mut junctions = HashMap::new();
    for &id in head_ids {
      if let Some(head) = self.builder.head(id) {
        let jp = head.junction_point().as_vec3();
        index.insert(GeomWithData::new([jp.x, jp.y, jp.z], id));
        junctions.insert(id, jp);
      }
    }

    let link_dist = self.sm.cfg.max_pillar_link_distance_mm as f32;
    let mut visited: HashSet<i64> = HashSet::new();
    let mut clusters = Vec::new();

    for &seed in head_ids {
      if visited.contains(&seed) || !junctions.contains_key(&seed) {
        continue;
      }

      let mut cluster = Vec::new();
      let mut queue = vec![seed];
      visited.insert(seed);

      while let Some(id) = queue.pop() {
        cluster.push(id);
        let jp = junctions[&id];
        for el in index.locate_within_distance([jp.x, jp.y, jp.z], link_dist * link_dist) {
          if visited.insert(el.data) {
            queue.push(el.data);
          }
        }
      }

      cluster.sort_unstable();
      clusters.push(cluster);
    }

    clusters
  }

  // Stage 3: one pillar per cluster, side heads bridge to it when the
  // slope and the bridge cap allow, and fall back to pillars of their
  // own.
  fn routing_to_ground(&mut self) {
    let clusters = std::mem::take(&mut self.pillar_clusters);

    for cluster in &clusters {
      if self.cancelled() {
        return;
      }

      let Some(&central) = self.elect_central(cluster) else {
        continue;
      };

      let central_pillar = self.route_head_to_ground(central);

      for &id in cluster.iter().filter(|&&id| id != central) {
        if self.cancelled() {
          return;
        }

        let bridged = central_pillar
          .map(|pid| self.connect_to_nearpillar(id, pid))
          .unwrap_or(false)
          || self.search_pillar_and_connect(id);

        if !bridged && self.route_head_to_ground(id).is_none() {
          self.drop_head(id);
        }
      }

      if central_pillar.is_none() {
        self.drop_head(central);
      }
    }
  }

  fn elect_central<'c>(&self, cluster: &'c [i64]) -> Option<&'c i64> {
    let mut centroid = DVec3::ZERO;
    let mut count = 0.;
    for &id in cluster {
      if let Some(h) = self.builder.head(id) {
        centroid += h.junction_point();
        count += 1.;
      }
    }
    if count == 0. {
      return None;
    }
    centroid /= count;

    cluster.iter().min_by(|&&a, &&b| {
      let da = self
        .builder
        .head(a)
        .map(|h| h.junction_point().distance_squared(centroid))
        .unwrap_or(f64::INFINITY);
      let db = self
        .builder
        .head(b)
        .map(|h| h.junction_point().distance_squared(centroid))
        .unwrap_or(f64::INFINITY);
      da.total_cmp(&db)
    })
  }

  fn route_head_to_ground(&self, head_id: i64) -> Option<i64> {
    let head = self.builder.head(head_id)?;

    let pid = create_ground_pillar(
      self.builder,
      self.sm,
      head.junction_point(),
      head.dir,
      head.r_back_mm,
      head.r_back_mm,
      head_id,
    )
    .ok()?;

    if let Some(pillar) = self.builder.pillar(pid) {
      let top = pillar.start_point().as_vec3();
      self
        .pillar_index
        .lock()
        .unwrap()
        .insert(GeomWithData::new([top.x, top.y, top.z], pid));
    }

    Some(pid)
  }

  /// Bridge a head sideways onto an existing pillar. The bridge descends
  /// at exactly the configured slope, so the contact point is dictated by
  /// the planar distance.
  fn connect_to_nearpillar(&self, head_id: i64, pillar_id: i64) -> bool {
    let Some(head) = self.builder.head(head_id) else {
      return false;
    };
    let Some(pillar) = self.builder.pillar(pillar_id) else {
      return false;
    };

    if pillar.bridges >= self.sm.cfg.max_bridges_on_pillar {
      return false;
    }

    let jp = head.junction_point();
    let top = pillar.start_point();
    let d_xy = ((jp.x - top.x).powi(2) + (jp.y - top.y).powi(2)).sqrt();
    if d_xy < EPSILON || d_xy > self.sm.cfg.max_bridge_length_mm {
      return false;
    }

    let drop = d_xy / self.sm.cfg.bridge_slope.tan();
    let contact_z = jp.z - drop;
    if contact_z > top.z || contact_z < pillar.endpt.z + self.sm.cfg.base_height_mm {
      return false;
    }

    let bridge_end = DVec3::new(top.x, top.y, contact_z);
    let sd = self.sm.cfg.safety_distance(head.r_back_mm);
    let beam = Beam::between(
      crate::geometry::Ball {
        p: jp,
        r: head.r_back_mm,
      },
      crate::geometry::Ball {
        p: bridge_end,
        r: head.r_back_mm,
      },
    );
    if beam_mesh_hit(&self.sm.query, &beam, BEAM_SAMPLES, sd).distance
      < jp.distance(bridge_end)
    {
      return false;
    }

    self.builder.add_bridge_from_head(head_id, bridge_end);
    self.builder.add_junction(bridge_end, head.r_back_mm);
    self.builder.increment_bridges(pillar_id);

    true
  }

  fn search_pillar_and_connect(&self, head_id: i64) -> bool {
    let Some(head) = self.builder.head(head_id) else {
      return false;
    };
    let jp = head.junction_point().as_vec3();
    let link_dist = self.sm.cfg.max_pillar_link_distance_mm as f32;

    let candidates: Vec<i64> = {
      let index = self.pillar_index.lock().unwrap();
      index
        .nearest_neighbor_iter(&[jp.x, jp.y, jp.z])
        .take_while(|el| {
          let q = el.geom();
          let d2 =
            (q[0] - jp.x).powi(2) + (q[1] - jp.y).powi(2) + (q[2] - jp.z).powi(2);
          d2 <= link_dist * link_dist
        })
        .map(|el| el.data)
        .collect()
    };

    candidates
      .into_iter()
      .any(|pid| self.connect_to_nearpillar(head_id, pid))
  }

  // Stage 4: model-facing heads connect straight down into the surface
  // with a reverse pinhead.
  fn routing_to_model(&mut self) {
    let onmodel = std::mem::take(&mut self.iheads_onmodel);

    for &id in &onmodel {
      if self.cancelled() {
        return;
      }

      if !self.route_head_to_model(id) {
        self.drop_head(id);
      }
    }
  }

  fn route_head_to_model(&self, head_id: i64) -> bool {
    let Some(head) = self.builder.head(head_id) else {
      return false;
    };
    let jp = head.junction_point();
    let Some(&scan) = self.ground_scans.get(&head_id) else {
      return false;
    };
    if !scan.is_finite() {
      return false;
    }

    let hitp = jp + scan * DOWN;
    let from = Junction::new(jp, head.r_back_mm);

    let Some(anchor) = calculate_anchor_placement(self.sm, &from, hitp) else {
      return false;
    };

    let aj = anchor.junction_point();
    let beam = Beam::between(
      crate::geometry::Ball {
        p: jp,
        r: head.r_back_mm,
      },
      crate::geometry::Ball {
        p: aj,
        r: anchor.0.r_back_mm,
      },
    );
    if beam_mesh_hit(&self.sm.query, &beam, BEAM_SAMPLES, 0.).distance < jp.distance(aj) {
      return false;
    }

    self.builder.add_bridge_from_head(head_id, aj);
    self.builder.add_anchor(anchor);

    true
  }

  // Stage 5: zig-zag cross bridges between nearby pillars. Pairs are
  // visited once, tracked by an order-free hash of their ids.
  fn interconnect_pillars(&mut self) {
    let pillars = self.builder.pillars();
    let mut index: RTree<GeomWithData<[f32; 2], i64>> = RTree::new();
    for p in &pillars {
      index.insert(GeomWithData::new([p.endpt.x as f32, p.endpt.y as f32], p.id));
    }

    let link_dist = self.sm.cfg.max_pillar_link_distance_mm;
    let mut checked: HashSet<u64> = HashSet::new();

    for pillar in &pillars {
      if self.cancelled() {
        return;
      }

      let pos = [pillar.endpt.x as f32, pillar.endpt.y as f32];
      for el in index.locate_within_distance(pos, (link_dist * link_dist) as f32) {
        let other_id = el.data;
        if other_id == pillar.id {
          continue;
        }
        if !checked.insert(pairhash(pillar.id as u32, other_id as u32)) {
          continue;
        }
        // Fetch both fresh; earlier pairs may have bumped the link
        // counters.
        if let (Some(a), Some(b)) = (self.builder.pillar(pillar.id), self.builder.pillar(other_id))
        {
          self.interconnect(&a, &b);
        }
      }
    }
  }

  fn interconnect(
    &self,
    a: &crate::elements::Pillar,
    b: &crate::elements::Pillar,
  ) {
    if a.links >= MAX_CROSS_LINKS as u32 || b.links >= MAX_CROSS_LINKS as u32 {
      return;
    }

    let d_xy = ((a.endpt.x - b.endpt.x).powi(2) + (a.endpt.y - b.endpt.y).powi(2)).sqrt();
    if d_xy < EPSILON {
      return;
    }

    let drop = d_xy / self.sm.cfg.bridge_slope.tan();
    let r = a.r_start.min(b.r_start);
    let sd = self.sm.cfg.safety_distance(r);
    let floor = a.endpt.z.max(b.endpt.z) + self.sm.cfg.base_height_mm;

    let mut z = a.start_point().z.min(b.start_point().z) - EPSILON;
    let mut from_a = true;
    let mut added = 0usize;

    while z - drop > floor && added < MAX_CROSS_LINKS {
      let (src, dst) = if from_a { (a, b) } else { (b, a) };
      let startp = DVec3::new(src.endpt.x, src.endpt.y, z);
      let endp = DVec3::new(dst.endpt.x, dst.endpt.y, z - drop);

      let beam = Beam::between(
        crate::geometry::Ball { p: startp, r },
        crate::geometry::Ball { p: endp, r },
      );
      if beam_mesh_hit(&self.sm.query, &beam, BEAM_SAMPLES, sd).distance
        >= startp.distance(endp)
      {
        self.builder.add_crossbridge(startp, endp, r);
        added += 1;
      }

      z -= drop;
      from_a = !from_a;
    }

    if added > 0 {
      self.builder.increment_links(a.id);
      self.builder.increment_links(b.id);
    }
  }
}

#[cfg(test)]
#[path = "default_tree_test.rs"]
mod default_tree_test;
