//! The support-tree element store.
//!
//! Holds the logical parts of the tree (not meshes) in typed arenas with
//! monotonically assigned ids, plus the bookkeeping linking them: heads to
//! pillars, bridge counters, and so on. The generation algorithms use it
//! as a higher level tool for crafting the final 3D mesh; the merged mesh
//! is produced lazily and cached until the next mutation.
//!
//! All mutators serialise on one mutex, so the generation stages can add
//! elements from parallel loops.

use std::sync::{Arc, Mutex};

use glam::DVec3;

use crate::config::JobController;
use crate::elements::{
  Anchor, Bridge, DiffBridge, Head, Junction, Pedestal, Pillar, ID_UNSET,
};
use crate::mesher;
use crate::mesh::TriangleMesh;

pub const DEFAULT_MESH_STEPS: usize = 45;

#[derive(Default)]
struct Store {
  heads: Vec<Head>,
  // Support-point id to head arena index.
  head_indices: Vec<usize>,
  pillars: Vec<Pillar>,
  junctions: Vec<Junction>,
  bridges: Vec<Bridge>,
  crossbridges: Vec<Bridge>,
  diffbridges: Vec<DiffBridge>,
  pedestals: Vec<Pedestal>,
  anchors: Vec<Anchor>,

  meshcache: Option<(usize, Arc<TriangleMesh>)>,
}

impl Store {
  fn head_slot(&self, id: i64) -> Option<usize> {
    let id = usize::try_from(id).ok()?;
    self
      .head_indices
      .get(id)
      .copied()
      .filter(|&slot| slot != usize::MAX)
  }
}

pub struct SupportTreeBuilder {
  store: Mutex<Store>,
  ctl: JobController,
}

impl Default for SupportTreeBuilder {
  fn default() -> Self {
    Self::new(JobController::default())
  }
}

impl SupportTreeBuilder {
  pub fn new(ctl: JobController) -> Self {
    Self {
      store: Mutex::new(Store::default()),
      ctl,
    }
  }

  pub fn ctl(&self) -> &JobController {
    &self.ctl
  }

  /// Register a head for the given support-point id. Heads share their id
  /// space with the input support points.
  pub fn add_head(&self, id: usize, mut head: Head) -> Head {
    let mut store = self.lock();
    head.id = id as i64;
    if id >= store.head_indices.len() {
      store.head_indices.resize(id + 1, usize::MAX);
    }
    store.head_indices[id] = store.heads.len();
    store.heads.push(head);
    store.meshcache = None;

    head
  }

  pub fn head(&self, id: i64) -> Option<Head> {
    let store = self.lock();
    store.head_slot(id).map(|slot| store.heads[slot])
  }

  /// Mutate a head in place. Returns false when the id is unknown.
  pub fn with_head_mut<F: FnOnce(&mut Head)>(&self, id: i64, f: F) -> bool {
    let mut store = self.lock();
    match store.head_slot(id) {
      Some(slot) => {
        f(&mut store.heads[slot]);
        store.meshcache = None;
        true
      }
      None => false,
    }
  }

  pub fn add_pillar(&self, endpt: DVec3, height: f64, r_start: f64, r_end: f64) -> i64 {
    let mut store = self.lock();
    let id = store.pillars.len() as i64;
    let mut pillar = Pillar::new(endpt, height, r_start, r_end);
    pillar.id = id;
    store.pillars.push(pillar);
    store.meshcache = None;

    id
  }

  /// Place a pillar of the given length directly under a head, and link
  /// the two.
  pub fn add_pillar_for_head(&self, head_id: i64, length: f64) -> i64 {
    let mut store = self.lock();
    let Some(slot) = store.head_slot(head_id) else {
      return ID_UNSET;
    };

    let head = store.heads[slot];
    let endpt = head.junction_point() - DVec3::new(0., 0., length);
    let id = store.pillars.len() as i64;

    let mut pillar = Pillar::new(endpt, length, head.r_back_mm, head.r_back_mm);
    pillar.id = id;
    pillar.starts_from_head = true;
    pillar.start_junction_id = head.id;
    store.pillars.push(pillar);
    store.heads[slot].pillar_id = id;
    store.meshcache = None;

    id
  }

  /// Put a pedestal under an existing pillar.
  pub fn add_pillar_base(&self, pillar_id: i64, height: f64, r_bottom: f64) -> i64 {
    let mut store = self.lock();
    let Ok(pid) = usize::try_from(pillar_id) else {
      return ID_UNSET;
    };
    if pid >= store.pillars.len() {
      return ID_UNSET;
    }

    let pillar = store.pillars[pid];
    let id = store.pedestals.len() as i64;
    let mut pedestal = Pedestal::new(pillar.endpt, height, r_bottom, pillar.r_end);
    pedestal.id = id;
    store.pedestals.push(pedestal);
    store.meshcache = None;

    id
  }

  pub fn add_pedestal(&self, mut pedestal: Pedestal) -> i64 {
    let mut store = self.lock();
    let id = store.pedestals.len() as i64;
    pedestal.id = id;
    store.pedestals.push(pedestal);
    store.meshcache = None;

    id
  }

  pub fn add_junction(&self, pos: DVec3, r: f64) -> Junction {
    let mut store = self.lock();
    let mut junction = Junction::new(pos, r);
    junction.id = store.junctions.len() as i64;
    store.junctions.push(junction);
    store.meshcache = None;

    junction
  }

  pub fn add_bridge(&self, startp: DVec3, endp: DVec3, r: f64) -> Bridge {
    let mut store = self.lock();
    let mut bridge = Bridge::new(startp, endp, r);
    bridge.id = store.bridges.len() as i64;
    store.bridges.push(bridge);
    store.meshcache = None;

    bridge
  }

  /// Bridge leaving a head's junction; records the bridge on the head.
  pub fn add_bridge_from_head(&self, head_id: i64, endp: DVec3) -> Bridge {
    let mut store = self.lock();
    let slot = store.head_slot(head_id).expect("unknown head id");
    let head = store.heads[slot];

    let mut bridge = Bridge::new(head.junction_point(), endp, head.r_back_mm);
    bridge.id = store.bridges.len() as i64;
    store.bridges.push(bridge);
    store.heads[slot].bridge_id = bridge.id;
    store.meshcache = None;

    bridge
  }

  pub fn add_crossbridge(&self, startp: DVec3, endp: DVec3, r: f64) -> Bridge {
    let mut store = self.lock();
    let mut bridge = Bridge::new(startp, endp, r);
    bridge.id = store.crossbridges.len() as i64;
    store.crossbridges.push(bridge);
    store.meshcache = None;

    bridge
  }

  pub fn add_diffbridge(&self, startp: DVec3, endp: DVec3, r: f64, end_r: f64) -> DiffBridge {
    let mut store = self.lock();
    let mut bridge = DiffBridge::new(startp, endp, r, end_r);
    bridge.id = store.diffbridges.len() as i64;
    store.diffbridges.push(bridge);
    store.meshcache = None;

    bridge
  }

  pub fn add_anchor(&self, mut anchor: Anchor) -> i64 {
    let mut store = self.lock();
    let id = store.anchors.len() as i64;
    anchor.0.id = id;
    store.anchors.push(anchor);
    store.meshcache = None;

    id
  }

  pub fn pillar(&self, id: i64) -> Option<Pillar> {
    let store = self.lock();
    usize::try_from(id)
      .ok()
      .and_then(|i| store.pillars.get(i).copied())
  }

  pub fn pillar_count(&self) -> usize {
    self.lock().pillars.len()
  }

  pub fn increment_bridges(&self, pillar_id: i64) {
    let mut store = self.lock();
    if let Ok(i) = usize::try_from(pillar_id) {
      if let Some(p) = store.pillars.get_mut(i) {
        p.bridges += 1;
      }
    }
  }

  pub fn increment_links(&self, pillar_id: i64) {
    let mut store = self.lock();
    if let Ok(i) = usize::try_from(pillar_id) {
      if let Some(p) = store.pillars.get_mut(i) {
        p.links += 1;
      }
    }
  }

  pub fn bridge_count_on(&self, pillar_id: i64) -> u32 {
    self.pillar(pillar_id).map(|p| p.bridges).unwrap_or(0)
  }

  pub fn heads(&self) -> Vec<Head> {
    self.lock().heads.clone()
  }

  pub fn pillars(&self) -> Vec<Pillar> {
    self.lock().pillars.clone()
  }

  pub fn junctions(&self) -> Vec<Junction> {
    self.lock().junctions.clone()
  }

  pub fn bridges(&self) -> Vec<Bridge> {
    self.lock().bridges.clone()
  }

  pub fn crossbridges(&self) -> Vec<Bridge> {
    self.lock().crossbridges.clone()
  }

  pub fn diffbridges(&self) -> Vec<DiffBridge> {
    self.lock().diffbridges.clone()
  }

  pub fn pedestals(&self) -> Vec<Pedestal> {
    self.lock().pedestals.clone()
  }

  pub fn anchors(&self) -> Vec<Anchor> {
    self.lock().anchors.clone()
  }

  /// The merged support mesh (without any pad). Cached until the next
  /// mutation.
  pub fn merged_mesh(&self, steps: usize) -> Arc<TriangleMesh> {
    let mut store = self.lock();

    if let Some((cached_steps, mesh)) = &store.meshcache {
      if *cached_steps == steps {
        return Arc::clone(mesh);
      }
    }

    let mut merged = TriangleMesh::new();
    for head in store.heads.iter().filter(|h| h.is_valid()) {
      merged.merge(&mesher::head_mesh(head, steps));
    }
    for pillar in &store.pillars {
      merged.merge(&mesher::pillar_mesh(pillar, steps));
    }
    for junction in &store.junctions {
      merged.merge(&mesher::junction_mesh(junction, steps));
    }
    for bridge in &store.bridges {
      merged.merge(&mesher::bridge_mesh(bridge, steps));
    }
    for bridge in &store.crossbridges {
      merged.merge(&mesher::bridge_mesh(bridge, steps));
    }
    for bridge in &store.diffbridges {
      merged.merge(&mesher::diffbridge_mesh(bridge, steps));
    }
    for pedestal in &store.pedestals {
      merged.merge(&mesher::pedestal_mesh(pedestal, steps));
    }
    for anchor in &store.anchors {
      merged.merge(&mesher::anchor_mesh(anchor, steps));
    }

    let mesh = Arc::new(merged);
    store.meshcache = Some((steps, Arc::clone(&mesh)));

    mesh
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
    self.store.lock().unwrap_or_else(|e| e.into_inner())
  }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
