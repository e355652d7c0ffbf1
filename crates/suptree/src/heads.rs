//! Pinhead and anchor placement.
//!
//! Given a support point and the local surface normal, find a pose for the
//! pinhead that does not collide with the model. The normal gives the
//! starting direction; if the default pose collides, the direction and the
//! shaft width are optimised within the slope limits, and as a last resort
//! the head retries with the fallback back radius. Failure is not an
//! error, it simply means "no pinhead here".

use glam::{DVec3, Vec3};
use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::collision::pinhead_mesh_hit;
use crate::config::{SupportConfig, SupportPoint};
use crate::elements::{Anchor, Head, Junction};
use crate::geometry::{dir_to_spheric, dirv, spheric_to_dir};
use crate::opt::{Optimizer, StopCriteria};
use crate::support::{ground_level, SupportableMesh};

use std::f64::consts::PI;

pub fn optimizer_criteria(cfg: &SupportConfig) -> StopCriteria {
  StopCriteria::default()
    .rel_score_diff(cfg.optimizer_rel_score_diff)
    .max_iterations(cfg.optimizer_max_iterations)
}

/// Adjust `head` in place until it fits, or report that it cannot.
pub fn optimize_pinhead_placement(sm: &SupportableMesh, head: &mut Head) -> bool {
  let n = sm.query.normal_at(head.pos);

  // The surface normal in spherical coordinates; the polar angle gets
  // saturated so the head never exceeds the bridge slope, then the
  // direction is reassembled.
  let (polar, azimuth) = dir_to_spheric(n);

  // Skip if the tilt is not sane.
  if polar < PI - sm.cfg.normal_cutoff_angle {
    return false;
  }

  let polar = polar.max(PI - sm.cfg.bridge_slope);

  let back_r = head.r_back_mm;
  let pin_r = head.r_pin_mm;
  let hp = head.pos;

  let (lmin, lmax) = if back_r < sm.cfg.head_back_radius_mm {
    // Fallback-radius retry: allow a very short shaft.
    (0., sm.cfg.head_penetration_mm)
  } else {
    (sm.cfg.head_width_mm, sm.cfg.head_width_mm)
  };

  // The distance needed for a pinhead to not collide with the model.
  let w = lmin + 2. * back_r + 2. * sm.cfg.head_front_radius_mm - sm.cfg.head_penetration_mm;

  let sd = sm.cfg.safety_distance(back_r);

  let mut nn = spheric_to_dir(polar, azimuth);
  let mut width = lmin;
  let mut t = pinhead_mesh_hit(&sm.query, hp, nn, pin_r, back_r, width, sd).distance;

  if t < w {
    // There might be a viable direction close to the default that does
    // not collide with the model.
    let solver = Optimizer::new(
      optimizer_criteria(&sm.cfg)
        .stop_score(w)
        .max_iterations(100),
    )
    .seed(0)
    .to_max();

    let result = solver.optimize(
      |&[plr, azm, l]| {
        let dir = spheric_to_dir(plr, azm);
        pinhead_mesh_hit(&sm.query, hp, dir, pin_r, back_r, l, sd).distance
      },
      [polar, azimuth, (lmin + lmax) / 2.],
      [
        (PI - sm.cfg.bridge_slope, PI),
        (-PI, PI),
        (lmin, lmax),
      ],
    );

    if result.score > w {
      let [plr, azm, l] = result.optimum;
      nn = spheric_to_dir(plr, azm);
      width = l;
      t = result.score;
    }
  }

  if t > w && hp.z + w * nn.z >= ground_level(sm) {
    head.dir = nn;
    head.width_mm = width;
    head.r_back_mm = back_r;

    true
  } else if back_r > sm.cfg.head_fallback_radius_mm {
    head.r_back_mm = sm.cfg.head_fallback_radius_mm;
    optimize_pinhead_placement(sm, head)
  } else {
    false
  }
}

/// A fitted head for the given support point, if one exists.
pub fn calculate_pinhead_placement(sm: &SupportableMesh, suppt_idx: usize) -> Option<Head> {
  let sp = sm.points.get(suppt_idx)?;

  let mut head = Head::new(
    sm.cfg.head_back_radius_mm,
    sp.head_front_radius as f64,
    0.,
    sm.cfg.head_penetration_mm,
    DVec3::ZERO,
    sp.pos.as_dvec3(),
  );

  if optimize_pinhead_placement(sm, &mut head) {
    head.id = suppt_idx as i64;
    Some(head)
  } else {
    None
  }
}

/// Pose search for a reverse pinhead fastening a branch into the model at
/// `anchor.pos`, fed by a bridge arriving from `from`.
pub fn optimize_anchor_placement(
  sm: &SupportableMesh,
  from: &Junction,
  anchor: &mut Anchor,
) -> bool {
  let n = sm.query.normal_at(anchor.0.pos);

  let (polar, azimuth) = dir_to_spheric(n);

  // Anchors point into the surface; saturate against the slope limit from
  // the upper side.
  let polar = polar.min(sm.cfg.bridge_slope);

  let lmin = 0.;
  let lmax = sm
    .cfg
    .head_width_mm
    .min(from.pos.distance(anchor.0.pos) - 2. * from.r)
    .max(lmin);

  let sd = sm.cfg.safety_distance(anchor.0.r_back_mm);
  let stop_score = anchor.fullwidth();

  let solver = Optimizer::new(
    optimizer_criteria(&sm.cfg)
      .stop_score(stop_score)
      .max_iterations(100),
  )
  .seed(0)
  .to_max();

  let pos = anchor.0.pos;
  let (pin_r, back_r) = (anchor.0.r_pin_mm, anchor.0.r_back_mm);
  let result = solver.optimize(
    |&[plr, azm, l]| {
      let dir = spheric_to_dir(plr, azm);
      pinhead_mesh_hit(&sm.query, pos, dir, pin_r, back_r, l, sd).distance
    },
    [polar, azimuth, (lmin + lmax) / 2.],
    [(0., sm.cfg.bridge_slope), (-PI, PI), (lmin, lmax)],
  );

  let [plr, azm, l] = result.optimum;
  anchor.0.dir = spheric_to_dir(plr, azm);
  anchor.0.width_mm = l;

  result.score >= anchor.fullwidth()
}

/// An anchor near `to_hint`, reachable from the junction `from`. Returns
/// `None` when neither the nominal nor the fallback radius fits; a
/// questionable anchor is never committed.
pub fn calculate_anchor_placement(
  sm: &SupportableMesh,
  from: &Junction,
  to_hint: DVec3,
) -> Option<Anchor> {
  let back_r = from.r;
  let pin_r = sm.cfg.head_front_radius_mm;
  let penetration = sm.cfg.head_penetration_mm;
  let hwidth = sm.cfg.head_width_mm;
  let bridge_dir = dirv(from.pos, to_hint);

  let mut anchor = Anchor::new(back_r, pin_r, hwidth, penetration, -bridge_dir, to_hint);

  if optimize_anchor_placement(sm, from, &mut anchor) {
    return Some(anchor);
  }

  // Retry with the fallback strut radius as a last resort.
  anchor.0.r_back_mm = sm.cfg.head_fallback_radius_mm;
  if optimize_anchor_placement(sm, from, &mut anchor) {
    return Some(anchor);
  }

  None
}

/// Indices of the support points that survive duplicate filtering: points
/// closer than `eps` to an earlier point are dropped.
pub fn non_duplicate_support_indices(points: &[SupportPoint], eps: f32) -> Vec<usize> {
  let mut tree: RTree<GeomWithData<[f32; 3], usize>> = RTree::new();
  let mut keep = Vec::with_capacity(points.len());

  for (i, p) in points.iter().enumerate() {
    let pos: Vec3 = p.pos;
    let nearest = tree.nearest_neighbor(&[pos.x, pos.y, pos.z]);
    let dup = nearest.is_some_and(|el| {
      let q = el.geom();
      let d2 = (q[0] - pos.x).powi(2) + (q[1] - pos.y).powi(2) + (q[2] - pos.z).powi(2);
      d2 < eps * eps
    });

    if !dup {
      keep.push(i);
      tree.insert(GeomWithData::new([pos.x, pos.y, pos.z], i));
    }
  }

  keep
}

#[cfg(test)]
#[path = "heads_test.rs"]
mod heads_test;
