//! Pillar creation helpers of the default tree.
//!
//! These routines predate the deep ground-route search and are kept for
//! the default pipeline: widening paths for too-thin pillars, the
//! zero-elevation walk that keeps pillars out of the pad gap, and the
//! straight-then-optimised ground routes.

use glam::DVec3;

use crate::builder::SupportTreeBuilder;
use crate::collision::{beam_mesh_hit, BEAM_SAMPLES};
use crate::elements::{DiffBridge, Junction, ID_UNSET};
use crate::geometry::{dir_to_spheric, spheric_to_dir, Ball, Beam, DOWN, EPSILON};
use crate::heads::optimizer_criteria;
use crate::opt::Optimizer;
use crate::support::{ground_level, SupportableMesh};

use std::f64::consts::PI;

/// Order-free hash of an integer pair. Pairs of already interconnected
/// pillars are tracked by this value; the order of the ids must not
/// matter, and the halves must fit in the output type.
pub fn pairhash(a: u32, b: u32) -> u64 {
  let (g, l) = (a.min(b), a.max(b));

  ((g as u64) << 32) + l as u64
}

/// Search for a short diagonal bridge that widens a thin pillar up to
/// `new_radius`, dodging the model on the way.
pub fn search_widening_path(
  sm: &SupportableMesh,
  jp: DVec3,
  dir: DVec3,
  radius: f64,
  new_radius: f64,
) -> Option<DiffBridge> {
  let w = radius + 2. * sm.cfg.head_back_radius_mm;
  let stopval = w + jp.z - ground_level(sm);

  let solver = Optimizer::new(optimizer_criteria(&sm.cfg).stop_score(stopval))
    .seed(0)
    .to_max();

  let (polar, azimuth) = dir_to_spheric(dir);
  let fallback_ratio = radius / sm.cfg.head_back_radius_mm;

  let result = solver.optimize(
    |&[plr, azm, t]| {
      let d = spheric_to_dir(plr, azm);
      let sd = sm.cfg.safety_distance(new_radius);

      let mut score = crate::collision::pinhead_mesh_hit(
        &sm.query, jp, d, radius, new_radius, t, sd,
      )
      .distance;

      // Reward directions whose widened end sees the ground directly.
      let beam = Beam::uniform(jp + t * d, d, new_radius);
      let down = beam_mesh_hit(&sm.query, &beam, BEAM_SAMPLES, sd).distance;

      if score > t && down.is_infinite() {
        score += jp.z - ground_level(sm);
      }

      score
    },
    [polar, azimuth, w],
    [
      (PI - sm.cfg.bridge_slope, PI),
      (-PI, PI),
      (
        radius + sm.cfg.head_back_radius_mm,
        fallback_ratio * sm.cfg.max_bridge_length_mm,
      ),
    ],
  );

  if result.score >= stopval {
    let [plr, azm, t] = result.optimum;
    let endp = jp + t * spheric_to_dir(plr, azm);

    Some(DiffBridge::new(jp, endp, radius, sm.cfg.head_back_radius_mm))
  } else {
    None
  }
}

/// Create a pillar from `junction_pt` down to the ground, minding the gap
/// between the optional pad and the model in zero elevation mode.
/// `source_dir` is the allowed direction of a corrective bridge inserted
/// above the pillar. Returns the pillar id on success.
pub fn create_ground_pillar(
  builder: &SupportTreeBuilder,
  sm: &SupportableMesh,
  junction_pt: DVec3,
  source_dir: DVec3,
  radius: f64,
  end_radius: f64,
  head_id: i64,
) -> Result<i64, ()> {
  let jp = junction_pt;
  let mut endp = jp;
  let mut dir = source_dir;
  let mut radius = radius;
  let mut end_radius = end_radius;

  // Elements are staged while the route is probed and only committed
  // once the whole route down to the ground is validated; a late failure
  // must not leave half a route in the store.
  let mut widening_bridge: Option<DiffBridge> = None;
  let mut corrector_bridge: Option<(DVec3, DVec3)> = None;

  let r2 = |radius: f64, end_radius: f64, z: f64| {
    radius + (end_radius - radius) / (z - ground_level(sm)).max(EPSILON)
  };

  struct Limits {
    can_add_base: bool,
    gndlvl: f64,
    jp_gnd: f64,
    gap_dist: f64,
  }
  let eval_limits = |radius: f64, base_en: bool| {
    let can_add_base = base_en && radius >= sm.cfg.head_back_radius_mm;
    let base_r = if can_add_base { sm.cfg.base_radius_mm } else { 0. };
    let mut gndlvl = ground_level(sm);
    if !can_add_base {
      gndlvl -= sm.cfg.pad_wall_thickness_mm;
    }
    Limits {
      can_add_base,
      gndlvl,
      jp_gnd: gndlvl + if can_add_base { 0. } else { sm.cfg.head_back_radius_mm },
      gap_dist: sm.cfg.pillar_base_safety_distance_mm + base_r + EPSILON,
    }
  };

  let mut lim = eval_limits(radius, true);

  // A mini pillar that is also long wants a widening bridge first.
  if radius < sm.cfg.head_back_radius_mm && jp.z - lim.gndlvl > 20. * radius {
    let diffbr = search_widening_path(sm, jp, dir, radius, sm.cfg.head_back_radius_mm);

    match diffbr {
      Some(diffbr) if diffbr.endp.z > lim.jp_gnd => {
        endp = diffbr.endp;
        radius = diffbr.end_r;
        end_radius = diffbr.end_r;
        dir = diffbr.get_dir();
        widening_bridge = Some(diffbr);
        lim = eval_limits(radius, true);
      }
      _ => return Err(()),
    }
  }

  if sm.cfg.object_elevation_mm < EPSILON {
    // Walk the endpoint sideways until the pillar neither pierces the
    // model nor lands in the pad gap. The corrector bridge reuses the
    // source direction's azimuth at the configured slope.
    let (_, azimuth) = dir_to_spheric(dir);
    let d = spheric_to_dir(PI - sm.cfg.bridge_slope, azimuth);
    let sd = sm.cfg.safety_distance(radius);
    let r_widen = r2(radius, end_radius, endp.z);

    let tmax0 = beam_mesh_hit(
      &sm.query,
      &Beam::new(endp, d, radius, r_widen),
      BEAM_SAMPLES,
      sd,
    )
    .distance;
    let mut tmax = sm.cfg.max_bridge_length_mm.min(tmax0);

    let zd = endp.z - lim.jp_gnd;
    let tmax2 = zd / (1. - sm.cfg.bridge_slope * sm.cfg.bridge_slope).max(EPSILON).sqrt();
    tmax = tmax.min(tmax2);

    let to_floor = |p: DVec3, gndlvl: f64| DVec3::new(p.x, p.y, gndlvl);

    let mut t = 0.;
    let mut nexp = endp;
    let mut dlast;

    let clear = |p: DVec3, lim: &Limits, r_widen: f64| -> (f64, bool) {
      let gap = sm.query.squared_distance(to_floor(p, lim.gndlvl)).sqrt();
      let pillar_free = beam_mesh_hit(
        &sm.query,
        &Beam::new(p, DOWN, radius, r_widen),
        BEAM_SAMPLES,
        sd,
      )
      .distance
      .is_infinite();
      (gap, pillar_free)
    };

    loop {
      let (gap, free) = clear(nexp, &lim, r_widen);
      dlast = gap;
      if (gap >= lim.gap_dist && free) || t >= tmax {
        break;
      }
      t += radius.max(EPSILON);
      nexp = endp + t * d;
    }

    if dlast < lim.gap_dist && lim.can_add_base {
      // No room with a pedestal; retry the walk for a baseless pillar
      // sunk into the pad.
      nexp = endp;
      t = 0.;
      lim = eval_limits(radius, false);

      let zd = endp.z - lim.jp_gnd;
      let tmax2 = zd / (1. - sm.cfg.bridge_slope * sm.cfg.bridge_slope).max(EPSILON).sqrt();
      tmax = tmax.min(tmax2);

      loop {
        let (gap, free) = clear(nexp, &lim, r_widen);
        dlast = gap;
        if (gap >= lim.gap_dist && free) || t >= tmax {
          break;
        }
        t += radius.max(EPSILON);
        nexp = endp + t * d;
      }
    }

    if dlast < lim.gap_dist {
      // Could not walk out of the pad gap; nothing was committed.
      return Err(());
    }

    if t > 0. {
      corrector_bridge = Some((endp, nexp));
      endp = nexp;
    }
  }

  // The route is validated; materialise the staged elements top down.
  let non_head = widening_bridge.is_some() || corrector_bridge.is_some();

  if let Some(diffbr) = widening_bridge {
    let br = builder.add_diffbridge(diffbr.startp, diffbr.endp, diffbr.r, diffbr.end_r);
    if head_id >= 0 {
      builder.with_head_mut(head_id, |h| h.bridge_id = br.id);
    }
    builder.add_junction(diffbr.endp, diffbr.end_r);
  }

  if let Some((startp, nexp)) = corrector_bridge {
    let br = builder.add_bridge(startp, nexp, radius);
    if head_id >= 0 {
      builder.with_head_mut(head_id, |h| h.bridge_id = br.id);
    }
    builder.add_junction(nexp, radius);
  }

  let gp = DVec3::new(endp.x, endp.y, lim.gndlvl);
  let h = endp.z - gp.z;

  let pillar_id = if head_id >= 0 && !non_head {
    builder.add_pillar_for_head(head_id, h)
  } else {
    builder.add_pillar(gp, h, radius, end_radius)
  };

  if pillar_id < 0 {
    return Err(());
  }

  if lim.can_add_base {
    builder.add_pillar_base(pillar_id, sm.cfg.base_height_mm, sm.cfg.base_radius_mm);
  }

  Ok(pillar_id)
}

/// Drop a pillar from `j` to the ground, walking the foot point along
/// `dir` while the straight drop is obstructed.
pub fn connect_to_ground(
  builder: &SupportTreeBuilder,
  sm: &SupportableMesh,
  j: &Junction,
  dir: DVec3,
  end_r: f64,
) -> Result<i64, ()> {
  let hjp = j.pos;
  let r = j.r;
  let sd = sm.cfg.safety_distance(r);
  let r2 = j.r + (end_r - j.r) / (j.pos.z - ground_level(sm)).max(EPSILON);

  let t = beam_mesh_hit(
    &sm.query,
    &Beam::new(hjp, dir, r, r2),
    BEAM_SAMPLES,
    sd,
  )
  .distance;
  let t = t.min(sm.cfg.max_bridge_length_mm * r / sm.cfg.head_back_radius_mm);

  let mut d = 0.;
  let mut tdown = 0f64;
  while d < t && {
    tdown = beam_mesh_hit(
      &sm.query,
      &Beam::new(hjp + d * dir, DOWN, r, r2),
      BEAM_SAMPLES,
      sd,
    )
    .distance;
    tdown.is_finite()
  } {
    d += r.max(EPSILON);
  }

  if tdown.is_finite() {
    return Err(());
  }

  let endp = hjp + d * dir;
  let pillar_id = create_ground_pillar(builder, sm, endp, dir, r, end_r, ID_UNSET)?;

  builder.add_bridge(hjp, endp, r);
  builder.add_junction(endp, r);

  Ok(pillar_id)
}

/// Ground route for a junction: try the straight drop, then optimise the
/// bridge direction out of a cavity.
pub fn search_ground_route(
  builder: &SupportTreeBuilder,
  sm: &SupportableMesh,
  j: &Junction,
  end_radius: f64,
  init_dir: DVec3,
) -> Result<i64, ()> {
  let down_dst = j.pos.z - ground_level(sm);

  if let Ok(id) = connect_to_ground(builder, sm, j, init_dir, end_radius) {
    return Ok(id);
  }

  // The straight path failed; search for a direction out of the cavity.
  let (polar, azimuth) = dir_to_spheric(init_dir);
  let sd = sm.cfg.safety_distance(j.r);

  let solver = Optimizer::new(optimizer_criteria(&sm.cfg).stop_score(1e6))
    .seed(0)
    .to_max();

  let result = solver.optimize(
    |&[plr, azm]: &[f64; 2]| {
      let n = spheric_to_dir(plr, azm);
      let beam = Beam::between(
        Ball { p: j.pos, r: j.r },
        Ball {
          p: j.pos + down_dst * n,
          r: end_radius,
        },
      );
      beam_mesh_hit(&sm.query, &beam, BEAM_SAMPLES, sd).distance
    },
    [polar, azimuth],
    [(PI - sm.cfg.bridge_slope, PI), (-PI, PI)],
  );

  let [plr, azm] = result.optimum;
  let bridge_dir = spheric_to_dir(plr, azm);

  connect_to_ground(builder, sm, j, bridge_dir, end_radius)
}

#[cfg(test)]
#[path = "pillaring_test.rs"]
mod pillaring_test;
