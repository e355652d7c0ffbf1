//! Searching a route from a junction down to the print bed.
//!
//! The route is parameterised as (polar, azimuth, bridge length): an
//! optional slanted avoidance bridge followed by a strictly vertical
//! pillar. The optimiser drives the Z coordinate of the first collision
//! point towards the ground level; once a route is found, the bridge is
//! brute-force shortened as far as the vertical check allows, which
//! frequently halves it and beats the continuous search alone.

use glam::DVec3;
use smallvec::SmallVec;

use crate::builder::SupportTreeBuilder;
use crate::collision::{beam_mesh_hit, BEAM_SAMPLES, WIDE_BEAM_SAMPLES};
use crate::elements::{Junction, Pedestal, ID_UNSET};
use crate::geometry::{dir_to_spheric, spheric_to_dir, Ball, Beam, DOWN, EPSILON};
use crate::heads::optimizer_criteria;
use crate::opt::Optimizer;
use crate::support::{ground_level, SupportableMesh};

use std::f64::consts::PI;

/// How a branch thickens along its length.
pub trait Widening {
  fn radius(&self, src: &Ball, dir: DVec3, len: f64) -> f64;

  /// Beam sample count appropriate for this strategy.
  fn beam_samples(&self) -> usize {
    BEAM_SAMPLES
  }
}

/// Straight interpolation to a fixed end radius at ground level.
pub struct FixedEndRadius {
  end_radius: f64,
  gndlvl: f64,
}

impl FixedEndRadius {
  pub fn new(sm: &SupportableMesh, end_radius: f64) -> Self {
    Self {
      end_radius,
      gndlvl: ground_level(sm),
    }
  }
}

impl Widening for FixedEndRadius {
  fn radius(&self, src: &Ball, dir: DVec3, len: f64) -> f64 {
    if len < EPSILON {
      return src.r;
    }

    let dst = src.p + len * dir;
    let widening = self.end_radius - src.r;
    let zlen = dst.z - self.gndlvl;
    let full_len = len + zlen;

    src.r + widening * len / full_len
  }
}

/// Accumulative widening of the branching tree: thickness grows with the
/// travelled length.
pub struct DefaultWidening<'a> {
  sm: &'a SupportableMesh,
}

impl<'a> DefaultWidening<'a> {
  const WIDENING_SCALE: f64 = 0.02;

  pub fn new(sm: &'a SupportableMesh) -> Self {
    Self { sm }
  }
}

impl Widening for DefaultWidening<'_> {
  fn radius(&self, src: &Ball, _dir: DVec3, len: f64) -> f64 {
    let w = Self::WIDENING_SCALE * self.sm.cfg.pillar_widening_factor * len;
    src.r.max(self.sm.cfg.head_back_radius_mm) + w
  }

  fn beam_samples(&self) -> usize {
    WIDE_BEAM_SAMPLES
  }
}

/// A validated path from a junction to the bed: the source junction, at
/// most one avoidance junction, and the pedestal. The connection is only
/// usable when the pedestal is present.
#[derive(Clone, Debug, Default)]
pub struct GroundConnection {
  pub path: SmallVec<[Junction; 3]>,
  pub pillar_base: Option<Pedestal>,
}

impl GroundConnection {
  pub fn is_valid(&self) -> bool {
    self.pillar_base.is_some() && !self.path.is_empty()
  }
}

/// Check the route bridge-then-pillar and report where it first touches
/// the model or the ground, whichever comes higher.
pub enum GroundRouteCheck {
  Full,
  PillarOnly,
}

pub fn check_ground_route(
  sm: &SupportableMesh,
  source: &Junction,
  dir: DVec3,
  bridge_len: f64,
  widening: &dyn Widening,
  check: GroundRouteCheck,
) -> DVec3 {
  let samples = widening.beam_samples();
  let sd = sm.cfg.safety_distance(source.r);
  let gndlvl = ground_level(sm);

  // Stop the bridge at ground level if it would span below it.
  let t = (gndlvl - source.pos.z) / dir.z;
  let bridge_len = if t.is_finite() && t >= 0. {
    bridge_len.min(t)
  } else {
    bridge_len
  };

  let bridge_end = source.pos + bridge_len * dir;
  let down_l = bridge_end.z - gndlvl;
  let bridge_r = widening.radius(
    &Ball {
      p: source.pos,
      r: source.r,
    },
    dir,
    bridge_len,
  );

  let bridge_hit_dist = if bridge_len > EPSILON && matches!(check, GroundRouteCheck::Full) {
    // A zero length bridge cannot be beam cast.
    let bridge_beam = Beam::between(
      Ball {
        p: source.pos,
        r: source.r,
      },
      Ball {
        p: bridge_end,
        r: bridge_r,
      },
    );
    beam_mesh_hit(&sm.query, &bridge_beam, samples, sd).distance
  } else {
    bridge_len
  };

  if bridge_hit_dist < bridge_len {
    return source.pos + bridge_hit_dist * dir;
  }

  if down_l > 0. {
    // Check if the pillar can be dropped below the bridge end.
    let gp = DVec3::new(bridge_end.x, bridge_end.y, gndlvl);
    let end_radius = widening.radius(
      &Ball {
        p: bridge_end,
        r: bridge_r,
      },
      DOWN,
      down_l,
    );

    let gnd_beam = Beam::between(
      Ball {
        p: bridge_end,
        r: bridge_r,
      },
      Ball {
        p: gp,
        r: end_radius,
      },
    );
    let gndhit = beam_mesh_hit(&sm.query, &gnd_beam, samples, sd);
    let mut gnd_hit_d = gndhit.distance.min(down_l + EPSILON);

    if source.r >= sm.cfg.head_back_radius_mm
      && gndhit.distance > down_l
      && sm.cfg.object_elevation_mm < EPSILON
    {
      // Zero elevation mode: keep pillars out of the gap between the pad
      // and the model.
      let gap = sm.query.squared_distance(gp).sqrt();
      let base_r = sm.cfg.base_radius_mm.max(end_radius);
      let min_gap = sm.cfg.pillar_base_safety_distance_mm + base_r;

      if gap < min_gap {
        gnd_hit_d = down_l - min_gap + gap;
      }
    }

    return DVec3::new(bridge_end.x, bridge_end.y, bridge_end.z - gnd_hit_d);
  }

  bridge_end
}

/// Global search for a ground connection from `source`, with the given
/// widening strategy.
pub fn deepsearch_ground_connection(
  sm: &SupportableMesh,
  source: &Junction,
  widening: &dyn Widening,
  init_dir: DVec3,
) -> GroundConnection {
  const MAX_ITERATIONS_GLOBAL: usize = 5000;
  const MAX_ITERATIONS_LOCAL: usize = 100;
  const REL_SCORE_DIFF: f64 = 0.05;

  let gndlvl = ground_level(sm);

  // Local searches are quick and inaccurate; the global method only cares
  // about the iteration budget and the stop score (Z down at the ground).
  let criteria = optimizer_criteria(&sm.cfg)
    .max_iterations(MAX_ITERATIONS_GLOBAL)
    .abs_score_diff(f64::NAN)
    .rel_score_diff(f64::NAN)
    .stop_score(gndlvl);

  let criteria_loc = criteria
    .max_iterations(MAX_ITERATIONS_LOCAL)
    .abs_score_diff(EPSILON)
    .rel_score_diff(REL_SCORE_DIFF);

  let solver = Optimizer::new(criteria)
    .set_local_criteria(criteria_loc)
    .seed(0)
    .to_min();

  // Z height of the first collision for a candidate bridge direction and
  // length. Ground level is returned when the route is clear.
  let z_fn = |&[plr, azm, bridge_len]: &[f64; 3]| {
    let n = spheric_to_dir(plr, azm);
    check_ground_route(sm, source, n, bridge_len, widening, GroundRouteCheck::Full).z
  };

  let (plr_init, azm_init) = dir_to_spheric(init_dir);
  let plr_init = plr_init.max(PI - sm.cfg.bridge_slope);

  let bounds = [
    (PI - sm.cfg.bridge_slope, PI),
    (-PI, PI),
    (0., sm.cfg.max_bridge_length_mm),
  ];

  // The optimiser navigates the mesh surface towards lower and lower
  // collision points; the multistart component keeps it out of local
  // minima until it arrives at a ground location.
  let result = solver.optimize(&z_fn, [plr_init, azm_init, 0.], bounds);

  let [plr, azm, bridge_l] = result.optimum;
  let n = spheric_to_dir(plr, azm);

  let t = (gndlvl - source.pos.z) / n.z;
  let mut bridge_l = if t.is_finite() && t >= 0. {
    bridge_l.min(t)
  } else {
    bridge_l
  };

  // The continuous search gave a possible route; shorten the bridge by
  // brute-force queries of a free vertical drop. A constraint inside the
  // optimisation would not converge fast enough to an accurate solution.
  let mut l = 0.;
  let l_max = bridge_l;
  let step = source.r.max(EPSILON);
  let mut zlvl = f64::INFINITY;
  while zlvl > gndlvl && l <= l_max {
    zlvl = check_ground_route(sm, source, n, l, widening, GroundRouteCheck::PillarOnly).z;
    if zlvl <= gndlvl {
      bridge_l = l;
    }
    l += step;
  }

  let bridge_end = source.pos + bridge_l * n;
  let gp = DVec3::new(bridge_end.x, bridge_end.y, gndlvl);

  let src_ball = Ball {
    p: source.pos,
    r: source.r,
  };
  let bridge_r = widening.radius(&src_ball, n, bridge_l);
  let down_l = bridge_end.z - gndlvl;
  let end_radius = widening.radius(
    &Ball {
      p: bridge_end,
      r: bridge_r,
    },
    DOWN,
    down_l,
  );
  let base_r = sm.cfg.base_radius_mm.max(end_radius);

  // Populated from the source and the best result even when the search
  // failed; only the pedestal decides validity.
  let mut conn = GroundConnection::default();
  conn.path.push(*source);
  if bridge_l > EPSILON {
    conn.path.push(Junction::new(bridge_end, bridge_r));
  }

  if z_fn(&[plr, azm, bridge_l]) <= gndlvl {
    conn.pillar_base = Some(Pedestal::new(gp, sm.cfg.base_height_mm, base_r, end_radius));
  }

  conn
}

/// Ground route search with a predefined end radius.
pub fn deepsearch_ground_connection_with_end_radius(
  sm: &SupportableMesh,
  source: &Junction,
  end_radius: f64,
  init_dir: DVec3,
) -> GroundConnection {
  let widening = FixedEndRadius::new(sm, end_radius);
  deepsearch_ground_connection(sm, source, &widening, init_dir)
}

/// Default-widening ground route search.
pub fn deepsearch_ground_connection_default(
  sm: &SupportableMesh,
  source: &Junction,
  init_dir: DVec3,
) -> GroundConnection {
  let widening = DefaultWidening::new(sm);
  deepsearch_ground_connection(sm, source, &widening, init_dir)
}

/// Materialise a validated connection: diff bridges between the path
/// junctions, then the pillar and its pedestal. Returns the pillar id, or
/// [`ID_UNSET`] for an invalid connection.
pub fn build_ground_connection(
  builder: &SupportTreeBuilder,
  sm: &SupportableMesh,
  conn: &GroundConnection,
) -> i64 {
  if !conn.is_valid() {
    return ID_UNSET;
  }

  for pair in conn.path.windows(2) {
    builder.add_diffbridge(pair[0].pos, pair[1].pos, pair[0].r, pair[1].r);
    builder.add_junction(pair[1].pos, pair[1].r);
  }

  let last = conn.path.last().unwrap();
  let base = conn.pillar_base.as_ref().unwrap();

  let mut gp = DVec3::new(last.pos.x, last.pos.y, ground_level(sm));
  let mut h = last.pos.z - gp.z;

  if base.r_top < sm.cfg.head_back_radius_mm {
    // Too thin for a pedestal; sink the pillar into the pad wall instead.
    h += sm.cfg.pad_wall_thickness_mm;
    gp.z -= sm.cfg.pad_wall_thickness_mm;
  }

  let pillar_id = builder.add_pillar(gp, h, last.r, base.r_top);

  if base.r_top >= sm.cfg.head_back_radius_mm {
    builder.add_pillar_base(pillar_id, base.height, base.r_bottom);
  }

  pillar_id
}

#[cfg(test)]
#[path = "ground_test.rs"]
mod ground_test;
