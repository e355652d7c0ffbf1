//! Configuration, support points, and the job control handle.

use std::sync::Arc;

use glam::Vec3;

use crate::error::Error;

/// All tuneables of the support generator, in millimetres and radians.
#[derive(Clone, Debug)]
pub struct SupportConfig {
  /// Radius of the dull end of a pinhead.
  pub head_back_radius_mm: f64,
  /// Radius of the pinpoint.
  pub head_front_radius_mm: f64,
  /// Depth the pinpoint enters the model.
  pub head_penetration_mm: f64,
  /// Length of the pinhead shaft.
  pub head_width_mm: f64,
  /// Retry radius when the nominal back radius finds no room.
  pub head_fallback_radius_mm: f64,

  /// Maximum deviation from vertical for any bridge.
  pub bridge_slope: f64,
  /// Absolute cap on any node-to-node bridge.
  pub max_bridge_length_mm: f64,
  /// Required clearance between tree and model, at nominal back radius.
  pub safety_distance_mm: f64,

  /// Rate at which the branching-tree radius grows with accumulated
  /// weight.
  pub pillar_widening_factor: f64,
  /// Branch-weight ceiling above which a mesh anchor is refused.
  pub max_weight_on_model_support: f64,
  /// If true, the tree may anchor only to the bed, never to the model.
  pub ground_facing_only: bool,

  /// Height of the object above the physical bed; zero means pad mode.
  pub object_elevation_mm: f64,
  pub base_radius_mm: f64,
  pub base_height_mm: f64,
  /// Min clearance from pedestal perimeter to model in zero-elevation
  /// mode.
  pub pillar_base_safety_distance_mm: f64,
  /// Thickness of the pad walls; thin pillars sink by this much when they
  /// cannot carry a pedestal.
  pub pad_wall_thickness_mm: f64,

  /// Support points on surfaces steeper than this (measured as polar
  /// angle) are rejected outright.
  pub normal_cutoff_angle: f64,
  /// Pillars closer than this may be merged into one cluster or
  /// interconnected.
  pub max_pillar_link_distance_mm: f64,
  /// Cap on side bridges landing on one pillar.
  pub max_bridges_on_pillar: u32,

  pub optimizer_max_iterations: usize,
  pub optimizer_rel_score_diff: f64,
}

impl Default for SupportConfig {
  fn default() -> Self {
    Self {
      head_back_radius_mm: 0.5,
      head_front_radius_mm: 0.2,
      head_penetration_mm: 0.3,
      head_width_mm: 1.0,
      head_fallback_radius_mm: 0.25,
      bridge_slope: std::f64::consts::FRAC_PI_4,
      max_bridge_length_mm: 10.,
      safety_distance_mm: 0.5,
      pillar_widening_factor: 0.5,
      max_weight_on_model_support: 10.,
      ground_facing_only: false,
      object_elevation_mm: 5.,
      base_radius_mm: 2.,
      base_height_mm: 1.,
      pillar_base_safety_distance_mm: 0.5,
      pad_wall_thickness_mm: 2.,
      normal_cutoff_angle: 150. * std::f64::consts::PI / 180.,
      max_pillar_link_distance_mm: 10.,
      max_bridges_on_pillar: 3,
      optimizer_max_iterations: 1000,
      optimizer_rel_score_diff: 1e-6,
    }
  }
}

impl SupportConfig {
  /// Clearance scaled to an actual branch radius; thinner branches may
  /// come proportionally closer to the model.
  pub fn safety_distance(&self, r: f64) -> f64 {
    self.safety_distance_mm * r / self.head_back_radius_mm
  }

  pub fn validate(&self) -> Result<(), Error> {
    let fail = |msg: &str| Err(Error::ConfigInvalid(msg.into()));

    if self.head_back_radius_mm <= 0. || self.head_front_radius_mm <= 0. {
      return fail("head radii must be positive");
    }
    if self.head_front_radius_mm >= self.head_back_radius_mm {
      return fail("the pin radius must stay below the back radius");
    }
    if self.head_fallback_radius_mm <= 0.
      || self.head_fallback_radius_mm > self.head_back_radius_mm
    {
      return fail("fallback radius must be positive and at most the back radius");
    }
    if self.head_width_mm < 0. || self.head_penetration_mm < 0. {
      return fail("head width and penetration must not be negative");
    }
    if self.bridge_slope <= 0. || self.bridge_slope > std::f64::consts::FRAC_PI_2 {
      return fail("bridge slope must lie in (0, pi/2]");
    }
    if self.max_bridge_length_mm < 0. || self.safety_distance_mm < 0. {
      return fail("lengths and distances must not be negative");
    }
    if self.object_elevation_mm < 0. {
      return fail("object elevation must not be negative");
    }
    if self.base_radius_mm < 0. || self.base_height_mm < 0. {
      return fail("pedestal dimensions must not be negative");
    }
    if self.optimizer_max_iterations == 0 {
      return fail("the optimizer needs a positive iteration budget");
    }

    Ok(())
  }
}

pub const SUPPORT_POINT_ISLAND_FLAG: u32 = 0x1;

/// A point on the model surface that needs support.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SupportPoint {
  pub pos: Vec3,
  /// Pinpoint radius requested for this point.
  pub head_front_radius: f32,
  /// Whether the point supports a freshly appearing island.
  pub is_new_island: bool,
}

impl SupportPoint {
  pub fn new(pos: Vec3, head_front_radius: f32) -> Self {
    Self {
      pos,
      head_front_radius,
      is_new_island: false,
    }
  }

  pub fn island(pos: Vec3, head_front_radius: f32) -> Self {
    Self {
      pos,
      head_front_radius,
      is_new_island: true,
    }
  }
}

/// Parse the `x y z r flags` text form, one point per line. Blank lines
/// and `#` comments are accepted.
pub fn parse_support_points(text: &str) -> Result<Vec<SupportPoint>, Error> {
  let mut points = Vec::new();

  for (lineno, line) in text.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }

    let mut fields = line.split_whitespace();
    let mut next_f32 = || -> Option<f32> { fields.next()?.parse().ok() };

    let (Some(x), Some(y), Some(z), Some(r)) = (next_f32(), next_f32(), next_f32(), next_f32())
    else {
      return Err(Error::MalformedSupportPoint(lineno + 1));
    };
    let flags: u32 = match fields.next() {
      Some(f) => f
        .parse()
        .map_err(|_| Error::MalformedSupportPoint(lineno + 1))?,
      None => 0,
    };
    if fields.next().is_some() {
      return Err(Error::MalformedSupportPoint(lineno + 1));
    }

    points.push(SupportPoint {
      pos: Vec3::new(x, y, z),
      head_front_radius: r,
      is_new_island: flags & SUPPORT_POINT_ISLAND_FLAG != 0,
    });
  }

  Ok(points)
}

/// Inverse of [`parse_support_points`].
pub fn format_support_points(points: &[SupportPoint]) -> String {
  let mut out = String::new();
  for p in points {
    let flags = u32::from(p.is_new_island) * SUPPORT_POINT_ISLAND_FLAG;
    out.push_str(&format!(
      "{} {} {} {} {}\n",
      p.pos.x, p.pos.y, p.pos.z, p.head_front_radius, flags
    ));
  }
  out
}

type ProgressFn = dyn Fn(u8, u32, u32) + Send + Sync;
type CancelFn = dyn Fn() -> bool + Send + Sync;

/// Progress and cancellation callbacks injected at build time.
#[derive(Clone)]
pub struct JobController {
  progress: Arc<ProgressFn>,
  cancel: Arc<CancelFn>,
}

impl Default for JobController {
  fn default() -> Self {
    Self {
      progress: Arc::new(|_, _, _| ()),
      cancel: Arc::new(|| false),
    }
  }
}

impl JobController {
  pub fn new(
    progress: impl Fn(u8, u32, u32) + Send + Sync + 'static,
    cancel: impl Fn() -> bool + Send + Sync + 'static,
  ) -> Self {
    Self {
      progress: Arc::new(progress),
      cancel: Arc::new(cancel),
    }
  }

  /// Report stage progress: phase, numerator, denominator.
  pub fn progress(&self, phase: u8, num: u32, den: u32) {
    (self.progress)(phase, num, den);
  }

  /// Polled at algorithmic checkpoints.
  pub fn stop_condition(&self) -> bool {
    (self.cancel)()
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
