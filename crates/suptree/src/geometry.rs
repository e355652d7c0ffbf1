//! Shared geometric helpers: spherical directions, ray rings, balls and
//! beams.

use glam::DVec3;

/// World down direction; pillars and pinheads orient against it.
pub const DOWN: DVec3 = DVec3::new(0., 0., -1.);

/// Numeric fuzz in millimetre computations.
pub const EPSILON: f64 = 1e-6;

pub use branchtree::geom::{find_merge_pt, is_outside_support_cone};

/// Direction vector for the given polar and azimuth angles. Polar is
/// measured from +Z, so `spheric_to_dir(PI, _)` points straight down.
pub fn spheric_to_dir(polar: f64, azimuth: f64) -> DVec3 {
  DVec3::new(
    polar.sin() * azimuth.cos(),
    polar.sin() * azimuth.sin(),
    polar.cos(),
  )
}

/// Polar and azimuth angles of a direction. A zero vector is treated as
/// straight down.
pub fn dir_to_spheric(dir: DVec3) -> (f64, f64) {
  let len = dir.length();
  if len < EPSILON {
    return (std::f64::consts::PI, 0.);
  }

  let polar = (dir.z / len).clamp(-1., 1.).acos();
  let azimuth = dir.y.atan2(dir.x);

  (polar, azimuth)
}

/// Unit direction from `start` towards `end`.
pub fn dirv(start: DVec3, end: DVec3) -> DVec3 {
  (end - start).normalize_or_zero()
}

/// A simple sphere with a center and a radius.
#[derive(Clone, Copy, Debug)]
pub struct Ball {
  pub p: DVec3,
  pub r: f64,
}

/// A set of rays displaced along a cone frustum's surface. `r2` is the
/// radius of the beam one unit further from `src` along `dir`.
#[derive(Clone, Copy, Debug)]
pub struct Beam {
  pub src: DVec3,
  pub dir: DVec3,
  pub r1: f64,
  pub r2: f64,
}

impl Beam {
  pub fn new(src: DVec3, dir: DVec3, r1: f64, r2: f64) -> Self {
    Self { src, dir, r1, r2 }
  }

  pub fn uniform(src: DVec3, dir: DVec3, r: f64) -> Self {
    Self::new(src, dir, r, r)
  }

  /// The beam swept from one ball to another; the radius interpolates
  /// linearly between them.
  pub fn between(src: Ball, dst: Ball) -> Self {
    let d = src.p.distance(dst.p);
    let mut r2 = src.r;
    if d > EPSILON {
      r2 += (dst.r - src.r) / d;
    }

    Self {
      src: src.p,
      dir: dirv(src.p, dst.p),
      r1: src.r,
      r2,
    }
  }
}

/// Points on a 3D circle around an axis through `src`. Index 0 yields `src`
/// itself, the rest are spaced uniformly in azimuth.
pub struct PointRing {
  a: DVec3,
  b: DVec3,
  n: usize,
}

impl PointRing {
  pub fn new(dir: DVec3, n: usize) -> Self {
    // Build an orthonormal frame around the axis; picking the seed axis by
    // the dominant component keeps the cross product well conditioned.
    let seed = if dir.z.abs() > 0.999 { DVec3::X } else { DVec3::Z };
    let a = seed.cross(dir).normalize();
    let b = dir.cross(a);

    Self { a, b, n }
  }

  pub fn len(&self) -> usize {
    self.n
  }

  pub fn is_empty(&self) -> bool {
    self.n == 0
  }

  pub fn get(&self, idx: usize, src: DVec3, r: f64) -> DVec3 {
    if idx == 0 {
      return src;
    }

    let phi = 2. * std::f64::consts::PI * (idx - 1) as f64 / (self.n - 1) as f64;
    let (sinphi, cosphi) = phi.sin_cos();

    src + r * cosphi * self.a + r * sinphi * self.b
  }
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;
