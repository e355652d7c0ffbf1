//! Swept-volume collision tests approximated by ray bundles.
//!
//! A beam (cone frustum) or a pinhead silhouette is sampled by rays spaced
//! around its surface; the reported hit is the closest over the bundle.
//! Rays that start inside the model are re-cast from the outside so that a
//! branch hugging the surface still measures its free length correctly.

use glam::DVec3;
use rayon::prelude::*;

use crate::geometry::{Beam, PointRing, EPSILON};
use crate::mesh::{Hit, MeshQuery};

/// Default ray count for beam casts. Eight suffices for fixed-radius
/// sweeps; the widening strategies of the branching tree need sixteen.
pub const BEAM_SAMPLES: usize = 8;
pub const WIDE_BEAM_SAMPLES: usize = 16;

/// Ray count for pinhead casts. Eight is almost enough, but rare collision
/// cases slip through; sixteen is necessary for correctness at roughly 60%
/// more work.
const PINHEAD_SAMPLES: usize = 16;

fn min_hit(hits: impl IntoIterator<Item = Hit>) -> Hit {
  hits
    .into_iter()
    .min_by(|a, b| a.distance.total_cmp(&b.distance))
    .unwrap_or(Hit::NONE)
}

/// Cast a beam against the mesh with `sd` extra clearance. Returns the
/// smallest free distance over the bundle.
pub fn beam_mesh_hit(mesh: &MeshQuery, beam: &Beam, samples: usize, sd: f64) -> Hit {
  let src = beam.src;
  let dst = beam.src + beam.dir;
  let r_src = beam.r1;
  let r_dst = beam.r2;
  let dir = beam.dir;
  let ring = PointRing::new(dir, samples);

  let cast = |i: usize| -> Hit {
    let p_src = ring.get(i, src, r_src + sd);
    let p_dst = ring.get(i, dst, r_dst + sd);
    let raydir = (p_dst - p_src).normalize_or(dir);

    let hit = mesh.ray_hit(p_src + r_src * raydir, raydir);
    if hit.is_inside {
      if hit.distance > 2. * r_src + sd {
        // The source is buried in the model; there is no free space here
        // at all.
        Hit::blocked()
      } else {
        // Re-cast from the outside of the object.
        let q = p_src + (hit.distance + EPSILON) * raydir;
        mesh.ray_hit(q, raydir)
      }
    } else {
      hit
    }
  };

  if samples >= WIDE_BEAM_SAMPLES {
    min_hit((0..samples).into_par_iter().map(cast).collect::<Vec<_>>())
  } else {
    min_hit((0..samples).map(cast))
  }
}

/// Cast a pinhead silhouette: one ring of rays around the pin sphere, one
/// around the back sphere, fired along the head axis. A head whose pin
/// ring starts inside the model with more than a pin radius of material
/// around it is reported as blocked outright.
pub fn pinhead_mesh_hit(
  mesh: &MeshQuery,
  s: DVec3,
  dir: DVec3,
  r_pin: f64,
  r_back: f64,
  width: f64,
  sd: f64,
) -> Hit {
  let r_pin_sd = r_pin + sd;
  let r_back_sd = r_back + sd;
  let s_pin = s;
  let s_back = s + (r_pin + width + r_back) * dir;
  let ring = PointRing::new(dir, PINHEAD_SAMPLES);

  let cast = |i: usize| -> Hit {
    let ps = ring.get(i, s_pin, r_pin_sd);
    let p = ring.get(i, s_back, r_back_sd);

    // ps is near but not exactly on the mesh; whether it fell inside is
    // detected through the cast itself.
    let n = (p - ps).normalize_or(dir);
    let hit = mesh.ray_hit(ps + sd * n, n);

    if hit.is_inside {
      if hit.distance > r_pin_sd {
        // The support point itself is buried, or there is no room around
        // it whatsoever.
        Hit::blocked()
      } else {
        // Re-cast from outside; double offset because the original ray
        // was offset too.
        mesh.ray_hit(ps + (hit.distance + 2. * sd) * n, n)
      }
    } else {
      hit
    }
  };

  min_hit(
    (0..PINHEAD_SAMPLES)
      .into_par_iter()
      .map(cast)
      .collect::<Vec<_>>(),
  )
}

#[cfg(test)]
#[path = "collision_test.rs"]
mod collision_test;
