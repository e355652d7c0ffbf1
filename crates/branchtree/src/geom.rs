//! Support-cone predicates and the merge-point solver.

use glam::{vec2, vec3, Vec3};

use crate::EPSILON;

/// True iff the straight line from `supp` to `pt` deviates from straight
/// down by more than `angle`.
///
/// The comparison is done on signed squared sines so the predicate stays
/// exact without a square root.
pub fn is_outside_support_cone(supp: Vec3, pt: Vec3, angle: f32) -> bool {
  let d = (pt - supp).as_dvec3();
  let dot_sq = -d.z * d.z.abs();
  let c = (angle as f64).cos();

  dot_sq < d.length_squared() * c * c.abs()
}

/// Find the point below `a` and `b` from which two cones of half-angle
/// `π/2 - critical_angle` emanate through both points.
///
/// The problem reduces to 2D in the vertical plane containing `a` and `b`:
/// each point casts a downward ray whose slope is saturated to the critical
/// angle, and the result is the intersection of the two rays. Returns `None`
/// when the rays do not intersect below the points.
pub fn find_merge_pt(a: Vec3, b: Vec3, critical_angle: f32) -> Option<Vec3> {
  let planar = vec2(b.x - a.x, b.y - a.y);
  let planar_len = planar.length();

  if planar_len < EPSILON {
    // Identical or vertically stacked points merge at the lower one.
    return Some(if a.z <= b.z { a } else { b });
  }

  // 2D frame: X along the horizontal direction from a to b, Y is world Z.
  // 'a' maps to the origin, so only b needs transforming.
  let dir = planar / planar_len;
  let b2 = vec2(planar_len, b.z - a.z);

  // Signed squared sine of the ray from a towards b. The sign of the
  // original sine must survive the squaring, hence the abs() factor.
  let b_sqn = b2.length_squared();
  let sin2sig_a = if b_sqn > EPSILON {
    (b2.y * b2.y.abs()) / b_sqn
  } else {
    0.
  };
  // The ray from b to a has the opposite squared sine.
  let sin2sig_b = -sin2sig_a;

  // Saturate both rays to the critical downward slope. Downward rays have
  // negative angles, so saturation is a min() against -sin².
  let sincrit = critical_angle.sin();
  let sin2crit = -sincrit * sincrit;
  let sin2sig_a = sin2sig_a.min(sin2crit);
  let sin2sig_b = sin2sig_b.min(sin2crit);

  let sin2_a = sin2sig_a.abs();
  let sin2_b = sin2sig_b.abs();
  let cos2_a = 1. - sin2_a;
  let cos2_b = 1. - sin2_b;

  // Direction vectors restored from the squared values with original signs.
  let da = vec2(cos2_a.sqrt().copysign(b2.x), sin2_a.sqrt().copysign(sin2sig_a));
  let db = vec2(
    -cos2_b.sqrt().copysign(b2.x),
    sin2_b.sqrt().copysign(sin2sig_b),
  );

  // Intersect the rays ((0, 0), da) and (b2, db).
  let denom = da.x * db.y - da.y * db.x;
  if denom.abs() < f32::EPSILON {
    return None;
  }

  let t1 = (db.y * b2.x - b2.y * db.x) / denom;
  if !t1.is_finite() || t1 < 0. {
    return None;
  }

  let mp = t1 * da;
  Some(a + vec3(dir.x * mp.x, dir.y * mp.x, mp.y))
}

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;
