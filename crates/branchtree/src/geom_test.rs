use super::*;

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

const SLOPE: f32 = FRAC_PI_4;

#[test]
fn test_identical_points_merge_at_themselves() {
  let a = vec3(1.5, -2.0, 3.0);

  let mp = find_merge_pt(a, a, SLOPE).unwrap();

  assert!((mp - a).length() < EPSILON);
}

#[test]
fn test_stacked_points_merge_at_the_lower_one() {
  let a = vec3(0., 0., 0.);
  let b = vec3(0., 0., -1.);

  let mp = find_merge_pt(a, b, SLOPE).unwrap();

  assert!((mp - b).length_squared() < 2. * EPSILON);
}

#[test]
fn test_points_at_different_x_merge_in_the_middle_below() {
  let a = vec3(0., 0., 0.);
  let b = vec3(1., 0., 0.);

  let mp = find_merge_pt(a, b, SLOPE).unwrap();

  let d = ((mp - b).length_squared() - (mp - a).length_squared()).abs();
  assert!(d < EPSILON, "asymmetric merge point: {d}");
  assert!(!is_outside_support_cone(a, mp, SLOPE));
  assert!(!is_outside_support_cone(b, mp, SLOPE));
}

#[test]
fn test_points_at_different_y_merge_in_the_middle_below() {
  let a = vec3(0., 0., 0.);
  let b = vec3(0., 1., 0.);

  let mp = find_merge_pt(a, b, SLOPE).unwrap();

  let d = ((mp - b).length_squared() - (mp - a).length_squared()).abs();
  assert!(d < EPSILON, "asymmetric merge point: {d}");
  assert!(!is_outside_support_cone(a, mp, SLOPE));
  assert!(!is_outside_support_cone(b, mp, SLOPE));
}

#[test]
fn test_subcritical_separation_merges_at_the_lower_point() {
  let a = vec3(-1., -1., -1.);
  let b = vec3(-1.5, -1.5, -2.);

  let mp = find_merge_pt(a, b, SLOPE).unwrap();

  assert!((mp - b).length() < 2. * EPSILON);
}

#[test]
fn test_zero_critical_angle_merges_at_the_midpoint() {
  let a = vec3(-1., -1., -1.);
  let b = vec3(-1.5, -1.5, -1.);

  let mp = find_merge_pt(a, b, EPSILON).unwrap();

  let middle = (a + b) / 2.;
  assert!((mp - middle).length() < 4. * EPSILON);
}

#[test]
fn test_merge_point_is_symmetric() {
  let a = vec3(0.3, 2.0, 1.0);
  let b = vec3(-1.0, 0.5, 0.8);

  let mab = find_merge_pt(a, b, SLOPE).unwrap();
  let mba = find_merge_pt(b, a, SLOPE).unwrap();

  assert!((mab - mba).length() < 1e-4, "{mab} vs {mba}");
}

#[test]
fn test_straight_down_is_inside_every_cone() {
  let apex = vec3(0., 0., 0.);
  for k in 1..10 {
    let below = apex + (k as f32) * vec3(0., 0., -1.);
    for slope_step in 1..9 {
      let slope = slope_step as f32 * FRAC_PI_2 / 10.;
      assert!(!is_outside_support_cone(apex, below, slope));
    }
  }
}

#[test]
fn test_horizontal_offset_is_outside_steep_cones() {
  let apex = vec3(0., 0., 0.);
  let side = vec3(1., 0., -0.2);

  assert!(is_outside_support_cone(apex, side, FRAC_PI_4));
  // A nearly right-angle cone accepts it.
  assert!(!is_outside_support_cone(apex, side, PI / 2. - 0.05));
}
