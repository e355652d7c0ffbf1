use super::*;

use crate::polygon::{scaled, unscaled};

fn rect(w_mm: f64, h_mm: f64) -> ExPolygon {
  ExPolygon::new(Polygon::rectangle(
    IntPoint::from_mm(0., 0.),
    IntPoint::from_mm(w_mm, h_mm),
  ))
}

fn cfg() -> SampleConfig {
  SampleConfig::from_head_diameter(0.4)
}

#[test]
fn test_short_thin_strip_gets_one_point() {
  // A strip shorter than the one-point limit and narrower than the thin
  // width threshold.
  let cfg = cfg();
  let island = rect(unscaled(cfg.max_length_for_one_support_point as i32), 1.);

  let points = sample_island(&island, &cfg);

  assert_eq!(points.len(), 1);
  assert!(island.contains(points[0]));
}

#[test]
fn test_medium_thin_strip_gets_two_points() {
  let cfg = cfg();
  let len_mm = unscaled((0.8 * cfg.max_length_for_two_support_points) as i32);
  let island = rect(len_mm, 1.);

  let points = sample_island(&island, &cfg);

  assert_eq!(points.len(), 2);
  // The two points split the strip around its middle.
  let (a, b) = (points[0], points[1]);
  assert!(a.x != b.x);
  for p in [a, b] {
    assert!(island.contains(p));
  }
}

#[test]
fn test_long_thin_strip_is_sampled_at_intervals() {
  let cfg = cfg();
  let island = rect(40., 1.);

  let points = sample_island(&island, &cfg);

  // Roughly every thin_max_distance.
  let expected = (scaled(40.) as f64 / cfg.thin_max_distance).floor() as usize;
  assert!(points.len() + 1 >= expected, "{} points", points.len());

  // No stretch of the strip longer than twice the spacing goes without
  // a sample.
  let mut xs: Vec<i32> = points.iter().map(|p| p.x).collect();
  xs.sort_unstable();
  for w in xs.windows(2) {
    assert!(((w[1] - w[0]) as f64) < 2. * cfg.thin_max_distance);
  }
}

#[test]
fn test_samples_respect_outline_clearance() {
  let cfg = cfg();
  let island = rect(30., 30.);

  let points = sample_island(&island, &cfg);

  assert!(!points.is_empty());
  for p in &points {
    assert!(island.contains(*p));
    assert!(island.distance_to_outline(p.as_dvec2()) >= cfg.minimal_distance_from_outline - 1.);
  }
}

#[test]
fn test_samples_keep_their_distance() {
  let cfg = cfg();
  let island = rect(30., 30.);

  let points = sample_island(&island, &cfg);

  for (i, a) in points.iter().enumerate() {
    for b in &points[i + 1..] {
      assert!(a.as_dvec2().distance(b.as_dvec2()) >= cfg.head_radius - 1.);
    }
  }
}

#[test]
fn test_sampling_is_deterministic() {
  let cfg = cfg();
  let island = rect(25., 12.);

  let a = sample_island(&island, &cfg);
  let b = sample_island(&island, &cfg);

  assert_eq!(a, b);
}

#[test]
fn test_degenerate_island_yields_nothing() {
  let cfg = cfg();
  let island = ExPolygon::new(Polygon::new(vec![
    IntPoint::new(0, 0),
    IntPoint::new(1000, 0),
  ]));

  assert!(sample_island(&island, &cfg).is_empty());
}
