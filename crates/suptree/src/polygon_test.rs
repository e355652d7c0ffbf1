use super::*;

fn square(side_mm: f64) -> Polygon {
  let h = scaled(side_mm / 2.);
  Polygon::rectangle(IntPoint::new(-h, -h), IntPoint::new(h, h))
}

#[test]
fn test_scaling_round_trip() {
  assert_eq!(scaled(1.), 1_000_000);
  assert!((unscaled(scaled(12.345)) - 12.345).abs() < 1e-6);
  assert_eq!(scaled(-0.25), -250_000);
}

#[test]
fn test_rectangle_area_and_winding() {
  let sq = square(10.);

  assert!(sq.is_ccw());
  let side = scaled(10.) as f64;
  assert!((sq.area() - side * side).abs() < 1.);
  assert!((sq.perimeter() - 4. * side).abs() < 1.);
}

#[test]
fn test_reverse_flips_winding() {
  let mut sq = square(4.);
  let area = sq.signed_area();

  sq.reverse();

  assert_eq!(sq.signed_area(), -area);
  assert!(!sq.is_ccw());
}

#[test]
fn test_containment() {
  let sq = square(10.);

  assert!(sq.contains(IntPoint::new(0, 0)));
  assert!(sq.contains(IntPoint::from_mm(4.9, -4.9)));
  assert!(!sq.contains(IntPoint::from_mm(5.1, 0.)));
  assert!(!sq.contains(IntPoint::from_mm(0., -7.)));
}

#[test]
fn test_circle_area_approaches_pi_r_squared() {
  let r = scaled(3.) as f64;
  let c = Polygon::circle(IntPoint::new(0, 0), r, 90);

  let expected = std::f64::consts::PI * r * r;
  assert!((c.area() - expected).abs() / expected < 0.01);
}

#[test]
fn test_distance_to_boundary() {
  let sq = square(10.);

  let d = sq.distance_to(dvec2(0., 0.));
  assert!((d - scaled(5.) as f64).abs() < 1.);

  let d = sq.distance_to(IntPoint::from_mm(7., 0.).as_dvec2());
  assert!((d - scaled(2.) as f64).abs() < 1.);
}

#[test]
fn test_expolygon_with_hole() {
  let mut hole = square(4.);
  hole.reverse();
  let ex = ExPolygon::with_holes(square(10.), vec![hole]);

  assert!(ex.contains(IntPoint::from_mm(4., 4.)));
  assert!(!ex.contains(IntPoint::from_mm(0., 0.)));
  assert!(!ex.contains(IntPoint::from_mm(8., 0.)));

  let outer = scaled(10.) as f64;
  let inner = scaled(4.) as f64;
  assert!((ex.area() - (outer * outer - inner * inner)).abs() < 1.);
}

#[test]
fn test_normalize_fixes_windings() {
  // Both rings wound the wrong way round.
  let mut contour = square(10.);
  contour.reverse();
  let hole = square(2.);

  let ex = ExPolygon::with_holes(contour, vec![hole]);

  assert!(ex.contour.is_ccw());
  assert!(!ex.holes[0].is_ccw());
}

#[test]
fn test_distance_inside_hole_ring() {
  let mut hole = square(4.);
  hole.reverse();
  let ex = ExPolygon::with_holes(square(10.), vec![hole]);

  // Between hole edge (2 mm) and contour (5 mm): the hole is nearer.
  let d = ex.distance_to_outline(IntPoint::from_mm(3.0, 0.).as_dvec2());
  assert!((d - scaled(1.) as f64).abs() < 1.);
}

#[test]
fn test_simplified_drops_short_segments() {
  let mut points = square(10.).points;
  // Stutter point right next to a corner.
  points.insert(1, IntPoint::new(points[1].x - 5, points[1].y));
  let p = Polygon::new(points).simplified(scaled(0.001) as f64);

  assert_eq!(p.points.len(), 4);
}
