//! Integer-scaled 2D geometry.
//!
//! Robust polygon and Voronoi arithmetic wants discrete input, so the 2D
//! layer works on a fixed integer grid: one unit is a micrometre. All
//! areas and distances returned by this module stay in scaled units.

use glam::{dvec2, DVec2};

/// Fixed-point 2D coordinate: 1 unit = `SCALING_FACTOR` mm.
pub type Coord = i32;

/// Millimetres per coordinate unit.
pub const SCALING_FACTOR: f64 = 1e-6;

pub fn scaled(mm: f64) -> Coord {
  (mm / SCALING_FACTOR).round() as Coord
}

pub fn unscaled(c: Coord) -> f64 {
  c as f64 * SCALING_FACTOR
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IntPoint {
  pub x: Coord,
  pub y: Coord,
}

impl IntPoint {
  pub fn new(x: Coord, y: Coord) -> Self {
    Self { x, y }
  }

  pub fn from_mm(x: f64, y: f64) -> Self {
    Self::new(scaled(x), scaled(y))
  }

  /// Position in scaled units as floats.
  pub fn as_dvec2(self) -> DVec2 {
    dvec2(self.x as f64, self.y as f64)
  }

  pub fn to_mm(self) -> DVec2 {
    dvec2(unscaled(self.x), unscaled(self.y))
  }
}

impl std::ops::Add for IntPoint {
  type Output = IntPoint;
  fn add(self, o: IntPoint) -> IntPoint {
    IntPoint::new(self.x + o.x, self.y + o.y)
  }
}

impl std::ops::Sub for IntPoint {
  type Output = IntPoint;
  fn sub(self, o: IntPoint) -> IntPoint {
    IntPoint::new(self.x - o.x, self.y - o.y)
  }
}

/// A simple closed polygon; the closing segment from the last point back
/// to the first is implicit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Polygon {
  pub points: Vec<IntPoint>,
}

impl Polygon {
  pub fn new(points: Vec<IntPoint>) -> Self {
    Self { points }
  }

  pub fn rectangle(min: IntPoint, max: IntPoint) -> Self {
    Self::new(vec![
      min,
      IntPoint::new(max.x, min.y),
      max,
      IntPoint::new(min.x, max.y),
    ])
  }

  pub fn circle(center: IntPoint, r: f64, segments: usize) -> Self {
    let mut points = Vec::with_capacity(segments);
    for i in 0..segments {
      let phi = 2. * std::f64::consts::PI * i as f64 / segments as f64;
      points.push(IntPoint::new(
        center.x + (r * phi.cos()).round() as Coord,
        center.y + (r * phi.sin()).round() as Coord,
      ));
    }
    Self::new(points)
  }

  pub fn is_empty(&self) -> bool {
    self.points.len() < 3
  }

  /// Signed area in scaled units squared; positive for counterclockwise
  /// winding.
  pub fn signed_area(&self) -> f64 {
    let mut acc: i128 = 0;
    for (a, b) in self.segments() {
      acc += a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128;
    }
    acc as f64 / 2.
  }

  pub fn area(&self) -> f64 {
    self.signed_area().abs()
  }

  pub fn is_ccw(&self) -> bool {
    self.signed_area() > 0.
  }

  pub fn reverse(&mut self) {
    self.points.reverse();
  }

  pub fn perimeter(&self) -> f64 {
    self
      .segments()
      .map(|(a, b)| (b - a).as_dvec2().length())
      .sum()
  }

  pub fn centroid(&self) -> DVec2 {
    let n = self.points.len().max(1) as f64;
    self.points.iter().map(|p| p.as_dvec2()).sum::<DVec2>() / n
  }

  pub fn bounding_box(&self) -> (IntPoint, IntPoint) {
    let mut min = IntPoint::new(Coord::MAX, Coord::MAX);
    let mut max = IntPoint::new(Coord::MIN, Coord::MIN);
    for p in &self.points {
      min.x = min.x.min(p.x);
      min.y = min.y.min(p.y);
      max.x = max.x.max(p.x);
      max.y = max.y.max(p.y);
    }
    (min, max)
  }

  pub fn segments(&self) -> impl Iterator<Item = (IntPoint, IntPoint)> + '_ {
    let n = self.points.len();
    (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
  }

  /// Even-odd containment test.
  pub fn contains(&self, p: IntPoint) -> bool {
    let mut inside = false;
    for (a, b) in self.segments() {
      let crosses = (a.y > p.y) != (b.y > p.y);
      if crosses {
        let t = (p.y - a.y) as f64 / (b.y - a.y) as f64;
        let x = a.x as f64 + t * (b.x - a.x) as f64;
        if p.x as f64 <= x {
          inside = !inside;
        }
      }
    }
    inside
  }

  /// Distance from `p` to the nearest boundary segment, in scaled units.
  pub fn distance_to(&self, p: DVec2) -> f64 {
    let mut best = f64::INFINITY;
    for (a, b) in self.segments() {
      best = best.min(point_segment_distance(p, a.as_dvec2(), b.as_dvec2()));
    }
    best
  }

  /// Drop collinear and nearly coincident points, within `tolerance`
  /// scaled units.
  pub fn simplified(&self, tolerance: f64) -> Polygon {
    let mut out: Vec<IntPoint> = Vec::with_capacity(self.points.len());
    for &p in &self.points {
      if let Some(&last) = out.last() {
        if (p - last).as_dvec2().length() < tolerance {
          continue;
        }
      }
      out.push(p);
    }
    while out.len() > 2
      && (out[0] - *out.last().unwrap()).as_dvec2().length() < tolerance
    {
      out.pop();
    }
    Polygon::new(out)
  }
}

pub fn point_segment_distance(p: DVec2, a: DVec2, b: DVec2) -> f64 {
  let ab = b - a;
  let len2 = ab.length_squared();
  if len2 <= f64::EPSILON {
    return p.distance(a);
  }
  let t = ((p - a).dot(ab) / len2).clamp(0., 1.);
  p.distance(a + t * ab)
}

/// A polygon with holes. The contour is counterclockwise, holes are
/// clockwise; [`ExPolygon::normalize`] establishes that invariant.
#[derive(Clone, Debug, Default)]
pub struct ExPolygon {
  pub contour: Polygon,
  pub holes: Vec<Polygon>,
}

impl ExPolygon {
  pub fn new(contour: Polygon) -> Self {
    Self {
      contour,
      holes: Vec::new(),
    }
  }

  pub fn with_holes(contour: Polygon, holes: Vec<Polygon>) -> Self {
    let mut ret = Self { contour, holes };
    ret.normalize();
    ret
  }

  pub fn normalize(&mut self) {
    if !self.contour.is_ccw() {
      self.contour.reverse();
    }
    for hole in &mut self.holes {
      if hole.is_ccw() {
        hole.reverse();
      }
    }
  }

  pub fn area(&self) -> f64 {
    self.contour.area() - self.holes.iter().map(Polygon::area).sum::<f64>()
  }

  pub fn perimeter(&self) -> f64 {
    self.contour.perimeter() + self.holes.iter().map(Polygon::perimeter).sum::<f64>()
  }

  pub fn contains(&self, p: IntPoint) -> bool {
    self.contour.contains(p) && !self.holes.iter().any(|h| h.contains(p))
  }

  /// Distance to the nearest outline (contour or hole), in scaled units.
  pub fn distance_to_outline(&self, p: DVec2) -> f64 {
    let mut best = self.contour.distance_to(p);
    for hole in &self.holes {
      best = best.min(hole.distance_to(p));
    }
    best
  }

  pub fn rings(&self) -> impl Iterator<Item = &Polygon> {
    std::iter::once(&self.contour).chain(self.holes.iter())
  }

  pub fn segments(&self) -> impl Iterator<Item = (IntPoint, IntPoint)> + '_ {
    self.rings().flat_map(|r| r.segments())
  }
}

#[cfg(test)]
#[path = "polygon_test.rs"]
mod polygon_test;
