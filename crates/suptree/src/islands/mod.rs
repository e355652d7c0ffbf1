//! Support-point placement on bottom-slice islands.
//!
//! An island is a region of a bottom slice that appears with nothing
//! below it; every point of it must end up within reach of a support.
//! The sampler builds the Voronoi skeleton of the island outline,
//! classifies it into thin and thick regions, lays points along thin
//! branches and fields of points across thick interiors, then relaxes and
//! aligns the result.

pub mod skeleton;
pub mod slice;
pub mod voronoi;

use glam::Vec3;

use crate::config::SupportPoint;
use crate::mesh::TriangleMesh;
use crate::polygon::{scaled, unscaled, ExPolygon, IntPoint};

/// Tuneables of the island sampler. All distances are in scaled
/// coordinates (see [`crate::polygon::SCALING_FACTOR`]).
#[derive(Clone, Debug)]
pub struct SampleConfig {
  /// Sample spacing along thin skeleton branches.
  pub thin_max_distance: f64,
  /// Field spacing inside thick regions; doubles as the coverage radius
  /// the output guarantees.
  pub thick_inner_max_distance: f64,
  /// Sample spacing along the outline of thick regions.
  pub thick_outline_max_distance: f64,
  /// Radius of the support head; no two samples come closer than this.
  pub head_radius: f64,
  pub minimal_distance_from_outline: f64,
  pub maximal_distance_from_outline: f64,
  /// Branches up to this length take a single support point.
  pub max_length_for_one_support_point: f64,
  /// Branches up to this length take two.
  pub max_length_for_two_support_points: f64,
  /// End inset ratio for the two-point rule.
  pub max_length_ratio_for_two_support_points: f64,
  /// Skeleton nodes at most this wide count as thin.
  pub thin_max_width: f64,
  /// Skeleton nodes at least this wide count as thick.
  pub thick_min_width: f64,
  pub min_part_length: f64,
  /// Relaxation converges once no sample moves farther than this.
  pub minimal_move: f64,
  pub count_iteration: usize,
  /// Samples on different branches within this distance are aligned.
  pub max_align_distance: f64,
  pub simplification_tolerance: f64,
}

impl SampleConfig {
  /// Derive the whole parameter set from a support head diameter in
  /// millimetres.
  pub fn from_head_diameter(diameter_mm: f64) -> Self {
    let d = scaled(diameter_mm) as f64;
    Self {
      thin_max_distance: 11.7 * d,
      thick_inner_max_distance: 14.6 * d,
      thick_outline_max_distance: 10.9 * d,
      head_radius: d / 2.,
      minimal_distance_from_outline: d / 2.,
      maximal_distance_from_outline: 3.9 * d,
      max_length_for_one_support_point: 3.7 * d,
      max_length_for_two_support_points: 14.6 * d,
      max_length_ratio_for_two_support_points: 0.25,
      thin_max_width: 9.3 * d,
      thick_min_width: 8. * d,
      min_part_length: 11.7 * d,
      minimal_move: scaled(0.1) as f64,
      count_iteration: 30,
      max_align_distance: 7.3 * d,
      simplification_tolerance: scaled(0.05) as f64,
    }
  }
}

impl Default for SampleConfig {
  fn default() -> Self {
    Self::from_head_diameter(0.5)
  }
}

/// Place support points on one island so that every interior point lies
/// within `thick_inner_max_distance` of a sample, no sample violates the
/// outline clearance, and no two samples come closer than `head_radius`.
pub fn uniform_support_island(island: &ExPolygon, cfg: &SampleConfig) -> Vec<IntPoint> {
  skeleton::sample_island(island, cfg)
}

/// Convenience wrapper: slice the mesh just above its bottom and sample
/// every island of that slice. The returned points lie at the slice
/// level and are flagged as island supports.
pub fn calc_bottom_island_support_points(
  mesh: &TriangleMesh,
  cfg: &SampleConfig,
  head_front_radius: f32,
) -> Vec<SupportPoint> {
  let bb = mesh.bounding_box();
  if !bb.is_valid() {
    return Vec::new();
  }

  let z = bb.min.z as f64 + 0.05;
  let islands = slice::cross_section(mesh, z);

  let mut out = Vec::new();
  for island in &islands {
    for p in uniform_support_island(island, cfg) {
      out.push(SupportPoint::island(
        Vec3::new(unscaled(p.x) as f32, unscaled(p.y) as f32, z as f32),
        head_front_radius,
      ));
    }
  }

  out
}
