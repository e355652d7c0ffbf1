//! The bundle every generation step works on: the queryable mesh, the
//! input support points and the configuration.

use crate::config::{SupportConfig, SupportPoint};
use crate::mesh::{MeshQuery, TriangleMesh};

pub struct SupportableMesh {
  pub query: MeshQuery,
  pub points: Vec<SupportPoint>,
  pub cfg: SupportConfig,
}

impl SupportableMesh {
  pub fn new(mesh: TriangleMesh, points: Vec<SupportPoint>, cfg: SupportConfig) -> Self {
    Self {
      query: MeshQuery::new(mesh),
      points,
      cfg,
    }
  }
}

/// Z level of the print bed: the object sits `object_elevation_mm` above
/// it. With an empty mesh the model bottom is taken as zero.
pub fn ground_level(sm: &SupportableMesh) -> f64 {
  let bb = sm.query.mesh().bounding_box();
  let bottom = if bb.is_valid() { bb.min.z as f64 } else { 0. };

  bottom - sm.cfg.object_elevation_mm
}
