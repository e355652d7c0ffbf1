//! suptree - SLA support-tree generation.
//!
//! Given a triangle mesh and a set of support points on its surface, this
//! crate synthesises the scaffold of pinheads, pillars, bridges and
//! pedestals that carries the model on the print bed, steering clear of
//! the model itself. Two generators are available:
//!
//! * [`default_tree`] - the deterministic pipeline: pinhead placement,
//!   ground/model classification, pillar routing, inter-pillar bracing.
//! * [`branching`] - a greedy nearest-neighbour tree builder producing an
//!   arborescent structure with cost-aware merges (backed by the
//!   `branchtree` crate).
//!
//! The [`islands`] module places support points on bottom-slice islands
//! via a Voronoi skeleton, and [`raster`] turns slices into anti-aliased
//! grayscale pixel planes.
//!
//! The crate is a library, not a service: meshes come in as
//! [`mesh::TriangleMesh`], results go out the same way, and the only
//! control surface is a [`config::SupportConfig`] plus optional progress
//! and cancel callbacks.

pub mod branching;
pub mod builder;
pub mod collision;
pub mod config;
pub mod default_tree;
pub mod elements;
pub mod error;
pub mod geometry;
pub mod ground;
pub mod heads;
pub mod islands;
pub mod mesh;
pub mod mesher;
pub mod opt;
pub mod pillaring;
pub mod polygon;
pub mod raster;
pub mod support;

pub use branching::create_branching_tree;
pub use builder::SupportTreeBuilder;
pub use config::{JobController, SupportConfig, SupportPoint};
pub use default_tree::create_default_tree;
pub use error::Error;
pub use mesh::{MeshQuery, TriangleMesh};
pub use support::{ground_level, SupportableMesh};

/// Which generator to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TreeType {
  #[default]
  Default,
  Branching,
}

/// The outcome of a build: the populated element store plus the indices
/// of support points no route was found for.
pub struct SupportTree {
  pub builder: SupportTreeBuilder,
  pub unroutable: Vec<usize>,
}

impl SupportTree {
  /// The merged support geometry, ready to be sliced with the model.
  pub fn merged_mesh(&self) -> std::sync::Arc<TriangleMesh> {
    self.builder.merged_mesh(builder::DEFAULT_MESH_STEPS)
  }
}

/// Validate the input and run the selected generator.
///
/// An empty support-point list yields an empty tree. Input where every
/// point lies below the bed is rejected as [`Error::ConfigInvalid`];
/// cancellation surfaces as [`Error::Cancelled`].
pub fn build_support_tree(
  mesh: TriangleMesh,
  points: Vec<SupportPoint>,
  cfg: SupportConfig,
  tree_type: TreeType,
  ctl: JobController,
) -> Result<SupportTree, Error> {
  cfg.validate()?;

  let sm = SupportableMesh::new(mesh, points, cfg);
  let gnd = ground_level(&sm);

  if !sm.points.is_empty() && sm.points.iter().all(|p| (p.pos.z as f64) < gnd) {
    return Err(Error::ConfigInvalid(
      "all support points lie below the bed".into(),
    ));
  }

  let builder = SupportTreeBuilder::new(ctl);
  let unroutable = match tree_type {
    TreeType::Default => create_default_tree(&builder, &sm)?,
    TreeType::Branching => create_branching_tree(&builder, &sm)?,
  };

  Ok(SupportTree {
    builder,
    unroutable,
  })
}
