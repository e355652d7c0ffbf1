//! Meshing of the logical elements into triangle geometry.

use glam::{Quat, Vec3};

use crate::elements::{Anchor, Bridge, DiffBridge, Head, Junction, Pedestal, Pillar};
use crate::geometry::EPSILON;
use crate::mesh::primitives::{cylinder, halfcone, make_portion, pinhead, sphere};
use crate::mesh::TriangleMesh;

use std::f64::consts::PI;

fn rotate_translate(mesh: &mut TriangleMesh, from: Vec3, to: Vec3, offset: Vec3) {
  let quat = Quat::from_rotation_arc(from, to.normalize_or(from));
  for v in &mut mesh.vertices {
    *v = quat * *v + offset;
  }
}

pub fn head_mesh(h: &Head, steps: usize) -> TriangleMesh {
  let mut mesh = pinhead(h.r_pin_mm, h.r_back_mm, h.width_mm, steps);

  // The locally built head points up with the pin on top; shift it so the
  // origin lands on the pin tip minus the penetration, then orient the
  // dull end along the head direction.
  let dz = (h.fullwidth() - h.r_back_mm) as f32;
  mesh.translate(Vec3::new(0., 0., -dz));

  rotate_translate(&mut mesh, Vec3::NEG_Z, h.dir.as_vec3(), h.pos.as_vec3());

  mesh
}

pub fn anchor_mesh(a: &Anchor, steps: usize) -> TriangleMesh {
  head_mesh(&a.0, steps)
}

pub fn pillar_mesh(p: &Pillar, steps: usize) -> TriangleMesh {
  if p.height > EPSILON {
    halfcone(p.height, p.r_end, p.r_start, p.endpt, steps)
  } else {
    TriangleMesh::new()
  }
}

pub fn pedestal_mesh(p: &Pedestal, steps: usize) -> TriangleMesh {
  halfcone(p.height, p.r_bottom, p.r_top, p.pos, steps)
}

pub fn junction_mesh(j: &Junction, steps: usize) -> TriangleMesh {
  let mut mesh = sphere(j.r, make_portion(0., PI), 2. * PI / steps as f64);
  mesh.translate(j.pos.as_vec3());
  mesh
}

pub fn bridge_mesh(br: &Bridge, steps: usize) -> TriangleMesh {
  let mut mesh = cylinder(br.r, br.get_length(), steps);
  rotate_translate(
    &mut mesh,
    Vec3::Z,
    br.get_dir().as_vec3(),
    br.startp.as_vec3(),
  );
  mesh
}

pub fn diffbridge_mesh(br: &DiffBridge, steps: usize) -> TriangleMesh {
  let mut mesh = halfcone(br.get_length(), br.r, br.end_r, glam::DVec3::ZERO, steps);
  rotate_translate(
    &mut mesh,
    Vec3::Z,
    br.get_dir().as_vec3(),
    br.startp.as_vec3(),
  );
  mesh
}

#[cfg(test)]
#[path = "mesher_test.rs"]
mod mesher_test;
