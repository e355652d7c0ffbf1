use criterion::{criterion_group, criterion_main, Criterion};

use glam::dvec3;
use suptree::collision::{beam_mesh_hit, BEAM_SAMPLES, WIDE_BEAM_SAMPLES};
use suptree::geometry::{Beam, DOWN};
use suptree::mesh::{make_cylinder, MeshQuery};

fn beam_cast_benchmark(c: &mut Criterion) {
  let query = MeshQuery::new(make_cylinder(8., 20., 256));
  let beam = Beam::uniform(dvec3(10., 0., 25.), DOWN, 0.5);

  c.bench_function("beam_cast_8", |b| {
    b.iter(|| beam_mesh_hit(&query, &beam, BEAM_SAMPLES, 0.5))
  });

  c.bench_function("beam_cast_16", |b| {
    b.iter(|| beam_mesh_hit(&query, &beam, WIDE_BEAM_SAMPLES, 0.5))
  });

  let slanted = Beam::uniform(
    dvec3(0., 0., 30.),
    dvec3(0.5, 0.1, -0.86).normalize(),
    0.4,
  );
  c.bench_function("beam_cast_slanted", |b| {
    b.iter(|| beam_mesh_hit(&query, &slanted, WIDE_BEAM_SAMPLES, 0.5))
  });
}

criterion_group!(benches, beam_cast_benchmark);
criterion_main!(benches);
